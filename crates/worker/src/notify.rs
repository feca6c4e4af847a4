//! Notification bridge.
//!
//! The worker cannot draw UI; it turns push payloads into notification
//! descriptors the host displays, and notification clicks into window
//! commands.

use serde::{Deserialize, Serialize};

use crate::events::HostCommand;

const TITLE: &str = "ODL Digital Library";
const DEFAULT_BODY: &str = "New content available!";
const TAG: &str = "odl-notification";

/// A user-visible notification with its two actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Build the notification for a push payload. An absent or empty payload
/// falls back to the default message.
pub fn on_push(payload: Option<&str>) -> Notification {
    let body = match payload {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => DEFAULT_BODY.to_string(),
    };

    Notification {
        title: TITLE.to_string(),
        body,
        icon: "/icons/icon-192x192.png".to_string(),
        badge: "/icons/icon-72x72.png".to_string(),
        vibrate: vec![200, 100, 200],
        tag: TAG.to_string(),
        require_interaction: false,
        actions: vec![
            NotificationAction { action: "open".to_string(), title: "Open Library".to_string() },
            NotificationAction { action: "dismiss".to_string(), title: "Dismiss".to_string() },
        ],
    }
}

/// Route a notification click. "open" focuses or opens the application
/// root; anything else just closes the notification.
pub fn on_click(action: &str) -> Option<HostCommand> {
    if action == "open" {
        Some(HostCommand::OpenWindow { url: "/".to_string() })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_with_payload() {
        let notification = on_push(Some("Three new books this week"));
        assert_eq!(notification.body, "Three new books this week");
        assert_eq!(notification.title, TITLE);
        assert_eq!(notification.actions.len(), 2);
    }

    #[test]
    fn test_push_without_payload_uses_default() {
        assert_eq!(on_push(None).body, DEFAULT_BODY);
        assert_eq!(on_push(Some("")).body, DEFAULT_BODY);
    }

    #[test]
    fn test_click_open_opens_root() {
        match on_click("open") {
            Some(HostCommand::OpenWindow { url }) => assert_eq!(url, "/"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_click_dismiss_is_noop() {
        assert!(on_click("dismiss").is_none());
    }
}
