//! Request classification.
//!
//! A pure function of URL patterns and the Accept header; nothing here is
//! stored. The category drives strategy selection in the worker.

use url::Url;

/// Accept values that mark a request as a document fetch.
const DOCUMENT_ACCEPT: &str = "application/pdf";

/// The category assigned to an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A paywalled book document; cache-first, immutable once published.
    Document,
    /// A data/auth/payment service call; network-first.
    Api,
    /// Shell assets and everything else; cache-then-refresh.
    Static,
}

/// URL pattern tables, normally sourced from [`odl_core::AppConfig`].
#[derive(Debug, Clone)]
pub struct RoutingRules {
    /// Path suffixes such as ".pdf".
    pub document_extensions: Vec<String>,
    /// Host substrings of third-party file-hosting domains.
    pub document_hosts: Vec<String>,
    /// Path substrings such as "/api/".
    pub api_prefixes: Vec<String>,
    /// Host substrings of the data/auth service and the payment provider.
    pub service_hosts: Vec<String>,
}

impl RoutingRules {
    pub fn from_config(config: &odl_core::AppConfig) -> Self {
        Self {
            document_extensions: config.document_extensions.clone(),
            document_hosts: config.document_hosts.clone(),
            api_prefixes: config.api_prefixes.clone(),
            service_hosts: config.service_hosts.clone(),
        }
    }
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self::from_config(&odl_core::AppConfig::default())
    }
}

/// Classify a request, or return None if the router must not touch it.
///
/// Only GET over http(s) is routed. Mutating verbs (payment callbacks,
/// record writes) fall through to default network handling where caching
/// would be incorrect.
///
/// Rules in priority order:
/// 1. document extension, file-hosting host, or document Accept → Document
/// 2. API path prefix or service host → Api
/// 3. otherwise → Static
pub fn classify(rules: &RoutingRules, method: &str, url: &Url, accept: Option<&str>) -> Option<Classification> {
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let path = url.path().to_lowercase();
    let host = url.host_str().unwrap_or("").to_lowercase();

    let document_extension = rules.document_extensions.iter().any(|ext| path.ends_with(ext.as_str()));
    let document_host = rules.document_hosts.iter().any(|h| host.contains(h.as_str()));
    let document_accept = accept.is_some_and(|a| a.contains(DOCUMENT_ACCEPT));
    if document_extension || document_host || document_accept {
        return Some(Classification::Document);
    }

    let api_path = rules.api_prefixes.iter().any(|p| path.contains(p.as_str()));
    let service_host = rules.service_hosts.iter().any(|h| host.contains(h.as_str()));
    if api_path || service_host {
        return Some(Classification::Api);
    }

    Some(Classification::Static)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_pdf_extension_is_document() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://library.example/books/dune.PDF"), None),
            Some(Classification::Document)
        );
    }

    #[test]
    fn test_file_host_is_document() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://drive.google.com/uc?id=xyz"), None),
            Some(Classification::Document)
        );
    }

    #[test]
    fn test_accept_header_is_document() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(
                &rules,
                "GET",
                &url("https://library.example/download/42"),
                Some("application/pdf,*/*;q=0.8"),
            ),
            Some(Classification::Document)
        );
    }

    #[test]
    fn test_api_prefix_is_api() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://library.example/api/books"), None),
            Some(Classification::Api)
        );
    }

    #[test]
    fn test_data_service_host_is_api() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://abc.supabase.co/rest/v1/books"), None),
            Some(Classification::Api)
        );
    }

    #[test]
    fn test_payment_host_is_api() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://js.paystack.co/v1/inline.js"), None),
            Some(Classification::Api)
        );
    }

    #[test]
    fn test_document_beats_api() {
        // priority order: a PDF served from an /api/ path is a document
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://library.example/api/files/dune.pdf"), None),
            Some(Classification::Document)
        );
    }

    #[test]
    fn test_everything_else_is_static() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("https://library.example/styles/main.css"), None),
            Some(Classification::Static)
        );
    }

    #[test]
    fn test_post_bypasses() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "POST", &url("https://api.paystack.co/transaction/verify"), None),
            None
        );
    }

    #[test]
    fn test_non_http_scheme_bypasses() {
        let rules = RoutingRules::default();
        assert_eq!(
            classify(&rules, "GET", &url("ftp://library.example/books/dune.pdf"), None),
            None
        );
    }
}
