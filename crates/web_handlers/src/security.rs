//! Security headers added to every response.
//!
//! The content security policy is built from per-directive allow-lists so the
//! CDNs used by the views can be listed next to each other and extended from
//! configuration (see [`ContentSecurityPolicy::allow_image_host`]).

use actix_web::{
    http::header::{
        CONTENT_SECURITY_POLICY, HeaderName, HeaderValue, InvalidHeaderValue, REFERRER_POLICY,
        X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
    },
    middleware::DefaultHeaders,
};

const SCRIPT_HOSTS: &[&str] = &[
    "https://cdn.jsdelivr.net/",
    "https://kit.fontawesome.com/",
    "https://cdnjs.cloudflare.com/",
];

const STYLE_HOSTS: &[&str] = &[
    "https://cdn.jsdelivr.net/",
    "https://kit-free.fontawesome.com/",
    "https://use.fontawesome.com/",
    "https://fonts.googleapis.com/",
];

const FONT_HOSTS: &[&str] = &["https://fonts.gstatic.com/", "https://use.fontawesome.com/"];

const IMAGE_HOSTS: &[&str] = &["https://images.unsplash.com/"];

/// Content-Security-Policy directives, each with its allowed sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: Vec<(&'static str, Vec<String>)>,
}

fn sources(keywords: &[&str], hosts: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .chain(hosts)
        .map(|source| source.to_string())
        .collect()
}

impl Default for ContentSecurityPolicy {
    fn default() -> Self {
        Self {
            directives: vec![
                ("default-src", sources(&["'self'"], &[])),
                ("base-uri", sources(&["'self'"], &[])),
                ("connect-src", sources(&["'self'"], &[])),
                (
                    "script-src",
                    sources(&["'self'", "'unsafe-inline'"], SCRIPT_HOSTS),
                ),
                (
                    "style-src",
                    sources(&["'self'", "'unsafe-inline'"], STYLE_HOSTS),
                ),
                ("worker-src", sources(&["'self'", "blob:"], &[])),
                ("object-src", sources(&["'none'"], &[])),
                (
                    "img-src",
                    sources(&["'self'", "blob:", "data:"], IMAGE_HOSTS),
                ),
                ("font-src", sources(&["'self'"], FONT_HOSTS)),
                ("form-action", sources(&["'self'"], &[])),
                ("frame-ancestors", sources(&["'self'"], &[])),
            ],
        }
    }
}

impl ContentSecurityPolicy {
    /// Allows images served from `host`, e.g. an image CDN account URL.
    pub fn allow_image_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if let Some((_, allowed)) = self
            .directives
            .iter_mut()
            .find(|(name, _)| *name == "img-src")
        {
            if !allowed.contains(&host) {
                allowed.push(host);
            }
        }
        self
    }

    /// Sources allowed for `directive`, if it is set.
    pub fn sources(&self, directive: &str) -> Option<&[String]> {
        self.directives
            .iter()
            .find(|(name, _)| *name == directive)
            .map(|(_, allowed)| allowed.as_slice())
    }

    /// Renders the policy as a header value.
    pub fn header_value(&self) -> String {
        self.directives
            .iter()
            .map(|(name, allowed)| format!("{} {}", name, allowed.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Pre-validated set of response headers for the security headers stage.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    /// Builds the header set, failing if the policy can't be sent as a header.
    pub fn new(policy: &ContentSecurityPolicy) -> Result<Self, InvalidHeaderValue> {
        let csp = HeaderValue::from_str(&policy.header_value())?;

        Ok(Self {
            headers: vec![
                (CONTENT_SECURITY_POLICY, csp),
                (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                (X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
                (REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
                (X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
                (
                    HeaderName::from_static("cross-origin-opener-policy"),
                    HeaderValue::from_static("same-origin"),
                ),
            ],
        })
    }

    /// The headers, in the order they are added.
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Middleware adding every header a response doesn't already carry.
    pub fn middleware(&self) -> DefaultHeaders {
        self.headers
            .iter()
            .cloned()
            .fold(DefaultHeaders::new(), |middleware, header| {
                middleware.add(header)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ContentSecurityPolicy::default();
        let value = policy.header_value();

        assert!(value.starts_with("default-src 'self'; "));
        assert!(value.contains("object-src 'none'"));
        assert!(value.contains("script-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net/"));
        assert!(!value.ends_with(';'));
    }

    #[test]
    fn test_allow_image_host_once() {
        let policy = ContentSecurityPolicy::default()
            .allow_image_host("https://res.cloudinary.com/yelpcamp/")
            .allow_image_host("https://res.cloudinary.com/yelpcamp/");

        let img = policy.sources("img-src").unwrap();
        assert_eq!(
            img.iter()
                .filter(|s| s.as_str() == "https://res.cloudinary.com/yelpcamp/")
                .count(),
            1
        );
        assert!(img.contains(&"data:".to_string()));
    }

    #[test]
    fn test_security_headers_default() {
        let headers = SecurityHeaders::new(&ContentSecurityPolicy::default()).unwrap();
        let names: Vec<&HeaderName> = headers.headers().iter().map(|(name, _)| name).collect();

        assert!(names.contains(&&CONTENT_SECURITY_POLICY));
        assert!(names.contains(&&X_CONTENT_TYPE_OPTIONS));
        assert!(names.contains(&&X_FRAME_OPTIONS));
        assert!(names.contains(&&REFERRER_POLICY));
    }

    #[test]
    fn test_unsendable_policy_rejected() {
        let policy = ContentSecurityPolicy::default().allow_image_host("https://bad\nhost/");
        assert!(SecurityHeaders::new(&policy).is_err());
    }
}
