use crate::config::SecurityHeadersConfig;
use axum::http::HeaderValue;
use http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use log::warn;

/// One year, the usual HSTS max-age
const DEFAULT_HSTS_MAX_AGE: u64 = 31_536_000;

/// Content-Security-Policy directives
#[derive(Debug, Clone, Default)]
pub struct ContentSecurityPolicy {
    pub block_all_mixed_content: bool,
    pub script_sources: Vec<&'static str>,
    pub style_sources: Vec<&'static str>,
}

impl ContentSecurityPolicy {
    /// Create a new, empty policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set block-all-mixed-content directive
    pub fn block_all_mixed_content(mut self) -> Self {
        self.block_all_mixed_content = true;
        self
    }

    /// Add a `script-src` source
    pub fn script_source(mut self, source: &'static str) -> Self {
        if !self.script_sources.contains(&source) {
            self.script_sources.push(source);
        }
        self
    }

    /// Add a `style-src` source
    pub fn style_source(mut self, source: &'static str) -> Self {
        if !self.style_sources.contains(&source) {
            self.style_sources.push(source);
        }
        self
    }

    /// Convert to HeaderValue
    pub fn to_header_value(&self) -> HeaderValue {
        let mut parts = Vec::new();

        if self.block_all_mixed_content {
            parts.push("block-all-mixed-content".to_string());
        }
        if !self.script_sources.is_empty() {
            parts.push(format!("script-src {}", self.script_sources.join(" ")));
        }
        if !self.style_sources.is_empty() {
            parts.push(format!("style-src {}", self.style_sources.join(" ")));
        }

        HeaderValue::from_str(&parts.join("; ")).unwrap_or_else(|e| {
            warn!("failed to build content security policy header: {e}");
            HeaderValue::from_static("default-src 'self'")
        })
    }
}

/// Extra policy sources a handler needs for its own response. Inserted into
/// the response extensions; the security headers stage widens the policy of
/// that response only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtraPolicySources {
    pub script_sources: &'static [&'static str],
    pub style_sources: &'static [&'static str],
}

/// The fixed set of security headers attached to every response
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    policy: ContentSecurityPolicy,
    content_security_policy: HeaderValue,
    hsts: Option<HeaderValue>,
}

impl SecurityHeaders {
    /// Build the header set from configuration. HSTS is only sent outside
    /// development mode.
    pub fn from_config(config: &SecurityHeadersConfig, development: bool) -> Self {
        let mut csp = ContentSecurityPolicy::new()
            .block_all_mixed_content()
            .script_source("'self'")
            .style_source("'self'");
        if config.script_unsafe_eval {
            csp = csp.script_source("'unsafe-eval'");
        }
        if config.script_unsafe_inline {
            csp = csp.script_source("'unsafe-inline'");
        }
        if config.style_unsafe_inline {
            csp = csp.style_source("'unsafe-inline'");
        }

        let hsts = (!development).then(|| {
            let max_age = config.hsts_max_age_secs.unwrap_or(DEFAULT_HSTS_MAX_AGE);
            HeaderValue::from_str(&format!("max-age={max_age}"))
                .unwrap_or(HeaderValue::from_static("max-age=31536000"))
        });

        Self {
            content_security_policy: csp.to_header_value(),
            policy: csp,
            hsts,
        }
    }

    /// The policy value for a response carrying `extra` sources
    fn policy_with(&self, extra: &ExtraPolicySources) -> HeaderValue {
        let mut csp = self.policy.clone();
        for source in extra.script_sources {
            csp = csp.script_source(*source);
        }
        for source in extra.style_sources {
            csp = csp.style_source(*source);
        }
        csp.to_header_value()
    }

    /// Apply headers to a response, replacing any value a later stage set
    pub fn apply<B>(&self, response: &mut axum::response::Response<B>) {
        let policy = match response.extensions().get::<ExtraPolicySources>() {
            Some(extra) => self.policy_with(extra),
            None => self.content_security_policy.clone(),
        };
        let headers = response.headers_mut();

        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
        headers.insert(CONTENT_SECURITY_POLICY, policy);
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
        if let Some(hsts) = &self.hsts {
            headers.insert(STRICT_TRANSPORT_SECURITY, hsts.clone());
        }
    }
}
