use serde::Deserialize;

/// Relaxations of the content security policy. All default to off; the
/// development overlay may enable the script relaxations a dev bundle needs.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SecurityHeadersConfig {
    /// Add `'unsafe-eval'` to `script-src`
    #[serde(default)]
    pub script_unsafe_eval: bool,

    /// Add `'unsafe-inline'` to `script-src`
    #[serde(default)]
    pub script_unsafe_inline: bool,

    /// Add `'unsafe-inline'` to `style-src`
    #[serde(default)]
    pub style_unsafe_inline: bool,

    /// `max-age` of the Strict-Transport-Security header sent outside
    /// development (default: one year)
    #[serde(default)]
    pub hsts_max_age_secs: Option<u64>,
}
