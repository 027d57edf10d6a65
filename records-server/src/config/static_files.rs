use serde::Deserialize;

/// Where the front-end build output is served from
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    /// Directory the front-end build emits into (default: wwwroot)
    #[serde(default = "default_root")]
    pub root: String,

    /// Vendor scripts copied into the build output, relative to `root`
    #[serde(default = "default_vendor_scripts")]
    pub vendor_scripts: Vec<String>,
}

fn default_root() -> String {
    "wwwroot".to_string()
}

fn default_vendor_scripts() -> Vec<String> {
    vec!["js/oidc-client.min.js".to_string()]
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            vendor_scripts: default_vendor_scripts(),
        }
    }
}
