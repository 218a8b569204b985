use std::path::PathBuf;

use serde::Deserialize;

/// Host of the URL the receiver opens to wake the main app: `<scheme>://sharekit-content`.
pub const WAKE_URL_HOST: &str = "sharekit-content";

/// Plugin configuration, read from `plugins.sharekit` in `tauri.conf.json`.
///
/// ```json
/// {
///   "plugins": {
///     "sharekit": {
///       "appGroup": "group.com.example.app",
///       "urlScheme": "exampleapp"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// App Group shared with the macOS share extension. Defaults to `group.<identifier>`.
    #[serde(default)]
    pub app_group: Option<String>,
    /// Custom URL scheme used to wake a running instance after a share was stored.
    #[serde(default)]
    pub url_scheme: Option<String>,
    /// Overrides the directory holding the pending share record and shared files.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl Config {
    /// The wake URL for the configured scheme, if any.
    pub fn wake_url(&self) -> Option<url::Url> {
        let scheme = self.url_scheme.as_deref()?;
        url::Url::parse(&format!("{scheme}://{WAKE_URL_HOST}")).ok()
    }

    pub fn is_wake_url(&self, url: &url::Url) -> bool {
        match self.url_scheme.as_deref() {
            Some(scheme) => {
                url.scheme().eq_ignore_ascii_case(scheme) && url.host_str() == Some(WAKE_URL_HOST)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    fn with_scheme(scheme: &str) -> Config {
        Config {
            url_scheme: Some(scheme.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn wake_url_needs_a_scheme() {
        assert!(Config::default().wake_url().is_none());
        let url = with_scheme("demoapp").wake_url().unwrap();
        assert_eq!(url.as_str(), "demoapp://sharekit-content");
    }

    #[test]
    fn only_matching_scheme_and_host_wake() {
        let config = with_scheme("demoapp");
        assert!(config.is_wake_url(&"demoapp://sharekit-content".parse().unwrap()));
        assert!(!config.is_wake_url(&"otherapp://sharekit-content".parse().unwrap()));
        assert!(!config.is_wake_url(&"demoapp://settings".parse().unwrap()));
        assert!(!Config::default().is_wake_url(&"demoapp://sharekit-content".parse().unwrap()));
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let config: Config =
            serde_json::from_str(r#"{"appGroup":"group.demo","storageDir":"/tmp/share"}"#).unwrap();
        assert_eq!(config.app_group.as_deref(), Some("group.demo"));
        assert_eq!(config.storage_dir.unwrap().to_str(), Some("/tmp/share"));
        assert!(config.url_scheme.is_none());
    }
}
