use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid TODO_BIND_ADDR `{value}`: {source}")]
    BindAddr { value: String, source: std::net::AddrParseError },
}

/// Connection settings for the managed backend. Both values are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when either backend setting is missing; the app then serves the
    /// "not configured" notice everywhere.
    pub backend: Option<BackendConfig>,
    pub bind_addr: SocketAddr,
    pub site_url: String,
    pub dev_redirect_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match (non_empty("TODO_BACKEND_URL"), non_empty("TODO_BACKEND_KEY")) {
            (Some(url), Some(api_key)) => Some(BackendConfig { url, api_key }),
            _ => None,
        };
        let bind = non_empty("TODO_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: bind.clone(), source })?;
        let site_url = non_empty("TODO_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());

        Ok(Self { backend, bind_addr, site_url, dev_redirect_url: non_empty("TODO_DEV_REDIRECT_URL") })
    }

    pub fn is_configured(&self) -> bool { self.backend.is_some() }

    /// Whether the public site is served over https.
    pub fn is_https(&self) -> bool { self.site_url.starts_with("https://") }

    /// Where a freshly signed-up user is sent after confirming.
    pub fn sign_up_redirect(&self) -> String {
        match &self.dev_redirect_url {
            Some(url) => url.clone(),
            None => format!("{}/dashboard", self.site_url.trim_end_matches('/')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn backend_requires_both_settings() {
        assert!(!config(&[]).unwrap().is_configured());
        assert!(!config(&[("TODO_BACKEND_URL", "sqlite::memory:")]).unwrap().is_configured());
        assert!(!config(&[("TODO_BACKEND_URL", "sqlite::memory:"), ("TODO_BACKEND_KEY", "  ")]).unwrap().is_configured());
        let cfg = config(&[("TODO_BACKEND_URL", "sqlite::memory:"), ("TODO_BACKEND_KEY", "anon")]).unwrap();
        assert_eq!(cfg.backend, Some(BackendConfig { url: "sqlite::memory:".into(), api_key: "anon".into() }));
    }

    #[test]
    fn defaults_and_redirect_target() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.sign_up_redirect(), "http://localhost:3000/dashboard");
        assert!(!cfg.is_https());

        let cfg = config(&[("TODO_SITE_URL", "https://todo.example/")]).unwrap();
        assert_eq!(cfg.sign_up_redirect(), "https://todo.example/dashboard");
        assert!(cfg.is_https());

        let cfg = config(&[("TODO_DEV_REDIRECT_URL", "http://127.0.0.1:4000/cb")]).unwrap();
        assert_eq!(cfg.sign_up_redirect(), "http://127.0.0.1:4000/cb");
    }

    #[test]
    fn rejects_bad_bind_addr() {
        assert!(matches!(config(&[("TODO_BIND_ADDR", "nowhere")]), Err(ConfigError::BindAddr { .. })));
    }
}
