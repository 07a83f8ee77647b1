use crate::domain::model::DEFAULT_OUTPUT_ROOT;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DeepWikiError, Result};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_url, validate_ws_url, Validate,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "deepwiki.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const ENV_BASE_URL: &str = "DEEPWIKI_BASE_URL";
pub const ENV_WS_URL: &str = "DEEPWIKI_WS_URL";

static ENV_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendConfig,
    pub defaults: DefaultsConfig,
    pub hosts: HostsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// 未設定時由 base_url 推導（http→ws，路徑 /ws/chat）
    pub ws_url: Option<String>,
    pub request_timeout_secs: u64,
    pub export_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub generation_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: None,
            request_timeout_secs: 30,
            export_timeout_secs: 600,
            connect_timeout_secs: 20,
            generation_timeout_secs: 20 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub format: String,
    pub language: String,
    pub provider: String,
    /// 未設定時使用 provider 的預設模型
    pub model: Option<String>,
    pub output_root: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: "markdown".to_string(),
            language: "en".to_string(),
            provider: "openai".to_string(),
            model: None,
            output_root: DEFAULT_OUTPUT_ROOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    pub github_api: String,
    pub gitlab_api: String,
    pub bitbucket_api: String,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            gitlab_api: "https://gitlab.com/api/v4".to_string(),
            bitbucket_api: "https://api.bitbucket.org/2.0".to_string(),
        }
    }
}

impl Settings {
    /// 載入設定：指定的檔案必須存在；未指定時讀取 ./deepwiki.toml（若存在），
    /// 最後套用環境變數覆寫。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                tracing::debug!("Loading settings from ./{}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| DeepWikiError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| DeepWikiError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DEEPWIKI_HOST})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn apply_env_overrides(&mut self) {
        if let Some(base_url) = env_value(ENV_BASE_URL) {
            tracing::debug!("{} overrides backend.base_url", ENV_BASE_URL);
            self.backend.base_url = base_url;
        }
        if let Some(ws_url) = env_value(ENV_WS_URL) {
            tracing::debug!("{} overrides backend.ws_url", ENV_WS_URL);
            self.backend.ws_url = Some(ws_url);
        }
    }

    /// 解析後的 WebSocket 位址
    pub fn resolved_ws_url(&self) -> Result<String> {
        if let Some(ws_url) = &self.backend.ws_url {
            return Ok(ws_url.clone());
        }
        derive_ws_url(&self.backend.base_url)
    }

    pub fn runtime(&self) -> Result<RuntimeConfig> {
        self.validate()?;
        Ok(RuntimeConfig {
            backend_url: self.backend.base_url.trim_end_matches('/').to_string(),
            websocket_url: self.resolved_ws_url()?,
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
            export_timeout: Duration::from_secs(self.backend.export_timeout_secs),
            connect_timeout: Duration::from_secs(self.backend.connect_timeout_secs),
            generation_timeout: Duration::from_secs(self.backend.generation_timeout_secs),
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// http://host:port → ws://host:port/ws/chat；https 對應 wss
pub fn derive_ws_url(base_url: &str) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|e| DeepWikiError::InvalidConfigValueError {
        field: "backend.base_url".to_string(),
        value: base_url.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })?;

    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| DeepWikiError::InvalidConfigValueError {
            field: "backend.base_url".to_string(),
            value: base_url.to_string(),
            reason: "cannot derive a WebSocket URL from this scheme".to_string(),
        })?;
    url.set_path("/ws/chat");
    url.set_query(None);

    Ok(url.to_string())
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("backend.base_url", &self.backend.base_url)?;
        validate_ws_url("backend.ws_url", &self.resolved_ws_url()?)?;

        validate_positive_number(
            "backend.request_timeout_secs",
            self.backend.request_timeout_secs,
            1,
        )?;
        validate_positive_number(
            "backend.export_timeout_secs",
            self.backend.export_timeout_secs,
            1,
        )?;
        validate_positive_number(
            "backend.connect_timeout_secs",
            self.backend.connect_timeout_secs,
            1,
        )?;
        validate_positive_number(
            "backend.generation_timeout_secs",
            self.backend.generation_timeout_secs,
            1,
        )?;

        validate_path("defaults.output_root", &self.defaults.output_root)?;

        validate_url("hosts.github_api", &self.hosts.github_api)?;
        validate_url("hosts.gitlab_api", &self.hosts.gitlab_api)?;
        validate_url("hosts.bitbucket_api", &self.hosts.bitbucket_api)?;

        Ok(())
    }
}

/// 驗證後、供客戶端使用的後端設定
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub backend_url: String,
    pub websocket_url: String,
    pub request_timeout: Duration,
    pub export_timeout: Duration,
    pub connect_timeout: Duration,
    pub generation_timeout: Duration,
}

impl ConfigProvider for RuntimeConfig {
    fn backend_url(&self) -> &str {
        &self.backend_url
    }

    fn websocket_url(&self) -> &str {
        &self.websocket_url
    }

    fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn export_timeout(&self) -> Duration {
        self.export_timeout
    }

    fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn generation_timeout(&self) -> Duration {
        self.generation_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_local_backend() {
        let runtime = Settings::default().runtime().unwrap();

        assert_eq!(runtime.backend_url, "http://localhost:8001");
        assert_eq!(runtime.websocket_url, "ws://localhost:8001/ws/chat");
        assert_eq!(runtime.request_timeout, Duration::from_secs(30));
        assert_eq!(runtime.export_timeout, Duration::from_secs(600));
        assert_eq!(runtime.connect_timeout, Duration::from_secs(20));
        assert_eq!(runtime.generation_timeout, Duration::from_secs(1200));
    }

    #[test]
    fn test_derive_ws_url() {
        assert_eq!(
            derive_ws_url("https://wiki.example.com/app?x=1").unwrap(),
            "wss://wiki.example.com/ws/chat"
        );
        assert_eq!(
            derive_ws_url("http://127.0.0.1:9000/").unwrap(),
            "ws://127.0.0.1:9000/ws/chat"
        );
        assert!(derive_ws_url("not a url").is_err());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[backend]
base_url = "https://wiki.internal:8443"
export_timeout_secs = 120

[defaults]
format = "html"
language = "ko"
model = "gpt-4o-mini"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();

        assert_eq!(settings.backend.base_url, "https://wiki.internal:8443");
        assert_eq!(settings.backend.export_timeout_secs, 120);
        assert_eq!(settings.backend.request_timeout_secs, 30);
        assert_eq!(settings.defaults.format, "html");
        assert_eq!(settings.defaults.language, "ko");
        assert_eq!(settings.defaults.provider, "openai");
        assert_eq!(settings.defaults.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.hosts, HostsConfig::default());
        assert_eq!(
            settings.resolved_ws_url().unwrap(),
            "wss://wiki.internal:8443/ws/chat"
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DEEPWIKI_TEST_SUBST_HOST", "http://10.0.0.5:8001");

        let toml_content = r#"
[backend]
base_url = "${DEEPWIKI_TEST_SUBST_HOST}"
ws_url = "${DEEPWIKI_TEST_UNDEFINED_VAR}"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(settings.backend.base_url, "http://10.0.0.5:8001");
        assert_eq!(
            settings.backend.ws_url.as_deref(),
            Some("${DEEPWIKI_TEST_UNDEFINED_VAR}")
        );
        // 未替換的佔位符不是合法 URL
        assert!(settings.validate().is_err());

        std::env::remove_var("DEEPWIKI_TEST_SUBST_HOST");
    }

    #[test]
    fn test_config_validation() {
        let settings = Settings::from_toml_str(
            r#"
[backend]
base_url = "ftp://localhost"
"#,
        )
        .unwrap();
        assert!(settings.validate().is_err());

        let settings = Settings::from_toml_str(
            r#"
[backend]
ws_url = "http://localhost:8001/ws/chat"
"#,
        )
        .unwrap();
        assert!(settings.validate().is_err());

        let settings = Settings::from_toml_str(
            r#"
[backend]
connect_timeout_secs = 0
"#,
        )
        .unwrap();
        assert!(settings.runtime().is_err());
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = Settings::from_toml_str("[backend\nbase_url = ").unwrap_err();
        assert!(matches!(err, DeepWikiError::ConfigValidationError { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[hosts]\ngithub_api = \"http://127.0.0.1:9999\"\n")
            .unwrap();

        let settings = Settings::load(Some(temp_file.path())).unwrap();
        assert_eq!(settings.hosts.github_api, "http://127.0.0.1:9999");

        let missing = Settings::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(missing, Err(DeepWikiError::ConfigError { .. })));
    }
}
