use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeepWikiError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Could not connect to the backend at {url}: {message}")]
    ConnectionError { url: String, message: String },

    #[error("Error during '{step}': {status} {reason}\nResponse: {body}")]
    BackendStatusError {
        step: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("The WebSocket connection was closed with code {code}: {reason}")]
    StreamClosedError { code: u16, reason: String },

    #[error("The WebSocket connection was terminated unexpectedly: {message}")]
    StreamTerminatedError { message: String },

    #[error("Server finished but no content was captured from the stream")]
    EmptyGenerationError,

    #[error("Failed to retrieve a valid, populated wiki for {owner}/{repo} from the server cache")]
    CacheMissingError { owner: String, repo: String },

    #[error("Archive entry '{name}' escapes the output directory")]
    UnsafeArchiveEntryError { name: String },

    #[error("{operation} timed out after {seconds}s")]
    TimeoutError { operation: String, seconds: u64 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required value: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Network,
    Backend,
    Storage,
}

/// 嚴重程度決定 CLI 的退出碼，任何失敗都不會回傳 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 網路或逾時，可以稍後重試
    Medium,
    /// 請求或後端回應有問題
    High,
    /// 本機環境問題（設定檔、檔案系統）
    Critical,
}

impl DeepWikiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                ErrorCategory::Configuration
            }
            Self::InvalidConfigValueError { .. } | Self::MissingConfigError { .. } => {
                ErrorCategory::Validation
            }
            Self::ApiError(_)
            | Self::WebSocketError(_)
            | Self::ConnectionError { .. }
            | Self::StreamTerminatedError { .. }
            | Self::TimeoutError { .. } => ErrorCategory::Network,
            Self::BackendStatusError { .. }
            | Self::StreamClosedError { .. }
            | Self::EmptyGenerationError
            | Self::CacheMissingError { .. }
            | Self::SerializationError(_) => ErrorCategory::Backend,
            Self::ZipError(_) | Self::IoError(_) | Self::UnsafeArchiveEntryError { .. } => {
                ErrorCategory::Storage
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Validation | ErrorCategory::Backend => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.severity() {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ConnectionError { url, .. } => {
                format!("Could not connect to the DeepWiki backend at {}", url)
            }
            Self::ApiError(e) if e.is_connect() => {
                "Could not connect to the DeepWiki backend".to_string()
            }
            Self::ApiError(e) if e.is_timeout() => "The backend did not answer in time".to_string(),
            Self::BackendStatusError { step, status, .. } => {
                format!("The backend rejected '{}' with status {}", step, status)
            }
            Self::EmptyGenerationError => {
                "The backend finished without generating any content".to_string()
            }
            Self::InvalidConfigValueError { field, value, reason } => {
                format!("Invalid {} '{}': {}", field, value, reason)
            }
            Self::MissingConfigError { field } => format!("Missing required value: {}", field),
            other => format!("Failed to generate wiki: {}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConnectionError { .. } | Self::WebSocketError(_) => {
                "Is the DeepWiki-Open container running? Check DEEPWIKI_BASE_URL / DEEPWIKI_WS_URL."
            }
            Self::ApiError(e) if e.is_connect() => {
                "Is the DeepWiki-Open container running? Check DEEPWIKI_BASE_URL."
            }
            Self::TimeoutError { .. } | Self::ApiError(_) => {
                "Retry later or raise the timeouts in deepwiki.toml."
            }
            Self::StreamTerminatedError { .. } | Self::StreamClosedError { .. } => {
                "Check the backend logs; the generation stream was interrupted."
            }
            Self::BackendStatusError { status: 401 | 403, .. } => {
                "Provide an access token with --token or GITHUB_TOKEN for private repositories."
            }
            Self::BackendStatusError { status: 404, .. } => {
                "Check that the repository URL exists and is reachable."
            }
            Self::BackendStatusError { .. } | Self::SerializationError(_) => {
                "Check the backend logs for details."
            }
            Self::EmptyGenerationError | Self::CacheMissingError { .. } => {
                "Check the provider API keys configured on the backend and try again."
            }
            Self::MissingConfigError { .. } => {
                "Pass the missing value on the command line or in the environment."
            }
            Self::InvalidConfigValueError { .. } => "Run with --help to see the accepted values.",
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Fix deepwiki.toml or the DEEPWIKI_* environment variables."
            }
            Self::ZipError(_) | Self::UnsafeArchiveEntryError { .. } => {
                "The exported archive is unusable; try the markdown or html format."
            }
            Self::IoError(_) => "Check that the output directory is writable.",
        }
    }
}

pub type Result<T> = std::result::Result<T, DeepWikiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_failure_maps_to_non_zero_exit_code() {
        let errors = vec![
            DeepWikiError::EmptyGenerationError,
            DeepWikiError::ConnectionError {
                url: "ws://localhost:8001/ws/chat".to_string(),
                message: "refused".to_string(),
            },
            DeepWikiError::ConfigError {
                message: "bad".to_string(),
            },
            DeepWikiError::MissingConfigError {
                field: "token".to_string(),
            },
            DeepWikiError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
        ];

        for error in errors {
            assert_ne!(error.exit_code(), 0, "{} must not exit with 0", error);
        }
    }

    #[test]
    fn test_severity_drives_exit_code() {
        let network = DeepWikiError::TimeoutError {
            operation: "wiki generation".to_string(),
            seconds: 1200,
        };
        assert_eq!(network.category(), ErrorCategory::Network);
        assert_eq!(network.exit_code(), 2);

        let backend = DeepWikiError::BackendStatusError {
            step: "export/wiki".to_string(),
            status: 500,
            reason: "Internal Server Error".to_string(),
            body: String::new(),
        };
        assert_eq!(backend.severity(), ErrorSeverity::High);
        assert_eq!(backend.exit_code(), 1);

        let config = DeepWikiError::ConfigValidationError {
            field: "backend.base_url".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(config.exit_code(), 3);
    }

    #[test]
    fn test_backend_status_message_includes_step_and_body() {
        let error = DeepWikiError::BackendStatusError {
            step: "save wiki cache".to_string(),
            status: 422,
            reason: "Unprocessable Entity".to_string(),
            body: "{\"detail\":\"bad\"}".to_string(),
        };

        let text = error.to_string();
        assert!(text.contains("save wiki cache"));
        assert!(text.contains("422"));
        assert!(text.contains("detail"));
        assert!(error.user_friendly_message().contains("422"));
    }
}
