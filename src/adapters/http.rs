use crate::utils::error::{DeepWikiError, Result};
use reqwest::{Client, Response};
use std::time::Duration;

pub const USER_AGENT: &str = concat!("deepwiki-explorer/", env!("CARGO_PKG_VERSION"));

pub fn build_client(connect_timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .build()?;
    Ok(client)
}

/// 非 2xx 回應轉成 BackendStatusError，保留回應內容方便除錯
pub async fn ensure_ok(response: Response, step: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DeepWikiError::BackendStatusError {
        step: step.to_string(),
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        body,
    })
}

/// 連線失敗與逾時各自轉成較明確的錯誤
pub fn classify_send_error(url: &str, timeout: Duration, error: reqwest::Error) -> DeepWikiError {
    if error.is_connect() {
        DeepWikiError::ConnectionError {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else if error.is_timeout() {
        DeepWikiError::TimeoutError {
            operation: format!("request to {}", url),
            seconds: timeout.as_secs(),
        }
    } else {
        DeepWikiError::ApiError(error)
    }
}
