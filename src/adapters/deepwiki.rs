use crate::adapters::http::{build_client, classify_send_error, ensure_ok};
use crate::adapters::stream::capture_stream;
use crate::domain::model::{
    CachedWiki, ExportRequest, ExportedWiki, GenerationPayload, Language, RepoInfo, WikiCacheEntry,
};
use crate::domain::ports::{ConfigProvider, ResultObserver, WikiBackend};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// DeepWiki-Open 後端的精簡客戶端：WebSocket 生成加上 wiki 快取與匯出 REST API
#[derive(Debug, Clone)]
pub struct DeepWikiClient {
    base_url: String,
    ws_url: String,
    request_timeout: Duration,
    export_timeout: Duration,
    connect_timeout: Duration,
    client: Client,
}

impl DeepWikiClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = build_client(config.connect_timeout())?;
        let base_url = config.backend_url().trim_end_matches('/').to_string();

        tracing::info!(
            "DeepWikiClient → http: {}, ws: {}",
            base_url,
            config.websocket_url()
        );

        Ok(Self {
            base_url,
            ws_url: config.websocket_url().to_string(),
            request_timeout: config.request_timeout(),
            export_timeout: config.export_timeout(),
            connect_timeout: config.connect_timeout(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl WikiBackend for DeepWikiClient {
    async fn generate(
        &self,
        payload: &GenerationPayload,
        observer: Option<&ResultObserver>,
    ) -> Result<String> {
        capture_stream(&self.ws_url, payload, self.connect_timeout, observer).await
    }

    async fn save_wiki_cache(&self, entry: &WikiCacheEntry) -> Result<()> {
        let url = self.url("/api/wiki_cache");
        tracing::info!("Saving assembled wiki to the server's cache...");

        let response = self
            .client
            .post(&url)
            .json(entry)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(&url, self.request_timeout, e))?;
        ensure_ok(response, "save wiki cache").await?;

        tracing::info!("✔ Wiki successfully saved to server cache.");
        Ok(())
    }

    async fn get_wiki_cache(
        &self,
        repo: &RepoInfo,
        language: Language,
    ) -> Result<Option<CachedWiki>> {
        let url = self.url("/api/wiki_cache");
        tracing::debug!("Reading wiki cache for {}/{} ({})", repo.owner, repo.repo, language);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("owner", repo.owner.as_str()),
                ("repo", repo.repo.as_str()),
                ("repo_type", repo.repo_type.as_str()),
                ("language", language.code()),
            ])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(&url, self.request_timeout, e))?;
        let response = ensure_ok(response, "get wiki cache").await?;

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn export_wiki(&self, request: &ExportRequest) -> Result<ExportedWiki> {
        let url = self.url("/export/wiki");
        tracing::info!(
            "Exporting {} page(s) as {}...",
            request.pages.len(),
            request.format
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(self.export_timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(&url, self.export_timeout, e))?;
        let response = ensure_ok(response, "export/wiki").await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        tracing::debug!("Export returned {} bytes ({})", bytes.len(), content_type);
        Ok(ExportedWiki {
            content_type,
            bytes,
        })
    }
}
