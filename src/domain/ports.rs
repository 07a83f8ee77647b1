use crate::domain::model::{
    Artifact, CachedWiki, DocumentationResult, ExportRequest, ExportedWiki, GenerationPayload,
    Language, RepoInfo, WikiCacheEntry, WikiDraft,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// 接收串流片段與最終產物的通道
pub type ResultObserver = UnboundedSender<DocumentationResult>;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn backend_url(&self) -> &str;
    fn websocket_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn export_timeout(&self) -> Duration;
    fn connect_timeout(&self) -> Duration;
    fn generation_timeout(&self) -> Duration;
}

#[async_trait]
pub trait RepoFileLister: Send + Sync {
    async fn list_files(&self, repo: &RepoInfo, token: Option<&str>) -> Result<Vec<String>>;
}

#[async_trait]
pub trait WikiBackend: Send + Sync {
    /// 送出 payload 並回傳串流內容的完整拼接
    async fn generate(
        &self,
        payload: &GenerationPayload,
        observer: Option<&ResultObserver>,
    ) -> Result<String>;
    async fn save_wiki_cache(&self, entry: &WikiCacheEntry) -> Result<()>;
    async fn get_wiki_cache(&self, repo: &RepoInfo, language: Language)
        -> Result<Option<CachedWiki>>;
    async fn export_wiki(&self, request: &ExportRequest) -> Result<ExportedWiki>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn prepare(&self) -> Result<WikiDraft>;
    async fn generate(&self, draft: WikiDraft) -> Result<WikiDraft>;
    async fn publish(&self, draft: WikiDraft) -> Result<Artifact>;
}
