use crate::domain::model::Artifact;
use crate::domain::ports::Pipeline;
use crate::utils::error::{DeepWikiError, Result};
use std::time::Duration;

pub struct ExportEngine<P: Pipeline> {
    pipeline: P,
    timeout: Option<Duration>,
}

impl<P: Pipeline> ExportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            timeout: None,
        }
    }

    /// 整個流程（含串流生成）的上限時間
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn run(&self) -> Result<Artifact> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_stages())
                .await
                .map_err(|_| DeepWikiError::TimeoutError {
                    operation: "wiki generation".to_string(),
                    seconds: limit.as_secs(),
                })?,
            None => self.run_stages().await,
        }
    }

    async fn run_stages(&self) -> Result<Artifact> {
        tracing::info!("Starting wiki export...");

        // Prepare
        tracing::info!("Listing repository files...");
        let draft = self.pipeline.prepare().await?;
        tracing::info!(
            "Scaffolded {} page(s)",
            draft.cache.wiki_structure.pages.len()
        );

        // Generate
        tracing::info!("Connecting to WebSocket...");
        let draft = self.pipeline.generate(draft).await?;
        tracing::info!("✅ Finished receiving stream.");

        // Publish
        tracing::info!("Saving wiki to server cache...");
        let artifact = self.pipeline.publish(draft).await?;
        tracing::info!(
            "Export finished: {} file(s) in {}",
            artifact.files.len(),
            artifact.output_dir.display()
        );

        Ok(artifact)
    }
}
