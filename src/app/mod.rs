// 組裝：把設定、轉接器與管道接在一起

use crate::adapters::{DeepWikiClient, HostedRepoLister, LocalStorage};
use crate::config::settings::Settings;
use crate::core::engine::ExportEngine;
use crate::core::pipeline::WikiExportPipeline;
use crate::domain::model::{Artifact, DocumentationRequest};
use crate::domain::ports::ResultObserver;
use crate::utils::error::Result;

/// 金鑰由後端使用，本機缺少時只提醒
pub fn warn_missing_api_key(request: &DocumentationRequest) {
    if let Some(var) = request.provider.api_key_env() {
        let present = std::env::var(var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if !present {
            tracing::warn!(
                "{} is not set locally; the backend must have a key for provider '{}'",
                var,
                request.provider
            );
        }
    }
}

pub async fn export(
    settings: &Settings,
    request: DocumentationRequest,
    observer: Option<ResultObserver>,
) -> Result<Artifact> {
    let runtime = settings.runtime()?;

    tracing::info!("Using API Host: {}", runtime.backend_url);
    tracing::info!(
        "Repo: {}/{} ({}), format: {}, language: {}, provider: {}, model: {}",
        request.repo.owner,
        request.repo.repo,
        request.repo.repo_type.as_str(),
        request.format,
        request.language.display_name(),
        request.provider,
        request.model
    );
    warn_missing_api_key(&request);

    let storage = LocalStorage::new(request.output_dir.clone());
    let backend = DeepWikiClient::new(&runtime)?;
    let lister = HostedRepoLister::new(
        &settings.hosts,
        runtime.request_timeout,
        runtime.connect_timeout,
    )?;

    let mut pipeline = WikiExportPipeline::new(storage, backend, lister, request);
    if let Some(observer) = observer {
        pipeline = pipeline.with_observer(observer);
    }

    ExportEngine::new(pipeline)
        .with_timeout(runtime.generation_timeout)
        .run()
        .await
}

/// 從命令列參數執行一次完整匯出
#[cfg(feature = "cli")]
pub async fn run(
    args: &crate::config::cli::CliArgs,
    observer: Option<ResultObserver>,
) -> Result<Artifact> {
    let settings = Settings::load(args.config.as_deref())?;
    let request = args.to_request(&settings)?;
    export(&settings, request, observer).await
}
