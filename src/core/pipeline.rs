use crate::core::scaffold::build_draft;
use crate::domain::model::{
    Artifact, CachedWiki, DocumentationRequest, DocumentationResult, ExportRequest, WikiDraft,
};
use crate::domain::ports::{Pipeline, RepoFileLister, ResultObserver, Storage, WikiBackend};
use crate::utils::error::{DeepWikiError, Result};
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub struct WikiExportPipeline<S: Storage, B: WikiBackend, L: RepoFileLister> {
    storage: S,
    backend: B,
    lister: L,
    request: DocumentationRequest,
    observer: Option<ResultObserver>,
}

impl<S: Storage, B: WikiBackend, L: RepoFileLister> WikiExportPipeline<S, B, L> {
    pub fn new(storage: S, backend: B, lister: L, request: DocumentationRequest) -> Self {
        Self {
            storage,
            backend,
            lister,
            request,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: ResultObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    async fn write_archive(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let entries = read_archive(bytes)?;
        let mut files = Vec::with_capacity(entries.len());

        for (name, data) in entries {
            self.storage.write_file(&name, &data).await?;
            files.push(name);
        }

        tracing::info!(
            "📦 Extracted {} files → {}",
            files.len(),
            self.request.output_dir.display()
        );
        Ok(files)
    }
}

/// 讀出壓縮檔中所有檔案；任何跳脫輸出目錄的路徑都拒絕
fn read_archive(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let path = file
            .enclosed_name()
            .ok_or_else(|| DeepWikiError::UnsafeArchiveEntryError {
                name: file.name().to_string(),
            })?;
        let name = path.to_string_lossy().replace('\\', "/");

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push((name, data));
    }

    Ok(entries)
}

#[async_trait::async_trait]
impl<S: Storage, B: WikiBackend, L: RepoFileLister> Pipeline for WikiExportPipeline<S, B, L> {
    async fn prepare(&self) -> Result<WikiDraft> {
        let files = self
            .lister
            .list_files(&self.request.repo, self.request.access_token.as_deref())
            .await?;

        Ok(build_draft(&self.request, files))
    }

    async fn generate(&self, mut draft: WikiDraft) -> Result<WikiDraft> {
        let content = self
            .backend
            .generate(&draft.trigger, self.observer.as_ref())
            .await?;

        if content.trim().is_empty() {
            return Err(DeepWikiError::EmptyGenerationError);
        }

        tracing::info!("Populating final wiki structure with generated content.");
        draft.populate(content)?;
        Ok(draft)
    }

    async fn publish(&self, draft: WikiDraft) -> Result<Artifact> {
        let request = &self.request;
        self.backend.save_wiki_cache(&draft.cache).await?;

        tracing::info!("Downloading final wiki from cache...");
        let cached = self
            .backend
            .get_wiki_cache(&request.repo, request.language)
            .await?;
        let pages = cached
            .as_ref()
            .and_then(CachedWiki::pages)
            .ok_or_else(|| DeepWikiError::CacheMissingError {
                owner: request.repo.owner.clone(),
                repo: request.repo.repo.clone(),
            })?
            .to_vec();

        if !pages.iter().any(|page| !page.content.trim().is_empty()) {
            tracing::warn!("The wiki from the cache has no content.");
        }

        let exported = self
            .backend
            .export_wiki(&ExportRequest {
                repo_url: request.repo_url.clone(),
                format: request.format,
                pages,
            })
            .await?;

        let files = if exported.is_archive() {
            self.write_archive(&exported.bytes).await?
        } else {
            let file_name = request.format.file_name();
            self.storage.write_file(file_name, &exported.bytes).await?;
            tracing::info!(
                "📝 Saved wiki → {}",
                request.output_dir.join(file_name).display()
            );
            vec![file_name.to_string()]
        };

        let artifact = Artifact {
            output_dir: request.output_dir.clone(),
            format: request.format,
            files,
        };

        if let Some(observer) = &self.observer {
            let _ = observer.send(DocumentationResult::Artifact(artifact.clone()));
        }

        Ok(artifact)
    }
}
