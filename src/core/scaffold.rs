use crate::domain::model::{
    ChatMessage, DocumentationRequest, GenerationPayload, WikiCacheEntry, WikiDraft, WikiPage,
    WikiStructure,
};
use std::collections::BTreeMap;
use uuid::Uuid;

pub fn build_prompt(file_paths: &[String]) -> String {
    let structure = if file_paths.is_empty() {
        "(file listing unavailable)".to_string()
    } else {
        file_paths.join("\n")
    };

    format!(
        "Please generate a comprehensive wiki for the codebase with the following file structure:\n\n\
         {}\n\n\
         --- \n\
         **In addition to the text documentation, please generate a high-level component interaction \
         diagram using Mermaid.js syntax.** The diagram should show how the main modules and files \
         relate to each other and their primary roles.",
        structure
    )
}

/// 建立生成前的骨架：一個涵蓋全部檔案、內容為空的主頁面
pub fn build_draft(request: &DocumentationRequest, file_paths: Vec<String>) -> WikiDraft {
    tracing::info!("Building request payload...");

    let trigger = GenerationPayload {
        repo_url: request.repo_url.clone(),
        repo_type: request.repo.repo_type,
        model: request.model.clone(),
        provider: request.provider,
        language: request.language,
        comprehensive: true,
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: build_prompt(&file_paths),
        }],
        token: request.access_token.clone(),
    };

    let main_page = WikiPage {
        id: format!("all-files-{}", Uuid::new_v4()),
        title: "Full Codebase Overview".to_string(),
        content: String::new(),
        file_paths,
        importance: "high".to_string(),
        related_pages: Vec::new(),
    };

    let cache = WikiCacheEntry {
        repo: request.repo.clone(),
        language: request.language,
        provider: request.provider,
        model: request.model.clone(),
        wiki_structure: WikiStructure {
            id: "root".to_string(),
            title: "Full Codebase Wiki".to_string(),
            description: "Auto-generated wiki".to_string(),
            language: Some(request.language.code().to_string()),
            pages: vec![main_page],
        },
        generated_pages: BTreeMap::new(),
    };

    WikiDraft { cache, trigger }
}
