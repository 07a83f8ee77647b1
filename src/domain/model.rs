use crate::utils::error::{DeepWikiError, Result};
use crate::utils::validation::{validate_choice, validate_non_empty_string};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OUTPUT_ROOT: &str = "data";

static REPO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i:https?://(?:www\.)?)(?P<host>(?i:github\.com|gitlab\.com|bitbucket\.org))/(?P<owner>[^/\s?#]+)/(?P<repo>[^/\s?#]+)",
    )
    .expect("repository URL pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Zip,
    #[default]
    Markdown,
    Html,
}

impl OutputFormat {
    pub const ALL: [&'static str; 3] = ["zip", "markdown", "html"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }

    /// 單一文件輸出時使用的檔名；只有 markdown 寫成 .md
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Markdown => "wiki.md",
            Self::Zip | Self::Html => "wiki.html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = DeepWikiError;

    fn from_str(s: &str) -> Result<Self> {
        match validate_choice("format", s, &Self::ALL)?.as_str() {
            "zip" => Ok(Self::Zip),
            "html" => Ok(Self::Html),
            _ => Ok(Self::Markdown),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    #[default]
    En,
    Es,
    Ja,
    Ko,
    Vi,
    PtBr,
    Zh,
    ZhTw,
    Fr,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Self::En,
        Self::Es,
        Self::Ja,
        Self::Ko,
        Self::Vi,
        Self::PtBr,
        Self::Zh,
        Self::ZhTw,
        Self::Fr,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Vi => "vi",
            Self::PtBr => "pt-br",
            Self::Zh => "zh",
            Self::ZhTw => "zh-tw",
            Self::Fr => "fr",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Español",
            Self::Ja => "日本語",
            Self::Ko => "한국어",
            Self::Vi => "Tiếng Việt",
            Self::PtBr => "Português (BR)",
            Self::Zh => "中文",
            Self::ZhTw => "繁體中文",
            Self::Fr => "Français",
        }
    }
}

impl FromStr for Language {
    type Err = DeepWikiError;

    fn from_str(s: &str) -> Result<Self> {
        let codes: Vec<&str> = Self::ALL.iter().map(Language::code).collect();
        let code = validate_choice("language", s, &codes)?;
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| DeepWikiError::InvalidConfigValueError {
                field: "language".to_string(),
                value: s.to_string(),
                reason: format!("Supported values: {}", codes.join(", ")),
            })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Google,
    OpenRouter,
    Ollama,
}

impl Provider {
    pub const ALL: [&'static str; 4] = ["openai", "google", "openrouter", "ollama"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Google => "gemini-2.0-flash",
            Self::OpenRouter => "openai/gpt-4o",
            Self::Ollama => "qwen3:1.7b",
        }
    }

    /// 後端使用的 API key 環境變數；ollama 不需要
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Google => Some("GOOGLE_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::Ollama => None,
        }
    }
}

impl FromStr for Provider {
    type Err = DeepWikiError;

    fn from_str(s: &str) -> Result<Self> {
        match validate_choice("provider", s, &Self::ALL)?.as_str() {
            "google" => Ok(Self::Google),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            _ => Ok(Self::OpenAi),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoHost {
    Github,
    Gitlab,
    Bitbucket,
}

impl RepoHost {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
    #[serde(rename = "type")]
    pub repo_type: RepoHost,
}

impl RepoInfo {
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| DeepWikiError::InvalidConfigValueError {
            field: "repo_url".to_string(),
            value: url.to_string(),
            reason: reason.to_string(),
        };

        let caps = REPO_URL
            .captures(url.trim())
            .ok_or_else(|| invalid("Expected https://{github.com|gitlab.com|bitbucket.org}/<owner>/<repo>"))?;

        let repo_type = match caps["host"].to_ascii_lowercase().as_str() {
            "github.com" => RepoHost::Github,
            "gitlab.com" => RepoHost::Gitlab,
            _ => RepoHost::Bitbucket,
        };
        let repo = caps["repo"].trim_end_matches(".git");
        if repo.is_empty() {
            return Err(invalid("Repository name is empty"));
        }

        Ok(Self {
            owner: caps["owner"].to_string(),
            repo: repo.to_string(),
            repo_type,
        })
    }
}

/// 由 CLI 建立、送往後端的文件生成請求
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentationRequest {
    pub repo_url: String,
    pub repo: RepoInfo,
    pub format: OutputFormat,
    pub language: Language,
    pub provider: Provider,
    pub model: String,
    pub access_token: Option<String>,
    pub output_dir: PathBuf,
}

impl DocumentationRequest {
    pub fn new(repo_url: &str, format: &str, language: &str, provider: &str) -> Result<Self> {
        validate_non_empty_string("repo_url", repo_url)?;
        validate_non_empty_string("format", format)?;
        validate_non_empty_string("language", language)?;
        validate_non_empty_string("provider", provider)?;

        let repo = RepoInfo::parse(repo_url)?;
        let provider: Provider = provider.parse()?;
        let output_dir = PathBuf::from(DEFAULT_OUTPUT_ROOT).join(&repo.repo);

        Ok(Self {
            repo_url: repo_url.trim().to_string(),
            repo,
            format: format.parse()?,
            language: language.parse()?,
            provider,
            model: provider.default_model().to_string(),
            access_token: None,
            output_dir,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// 透過 WebSocket 觸發生成的 payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPayload {
    pub repo_url: String,
    #[serde(rename = "type")]
    pub repo_type: RepoHost,
    pub model: String,
    pub provider: Provider,
    pub language: Language,
    pub comprehensive: bool,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub related_pages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiStructure {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub pages: Vec<WikiPage>,
}

/// `POST /api/wiki_cache` 的內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiCacheEntry {
    pub repo: RepoInfo,
    pub language: Language,
    pub provider: Provider,
    pub model: String,
    pub wiki_structure: WikiStructure,
    pub generated_pages: BTreeMap<String, WikiPage>,
}

/// `GET /api/wiki_cache` 的回應，後端沒有快取時回傳 null
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CachedWiki {
    #[serde(default)]
    pub wiki_structure: Option<WikiStructure>,
    #[serde(default)]
    pub generated_pages: BTreeMap<String, WikiPage>,
}

impl CachedWiki {
    /// 至少有一頁的 wiki 結構
    pub fn pages(&self) -> Option<&[WikiPage]> {
        self.wiki_structure
            .as_ref()
            .map(|s| s.pages.as_slice())
            .filter(|pages| !pages.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub repo_url: String,
    pub format: OutputFormat,
    pub pages: Vec<WikiPage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedWiki {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ExportedWiki {
    pub fn is_archive(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.contains("zip") || content_type.contains("octet-stream")
    }
}

/// 生成前的 wiki 骨架：快取內容加上觸發 payload
#[derive(Debug, Clone, PartialEq)]
pub struct WikiDraft {
    pub cache: WikiCacheEntry,
    pub trigger: GenerationPayload,
}

impl WikiDraft {
    /// 把生成的內容寫進主頁面與 generated_pages
    pub fn populate(&mut self, content: String) -> Result<()> {
        let page = self
            .cache
            .wiki_structure
            .pages
            .first_mut()
            .ok_or_else(|| DeepWikiError::ConfigError {
                message: "wiki draft has no page to populate".to_string(),
            })?;
        page.content = content;

        let page = page.clone();
        self.cache.generated_pages.insert(page.id.clone(), page);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub files: Vec<String>,
}

/// 回報給觀察者的結果：串流片段或最終產物
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentationResult {
    Fragment(String),
    Artifact(Artifact),
}
