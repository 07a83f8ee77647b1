use crate::config::settings::Settings;
use crate::domain::model::DocumentationRequest;
use crate::utils::error::{DeepWikiError, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "deepwiki-explorer")]
#[command(version)]
#[command(about = "Generate a full wiki for a repository through a DeepWiki-Open backend")]
pub struct CliArgs {
    /// Repository URL, e.g. https://github.com/owner/repo (GitHub, GitLab or Bitbucket)
    pub repo_url: String,

    /// Output format: zip, markdown or html [default: markdown]
    pub format: Option<String>,

    /// Wiki language: en, es, ja, ko, vi, pt-br, zh, zh-tw, fr [default: en]
    pub language: Option<String>,

    /// Model provider: openai, google, openrouter, ollama [default: openai]
    pub provider: Option<String>,

    /// Model identifier (defaults to the provider's default model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory to write results into [default: ./data/<repo name>]
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Access token for private repositories
    #[arg(short = 't', long = "token", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// The repository is private; an access token is required
    #[arg(long)]
    pub private: bool,

    /// Settings file [default: ./deepwiki.toml when present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print generated text to stdout as it streams in
    #[arg(long)]
    pub stream: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// 建立請求；所有列舉值在任何網路呼叫之前驗證
    pub fn to_request(&self, settings: &Settings) -> Result<DocumentationRequest> {
        let defaults = &settings.defaults;
        let format = self.format.as_deref().unwrap_or(&defaults.format);
        let language = self.language.as_deref().unwrap_or(&defaults.language);
        let provider = self.provider.as_deref().unwrap_or(&defaults.provider);

        let mut request = DocumentationRequest::new(&self.repo_url, format, language, provider)?;

        // 只有在沿用設定檔的 provider 時才套用設定檔的模型
        let configured_model = if self.provider.is_none() {
            defaults.model.clone()
        } else {
            None
        };
        if let Some(model) = self.model.clone().or(configured_model) {
            request = request.with_model(model);
        }

        let token = self.token.clone().filter(|t| !t.trim().is_empty());
        if self.private && token.is_none() {
            return Err(DeepWikiError::MissingConfigError {
                field: "token (required for private repositories; use --token or GITHUB_TOKEN)"
                    .to_string(),
            });
        }
        request = request.with_access_token(token);

        let output_dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => Path::new(&defaults.output_root).join(&request.repo.repo),
        };

        Ok(request.with_output_dir(output_dir))
    }
}

/// clap 解析失敗時的結束碼：說明與版本為 0，用法錯誤與請求錯誤同為 1
pub fn parse_exit_code(error: &clap::Error) -> u8 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Language, OutputFormat, Provider};

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["deepwiki-explorer"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_four_positionals_build_request() {
        let args = parse(&[
            "https://github.com/owner/repo",
            "zip",
            "zh-tw",
            "openrouter",
            "--token",
            "ghp_test",
        ]);
        let request = args.to_request(&Settings::default()).unwrap();

        assert_eq!(request.repo_url, "https://github.com/owner/repo");
        assert_eq!(request.format, OutputFormat::Zip);
        assert_eq!(request.language, Language::ZhTw);
        assert_eq!(request.provider, Provider::OpenRouter);
        assert_eq!(request.model, "openai/gpt-4o");
        assert_eq!(request.access_token.as_deref(), Some("ghp_test"));
        assert_eq!(request.output_dir, PathBuf::from("data").join("repo"));
    }

    #[test]
    fn test_missing_positionals_use_defaults() {
        let args = parse(&["https://gitlab.com/group/project.git", "-o", "/tmp/wiki"]);
        let mut settings = Settings::default();
        settings.defaults.language = "fr".to_string();
        settings.defaults.model = Some("gpt-4.1".to_string());

        let request = args.to_request(&settings).unwrap();

        assert_eq!(request.format, OutputFormat::Markdown);
        assert_eq!(request.language, Language::Fr);
        assert_eq!(request.provider, Provider::OpenAi);
        assert_eq!(request.model, "gpt-4.1");
        assert_eq!(request.repo.repo, "project");
        assert_eq!(request.output_dir, PathBuf::from("/tmp/wiki"));
    }

    #[test]
    fn test_explicit_provider_ignores_configured_model() {
        let args = parse(&["https://github.com/o/r", "html", "en", "ollama"]);
        let mut settings = Settings::default();
        settings.defaults.model = Some("gpt-4.1".to_string());

        let request = args.to_request(&settings).unwrap();
        assert_eq!(request.model, "qwen3:1.7b");

        let args = parse(&["https://github.com/o/r", "html", "en", "ollama", "-m", "llama3"]);
        assert_eq!(args.to_request(&settings).unwrap().model, "llama3");
    }

    #[test]
    fn test_unsupported_values_fail_before_any_call() {
        let settings = Settings::default();

        for argv in [
            vec!["https://github.com/o/r", "pdf"],
            vec!["https://github.com/o/r", "zip", "klingon"],
            vec!["https://github.com/o/r", "zip", "en", "watson"],
            vec!["https://sourceforge.net/o/r"],
        ] {
            let err = parse(&argv).to_request(&settings).unwrap_err();
            assert!(
                matches!(err, DeepWikiError::InvalidConfigValueError { .. }),
                "{:?} should be rejected, got {:?}",
                argv,
                err
            );
            assert_ne!(err.exit_code(), 0);
        }
    }

    #[test]
    fn test_private_repo_requires_token() {
        let mut args = parse(&["https://github.com/o/r", "--private"]);
        args.token = None;

        let err = args.to_request(&Settings::default()).unwrap_err();
        assert!(matches!(err, DeepWikiError::MissingConfigError { .. }));

        args.token = Some("ghp_x".to_string());
        assert!(args.to_request(&Settings::default()).is_ok());
    }

    #[test]
    fn test_usage_errors_exit_with_request_error_code() {
        for argv in [
            vec!["deepwiki-explorer", "https://github.com/o/r", "zip", "en", "openai", "extra"],
            vec!["deepwiki-explorer", "https://github.com/o/r", "--no-such-flag"],
            vec!["deepwiki-explorer"],
        ] {
            let err = CliArgs::try_parse_from(argv.clone()).unwrap_err();
            assert_eq!(parse_exit_code(&err), 1, "{:?}", argv);
        }

        for flag in ["--help", "--version"] {
            let err = CliArgs::try_parse_from(["deepwiki-explorer", flag]).unwrap_err();
            assert_eq!(parse_exit_code(&err), 0, "{}", flag);
        }
    }

    #[test]
    fn test_at_most_four_positionals() {
        let result = CliArgs::try_parse_from([
            "deepwiki-explorer",
            "https://github.com/o/r",
            "zip",
            "en",
            "openai",
            "extra",
        ]);
        assert!(result.is_err());
    }
}
