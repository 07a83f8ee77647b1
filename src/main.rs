use clap::Parser;
use deepwiki_explorer::config::cli::parse_exit_code;
use deepwiki_explorer::utils::logger;
use deepwiki_explorer::{app, CliArgs, DocumentationResult};
use std::io::Write;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // .env 不存在時忽略
    dotenvy::dotenv().ok();

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_exit_code(&e));
        }
    };

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting deepwiki-explorer");
    if args.verbose {
        tracing::debug!("CLI args: repo={}, config={:?}", args.repo_url, args.config);
    }

    // 串流模式：邊收邊印生成內容
    let (observer, printer) = if args.stream {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut stdout = std::io::stdout();
            while let Some(result) = rx.recv().await {
                if let DocumentationResult::Fragment(fragment) = result {
                    let _ = stdout.write_all(fragment.as_bytes());
                    let _ = stdout.flush();
                }
            }
            let _ = writeln!(stdout);
        });
        (Some(tx), Some(handle))
    } else {
        (None, None)
    };

    let outcome = app::run(&args, observer).await;

    if let Some(handle) = printer {
        let _ = handle.await;
    }

    match outcome {
        Ok(artifact) => {
            tracing::info!("✅ Wiki export completed successfully!");
            println!("✅ Wiki export completed successfully!");
            for file in &artifact.files {
                println!("📁 {}", artifact.output_dir.join(file).display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Wiki export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            ExitCode::from(e.exit_code())
        }
    }
}
