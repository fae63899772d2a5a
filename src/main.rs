use taskflow::cli;
use taskflow::config::TaskflowConfig;
use taskflow::observability::init_logging;
use taskflow::pipeline::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real env vars still apply.
    let _ = dotenvy::dotenv();

    let config = TaskflowConfig::from_env()?;
    let _log_guard = init_logging(&config.logging);

    let demo = std::env::args().skip(1).any(|arg| arg == "--demo");

    eprintln!("TaskFlow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Tracker: {}", config.tracker.base_url);
    eprintln!("   Voice: {:?}", config.voice.mode);

    let orchestrator = Orchestrator::from_config(&config)?;
    orchestrator.initialize().await?;

    if demo {
        cli::run_demo(&orchestrator).await;
    } else {
        eprintln!("   Type a task and press Enter. /voice <file>, /email, /memory, /quit\n");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        cli::run_repl(&orchestrator, stdin).await?;
    }

    orchestrator.cleanup().await;
    Ok(())
}
