use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging on stderr so stdout stays parseable
    let filter = EnvFilter::try_from_env("MIGRATE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut stdout = std::io::stdout();
    let code = migrate_runner::cli::run(std::env::args_os(), &mut stdout).await;

    ExitCode::from(code as u8)
}
