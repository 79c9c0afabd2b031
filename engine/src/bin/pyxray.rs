use pyxray::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Verbosity maps onto the tracing filter; diagnostics go to stderr, leaving
/// stdout for structured output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,pyxray=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = match cli::Cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version print through clap and exit clean.
            if e.use_stderr() {
                eprint!("{e}");
                std::process::exit(1);
            }
            print!("{e}");
            std::process::exit(0);
        }
    };

    init_tracing(cli.verbose);
    let code = cli::run(cli).await;
    std::process::exit(code);
}
