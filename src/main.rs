use anyhow::Result;
use clap::Parser;
use nectar::{cli::Cli, orchestrate};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = orchestrate::RunConfig {
        logs_dir: args.logs_dir,
        output: args.output,
        validation_log: args.validation_log,
        jobs: args.jobs,
    };

    let code = orchestrate::run(&config)?;
    std::process::exit(code);
}
