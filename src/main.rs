use clap::Parser;
use eyre::Result;
use std::io;
use taskflow::cli::{self, Cli};
use taskflow::config::{self, CONFIG_FILE, Config};
use taskflow::TaskStore;
use tracing::Level;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing on stderr so command output stays clean
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let store_path = cli.store_path.clone().unwrap_or_else(config::default_store_path);
    let config_path = cli.config.clone().unwrap_or_else(|| store_path.join(CONFIG_FILE));

    let mut config = Config::load(&config_path)?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if !config.color {
        colored::control::set_override(false);
    }

    // Open store
    let backend = config::open_backend(config.backend, &store_path)?;
    let mut store = TaskStore::open(backend);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    cli::run(cli.command, &mut store, &mut out, &mut input)?;

    cli::finish(store, &mut out)?;

    Ok(())
}
