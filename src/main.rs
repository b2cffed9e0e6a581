use mongshell::config::ConfigLoader;
use mongshell::error::ShellError;
use mongshell::repl;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    // Initialize tracing (respects RUST_LOG env var); stdout belongs to commands
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mongsh: {}; using defaults", ShellError::from(e));
            ConfigLoader::default_config()
        }
    };
    tracing::debug!(?config, "configuration loaded");

    let status = repl::start(config);
    std::process::exit(status);
}
