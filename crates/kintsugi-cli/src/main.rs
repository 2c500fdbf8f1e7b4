mod cli;
mod cmd;
mod config_gen;
mod format;
mod progress;
mod prompt;

use clap::Parser;

use kintsugi_core::config;

use cli::{Cli, Commands};
use config_gen::run_config_generate;
use progress::ProgressSafeStderr;

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn exit_error(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .with_writer(ProgressSafeStderr)
        .init();

    // `config` needs no config file; handle it before resolution.
    if let Commands::Config { dest } = &cli.command {
        run_config_generate(dest.as_deref()).unwrap_or_else(|e| exit_error(e));
        return;
    }

    let (cfg, source) =
        config::load_or_default(cli.config.as_deref()).unwrap_or_else(|e| exit_error(e));
    match &source {
        Some(source) => tracing::info!("Using config: {source}"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    let result = match &cli.command {
        Commands::Download { url, out, jobs } => cmd::download::run_download(
            &cfg,
            url.as_deref(),
            out.as_deref(),
            jobs.map(|v| v as usize),
        ),
        Commands::Info { url, json } => cmd::info::run_info(&cfg, url, *json),
        Commands::Unscramble { image, key, out } => {
            cmd::unscramble::run_unscramble(image, key, out.as_deref())
        }
        Commands::Config { .. } => Err("'config' is handled before config resolution".into()),
    };

    if let Err(e) = result {
        exit_error(e);
    }
}
