use std::process;

use voxshade_core::{refine_dataset, RefineConfig};

mod cli;
mod logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let parsed = match cli::parse_args(&args) {
        Ok(cli::Command::Refine(parsed)) => parsed,
        Ok(cli::Command::Help) => {
            println!("{}", cli::usage());
            return;
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", cli::usage());
            process::exit(2);
        }
    };

    let config = match &parsed.config {
        Some(path) => match RefineConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                process::exit(1);
            }
        },
        None => RefineConfig::default(),
    };
    let level = match logging::parse_level(&config.log_level) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };
    logging::setup_tracing(level);

    tracing::info!(dataset = %parsed.paths.dataset.display(), "voxshade starting");
    match refine_dataset(&parsed.paths, &config, Some(logging::progress_sink())) {
        Ok(output) => {
            if let Some(last) = output.history.last() {
                tracing::info!(total = last.total, data = last.data, "done");
            }
        }
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
