use sqawk::engine::SqliteEngine;
use sqawk::observability::{init_logging, log_run_config, log_run_summary};
use sqawk::output::TabularEmitter;
use sqawk::{cli, runner};

use anyhow::Result;
use std::io::{self, Write};
use tracing::info;

fn main() {
    if let Err(e) = run() {
        let _ = io::stdout().flush();
        eprintln!("FATAL: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    dotenv::dotenv().ok();

    let matches = cli::command().get_matches();
    init_logging(matches.get_flag("verbose"));

    let config = cli::build_config(&matches)?;
    if config.verbose {
        log_run_config(&config);
    }

    let mut engine = SqliteEngine::open(&config.database, config.engine_options())?;
    let mut emitter = TabularEmitter::new(io::stdout());
    let mut skipped = io::stdout();

    let log = runner::run(&config, &mut engine, &mut emitter, &mut skipped);
    emitter.flush()?;
    let log = log?;

    log_run_summary(&log);
    info!("Done");
    Ok(())
}
