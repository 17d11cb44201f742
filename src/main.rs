use ethgen::config::{self, ConfigLayer, TrafficConfig};
use ethgen::engine;
use ethgen::error::{Error, Result};
use ethgen::interfaces;
use ethgen::sink::{FrameSink, PcapFileSink};
use ethgen::stats::Stats;
use ethgen::ui;
mod cmd;

use std::fs;
use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::bounded;

/// The entry point of the application.
///
/// Fatal errors are reported before any frame is sent, and the process
/// exits with status 1.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    if args.list {
        println!("Available network interfaces:");
        for iface in interfaces::list_interfaces() {
            println!("{iface}");
        }
        return;
    }

    if let Err(e) = generate(&args) {
        log::error!("{e}");
        process::exit(1);
    }
}

/// Merges the configuration file (if any) with the command line
fn resolve_config(args: &cmd::Args) -> Result<TrafficConfig> {
    let file_layer = match &args.config {
        Some(path) => config::import_config(&fs::read_to_string(path)?)?,
        None => ConfigLayer::default(),
    };
    let config = file_layer.overlay(args.layer()).into_config();
    if args.outfile.is_none() && config.interface.is_empty() {
        return Err(Error::Configuration(
            "an interface is required (-i) unless --outfile is used".to_string(),
        ));
    }
    log::debug!("Configuration: {config:?}");
    Ok(config)
}

fn generate(args: &cmd::Args) -> Result<()> {
    let config = resolve_config(args)?;
    // fail before opening anything
    config.validate()?;
    ethgen::frame::build(&config)?;

    let mut sink: Box<dyn FrameSink> = match &args.outfile {
        Some(outfile) => Box::new(PcapFileSink::create(outfile)?),
        None => {
            log::info!("Opening {} ({:?} backend)", config.interface, args.backend);
            args.backend.open(&config.interface)?
        }
    };

    // Handle ctrl+C: the first one stops the send loop at the next tick
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let mut stop_tx = Some(stop_tx);
    ctrlc::set_handler(move || {
        if stop_tx.take().is_some() {
            log::warn!("Ending the generation");
        } else {
            log::warn!("Ending immediately");
            process::abort();
        }
    })?;

    let stats = Arc::new(Stats::new());
    let (report_tx, report_rx) = bounded::<()>(1);
    let reporter = {
        let stats = Arc::clone(&stats);
        thread::Builder::new()
            .name("Monitoring".into())
            .spawn(move || ui::run(stats, report_rx))?
    };

    let outcome = engine::run(&mut sink, &config, &stats, &stop_rx);
    sink.close();

    // Tell the reporter to stop and wait for its last report
    drop(report_tx);
    if reporter.join().is_err() {
        log::error!("The monitoring thread panicked");
    }

    let ticks = outcome?;
    log::info!("Traffic generation completed ({ticks} ticks)");
    Ok(())
}
