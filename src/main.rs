use gazetype::config::Config;
use gazetype::events::{EventSender, GazeEvent};
use gazetype::{GazeTyper, feed, ui};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "gazetype")]
struct Cli {
    /// Config file (default: gazetype.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded JSON-lines detection feed
    Replay { feed: PathBuf },
    /// Read detection records from stdin as they arrive
    Live,
    /// Print the configured key layout
    Layout,
}

#[hotpath::main]
fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Command::Replay { feed } => run_replay(&config, &feed),
        Command::Live => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run_live(&config)),
        Command::Layout => {
            ui::print_layout(&config.keyboard.build_targets());
            Ok(())
        }
    }
}

fn run_replay(config: &Config, path: &Path) -> Result<()> {
    let targets = config.keyboard.build_targets();
    let (event_tx, event_rx) = flume::unbounded::<GazeEvent>();
    let mut typer = GazeTyper::from_config(config, &targets, EventSender::new(event_tx));

    let file = File::open(path).with_context(|| format!("opening feed {}", path.display()))?;
    let summary = feed::replay(
        BufReader::new(file),
        &mut typer,
        &config.surface.geometry(),
        &targets,
        config.detection.default_stride,
        Instant::now(),
    )
    .with_context(|| format!("replaying {}", path.display()))?;

    ui::drain(&event_rx);
    log::info!(
        "replayed {} frames, {} commits, calibrated: {}",
        summary.frames,
        summary.commits.len(),
        summary.calibrated
    );
    println!("{}", summary.buffer);
    Ok(())
}

async fn run_live(config: &Config) -> Result<()> {
    let targets = config.keyboard.build_targets();
    let surface = config.surface.geometry();
    let stride = config.detection.default_stride;

    let (event_tx, event_rx) = flume::unbounded::<GazeEvent>();
    let mut typer = GazeTyper::from_config(config, &targets, EventSender::new(event_tx));

    // Stdin reader thread
    let (line_tx, line_rx) = flume::unbounded::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    let (stop_tx, stop_rx) = flume::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    typer.begin_calibration();
    ui::drain(&event_rx);

    loop {
        let deadline = typer.next_deadline();
        let timeout_fut = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            _ = stop_rx.recv_async() => break,

            _ = timeout_fut, if deadline.is_some() => {
                typer.poll(Instant::now());
            }

            line = line_rx.recv_async() => {
                let Ok(line) = line else { break };
                match feed::parse_record(&line) {
                    Ok(Some(record)) => {
                        feed::apply_record(&mut typer, &record, &surface, &targets, stride, Instant::now());
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("skipping record: {}", e),
                }
            }
        }

        ui::drain(&event_rx);
        if let Some(session) = typer.dwell().session() {
            let progress = typer.dwell().progress(Instant::now()).unwrap_or(0.0);
            ui::hover(&session.target.label, progress);
        }
    }

    ui::clear_line();
    println!("{}", typer.buffer().as_str());
    Ok(())
}
