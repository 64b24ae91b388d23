use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::process::ExitCode;
use timelapse::args::Cli;
use timelapse::config::load_config;
use timelapse::{Progress, RunContext, RunSummary, Timelapse};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                return ExitCode::FAILURE;
            }
        },
    };
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let work_dir = std::env::current_dir().context("resolving current directory")?;
    let cfg = load_config(&work_dir)?;
    let ctx = RunContext::new(work_dir, cli.into_run_config());
    let maker = Timelapse::with_config(cfg)?;

    println!(
        "Creating timelapse: {} ({} fps)",
        ctx.config.output.display(),
        ctx.config.fps
    );

    let mut progress_bar: Option<ProgressBar> = None;
    let result = maker.create(&ctx, |progress: Progress| {
        let pb = progress_bar.get_or_insert_with(|| {
            let pb = ProgressBar::with_draw_target(Some(progress.total as u64), ProgressDrawTarget::stdout());
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message("Timestamping frames");
            pb
        });
        pb.set_position(progress.completed as u64);
    });
    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message("Done");
    }

    report(&result?, ctx.config.fps);
    Ok(())
}

fn report(summary: &RunSummary, fps: u32) {
    if summary.cache_reused {
        println!("Reused {} timestamped frames from cache", summary.frames);
    } else if summary.stamped > 0 {
        println!("Timestamped {} frames", summary.stamped);
    }
    println!(
        "Created timelapse: {} ({} fps, {} frames)",
        summary.output.display(),
        fps,
        summary.frames
    );
}
