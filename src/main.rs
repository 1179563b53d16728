//! Command-line driver for replaying recorded keypoint traces through the capture engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use face_capture::{
    angle_validator::CaptureTargetAngle,
    config::{Config, EXAMPLE_CONFIG},
    pump::FramePump,
    session::{CaptureSession, FrameReport, FrameSink, MultiAngleSession, SessionEvent},
    trace::Trace,
    utils::SolidFrame,
};
use log::{info, warn};
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<String>,

    /// Threshold preset used when no config file is given (default, strict, lenient)
    #[arg(long, global = true, default_value = "default")]
    preset: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded keypoint trace and print guidance for every frame
    Replay {
        /// Trace file (YAML)
        #[arg(short, long)]
        trace: PathBuf,

        /// Capture target (none, front, left, right, sequence)
        #[arg(short = 'T', long, default_value = "none")]
        target: String,

        /// Directory to write captured frames to as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat the face as lit by a torch or screen flash
        #[arg(long)]
        torch: bool,
    },
    /// Print an example configuration file
    Config,
}

fn load_config(args: &Args) -> Config {
    if let Some(path) = &args.config {
        info!("Loading configuration from: {}", path);
        match Config::from_file(path) {
            Ok(cfg) => return cfg,
            Err(e) => warn!("Failed to load config file: {}. Using defaults.", e),
        }
    }
    match args.preset.as_str() {
        "strict" => Config::strict(),
        "lenient" => Config::lenient(),
        "default" => Config::default(),
        other => {
            warn!("Unknown preset '{}', using defaults", other);
            Config::default()
        }
    }
}

fn print_report(t_ms: u64, report: &FrameReport<SolidFrame>) {
    let angles = report.angles.map_or_else(
        || "-".to_string(),
        |a| format!("yaw {:+.1} pitch {:+.1} roll {:+.1}", a.yaw, a.pitch, a.roll),
    );
    let countdown = report.countdown.map_or_else(String::new, |c| format!(" [{c}]"));
    println!(
        "{:>7} ms  {:<10} {:>3.0}%{}  {:<32} {}",
        t_ms,
        format!("{:?}", report.stage),
        report.stability_progress * 100.0,
        countdown,
        report.alignment.message,
        angles,
    );
}

fn print_events(events: &[SessionEvent<SolidFrame>], captures: &mut Vec<(Option<CaptureTargetAngle>, SolidFrame)>) {
    for event in events {
        match event {
            SessionEvent::StageChanged { from, to } => println!("          stage {from:?} -> {to:?}"),
            SessionEvent::Captured { target, image } => {
                println!("          captured ({})", target.map_or_else(|| "single".to_string(), |t| t.to_string()));
                captures.push((*target, *image));
            }
            SessionEvent::AllComplete(_) => println!("          all angles captured"),
        }
    }
}

fn replay<S: FrameSink<SolidFrame>>(trace: &Trace, sink: S, config: &Config) -> Vec<(Option<CaptureTargetAngle>, SolidFrame)> {
    let mut pump = FramePump::new(trace.detector(), sink);
    let mut captures = Vec::new();
    let t0 = Instant::now();

    for frame in &trace.frames {
        let now = t0 + Trace::offset(frame);
        match pump.pump(&trace.image(frame), now) {
            Some(report) => {
                print_report(frame.t_ms, &report);
                print_events(&report.events, &mut captures);
            }
            None => {
                info!("Session finished at {} ms", frame.t_ms);
                break;
            }
        }
    }

    // Let a capture triggered near the end of the trace run to completion
    let settle = Duration::from_millis(config.stages.scanning_ms + config.stages.processing_ms);
    let events = pump.tick(t0 + trace.duration() + settle);
    print_events(&events, &mut captures);

    pump.shutdown();
    captures
}

fn save_captures(dir: &Path, captures: &[(Option<CaptureTargetAngle>, SolidFrame)]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (i, (target, frame)) in captures.iter().enumerate() {
        let name = target.map_or_else(|| format!("capture_{i}.png"), |t| format!("capture_{i}_{t}.png"));
        let path = dir.join(name);
        frame
            .to_image()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    match &args.command {
        Command::Config => {
            print!("{EXAMPLE_CONFIG}");
            Ok(())
        }
        Command::Replay {
            trace,
            target,
            output,
            torch,
        } => {
            let config = load_config(&args);
            let trace = Trace::from_file(trace).with_context(|| format!("loading trace {}", trace.display()))?;
            info!("Replaying {} frames at {}x{}", trace.frames.len(), trace.width, trace.height);

            let captures = match target.as_str() {
                "sequence" => {
                    let mut session = MultiAngleSession::new(&config)?;
                    session.set_supplemental_light(*torch);
                    replay(&trace, session, &config)
                }
                "none" => {
                    let mut session = CaptureSession::new(&config, None)?;
                    session.set_supplemental_light(*torch);
                    replay(&trace, session, &config)
                }
                other => {
                    let angle: CaptureTargetAngle = other.parse()?;
                    let mut session = CaptureSession::new(&config, Some(angle))?;
                    session.set_supplemental_light(*torch);
                    replay(&trace, session, &config)
                }
            };

            println!("{} capture(s)", captures.len());
            if let Some(dir) = output {
                save_captures(dir, &captures)?;
            }
            Ok(())
        }
    }
}
