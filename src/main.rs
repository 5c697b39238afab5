//! Eyebreak Agent CLI
//!
//! Privacy-first break reminders with camera-verified look-away enforcement.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{select, unbounded, Receiver};
use eyebreak_agent::{
    camera::{NoopCapture, SharedCaptureBackend, SimulatedCapture},
    config::Config,
    logging::init_logging,
    presenter::ConsolePresenter,
    service::{Command, ReminderService, ServiceNotice},
    timer::{BuiltInTimer, TimerIdentifier},
    transparency::{create_shared_log, create_shared_log_with_persistence, TransparencyLog},
    PRIVACY_DECLARATION, VERSION,
};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "eyebreak")]
#[command(version = VERSION)]
#[command(
    about = "Privacy-first break reminders with camera-verified look-away breaks",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reminder agent in the foreground
    Start {
        /// Use a simulated camera instead of real hardware
        #[arg(long)]
        simulate_camera: bool,

        /// Log at debug level (RUST_LOG overrides)
        #[arg(long, short)]
        verbose: bool,
    },

    /// Pause all reminders
    Pause,

    /// Resume reminders
    Resume,

    /// Preview what the camera sees for a few seconds
    Calibrate {
        /// How long to keep the preview open
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Use a simulated camera instead of real hardware
        #[arg(long)]
        simulate_camera: bool,
    },

    /// Show current status
    Status,

    /// Display the camera privacy declaration
    Privacy,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            simulate_camera,
            verbose,
        } => cmd_start(simulate_camera, verbose),
        Commands::Pause => cmd_set_paused(true),
        Commands::Resume => cmd_set_paused(false),
        Commands::Calibrate {
            seconds,
            simulate_camera,
        } => cmd_calibrate(seconds, simulate_camera),
        Commands::Status => cmd_status(),
        Commands::Privacy => {
            cmd_privacy();
            Ok(())
        }
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_start(simulate_camera: bool, verbose: bool) -> Result<()> {
    init_logging(verbose);

    println!("Eyebreak Agent v{VERSION}");
    println!();

    let config = Config::load().context("could not load configuration")?;

    println!("Starting reminders...");
    print_timer_summary(&config);
    println!(
        "  Look-away enforcement: {}",
        enabled_label(config.enforcement.enabled)
    );
    println!(
        "  Camera: {}",
        if simulate_camera { "simulated" } else { "none" }
    );
    println!();
    println!("Commands: dismiss, skip <timer>, trigger <timer>, pause, resume,");
    println!("          enforce on|off, quit");
    println!("Press Ctrl+C to stop");
    println!();

    let transparency_log = create_shared_log_with_persistence(config.transparency_path());
    let service = ReminderService::new(
        &config,
        camera_backend(simulate_camera),
        ConsolePresenter::new(),
        transparency_log.clone(),
    );
    let handle = service.handle();
    let notices = service.notices();
    let worker = service.spawn();

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut input = spawn_stdin_reader();
    let mut stdin_closed = false;

    // Support pause/resume from another process by polling the config file.
    let mut paused = config.paused;
    if paused {
        println!("Reminders are currently paused.");
        println!("Run `eyebreak resume` to continue.");
        println!();
    }
    let mut last_config_check = Instant::now();

    while running.load(Ordering::SeqCst) {
        if last_config_check.elapsed() >= Duration::from_secs(1) {
            if let Ok(cfg) = Config::load() {
                if cfg.paused != paused {
                    paused = cfg.paused;
                    println!();
                    println!("{} reminders...", if paused { "Pausing" } else { "Resuming" });
                    handle.send(if paused { Command::Pause } else { Command::Resume });
                }
            }
            last_config_check = Instant::now();
        }

        select! {
            recv(notices) -> notice => match notice {
                Ok(notice) => handle_notice(notice),
                Err(_) => {
                    eprintln!("Reminder service stopped unexpectedly");
                    break;
                }
            },
            recv(input) -> line => match line {
                Ok(line) => match parse_command(&line) {
                    Ok(Some(Command::Shutdown)) => break,
                    Ok(Some(command)) => {
                        persist_command(&command, &mut paused);
                        handle.send(command);
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                },
                Err(_) => stdin_closed = true,
            },
            default(Duration::from_millis(100)) => {}
        }

        if stdin_closed {
            // Keep running until Ctrl+C.
            input = crossbeam_channel::never();
            stdin_closed = false;
        }
    }

    println!();
    println!("Stopping...");
    handle.shutdown();
    if worker.join().is_err() {
        warn!("reminder service thread panicked");
    }

    // Final stats
    println!();
    println!("{}", transparency_log.summary());
    Ok(())
}

fn cmd_set_paused(paused: bool) -> Result<()> {
    let mut config = Config::load().context("could not load configuration")?;
    config.paused = paused;
    config.save().context("could not save configuration")?;
    if paused {
        println!("Reminders paused. Use 'eyebreak resume' to continue.");
    } else {
        println!("Reminders resumed.");
    }
    Ok(())
}

fn cmd_calibrate(seconds: u64, simulate_camera: bool) -> Result<()> {
    init_logging(false);
    let config = Config::load().context("could not load configuration")?;

    println!("Camera calibration preview ({seconds}s)");
    println!("=====================================");
    println!();

    // Preview only: no reminders and no persisted statistics.
    let mut preview = config.clone();
    preview.look_away.enabled = false;
    preview.blink.enabled = false;
    preview.posture.enabled = false;
    preview.user_timers.clear();

    let service = ReminderService::new(
        &preview,
        camera_backend(simulate_camera),
        ConsolePresenter::new(),
        create_shared_log(),
    );
    let handle = service.handle();
    let notices = service.notices();
    let worker = service.spawn();

    handle.send(Command::StartTestMode);
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut failed = None;
    while failed.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match notices.recv_timeout(remaining) {
            Ok(ServiceNotice::CameraFailed(error)) => failed = Some(error),
            Ok(ServiceNotice::EnforcementReverted) => {}
            Err(_) => break,
        }
    }

    handle.send(Command::StopTestMode);
    handle.shutdown();
    if worker.join().is_err() {
        warn!("reminder service thread panicked");
    }

    match failed {
        Some(error) => Err(error).context("calibration preview failed"),
        None => {
            println!();
            println!("Calibration preview finished.");
            Ok(())
        }
    }
}

fn cmd_status() -> Result<()> {
    let config = Config::load().context("could not load configuration")?;

    println!("Eyebreak Agent Status");
    println!("=====================");
    println!();

    println!("Configuration:");
    print_timer_summary(&config);
    println!(
        "  Look-away enforcement: {}",
        enabled_label(config.enforcement.enabled)
    );
    println!(
        "  Face detection timeout: {}s",
        config.enforcement.face_detection_timeout.as_secs()
    );
    println!("  Paused: {}", config.paused);
    println!();

    let stats_path = config.transparency_path();
    if stats_path.exists() {
        let stats = TransparencyLog::with_persistence(stats_path).stats();
        println!("Cumulative Statistics:");
        println!("  Reminders shown: {}", stats.reminders_shown);
        println!("  Reminders dismissed: {}", stats.reminders_dismissed);
        println!("  Reminders skipped: {}", stats.reminders_skipped);
        println!("  Camera sessions: {}", stats.camera_sessions);
        println!("  Verified look-away breaks: {}", stats.verified_breaks);
        println!("  Face detection timeouts: {}", stats.face_timeouts);
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_privacy() {
    println!("{PRIVACY_DECLARATION}");
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("could not load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn camera_backend(simulate: bool) -> SharedCaptureBackend {
    if simulate {
        Arc::new(SimulatedCapture::demo())
    } else {
        Arc::new(NoopCapture::new())
    }
}

fn handle_notice(notice: ServiceNotice) {
    match notice {
        ServiceNotice::CameraFailed(error) => {
            println!("Camera unavailable: {error}");
        }
        ServiceNotice::EnforcementReverted => {
            println!("Camera permission denied; look-away enforcement turned off.");
            if let Err(e) = update_config(|cfg| cfg.enforcement.enabled = false) {
                warn!("could not persist enforcement setting: {e:#}");
            }
        }
    }
}

/// Keep the settings store in line with commands typed at the prompt.
fn persist_command(command: &Command, paused: &mut bool) {
    let result = match command {
        Command::Pause => {
            *paused = true;
            update_config(|cfg| cfg.paused = true)
        }
        Command::Resume => {
            *paused = false;
            update_config(|cfg| cfg.paused = false)
        }
        Command::EnableEnforcement => update_config(|cfg| cfg.enforcement.enabled = true),
        Command::DisableEnforcement => update_config(|cfg| cfg.enforcement.enabled = false),
        _ => Ok(()),
    };
    if let Err(e) = result {
        warn!("could not save configuration: {e:#}");
    }
}

fn update_config(apply: impl FnOnce(&mut Config)) -> Result<()> {
    let mut config = Config::load()?;
    apply(&mut config);
    config.save()?;
    Ok(())
}

/// Map a line typed at the prompt to a service command.
fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let timer = |arg: Option<&str>| -> Result<TimerIdentifier, String> {
        arg.unwrap_or(BuiltInTimer::LookAway.as_str()).parse()
    };

    let command = match verb.to_lowercase().as_str() {
        "dismiss" | "d" => Command::DismissReminder,
        "skip" => Command::SkipNext(timer(arg)?),
        "trigger" => Command::TriggerReminder(timer(arg)?),
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "enforce" => match arg {
            Some("on") => Command::EnableEnforcement,
            Some("off") => Command::DisableEnforcement,
            _ => return Err("usage: enforce on|off".to_string()),
        },
        "quit" | "exit" | "q" => Command::Shutdown,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        info!("stdin closed");
    });
    rx
}

fn print_timer_summary(config: &Config) {
    for timer in BuiltInTimer::ALL {
        let cfg = config.built_in(timer);
        println!(
            "  {}: every {}s ({})",
            timer.as_str(),
            cfg.interval_seconds,
            enabled_label(cfg.enabled)
        );
    }
    for timer in &config.user_timers {
        println!(
            "  {} [{}]: every {}s ({})",
            timer.title,
            timer.id,
            timer.interval_seconds,
            enabled_label(timer.enabled)
        );
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_commands() {
        assert_eq!(parse_command("dismiss"), Ok(Some(Command::DismissReminder)));
        assert_eq!(
            parse_command("skip posture"),
            Ok(Some(Command::SkipNext(TimerIdentifier::POSTURE)))
        );
        assert_eq!(
            parse_command("trigger"),
            Ok(Some(Command::TriggerReminder(TimerIdentifier::LOOK_AWAY)))
        );
        assert_eq!(parse_command("enforce on"), Ok(Some(Command::EnableEnforcement)));
        assert_eq!(parse_command("quit"), Ok(Some(Command::Shutdown)));
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_parse_rejects_unknown_input() {
        assert!(parse_command("enforce maybe").is_err());
        assert!(parse_command("skip lunch").is_err());
        assert!(parse_command("reboot").is_err());
    }
}
