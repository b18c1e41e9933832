//! Stress Sensor Agent CLI
//!
//! Runs the frame pipeline or the event ingestion service.

use clap::{Parser, Subcommand};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stress_sensor_agent::{
    capture::{FixedRegionDetector, FrameSource, RawFrameReader, Region, RegionDetector},
    config::Config,
    core::FramePipeline,
    recorder::FrameRecorder,
    stats::{load_persisted, PipelineStats},
    VERSION,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(feature = "client")]
use stress_sensor_agent::{BlockingIngestClient, EmitterIdentity, EventEmitter, IngestConfig};

#[derive(Parser)]
#[command(name = "stress-sensor")]
#[command(version = VERSION)]
#[command(about = "Video stress-signal pipeline and event ingestion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a raw 8-bit grayscale frame stream
    Run {
        /// Frame file (reads stdin when omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Frame width in pixels
        #[arg(long)]
        width: usize,

        /// Frame height in pixels
        #[arg(long)]
        height: usize,

        /// Alert threshold on the smoothed score
        #[arg(long)]
        threshold: Option<f64>,

        /// Seconds between one-shot alerts
        #[arg(long)]
        cooldown: Option<f64>,

        /// Seconds between event pushes
        #[arg(long)]
        push_interval: Option<f64>,

        /// Ingestion service base URL
        #[arg(long)]
        api: Option<String>,

        #[arg(long)]
        device_id: Option<String>,

        #[arg(long)]
        user_id: Option<String>,

        /// Record per-frame output to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Do not post events
        #[arg(long)]
        no_emit: bool,

        /// Region of interest as x,y,width,height
        #[arg(long, value_parser = parse_region)]
        region: Option<Region>,

        /// Nominal frame rate used for recorded timestamps
        #[arg(long, default_value = "30")]
        fps: f64,
    },

    /// Start the event ingestion server
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Events kept in memory
        #[arg(long)]
        capacity: Option<usize>,

        /// Durable event log path
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Show cumulative pipeline statistics
    Status,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            width,
            height,
            threshold,
            cooldown,
            push_interval,
            api,
            device_id,
            user_id,
            csv,
            no_emit,
            region,
            fps,
        } => {
            let overrides = RunOverrides {
                threshold,
                cooldown,
                push_interval,
                api,
                device_id,
                user_id,
                no_emit,
                region,
            };
            cmd_run(input, width, height, overrides, csv, fps);
        }
        Commands::Serve {
            port,
            capacity,
            log,
        } => {
            if let Err(e) = cmd_serve(port, capacity, log) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

/// Command-line values that take precedence over the config file.
struct RunOverrides {
    threshold: Option<f64>,
    cooldown: Option<f64>,
    push_interval: Option<f64>,
    api: Option<String>,
    device_id: Option<String>,
    user_id: Option<String>,
    no_emit: bool,
    region: Option<Region>,
}

impl RunOverrides {
    fn apply(self, config: &mut Config) -> Result<(), String> {
        if let Some(t) = self.threshold {
            config.pipeline.threshold = t;
        }
        if let Some(c) = self.cooldown {
            config.pipeline.cooldown = seconds(c, "cooldown")?;
        }
        if let Some(p) = self.push_interval {
            config.emitter.push_interval = seconds(p, "push interval")?;
        }
        if let Some(api) = self.api {
            config.emitter.api_url = api;
        }
        if let Some(id) = self.device_id {
            config.emitter.device_id = id;
        }
        if let Some(id) = self.user_id {
            config.emitter.user_id = id;
        }
        if self.no_emit {
            config.emitter.enabled = false;
        }
        if self.region.is_some() {
            config.pipeline.region = self.region;
        }
        Ok(())
    }
}

fn seconds(value: f64, what: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value).map_err(|e| format!("invalid {what} {value}: {e}"))
}

fn parse_region(s: &str) -> Result<Region, String> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("region must be x,y,width,height: {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] if *w > 0 && *h > 0 => Ok(Region::new(*x, *y, *w, *h)),
        [_, _, _, _] => Err("region width and height must be positive".to_string()),
        _ => Err("region must be x,y,width,height".to_string()),
    }
}

fn cmd_run(
    input: Option<PathBuf>,
    width: usize,
    height: usize,
    overrides: RunOverrides,
    csv: Option<PathBuf>,
    fps: f64,
) {
    println!("Stress Sensor Agent v{VERSION}");
    println!();

    // Load or create configuration; persist on first run so the device id stays stable
    let first_run = !Config::config_path().exists();
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if first_run {
        if let Err(e) = config.save() {
            eprintln!("Warning: Could not save config: {e}");
        }
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    if let Err(e) = overrides.apply(&mut config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let mut source: Box<dyn FrameSource> = match &input {
        Some(path) => match RawFrameReader::open(path, width, height) {
            Ok(reader) => Box::new(reader),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        None => match RawFrameReader::new(BufReader::new(std::io::stdin()), width, height) {
            Ok(reader) => Box::new(reader),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    };

    println!("Starting pipeline...");
    println!(
        "  Input: {}",
        input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdin".to_string())
    );
    println!("  Frame size: {width}x{height}");
    println!("  Threshold: {:.2}", config.pipeline.threshold);
    println!("  Window: {} frames", config.pipeline.window_size);
    println!("  Cooldown: {:.1}s", config.pipeline.cooldown.as_secs_f64());

    #[cfg(feature = "client")]
    let mut emitter = if config.emitter.enabled {
        match create_emitter(&config) {
            Ok(emitter) => {
                println!(
                    "  Emitting to: {} every {:.1}s",
                    config.emitter.api_url,
                    config.emitter.push_interval.as_secs_f64()
                );
                println!("  Device ID: {}", config.emitter.device_id);

                match emitter.transport().test_connection() {
                    Ok(true) => println!("  Ingestion service: OK"),
                    Ok(false) => eprintln!("Warning: Ingestion health check failed"),
                    Err(e) => eprintln!("Warning: Could not reach ingestion service: {e}"),
                }
                Some(emitter)
            }
            Err(e) => {
                eprintln!("Warning: Emitter initialization failed: {e}");
                eprintln!("Continuing without event emission.");
                None
            }
        }
    } else {
        println!("  Emission: disabled");
        None
    };

    #[cfg(not(feature = "client"))]
    if config.emitter.enabled {
        eprintln!("Warning: event emission unavailable (client feature not enabled at compile time)");
    }

    let mut recorder = match csv {
        Some(ref path) => match FrameRecorder::create(path) {
            Ok(recorder) => {
                println!("  Recording to: {}", path.display());
                Some(recorder)
            }
            Err(e) => {
                eprintln!("Warning: Could not create recording {}: {e}", path.display());
                None
            }
        },
        None => None,
    };

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = PipelineStats::with_persistence(config.stats_path());
    let mut detector = FixedRegionDetector::new(config.pipeline.region);
    let mut pipeline = FramePipeline::new(config.pipeline.settings());

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut frame_idx: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(frames = frame_idx, "End of frame stream");
                break;
            }
            Err(e) => {
                tracing::error!("Capture failed: {}", e);
                break;
            }
        };

        let now = Instant::now();
        let region = detector.detect(&frame);
        let report = pipeline.process(&frame, region, now);
        stats.record_frame(&report);

        if report.alert_raised {
            println!(
                "[ALERT] {} | score {:.2} | {}",
                report.state.level, report.smoothed, report.state.route_label
            );
        }

        if let Some(ref mut rec) = recorder {
            let elapsed = frame_time(frame_idx, fps);
            if let Err(e) = rec.record(frame_idx, elapsed, &report) {
                tracing::warn!("Dropping recorder after write failure: {}", e);
                recorder = None;
            }
        }

        #[cfg(feature = "client")]
        if let Some(ref mut emitter) = emitter {
            let outcome = emitter.maybe_emit(now, &report);
            stats.record_emit(&outcome);
        }

        frame_idx += 1;
    }

    println!();
    println!("Stopping pipeline...");

    if let Some(rec) = recorder {
        let rows = rec.rows();
        match rec.finish() {
            Ok(_) => println!("Recorded {rows} frames"),
            Err(e) => eprintln!("Error flushing recording: {e}"),
        }
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save pipeline stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

/// Nominal capture time of a frame; zero when the rate gives no usable time.
fn frame_time(frame_idx: u64, fps: f64) -> Duration {
    if !fps.is_finite() || fps <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(frame_idx as f64 / fps).unwrap_or(Duration::ZERO)
}

#[cfg(feature = "client")]
fn create_emitter(
    config: &Config,
) -> Result<EventEmitter<BlockingIngestClient>, stress_sensor_agent::DeliveryError> {
    let client = BlockingIngestClient::new(IngestConfig::new(
        config.emitter.api_url.clone(),
        config.emitter.timeout,
    ))?;
    let identity = EmitterIdentity {
        device_id: config.emitter.device_id.clone(),
        user_id: config.emitter.user_id.clone(),
    };
    Ok(EventEmitter::new(
        client,
        identity,
        config.emitter.push_interval,
    ))
}

#[cfg(feature = "server")]
fn cmd_serve(
    port: Option<u16>,
    capacity: Option<usize>,
    log: Option<PathBuf>,
) -> anyhow::Result<()> {
    use stress_sensor_agent::server::{self, ServerConfig};

    let config = Config::load().unwrap_or_default();
    let settings = &config.server;

    let mut server_config = ServerConfig::new(
        port.unwrap_or(settings.port),
        capacity.unwrap_or(settings.capacity),
        log.unwrap_or_else(|| settings.log_path.clone()),
    );
    server_config.bind = settings.bind;
    if server_config.capacity == 0 {
        anyhow::bail!("capacity must be at least 1");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (addr, shutdown_tx) = server::run(server_config).await?;

        println!("Stress Sensor Agent v{VERSION}");
        println!("Ingestion server listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        println!();
        println!("Shutting down...");
        let _ = shutdown_tx.send(());
        // Let in-flight requests finish
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(())
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(
    _port: Option<u16>,
    _capacity: Option<usize>,
    _log: Option<PathBuf>,
) -> anyhow::Result<()> {
    anyhow::bail!("server feature not enabled at compile time")
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Stress Sensor Agent Status");
    println!("==========================");
    println!();

    println!("Configuration:");
    println!("  Threshold: {:.2}", config.pipeline.threshold);
    println!("  Window: {} frames", config.pipeline.window_size);
    println!("  Cooldown: {:.1}s", config.pipeline.cooldown.as_secs_f64());
    println!(
        "  Emission: {}",
        if config.emitter.enabled {
            config.emitter.api_url.as_str()
        } else {
            "disabled"
        }
    );
    println!("  Device ID: {}", config.emitter.device_id);
    println!();

    match load_persisted(&config.stats_path()) {
        Ok(Some(stats)) => {
            println!("Cumulative Statistics:");
            println!("  Frames processed: {}", stats.frames_processed);
            println!("  Frames with region: {}", stats.frames_with_region);
            println!("  Alerts raised: {}", stats.alerts_raised);
            println!("  Events delivered: {}", stats.events_delivered);
            println!("  Events rejected: {}", stats.events_rejected);
            println!("  Delivery failures: {}", stats.delivery_failures);
            println!("  Last updated: {}", stats.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        Ok(None) => println!("No previous session data found."),
        Err(e) => eprintln!("Warning: Could not read pipeline stats: {e}"),
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("1, 2,30,40").unwrap(), Region::new(1, 2, 30, 40));
        assert!(parse_region("1,2,0,4").is_err());
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("a,b,c,d").is_err());
    }

    #[test]
    fn test_frame_time() {
        assert_eq!(frame_time(45, 30.0), Duration::from_millis(1500));
        assert_eq!(frame_time(1, 1e-300), Duration::ZERO);
        assert_eq!(frame_time(3, 0.0), Duration::ZERO);
        assert_eq!(frame_time(3, f64::NAN), Duration::ZERO);
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        let overrides = RunOverrides {
            threshold: Some(0.4),
            cooldown: Some(3.0),
            push_interval: None,
            api: Some("http://10.0.0.2:9000".to_string()),
            device_id: None,
            user_id: Some("u7".to_string()),
            no_emit: true,
            region: None,
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.pipeline.threshold, 0.4);
        assert_eq!(config.pipeline.cooldown, Duration::from_secs(3));
        assert_eq!(config.emitter.api_url, "http://10.0.0.2:9000");
        assert_eq!(config.emitter.user_id, "u7");
        assert!(!config.emitter.enabled);
    }
}
