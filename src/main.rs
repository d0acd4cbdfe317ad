use anyhow::Context;
use clap::Parser;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use vitals::aggregator::{DataAggregator, DEFAULT_AVERAGE_WINDOW};
use vitals::alerts::AlertManager;
use vitals::config::Config;
use vitals::monitoring::PerformanceMonitor;
use vitals::subscriptions::SubscriptionRegistry;
use vitals::telemetry::{fields, DeviceStatus, Sample, SensorPayload};
use vitals::transport::{SimulatedSource, TelemetrySource};

/// Command-line arguments for the wearable vitals monitor
#[derive(Parser)]
#[command(
    name = "vitals",
    about = "Wearable vitals monitor - stream aggregation and threshold alerting",
    long_about = "Ingests per-device sensor streams into bounded rolling buffers, evaluates \
                  configurable threshold rules against each sample, and tracks the resulting \
                  alerts through their lifecycle."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults; only an existing
            // non-file path is rejected here
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Messages funneled from transport callbacks into the pipeline thread
#[derive(Debug)]
enum PipelineMessage {
    SensorData { device_id: String, payload: SensorPayload },
    DeviceStatus(DeviceStatus),
    Shutdown,
}

/// Battery level below which a device status update is logged as a warning
const LOW_BATTERY_PCT: f64 = 20.0;

/// Main application struct wiring the monitoring pipeline together
///
/// VitalsMonitor owns every component instance explicitly: the aggregator,
/// the alert manager, the subscription registry, and the performance
/// monitor. Transport callbacks run on the source's threads and only send
/// messages; all state mutation happens on the thread driving [`Self::run`].
struct VitalsMonitor {
    config: Config,
    aggregator: DataAggregator,
    alert_manager: AlertManager,
    perf: PerformanceMonitor,
    subscriptions: SubscriptionRegistry,
    sender: Sender<PipelineMessage>,
    receiver: Receiver<PipelineMessage>,
}

impl VitalsMonitor {
    /// Create a monitor from configuration
    fn new(config: Config) -> Self {
        let (sender, receiver) = mpsc::channel();

        let mut alert_manager =
            AlertManager::new(config.firing_mode, config.alerts.history_limit);
        for rule in &config.rules {
            alert_manager.add_rule(rule.clone());
        }

        let aggregator = DataAggregator::new(config.buffer.capacity);

        Self {
            config,
            aggregator,
            alert_manager,
            perf: PerformanceMonitor::new(),
            subscriptions: SubscriptionRegistry::new(),
            sender,
            receiver,
        }
    }

    /// Sender used by signal handlers to request shutdown
    fn shutdown_sender(&self) -> Sender<PipelineMessage> {
        self.sender.clone()
    }

    /// Register subscriptions on the transport for every configured device
    fn start(&mut self, source: &dyn TelemetrySource) {
        info!("Starting vitals monitor components");

        for device_id in self.config.simulator.devices.clone() {
            let sender = self.sender.clone();
            let callback_id = device_id.clone();
            self.subscriptions
                .subscribe(format!("sensor-{}", device_id), || {
                    source.subscribe_sensor_data(
                        &device_id,
                        Box::new(move |payload| {
                            let _ = sender.send(PipelineMessage::SensorData {
                                device_id: callback_id.clone(),
                                payload,
                            });
                        }),
                    )
                });
        }

        let sender = self.sender.clone();
        self.subscriptions.subscribe("device-status", || {
            source.subscribe_device_status(Box::new(move |status| {
                let _ = sender.send(PipelineMessage::DeviceStatus(status));
            }))
        });

        info!(
            "Subscribed to {} telemetry streams",
            self.subscriptions.len()
        );
    }

    /// Drive the pipeline until a shutdown message arrives
    fn run(&mut self) {
        info!("Vitals monitor is running. Press Ctrl+C to stop.");
        while let Ok(message) = self.receiver.recv() {
            if !self.handle_message(message) {
                break;
            }
        }
    }

    /// Process one pipeline message; returns `false` on shutdown
    fn handle_message(&mut self, message: PipelineMessage) -> bool {
        match message {
            PipelineMessage::SensorData { device_id, payload } => {
                self.perf.start_timer("ingest");
                let sample: Sample = payload.into();
                self.aggregator.add_data_point(&device_id, sample.clone());
                self.perf.end_timer("ingest", None);

                self.perf.start_timer("check-alerts");
                self.alert_manager.check_alerts(&device_id, &sample);
                self.perf.end_timer(
                    "check-alerts",
                    Some(serde_json::json!({ "device": device_id })),
                );
                true
            }
            PipelineMessage::DeviceStatus(status) => {
                if status.battery_level < LOW_BATTERY_PCT {
                    warn!(
                        "Device '{}' battery low: {:.0}%",
                        status.id, status.battery_level
                    );
                } else {
                    debug!(
                        "Device '{}' status: {:?}, battery {:.0}%",
                        status.id, status.status, status.battery_level
                    );
                }
                true
            }
            PipelineMessage::Shutdown => {
                info!("Shutdown message received");
                false
            }
        }
    }

    /// Tear down subscriptions and log a run summary
    fn stop(&mut self) {
        info!("Stopping vitals monitor components");
        self.subscriptions.unsubscribe_all();

        for device_id in self.aggregator.stream_ids() {
            let average = self.aggregator.moving_average(
                &device_id,
                fields::HEART_RATE,
                DEFAULT_AVERAGE_WINDOW,
            );
            let trend = self.aggregator.trend(
                &device_id,
                fields::HEART_RATE,
                self.config.statistics.trend_lookback,
            );
            info!(
                "Device '{}': {} samples, heart rate avg {:.1} ({:?})",
                device_id,
                self.aggregator.stream_len(&device_id),
                average,
                trend
            );
        }

        info!(
            "Alerts: {} active, {} in history",
            self.alert_manager.active_alerts().len(),
            self.alert_manager.history_len()
        );

        for (operation, stats) in self.perf.all_stats() {
            info!(
                "Operation '{}': {} samples, avg {:.3}ms, max {:.3}ms",
                operation, stats.count, stats.average_ms, stats.max_ms
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting wearable vitals monitor");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = Config::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    let source = SimulatedSource::new(
        Duration::from_millis(config.simulator.interval_ms),
        config.simulator.devices.clone(),
    );

    let mut monitor = VitalsMonitor::new(config);
    monitor.start(&source);

    let shutdown_sender = monitor.shutdown_sender();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down gracefully...");
        let _ = shutdown_sender.send(PipelineMessage::Shutdown);
    })
    .context("failed to set SIGINT handler")?;

    monitor.run();
    monitor.stop();

    info!("Vitals monitor shutdown complete");
    Ok(())
}
