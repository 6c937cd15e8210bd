//! Structured logging and trace export.
//!
//! Output goes through a non-blocking writer to stdout, stderr or a daily
//! rolling file. Production runs emit JSON lines; everything else gets the
//! pretty formatter. When an OTLP endpoint is configured, spans are also
//! exported through OpenTelemetry.

use anyhow::{Context, Result};
use opentelemetry::{
    KeyValue,
    trace::TraceError,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, Tracer},
};
use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub const SERVICE_NAME: &str = "warehouse-api";

/// Configuration for logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Directory for log files when `output` is [`LogOutput::File`].
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    pub service_name: String,
    pub service_version: String,
    /// Deployment environment, e.g. "development" or "production".
    pub environment: String,
    pub otlp_endpoint: Option<String>,
    /// Trace sampling ratio in `0.0..=1.0`.
    pub otel_sampling_rate: f64,
    pub otlp_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

impl LogOutput {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

fn is_production(environment: &str) -> bool {
    environment == "production" || environment == "prod"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment("development".to_string())
    }
}

impl LoggingConfig {
    fn for_environment(environment: String) -> Self {
        let production = is_production(&environment);
        Self {
            format: if production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: SERVICE_NAME.to_string(),
            service_name: SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            otlp_endpoint: None,
            otel_sampling_rate: if production { 0.1 } else { 1.0 },
            otlp_timeout_secs: 10,
        }
    }

    /// Reads `ENVIRONMENT`, `LOG_FORMAT`, `LOG_OUTPUT`, `LOG_DIR` and the
    /// standard `OTEL_*` variables. Unparseable values keep the default.
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let mut config = Self::for_environment(environment);

        if let Some(format) = env::var("LOG_FORMAT").ok().as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }
        if let Some(output) = env::var("LOG_OUTPUT").ok().as_deref().and_then(LogOutput::parse) {
            config.output = output;
        }
        if let Ok(log_dir) = env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }
        config.otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        if let Some(rate) = env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|raw| raw.parse::<f64>().ok())
        {
            config.otel_sampling_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(secs) = env::var("OTEL_EXPORTER_OTLP_TIMEOUT")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            config.otlp_timeout_secs = secs;
        }

        config
    }

    fn default_directive(&self) -> String {
        let level = if is_production(&self.environment) {
            "info"
        } else {
            "debug"
        };
        format!("{level},hyper=info,tower=info,mongodb=warn")
    }

    fn resource(&self) -> Resource {
        Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                self.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                self.service_version.clone(),
            ),
            KeyValue::new("environment", self.environment.clone()),
        ])
    }

    fn sampler(&self) -> Sampler {
        if self.otel_sampling_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.otel_sampling_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                self.otel_sampling_rate,
            )))
        }
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes buffered log lines when dropped; hold it for
/// the lifetime of the process.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File => {
            std::fs::create_dir_all(&config.log_dir).context("failed to create log directory")?;
            let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
            tracing_appender::non_blocking(appender)
        }
    };

    let otel_layer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => match init_tracer(&config, endpoint) {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                eprintln!(
                    "Warning: failed to initialize OpenTelemetry exporter: {e}. Continuing without trace export."
                );
                None
            }
        },
        None => None,
    };

    let registry = tracing_subscriber::registry().with(otel_layer);

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .with_thread_ids(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_filter(env_filter);
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(config.output != LogOutput::File)
                .with_filter(env_filter);
            registry.with(fmt_layer).init();
        }
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        otlp_endpoint = ?config.otlp_endpoint,
        "logging initialized"
    );

    Ok(Some(guard))
}

/// Installs the batch OTLP pipeline as the global provider and returns its tracer.
fn init_tracer(config: &LoggingConfig, endpoint: &str) -> Result<Tracer, TraceError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_secs));

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(config.sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(config.resource()),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

/// Flushes pending spans. Call once before the process exits.
pub fn shutdown_telemetry() {
    tracing::info!("shutting down telemetry");
    opentelemetry::global::shutdown_tracer_provider();
}

/// Logs at warn when `$duration` exceeds `$threshold_ms`, debug otherwise.
#[macro_export]
macro_rules! log_slow_operation {
    ($duration:expr, $threshold_ms:expr, $($arg:tt)*) => {
        {
            let duration_ms = $duration.as_millis() as u64;
            if duration_ms > $threshold_ms {
                tracing::warn!(
                    duration_ms = duration_ms,
                    threshold_ms = $threshold_ms,
                    $($arg)*
                );
            } else {
                tracing::debug!(
                    duration_ms = duration_ms,
                    $($arg)*
                );
            }
        }
    };
}
