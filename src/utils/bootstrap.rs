//! Process initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing.
///
/// `RUST_LOG` takes precedence when set; otherwise the configured level
/// applies to the whole process.
///
/// With the `otel` feature an OTLP metrics exporter is also installed so
/// the instruments in [`crate::utils::metrics`] are exported; without it
/// they record into a no-op provider.
pub fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    #[cfg(feature = "otel")]
    init_otel_metrics();
}

/// Install an OTLP metric exporter as the global meter provider.
///
/// Endpoint and resource attributes follow the standard
/// `OTEL_EXPORTER_OTLP_*` environment variables.
#[cfg(feature = "otel")]
fn init_otel_metrics() {
    let exporter = match opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to init OTLP metrics exporter: {e}");
            return;
        }
    };

    let reader =
        opentelemetry_sdk::metrics::PeriodicReader::builder(exporter, opentelemetry_sdk::runtime::Tokio)
            .build();

    let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_reader(reader)
        .build();

    opentelemetry::global::set_meter_provider(provider);
}
