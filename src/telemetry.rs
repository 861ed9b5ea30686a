//! Tracing/logging bootstrap, with optional OpenTelemetry OTLP export.
//!
//! Every daemon binary calls [`Telemetry::init`] once at the top of `main`.
//! Plain structured logging via `tracing-subscriber`'s `EnvFilter` + `fmt`
//! layer is always installed; OTLP trace/metric export is layered in only
//! when both the `telemetry` Cargo feature is compiled in and the standard
//! `OTEL_EXPORTER_OTLP_*` environment variables are present, so a daemon
//! with no collector configured never pays for the exporter machinery.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(feature = "telemetry")]
mod otel {
    use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
    use opentelemetry_sdk::Resource;
    use opentelemetry_sdk::metrics::{MeterProviderBuilder, PeriodicReader, SdkMeterProvider};
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
    use opentelemetry_semantic_conventions::SCHEMA_URL;
    use opentelemetry_semantic_conventions::attribute::{
        DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_VERSION,
    };
    use std::env;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Protocol {
        Http,
        Grpc,
    }

    impl Protocol {
        pub fn from_env() -> Option<Self> {
            let configured = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok()
                || env::var("OTEL_EXPORTER_OTLP_HEADERS").is_ok()
                || env::var("OTEL_EXPORTER_OTLP_PROTOCOL").is_ok();
            if !configured {
                return None;
            }
            Some(match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
                Ok("grpc") => Protocol::Grpc,
                _ => Protocol::Http,
            })
        }
    }

    fn resource(service_name: &'static str) -> Resource {
        let deployment_env =
            env::var("BRIDGE_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Resource::builder()
            .with_service_name(service_name)
            .with_schema_url(
                [
                    KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                    KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, deployment_env),
                ],
                SCHEMA_URL,
            )
            .build()
    }

    pub fn init_meter_provider(protocol: Protocol, service_name: &'static str) -> SdkMeterProvider {
        let exporter = opentelemetry_otlp::MetricExporter::builder();
        let exporter = match protocol {
            Protocol::Http => exporter
                .with_http()
                .with_temporality(opentelemetry_sdk::metrics::Temporality::default())
                .build(),
            Protocol::Grpc => exporter
                .with_tonic()
                .with_temporality(opentelemetry_sdk::metrics::Temporality::default())
                .build(),
        }
        .expect("failed to build OTLP metric exporter");

        let reader = PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(30))
            .build();

        let meter_provider = MeterProviderBuilder::default()
            .with_resource(resource(service_name))
            .with_reader(reader)
            .build();

        global::set_meter_provider(meter_provider.clone());
        meter_provider
    }

    pub fn init_tracer_provider(protocol: Protocol, service_name: &'static str) -> SdkTracerProvider {
        let exporter = opentelemetry_otlp::SpanExporter::builder();
        let exporter = match protocol {
            Protocol::Http => exporter.with_http().build(),
            Protocol::Grpc => exporter.with_tonic().build(),
        }
        .expect("failed to build OTLP span exporter");

        SdkTracerProvider::builder()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                1.0,
            ))))
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource(service_name))
            .with_batch_exporter(exporter)
            .build()
    }
}

/// Owns the OpenTelemetry providers (if any) so they can be flushed cleanly
/// when the daemon shuts down; dropping this is the last thing `main` does.
pub struct Telemetry {
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<otel::SdkTracerProvider>,
    #[cfg(feature = "telemetry")]
    meter_provider: Option<otel::SdkMeterProvider>,
}

impl Telemetry {
    /// Initializes the global `tracing` subscriber for `service_name`.
    ///
    /// `service_name` should be a daemon's binary name (`"bridge-validator"`,
    /// `"bridge-relay"`, ...) and is attached to every exported span/metric
    /// as the OpenTelemetry resource's `service.name`.
    #[cfg(feature = "telemetry")]
    pub fn init(service_name: &'static str) -> Self {
        match otel::Protocol::from_env() {
            Some(protocol) => {
                let tracer_provider = otel::init_tracer_provider(protocol, service_name);
                let meter_provider = otel::init_meter_provider(protocol, service_name);
                let tracer =
                    opentelemetry::trace::TracerProvider::tracer(&tracer_provider, "bridge");

                tracing_subscriber::registry()
                    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                    .with(tracing_subscriber::fmt::layer())
                    .with(tracing_opentelemetry::MetricsLayer::new(
                        meter_provider.clone(),
                    ))
                    .with(tracing_opentelemetry::OpenTelemetryLayer::new(tracer))
                    .init();

                tracing::info!(?protocol, "OpenTelemetry export enabled");
                Self {
                    tracer_provider: Some(tracer_provider),
                    meter_provider: Some(meter_provider),
                }
            }
            None => {
                tracing_subscriber::registry()
                    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                    .with(tracing_subscriber::fmt::layer())
                    .init();
                tracing::info!("OpenTelemetry export disabled, logging locally only");
                Self {
                    tracer_provider: None,
                    meter_provider: None,
                }
            }
        }
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn init(service_name: &'static str) -> Self {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(tracing_subscriber::fmt::layer())
            .init();
        tracing::info!(service_name, "logging initialized (telemetry feature disabled)");
        Self {}
    }
}

#[cfg(feature = "telemetry")]
impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Some(tracer_provider) = self.tracer_provider.as_ref() {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {err:?}");
            }
        }
        if let Some(meter_provider) = self.meter_provider.as_ref() {
            if let Err(err) = meter_provider.shutdown() {
                eprintln!("failed to shut down meter provider: {err:?}");
            }
        }
    }
}
