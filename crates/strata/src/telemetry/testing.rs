// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Log and metric capture for tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics, ScopeMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
use tracing_subscriber::fmt::MakeWriter;

/// Collects exported metrics in memory.
#[derive(Debug)]
pub(crate) struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl MetricTester {
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();

        Self {
            exporter: exporter.clone(),
            provider: SdkMeterProvider::builder().with_periodic_exporter(exporter).build(),
        }
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    pub fn collect_attributes(&self) -> Vec<KeyValue> {
        self.provider.force_flush().expect("metrics should flush");
        self.exporter
            .get_finished_metrics()
            .expect("metrics should be readable")
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .flat_map(attributes_of)
            .collect()
    }

    pub fn assert_attributes_contain(&self, expected: &[KeyValue]) {
        let attributes = self.collect_attributes();

        for attr in expected {
            assert!(
                attributes.contains(attr),
                "attribute {attr:?} not found in collected attributes: {attributes:?}"
            );
        }
    }
}

macro_rules! point_attributes {
    ($data:expr) => {
        match $data {
            MetricData::Gauge(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
            MetricData::Sum(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
            MetricData::Histogram(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
            MetricData::ExponentialHistogram(data) => data.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
        }
    };
}

fn attributes_of(metric: &Metric) -> Vec<KeyValue> {
    match metric.data() {
        AggregatedMetrics::F64(data) => point_attributes!(data),
        AggregatedMetrics::U64(data) => point_attributes!(data),
        AggregatedMetrics::I64(data) => point_attributes!(data),
    }
}

/// Captures formatted `tracing` output in a buffer.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().expect("log buffer poisoned")).to_string()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "log output does not contain '{expected}', got:\n{output}");
    }

    /// A subscriber writing into this capture; install with `tracing::subscriber::set_default`.
    pub fn subscriber(&self) -> impl tracing::Subscriber {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

pub(crate) struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().expect("log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
