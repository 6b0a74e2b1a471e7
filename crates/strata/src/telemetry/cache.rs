// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge, Histogram, Meter},
};
use tracing::Level;

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::{
    attributes,
    metrics::{create_event_counter, create_operation_duration_histogram, create_size_gauge},
};
use crate::telemetry::{CacheActivity, CacheOperation, TierKind};

#[derive(Debug, Default)]
struct CacheTelemetryInner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    operation_duration: Option<Histogram<f64>>,
    #[cfg(any(feature = "metrics", test))]
    cache_size: Option<Gauge<u64>>,
}

/// Records tier operations as logs and metrics.
#[derive(Clone, Debug, Default)]
pub(crate) struct CacheTelemetry {
    inner: Arc<CacheTelemetryInner>,
}

impl CacheTelemetry {
    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn new(logging_enabled: bool, meter: Option<&Meter>) -> Self {
        Self {
            inner: Arc::new(CacheTelemetryInner {
                logging_enabled,
                event_counter: meter.map(create_event_counter),
                operation_duration: meter.map(create_operation_duration_histogram),
                cache_size: meter.map(create_size_gauge),
            }),
        }
    }

    #[cfg(not(any(feature = "metrics", test)))]
    pub(crate) fn new(logging_enabled: bool) -> Self {
        Self {
            inner: Arc::new(CacheTelemetryInner { logging_enabled }),
        }
    }

    pub(crate) fn record(
        &self,
        cache_name: &'static str,
        tier: TierKind,
        operation: CacheOperation,
        activity: CacheActivity,
        duration: Option<Duration>,
    ) {
        self.count(cache_name, tier, operation, activity, duration);

        if self.inner.logging_enabled {
            Self::emit(cache_name, tier, operation, activity, duration);
        }
    }

    /// Records a shared tier failure that the caller recovered from.
    ///
    /// Always logged, since a silent degradation hides an outage.
    pub(crate) fn degraded(&self, cache_name: &'static str, operation: CacheOperation, error: &dyn Display) {
        self.count(cache_name, TierKind::Shared, operation, CacheActivity::Degraded, None);

        tracing::warn!(
            cache.name = cache_name,
            cache.tier = TierKind::Shared.as_str(),
            cache.operation = operation.as_str(),
            cache.activity = CacheActivity::Degraded.as_str(),
            error = %error,
            "cache.event"
        );
    }

    #[cfg_attr(
        not(any(feature = "metrics", test)),
        expect(unused_variables, reason = "sizes are only reported as metrics")
    )]
    pub(crate) fn record_size(&self, cache_name: &'static str, size: u64) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(gauge) = &self.inner.cache_size {
            gauge.record(size, &[KeyValue::new(attributes::CACHE_NAME, cache_name)]);
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", test)),
        expect(unused_variables, reason = "counting needs the metrics feature")
    )]
    fn count(&self, cache_name: &'static str, tier: TierKind, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        {
            let attrs = [
                KeyValue::new(attributes::CACHE_NAME, cache_name),
                KeyValue::new(attributes::CACHE_TIER, tier.as_str()),
                KeyValue::new(attributes::CACHE_OPERATION, operation.as_str()),
                KeyValue::new(attributes::CACHE_ACTIVITY, activity.as_str()),
            ];

            if let Some(counter) = &self.inner.event_counter {
                counter.add(1, &attrs);
            }

            if let (Some(d), Some(histogram)) = (duration, &self.inner.operation_duration) {
                histogram.record(d.as_secs_f64(), &attrs);
            }
        }
    }

    fn emit(cache_name: &'static str, tier: TierKind, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        let tier = tier.as_str();
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // The level of a tracing event must be a constant, hence one arm per level. Field
        // names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.tier = tier,
                    cache.operation = op,
                    cache.activity = act,
                    cache.duration_ns = ?duration_ns,
                    "cache.event"
                )
            };
        }

        match activity.level() {
            Level::ERROR => emit_event!(error),
            Level::WARN => emit_event!(warn),
            Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::metrics::MeterProvider;

    use super::*;
    use crate::telemetry::testing::{LogCapture, MetricTester};

    #[test]
    fn record_emits_metric_attributes() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("strata");
        let telemetry = CacheTelemetry::new(false, Some(&meter));

        telemetry.record(
            "reports",
            TierKind::Shared,
            CacheOperation::Get,
            CacheActivity::Hit,
            Some(Duration::from_millis(3)),
        );

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::CACHE_NAME, "reports"),
            KeyValue::new(attributes::CACHE_TIER, "shared"),
            KeyValue::new(attributes::CACHE_OPERATION, "cache.get"),
            KeyValue::new(attributes::CACHE_ACTIVITY, "cache.hit"),
        ]);
    }

    #[test]
    fn record_size_tags_the_cache_name() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("strata");
        let telemetry = CacheTelemetry::new(false, Some(&meter));

        telemetry.record_size("sized", 12);

        tester.assert_attributes_contain(&[KeyValue::new(attributes::CACHE_NAME, "sized")]);
    }

    #[test]
    fn emit_writes_every_field() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        CacheTelemetry::emit(
            "reports",
            TierKind::Local,
            CacheOperation::Invalidate,
            CacheActivity::Invalidated,
            Some(Duration::from_nanos(777)),
        );

        capture.assert_contains(attributes::CACHE_NAME);
        capture.assert_contains(attributes::CACHE_TIER);
        capture.assert_contains(attributes::CACHE_OPERATION);
        capture.assert_contains(attributes::CACHE_ACTIVITY);
        capture.assert_contains(attributes::CACHE_DURATION);
        capture.assert_contains(attributes::CACHE_EVENT);
        capture.assert_contains("reports");
        capture.assert_contains("cache.invalidated");
        capture.assert_contains("777");
    }

    #[test]
    fn emit_uses_the_activity_level() {
        for (activity, level) in [
            (CacheActivity::Error, "ERROR"),
            (CacheActivity::Degraded, "WARN"),
            (CacheActivity::Promoted, "INFO"),
            (CacheActivity::Miss, "DEBUG"),
        ] {
            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            CacheTelemetry::emit("cache", TierKind::Local, CacheOperation::Get, activity, None);
            capture.assert_contains(level);
        }
    }

    #[test]
    fn disabled_logging_is_silent() {
        let telemetry = CacheTelemetry::new(false, None);
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("cache", TierKind::Local, CacheOperation::Get, CacheActivity::Hit, None);

        assert!(capture.output().is_empty());
    }

    #[test]
    fn degraded_is_logged_even_when_logging_is_disabled() {
        let telemetry = CacheTelemetry::new(false, None);
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.degraded("cache", CacheOperation::Insert, &"connection refused");

        capture.assert_contains("WARN");
        capture.assert_contains("cache.degraded");
        capture.assert_contains("connection refused");
    }
}
