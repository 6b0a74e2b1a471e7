// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};

use crate::telemetry::CacheTelemetry;

/// Telemetry settings for a [`TieredCache`](crate::TieredCache).
///
/// Everything is off by default. Shared tier failures are logged regardless.
///
/// # Examples
///
/// ```
/// use strata::TelemetryConfig;
///
/// let config = TelemetryConfig::new().with_logs();
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    /// Creates a configuration with logs and metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a `tracing` event for every tier operation.
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Records OpenTelemetry metrics through a meter obtained from `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    pub(crate) fn build(self) -> CacheTelemetry {
        #[cfg(any(feature = "metrics", test))]
        {
            CacheTelemetry::new(self.logs_enabled, self.meter.as_ref())
        }

        #[cfg(not(any(feature = "metrics", test)))]
        {
            CacheTelemetry::new(self.logs_enabled)
        }
    }
}
