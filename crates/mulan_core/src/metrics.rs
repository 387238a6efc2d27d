//! Run statistics and structured logging.

use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Step-size and population statistics of a model run.
#[derive(Debug, Clone, Serialize)]
pub struct StepMetrics {
    windows: u64,
    integrations: u64,
    min_dt: f64,
    max_dt: f64,
    last_dt: f64,
    #[serde(skip)]
    log_interval: u64,
}

impl Default for StepMetrics {
    fn default() -> Self {
        Self::new(10)
    }
}

impl StepMetrics {
    /// Creates a collector logging every `log_interval` windows.
    #[must_use]
    pub fn new(log_interval: u64) -> Self {
        Self {
            windows: 0,
            integrations: 0,
            min_dt: f64::INFINITY,
            max_dt: 0.0,
            last_dt: 0.0,
            log_interval: log_interval.max(1),
        }
    }

    /// Records one call to the network's `step`.
    pub fn record_dt(&mut self, dt: f64) {
        self.integrations += 1;
        self.min_dt = self.min_dt.min(dt);
        self.max_dt = self.max_dt.max(dt);
        self.last_dt = dt;
    }

    /// Records a completed mutation window.
    pub fn record_window(&mut self, time: f64, producers: i64, consumers: i64) {
        self.windows += 1;
        if self.windows % self.log_interval == 0 {
            tracing::info!(
                window = self.windows,
                time,
                producers,
                consumers,
                integrations = self.integrations,
                min_dt = self.min_dt,
                max_dt = self.max_dt,
                "Simulation window"
            );
        }
    }

    #[must_use]
    pub fn windows(&self) -> u64 {
        self.windows
    }

    #[must_use]
    pub fn integrations(&self) -> u64 {
        self.integrations
    }

    /// Smallest dt used so far, `None` before the first step.
    #[must_use]
    pub fn min_dt(&self) -> Option<f64> {
        (self.integrations > 0).then_some(self.min_dt)
    }

    #[must_use]
    pub fn max_dt(&self) -> Option<f64> {
        (self.integrations > 0).then_some(self.max_dt)
    }

    #[must_use]
    pub fn last_dt(&self) -> f64 {
        self.last_dt
    }
}

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .ok();
}
