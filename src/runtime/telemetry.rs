//! Tracing bootstrap and rolling counters for provisioning runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls
/// back to `info`. Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters recorded across provisioning runs.
#[derive(Default, Debug)]
pub struct Telemetry {
    trainings: AtomicU64,
    warmups: AtomicU64,
    evaluations: AtomicU64,
    probes: AtomicU64,
    warnings: AtomicU64,
}

impl Telemetry {
    pub fn record_training(&self) {
        self.trainings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warmup(&self) {
        self.warmups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            trainings: self.trainings.load(Ordering::Relaxed),
            warmups: self.warmups.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the [`Telemetry`] counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub trainings: u64,
    pub warmups: u64,
    pub evaluations: u64,
    pub probes: u64,
    pub warnings: u64,
}
