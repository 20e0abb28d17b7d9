use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe metrics collector for the order adapter.
#[derive(Debug)]
pub struct AdapterMetrics {
    // Counters
    reports_processed: AtomicU64,
    unknown_order_reports: AtomicU64,
    submissions: AtomicU64,
    submission_rejections: AtomicU64,
    bulk_cancels: AtomicU64,
    modification_rejections: AtomicU64,
    connection_losses: AtomicU64,

    connected: AtomicBool,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_report_time: Option<Instant>,
    last_rejection_time: Option<Instant>,
}

impl Default for AdapterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterMetrics {
    pub fn new() -> Self {
        Self {
            reports_processed: AtomicU64::new(0),
            unknown_order_reports: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
            submission_rejections: AtomicU64::new(0),
            bulk_cancels: AtomicU64::new(0),
            modification_rejections: AtomicU64::new(0),
            connection_losses: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_report_time: None,
                last_rejection_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_reports_processed(&self) {
        self.reports_processed.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_report_time = Some(Instant::now());
    }

    pub fn inc_unknown_order_reports(&self) {
        self.unknown_order_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_submissions(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_submission_rejections(&self) {
        self.submission_rejections.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_rejection_time = Some(Instant::now());
    }

    pub fn inc_bulk_cancels(&self) {
        self.bulk_cancels.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_modification_rejections(&self) {
        self.modification_rejections.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_rejection_time = Some(Instant::now());
    }

    pub fn mark_connection_lost(&self) {
        if self.connected.swap(false, Ordering::Relaxed) {
            self.connection_losses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn mark_connection_restored(&self) {
        self.connected.store(true, Ordering::Relaxed);
    }

    // --- Getter methods ---

    pub fn reports_processed(&self) -> u64 {
        self.reports_processed.load(Ordering::Relaxed)
    }

    pub fn unknown_order_reports(&self) -> u64 {
        self.unknown_order_reports.load(Ordering::Relaxed)
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    pub fn submission_rejections(&self) -> u64 {
        self.submission_rejections.load(Ordering::Relaxed)
    }

    pub fn bulk_cancels(&self) -> u64 {
        self.bulk_cancels.load(Ordering::Relaxed)
    }

    pub fn modification_rejections(&self) -> u64 {
        self.modification_rejections.load(Ordering::Relaxed)
    }

    pub fn connection_losses(&self) -> u64 {
        self.connection_losses.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_report(&self) -> Option<f64> {
        self.inner
            .read()
            .last_report_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_rejection(&self) -> Option<f64> {
        self.inner
            .read()
            .last_rejection_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_processed: self.reports_processed(),
            unknown_order_reports: self.unknown_order_reports(),
            submissions: self.submissions(),
            submission_rejections: self.submission_rejections(),
            bulk_cancels: self.bulk_cancels(),
            modification_rejections: self.modification_rejections(),
            connection_losses: self.connection_losses(),
            connected: self.is_connected(),
            uptime_secs: self.uptime_secs(),
            secs_since_last_report: self.secs_since_last_report(),
            secs_since_last_rejection: self.secs_since_last_rejection(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub reports_processed: u64,
    pub unknown_order_reports: u64,
    pub submissions: u64,
    pub submission_rejections: u64,
    pub bulk_cancels: u64,
    pub modification_rejections: u64,
    pub connection_losses: u64,
    pub connected: bool,
    pub uptime_secs: f64,
    pub secs_since_last_report: Option<f64>,
    pub secs_since_last_rejection: Option<f64>,
}

/// Health status of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Connected and submissions mostly accepted.
    Healthy,
    /// Connected, but most submissions are being rejected.
    Degraded,
    /// Transport connection is down.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Submissions needed before the rejection ratio is taken into account.
    const MIN_SUBMISSIONS: u64 = 5;

    /// Share of submissions that must be rejected to count as degraded.
    pub fn rejection_ratio(&self) -> f64 {
        if self.submissions == 0 {
            0.0
        } else {
            self.submission_rejections as f64 / self.submissions as f64
        }
    }

    /// Determine the health status based on metrics.
    pub fn health_status(&self) -> HealthStatus {
        if !self.connected {
            return HealthStatus::Unhealthy;
        }
        if self.submissions >= Self::MIN_SUBMISSIONS && self.rejection_ratio() > 0.5 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Adapter Metrics ===")?;
        writeln!(f, "Uptime:                  {:.1}s", self.uptime_secs)?;
        writeln!(f, "Connected:               {}", self.connected)?;
        writeln!(f, "Reports processed:       {}", self.reports_processed)?;
        writeln!(f, "Unknown-order reports:   {}", self.unknown_order_reports)?;
        writeln!(f, "Submissions:             {}", self.submissions)?;
        writeln!(f, "Submission rejections:   {}", self.submission_rejections)?;
        writeln!(f, "Bulk cancels:            {}", self.bulk_cancels)?;
        writeln!(f, "Modification rejections: {}", self.modification_rejections)?;
        writeln!(f, "Connection losses:       {}", self.connection_losses)?;
        if let Some(secs) = self.secs_since_last_report {
            writeln!(f, "Since last report:       {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_rejection {
            writeln!(f, "Since last rejection:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<AdapterMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(AdapterMetrics::new())
}
