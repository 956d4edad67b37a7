//! Metrics collection and reporting

use crate::error::ErrorCategory;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of the service counters
#[derive(Debug, Clone)]
pub struct SystemMetrics {
    /// `/prompt` requests handled
    pub prompt_requests: u64,

    /// Prompts answered with `{error}`
    pub prompt_errors: u64,

    /// Tempest reports analysed
    pub tempest_reports: u64,

    /// Tempest reports rejected before analysis
    pub tempest_report_errors: u64,

    /// RCA entries produced from Tempest reports
    pub tempest_entries: u64,

    /// Average prompt latency (ms)
    pub avg_prompt_time_ms: f64,

    pub uptime_secs: u64,
}

/// Latency histogram buckets (in milliseconds); generation dominates the upper range
const LATENCY_BUCKETS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
];

const CATEGORIES: [ErrorCategory; 5] = [
    ErrorCategory::Validation,
    ErrorCategory::BackendUnavailable,
    ErrorCategory::Fetch,
    ErrorCategory::ModelNotFound,
    ErrorCategory::Internal,
];

fn category_label(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Validation => "validation",
        ErrorCategory::BackendUnavailable => "backend_unavailable",
        ErrorCategory::Fetch => "fetch",
        ErrorCategory::ModelNotFound => "model_not_found",
        ErrorCategory::Internal => "internal",
    }
}

fn category_index(category: ErrorCategory) -> usize {
    match category {
        ErrorCategory::Validation => 0,
        ErrorCategory::BackendUnavailable => 1,
        ErrorCategory::Fetch => 2,
        ErrorCategory::ModelNotFound => 3,
        ErrorCategory::Internal => 4,
    }
}

/// Cumulative latency histogram
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new(buckets: &[f64]) -> Self {
        Self {
            buckets: buckets.iter().map(|&b| (b, AtomicU64::new(0))).collect(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (bucket, counter) in &self.buckets {
            if ms as f64 <= *bucket {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    fn export_prometheus(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} histogram", name);

        for (bucket, counter) in &self.buckets {
            let _ = writeln!(
                out,
                "{}_bucket{{le=\"{}\"}} {}",
                name,
                bucket,
                counter.load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, self.count());
        let _ = writeln!(out, "{}_sum {}", name, self.sum());
        let _ = writeln!(out, "{}_count {}", name, self.count());
    }
}

/// Metrics collector
pub struct MetricsCollector {
    start_time: Instant,
    prompt_requests: AtomicU64,
    prompt_errors: [AtomicU64; 5],
    tempest_reports: AtomicU64,
    tempest_report_errors: [AtomicU64; 5],
    tempest_entries: AtomicU64,

    prompt_latency: Histogram,
    tempest_latency: Histogram,
    embedding_latency: Histogram,
    vector_db_latency: Histogram,
    generation_latency: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            prompt_requests: AtomicU64::new(0),
            prompt_errors: Default::default(),
            tempest_reports: AtomicU64::new(0),
            tempest_report_errors: Default::default(),
            tempest_entries: AtomicU64::new(0),
            prompt_latency: Histogram::new(LATENCY_BUCKETS),
            tempest_latency: Histogram::new(LATENCY_BUCKETS),
            embedding_latency: Histogram::new(LATENCY_BUCKETS),
            vector_db_latency: Histogram::new(LATENCY_BUCKETS),
            generation_latency: Histogram::new(LATENCY_BUCKETS),
        }
    }

    /// Record a completed prompt, successful or not
    pub fn record_prompt(&self, duration: Duration, error: Option<ErrorCategory>) {
        self.prompt_requests.fetch_add(1, Ordering::Relaxed);
        self.prompt_latency.observe(duration);
        if let Some(category) = error {
            self.prompt_errors[category_index(category)].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an analysed Tempest report
    pub fn record_tempest_report(&self, duration: Duration, entries: usize) {
        self.tempest_reports.fetch_add(1, Ordering::Relaxed);
        self.tempest_entries.fetch_add(entries as u64, Ordering::Relaxed);
        self.tempest_latency.observe(duration);
    }

    /// Record a Tempest report rejected before analysis
    pub fn record_tempest_error(&self, category: ErrorCategory) {
        self.tempest_report_errors[category_index(category)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_embedding_latency(&self, duration: Duration) {
        self.embedding_latency.observe(duration);
    }

    pub fn record_vector_db_latency(&self, duration: Duration) {
        self.vector_db_latency.observe(duration);
    }

    pub fn record_generation_latency(&self, duration: Duration) {
        self.generation_latency.observe(duration);
    }

    fn total(counters: &[AtomicU64; 5]) -> u64 {
        counters.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> SystemMetrics {
        let prompt_requests = self.prompt_requests.load(Ordering::Relaxed);
        let avg_prompt_time_ms = if prompt_requests > 0 {
            self.prompt_latency.sum() as f64 / prompt_requests as f64
        } else {
            0.0
        };

        SystemMetrics {
            prompt_requests,
            prompt_errors: Self::total(&self.prompt_errors),
            tempest_reports: self.tempest_reports.load(Ordering::Relaxed),
            tempest_report_errors: Self::total(&self.tempest_report_errors),
            tempest_entries: self.tempest_entries.load(Ordering::Relaxed),
            avg_prompt_time_ms,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics();
        let mut out = String::new();

        let _ = writeln!(out, "# HELP rca_prompt_requests_total Prompts handled");
        let _ = writeln!(out, "# TYPE rca_prompt_requests_total counter");
        let _ = writeln!(out, "rca_prompt_requests_total {}", metrics.prompt_requests);

        let _ = writeln!(out, "# HELP rca_prompt_errors_total Prompts answered with an error");
        let _ = writeln!(out, "# TYPE rca_prompt_errors_total counter");
        for category in CATEGORIES {
            let _ = writeln!(
                out,
                "rca_prompt_errors_total{{category=\"{}\"}} {}",
                category_label(category),
                self.prompt_errors[category_index(category)].load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(out, "# HELP rca_tempest_reports_total Tempest reports analysed");
        let _ = writeln!(out, "# TYPE rca_tempest_reports_total counter");
        let _ = writeln!(out, "rca_tempest_reports_total {}", metrics.tempest_reports);

        let _ = writeln!(out, "# HELP rca_tempest_report_errors_total Tempest reports rejected");
        let _ = writeln!(out, "# TYPE rca_tempest_report_errors_total counter");
        for category in CATEGORIES {
            let _ = writeln!(
                out,
                "rca_tempest_report_errors_total{{category=\"{}\"}} {}",
                category_label(category),
                self.tempest_report_errors[category_index(category)].load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(out, "# HELP rca_tempest_entries_total RCA entries produced from reports");
        let _ = writeln!(out, "# TYPE rca_tempest_entries_total counter");
        let _ = writeln!(out, "rca_tempest_entries_total {}", metrics.tempest_entries);

        let _ = writeln!(out, "# HELP rca_uptime_seconds Uptime in seconds");
        let _ = writeln!(out, "# TYPE rca_uptime_seconds counter");
        let _ = writeln!(out, "rca_uptime_seconds {}", metrics.uptime_secs);

        self.prompt_latency
            .export_prometheus(&mut out, "rca_prompt_duration_ms", "Prompt duration in milliseconds");
        self.tempest_latency.export_prometheus(
            &mut out,
            "rca_tempest_duration_ms",
            "Tempest report analysis duration in milliseconds",
        );
        self.embedding_latency.export_prometheus(
            &mut out,
            "rca_embedding_duration_ms",
            "Embedding request duration in milliseconds",
        );
        self.vector_db_latency.export_prometheus(
            &mut out,
            "rca_vector_search_duration_ms",
            "Vector search duration in milliseconds",
        );
        self.generation_latency.export_prometheus(
            &mut out,
            "rca_generation_duration_ms",
            "Generation request duration in milliseconds",
        );

        out
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
