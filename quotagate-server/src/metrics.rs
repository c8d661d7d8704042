//! Simple metrics collection for observability
//!
//! Atomic counters only, exported in Prometheus text format at `/metrics`.

use quotagate::DenyReason;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Core metrics collected by the server
pub struct Metrics {
    start_time: Instant,

    pub total_requests: AtomicU64,

    /// Requests by endpoint
    pub generate_requests: AtomicU64,
    pub check_requests: AtomicU64,
    pub catalog_requests: AtomicU64,
    pub usage_requests: AtomicU64,

    /// Entitlement decisions
    pub requests_allowed: AtomicU64,
    pub denied_quota: AtomicU64,
    pub denied_rate_limited: AtomicU64,
    pub denied_unknown_tier: AtomicU64,
    pub requests_errors: AtomicU64,

    /// Generation service outcomes after an allowed admission
    pub generation_failures: AtomicU64,
    pub generation_timeouts: AtomicU64,

    /// Request latency buckets (in microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_under_10ms: AtomicU64,
    pub latency_under_100ms: AtomicU64,
    pub latency_under_1s: AtomicU64,
    pub latency_over_1s: AtomicU64,

    pub latency_sum_micros: AtomicU64,
    pub latency_count: AtomicU64,
}

/// Endpoint type for metrics tracking
#[derive(Debug, Clone, Copy)]
pub enum Endpoint {
    Generate,
    Check,
    Catalog,
    Usage,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            generate_requests: AtomicU64::new(0),
            check_requests: AtomicU64::new(0),
            catalog_requests: AtomicU64::new(0),
            usage_requests: AtomicU64::new(0),
            requests_allowed: AtomicU64::new(0),
            denied_quota: AtomicU64::new(0),
            denied_rate_limited: AtomicU64::new(0),
            denied_unknown_tier: AtomicU64::new(0),
            requests_errors: AtomicU64::new(0),
            generation_failures: AtomicU64::new(0),
            generation_timeouts: AtomicU64::new(0),
            latency_under_1ms: AtomicU64::new(0),
            latency_under_10ms: AtomicU64::new(0),
            latency_under_100ms: AtomicU64::new(0),
            latency_under_1s: AtomicU64::new(0),
            latency_over_1s: AtomicU64::new(0),
            latency_sum_micros: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }

    /// Record a decided request and its latency
    ///
    /// `denied` is the denial reason, or `None` when the request was allowed.
    pub fn record_request(&self, endpoint: Endpoint, latency_us: u64, denied: Option<DenyReason>) {
        self.count_request(endpoint, latency_us);

        let counter = match denied {
            None => &self.requests_allowed,
            Some(DenyReason::RateLimited) => &self.denied_rate_limited,
            Some(DenyReason::UnknownTier) => &self.denied_unknown_tier,
            Some(_) => &self.denied_quota,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an internal error
    pub fn record_error(&self, endpoint: Endpoint, latency_us: u64) {
        self.count_request(endpoint, latency_us);
        self.requests_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generation request whose generator produced no output
    pub fn record_generation_failure(&self, endpoint: Endpoint, latency_us: u64, timed_out: bool) {
        self.count_request(endpoint, latency_us);

        if timed_out {
            self.generation_timeouts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.generation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn count_request(&self, endpoint: Endpoint, latency_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match endpoint {
            Endpoint::Generate => self.generate_requests.fetch_add(1, Ordering::Relaxed),
            Endpoint::Check => self.check_requests.fetch_add(1, Ordering::Relaxed),
            Endpoint::Catalog => self.catalog_requests.fetch_add(1, Ordering::Relaxed),
            Endpoint::Usage => self.usage_requests.fetch_add(1, Ordering::Relaxed),
        };

        match latency_us {
            0..=999 => self.latency_under_1ms.fetch_add(1, Ordering::Relaxed),
            1000..=9999 => self.latency_under_10ms.fetch_add(1, Ordering::Relaxed),
            10000..=99999 => self.latency_under_100ms.fetch_add(1, Ordering::Relaxed),
            100000..=999999 => self.latency_under_1s.fetch_add(1, Ordering::Relaxed),
            _ => self.latency_over_1s.fetch_add(1, Ordering::Relaxed),
        };

        self.latency_sum_micros
            .fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        gauge(
            &mut output,
            "quotagate_uptime_seconds",
            "Time since server start in seconds",
            self.uptime_seconds(),
        );
        counter(
            &mut output,
            "quotagate_requests_total",
            "Total number of requests processed",
            load(&self.total_requests),
        );

        header(
            &mut output,
            "quotagate_requests_by_endpoint",
            "Total requests by endpoint",
            "counter",
        );
        for (endpoint, value) in [
            ("generate", &self.generate_requests),
            ("check", &self.check_requests),
            ("catalog", &self.catalog_requests),
            ("usage", &self.usage_requests),
        ] {
            let _ = writeln!(
                output,
                "quotagate_requests_by_endpoint{{endpoint=\"{endpoint}\"}} {}",
                load(value)
            );
        }
        output.push('\n');

        counter(
            &mut output,
            "quotagate_requests_allowed",
            "Total requests allowed",
            load(&self.requests_allowed),
        );

        header(
            &mut output,
            "quotagate_requests_denied",
            "Total requests denied by reason class",
            "counter",
        );
        for (reason, value) in [
            ("quota", &self.denied_quota),
            ("rate_limited", &self.denied_rate_limited),
            ("unknown_tier", &self.denied_unknown_tier),
        ] {
            let _ = writeln!(
                output,
                "quotagate_requests_denied{{reason=\"{reason}\"}} {}",
                load(value)
            );
        }
        output.push('\n');

        counter(
            &mut output,
            "quotagate_requests_errors",
            "Total internal errors",
            load(&self.requests_errors),
        );

        header(
            &mut output,
            "quotagate_generation_failures",
            "Generations that produced no output",
            "counter",
        );
        let _ = writeln!(
            output,
            "quotagate_generation_failures{{kind=\"error\"}} {}",
            load(&self.generation_failures)
        );
        let _ = writeln!(
            output,
            "quotagate_generation_failures{{kind=\"timeout\"}} {}\n",
            load(&self.generation_timeouts)
        );

        header(
            &mut output,
            "quotagate_request_duration",
            "Request latency distribution",
            "histogram",
        );
        let mut cumulative = 0;
        for (le, bucket) in [
            ("0.001", &self.latency_under_1ms),
            ("0.01", &self.latency_under_10ms),
            ("0.1", &self.latency_under_100ms),
            ("1", &self.latency_under_1s),
        ] {
            cumulative += load(bucket);
            let _ = writeln!(
                output,
                "quotagate_request_duration_bucket{{le=\"{le}\"}} {cumulative}"
            );
        }
        let _ = writeln!(
            output,
            "quotagate_request_duration_bucket{{le=\"+Inf\"}} {}",
            load(&self.latency_count)
        );

        let latency_sum_seconds = load(&self.latency_sum_micros) as f64 / 1_000_000.0;
        let _ = writeln!(
            output,
            "quotagate_request_duration_sum {latency_sum_seconds:.6}"
        );
        let _ = writeln!(
            output,
            "quotagate_request_duration_count {}",
            load(&self.latency_count)
        );

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn header(output: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {kind}");
}

fn counter(output: &mut String, name: &str, help: &str, value: u64) {
    header(output, name, help, "counter");
    let _ = writeln!(output, "{name} {value}\n");
}

fn gauge(output: &mut String, name: &str, help: &str, value: u64) {
    header(output, name, help, "gauge");
    let _ = writeln!(output, "{name} {value}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.denied_quota.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.requests_errors.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_denials_are_classified() {
        let metrics = Metrics::new();

        metrics.record_request(Endpoint::Generate, 500, None);
        metrics.record_request(Endpoint::Generate, 500, Some(DenyReason::DailyQuotaExceeded));
        metrics.record_request(Endpoint::Catalog, 500, Some(DenyReason::TotalCatalogQuotaExceeded));
        metrics.record_request(Endpoint::Generate, 500, Some(DenyReason::RateLimited));
        metrics.record_request(Endpoint::Check, 500, Some(DenyReason::UnknownTier));

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.generate_requests.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.denied_quota.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.denied_rate_limited.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.denied_unknown_tier.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_generation_failure_is_not_an_allow() {
        let metrics = Metrics::new();

        metrics.record_generation_failure(Endpoint::Generate, 500, false);

        assert_eq!(metrics.generate_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.generation_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.requests_errors.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_latency_buckets() {
        let metrics = Metrics::new();

        metrics.record_request(Endpoint::Usage, 500, None); // < 1ms
        metrics.record_request(Endpoint::Usage, 5000, None); // < 10ms
        metrics.record_request(Endpoint::Usage, 50000, None); // < 100ms
        metrics.record_request(Endpoint::Usage, 500000, None); // < 1s
        metrics.record_error(Endpoint::Usage, 5000000); // > 1s

        assert_eq!(metrics.latency_under_1ms.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_under_10ms.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_under_100ms.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_under_1s.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_over_1s.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();

        metrics.record_request(Endpoint::Generate, 500, None);
        metrics.record_request(Endpoint::Catalog, 1500, Some(DenyReason::WeeklyCatalogQuotaExceeded));
        metrics.record_generation_failure(Endpoint::Generate, 2500, true);

        let output = metrics.export_prometheus();

        assert!(output.contains("quotagate_uptime_seconds"));
        assert!(output.contains("quotagate_requests_total 3"));
        assert!(output.contains("quotagate_requests_allowed 1"));
        assert!(output.contains("quotagate_requests_denied{reason=\"quota\"} 1"));
        assert!(output.contains("quotagate_requests_by_endpoint{endpoint=\"catalog\"} 1"));
        assert!(output.contains("quotagate_generation_failures{kind=\"timeout\"} 1"));
        assert!(output.contains("quotagate_request_duration_bucket{le=\"0.01\"} 3"));
        assert!(output.contains("quotagate_request_duration_bucket{le=\"+Inf\"} 3"));
    }
}
