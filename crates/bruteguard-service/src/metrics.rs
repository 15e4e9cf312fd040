//! Lightweight Prometheus-compatible metrics using atomic counters.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::access::Decision;
use crate::subnet::ListKind;

const ALL_DECISIONS: [Decision; 4] = [
    Decision::AllowListed,
    Decision::Passed,
    Decision::DenyListed,
    Decision::RateLimited,
];

const ALL_LISTS: [ListKind; 2] = [ListKind::Allow, ListKind::Deny];

struct ListMetrics {
    added_total: AtomicU64,
    removed_total: AtomicU64,
}

impl ListMetrics {
    const fn new() -> Self {
        Self {
            added_total: AtomicU64::new(0),
            removed_total: AtomicU64::new(0),
        }
    }
}

/// Application-wide metrics collected via atomic counters.
pub struct Metrics {
    allow_listed: AtomicU64,
    passed: AtomicU64,
    deny_listed: AtomicU64,
    rate_limited: AtomicU64,
    verify_errors_total: AtomicU64,
    resets_total: AtomicU64,
    allow_list: ListMetrics,
    deny_list: ListMetrics,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            allow_listed: AtomicU64::new(0),
            passed: AtomicU64::new(0),
            deny_listed: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            verify_errors_total: AtomicU64::new(0),
            resets_total: AtomicU64::new(0),
            allow_list: ListMetrics::new(),
            deny_list: ListMetrics::new(),
        }
    }

    fn decision(&self, decision: Decision) -> &AtomicU64 {
        match decision {
            Decision::AllowListed => &self.allow_listed,
            Decision::Passed => &self.passed,
            Decision::DenyListed => &self.deny_listed,
            Decision::RateLimited => &self.rate_limited,
        }
    }

    fn list(&self, kind: ListKind) -> &ListMetrics {
        match kind {
            ListKind::Allow => &self.allow_list,
            ListKind::Deny => &self.deny_list,
        }
    }

    pub fn record_decision(&self, decision: Decision) {
        self.decision(decision).fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verify_error(&self) {
        self.verify_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_list_add(&self, kind: ListKind) {
        self.list(kind).added_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_list_remove(&self, kind: ListKind) {
        self.list(kind).removed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Total verdicts recorded for `decision`.
    pub fn decisions(&self, decision: Decision) -> u64 {
        self.decision(decision).load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self, tracked_keys: usize, uptime_seconds: u64) -> String {
        let mut out = String::with_capacity(1024);

        gauge(
            &mut out,
            "bruteguard_tracked_keys",
            "Keys currently held by the rate limiters",
            tracked_keys,
        );
        gauge(
            &mut out,
            "bruteguard_uptime_seconds",
            "Server uptime in seconds",
            uptime_seconds,
        );

        writeln!(
            out,
            "# HELP bruteguard_verdicts_total Verify verdicts by deciding rule."
        )
        .unwrap();
        writeln!(out, "# TYPE bruteguard_verdicts_total counter").unwrap();
        for decision in ALL_DECISIONS {
            let label = decision.label();
            let allowed = decision.is_allowed();
            let total = self.decisions(decision);
            writeln!(
                out,
                "bruteguard_verdicts_total{{decision=\"{label}\",allowed=\"{allowed}\"}} {total}"
            )
            .unwrap();
        }

        counter(
            &mut out,
            "bruteguard_verify_errors_total",
            "Verify calls that failed on the subnet store",
            self.verify_errors_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "bruteguard_resets_total",
            "Bucket resets",
            self.resets_total.load(Ordering::Relaxed),
        );

        writeln!(out, "# HELP bruteguard_list_changes_total Subnet list mutations.").unwrap();
        writeln!(out, "# TYPE bruteguard_list_changes_total counter").unwrap();
        for kind in ALL_LISTS {
            let m = self.list(kind);
            let label = kind.label();
            let added = m.added_total.load(Ordering::Relaxed);
            let removed = m.removed_total.load(Ordering::Relaxed);
            writeln!(
                out,
                "bruteguard_list_changes_total{{list=\"{label}\",op=\"add\"}} {added}"
            )
            .unwrap();
            writeln!(
                out,
                "bruteguard_list_changes_total{{list=\"{label}\",op=\"remove\"}} {removed}"
            )
            .unwrap();
        }

        out
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} gauge").unwrap();
    writeln!(out, "{name} {value}").unwrap();
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} counter").unwrap();
    writeln!(out, "{name} {value}").unwrap();
}
