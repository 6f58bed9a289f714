//! Metrics definitions for the resilient fetcher.

use shared::metrics_defs::{MetricDef, MetricType};

pub const FETCH_ATTEMPT_FAILED: MetricDef = MetricDef {
    name: "fetch.attempt.failed",
    metric_type: MetricType::Counter,
    description: "Endpoint attempts that failed. Tagged with route, kind.",
};

pub const FETCH_OUTCOME: MetricDef = MetricDef {
    name: "fetch.outcome",
    metric_type: MetricType::Counter,
    description: "Completed orchestration runs. Tagged with route, provenance.",
};

pub const FETCH_DURATION: MetricDef = MetricDef {
    name: "fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time from first attempt to outcome in seconds. Tagged with route.",
};

pub const ALL_METRICS: &[MetricDef] = &[FETCH_ATTEMPT_FAILED, FETCH_OUTCOME, FETCH_DURATION];
