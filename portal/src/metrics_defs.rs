use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to answer an API request in seconds. Tagged with status, handler.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "API requests currently being answered",
};

pub const RESPONSE_FALLBACK: MetricDef = MetricDef {
    name: "response.fallback",
    metric_type: MetricType::Counter,
    description: "API responses built from a fallback payload. Tagged with handler.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, REQUESTS_INFLIGHT, RESPONSE_FALLBACK];
