//! `GET /api/aws-health` and `GET /api/google-health`: recent provider
//! status events as one flat item list.
//!
//! AWS publishes an RSS feed, Google Cloud a JSON incident list. Both are
//! mapped onto [`HealthItem`]. Items without a timestamp are stamped with
//! the response time, which keeps the normalizers pure.

use crate::api::utils::{Envelope, fetch_route, now_iso, ok_json};
use crate::config::UpstreamConfig;
use crate::errors::PortalError;
use crate::handler::RouteHandler;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use fetcher::validate::{non_blank, parse_json};
use fetcher::{
    FetchRoute, Orchestrator, RawResponse, RequestTemplate, StaticFallback, ValidationError,
};
use http::Method;
use hyper::{Request, Response};
use serde::Serialize;
use serde_json::Value;

const MAX_ITEMS: usize = 20;
const MAX_DESCRIPTION_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthItem {
    pub title: String,
    pub description: String,
    pub pub_date: Option<String>,
    pub guid: String,
}

impl HealthItem {
    fn stamped(mut self, now: &str) -> Self {
        if self.pub_date.is_none() {
            self.pub_date = Some(now.to_string());
        }
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedPayload {
    items: Vec<HealthItem>,
    last_updated: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFeed {
    Aws,
    Google,
}

impl StatusFeed {
    fn handler_name(&self) -> &'static str {
        match self {
            StatusFeed::Aws => "aws_health",
            StatusFeed::Google => "google_health",
        }
    }

    fn upstream_name(&self) -> &'static str {
        match self {
            StatusFeed::Aws => "aws_status",
            StatusFeed::Google => "google_status",
        }
    }

    fn accept(&self) -> &'static str {
        match self {
            StatusFeed::Aws => "application/rss+xml, application/xml, text/xml",
            StatusFeed::Google => "application/json",
        }
    }

    fn template(&self) -> RequestTemplate {
        match self {
            StatusFeed::Aws => RequestTemplate::new(["rss", "all.rss"]),
            StatusFeed::Google => RequestTemplate::new(["incidents.json"]),
        }
    }

    fn normalizer(&self) -> fn(&RawResponse) -> Result<Vec<HealthItem>, ValidationError> {
        match self {
            StatusFeed::Aws => normalize_rss,
            StatusFeed::Google => normalize_incidents,
        }
    }

    fn fallback(&self) -> Vec<HealthItem> {
        let (title, description) = match self {
            StatusFeed::Aws => (
                "[GLOBAL] Service is operating normally",
                "All AWS services are currently operational",
            ),
            StatusFeed::Google => (
                "[GLOBAL] All Google Cloud services operating normally",
                "All Google Cloud Platform services are currently operational",
            ),
        };

        vec![HealthItem {
            title: title.to_string(),
            description: description.to_string(),
            pub_date: None,
            guid: "fallback-1".to_string(),
        }]
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Stands in for a publication date that is present but unreadable, so the
/// entry survives parsing and gets stamped like an undated fallback item.
const UNREADABLE_DATE: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Feed timestamps in the formats status pages actually emit: RFC 2822,
/// RFC 3339, and bare `YYYY-MM-DD[ HH:MM[:SS]]` taken as UTC.
fn parse_feed_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Parses an RSS (or Atom) feed. Entries need a title and a publication
/// date element; an unreadable date is left for the handler to stamp.
pub fn normalize_rss(response: &RawResponse) -> Result<Vec<HealthItem>, ValidationError> {
    let feed = feed_rs::parser::Builder::new()
        .timestamp_parser(|text: &str| parse_feed_date(text).or(Some(UNREADABLE_DATE)))
        .build()
        .parse(response.body.as_ref())
        .map_err(|e| ValidationError::shape(format!("body is not a feed: {e}")))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content.trim().to_string())?;
            let published = entry.published?;
            if title.is_empty() {
                return None;
            }

            Some(HealthItem {
                title,
                description: entry
                    .summary
                    .map(|s| truncate_chars(s.content.trim(), MAX_DESCRIPTION_CHARS))
                    .unwrap_or_default(),
                pub_date: (published != UNREADABLE_DATE)
                    .then(|| published.to_rfc3339_opts(SecondsFormat::Millis, true)),
                guid: entry.id,
            })
        })
        .take(MAX_ITEMS)
        .collect();

    Ok(items)
}

/// Google Cloud incidents. Accepts a top-level array or an object with an
/// `incidents` array.
pub fn normalize_incidents(response: &RawResponse) -> Result<Vec<HealthItem>, ValidationError> {
    let incidents = match parse_json::<Value>(response)? {
        Value::Array(incidents) => incidents,
        Value::Object(mut object) => match object.remove("incidents") {
            Some(Value::Array(incidents)) => incidents,
            _ => return Err(ValidationError::missing("incidents")),
        },
        _ => {
            return Err(ValidationError::shape(
                "expected an incident array or object",
            ));
        }
    };

    let text = |incident: &Value, key: &str| {
        non_blank(incident.get(key).and_then(Value::as_str)).map(|s| s.trim().to_string())
    };

    let items = incidents
        .iter()
        .enumerate()
        .filter_map(|(index, incident)| {
            let title = text(incident, "title").or_else(|| text(incident, "external_desc"))?;
            let service = text(incident, "service_name").unwrap_or_else(|| "GLOBAL".to_string());

            Some(HealthItem {
                title: format!("[{service}] {title}"),
                description: text(incident, "description")
                    .unwrap_or_else(|| "Google Cloud service incident".to_string()),
                pub_date: text(incident, "begin"),
                guid: text(incident, "id").unwrap_or_else(|| format!("google-{index}")),
            })
        })
        .take(MAX_ITEMS)
        .collect();

    Ok(items)
}

pub struct StatusFeedHandler {
    feed: StatusFeed,
    orchestrator: Orchestrator,
    route: FetchRoute<Vec<HealthItem>>,
}

impl StatusFeedHandler {
    pub fn new(
        feed: StatusFeed,
        orchestrator: Orchestrator,
        upstream: &UpstreamConfig,
    ) -> Result<Self, PortalError> {
        let route = fetch_route(
            feed.upstream_name(),
            feed.handler_name(),
            upstream,
            Method::GET,
            feed.accept(),
            StaticFallback::new(feed.fallback()),
        )?;

        Ok(Self {
            feed,
            orchestrator,
            route,
        })
    }
}

#[async_trait]
impl RouteHandler for StatusFeedHandler {
    fn name(&self) -> &'static str {
        self.feed.handler_name()
    }

    async fn handle(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        let outcome = self
            .orchestrator
            .fetch(&self.route, &self.feed.template(), &self.feed.normalizer())
            .await;

        let now = now_iso();
        let envelope = Envelope::from_outcome(self.name(), outcome, |items, _| FeedPayload {
            items: items.into_iter().map(|item| item.stamped(&now)).collect(),
            last_updated: now.clone(),
        });

        ok_json(&envelope)
    }
}
