//! `GET /api/wikipedia?topic=`: learning text for a topic.
//!
//! Two orchestrated fetches against Wikipedia:
//!
//! 1. the REST page summary, which decides live vs fallback for the
//!    response as a whole;
//! 2. only when the summary extract is short, the plain-text extracts API
//!    for the full article. Its fallback is "keep the summary".

use crate::api::utils::{Envelope, bad_request, fetch_route, ok_json, query_param};
use crate::config::UpstreamConfig;
use crate::errors::PortalError;
use crate::handler::RouteHandler;
use async_trait::async_trait;
use bytes::Bytes;
use fetcher::validate::{non_blank, parse_json};
use fetcher::{
    FetchRoute, Orchestrator, Provenance, RawResponse, RequestTemplate, StaticFallback,
    ValidationError,
};
use http::Method;
use hyper::{Request, Response};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summaries shorter than this trigger the full-text lookup.
const SHORT_EXTRACT_CHARS: usize = 500;
/// Content must be longer than this to be worth showing.
const MIN_CONTENT_CHARS: usize = 100;

/// Maps tool names to the article title that covers the software rather
/// than the homonym.
pub fn disambiguate(topic: &str) -> &str {
    match topic {
        "Docker" => "Docker (software)",
        "Terraform" => "Terraform (software)",
        "Ansible" => "Ansible (software)",
        "Jenkins" => "Jenkins (software)",
        "Prometheus" => "Prometheus (software)",
        "Python" => "Python (programming language)",
        "Bash" => "Bash (Unix shell)",
        "Helm" => "Helm (package manager)",
        "Istio" => "Istio (service mesh)",
        "Traefik" => "Traefik (software)",
        "Consul" => "Consul (software)",
        "Vault" => "Vault (software)",
        "Nomad" => "Nomad (scheduler)",
        "Packer" => "Packer (software)",
        "Vagrant" => "Vagrant (software)",
        "Chef" => "Chef (software)",
        "Puppet" => "Puppet (software)",
        "CloudFormation" => "AWS CloudFormation",
        "ARM Templates" => "Azure Resource Manager",
        "Jaeger" => "Jaeger (software)",
        "Zipkin" => "Zipkin (software)",
        "Cassandra" => "Apache Cassandra",
        "Kafka" => "Apache Kafka",
        "ActiveMQ" => "Apache ActiveMQ",
        "Apache" => "Apache HTTP Server",
        "Envoy" => "Envoy (software)",
        other => other,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub title: Option<String>,
    pub extract: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    title: Option<String>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

/// REST `page/summary` body. Missing fields are fine; a non-object body is
/// not.
pub fn normalize_summary(response: &RawResponse) -> Result<Option<Summary>, ValidationError> {
    let body: SummaryBody = parse_json(response)?;

    Ok(Some(Summary {
        title: non_blank(body.title.as_deref()).map(str::to_string),
        extract: body.extract.unwrap_or_default(),
        url: body
            .content_urls
            .and_then(|urls| urls.desktop)
            .and_then(|desktop| desktop.page),
    }))
}

/// `action=query&prop=extracts` body: the extract of the first page.
pub fn normalize_extract(response: &RawResponse) -> Result<Option<String>, ValidationError> {
    let body: Value = parse_json(response)?;

    let extract = body
        .pointer("/query/pages")
        .and_then(Value::as_object)
        .and_then(|pages| pages.values().next())
        .and_then(|page| non_blank(page.get("extract").and_then(Value::as_str)))
        .ok_or_else(|| ValidationError::missing("query.pages[0].extract"))?;

    Ok(Some(extract.to_string()))
}

/// Strips markdown emphasis, headers, links and inline code, and collapses
/// runs of blank lines.
pub struct ContentCleaner {
    rules: Vec<(Regex, &'static str)>,
}

impl ContentCleaner {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = [
            (r"\*\*([^*]+)\*\*", "$1"),
            (r"\*([^*]+)\*", "$1"),
            (r"#{1,6}\s*", ""),
            (r"\[([^\]]+)\]\([^)]+\)", "$1"),
            (r"`([^`]+)`", "$1"),
            (r"\n{3,}", "\n\n"),
        ];

        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| Regex::new(pattern).map(|regex| (regex, replacement)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn clean(&self, content: &str) -> String {
        self.rules
            .iter()
            .fold(content.to_string(), |text, (pattern, replacement)| {
                pattern.replace_all(&text, *replacement).into_owned()
            })
    }
}

#[derive(Debug, Serialize)]
struct TopicPayload {
    content: String,
    title: String,
    url: Option<String>,
}

pub struct TopicHandler {
    orchestrator: Orchestrator,
    summary: FetchRoute<Option<Summary>>,
    extract: FetchRoute<Option<String>>,
    cleaner: ContentCleaner,
}

impl TopicHandler {
    pub fn new(orchestrator: Orchestrator, upstream: &UpstreamConfig) -> Result<Self, PortalError> {
        let summary = fetch_route(
            "wikipedia",
            "wikipedia_summary",
            upstream,
            Method::GET,
            "application/json",
            StaticFallback::new(None),
        )?;
        let extract = fetch_route(
            "wikipedia",
            "wikipedia_extract",
            upstream,
            Method::GET,
            "application/json",
            StaticFallback::new(None),
        )?;

        Ok(Self {
            orchestrator,
            summary,
            extract,
            cleaner: ContentCleaner::new()?,
        })
    }

    /// Full article text, or `None` to keep the summary.
    async fn full_text(&self, title: &str) -> Option<String> {
        let template = RequestTemplate::new(["w", "api.php"])
            .query("action", "query")
            .query("format", "json")
            .query("prop", "extracts")
            .query("explaintext", "true")
            .query("titles", title);

        self.orchestrator
            .fetch(&self.extract, &template, &normalize_extract)
            .await
            .data
    }

    fn render(&self, topic: &str, summary: Summary, content: String) -> (bool, TopicPayload) {
        if content.chars().count() <= MIN_CONTENT_CHARS {
            let message = format!(
                "ERROR: Could not find substantial content for \"{topic}\". Please try another topic."
            );
            return (
                false,
                TopicPayload {
                    content: message,
                    title: topic.to_string(),
                    url: None,
                },
            );
        }

        let title = summary.title.unwrap_or_else(|| topic.to_string());
        let mut text = format!("{title}\n\n{}", self.cleaner.clean(&content));
        if let Some(url) = &summary.url {
            text.push_str(&format!(
                "\n\nLEARN MORE\n\nRead the full Wikipedia article: {url}\n"
            ));
        }

        (
            true,
            TopicPayload {
                content: text,
                title,
                url: summary.url,
            },
        )
    }
}

#[async_trait]
impl RouteHandler for TopicHandler {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn handle(&self, request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        let Some(topic) = query_param(&request, "topic") else {
            return bad_request("Topic parameter is required");
        };
        let article = disambiguate(&topic);

        let template = RequestTemplate::new(["api", "rest_v1", "page", "summary", article]);
        let outcome = self
            .orchestrator
            .fetch(&self.summary, &template, &normalize_summary)
            .await;

        // Resolve the follow-up lookup before building the envelope, which
        // consumes the outcome.
        let mut content = None;
        if let Some(summary) = &outcome.data {
            content = Some(summary.extract.clone());
            let short = summary.extract.chars().count() < SHORT_EXTRACT_CHARS;
            if !summary.extract.is_empty() && short {
                let title = summary.title.as_deref().unwrap_or(article);
                if let Some(full) = self.full_text(title).await {
                    content = Some(full);
                }
            }
        }

        let mut success = true;
        let mut envelope = Envelope::from_outcome(self.name(), outcome, |summary, provenance| {
            match (summary, provenance, content) {
                (Some(summary), Provenance::Live, Some(content)) => {
                    let (found, payload) = self.render(&topic, summary, content);
                    success = found;
                    payload
                }
                _ => TopicPayload {
                    content: learning_outline(&topic),
                    title: topic.clone(),
                    url: None,
                },
            }
        });
        envelope.success = success;

        ok_json(&envelope)
    }
}

/// Generic study plan served when Wikipedia is unreachable.
pub fn learning_outline(topic: &str) -> String {
    format!(
        "# {topic}\n\n\
         ## Overview\n\n\
         This is a comprehensive learning resource for {topic} in the context of DevOps and system administration.\n\n\
         ## Key Concepts\n\n\
         - Core principles and fundamentals\n\
         - Implementation strategies\n\
         - Best practices and patterns\n\
         - Integration with other tools\n\n\
         ## Learning Path\n\n\
         1. **Foundation:** Understand the basics\n\
         2. **Implementation:** Hands-on practice\n\
         3. **Advanced:** Optimization and scaling\n\
         4. **Integration:** Connect with other systems\n\n\
         ## Resources\n\n\
         - Official documentation\n\
         - Community resources\n\
         - Practical examples\n\
         - Case studies\n\n\
         *Note: This content is generated for learning purposes. For the most up-to-date information, refer to official documentation.*"
    )
}
