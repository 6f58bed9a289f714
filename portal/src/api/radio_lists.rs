use crate::api::utils::{Envelope, fetch_route, ok_json};
use crate::config::UpstreamConfig;
use crate::errors::PortalError;
use crate::handler::RouteHandler;
use async_trait::async_trait;
use bytes::Bytes;
use fetcher::validate::{json_array, non_blank};
use fetcher::{
    FetchRoute, Orchestrator, RawResponse, RequestTemplate, StaticFallback, ValidationError,
};
use http::Method;
use hyper::{Request, Response};
use std::collections::BTreeMap;

/// Which name directory a handler serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameList {
    Countries,
    Genres,
}

impl NameList {
    fn handler_name(&self) -> &'static str {
        match self {
            NameList::Countries => "radio_countries",
            NameList::Genres => "radio_genres",
        }
    }

    /// Response key holding the names.
    fn key(&self) -> &'static str {
        match self {
            NameList::Countries => "countries",
            NameList::Genres => "genres",
        }
    }

    fn template(&self) -> RequestTemplate {
        match self {
            NameList::Countries => RequestTemplate::new(["json", "countries"]),
            NameList::Genres => RequestTemplate::new(["json", "tags"]),
        }
    }

    fn fallback(&self) -> Vec<String> {
        let names: &[&str] = match self {
            NameList::Countries => FALLBACK_COUNTRIES,
            NameList::Genres => FALLBACK_GENRES,
        };
        let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        names.sort();
        names
    }
}

/// Collects the `name` of every record, drops blanks and duplicates, and
/// sorts ascending.
pub fn normalize_names(response: &RawResponse) -> Result<Vec<String>, ValidationError> {
    let mut names: Vec<String> = json_array(response)?
        .iter()
        .filter_map(|record| non_blank(record.get("name")?.as_str()))
        .map(|name| name.trim().to_string())
        .collect();

    names.sort();
    names.dedup();
    Ok(names)
}

/// `GET /api/radio-countries` and `GET /api/radio-genres`
pub struct NameListHandler {
    list: NameList,
    orchestrator: Orchestrator,
    route: FetchRoute<Vec<String>>,
}

impl NameListHandler {
    pub fn new(
        list: NameList,
        orchestrator: Orchestrator,
        upstream: &UpstreamConfig,
    ) -> Result<Self, PortalError> {
        let route = fetch_route(
            "radio_browser",
            list.handler_name(),
            upstream,
            Method::GET,
            "application/json",
            StaticFallback::new(list.fallback()),
        )?;

        Ok(Self {
            list,
            orchestrator,
            route,
        })
    }
}

#[async_trait]
impl RouteHandler for NameListHandler {
    fn name(&self) -> &'static str {
        self.list.handler_name()
    }

    async fn handle(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        let outcome = self
            .orchestrator
            .fetch(&self.route, &self.list.template(), &normalize_names)
            .await;

        let key = self.list.key();
        let envelope = Envelope::from_outcome(self.name(), outcome, |names, _| {
            BTreeMap::from([(key, names)])
        });

        ok_json(&envelope)
    }
}

const FALLBACK_COUNTRIES: &[&str] = &[
    "Afghanistan",
    "Albania",
    "Algeria",
    "Argentina",
    "Armenia",
    "Australia",
    "Austria",
    "Azerbaijan",
    "Bangladesh",
    "Belarus",
    "Belgium",
    "Brazil",
    "Bulgaria",
    "Cambodia",
    "Canada",
    "Chile",
    "China",
    "Colombia",
    "Croatia",
    "Czech Republic",
    "Denmark",
    "Egypt",
    "Estonia",
    "Finland",
    "France",
    "Georgia",
    "Germany",
    "Greece",
    "Hungary",
    "Iceland",
    "India",
    "Indonesia",
    "Iran",
    "Iraq",
    "Ireland",
    "Israel",
    "Italy",
    "Japan",
    "Jordan",
    "Kazakhstan",
    "Kenya",
    "Kuwait",
    "Latvia",
    "Lebanon",
    "Lithuania",
    "Luxembourg",
    "Malaysia",
    "Mexico",
    "Morocco",
    "Netherlands",
    "New Zealand",
    "Nigeria",
    "Norway",
    "Pakistan",
    "Peru",
    "Philippines",
    "Poland",
    "Portugal",
    "Romania",
    "Russia",
    "Saudi Arabia",
    "Serbia",
    "Singapore",
    "Slovakia",
    "Slovenia",
    "South Africa",
    "South Korea",
    "Spain",
    "Sweden",
    "Switzerland",
    "Thailand",
    "Turkey",
    "Ukraine",
    "United Arab Emirates",
    "United Kingdom",
    "United States",
    "Uruguay",
    "Venezuela",
    "Vietnam",
];

const FALLBACK_GENRES: &[&str] = &[
    "Alternative",
    "Ambient",
    "Blues",
    "Classical",
    "Country",
    "Dance",
    "Electronic",
    "Folk",
    "Funk",
    "Gospel",
    "Hip Hop",
    "Jazz",
    "Latin",
    "Metal",
    "News",
    "Pop",
    "Punk",
    "R&B",
    "Reggae",
    "Rock",
    "Soul",
    "Techno",
    "Trance",
    "World",
    "Talk",
    "Sports",
    "Religious",
    "Children",
    "Comedy",
    "Educational",
    "Oldies",
    "Indie",
    "Experimental",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::test_support::{get, upstream};
    use http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_names() {
        let raw = RawResponse::new(
            StatusCode::OK,
            json!([
                {"name": "Peru", "stationcount": 12},
                {"name": "Austria"},
                {"name": " "},
                {"stationcount": 3},
                {"name": 42},
                {"name": "Austria"}
            ])
            .to_string(),
        );
        assert_eq!(normalize_names(&raw).unwrap(), vec!["Austria", "Peru"]);

        let not_array = RawResponse::new(StatusCode::OK, r#"{"name": "Peru"}"#);
        assert!(normalize_names(&not_array).is_err());
    }

    #[test]
    fn test_fallback_lists_sorted() {
        let countries = NameList::Countries.fallback();
        assert_eq!(countries.len(), 79);
        assert!(countries.is_sorted());

        let genres = NameList::Genres.fallback();
        assert_eq!(genres.len(), 33);
        assert!(genres.is_sorted());
        assert_eq!(genres.first().map(String::as_str), Some("Alternative"));
    }

    #[tokio::test]
    async fn test_genres_live() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/tags"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"name": "techno"}, {"name": "ambient"}])),
            )
            .mount(&server)
            .await;

        let orchestrator = Orchestrator::with_client(reqwest::Client::new());
        let handler =
            NameListHandler::new(NameList::Genres, orchestrator, &upstream(&[server.uri()], 2))
                .unwrap();
        let (status, body) = get(&handler, "/api/radio-genres").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "genres": ["ambient", "techno"], "provenance": "live"})
        );
    }

    #[tokio::test]
    async fn test_countries_fallback_after_all_mirrors_fail() {
        let down = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&down)
            .await;
        let garbage = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .expect(1)
            .mount(&garbage)
            .await;

        let orchestrator = Orchestrator::with_client(reqwest::Client::new());
        let handler = NameListHandler::new(
            NameList::Countries,
            orchestrator,
            &upstream(&[down.uri(), garbage.uri()], 2),
        )
        .unwrap();
        let (_, body) = get(&handler, "/api/radio-countries").await;

        assert_eq!(body["fallback"], json!(true));
        assert_eq!(body["countries"].as_array().unwrap().len(), 79);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("validation failed")
        );
    }
}
