//! `GET /api/radio-stations`: live station directory with mirror failover.
//!
//! The query picks one Radio-Browser listing (search, by country, by tag or
//! most clicked). Upstream records are screened for liveness and a playable
//! http(s) stream before being mapped onto [`Station`]; a search term is
//! applied again locally since the upstream only matches on name.

use crate::api::utils::{Envelope, fetch_route, ok_json, query_param};
use crate::config::UpstreamConfig;
use crate::errors::PortalError;
use crate::handler::RouteHandler;
use async_trait::async_trait;
use bytes::Bytes;
use fetcher::validate::{is_web_url, json_array, non_blank};
use fetcher::{
    FetchRoute, Normalizer, Orchestrator, Provenance, RawResponse, RequestTemplate,
    StaticFallback, ValidationError,
};
use http::Method;
use hyper::{Request, Response};
use serde::{Deserialize, Serialize};

const MAX_STATIONS: usize = 200;
const ALL_COUNTRIES: &str = "All origins";
const ALL_GENRES: &str = "All genres";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Station {
    pub name: String,
    pub country: String,
    pub genre: String,
    /// Position on the virtual dial, 87.5 upwards in 0.1 steps.
    pub frequency: f64,
    pub bitrate: u32,
    pub codec: String,
    pub tags: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub clickcount: u64,
    pub votes: u64,
}

/// Shape of one Radio-Browser station record. Everything is optional so a
/// sparse record is screened out rather than failing the whole listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamStation {
    name: Option<String>,
    url: Option<String>,
    country: Option<String>,
    tags: Option<String>,
    codec: Option<String>,
    stationuuid: Option<String>,
    bitrate: Option<u32>,
    clickcount: Option<u64>,
    votes: Option<u64>,
    lastcheckok: Option<i64>,
    broken: Option<bool>,
}

impl UpstreamStation {
    fn is_playable(&self) -> bool {
        non_blank(self.name.as_deref()).is_some()
            && non_blank(self.country.as_deref()).is_some()
            && self.url.as_deref().is_some_and(is_web_url)
            && self.lastcheckok == Some(1)
            && self.broken != Some(true)
    }

    fn matches(&self, term: &str) -> bool {
        [&self.name, &self.country, &self.tags]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(term))
    }

    fn into_station(self, position: usize) -> Station {
        let tags = non_blank(self.tags.as_deref()).map(str::to_string);
        let genre = tags
            .as_deref()
            .and_then(|t| t.split(',').next())
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or("Music")
            .to_string();

        Station {
            name: self.name.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
            genre,
            frequency: dial_frequency(position),
            bitrate: self.bitrate.filter(|b| *b > 0).unwrap_or(128),
            codec: non_blank(self.codec.as_deref()).unwrap_or("MP3").to_string(),
            tags: tags.unwrap_or_else(|| "music".to_string()),
            url: self.url.unwrap_or_default(),
            uuid: self.stationuuid,
            clickcount: self.clickcount.unwrap_or(0),
            votes: self.votes.unwrap_or(0),
        }
    }
}

fn dial_frequency(position: usize) -> f64 {
    (875 + position) as f64 / 10.0
}

/// Screens and maps a station listing. Holds the lowercased search term,
/// if any.
pub struct StationNormalizer {
    search: Option<String>,
}

impl StationNormalizer {
    pub fn new(search: Option<&str>) -> Self {
        Self {
            search: search.map(str::to_lowercase),
        }
    }
}

impl Normalizer for StationNormalizer {
    type Output = Vec<Station>;

    fn normalize(&self, response: &RawResponse) -> Result<Vec<Station>, ValidationError> {
        let stations = json_array(response)?
            .into_iter()
            .filter_map(|record| serde_json::from_value::<UpstreamStation>(record).ok())
            .filter(UpstreamStation::is_playable)
            .filter(|s| self.search.as_deref().is_none_or(|term| s.matches(term)))
            .take(MAX_STATIONS)
            .enumerate()
            .map(|(position, s)| s.into_station(position))
            .collect();

        Ok(stations)
    }
}

/// Listing selected by the request's query parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StationQuery {
    pub country: Option<String>,
    pub genre: Option<String>,
    pub search: Option<String>,
}

impl StationQuery {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            country: query_param(request, "country"),
            genre: query_param(request, "genre"),
            search: query_param(request, "search"),
        }
    }

    pub fn template(&self) -> RequestTemplate {
        let template = if let Some(search) = &self.search {
            RequestTemplate::new(["json", "stations", "search"]).query("name", search)
        } else if let Some(country) = self.country.as_deref().filter(|c| *c != ALL_COUNTRIES) {
            RequestTemplate::new(["json", "stations", "bycountry", country])
        } else if let Some(genre) = self.genre.as_deref().filter(|g| *g != ALL_GENRES) {
            RequestTemplate::new(["json", "stations", "bytag", genre])
        } else {
            RequestTemplate::new(["json", "stations", "topclick", "200"])
        };

        template
            .query("hidebroken", "true")
            .query("order", "clickcount")
            .query("reverse", "true")
            .query("lastcheckok", "1")
            .query("ssl_error", "0")
            .query("limit", MAX_STATIONS.to_string())
    }
}

#[derive(Debug, Serialize)]
struct StationsPayload {
    stations: Vec<Station>,
    count: usize,
    country: String,
    genre: String,
    search: Option<String>,
}

pub struct RadioStationsHandler {
    orchestrator: Orchestrator,
    route: FetchRoute<Vec<Station>>,
}

impl RadioStationsHandler {
    pub fn new(orchestrator: Orchestrator, upstream: &UpstreamConfig) -> Result<Self, PortalError> {
        let route = fetch_route(
            "radio_browser",
            "radio_stations",
            upstream,
            Method::GET,
            "application/json",
            StaticFallback::new(fallback_stations()),
        )?;

        Ok(Self {
            orchestrator,
            route,
        })
    }
}

#[async_trait]
impl RouteHandler for RadioStationsHandler {
    fn name(&self) -> &'static str {
        "radio_stations"
    }

    async fn handle(&self, request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        let query = StationQuery::from_request(&request);
        let normalizer = StationNormalizer::new(query.search.as_deref());

        let outcome = self
            .orchestrator
            .fetch(&self.route, &query.template(), &normalizer)
            .await;

        tracing::debug!(
            stations = outcome.data.len(),
            provenance = outcome.provenance.as_str(),
            "Fetched stations"
        );

        let envelope = Envelope::from_outcome(self.name(), outcome, |stations, provenance| {
            StationsPayload {
                count: stations.len(),
                stations,
                country: match provenance {
                    Provenance::Fallback => "fallback".to_string(),
                    Provenance::Live => query.country.clone().unwrap_or_else(|| "all".into()),
                },
                genre: query.genre.clone().unwrap_or_else(|| "all".into()),
                search: query.search.clone(),
            }
        });

        ok_json(&envelope)
    }
}

fn fallback_station(
    name: &str,
    country: &str,
    genre: &str,
    frequency: f64,
    (bitrate, codec): (u32, &str),
    tags: &str,
    url: &str,
) -> Station {
    Station {
        name: name.to_string(),
        country: country.to_string(),
        genre: genre.to_string(),
        frequency,
        bitrate,
        codec: codec.to_string(),
        tags: tags.to_string(),
        url: url.to_string(),
        uuid: None,
        clickcount: 0,
        votes: 0,
    }
}

pub fn fallback_stations() -> Vec<Station> {
    vec![
        fallback_station(
            "BBC World Service",
            "United Kingdom",
            "News",
            87.5,
            (128, "MP3"),
            "news, international",
            "http://stream.live.vc.bbcmedia.co.uk/bbc_world_service",
        ),
        fallback_station(
            "Radio Paradise",
            "United States",
            "Rock",
            88.1,
            (320, "AAC"),
            "rock, alternative, indie",
            "http://stream.radioparadise.com/aac-320",
        ),
        fallback_station(
            "SomaFM Groove Salad",
            "United States",
            "Electronic",
            88.3,
            (128, "MP3"),
            "electronic, ambient",
            "http://ice1.somafm.com/groovesalad-128-mp3",
        ),
        fallback_station(
            "SomaFM Beat Blender",
            "United States",
            "Electronic",
            88.5,
            (128, "MP3"),
            "electronic, beats",
            "http://ice1.somafm.com/beatblender-128-mp3",
        ),
        fallback_station(
            "SomaFM DEF CON",
            "United States",
            "Electronic",
            88.7,
            (128, "MP3"),
            "electronic, techno",
            "http://ice1.somafm.com/defcon-128-mp3",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::test_support::{get, upstream};
    use http::StatusCode;
    use serde_json::{Value, json};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param as query};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(name: &str, url: &str, tags: &str) -> Value {
        json!({
            "name": name,
            "url": url,
            "country": "Germany",
            "tags": tags,
            "codec": "AAC",
            "bitrate": 192,
            "stationuuid": format!("uuid-{name}"),
            "clickcount": 10,
            "votes": 3,
            "lastcheckok": 1
        })
    }

    fn raw(body: Value) -> RawResponse {
        RawResponse::new(StatusCode::OK, body.to_string())
    }

    fn handler(uris: &[String], timeout_secs: u64) -> RadioStationsHandler {
        RadioStationsHandler::new(
            Orchestrator::with_client(reqwest::Client::new()),
            &upstream(uris, timeout_secs),
        )
        .unwrap()
    }

    #[test]
    fn test_query_selection() {
        let base = "https://mirror.example.org";
        let url = |q: StationQuery| q.template().resolve(&url::Url::parse(base).unwrap());
        let fixed = "hidebroken=true&order=clickcount&reverse=true&lastcheckok=1&ssl_error=0&limit=200";

        let search = StationQuery {
            search: Some("jazz fm".into()),
            country: Some("Germany".into()),
            genre: None,
        };
        assert_eq!(
            url(search).as_str(),
            format!("{base}/json/stations/search?name=jazz+fm&{fixed}")
        );

        let country = StationQuery {
            country: Some("United States".into()),
            genre: Some("rock".into()),
            search: None,
        };
        assert_eq!(
            url(country).as_str(),
            format!("{base}/json/stations/bycountry/United%20States?{fixed}")
        );

        let genre = StationQuery {
            country: Some(ALL_COUNTRIES.into()),
            genre: Some("rock".into()),
            search: None,
        };
        assert_eq!(
            url(genre).as_str(),
            format!("{base}/json/stations/bytag/rock?{fixed}")
        );

        let top = StationQuery {
            country: None,
            genre: Some(ALL_GENRES.into()),
            search: None,
        };
        assert_eq!(
            url(top).as_str(),
            format!("{base}/json/stations/topclick/200?{fixed}")
        );
    }

    #[test]
    fn test_normalize_defaults() {
        let body = json!([
            {"name": "Bare", "url": "https://bare.example.org", "country": "Chile", "lastcheckok": 1},
            {"name": "Tagged", "url": "http://tagged.example.org", "country": "Peru",
             "tags": " jazz , swing", "bitrate": 0, "codec": "", "lastcheckok": 1}
        ]);

        let stations = StationNormalizer::new(None).normalize(&raw(body)).unwrap();
        assert_eq!(stations.len(), 2);

        let bare = &stations[0];
        assert_eq!(bare.genre, "Music");
        assert_eq!(bare.frequency, 87.5);
        assert_eq!(bare.bitrate, 128);
        assert_eq!(bare.codec, "MP3");
        assert_eq!(bare.tags, "music");
        assert_eq!(bare.uuid, None);
        assert_eq!((bare.clickcount, bare.votes), (0, 0));

        let tagged = &stations[1];
        assert_eq!(tagged.genre, "jazz");
        assert_eq!(tagged.frequency, 87.6);
        assert_eq!(tagged.bitrate, 128);
        assert_eq!(tagged.tags, " jazz , swing");
    }

    #[test]
    fn test_liveness_screening() {
        let mut stale = record("Stale", "http://stale.example.org", "pop");
        stale["lastcheckok"] = json!(0);
        let mut broken = record("Broken", "http://broken.example.org", "pop");
        broken["broken"] = json!(true);
        let mut nameless = record("", "http://nameless.example.org", "pop");
        nameless["name"] = json!("  ");
        let mut typed_wrong = record("Odd", "http://odd.example.org", "pop");
        typed_wrong["bitrate"] = json!("fast");

        let body = json!([stale, broken, nameless, typed_wrong, record("Good", "https://good.example.org", "pop")]);
        let stations = StationNormalizer::new(None).normalize(&raw(body)).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Good");
        assert_eq!(stations[0].frequency, 87.5);
    }

    #[test]
    fn test_listing_capped() {
        let body: Vec<Value> = (0..250)
            .map(|i| record(&format!("S{i}"), "http://s.example.org", "pop"))
            .collect();
        let stations = StationNormalizer::new(None)
            .normalize(&raw(Value::Array(body)))
            .unwrap();
        assert_eq!(stations.len(), MAX_STATIONS);
        assert_eq!(stations[199].frequency, 107.4);
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let err = StationNormalizer::new(None)
            .normalize(&raw(json!({"error": "rate limited"})))
            .unwrap_err();
        assert_eq!(err.field, "$");
    }

    #[tokio::test]
    async fn test_timeout_then_live_mirror() {
        let slow = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&slow)
            .await;

        let healthy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/stations/topclick/200"))
            .and(query("hidebroken", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                record("One", "http://one.example.org", "rock"),
                record("Two", "http://two.example.org", "jazz"),
                record("Three", "https://three.example.org", "news"),
            ])))
            .expect(1)
            .mount(&healthy)
            .await;

        let handler = handler(&[slow.uri(), healthy.uri()], 1);
        let (status, body) = get(&handler, "/api/radio-stations").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["provenance"], json!("live"));
        assert_eq!(body["count"], json!(3));
        assert_eq!(body["stations"].as_array().unwrap().len(), 3);
        assert_eq!(body["stations"][0]["uuid"], json!("uuid-One"));
        assert_eq!(body["country"], json!("all"));
        assert_eq!(body["search"], Value::Null);
        assert!(body.get("fallback").is_none());
    }

    #[tokio::test]
    async fn test_server_error_serves_fallback() {
        let failing = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&failing)
            .await;

        let handler = handler(&[failing.uri()], 2);
        let (status, body) = get(&handler, "/api/radio-stations?genre=rock").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fallback"], json!(true));
        assert_eq!(body["provenance"], json!("fallback"));
        assert_eq!(body["country"], json!("fallback"));
        assert_eq!(body["count"], json!(5));
        assert_eq!(
            body["stations"],
            serde_json::to_value(fallback_stations()).unwrap()
        );
        assert!(body["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_non_web_stream_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/stations/bycountry/Germany"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                record("Ftp", "ftp://files.example.org/stream", "rock"),
                record("Web", "http://web.example.org/stream", "rock"),
            ])))
            .mount(&server)
            .await;

        let handler = handler(&[server.uri()], 2);
        let (_, body) = get(&handler, "/api/radio-stations?country=Germany").await;

        assert_eq!(body["count"], json!(1));
        assert_eq!(body["stations"][0]["name"], json!("Web"));
        assert_eq!(body["country"], json!("Germany"));
    }

    #[tokio::test]
    async fn test_search_filters_locally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/stations/search"))
            .and(query("name", "Jazz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                record("Smooth JAZZ 24", "http://a.example.org", "lounge"),
                record("Rock Antenne", "http://b.example.org", "rock"),
                record("Late Night", "http://c.example.org", "jazz,blues"),
            ])))
            .mount(&server)
            .await;

        let handler = handler(&[server.uri()], 2);
        let (_, body) = get(&handler, "/api/radio-stations?search=Jazz").await;

        let names: Vec<&str> = body["stations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Smooth JAZZ 24", "Late Night"]);
        assert_eq!(body["search"], json!("Jazz"));
    }
}
