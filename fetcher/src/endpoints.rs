//! Endpoint sets and the rotation that turns them into request URLs.
//!
//! An [`EndpointSet`] is an ordered list of interchangeable mirrors for one
//! logical upstream (first = preferred). A [`RequestTemplate`] carries the
//! path and query shared by every mirror. [`EndpointSet::rotation`] combines
//! the two into one URL per endpoint, in priority order:
//!
//! ```text
//! EndpointSet [https://de1.example, https://at1.example]
//!   + RequestTemplate ["json", "countries"] ?limit=10
//!   → (0, https://de1.example/json/countries?limit=10)
//!   → (1, https://at1.example/json/countries?limit=10)
//! ```

use crate::errors::ConfigError;
use std::iter::Enumerate;
use std::slice::Iter;
use url::Url;

#[derive(Clone, Debug, PartialEq)]
pub struct EndpointSet {
    endpoints: Vec<Url>,
}

impl EndpointSet {
    /// Builds an endpoint set. Fails on an empty list or on a base URL
    /// that is not http(s).
    pub fn try_new(endpoints: Vec<Url>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyEndpointSet);
        }

        for endpoint in &endpoints {
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(ConfigError::UnsupportedScheme(endpoint.to_string()));
            }
            if endpoint.cannot_be_a_base() {
                return Err(ConfigError::NotABase(endpoint.to_string()));
            }
        }

        Ok(Self { endpoints })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Never true: construction rejects an empty list.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Returns one fully formed URL per endpoint, in configured order.
    /// Each call starts a fresh pass.
    pub fn rotation<'a>(&'a self, template: &'a RequestTemplate) -> Rotation<'a> {
        Rotation {
            endpoints: self.endpoints.iter().enumerate(),
            template,
        }
    }
}

/// Path segments and query pairs applied to every endpoint of a set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestTemplate {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl RequestTemplate {
    /// Segments are percent-encoded individually, so a segment may contain
    /// spaces or slashes (`"United States"`, `"ci/cd"`).
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends the template to `base`, keeping any path prefix the base has.
    pub fn resolve(&self, base: &Url) -> Url {
        let mut url = base.clone();

        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(&self.segments);
        }

        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        url
    }
}

/// Lazy, finite iterator over `(endpoint index, url)`.
pub struct Rotation<'a> {
    endpoints: Enumerate<Iter<'a, Url>>,
    template: &'a RequestTemplate,
}

impl Iterator for Rotation<'_> {
    type Item = (usize, Url);

    fn next(&mut self) -> Option<Self::Item> {
        self.endpoints
            .next()
            .map(|(index, base)| (index, self.template.resolve(base)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.endpoints.size_hint()
    }
}

impl ExactSizeIterator for Rotation<'_> {}
