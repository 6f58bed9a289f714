use crate::errors::AttemptError;
use crate::request::{AttemptConfig, RawResponse, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// What a scripted host does when contacted.
#[derive(Clone, Debug)]
pub enum Script {
    Respond(RawResponse),
    Fail(AttemptError),
    /// Never answers; the attempt ends when the configured timeout fires.
    Hang,
}

/// In-memory [`Transport`] keyed by host name. Records every URL it is asked
/// to fetch, in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new<'a, I>(scripts: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (&'a str, Script)>,
    {
        Arc::new(Self {
            scripts: scripts
                .into_iter()
                .map(|(host, script)| (host.to_string(), script))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, url: &Url, config: &AttemptConfig) -> Result<RawResponse, AttemptError> {
        self.calls.lock().unwrap().push(url.to_string());

        let script = url
            .host_str()
            .and_then(|host| self.scripts.get(host))
            .cloned()
            .unwrap_or_else(|| Script::Fail(AttemptError::Network("unknown host".into())));

        match script {
            Script::Respond(response) => Ok(response),
            Script::Fail(error) => Err(error),
            Script::Hang => {
                tokio::time::sleep(config.timeout()).await;
                Err(AttemptError::Timeout(config.timeout()))
            }
        }
    }
}
