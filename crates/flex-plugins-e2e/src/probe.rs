use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A plugin entry as served by Flex's `/plugins` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePlugin {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

/// HTTP calls the waiters poll with.
pub trait PluginProbe {
    type Error: Display;

    /// Succeeds once `url` answers with a success status.
    fn get(&self, url: &str) -> Result<(), Self::Error>;

    /// Plugins Flex currently loads for the account behind `flex_base_url`.
    fn active_plugins(&self, flex_base_url: &str) -> Result<Vec<ActivePlugin>, Self::Error>;
}

/// [`PluginProbe`] backed by `ureq`.
#[derive(Debug, Clone)]
pub struct HttpPluginProbe {
    agent: ureq::Agent,
}

impl Default for HttpPluginProbe {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(PROBE_TIMEOUT).build(),
        }
    }
}

impl PluginProbe for HttpPluginProbe {
    type Error = Box<ureq::Error>;

    fn get(&self, url: &str) -> Result<(), Self::Error> {
        debug!("GET {url}");
        self.agent.get(url).call()?;
        Ok(())
    }

    fn active_plugins(&self, flex_base_url: &str) -> Result<Vec<ActivePlugin>, Self::Error> {
        let url = format!("{}/plugins", flex_base_url.trim_end_matches('/'));
        debug!("GET {url}");
        let plugins = self
            .agent
            .get(&url)
            .call()?
            .into_json()
            .map_err(|err| Box::new(ureq::Error::from(err)))?;
        Ok(plugins)
    }
}
