//! Blocking JSON client shared by the Serverless and Flex Plugins API wrappers.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Credentials;
use crate::error::ApiError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RestError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },
    #[error("failed to read response from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RestError {
    /// The API error carried by this failure, if the server answered with one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    meta: Option<PageMeta>,
    #[serde(flatten)]
    items: Map<String, Value>,
}

/// Authenticated client bound to one API base URL.
#[derive(Clone)]
pub struct RestClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, credentials: &Credentials) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("flex-plugins/", env!("CARGO_PKG_VERSION")))
            .build();
        let token = STANDARD.encode(format!(
            "{}:{}",
            credentials.account_sid, credentials.auth_token
        ));

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization: format!("Basic {token}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    #[instrument(skip(self))]
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let url = self.url(path);
        debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &self.authorization)
            .call();
        decode(&url, response)
    }

    /// Like [`RestClient::get`], but maps a 404 answer to `None`.
    pub fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, RestError> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(RestError::Api(err)) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, form))]
    pub fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, RestError> {
        let url = self.url(path);
        debug!("POST {url}");
        let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &self.authorization)
            .send_form(&pairs);
        decode(&url, response)
    }

    /// Deletes a resource; `false` when it did not exist.
    #[instrument(skip(self))]
    pub fn delete(&self, path: &str) -> Result<bool, RestError> {
        let url = self.url(path);
        debug!("DELETE {url}");
        let response = self
            .agent
            .delete(&url)
            .set("Authorization", &self.authorization)
            .call();
        match response {
            Ok(_) => Ok(true),
            Err(err) => match into_rest_error(&url, err) {
                RestError::Api(api) if api.is_not_found() => Ok(false),
                other => Err(other),
            },
        }
    }

    /// Reads every page of a list endpoint, collecting the array under `key`.
    pub fn list<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>, RestError> {
        let mut out = Vec::new();
        let mut next = Some(self.url(path));

        while let Some(url) = next.take() {
            let mut page: Page = self.get(&url)?;
            if let Some(items) = page.items.remove(key) {
                let items: Vec<T> = serde_json::from_value(items)
                    .map_err(|source| RestError::Decode {
                        url: url.clone(),
                        source,
                    })?;
                out.extend(items);
            }
            next = page
                .meta
                .and_then(|meta| meta.next_page_url)
                .filter(|next_url| !next_url.is_empty());
        }

        Ok(out)
    }
}

fn decode<T: DeserializeOwned>(
    url: &str,
    response: Result<ureq::Response, ureq::Error>,
) -> Result<T, RestError> {
    let response = response.map_err(|err| into_rest_error(url, err))?;
    let body = response.into_string().map_err(|source| RestError::Read {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| RestError::Decode {
        url: url.to_string(),
        source,
    })
}

fn into_rest_error(url: &str, err: ureq::Error) -> RestError {
    match err {
        ureq::Error::Status(status, response) => {
            let status_text = response.status_text().to_string();
            let body = response.into_string().unwrap_or_default();
            let api = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
                let message = if body.trim().is_empty() {
                    status_text
                } else {
                    body
                };
                ApiError::new(u32::from(status), message, status)
            });
            RestError::Api(api)
        }
        ureq::Error::Transport(transport) => RestError::Transport {
            url: url.to_string(),
            source: Box::new(transport),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{DELETE, GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        sid: String,
    }

    fn creds() -> Credentials {
        Credentials {
            account_sid: "ACxxx".to_string(),
            auth_token: "secret".to_string(),
        }
    }

    #[test]
    fn sends_basic_auth_and_decodes_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/Services/ZS1")
                .header("Authorization", "Basic QUN4eHg6c2VjcmV0");
            then.status(200).json_body(json!({"sid": "ZS1"}));
        });

        let client = RestClient::new(server.url("/v1/"), &creds());
        let item: Item = client.get("Services/ZS1").unwrap();
        assert_eq!(item.sid, "ZS1");
        mock.assert();
    }

    #[test]
    fn decodes_api_error_bodies() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/Services");
            then.status(400).json_body(json!({
                "code": 54301,
                "message": "Unique name already in use",
                "status": 400
            }));
        });

        let client = RestClient::new(server.url("/v1"), &creds());
        let err = client
            .post_form::<Item>("Services", &[("UniqueName", "default".to_string())])
            .unwrap_err();
        let api = err.api_error().expect("api error");
        assert_eq!(api.code, 54301);
        assert_eq!(api.status, 400);
    }

    #[test]
    fn missing_resource_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/Services/ZS404");
            then.status(404).json_body(json!({
                "code": 20404,
                "message": "not found",
                "status": 404
            }));
        });

        let client = RestClient::new(server.url("/v1"), &creds());
        let item: Option<Item> = client.get_optional("Services/ZS404").unwrap();
        assert!(item.is_none());
    }

    #[test]
    fn follows_next_page_url() {
        let server = MockServer::start();
        let second = server.url("/v1/Services/page-2");
        server.mock(|when, then| {
            when.method(GET).path("/v1/Services");
            then.status(200).json_body(json!({
                "services": [{"sid": "ZS1"}],
                "meta": {"key": "services", "next_page_url": second}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/v1/Services/page-2");
            then.status(200).json_body(json!({
                "services": [{"sid": "ZS2"}],
                "meta": {"key": "services", "next_page_url": null}
            }));
        });

        let client = RestClient::new(server.url("/v1"), &creds());
        let items: Vec<Item> = client.list("Services", "services").unwrap();
        let sids: Vec<_> = items.iter().map(|i| i.sid.as_str()).collect();
        assert_eq!(sids, vec!["ZS1", "ZS2"]);
    }

    #[test]
    fn delete_reports_absent_resource() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/v1/Services/ZS1/Environments/ZE1");
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/v1/Services/ZS1/Environments/ZE2");
            then.status(404);
        });

        let client = RestClient::new(server.url("/v1"), &creds());
        assert!(client.delete("Services/ZS1/Environments/ZE1").unwrap());
        assert!(!client.delete("Services/ZS1/Environments/ZE2").unwrap());
    }
}
