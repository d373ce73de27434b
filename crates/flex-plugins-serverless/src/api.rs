//! The Serverless REST surface the client depends on.

use flex_plugins_core::{Credentials, RestClient};

use crate::error::Result;
use crate::model::{Build, BuildRequest, Deployment, Environment, Service};

/// Calls made against the Serverless API.
pub trait ServerlessApi {
    fn list_services(&self) -> Result<Vec<Service>>;
    /// `None` when the service does not exist.
    fn fetch_service(&self, service_sid: &str) -> Result<Option<Service>>;
    fn create_service(&self, unique_name: &str, friendly_name: &str) -> Result<Service>;
    fn update_service(&self, service_sid: &str, friendly_name: &str) -> Result<Service>;
    fn list_environments(&self, service_sid: &str) -> Result<Vec<Environment>>;
    fn fetch_build(&self, service_sid: &str, build_sid: &str) -> Result<Build>;
    fn create_build(&self, service_sid: &str, request: &BuildRequest) -> Result<Build>;
    fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> Result<Deployment>;
    fn remove_environment(&self, service_sid: &str, environment_sid: &str) -> Result<bool>;
}

/// [`ServerlessApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpServerlessApi {
    rest: RestClient,
}

impl HttpServerlessApi {
    pub fn new(base_url: impl Into<String>, credentials: &Credentials) -> Self {
        Self {
            rest: RestClient::new(base_url, credentials),
        }
    }
}

impl ServerlessApi for HttpServerlessApi {
    fn list_services(&self) -> Result<Vec<Service>> {
        Ok(self.rest.list("Services", "services")?)
    }

    fn fetch_service(&self, service_sid: &str) -> Result<Option<Service>> {
        Ok(self.rest.get_optional(&format!("Services/{service_sid}"))?)
    }

    fn create_service(&self, unique_name: &str, friendly_name: &str) -> Result<Service> {
        let form = [
            ("UniqueName", unique_name.to_string()),
            ("FriendlyName", friendly_name.to_string()),
        ];
        Ok(self.rest.post_form("Services", &form)?)
    }

    fn update_service(&self, service_sid: &str, friendly_name: &str) -> Result<Service> {
        let form = [("FriendlyName", friendly_name.to_string())];
        Ok(self
            .rest
            .post_form(&format!("Services/{service_sid}"), &form)?)
    }

    fn list_environments(&self, service_sid: &str) -> Result<Vec<Environment>> {
        Ok(self
            .rest
            .list(&format!("Services/{service_sid}/Environments"), "environments")?)
    }

    fn fetch_build(&self, service_sid: &str, build_sid: &str) -> Result<Build> {
        Ok(self
            .rest
            .get(&format!("Services/{service_sid}/Builds/{build_sid}"))?)
    }

    fn create_build(&self, service_sid: &str, request: &BuildRequest) -> Result<Build> {
        Ok(self
            .rest
            .post_form(&format!("Services/{service_sid}/Builds"), &request.form())?)
    }

    fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> Result<Deployment> {
        let form = [("BuildSid", build_sid.to_string())];
        Ok(self.rest.post_form(
            &format!("Services/{service_sid}/Environments/{environment_sid}/Deployments"),
            &form,
        )?)
    }

    fn remove_environment(&self, service_sid: &str, environment_sid: &str) -> Result<bool> {
        Ok(self
            .rest
            .delete(&format!("Services/{service_sid}/Environments/{environment_sid}"))?)
    }
}
