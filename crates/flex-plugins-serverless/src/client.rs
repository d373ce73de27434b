use std::time::Duration;

use flex_plugins_core::{ApiError, Clock, Exhaustion, PollError, PollPolicy, ProbeError, SystemClock};
use tracing::{debug, info, instrument};

use crate::api::ServerlessApi;
use crate::error::{Result, ServerlessError};
use crate::legacy;
use crate::model::{
    Build, BuildEnvironment, BuildRequest, BuildStatus, Environment, Service,
    DEFAULT_SERVICE_FRIENDLY_NAME, DEFAULT_SERVICE_UNIQUE_NAME,
};

/// How long a new build may take to complete, and how often it is checked.
pub const BUILD_POLL: PollPolicy = PollPolicy::fixed(
    Duration::from_millis(30_000),
    Duration::from_millis(500),
    Exhaustion::SynthesizeTimeout,
);

/// Plugin-oriented operations over the Serverless API.
#[derive(Debug)]
pub struct ServerlessClient<A, C = SystemClock> {
    api: A,
    clock: C,
    build_poll: PollPolicy,
}

impl<A: ServerlessApi> ServerlessClient<A> {
    pub fn new(api: A) -> Self {
        Self::with_clock(api, SystemClock)
    }
}

impl<A: ServerlessApi, C: Clock> ServerlessClient<A, C> {
    pub fn with_clock(api: A, clock: C) -> Self {
        Self {
            api,
            clock,
            build_poll: BUILD_POLL,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn get_service(&self, service_sid: &str) -> Result<Option<Service>> {
        self.api.fetch_service(service_sid)
    }

    pub fn list_services(&self) -> Result<Vec<Service>> {
        self.api.list_services()
    }

    /// Returns the `default` service, creating it when it does not exist.
    ///
    /// Two concurrent callers may both create one; nothing guards against it.
    #[instrument(skip(self))]
    pub fn get_or_create_default_service(&self) -> Result<Service> {
        if let Some(service) = self.find_default_service()? {
            return Ok(service);
        }

        info!("creating service '{DEFAULT_SERVICE_UNIQUE_NAME}'");
        self.api
            .create_service(DEFAULT_SERVICE_UNIQUE_NAME, DEFAULT_SERVICE_FRIENDLY_NAME)
    }

    /// The `default` service, without creating it.
    pub fn find_default_service(&self) -> Result<Option<Service>> {
        Ok(self
            .api
            .list_services()?
            .into_iter()
            .find(|s| s.unique_name == DEFAULT_SERVICE_UNIQUE_NAME))
    }

    /// Resets the friendly name of a service to the default one.
    pub fn update_service_name(&self, service_sid: &str) -> Result<Service> {
        self.api
            .update_service(service_sid, DEFAULT_SERVICE_FRIENDLY_NAME)
    }

    /// Whether the active build of the plugin still ships the v0.0.0 bundle.
    #[instrument(skip(self))]
    pub fn has_legacy(&self, service_sid: &str, plugin_name: &str) -> Result<bool> {
        Ok(self
            .get_build_and_environment(service_sid, plugin_name)?
            .is_some_and(|found| legacy::has_legacy_asset(&found.build, plugin_name)))
    }

    /// [`ServerlessClient::has_legacy`] on the `default` service; `false` when
    /// that service does not exist yet.
    pub fn default_service_has_legacy(&self, plugin_name: &str) -> Result<bool> {
        match self.find_default_service()? {
            Some(service) => self.has_legacy(&service.sid, plugin_name),
            None => Ok(false),
        }
    }

    /// Redeploys the plugin environment without its v0.0.0 bundle.
    #[instrument(skip(self))]
    pub fn remove_legacy(&self, service_sid: &str, plugin_name: &str) -> Result<()> {
        let Some(found) = self.get_build_and_environment(service_sid, plugin_name)? else {
            return Ok(());
        };
        if !legacy::has_legacy_asset(&found.build, plugin_name) {
            debug!("no legacy bundle for {plugin_name}");
            return Ok(());
        }

        let request = legacy::build_filtered_manifest(&found.build, plugin_name);
        self.create_build_and_deploy(service_sid, plugin_name, &request)
    }

    /// Creates a build from `request`, waits for it to complete, and deploys
    /// it to the plugin's environment.
    ///
    /// Does nothing when the plugin has no environment with an active build.
    /// A build created before a failed deployment is left in place.
    #[instrument(skip(self, request))]
    pub fn create_build_and_deploy(
        &self,
        service_sid: &str,
        plugin_name: &str,
        request: &BuildRequest,
    ) -> Result<()> {
        let Some(BuildEnvironment { environment, .. }) =
            self.get_build_and_environment(service_sid, plugin_name)?
        else {
            debug!("no environment for {plugin_name}, skipping deploy");
            return Ok(());
        };

        let build = self.create_build(service_sid, request)?;
        let deployment = self
            .api
            .create_deployment(service_sid, &environment.sid, &build.sid)?;
        info!(
            "deployed build {} to environment {} ({})",
            build.sid, environment.sid, deployment.sid
        );
        Ok(())
    }

    pub fn get_build(&self, service_sid: &str, plugin_name: &str) -> Result<Option<Build>> {
        Ok(self
            .get_build_and_environment(service_sid, plugin_name)?
            .map(|found| found.build))
    }

    /// Removes an environment; `false` when the service does not exist.
    pub fn delete_environment(&self, service_sid: &str, environment_sid: &str) -> Result<bool> {
        if self.api.fetch_service(service_sid)?.is_none() {
            return Ok(false);
        }
        self.api.remove_environment(service_sid, environment_sid)
    }

    /// The environment named after the plugin, if the service has one.
    pub fn get_environment(
        &self,
        service_sid: &str,
        plugin_name: &str,
    ) -> Result<Option<Environment>> {
        if self.api.fetch_service(service_sid)?.is_none() {
            return Ok(None);
        }
        Ok(self
            .api
            .list_environments(service_sid)?
            .into_iter()
            .find(|e| e.unique_name == plugin_name && !e.sid.is_empty()))
    }

    /// Finds the plugin's environment and the build currently active on it.
    ///
    /// Every call goes back to the API.
    #[instrument(skip(self))]
    pub fn get_build_and_environment(
        &self,
        service_sid: &str,
        plugin_name: &str,
    ) -> Result<Option<BuildEnvironment>> {
        if self.api.fetch_service(service_sid)?.is_none() {
            debug!("service {service_sid} not found");
            return Ok(None);
        }

        let environment = self
            .api
            .list_environments(service_sid)?
            .into_iter()
            .find(|e| e.unique_name == plugin_name);
        let Some(environment) = environment else {
            return Ok(None);
        };
        let Some(build_sid) = environment.build_sid.clone() else {
            return Ok(None);
        };

        let build = self.api.fetch_build(service_sid, &build_sid)?;
        Ok(Some(BuildEnvironment { build, environment }))
    }

    fn create_build(&self, service_sid: &str, request: &BuildRequest) -> Result<Build> {
        let created = self.api.create_build(service_sid, request)?;
        debug!("Created build {}", created.sid);

        let outcome = self.build_poll.run(&self.clock, || {
            let build = self
                .api
                .fetch_build(service_sid, &created.sid)
                .map_err(ProbeError::Permanent)?;
            debug!(
                "Waiting for build status '{}' to change to 'completed'",
                build.status
            );

            match build.status {
                BuildStatus::Completed => Ok(build),
                BuildStatus::Failed => Err(ProbeError::Permanent(ApiError::build_failed().into())),
                BuildStatus::Building => Err(ProbeError::Transient(ServerlessError::BuildPending {
                    sid: build.sid,
                    status: build.status,
                })),
            }
        });

        outcome.map_err(|err| match err {
            PollError::TimedOut { .. } => ApiError::build_timeout().into(),
            PollError::Exhausted(err) | PollError::Aborted(err) => err,
        })
    }
}
