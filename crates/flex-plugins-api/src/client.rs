use flex_plugins_core::{Credentials, RestClient, RestError};
use tracing::{debug, instrument};

use crate::model::{
    Configuration, ConfiguredPlugin, DescribeConfiguration, DescribePlugin, DescribeRelease,
    NewPluginVersion, Plugin, PluginVersion, Release,
};

pub type Result<T> = std::result::Result<T, RestError>;

/// Thin wrapper over the Flex Plugins API.
#[derive(Debug, Clone)]
pub struct PluginsApiClient {
    rest: RestClient,
}

impl PluginsApiClient {
    pub fn new(base_url: impl Into<String>, credentials: &Credentials) -> Self {
        Self {
            rest: RestClient::new(base_url, credentials),
        }
    }

    pub fn list_plugins(&self) -> Result<Vec<Plugin>> {
        self.rest.list("Plugins", "plugins")
    }

    pub fn list_plugin_versions(&self, plugin: &str) -> Result<Vec<PluginVersion>> {
        self.rest
            .list(&format!("Plugins/{plugin}/Versions"), "plugin_versions")
    }

    pub fn list_configurations(&self) -> Result<Vec<Configuration>> {
        self.rest.list("Configurations", "configurations")
    }

    pub fn list_releases(&self) -> Result<Vec<Release>> {
        self.rest.list("Releases", "releases")
    }

    /// The release currently serving plugins, if any.
    pub fn active_release(&self) -> Result<Option<Release>> {
        self.rest.get_optional("Releases/Active")
    }

    fn configured_plugins(&self, configuration_sid: &str) -> Result<Vec<ConfiguredPlugin>> {
        self.rest.list(
            &format!("Configurations/{configuration_sid}/Plugins"),
            "plugins",
        )
    }

    /// `plugin` may be a sid or a unique name.
    #[instrument(skip(self))]
    pub fn describe_plugin(&self, plugin: &str) -> Result<DescribePlugin> {
        let plugin: Plugin = self.rest.get(&format!("Plugins/{plugin}"))?;
        let versions = self.list_plugin_versions(&plugin.sid)?;
        let is_active = match self.active_release()? {
            Some(release) => self
                .configured_plugins(&release.configuration_sid)?
                .iter()
                .any(|p| p.plugin_sid == plugin.sid),
            None => false,
        };

        Ok(DescribePlugin {
            plugin,
            is_active,
            versions,
        })
    }

    #[instrument(skip(self))]
    pub fn describe_configuration(&self, configuration_sid: &str) -> Result<DescribeConfiguration> {
        let configuration: Configuration = self
            .rest
            .get(&format!("Configurations/{configuration_sid}"))?;
        let active = self.active_release()?;
        self.describe_loaded_configuration(configuration, active.as_ref())
    }

    fn describe_loaded_configuration(
        &self,
        configuration: Configuration,
        active: Option<&Release>,
    ) -> Result<DescribeConfiguration> {
        let plugins = self.configured_plugins(&configuration.sid)?;
        let is_active = active.is_some_and(|r| r.configuration_sid == configuration.sid);

        Ok(DescribeConfiguration {
            sid: configuration.sid,
            name: configuration.name,
            description: configuration.description,
            is_active,
            is_archived: configuration.archived,
            plugins,
            date_created: configuration.date_created,
        })
    }

    #[instrument(skip(self))]
    pub fn describe_release(&self, release_sid: &str) -> Result<DescribeRelease> {
        let release: Release = self.rest.get(&format!("Releases/{release_sid}"))?;
        let active = self.active_release()?;
        let configuration: Configuration = self
            .rest
            .get(&format!("Configurations/{}", release.configuration_sid))?;
        let configuration = self.describe_loaded_configuration(configuration, active.as_ref())?;
        let is_active = active.is_some_and(|r| r.sid == release.sid);

        Ok(DescribeRelease {
            release,
            is_active,
            configuration,
        })
    }

    /// Makes `configuration_sid` the active configuration.
    #[instrument(skip(self))]
    pub fn create_release(&self, configuration_sid: &str) -> Result<Release> {
        self.rest.post_form(
            "Releases",
            &[("ConfigurationId", configuration_sid.to_string())],
        )
    }

    /// Returns the plugin named `unique_name`, registering it first if needed.
    #[instrument(skip(self))]
    pub fn upsert_plugin(&self, unique_name: &str, description: Option<&str>) -> Result<Plugin> {
        if let Some(plugin) = self.rest.get_optional(&format!("Plugins/{unique_name}"))? {
            debug!("plugin {unique_name} already registered");
            return Ok(plugin);
        }

        let mut form = vec![
            ("UniqueName", unique_name.to_string()),
            ("FriendlyName", unique_name.to_string()),
        ];
        if let Some(description) = description {
            form.push(("Description", description.to_string()));
        }
        self.rest.post_form("Plugins", &form)
    }

    #[instrument(skip(self))]
    pub fn create_plugin_version(
        &self,
        plugin: &str,
        version: &NewPluginVersion,
    ) -> Result<PluginVersion> {
        let mut form = vec![
            ("Version", version.version.clone()),
            ("PluginUrl", version.plugin_url.clone()),
            ("Private", version.private.to_string()),
        ];
        if let Some(changelog) = &version.changelog {
            form.push(("Changelog", changelog.clone()));
        }
        self.rest
            .post_form(&format!("Plugins/{plugin}/Versions"), &form)
    }
}
