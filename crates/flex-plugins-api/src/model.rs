use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub sid: String,
    pub unique_name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginVersion {
    pub sid: String,
    pub plugin_sid: String,
    pub version: String,
    pub plugin_url: String,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub sid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub date_created: Option<String>,
}

/// A plugin version as it is pinned inside a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredPlugin {
    pub plugin_sid: String,
    pub plugin_version_sid: String,
    pub unique_name: String,
    pub version: String,
    pub plugin_url: String,
    #[serde(default)]
    pub phase: Option<u32>,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub sid: String,
    pub configuration_sid: String,
    #[serde(default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescribePlugin {
    #[serde(flatten)]
    pub plugin: Plugin,
    pub is_active: bool,
    pub versions: Vec<PluginVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescribeConfiguration {
    pub sid: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_archived: bool,
    pub plugins: Vec<ConfiguredPlugin>,
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescribeRelease {
    #[serde(flatten)]
    pub release: Release,
    pub is_active: bool,
    pub configuration: DescribeConfiguration,
}

/// Fields for a new plugin version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPluginVersion {
    pub version: String,
    pub plugin_url: String,
    pub private: bool,
    pub changelog: Option<String>,
}
