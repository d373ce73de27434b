//! Serverless resources as returned by the API.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique name of the service that hosts plugin bundles.
pub const DEFAULT_SERVICE_UNIQUE_NAME: &str = "default";
/// Friendly name given to that service when it is created.
pub const DEFAULT_SERVICE_FRIENDLY_NAME: &str =
    "Flex Plugins Service (Autogenerated) - Do Not Delete";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub sid: String,
    pub unique_name: String,
    pub friendly_name: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub sid: String,
    pub service_sid: String,
    pub unique_name: String,
    /// The build currently deployed to this environment.
    #[serde(default)]
    pub build_sid: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
}

/// An asset or function version referenced by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersion {
    pub sid: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Building,
    Completed,
    Failed,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Building)
    }
}

impl Display for BuildStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Building => f.write_str("building"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub sid: String,
    pub service_sid: String,
    pub status: BuildStatus,
    #[serde(default)]
    pub asset_versions: Vec<FileVersion>,
    #[serde(default)]
    pub function_versions: Vec<FileVersion>,
    /// Opaque dependency list, carried through to new builds untouched.
    #[serde(default)]
    pub dependencies: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub sid: String,
    pub environment_sid: String,
    pub build_sid: String,
}

/// Parameters for a new build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildRequest {
    pub asset_versions: Vec<String>,
    pub function_versions: Vec<String>,
    pub dependencies: Option<Value>,
}

impl BuildRequest {
    /// Form fields in the shape the Serverless API expects.
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = Vec::new();
        for sid in &self.asset_versions {
            form.push(("AssetVersions", sid.clone()));
        }
        for sid in &self.function_versions {
            form.push(("FunctionVersions", sid.clone()));
        }
        if let Some(dependencies) = &self.dependencies {
            form.push(("Dependencies", dependencies.to_string()));
        }
        form
    }
}

/// The environment of a plugin together with its active build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEnvironment {
    pub build: Build,
    pub environment: Environment,
}
