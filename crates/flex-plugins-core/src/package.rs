//! `package.json` introspection for plugin directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::{MANIFEST_NODE, PKG_FLEX_UI, PKG_PLUGIN_SCRIPTS};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The parts of a `package.json` the toolkit cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl PackageJson {
    pub fn load(dir: &Path) -> Result<Self, PackageError> {
        let path = dir.join(MANIFEST_NODE);
        let text = std::fs::read_to_string(&path).map_err(|source| PackageError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PackageError::Parse { path, source })
    }

    /// Version spec of a dependency, looked up in `dependencies` first.
    /// Empty entries count as missing.
    pub fn dependency(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .filter(|spec| !spec.is_empty())
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
            .filter(|spec| !spec.is_empty())
    }

    /// Major version of `flex-plugin-scripts`, if it is a parsable version.
    pub fn builder_version(&self) -> Option<u64> {
        let spec = self.dependency(PKG_PLUGIN_SCRIPTS)?;
        major_version(spec)
    }

    /// Whether both the bundler scripts and the Flex UI are declared.
    pub fn is_plugin(&self) -> bool {
        self.dependency(PKG_PLUGIN_SCRIPTS).is_some() && self.dependency(PKG_FLEX_UI).is_some()
    }
}

/// Extracts the major version from a version spec such as `^2.3.4-beta.0`,
/// `~4.0` or `4.x`.
pub fn major_version(spec: &str) -> Option<u64> {
    coerce_version(spec).map(|v| v.major)
}

/// Reads the first `major[.minor[.patch]]` run in `spec`, filling missing
/// parts with zero. `None` when `spec` holds no digits.
pub fn coerce_version(spec: &str) -> Option<semver::Version> {
    let start = spec.find(|c: char| c.is_ascii_digit())?;
    let mut parts = [0u64; 3];

    for (i, part) in spec[start..].split('.').take(3).enumerate() {
        let end = part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(part.len());
        if end == 0 {
            break;
        }
        parts[i] = part[..end].parse().ok()?;
        if end != part.len() {
            break;
        }
    }

    Some(semver::Version::new(parts[0], parts[1], parts[2]))
}

/// Whether `dir` holds a Flex plugin.
pub fn is_plugin_folder(dir: &Path) -> bool {
    if !dir.join(MANIFEST_NODE).is_file() {
        debug!("no {MANIFEST_NODE} in {}", dir.display());
        return false;
    }

    match PackageJson::load(dir) {
        Ok(pkg) => pkg.is_plugin(),
        Err(err) => {
            debug!("{err}");
            false
        }
    }
}

/// Installed package metadata for `describe:package`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDetail {
    pub name: String,
    pub found: bool,
    pub version: Option<String>,
}

/// Resolves each package under `dir/node_modules` and reports its version.
pub fn package_details(dir: &Path, packages: &[&str]) -> Vec<PackageDetail> {
    packages
        .iter()
        .map(|name| {
            let pkg_dir = dir.join("node_modules").join(name);
            match PackageJson::load(&pkg_dir) {
                Ok(pkg) => PackageDetail {
                    name: (*name).to_string(),
                    found: true,
                    version: pkg.version,
                },
                Err(_) => PackageDetail {
                    name: (*name).to_string(),
                    found: false,
                    version: None,
                },
            }
        })
        .collect()
}
