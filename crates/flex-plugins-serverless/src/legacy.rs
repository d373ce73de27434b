//! Detection and removal of the v0.0.0 plugin bundle.
//!
//! Detection compares asset paths exactly while removal drops every asset
//! whose path merely contains the legacy path.

use crate::model::{Build, BuildRequest, FileVersion};

/// Path of the legacy bundle for `plugin_name`.
pub fn legacy_asset_path(plugin_name: &str) -> String {
    format!("/plugins/{plugin_name}/0.0.0/bundle.js")
}

/// The asset version whose path equals the legacy path.
pub fn legacy_asset<'a>(build: &'a Build, plugin_name: &str) -> Option<&'a FileVersion> {
    let path = legacy_asset_path(plugin_name);
    build.asset_versions.iter().find(|asset| asset.path == path)
}

pub fn has_legacy_asset(build: &Build, plugin_name: &str) -> bool {
    legacy_asset(build, plugin_name).is_some()
}

/// Manifest of `build` without the legacy bundle.
pub fn build_filtered_manifest(build: &Build, plugin_name: &str) -> BuildRequest {
    let path = legacy_asset_path(plugin_name);
    let asset_versions = build
        .asset_versions
        .iter()
        .filter(|asset| !asset.path.contains(&path))
        .map(|asset| asset.sid.clone())
        .collect();
    let function_versions = build
        .function_versions
        .iter()
        .map(|function| function.sid.clone())
        .collect();

    BuildRequest {
        asset_versions,
        function_versions,
        dependencies: build.dependencies.clone(),
    }
}
