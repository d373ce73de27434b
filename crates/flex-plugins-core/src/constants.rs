//! Constants used across the Flex Plugins workspace.

/// The filename for the toolkit's optional configuration.
pub const CONFIG_FILE: &str = "flex-plugins.toml";

/// The manifest file of a plugin project.
pub const MANIFEST_NODE: &str = "package.json";

/// Package that provides the bundler scripts.
pub const PKG_PLUGIN_SCRIPTS: &str = "flex-plugin-scripts";
/// Package that marks a directory as a Flex UI plugin.
pub const PKG_FLEX_UI: &str = "@twilio/flex-ui";

/// Packages inspected by `describe:package`.
pub const FLEX_PACKAGES: &[&str] = &[
    PKG_FLEX_UI,
    PKG_PLUGIN_SCRIPTS,
    "flex-plugin",
    "flex-dev-utils",
    "craco-config-flex-plugin",
];

/// Builder major version the CLI commands are compatible with.
pub const SUPPORTED_BUILDER_VERSION: u64 = 4;

/// Default API endpoints.
pub const SERVERLESS_BASE_URL: &str = "https://serverless.twilio.com/v1";
pub const PLUGINS_BASE_URL: &str = "https://flex-api.twilio.com/v1/PluginService";

/// Environment variables that override configured credentials.
pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
