//! Client for the Flex Plugins API: plugins, versions, configurations and
//! releases.

pub mod client;
pub mod model;

pub use client::PluginsApiClient;
pub use model::{
    Configuration, ConfiguredPlugin, DescribeConfiguration, DescribePlugin, DescribeRelease,
    NewPluginVersion, Plugin, PluginVersion, Release,
};
