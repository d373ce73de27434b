//! Serverless API client for Flex plugin deployments.
//!
//! Resolves the service that hosts plugin bundles, finds the environment and
//! active build of a plugin, and creates and deploys new builds.

pub mod api;
pub mod client;
pub mod error;
pub mod legacy;
pub mod model;

pub use api::{HttpServerlessApi, ServerlessApi};
pub use client::{ServerlessClient, BUILD_POLL};
pub use error::ServerlessError;
pub use model::{Build, BuildEnvironment, BuildRequest, BuildStatus, Environment, Service};
