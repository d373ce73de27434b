use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryCommand {
    Build,
    Start,
    Test,
    Deploy,
    Release,
    Describe,
    List,
    Legacy,
    Wait,
}

impl PrimaryCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Start => "start",
            Self::Test => "test",
            Self::Deploy => "deploy",
            Self::Release => "release",
            Self::Describe => "describe",
            Self::List => "list",
            Self::Legacy => "legacy",
            Self::Wait => "wait",
        }
    }

    /// Whether the command drives the bundler and therefore needs a
    /// compatible `flex-plugin-scripts` in the current plugin.
    pub fn checks_compatibility(self) -> bool {
        matches!(self, Self::Build | Self::Start | Self::Test | Self::Deploy)
    }

    /// Whether the command must run from inside a plugin directory.
    pub fn requires_plugin_folder(self) -> bool {
        matches!(
            self,
            Self::Build | Self::Start | Self::Test | Self::Deploy | Self::Legacy
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandRef {
    pub primary: PrimaryCommand,
    pub selector: Option<String>,
}

impl CommandRef {
    pub fn canonical(&self) -> String {
        match &self.selector {
            Some(selector) => format!("{}:{}", self.primary.as_str(), selector),
            None => self.primary.as_str().to_string(),
        }
    }
}

impl Display for CommandRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("unknown primary command '{0}'")]
    UnknownPrimary(String),
    #[error("command '{0}' requires a selector")]
    MissingSelector(String),
}

impl FromStr for CommandRef {
    type Err = CommandParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(2, ':');
        let primary_text = parts.next().unwrap_or_default();
        let selector = parts
            .next()
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned);

        let primary = match primary_text {
            "build" => PrimaryCommand::Build,
            "start" => PrimaryCommand::Start,
            "test" => PrimaryCommand::Test,
            "deploy" => PrimaryCommand::Deploy,
            "release" => PrimaryCommand::Release,
            "describe" => PrimaryCommand::Describe,
            "list" => PrimaryCommand::List,
            "legacy" => PrimaryCommand::Legacy,
            "wait" => PrimaryCommand::Wait,
            _ => return Err(CommandParseError::UnknownPrimary(primary_text.to_string())),
        };

        let needs_selector = matches!(
            primary,
            PrimaryCommand::Describe | PrimaryCommand::List | PrimaryCommand::Wait
        );
        if needs_selector && selector.is_none() {
            return Err(CommandParseError::MissingSelector(primary_text.to_string()));
        }

        Ok(Self { primary, selector })
    }
}
