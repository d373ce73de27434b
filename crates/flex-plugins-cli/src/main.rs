use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use flex_plugins_api::{NewPluginVersion, PluginsApiClient};
use flex_plugins_core::config::PollingConfig;
use flex_plugins_core::constants::{CONFIG_FILE, FLEX_PACKAGES, SUPPORTED_BUILDER_VERSION};
use flex_plugins_core::package::{is_plugin_folder, package_details, PackageJson};
use flex_plugins_core::{CommandRef, Credentials, FlexConfig, PrimaryCommand, SystemClock};
use flex_plugins_e2e::HttpPluginProbe;
use flex_plugins_serverless::{HttpServerlessApi, ServerlessClient};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod executor;
mod prints;
mod styles;

use styles as s;

/// The command-line interface for Flex plugins.
#[derive(Debug, Parser)]
#[command(name = "flex-plugins")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(
    help_template = "{bin} {version}\n\n{about-with-newline}{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
#[command(about = "Build, deploy and release Twilio Flex plugins")]
#[command(long_about = "Build, deploy and release Twilio Flex plugins.

Common Commands:
  build                   Bundle the plugin
  start                   Run the plugin locally
  test                    Run the plugin's tests
  deploy                  Bundle, upload and register a new plugin version
  release                 Activate a configuration (--sid)
  describe:plugin         Show a plugin and its versions (--name)
  describe:configuration  Show a configuration (--sid)
  describe:release        Show a release (--sid)
  describe:package        Show installed Flex packages
  list:plugins            List registered plugins
  legacy:check            Report whether the v0.0.0 bundle is still deployed
  legacy:remove           Redeploy the plugin without its v0.0.0 bundle
  wait:start              Wait for a local plugin server to answer
  wait:release            Wait for Flex to serve a plugin
")]
pub(crate) struct Cli {
    /// Command in canonical form, for example: `build`, `describe:plugin`, `legacy:check`
    command: Option<String>,
    /// Optional selector (supports `flex-plugins describe plugin` style)
    selector: Option<String>,
    /// Path to the flex-plugins config file.
    #[arg(long, default_value = CONFIG_FILE)]
    config: String,
    /// Plugin directory.
    #[arg(long, default_value = ".")]
    dir: PathBuf,
    /// Print results as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Minimum log level, on top of RUST_LOG.
    #[arg(short = 'l', long, default_value = "info")]
    log_level: Level,
    /// Resource sid for `release` and `describe:{configuration,release}`.
    #[arg(long)]
    sid: Option<String>,
    /// Plugin name; defaults to the name in package.json.
    #[arg(long)]
    name: Option<String>,
    /// Version to deploy; defaults to the version in package.json.
    #[arg(long = "plugin-version")]
    plugin_version: Option<String>,
    /// Changelog recorded with the deployed version.
    #[arg(long)]
    changelog: Option<String>,
    /// Description used when the plugin is registered for the first time.
    #[arg(long)]
    description: Option<String>,
    /// Deploy the bundle as private.
    #[arg(long, default_value_t = false)]
    private: bool,
    /// URL polled by `wait:start`.
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,
    /// Flex base URL polled by `wait:release`.
    #[arg(long, default_value = "https://flex.twilio.com")]
    flex_url: String,
    /// Overrides `[polling] timeout_ms`.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Overrides `[polling] interval_ms`.
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(cli.log_level.into()))
        .init();
    debug!("parsed cli arguments: {:?}", cli);

    let command_name = match &cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            return Ok(());
        }
    };

    let command_text = match &cli.selector {
        Some(selector) => format!("{}:{}", command_name, selector),
        None => command_name.clone(),
    };

    let command = CommandRef::from_str(&command_text)
        .map_err(|e| anyhow!("failed to parse command '{}': {e}", command_text))?;

    if command.primary.requires_plugin_folder() && !is_plugin_folder(&cli.dir) {
        bail!(
            "'{}' is not a Flex plugin directory: package.json must depend on flex-plugin-scripts and @twilio/flex-ui",
            cli.dir.display()
        );
    }

    if command.primary.checks_compatibility() {
        let pkg = PackageJson::load(&cli.dir)?;
        if let Some(message) = incompatibility(&pkg) {
            eprintln!("{message}");
            std::process::exit(1);
        }
    }

    let cfg = FlexConfig::load_or_default(&cli.config)
        .with_context(|| format!("unable to load config '{}'", cli.config))?;

    execute(&cli, &cfg, &command)
}

/// The message to print when the plugin's builder is not supported.
fn incompatibility(pkg: &PackageJson) -> Option<String> {
    let version = pkg.builder_version();
    if version == Some(SUPPORTED_BUILDER_VERSION) {
        return None;
    }
    let name = pkg.name.as_deref().unwrap_or("plugin");
    Some(prints::incompatible_version(name, version))
}

/// Executes a validated command.
fn execute(cli: &Cli, cfg: &FlexConfig, command: &CommandRef) -> Result<()> {
    let result = execute_inner(cli, cfg, command);
    if let Err(err) = &result {
        debug!("{} failed: {err:#}", command.canonical());
    }
    result
}

fn execute_inner(cli: &Cli, cfg: &FlexConfig, command: &CommandRef) -> Result<()> {
    let selector = command.selector.as_deref();

    match command.primary {
        PrimaryCommand::Build | PrimaryCommand::Start | PrimaryCommand::Test => {
            executor::run(&cfg.scripts, &cli.dir, command.primary, None)
        }
        PrimaryCommand::Deploy => deploy(cli, cfg),
        PrimaryCommand::Release => {
            let sid = required(&cli.sid, "--sid")?;
            let release = plugins_api(cfg)?.create_release(sid)?;
            emit(cli, &release, |r| {
                println!("release {} activated configuration {}", r.sid, r.configuration_sid)
            })
        }
        PrimaryCommand::Describe => match selector {
            Some("plugin") => {
                let name = plugin_name(cli)?;
                let plugin = plugins_api(cfg)?.describe_plugin(&name)?;
                emit(cli, &plugin, |p| {
                    println!("{} {}", p.plugin.unique_name, paint_sid(&p.plugin.sid));
                    println!("active: {}", p.is_active);
                    for v in &p.versions {
                        println!("  {} {} {}", v.version, paint_sid(&v.sid), v.plugin_url);
                    }
                })
            }
            Some("configuration") => {
                let sid = required(&cli.sid, "--sid")?;
                let configuration = plugins_api(cfg)?.describe_configuration(sid)?;
                emit(cli, &configuration, |c| {
                    println!("{} {}", c.name, paint_sid(&c.sid));
                    println!("active: {} archived: {}", c.is_active, c.is_archived);
                    for p in &c.plugins {
                        println!("  {}@{}", p.unique_name, p.version);
                    }
                })
            }
            Some("release") => {
                let sid = required(&cli.sid, "--sid")?;
                let release = plugins_api(cfg)?.describe_release(sid)?;
                emit(cli, &release, |r| {
                    println!("{} active: {}", paint_sid(&r.release.sid), r.is_active);
                    println!("configuration {}", r.configuration.name);
                    for p in &r.configuration.plugins {
                        println!("  {}@{}", p.unique_name, p.version);
                    }
                })
            }
            Some("package") => {
                let details = package_details(&cli.dir, FLEX_PACKAGES);
                emit(cli, &details, |details| {
                    for d in details {
                        match &d.version {
                            Some(version) if d.found => println!("{} {}", d.name, version),
                            _ => println!("{} {}", d.name, s::paint(s::DIM, "not installed")),
                        }
                    }
                })
            }
            _ => unknown_selector(command),
        },
        PrimaryCommand::List => {
            let api = plugins_api(cfg)?;
            match selector {
                Some("plugins") => emit(cli, &api.list_plugins()?, |plugins| {
                    for p in plugins {
                        println!("{} {}", p.unique_name, paint_sid(&p.sid));
                    }
                }),
                Some("configurations") => emit(cli, &api.list_configurations()?, |configs| {
                    for c in configs {
                        println!("{} {}", c.name, paint_sid(&c.sid));
                    }
                }),
                Some("releases") => emit(cli, &api.list_releases()?, |releases| {
                    for r in releases {
                        println!("{} configuration {}", paint_sid(&r.sid), r.configuration_sid);
                    }
                }),
                _ => unknown_selector(command),
            }
        }
        PrimaryCommand::Legacy => {
            let remove = match selector.unwrap_or("check") {
                "check" => false,
                "remove" => true,
                _ => return unknown_selector(command),
            };
            let name = plugin_name(cli)?;
            let client = serverless(cfg)?;
            if remove {
                let service = client.get_or_create_default_service()?;
                client.remove_legacy(&service.sid, &name)?;
                println!("legacy bundle of {name} removed");
                return Ok(());
            }

            let found = client.default_service_has_legacy(&name)?;
            emit(cli, &found, |found| {
                if *found {
                    println!("{name} still serves its v0.0.0 bundle");
                } else {
                    println!("{name} has no legacy bundle");
                }
            })
        }
        PrimaryCommand::Wait => {
            let probe = HttpPluginProbe::default();
            match selector {
                Some("start") => {
                    let polling = poll_timing(cli, cfg);
                    flex_plugins_e2e::wait_for_plugin_to_start(
                        &probe,
                        &SystemClock,
                        &cli.url,
                        polling.timeout(),
                        polling.interval(),
                    )?;
                    println!("plugin is up at {}", cli.url);
                    Ok(())
                }
                Some("release") => {
                    let name = plugin_name(cli)?;
                    let polling = poll_timing(cli, cfg);
                    flex_plugins_e2e::wait_for_plugin_to_release(
                        &probe,
                        &SystemClock,
                        &cli.flex_url,
                        &name,
                        polling.timeout(),
                        polling.interval(),
                    )?;
                    println!("{name} is served by {}", cli.flex_url);
                    Ok(())
                }
                _ => unknown_selector(command),
            }
        }
    }
}

/// Runs the deploy scripts, then registers the uploaded bundle as a new
/// plugin version.
fn deploy(cli: &Cli, cfg: &FlexConfig) -> Result<()> {
    let pkg = PackageJson::load(&cli.dir)?;
    let name = cli
        .name
        .clone()
        .or(pkg.name)
        .context("plugin name missing: set it in package.json or pass --name")?;
    let version = cli
        .plugin_version
        .clone()
        .or(pkg.version)
        .context("plugin version missing: set it in package.json or pass --plugin-version")?;

    executor::run(&cfg.scripts, &cli.dir, PrimaryCommand::Deploy, Some(&version))?;

    let creds = credentials(cfg)?;
    let client = ServerlessClient::new(HttpServerlessApi::new(&cfg.api.serverless_url, &creds));
    let service = client.get_or_create_default_service()?;
    let environment = client
        .get_environment(&service.sid, &name)?
        .with_context(|| format!("no environment for {name} in service {}", service.sid))?;
    let domain = environment
        .domain_name
        .with_context(|| format!("environment {} has no domain", environment.sid))?;

    let api = PluginsApiClient::new(&cfg.api.plugins_url, &creds);
    let plugin = api.upsert_plugin(&name, cli.description.as_deref())?;
    let created = api.create_plugin_version(
        &plugin.sid,
        &NewPluginVersion {
            version: version.clone(),
            plugin_url: bundle_url(&domain, &name, &version),
            private: cli.private,
            changelog: cli.changelog.clone(),
        },
    )?;

    emit(cli, &created, |v| {
        println!("deployed {name}@{} {}", v.version, paint_sid(&v.sid));
        println!("{}", v.plugin_url);
    })
}

fn bundle_url(domain: &str, name: &str, version: &str) -> String {
    format!("https://{domain}/plugins/{name}/{version}/bundle.js")
}

fn credentials(cfg: &FlexConfig) -> Result<Credentials> {
    cfg.credentials(|key| std::env::var(key).ok())
}

fn plugins_api(cfg: &FlexConfig) -> Result<PluginsApiClient> {
    Ok(PluginsApiClient::new(&cfg.api.plugins_url, &credentials(cfg)?))
}

fn serverless(cfg: &FlexConfig) -> Result<ServerlessClient<HttpServerlessApi>> {
    let creds = credentials(cfg)?;
    Ok(ServerlessClient::new(HttpServerlessApi::new(
        &cfg.api.serverless_url,
        &creds,
    )))
}

/// `--name`, or the name declared in the plugin's package.json.
fn plugin_name(cli: &Cli) -> Result<String> {
    if let Some(name) = &cli.name {
        return Ok(name.clone());
    }
    PackageJson::load(&cli.dir)
        .ok()
        .and_then(|pkg| pkg.name)
        .context("plugin name missing: pass --name or run inside a plugin directory")
}

/// `[polling]` with the command-line overrides applied.
fn poll_timing(cli: &Cli, cfg: &FlexConfig) -> PollingConfig {
    PollingConfig {
        timeout_ms: cli.timeout_ms.unwrap_or(cfg.polling.timeout_ms),
        interval_ms: cli.interval_ms.unwrap_or(cfg.polling.interval_ms),
    }
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{flag} is required for this command"))
}

fn unknown_selector(command: &CommandRef) -> Result<()> {
    Err(anyhow!("unsupported command '{}'", command.canonical()))
}

fn emit<T: Serialize>(cli: &Cli, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn paint_sid(sid: &str) -> String {
    s::paint(s::DIM, sid)
}
