use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};

use flex_plugins_core::config::ScriptsConfig;
use flex_plugins_core::package::major_version;
use flex_plugins_core::PrimaryCommand;
use tracing::{debug, info, instrument};

use crate::prints;

/// Node major from which bundling may trip over OpenSSL 3.
const OPENSSL_NODE_MAJOR: u64 = 18;

/// Bundler scripts a primary command runs, in order.
pub fn script_sequence(primary: PrimaryCommand, version: Option<&str>) -> Vec<Vec<String>> {
    match primary {
        PrimaryCommand::Build => vec![argv(&["pre-script-check"]), argv(&["build"])],
        PrimaryCommand::Start => vec![
            argv(&["pre-script-check"]),
            argv(&["pre-start-check"]),
            argv(&["start"]),
        ],
        PrimaryCommand::Test => vec![argv(&["pre-script-check"]), argv(&["test", "--env=jsdom"])],
        PrimaryCommand::Deploy => {
            let mut deploy = argv(&["deploy"]);
            if let Some(version) = version {
                deploy.push("--version".to_string());
                deploy.push(version.to_string());
            }
            vec![argv(&["pre-script-check"]), argv(&["build"]), deploy]
        }
        _ => Vec::new(),
    }
}

/// Runs the scripts for `primary` inside the plugin directory.
#[instrument(skip(scripts))]
pub fn run(
    scripts: &ScriptsConfig,
    dir: &Path,
    primary: PrimaryCommand,
    version: Option<&str>,
) -> Result<()> {
    let sequence = script_sequence(primary, version);
    if sequence.is_empty() {
        bail!("command '{}' does not run bundler scripts", primary.as_str());
    }

    for script in sequence {
        let mut full = scripts.runner.clone();
        full.extend(script.iter().cloned());

        info!(target: "flex-plugins", "run {}", script.join(" "));
        if let Err(err) = run_argv(&full, dir) {
            if node_major().is_some_and(|major| major >= OPENSSL_NODE_MAJOR) {
                eprintln!("{}", prints::openssl_warning());
            }
            return Err(err).with_context(|| format!("{} failed", primary.as_str()));
        }
    }

    Ok(())
}

fn run_argv(argv: &[String], dir: &Path) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command argv"))?;

    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .status()
        .with_context(|| format!("failed to start command '{} {}'", program, args.join(" ")))?;

    if !status.success() {
        bail!(
            "command failed with status {}: {} {}",
            status,
            program,
            args.join(" ")
        );
    }

    Ok(())
}

/// Major version of the `node` on `PATH`, if any.
fn node_major() -> Option<u64> {
    let output = Command::new("node").arg("--version").output().ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let major = major_version(text.trim());
    debug!("node version {} (major {:?})", text.trim(), major);
    major
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names(sequence: &[Vec<String>]) -> Vec<String> {
        sequence.iter().map(|s| s.join(" ")).collect()
    }

    #[test]
    fn start_runs_both_checks_first() {
        let seq = script_sequence(PrimaryCommand::Start, None);
        assert_eq!(names(&seq), vec!["pre-script-check", "pre-start-check", "start"]);
    }

    #[test]
    fn test_runs_with_jsdom() {
        let seq = script_sequence(PrimaryCommand::Test, None);
        assert_eq!(names(&seq), vec!["pre-script-check", "test --env=jsdom"]);
    }

    #[test]
    fn deploy_builds_before_deploying_version() {
        let seq = script_sequence(PrimaryCommand::Deploy, Some("1.2.0"));
        assert_eq!(
            names(&seq),
            vec!["pre-script-check", "build", "deploy --version 1.2.0"]
        );
    }

    #[test]
    fn non_script_commands_have_no_sequence() {
        assert!(script_sequence(PrimaryCommand::Describe, None).is_empty());
        assert!(script_sequence(PrimaryCommand::Legacy, None).is_empty());
    }

    #[test]
    fn runner_failure_is_reported() {
        // `false` ignores its arguments and exits non-zero.
        let dir = tempdir().expect("tempdir");
        let scripts = ScriptsConfig {
            runner: vec!["false".to_string()],
        };

        let err = run(&scripts, dir.path(), PrimaryCommand::Build, None)
            .expect_err("failing runner should fail the build");
        assert_eq!(err.to_string(), "build failed");
    }

    #[test]
    fn runner_success_runs_every_script() {
        let dir = tempdir().expect("tempdir");
        let scripts = ScriptsConfig {
            runner: vec!["true".to_string()],
        };

        run(&scripts, dir.path(), PrimaryCommand::Start, None).expect("true should succeed");
    }

    #[test]
    fn empty_runner_is_rejected() {
        let dir = tempdir().expect("tempdir");
        assert!(run_argv(&[], dir.path()).is_err());
    }
}
