use crate::styles::{self as s, paint};

const LEGACY_PROVIDER: &str = "NODE_OPTIONS=--openssl-legacy-provider";

pub fn incompatible_version(name: &str, version: Option<u64>) -> String {
    let version = version.map_or_else(|| "null".to_string(), |v| v.to_string());
    format!(
        "{}\n\nRun {} to upgrade your plugin.",
        paint(
            s::ERROR,
            &format!("The plugin {name} version (v{version}) is not compatible with this CLI command.")
        ),
        paint(s::COMMAND, "twilio flex:plugins:upgrade-plugin --install"),
    )
}

pub fn openssl_warning() -> String {
    format!(
        "\n{}\n\nFor MacOS & Linux: Run {}\n\nFor Windows: Run {}\n",
        paint(
            s::WARNING,
            "WARNING: There might be a problem running this command in Node v18 due to a newer \
             version of OpenSSL. To use the legacy OpenSSL provider, run the following command"
        ),
        paint(s::COMMAND, &format!("export {LEGACY_PROVIDER}")),
        paint(s::COMMAND, &format!("set {LEGACY_PROVIDER}")),
    )
}
