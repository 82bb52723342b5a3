use crate::config::Settings;
use crate::executor::{execute_connection, ShellExecutor};
use crate::plugin::PluginRegistry;
use crate::registry::Registry;
use crate::{Error, Result};

/// Run a connection and hand back its exit code.
pub fn run(
    registry: &Registry,
    plugins: &PluginRegistry,
    settings: &Settings,
    name: &str,
) -> Result<i32> {
    let executor = ShellExecutor::new(settings.shell.clone());

    match execute_connection(registry, plugins, &executor, name) {
        Err(Error::ConnectionNotFound(_)) => {
            eprintln!("A connection by this name does not exist!");
            Ok(1)
        }
        other => other,
    }
}
