use std::path::Path;
use std::process::Command;
use tracing::{debug, instrument, warn};

use crate::plugin::PluginRegistry;
use crate::registry::{Registry, DEFAULT_PLUGIN};
use crate::{Error, Result};

/// Environment variable pointing the command at its connection's storage
/// directory.
pub const STORAGE_ENV: &str = "CONNECT_DIR";

/// Runs a resolved command string.
pub trait Executor {
    /// Run `command` to completion and return its exit code.
    fn run(&self, command: &str, storage: &Path) -> Result<i32>;
}

/// Executes commands through the system shell with inherited stdio and
/// environment.
pub struct ShellExecutor {
    shell: Option<String>,
}

impl ShellExecutor {
    /// Use `shell -c`, or the platform shell when `None`.
    pub fn new(shell: Option<String>) -> Self {
        Self { shell }
    }

    fn command(&self, command: &str) -> Command {
        match &self.shell {
            Some(shell) => {
                let mut c = Command::new(shell);
                c.arg("-c").arg(command);
                c
            }
            None if cfg!(windows) => {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(command);
                c
            }
            None => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(command);
                c
            }
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Executor for ShellExecutor {
    #[instrument(skip(self))]
    fn run(&self, command: &str, storage: &Path) -> Result<i32> {
        let status = self
            .command(command)
            .env(STORAGE_ENV, storage)
            .status()
            .map_err(|e| Error::Spawn {
                command: command.to_string(),
                source: e,
            })?;

        debug!(%status, "command finished");
        // Killed by a signal: no code to forward
        Ok(status.code().unwrap_or(1))
    }
}

/// Look up a connection, resolve its plugin, and run it.
///
/// The connection must have a storage directory and a map entry; otherwise
/// this fails with [`Error::ConnectionNotFound`] without running anything.
/// A plugin name this build does not know falls back to the default plugin.
pub fn execute_connection(
    registry: &Registry,
    plugins: &PluginRegistry,
    executor: &dyn Executor,
    name: &str,
) -> Result<i32> {
    if !registry.exists(name) {
        return Err(Error::ConnectionNotFound(name.to_string()));
    }
    let spec = registry
        .lookup(name)?
        .ok_or_else(|| Error::ConnectionNotFound(name.to_string()))?;

    let plugin = match plugins.resolve(&spec.plugin) {
        Err(Error::UnknownPlugin(unknown)) => {
            warn!(name, plugin = %unknown, "unknown plugin, falling back to the default");
            plugins.resolve(DEFAULT_PLUGIN)?
        }
        resolved => resolved?,
    };
    let command = plugin.prepare(&spec);
    debug!(name, plugin = plugin.name(), "executing connection");

    executor.run(&command, &registry.layout().connection_dir(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RegistryLayout;
    use crate::registry::ConnectionRecord;
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Records commands instead of running them.
    #[derive(Default)]
    struct RecordingExecutor {
        calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl Executor for RecordingExecutor {
        fn run(&self, command: &str, storage: &Path) -> Result<i32> {
            self.calls
                .borrow_mut()
                .push((command.to_string(), storage.to_path_buf()));
            Ok(0)
        }
    }

    fn registry_in(dir: &Path) -> Registry {
        Registry::new(RegistryLayout::new(dir.join("registry")))
    }

    #[test]
    fn test_execute_runs_stored_command() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = registry_in(temp_dir.path());
        registry
            .upsert(&ConnectionRecord::new("prod", "ssh prod"))
            .unwrap();
        let executor = RecordingExecutor::default();

        let code =
            execute_connection(&registry, &PluginRegistry::builtin(), &executor, "prod").unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            executor.calls.borrow().as_slice(),
            &[(
                "ssh prod".to_string(),
                registry.layout().connection_dir("prod")
            )]
        );
    }

    #[test]
    fn test_missing_connection_never_runs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = registry_in(temp_dir.path());
        let executor = RecordingExecutor::default();

        assert!(!registry.exists("missing"));
        let result =
            execute_connection(&registry, &PluginRegistry::builtin(), &executor, "missing");

        assert!(matches!(result, Err(Error::ConnectionNotFound(name)) if name == "missing"));
        assert!(executor.calls.borrow().is_empty());
    }

    #[test]
    fn test_directory_without_map_entry_never_runs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = registry_in(temp_dir.path());
        std::fs::create_dir_all(registry.layout().connection_dir("orphan")).unwrap();
        let executor = RecordingExecutor::default();

        let result =
            execute_connection(&registry, &PluginRegistry::builtin(), &executor, "orphan");

        assert!(matches!(result, Err(Error::ConnectionNotFound(_))));
        assert!(executor.calls.borrow().is_empty());
    }

    #[test]
    fn test_unknown_plugin_falls_back_to_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = registry_in(temp_dir.path());
        registry
            .upsert(&ConnectionRecord::new("old", "telnet host").with_plugin(Some("telnet".into())))
            .unwrap();
        let executor = RecordingExecutor::default();

        let code =
            execute_connection(&registry, &PluginRegistry::builtin(), &executor, "old").unwrap();

        assert_eq!(code, 0);
        assert_eq!(executor.calls.borrow()[0].0, "telnet host");
    }

    #[test]
    fn test_unknown_plugin_without_default_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = registry_in(temp_dir.path());
        registry
            .upsert(&ConnectionRecord::new("old", "telnet host").with_plugin(Some("telnet".into())))
            .unwrap();
        let executor = RecordingExecutor::default();

        let result = execute_connection(&registry, &PluginRegistry::empty(), &executor, "old");

        assert!(matches!(result, Err(Error::UnknownPlugin(name)) if name == "default"));
        assert!(executor.calls.borrow().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_executor_forwards_exit_code() {
        let executor = ShellExecutor::default();
        assert_eq!(executor.run("exit 3", Path::new("/tmp")).unwrap(), 3);
        assert_eq!(executor.run("true", Path::new("/tmp")).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_executor_exports_storage_dir() {
        let executor = ShellExecutor::default();
        let code = executor
            .run("test \"$CONNECT_DIR\" = /srv/connect/prod", Path::new("/srv/connect/prod"))
            .unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_shell() {
        let executor = ShellExecutor::new(Some("sh".to_string()));
        assert_eq!(executor.run("exit 7", Path::new("/tmp")).unwrap(), 7);
    }

    #[test]
    fn test_spawn_failure() {
        let executor = ShellExecutor::new(Some("/nonexistent/shell".to_string()));
        assert!(matches!(
            executor.run("true", Path::new("/tmp")),
            Err(Error::Spawn { .. })
        ));
    }
}
