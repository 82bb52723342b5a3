mod builtin;

pub use builtin::{DefaultPlugin, SshPlugin};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::registry::ConnectionSpec;
use crate::{Error, Result};

/// An execution strategy, selected by the plugin name stored with a
/// connection.
pub trait Plugin {
    /// Identifier stored in connection records.
    fn name(&self) -> &'static str;

    /// Help text shown for the plugin.
    fn manual(&self) -> &'static str;

    /// Turn a stored connection into the shell command to run.
    fn prepare(&self, spec: &ConnectionSpec) -> String;
}

/// How a bare positional argument is interpreted.
pub enum Positional<'a> {
    Plugin(&'a dyn Plugin),
    Connection(&'a str),
}

/// The set of plugins known to this build.
pub struct PluginRegistry {
    plugins: FxHashMap<&'static str, Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// A registry with no plugins at all.
    pub fn empty() -> Self {
        Self {
            plugins: FxHashMap::default(),
        }
    }

    /// The `default` and `ssh` plugins.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DefaultPlugin));
        registry.register(Box::new(SshPlugin));
        registry
    }

    /// Add a plugin, replacing any plugin of the same name.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.insert(plugin.name(), plugin);
    }

    pub fn is_plugin(&self, argument: &str) -> bool {
        self.plugins.contains_key(argument)
    }

    /// Decide whether an argument names a plugin or a connection.
    /// Plugin names take precedence.
    pub fn classify<'a>(&'a self, argument: &'a str) -> Positional<'a> {
        match self.plugins.get(argument) {
            Some(plugin) => Positional::Plugin(plugin.as_ref()),
            None => Positional::Connection(argument),
        }
    }

    /// Look up a plugin by name.
    pub fn resolve(&self, name: &str) -> Result<&dyn Plugin> {
        let plugin = self
            .plugins
            .get(name)
            .map(|p| p.as_ref())
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))?;
        debug!(plugin = plugin.name(), "plugin resolved");
        Ok(plugin)
    }

    /// All plugins, sorted by name.
    pub fn plugins(&self) -> Vec<&dyn Plugin> {
        let mut plugins: Vec<&dyn Plugin> = self.plugins.values().map(|p| p.as_ref()).collect();
        plugins.sort_by_key(|p| p.name());
        plugins
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
