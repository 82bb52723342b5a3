use crate::plugin::{Plugin, PluginRegistry};
use crate::Result;

/// List plugins, or print one plugin's manual.
pub fn run(plugins: &PluginRegistry, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => print_manual(plugins.resolve(name)?),
        None => {
            println!("Plugins:");
            for plugin in plugins.plugins() {
                let summary = plugin.manual().lines().next().unwrap_or_default();
                println!("  {}", summary);
            }
        }
    }
    Ok(())
}

pub fn print_manual(plugin: &dyn Plugin) {
    println!("{}", plugin.manual());
}
