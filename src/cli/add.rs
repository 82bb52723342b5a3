use crate::layout::invoker_cwd;
use crate::plugin::PluginRegistry;
use crate::registry::{resolve_attachments, ConnectionRecord, Registry, DEFAULT_PLUGIN};
use crate::Result;

/// Register a connection, replacing any existing one of the same name.
pub fn run(
    registry: &Registry,
    plugins: &PluginRegistry,
    name: String,
    command: String,
    identity: Vec<String>,
    plugin: Option<String>,
) -> Result<()> {
    // Only known plugins may be stored
    let plugin = plugins
        .resolve(plugin.as_deref().unwrap_or(DEFAULT_PLUGIN))?
        .name();

    let attachments = if identity.is_empty() {
        Vec::new()
    } else {
        resolve_attachments(&invoker_cwd()?, &identity)
    };

    let record = ConnectionRecord::new(name, command)
        .with_plugin(Some(plugin.to_string()))
        .with_attachments(attachments);
    let replaced = registry.exists(&record.name);
    let spec = registry.upsert(&record)?;

    let verb = if replaced { "Updated" } else { "Added" };
    match record.attachments.len() {
        0 => println!("{} {} ({})", verb, spec.name, spec.plugin),
        n => println!(
            "{} {} ({}) with {} attachment(s) in {}",
            verb,
            spec.name,
            spec.plugin,
            n,
            registry.layout().connection_dir(&spec.name).display()
        ),
    }

    Ok(())
}
