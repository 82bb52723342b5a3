use crate::registry::Registry;
use crate::{Error, Result};

/// Print a connection as stored in its own directory.
pub fn run(registry: &Registry, name: &str) -> Result<()> {
    let details = registry
        .describe(name)?
        .ok_or_else(|| Error::ConnectionNotFound(name.to_string()))?;

    println!("name:     {}", details.spec.name);
    println!("plugin:   {}", details.spec.plugin);
    println!("command:  {}", details.spec.command);
    println!("storage:  {}", details.storage.display());

    if details.attachments.is_empty() {
        println!("attachments: (none)");
    } else {
        println!("attachments:");
        for path in &details.attachments {
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            println!("  {}", file_name.to_string_lossy());
        }
    }

    // The map and the per-connection file are written separately
    if registry.lookup(name)?.as_ref() != Some(&details.spec) {
        eprintln!("warning: the connection map disagrees with {}", details.storage.display());
    }

    Ok(())
}
