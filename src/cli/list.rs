use crate::registry::Registry;
use crate::{Error, Result};

/// List connections from the map.
pub fn run(registry: &Registry, json: bool) -> Result<()> {
    let specs = registry.list()?;

    if json {
        let out =
            serde_json::to_string_pretty(&specs).map_err(|e| Error::Serialize(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if specs.is_empty() {
        println!("No connections yet");
        return Ok(());
    }

    println!("Connections ({}):", registry.layout().root().display());
    let width = specs.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for spec in &specs {
        println!(
            "  {:width$}  [{}] {}",
            spec.name,
            spec.plugin,
            spec.command,
            width = width
        );
    }

    Ok(())
}
