use crate::registry::Registry;
use crate::Result;

/// Remove a connection and its stored files.
pub fn run(registry: &Registry, name: &str) -> Result<()> {
    if registry.remove(name)? {
        println!("Removed {}", name);
    } else {
        println!("No connection named {}, nothing to remove", name);
    }
    Ok(())
}
