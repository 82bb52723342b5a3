use super::Plugin;
use crate::registry::{ConnectionSpec, DEFAULT_PLUGIN};

/// Runs the stored command directly in the shell.
pub struct DefaultPlugin;

impl Plugin for DefaultPlugin {
    fn name(&self) -> &'static str {
        DEFAULT_PLUGIN
    }

    fn manual(&self) -> &'static str {
        "default: runs the connection's command as-is in the shell.

Register:  connect -n <name> -c '<command>' [-i <file>]...
Run:       connect <name>

Files given with -i are copied into the connection's storage directory,
which the command can reach through $CONNECT_DIR."
    }

    fn prepare(&self, spec: &ConnectionSpec) -> String {
        spec.command.clone()
    }
}

/// SSH connections. The command is run as written; stored identity files
/// are referenced through `$CONNECT_DIR`.
pub struct SshPlugin;

impl Plugin for SshPlugin {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn manual(&self) -> &'static str {
        "ssh: remote shell connections.

Register:  connect -p ssh -n prod -c 'ssh -i $CONNECT_DIR/prod.pem admin@10.0.0.5' -i ./prod.pem
Run:       connect prod

The identity file is copied into the registry when the connection is
registered, so the original may be moved or deleted afterwards."
    }

    fn prepare(&self, spec: &ConnectionSpec) -> String {
        spec.command.clone()
    }
}
