mod add;
mod list;
mod plugin;
mod remove;
mod run;
mod show;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Settings;
use crate::plugin::{PluginRegistry, Positional};
use crate::registry::Registry;
use crate::Result;

#[derive(Parser, Debug)]
#[command(name = "connect")]
#[command(about = "Named aliases for shell commands, with their files kept alongside")]
#[command(version)]
pub struct Cli {
    /// Registry directory (overrides CONNECT_REGISTRY and the config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub shorthand: Shorthand,
}

/// Flag form: `connect <NAME>` runs a connection, `connect -n .. -c ..`
/// registers one, and no arguments lists them.
#[derive(Args, Debug, Default)]
pub struct Shorthand {
    /// Connection to run, or a plugin name to show its manual
    #[arg(value_name = "NAME", conflicts_with_all = ["name", "cmd", "identity", "plugin"])]
    pub target: Option<String>,

    /// Name of the connection to register
    #[arg(short, long, requires = "cmd")]
    pub name: Option<String>,

    /// Shell command the connection runs
    #[arg(short = 'c', long = "command", requires = "name")]
    pub cmd: Option<String>,

    /// File to store with the connection (repeatable)
    #[arg(short = 'i', long = "identity", value_name = "FILE", requires = "name")]
    pub identity: Vec<String>,

    /// Plugin that runs the connection
    #[arg(short, long, requires = "name")]
    pub plugin: Option<String>,
}

impl Shorthand {
    fn is_empty(&self) -> bool {
        self.target.is_none()
            && self.name.is_none()
            && self.cmd.is_none()
            && self.identity.is_empty()
            && self.plugin.is_none()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered connections
    #[command(alias = "ls")]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a connection
    Run {
        /// Connection name
        name: String,
    },

    /// Register a connection, replacing one of the same name
    Add {
        /// Connection name
        #[arg(short, long)]
        name: String,

        /// Shell command the connection runs
        #[arg(short = 'c', long = "command")]
        cmd: String,

        /// File to store with the connection (repeatable)
        #[arg(short = 'i', long = "identity", value_name = "FILE")]
        identity: Vec<String>,

        /// Plugin that runs the connection
        #[arg(short, long)]
        plugin: Option<String>,
    },

    /// Delete a connection and its stored files
    #[command(alias = "rm")]
    Remove {
        /// Connection name
        name: String,
    },

    /// Show a connection and its stored files
    Show {
        /// Connection name
        name: String,
    },

    /// List plugins, or show the manual of one
    Plugin {
        /// Plugin name
        name: Option<String>,
    },
}

impl Cli {
    /// Parse the command line, exiting with a usage error on failure.
    pub fn parse_args() -> Self {
        Self::try_parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse arguments and reject the flag form mixed with a sub-command.
    ///
    /// Global options such as `--registry` may appear on either side of the
    /// sub-command.
    pub fn try_parse_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Self::try_parse_from(args)?;
        if cli.command.is_some() && !cli.shorthand.is_empty() {
            return Err(Self::command().error(
                ErrorKind::ArgumentConflict,
                "connection flags cannot be combined with a sub-command",
            ));
        }
        Ok(cli)
    }

    /// Dispatch the parsed command line and return the process exit code.
    pub fn run(self) -> Result<i32> {
        let Cli {
            registry,
            command,
            shorthand,
        } = self;
        let settings = Settings::load_global()?;
        let plugins = PluginRegistry::builtin();
        let open = || -> Result<Registry> {
            Ok(Registry::new(settings.registry_layout(registry.clone())?))
        };

        match command {
            Some(Commands::List { json }) => list::run(&open()?, json).map(|()| 0),
            Some(Commands::Run { name }) => run::run(&open()?, &plugins, &settings, &name),
            Some(Commands::Add {
                name,
                cmd,
                identity,
                plugin,
            }) => add::run(&open()?, &plugins, name, cmd, identity, plugin).map(|()| 0),
            Some(Commands::Remove { name }) => remove::run(&open()?, &name).map(|()| 0),
            Some(Commands::Show { name }) => show::run(&open()?, &name).map(|()| 0),
            Some(Commands::Plugin { name }) => plugin::run(&plugins, name.as_deref()).map(|()| 0),
            None => match shorthand {
                Shorthand {
                    target: Some(target),
                    ..
                } => match plugins.classify(&target) {
                    Positional::Plugin(p) => {
                        plugin::print_manual(p);
                        Ok(0)
                    }
                    Positional::Connection(name) => {
                        run::run(&open()?, &plugins, &settings, name)
                    }
                },
                Shorthand {
                    name: Some(name),
                    cmd: Some(cmd),
                    identity,
                    plugin,
                    ..
                } => add::run(&open()?, &plugins, name, cmd, identity, plugin).map(|()| 0),
                _ => list::run(&open()?, false).map(|()| 0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_args(std::iter::once("connect").chain(args.iter().copied()))
    }

    fn parse(args: &[&str]) -> Cli {
        try_parse(args).unwrap()
    }

    #[test]
    fn test_no_arguments_lists() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert!(cli.shorthand.target.is_none());
        assert!(cli.shorthand.name.is_none());
    }

    #[test]
    fn test_bare_name_runs() {
        let cli = parse(&["prod"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.shorthand.target.as_deref(), Some("prod"));
    }

    #[test]
    fn test_flag_registration() {
        let cli = parse(&[
            "-n", "prod", "-c", "ssh prod", "-i", "./a.pem", "--identity", "/b.pem", "-p", "ssh",
        ]);
        let s = cli.shorthand;
        assert_eq!(s.name.as_deref(), Some("prod"));
        assert_eq!(s.cmd.as_deref(), Some("ssh prod"));
        assert_eq!(s.identity, vec!["./a.pem", "/b.pem"]);
        assert_eq!(s.plugin.as_deref(), Some("ssh"));
    }

    #[test]
    fn test_incomplete_registration_rejected() {
        assert!(try_parse(&["-n", "prod"]).is_err());
        assert!(try_parse(&["-c", "ssh prod"]).is_err());
        assert!(try_parse(&["-i", "key.pem"]).is_err());
    }

    #[test]
    fn test_name_and_flags_conflict() {
        assert!(try_parse(&["prod", "-n", "x", "-c", "y"]).is_err());
    }

    #[test]
    fn test_subcommands() {
        assert!(matches!(
            parse(&["list", "--json"]).command,
            Some(Commands::List { json: true })
        ));
        assert!(matches!(
            parse(&["ls"]).command,
            Some(Commands::List { json: false })
        ));
        assert!(matches!(
            parse(&["run", "list"]).command,
            Some(Commands::Run { name }) if name == "list"
        ));
        assert!(matches!(
            parse(&["rm", "prod"]).command,
            Some(Commands::Remove { name }) if name == "prod"
        ));
        assert!(matches!(
            parse(&["show", "prod"]).command,
            Some(Commands::Show { name }) if name == "prod"
        ));
        assert!(matches!(
            parse(&["plugin"]).command,
            Some(Commands::Plugin { name: None })
        ));
    }

    #[test]
    fn test_add_subcommand() {
        match parse(&["add", "-n", "db", "-c", "psql", "-i", "pgpass"]).command {
            Some(Commands::Add {
                name,
                cmd,
                identity,
                plugin,
            }) => {
                assert_eq!(name, "db");
                assert_eq!(cmd, "psql");
                assert_eq!(identity, vec!["pgpass"]);
                assert_eq!(plugin, None);
            }
            other => panic!("expected add, got {other:?}"),
        }
        assert!(try_parse(&["add", "-n", "db"]).is_err());
    }

    #[test]
    fn test_registry_flag() {
        let cli = parse(&["--registry", "/srv/connect"]);
        assert_eq!(cli.registry, Some(PathBuf::from("/srv/connect")));
    }

    #[test]
    fn test_registry_flag_before_subcommand() {
        let cli = parse(&["--registry", "/srv/connect", "list"]);
        assert_eq!(cli.registry, Some(PathBuf::from("/srv/connect")));
        assert!(matches!(cli.command, Some(Commands::List { json: false })));
        assert!(cli.shorthand.target.is_none());

        let cli = parse(&["--registry", "/srv/connect", "remove", "prod"]);
        assert!(matches!(cli.command, Some(Commands::Remove { name }) if name == "prod"));

        let cli = parse(&["--registry", "/srv/connect", "add", "-n", "db", "-c", "psql"]);
        assert!(matches!(cli.command, Some(Commands::Add { name, .. }) if name == "db"));
    }

    #[test]
    fn test_registry_flag_after_subcommand() {
        let cli = parse(&["list", "--registry", "/srv/connect"]);
        assert_eq!(cli.registry, Some(PathBuf::from("/srv/connect")));
        assert!(matches!(cli.command, Some(Commands::List { json: false })));
    }

    #[test]
    fn test_registry_flag_with_bare_name() {
        let cli = parse(&["--registry", "/srv/connect", "prod"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.shorthand.target.as_deref(), Some("prod"));
    }

    #[test]
    fn test_flags_and_subcommand_conflict() {
        let err = try_parse(&["-n", "db", "-c", "psql", "list"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }
}
