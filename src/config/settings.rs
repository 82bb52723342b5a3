use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::layout::RegistryLayout;
use crate::{Error, Result};

/// Config file name inside the XDG config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable overriding the registry root.
pub const REGISTRY_ENV: &str = "CONNECT_REGISTRY";

/// The parsed config.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Registry root, used when no flag or environment override is given.
    pub registry_root: Option<PathBuf>,
    /// Program that runs connection commands as `<shell> -c <command>`.
    pub shell: Option<String>,
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Get the config path (~/.config/connect/config.toml).
    pub fn global_path() -> Option<PathBuf> {
        let dirs = xdg::BaseDirectories::with_prefix("connect");
        dirs.get_config_home().map(|p| p.join(CONFIG_FILENAME))
    }

    /// Load the config file, or defaults if there is none.
    pub fn load_global() -> Result<Self> {
        if let Some(path) = Self::global_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Parse settings from TOML content read from `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut settings = toml::from_str::<Self>(content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        settings.path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Load settings from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Pick the registry layout.
    ///
    /// Precedence: explicit override, then `CONNECT_REGISTRY`, then
    /// `registry_root`, then the directory next to the installed binary.
    pub fn registry_layout(&self, override_root: Option<PathBuf>) -> Result<RegistryLayout> {
        let env_root = std::env::var_os(REGISTRY_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.registry_layout_with(override_root, env_root)
    }

    fn registry_layout_with(
        &self,
        override_root: Option<PathBuf>,
        env_root: Option<PathBuf>,
    ) -> Result<RegistryLayout> {
        if let Some(root) = override_root
            .or(env_root)
            .or_else(|| self.registry_root.clone())
        {
            return Ok(RegistryLayout::new(root));
        }
        RegistryLayout::from_current_exe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let path = Path::new(CONFIG_FILENAME);
        let settings = Settings::parse("", path).unwrap();
        assert_eq!(settings.registry_root, None);
        assert_eq!(settings.shell, None);
        assert_eq!(settings.path.as_deref(), Some(path));
    }

    #[test]
    fn test_parse_full() {
        let content = r#"
registry_root = "/srv/connect"
shell = "/bin/bash"
"#;
        let settings = Settings::parse(content, Path::new(CONFIG_FILENAME)).unwrap();
        assert_eq!(settings.registry_root, Some(PathBuf::from("/srv/connect")));
        assert_eq!(settings.shell.as_deref(), Some("/bin/bash"));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let path = Path::new("/etc/connect/config.toml");
        let result = Settings::parse("registry = \"/tmp\"\n", path);
        assert!(matches!(result, Err(Error::ConfigParse { path: p, .. }) if p == path));
    }

    #[test]
    fn test_load_records_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "shell = \"zsh\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.path, Some(path));
        assert_eq!(settings.shell.as_deref(), Some("zsh"));
    }

    #[test]
    fn test_override_wins() {
        let settings = Settings {
            registry_root: Some(PathBuf::from("/from/config")),
            ..Settings::default()
        };
        let layout = settings
            .registry_layout_with(
                Some(PathBuf::from("/from/flag")),
                Some(PathBuf::from("/from/env")),
            )
            .unwrap();
        assert_eq!(layout.root(), Path::new("/from/flag"));
    }

    #[test]
    fn test_env_before_config() {
        let settings = Settings {
            registry_root: Some(PathBuf::from("/from/config")),
            ..Settings::default()
        };
        let layout = settings
            .registry_layout_with(None, Some(PathBuf::from("/from/env")))
            .unwrap();
        assert_eq!(layout.root(), Path::new("/from/env"));
    }

    #[test]
    fn test_config_root() {
        let settings = Settings {
            registry_root: Some(PathBuf::from("/from/config")),
            ..Settings::default()
        };
        let layout = settings.registry_layout_with(None, None).unwrap();
        assert_eq!(layout.root(), Path::new("/from/config"));
    }
}
