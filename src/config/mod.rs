mod settings;

pub use settings::{Settings, CONFIG_FILENAME, REGISTRY_ENV};
