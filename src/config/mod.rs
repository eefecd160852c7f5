// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{apply_env_overrides, load_config, load_from_file, CONFIG_PATH_ENV};
pub use settings::{
    Config, GeneratorConfig, LlmConfig, PipelineConfig, ResourcesConfig, ServerConfig,
};
