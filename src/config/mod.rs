mod env_vars;
mod ingest_config;

pub use env_vars::expand_env_vars;

pub use ingest_config::{load_or_create_config, IngestConfig, PassSettings, ToolSettings};
