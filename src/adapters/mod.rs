// Adapters - External system implementations

pub mod exec_process;
pub mod naming_template;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_process::ProcessSupervisor;
pub use naming_template::TemplateNamer;
pub use toml_config::AppConfig;
