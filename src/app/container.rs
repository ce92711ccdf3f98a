use std::sync::Arc;

use crate::adapters::{AppConfig, ProcessSupervisor, TemplateNamer};
use crate::app::clip_interactor::{ClipOrchestrator, OrchestratorSettings};
use crate::ports::{NamingPort, ProcessPort};

pub trait AppContainer: Send + Sync {
    fn orchestrator(&self) -> Arc<ClipOrchestrator>;
    fn config(&self) -> &AppConfig;
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            retriever: config.tools.retriever.clone(),
            trimmer: config.tools.trimmer.clone(),
            retrieval: config.retrieval.options(),
            section_padding_secs: config.retrieval.section_padding_secs,
            encoders: config.trim.clone(),
            log_capacity: config.job.log_capacity,
            name_probe_limit: config.job.name_probe_limit,
            temp_root: config.job.temp_root.clone(),
        }
    }
}

pub struct DefaultAppContainer {
    config: AppConfig,
    orchestrator: Arc<ClipOrchestrator>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> Self {
        let process_port = Arc::new(ProcessSupervisor::with_grace_period(
            config.supervisor.grace_period(),
        ));
        let naming_port = Arc::new(TemplateNamer::new());

        let orchestrator = Arc::new(ClipOrchestrator::new(
            process_port as Arc<dyn ProcessPort>,
            naming_port as Arc<dyn NamingPort>,
            OrchestratorSettings::from(&config),
        ));

        Self {
            config,
            orchestrator,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn orchestrator(&self) -> Arc<ClipOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_settings_follow_config() {
        let mut config = AppConfig::default();
        config.tools.retriever = PathBuf::from("/opt/bin/yt-dlp");
        config.job.name_probe_limit = 10;
        config.retrieval.retries = 7;

        let container = DefaultAppContainer::new(config);
        let settings = container.orchestrator().settings().clone();
        assert_eq!(settings.retriever, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(settings.name_probe_limit, 10);
        assert_eq!(settings.retrieval.retries, 7);
        assert_eq!(container.config().job.name_probe_limit, 10);
    }
}
