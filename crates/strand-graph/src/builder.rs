use crate::collaborators::{ConversationLog, LiveObserver, SectionSink, SettingsStore};
use crate::memory::{MemoryConversationLog, MemorySectionSink, MemorySettings};
use crate::relay::Relay;
use crate::topology::Topology;
use anyhow::{Context, Result};
use std::sync::Arc;
use strand_llm::{ClientFactory, ReplyClient};
use strand_types::RelayConfig;

/// Builder for a [`Relay`]
///
/// Collaborators left unset fall back to the in-memory implementations.
/// Without an explicit client one is created from `config.backend`.
pub struct RelayBuilder {
    config: RelayConfig,
    client: Option<Arc<dyn ReplyClient>>,
    topology: Option<Arc<Topology>>,
    log: Option<Arc<dyn ConversationLog>>,
    sections: Option<Arc<dyn SectionSink>>,
    settings: Option<Arc<dyn SettingsStore>>,
    observer: Option<Arc<dyn LiveObserver>>,
}

impl RelayBuilder {
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
            client: None,
            topology: None,
            log: None,
            sections: None,
            settings: None,
            observer: None,
        }
    }

    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client(mut self, client: Arc<dyn ReplyClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn topology(mut self, topology: Arc<Topology>) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn conversation_log(mut self, log: Arc<dyn ConversationLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn section_sink(mut self, sections: Arc<dyn SectionSink>) -> Self {
        self.sections = Some(sections);
        self
    }

    pub fn settings_store(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LiveObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Relay> {
        let client = match self.client {
            Some(client) => client,
            None => ClientFactory::create_client(&self.config.backend)
                .context("Failed to create reply client")?,
        };

        Ok(Relay::from_parts(
            self.topology.unwrap_or_default(),
            client,
            self.log
                .unwrap_or_else(|| Arc::new(MemoryConversationLog::new())),
            self.sections
                .unwrap_or_else(|| Arc::new(MemorySectionSink::new())),
            self.settings.unwrap_or_else(|| Arc::new(MemorySettings::new())),
            self.observer,
            self.config,
        ))
    }
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
