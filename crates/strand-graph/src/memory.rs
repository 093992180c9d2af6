use crate::collaborators::{ConversationLog, LogEntry, SectionSink, SettingsStore};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use strand_types::{Attachment, ChunkPolicy, Message, NodeSettings};

/// Conversation log kept in process memory
#[derive(Default)]
pub struct MemoryConversationLog {
    entries: DashMap<String, Vec<LogEntry>>,
}

impl MemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, node_id: &str) -> Vec<LogEntry> {
        self.entries
            .get(node_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn texts(&self, node_id: &str) -> Vec<String> {
        self.entries(node_id).into_iter().map(|e| e.text).collect()
    }
}

#[async_trait]
impl ConversationLog for MemoryConversationLog {
    async fn append(&self, node_id: &str, entry: LogEntry) -> Result<()> {
        self.entries.entry(node_id.to_string()).or_default().push(entry);
        Ok(())
    }

    async fn history(&self, node_id: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let entries = self.entries(node_id);
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

#[derive(Default)]
pub struct MemorySectionSink {
    sections: DashMap<String, Vec<String>>,
}

impl MemorySectionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraphs(&self, section_id: &str) -> Vec<String> {
        self.sections
            .get(section_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SectionSink for MemorySectionSink {
    async fn append(&self, section_id: &str, message: &Message) -> Result<()> {
        self.sections
            .entry(section_id.to_string())
            .or_default()
            .push(message.text.clone());
        Ok(())
    }
}

/// Settings held in memory; unknown nodes get defaults
#[derive(Default)]
pub struct MemorySettings {
    policies: DashMap<String, ChunkPolicy>,
    settings: DashMap<String, NodeSettings>,
    attachments: DashMap<String, Vec<Attachment>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chunk_policy(&self, node_id: &str, policy: ChunkPolicy) {
        self.policies.insert(node_id.to_string(), policy);
    }

    pub fn set_node_settings(&self, node_id: &str, settings: NodeSettings) {
        self.settings.insert(node_id.to_string(), settings);
    }

    pub fn set_attachments(&self, node_id: &str, attachments: Vec<Attachment>) {
        self.attachments.insert(node_id.to_string(), attachments);
    }

    pub fn forget(&self, node_id: &str) {
        self.policies.remove(node_id);
        self.settings.remove(node_id);
        self.attachments.remove(node_id);
    }
}

impl SettingsStore for MemorySettings {
    fn chunk_policy(&self, node_id: &str) -> ChunkPolicy {
        self.policies
            .get(node_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    fn node_settings(&self, node_id: &str) -> NodeSettings {
        self.settings
            .get(node_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    fn attachments(&self, node_id: &str) -> Vec<Attachment> {
        self.attachments
            .get(node_id)
            .map(|a| a.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_types::Who;

    #[tokio::test]
    async fn test_history_keeps_most_recent() {
        let log = MemoryConversationLog::new();
        for i in 0..5 {
            let message = Message::new("a", format!("m{}", i));
            log.append("b", LogEntry::incoming(&message, Who::User)).await.unwrap();
        }
        let history = log.history("b", 2).await.unwrap();
        let texts: Vec<&str> = history.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4"]);
        assert!(log.history("nobody", 20).await.unwrap().is_empty());
    }

    #[test]
    fn test_settings_default_for_unknown_node() {
        let settings = MemorySettings::new();
        assert_eq!(settings.chunk_policy("x"), ChunkPolicy::default());
        settings.set_chunk_policy("x", ChunkPolicy::enabled());
        assert!(settings.chunk_policy("x").enabled);
        settings.forget("x");
        assert!(!settings.chunk_policy("x").enabled);
    }
}
