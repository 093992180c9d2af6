mod client;

pub use client::HttpReplyClient;

use crate::error::Result;
use crate::traits::ReplyClient;
use std::sync::Arc;
use strand_types::BackendConfig;

/// Builds the shared reply client from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_client(config: &BackendConfig) -> Result<Arc<dyn ReplyClient>> {
        Ok(Arc::new(HttpReplyClient::from_config(config)?))
    }
}
