use crate::chunking::{self, default_budget, Destination};
use crate::collaborators::{EntryKind, LogEntry, ObserverBridge};
use crate::queue::{is_abort, TaskHandle};
use crate::relay::{RelayInner, ReplyContext};
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use strand_llm::{
    coerce_model, strip_sentinel, ChatTurn, ContinuationController, MaterialWindow, ReplyRequest,
    ReplyResult, StreamOutcome, StreamingSession, EMPTY_REPLY,
};
use strand_types::{
    Attachment, Capability, Message, Node, NodeSettings, RouteMeta, WebOptions, Who,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Whether a delivery may still be split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Planning {
    Plan,
    /// Already a chunk; deliver as is
    Whole,
}

impl RelayInner {
    /// Fan `text` out to every destination reachable from `source_id`
    pub(crate) fn route(self: &Arc<Self>, source_id: &str, text: &str, meta: &RouteMeta) -> Vec<TaskHandle> {
        if source_id.is_empty() || text.trim().is_empty() {
            return Vec::new();
        }

        let targets = self.router.targets(source_id);
        if targets.is_empty() {
            debug!(source = %source_id, "no reachable destinations");
            return Vec::new();
        }
        info!(source = %source_id, targets = targets.len(), "routing message");

        targets
            .into_iter()
            .map(|target| {
                let message = meta.to_message(source_id, text, target.via);
                let dest_id = target.node.id;
                let task = Arc::clone(self).deliver(dest_id.clone(), message, Planning::Plan);
                self.queues.enqueue(&dest_id, task)
            })
            .collect()
    }

    /// One queued delivery to `dest_id`
    fn deliver(self: Arc<Self>, dest_id: String, message: Message, planning: Planning) -> BoxFuture<'static, Result<()>> {
        async move {
            let Some(dest) = self.topology.node(&dest_id) else {
                debug!(dest = %dest_id, "destination removed before delivery");
                return Ok(());
            };

            if planning == Planning::Plan && self.enqueue_chunks(&dest, &message) {
                return Ok(());
            }

            let who = if dest.capability.is_agent() {
                Who::User
            } else {
                message.who
            };
            self.log
                .append(&dest.id, LogEntry::incoming(&message, who))
                .await
                .context("appending incoming message")?;
            if dest.section {
                self.sections
                    .append(&dest.id, &message)
                    .await
                    .context("appending to section")?;
            }
            if !dest.capability.is_agent() {
                return Ok(());
            }

            let ctx = ReplyContext::new(message.text.clone()).from_source(message.source_id.clone());
            match self.reply_for(&dest, &ctx).await {
                Ok((reply, materials)) => {
                    self.log
                        .append(&dest.id, LogEntry::reply(&dest.display_name, &reply, materials))
                        .await
                        .context("appending reply")?;
                    if let Some(observer) = &self.observer {
                        observer.on_reply(&dest.id, &reply);
                    }
                    // Placeholders stay in the owner's log; downstream nodes never see them
                    if reply.is_placeholder() {
                        debug!(dest = %dest.id, "empty reply not forwarded");
                        return Ok(());
                    }

                    let meta = RouteMeta::new()
                        .author(dest.display_name.clone())
                        .who(Who::Assistant)
                        .citations(reply.citations.clone());
                    let onward = self.route(&dest.id, &reply.text, &meta);
                    info!(dest = %dest.id, onward = onward.len(), "reply delivered");
                    Ok(())
                }
                Err(e) if is_abort(&e) => Err(e),
                Err(e) => {
                    let line = LogEntry::error(&dest.display_name, format!("Reply request failed: {}", e));
                    if let Err(log_err) = self.log.append(&dest.id, line).await {
                        warn!(dest = %dest.id, error = %log_err, "could not record reply failure");
                    }
                    Err(e)
                }
            }
        }
        .boxed()
    }

    /// Queue the chunks of `message` behind the current task, if it splits
    fn enqueue_chunks(self: &Arc<Self>, dest: &Node, message: &Message) -> bool {
        let policy = self.settings.chunk_policy(&message.source_id);
        let budget = default_budget(
            self.settings.node_settings(&dest.id).max_tokens,
            self.config.chunking.default_budget,
        );
        let Some(plan) = chunking::plan(&message.text, &policy, Destination::for_node(dest), budget) else {
            return false;
        };

        info!(dest = %dest.id, strategy = ?plan.strategy, chunks = plan.len(), "chunking message");
        for chunk in plan.chunks {
            let task = Arc::clone(self).deliver(dest.id.clone(), message.with_text(chunk), Planning::Whole);
            // Runs after the current task on the same queue; not awaited here
            let _ = self.queues.enqueue(&dest.id, task);
        }
        true
    }

    /// Produce a reply for `owner`, returning it with the materials it saw
    pub(crate) async fn reply_for(&self, owner: &Node, ctx: &ReplyContext) -> Result<(ReplyResult, Vec<Attachment>)> {
        let settings = self.settings.node_settings(&owner.id);
        let source = ctx.source_id.as_deref().and_then(|id| self.topology.node(id));
        let materials = self.materials_for(&owner.id, ctx.source_id.as_deref());
        let request = self.build_request(owner, &settings, &materials, &ctx.text).await?;

        let guard = self.inflight.begin(&owner.id);
        let token = guard.token().clone();
        let reply_config = &self.config.reply;

        let reply = if use_pagewise(source.as_ref(), &settings, &materials) {
            info!(owner = %owner.id, materials = materials.len(), "paged reply");
            let controller = ContinuationController::new(self.resolver.clone(), reply_config.sentinel.clone())
                .with_max_steps(reply_config.max_continuation_steps);
            let window = MaterialWindow::new(materials.clone(), reply_config.window_pages);
            controller.run(&request, &window, &token).await?.reply
        } else {
            self.stream_or_resolve(&owner.id, &request, token).await?
        };
        drop(guard);

        Ok((reply, materials))
    }

    /// The owner's own attachments followed by the sender's
    fn materials_for(&self, owner_id: &str, source_id: Option<&str>) -> Vec<Attachment> {
        let mut materials = self.settings.attachments(owner_id);
        if let Some(source_id) = source_id.filter(|id| *id != owner_id) {
            materials.extend(self.settings.attachments(source_id));
        }
        materials
    }

    async fn stream_or_resolve(
        &self,
        owner_id: &str,
        request: &ReplyRequest,
        token: CancellationToken,
    ) -> Result<ReplyResult> {
        let sentinel = &self.config.reply.sentinel;
        let mut session = StreamingSession::new(Arc::clone(&self.client), owner_id, token.clone())
            .with_grace_period(self.config.reply.grace_period())
            .with_idle_timeout(self.config.reply.stream_idle_timeout())
            .with_sentinel(sentinel.clone());
        if let Some(observer) = &self.observer {
            session = session.with_observer(Arc::new(ObserverBridge(Arc::clone(observer))));
        }

        match session.run(request).await? {
            StreamOutcome::Completed(reply) => Ok(reply),
            StreamOutcome::FallbackToSync(reason) => {
                warn!(owner = %owner_id, ?reason, "falling back to synchronous reply");
                let mut reply = self.resolver.resolve(request, &token).await?;
                reply.text = strip_sentinel(&reply.text, sentinel);
                if reply.text.is_empty() {
                    reply.text = EMPTY_REPLY.to_string();
                }
                Ok(reply)
            }
        }
    }

    async fn build_request(
        &self,
        owner: &Node,
        settings: &NodeSettings,
        materials: &[Attachment],
        text: &str,
    ) -> Result<ReplyRequest> {
        let reply_config = &self.config.reply;
        let requested = settings
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&reply_config.default_model);
        let model = coerce_model(Some(requested), &reply_config.safe_default_model);

        let mut request = ReplyRequest::new(model, settings.effective_max_tokens());
        if let Some(system) = system_prompt(settings, materials) {
            request = request.with_system(system);
        }

        let history = self
            .log
            .history(&owner.id, reply_config.history_limit)
            .await
            .context("reading conversation history")?;
        request = request.with_messages(conversation_turns(&history, text));

        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.with_api_key(key);
        }
        match settings.web.clone() {
            Some(web) if web.enable => request = request.with_web(web),
            Some(_) => {}
            None if owner.capability == Capability::WebAgent => {
                request = request.with_web(WebOptions::default());
            }
            None => {}
        }

        Ok(request)
    }
}

/// Paged replies apply only when the owner has materials; agents must opt in
fn use_pagewise(source: Option<&Node>, settings: &NodeSettings, materials: &[Attachment]) -> bool {
    if materials.is_empty() {
        return false;
    }
    match source {
        None => true,
        Some(node) if node.section => false,
        Some(node) if node.capability.is_agent() => settings.pagewise,
        Some(_) => true,
    }
}

fn materials_guide(materials: &[Attachment]) -> Option<String> {
    if materials.is_empty() {
        return None;
    }
    let mut guide = String::from("Attached materials:");
    for (n, attachment) in materials.iter().enumerate() {
        guide.push_str(&format!("\n[{}] {} ({} characters", n + 1, attachment.name, attachment.chars));
        if let Some(pages) = attachment.pages {
            guide.push_str(&format!(", {} pages", pages));
        }
        guide.push(')');
    }
    Some(guide)
}

fn system_prompt(settings: &NodeSettings, materials: &[Attachment]) -> Option<String> {
    match (settings.system_prompt(), materials_guide(materials)) {
        (Some(role), Some(guide)) => Some(format!("{}\n\n{}", role, guide)),
        (Some(role), None) => Some(role),
        (None, Some(guide)) => Some(guide),
        (None, None) => None,
    }
}

/// Log entries as chat turns, ending with `text` as the user's turn
fn conversation_turns(history: &[LogEntry], text: &str) -> Vec<ChatTurn> {
    let mut turns: Vec<ChatTurn> = history
        .iter()
        .filter(|entry| entry.kind != EntryKind::Error && !entry.text.trim().is_empty())
        .map(|entry| ChatTurn::new(entry.who, entry.text.clone()))
        .collect();

    let already_last = turns
        .last()
        .is_some_and(|turn| turn.role == Who::User.role() && turn.content == text);
    if !already_last {
        turns.push(ChatTurn::user(text));
    }
    turns
}
