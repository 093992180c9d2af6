use crate::error::Result;
use crate::resolver::{FallbackResolver, Resolved};
use crate::types::{Pagewise, ReplyRequest, ReplyResult};
use std::collections::HashSet;
use strand_types::{Attachment, Citation};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte ranges of `sentinel` occurring as a whole word
fn sentinel_spans(text: &str, sentinel: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if sentinel.is_empty() {
        return spans;
    }
    let step = sentinel.chars().next().map_or(1, char::len_utf8);
    let mut from = 0;
    while let Some(pos) = text[from..].find(sentinel) {
        let start = from + pos;
        let end = start + sentinel.len();
        let clear_before = text[..start].chars().next_back().map_or(true, |c| !is_word_char(c));
        let clear_after = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
        if clear_before && clear_after {
            spans.push((start, end));
            from = end;
        } else {
            from = start + step;
        }
    }
    spans
}

pub fn contains_sentinel(text: &str, sentinel: &str) -> bool {
    !sentinel_spans(text, sentinel).is_empty()
}

/// Remove every whole-word `sentinel` and trim the result
pub fn strip_sentinel(text: &str, sentinel: &str) -> String {
    let spans = sentinel_spans(text, sentinel);
    if spans.is_empty() {
        return text.trim().to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in spans {
        out.push_str(&text[cursor..start]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out.trim().to_string()
}

/// Materials a paged reply walks through
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterialWindow {
    pub start_page: u32,
    pub window: u32,
    pub attachments: Vec<Attachment>,
}

impl MaterialWindow {
    pub fn new(attachments: Vec<Attachment>, window: u32) -> Self {
        Self {
            start_page: 1,
            window,
            attachments,
        }
    }

    pub fn with_start_page(mut self, start_page: u32) -> Self {
        self.start_page = start_page;
        self
    }

    /// Known pages across attachments; unpaged material counts as one page
    pub fn total_pages(&self) -> u32 {
        self.attachments
            .iter()
            .map(|a| a.pages.unwrap_or(1).max(1))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationResult {
    pub reply: ReplyResult,
    /// Backend requests issued, one per window
    pub steps: usize,
}

/// Drives page-windowed replies until the backend stops asking for more
#[derive(Clone)]
pub struct ContinuationController {
    resolver: FallbackResolver,
    max_steps: usize,
    sentinel: String,
}

impl ContinuationController {
    pub const DEFAULT_MAX_STEPS: usize = 5;

    pub fn new(resolver: FallbackResolver, sentinel: impl Into<String>) -> Self {
        Self {
            resolver,
            max_steps: Self::DEFAULT_MAX_STEPS,
            sentinel: sentinel.into(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub async fn run(
        &self,
        request: &ReplyRequest,
        material: &MaterialWindow,
        cancel: &CancellationToken,
    ) -> Result<ContinuationResult> {
        let total_pages = material.total_pages();
        let window = material.window.max(1);
        let mut start_page = material.start_page.max(1);

        let mut parts: Vec<String> = Vec::new();
        let mut citations: Vec<Citation> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut tool_debug = None;
        let mut last_empty = None;
        let mut step = 0;

        loop {
            step += 1;
            let paged = request
                .clone()
                .with_pagewise(Pagewise::new(start_page, window));
            debug!(step, start_page, window, total_pages, "continuation step");

            let wants_more = match self.resolver.try_resolve(&paged, cancel).await? {
                Resolved::Reply(reply) => {
                    let more = contains_sentinel(&reply.text, &self.sentinel);
                    let cleaned = strip_sentinel(&reply.text, &self.sentinel);
                    if !cleaned.is_empty() {
                        parts.push(cleaned);
                    }
                    for citation in reply.citations {
                        if seen_urls.insert(citation.url.clone()) {
                            citations.push(citation);
                        }
                    }
                    tool_debug = reply.tool_debug;
                    more
                }
                empty @ Resolved::Empty { .. } => {
                    last_empty = Some(empty);
                    false
                }
            };

            let next_page = start_page + window;
            if wants_more && next_page <= total_pages && step < self.max_steps {
                start_page = next_page;
                continue;
            }
            break;
        }

        info!(steps = step, parts = parts.len(), "continuation finished");

        let reply = if parts.is_empty() {
            last_empty
                .unwrap_or(Resolved::Empty { backend_error: None })
                .into_result()
        } else {
            ReplyResult {
                text: parts.join("\n\n"),
                citations,
                tool_debug,
            }
        };

        Ok(ContinuationResult { reply, steps: step })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_word_boundaries() {
        assert!(contains_sentinel("more to come MER_SIDOR", "MER_SIDOR"));
        assert!(!contains_sentinel("XMER_SIDOR", "MER_SIDOR"));
        assert!(!contains_sentinel("MER_SIDORS", "MER_SIDOR"));
        assert_eq!(strip_sentinel("Part one. MER_SIDOR\n", "MER_SIDOR"), "Part one.");
        assert_eq!(strip_sentinel("aMER_SIDOR MER_SIDOR", "MER_SIDOR"), "aMER_SIDOR");
    }

    #[test]
    fn test_total_pages() {
        let window = MaterialWindow::new(
            vec![
                Attachment::new("a.pdf", 100).with_pages(9),
                Attachment::new("notes.txt", 40),
            ],
            3,
        );
        assert_eq!(window.total_pages(), 10);
    }
}
