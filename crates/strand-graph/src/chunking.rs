use once_cell::sync::Lazy;
use regex::Regex;
use strand_types::{Capability, ChunkPolicy, Node};

static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,3}[.):\-–—]\s+").expect("heading pattern is valid"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("paragraph pattern is valid"));
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]+["')\]]*\s+"#).expect("sentence pattern is valid"));
static WORD_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("word pattern is valid"));

/// Fewest numbered headings that make a numbered split
const MIN_HEADINGS: usize = 2;

/// Kind of node a chunked message is headed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Node(Capability),
    Section,
}

impl Destination {
    pub fn for_node(node: &Node) -> Self {
        if node.section {
            Self::Section
        } else {
            Self::Node(node.capability)
        }
    }

    fn is_agent(self) -> bool {
        matches!(self, Self::Node(capability) if capability.is_agent())
    }

    fn permitted(self, policy: &ChunkPolicy) -> bool {
        match self {
            Self::Node(_) => policy.allow_node_to_node,
            Self::Section => policy.allow_to_section_sink,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    Numbered,
    LineBatch,
    TokenBudget,
    /// Forced token split for oversized text bound for an agent
    LegacyBudget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub strategy: ChunkStrategy,
    pub chunks: Vec<String>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// `ceil(words × 1.3)`
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_words(text.split_whitespace().count())
}

fn tokens_for_words(words: usize) -> usize {
    (words * 13).div_ceil(10)
}

/// Budget derived from a destination's `max_tokens`
pub fn default_budget(max_tokens: Option<u32>, fallback: usize) -> usize {
    match max_tokens {
        Some(max) => (max as usize * 6 / 10).clamp(400, 2000),
        None => fallback,
    }
}

/// Decide whether `text` should be split before delivery
///
/// Returns `None` when the text goes out whole. Strategies are tried in
/// priority order and the first producing more than one chunk wins.
pub fn plan(
    text: &str,
    policy: &ChunkPolicy,
    destination: Destination,
    default_budget: usize,
) -> Option<ChunkPlan> {
    if text.trim().is_empty() {
        return None;
    }

    let explicit = policy.enabled && destination.permitted(policy);

    if explicit && policy.numbering_enabled {
        if let Some(chunks) = split_numbered(text, policy.trim_preamble) {
            return multi(ChunkStrategy::Numbered, chunks);
        }
    }

    if explicit && policy.line_batch_enabled {
        let chunks = split_line_batches(text, policy.effective_batch_size());
        if chunks.len() > 1 {
            return multi(ChunkStrategy::LineBatch, chunks);
        }
    }

    if explicit && policy.token_budget_enabled {
        let budget = policy.effective_token_size();
        if estimate_tokens(text) > budget {
            if let Some(plan) = multi(ChunkStrategy::TokenBudget, split_token_budget(text, budget)) {
                return Some(plan);
            }
        }
    }

    let budget = default_budget.max(1);
    let threshold = 1000.max(budget * 5 / 4);
    if destination.is_agent() && estimate_tokens(text) > threshold {
        return multi(ChunkStrategy::LegacyBudget, split_token_budget(text, budget));
    }

    None
}

fn multi(strategy: ChunkStrategy, chunks: Vec<String>) -> Option<ChunkPlan> {
    (chunks.len() > 1).then_some(ChunkPlan { strategy, chunks })
}

/// Sections starting at numbered headings, e.g. `1.`, `2)`, `3:`
pub fn split_numbered(text: &str, trim_preamble: bool) -> Option<Vec<String>> {
    let lines: Vec<&str> = text.lines().collect();
    let headings: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| NUMBERED_HEADING.is_match(line))
        .map(|(i, _)| i)
        .collect();

    if headings.len() < MIN_HEADINGS {
        return None;
    }

    let mut chunks = Vec::with_capacity(headings.len() + 1);
    let preamble = lines[..headings[0]].join("\n");
    if !trim_preamble && !preamble.trim().is_empty() {
        chunks.push(preamble.trim().to_string());
    }
    for (n, &start) in headings.iter().enumerate() {
        let end = headings.get(n + 1).copied().unwrap_or(lines.len());
        let section = lines[start..end].join("\n");
        chunks.push(section.trim().to_string());
    }
    Some(chunks)
}

/// Groups of `batch_size` non-blank lines; blank lines ride with the
/// preceding group so concatenation restores `text`
pub fn split_line_batches(text: &str, batch_size: usize) -> Vec<String> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut current = String::new();
    let mut filled = 0;

    for line in text.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        if !blank && filled == batch_size {
            batches.push(std::mem::take(&mut current));
            filled = 0;
        }
        current.push_str(line);
        if !blank {
            filled += 1;
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Pieces of `text` each ending just after a match of `boundary`
fn split_after<'a>(text: &'a str, boundary: &Regex) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in boundary.find_iter(text) {
        if m.end() > last {
            pieces.push(&text[last..m.end()]);
            last = m.end();
        }
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }
    pieces
}

/// Chunks whose estimate stays within `budget`, concatenating to `text`
///
/// Paragraphs are packed first; a paragraph over budget is broken into
/// sentences, and a sentence over budget into words.
pub fn split_token_budget(text: &str, budget: usize) -> Vec<String> {
    let mut packer = Packer::new(budget.max(2));
    packer.pack(text, 0);
    packer.finish()
}

/// Split boundary for each refinement level: paragraph, sentence, word
fn boundary(level: usize) -> Option<&'static Regex> {
    match level {
        0 => Some(&*PARAGRAPH_BREAK),
        1 => Some(&*SENTENCE_END),
        2 => Some(&*WORD_GAP),
        _ => None,
    }
}

struct Packer {
    budget: usize,
    chunks: Vec<String>,
    current: String,
    current_words: usize,
}

impl Packer {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            chunks: Vec::new(),
            current: String::new(),
            current_words: 0,
        }
    }

    fn pack(&mut self, text: &str, level: usize) {
        let Some(boundary) = boundary(level) else {
            // Single words never exceed a budget of two tokens
            self.push(text, text.split_whitespace().count());
            return;
        };

        for unit in split_after(text, boundary) {
            let words = unit.split_whitespace().count();
            if tokens_for_words(words) > self.budget {
                self.flush();
                self.pack(unit, level + 1);
            } else {
                self.push(unit, words);
            }
        }
    }

    fn push(&mut self, unit: &str, words: usize) {
        if self.current_words > 0 && tokens_for_words(self.current_words + words) > self.budget {
            self.flush();
        }
        self.current.push_str(unit);
        self.current_words += words;
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        if self.current_words == 0 {
            // Whitespace-only leftovers stay attached to the next chunk
            return;
        }
        self.chunks.push(std::mem::take(&mut self.current));
        self.current_words = 0;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() {
            if self.current_words == 0 {
                match self.chunks.last_mut() {
                    Some(last) => last.push_str(&self.current),
                    None => self.chunks.push(std::mem::take(&mut self.current)),
                }
            } else {
                self.chunks.push(std::mem::take(&mut self.current));
            }
        }
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Destination {
        Destination::Node(Capability::ChatAgent)
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("one"), 2);
        assert_eq!(estimate_tokens(&"w ".repeat(10)), 13);
        assert_eq!(default_budget(Some(1000), 800), 600);
        assert_eq!(default_budget(Some(100), 800), 400);
        assert_eq!(default_budget(Some(30_000), 800), 2000);
        assert_eq!(default_budget(None, 800), 800);
    }

    #[test]
    fn test_numbered_split_with_preamble() {
        let text = "Here are the steps:\n1. Mix flour\nand water\n2) Knead\n3: Bake";
        let policy = ChunkPolicy::enabled().with_numbering(true);

        let plan = plan(text, &policy, agent(), 800).unwrap();
        assert_eq!(plan.strategy, ChunkStrategy::Numbered);
        assert_eq!(
            plan.chunks,
            vec!["Here are the steps:", "1. Mix flour\nand water", "2) Knead", "3: Bake"]
        );

        let trimmed = plan_trimmed(text);
        assert_eq!(trimmed.chunks.len(), 3);
        assert!(trimmed.chunks[0].starts_with("1."));
    }

    fn plan_trimmed(text: &str) -> ChunkPlan {
        let policy = ChunkPolicy::enabled()
            .with_numbering(true)
            .with_trim_preamble(true);
        plan(text, &policy, agent(), 800).unwrap()
    }

    #[test]
    fn test_single_heading_falls_through_to_lines() {
        let text = "1. only one\nsecond\nthird\nfourth";
        let policy = ChunkPolicy::enabled().with_numbering(true);
        let plan = plan(text, &policy, agent(), 800).unwrap();
        assert_eq!(plan.strategy, ChunkStrategy::LineBatch);
        assert_eq!(plan.chunks, vec!["1. only one\nsecond\nthird\n", "fourth"]);
    }

    #[test]
    fn test_line_batches_lossless_with_blank_lines() {
        let text = "\na\nb\n\nc\nd\n\n\ne\n";
        let batches = split_line_batches(text, 2);
        assert_eq!(batches, vec!["\na\nb\n\n", "c\nd\n\n\n", "e\n"]);
        assert_eq!(batches.concat(), text);
    }

    #[test]
    fn test_disabled_policy_delivers_whole() {
        let text = "a\nb\nc\nd\ne";
        assert!(plan(text, &ChunkPolicy::default(), agent(), 800).is_none());
    }

    #[test]
    fn test_destination_permission() {
        let text = "a\nb\nc\nd\ne";
        let policy = ChunkPolicy::enabled().with_targets(true, false);
        assert!(plan(text, &policy, Destination::Section, 800).is_none());
        assert!(plan(text, &policy, agent(), 800).is_some());
    }

    #[test]
    fn test_token_budget_split_lossless_and_bounded() {
        let paragraph = "This sentence has exactly seven words in it. ".repeat(30);
        let text = format!("{}\n\n{}\n\nShort tail.", paragraph.trim_end(), paragraph.trim_end());
        let policy = ChunkPolicy::enabled()
            .with_line_batches(false, 3)
            .with_token_budget(true, 200);

        let plan = plan(&text, &policy, agent(), 800).unwrap();
        assert_eq!(plan.strategy, ChunkStrategy::TokenBudget);
        assert!(plan.len() > 1);
        assert_eq!(plan.chunks.concat(), text);
        assert!(plan.chunks.iter().all(|c| estimate_tokens(c) <= 200));
    }

    #[test]
    fn test_long_word_run_splits_on_words() {
        let text = "word ".repeat(500);
        let chunks = split_token_budget(&text, 200);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| estimate_tokens(c) <= 200));
    }

    #[test]
    fn test_legacy_fallback_only_for_agents() {
        let text = "lorem ipsum dolor sit amet. ".repeat(200);
        let policy = ChunkPolicy::default();

        let plan = plan(&text, &policy, agent(), 800).unwrap();
        assert_eq!(plan.strategy, ChunkStrategy::LegacyBudget);
        assert_eq!(plan.chunks.concat(), text);
        assert!(plan.chunks.iter().all(|c| estimate_tokens(c) <= 800));

        let sink = Destination::Node(Capability::PlainSink);
        assert!(super::plan(&text, &policy, sink, 800).is_none());
    }

    #[test]
    fn test_short_text_under_legacy_threshold() {
        let text = "just a few words";
        assert!(plan(text, &ChunkPolicy::default(), agent(), 800).is_none());
    }
}
