//! Digest Assembler
//!
//! Orders accepted candidates newest first, caps the list, and renders the
//! text handed to the notifier.
//!
//! Telegram rejects messages longer than 4096 UTF-16 code units. A digest
//! that would exceed [`DigestFormatter::max_message_len`] is split between
//! items into several messages; an item that alone exceeds it is cut at
//! character boundaries.

use chrono::FixedOffset;

use digest_core::Candidate;

/// The assembled result of a run
#[derive(Debug, Clone)]
pub enum Digest {
    /// Nothing new; the caller sends the "no news" notice
    Empty,
    /// Candidates to deliver, newest first
    Items(Vec<Candidate>),
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        matches!(self, Digest::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            Digest::Empty => 0,
            Digest::Items(items) => items.len(),
        }
    }

    pub fn items(&self) -> &[Candidate] {
        match self {
            Digest::Empty => &[],
            Digest::Items(items) => items,
        }
    }
}

/// Sort newest first (ties keep fetch order) and keep at most `max_items`.
pub fn assemble(mut accepted: Vec<Candidate>, max_items: usize) -> Digest {
    accepted.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    accepted.truncate(max_items);

    if accepted.is_empty() {
        Digest::Empty
    } else {
        Digest::Items(accepted)
    }
}

/// Longest message the Telegram Bot API accepts, in UTF-16 code units
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Renders a [`Digest`] as chat messages
#[derive(Debug, Clone)]
pub struct DigestFormatter {
    pub title: String,
    pub window_hours: i64,
    pub offset: FixedOffset,
    pub zone_label: String,
    /// Upper bound on a single message, in UTF-16 code units
    pub max_message_len: usize,
}

impl DigestFormatter {
    /// Render the whole digest as one message
    pub fn format(&self, digest: &Digest) -> String {
        self.blocks(digest).join(BLOCK_SEPARATOR)
    }

    /// Render the digest as messages of at most `max_message_len` each
    pub fn format_messages(&self, digest: &Digest) -> Vec<String> {
        pack_blocks(self.blocks(digest), self.max_message_len)
    }

    /// Header followed by one block per item
    fn blocks(&self, digest: &Digest) -> Vec<String> {
        match digest {
            Digest::Empty => vec![format!(
                "🗞️ {}\n최근 {}시간 내 새 해외 뉴스가 없습니다.",
                self.title, self.window_hours
            )],
            Digest::Items(items) => {
                let mut blocks = Vec::with_capacity(items.len() + 1);
                blocks.push(format!(
                    "🗞️ *{}* (last {}h, deduped)",
                    self.title, self.window_hours
                ));

                for (i, item) in items.iter().enumerate() {
                    let local = item.published_at.with_timezone(&self.offset);
                    blocks.push(format!(
                        "{}) {}\n{} {}\n{}",
                        i + 1,
                        item.title.trim(),
                        local.format("%m-%d %H:%M"),
                        self.zone_label,
                        item.url.trim()
                    ));
                }

                blocks
            }
        }
    }
}

const BLOCK_SEPARATOR: &str = "\n\n";

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Greedily join blocks into messages no longer than `limit`.
fn pack_blocks(blocks: Vec<String>, limit: usize) -> Vec<String> {
    if limit == 0 {
        return vec![blocks.join(BLOCK_SEPARATOR)];
    }

    let separator_len = utf16_len(BLOCK_SEPARATOR);
    let mut messages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for block in blocks {
        let block_len = utf16_len(&block);

        if !current.is_empty() && current_len + separator_len + block_len <= limit {
            current.push_str(BLOCK_SEPARATOR);
            current.push_str(&block);
            current_len += separator_len + block_len;
            continue;
        }

        if !current.is_empty() {
            messages.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if block_len <= limit {
            current = block;
            current_len = block_len;
        } else {
            messages.extend(split_block(&block, limit));
        }
    }

    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

/// Cut an oversized block at character boundaries
fn split_block(block: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_len = 0;

    for c in block.chars() {
        if piece_len + c.len_utf16() > limit && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            piece_len = 0;
        }
        piece.push(c);
        piece_len += c.len_utf16();
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
