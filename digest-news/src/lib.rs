//! External collaborators for the brand news digest
//!
//! This crate provides:
//! - Google News RSS: per-query search feeds (RSS 2.0 with Atom fallback)
//! - Language detection: a swappable predicate used to drop Korean coverage
//! - Telegram: Bot API delivery of the assembled digest

pub mod error;
pub mod fetcher;
pub mod google_news;
pub mod language;
pub mod notifier;
pub mod telegram;

pub use error::NewsError;
pub use fetcher::FeedFetcher;
pub use google_news::{get_brand_queries, GoogleNewsClient};
pub use language::{strip_tags, HangulDetector, LanguageDetector};
pub use notifier::Notifier;
pub use telegram::TelegramNotifier;
