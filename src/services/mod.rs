//! Service layer for the monitor.
//!
//! This module contains the collaborators the pipeline talks to:
//! - Page fetching (`PageFetcher`, `HttpPageFetcher`)
//! - Item extraction (`ItemExtractor`, `ListingExtractor`)
//! - Report delivery (`Notifier`, `MailNotifier`)

mod extractor;
mod fetcher;
mod notifier;

pub use extractor::{ItemExtractor, ListingExtractor, ListingSelectors};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use notifier::{MailNotifier, Notifier};
