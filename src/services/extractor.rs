// src/services/extractor.rs

//! Ranked item extraction from list page markup.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Item;
use crate::utils::{first_number, resolve_url};

/// Parses one list page into its ranked items, in page order.
pub trait ItemExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<Vec<Item>>;
}

/// CSS paths into the list page. Item paths are relative to one entry.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub entry: String,
    pub title: String,
    pub link: String,
    pub score: String,
    pub score_count: String,
    pub note: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            entry: "#content > div > div.article > ol > li".to_string(),
            title: "div > div.info > div.hd > a > span".to_string(),
            link: "div > div.info > div.hd > a".to_string(),
            score: "div > div.info > div.bd > div > span.rating_num".to_string(),
            score_count: "div > div.info > div.bd > div > span:nth-child(4)".to_string(),
            note: "div > div.info > div.bd > p.quote > span".to_string(),
        }
    }
}

struct CompiledSelectors {
    entry: Selector,
    title: Selector,
    link: Selector,
    score: Selector,
    score_count: Selector,
    note: Selector,
}

/// Extracts items from the Top 250 list layout.
pub struct ListingExtractor {
    selectors: ListingSelectors,
    base_url: Url,
}

impl ListingExtractor {
    /// Create an extractor with the default list layout.
    ///
    /// Relative links are resolved against `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_selectors(base_url, ListingSelectors::default())
    }

    /// Create an extractor with custom selectors.
    pub fn with_selectors(base_url: &str, selectors: ListingSelectors) -> Result<Self> {
        // Fail on construction rather than on the first page.
        Self::compile(&selectors)?;
        Ok(Self {
            selectors,
            base_url: Url::parse(base_url)?,
        })
    }

    fn compile(selectors: &ListingSelectors) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            entry: Self::parse_selector(&selectors.entry)?,
            title: Self::parse_selector(&selectors.title)?,
            link: Self::parse_selector(&selectors.link)?,
            score: Self::parse_selector(&selectors.score)?,
            score_count: Self::parse_selector(&selectors.score_count)?,
            note: Self::parse_selector(&selectors.note)?,
        })
    }

    fn parse_entry(
        &self,
        entry: &ElementRef,
        sel: &CompiledSelectors,
        position: usize,
    ) -> Result<Item> {
        let context = format!("entry {}", position + 1);

        let title: String = entry
            .select(&sel.title)
            .flat_map(|span| span.text())
            .collect();

        let href = entry
            .select(&sel.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| AppError::parse(&context, "missing detail link"))?;

        let score_count_text: String = entry
            .select(&sel.score_count)
            .next()
            .map(|e| e.text().collect())
            .unwrap_or_default();
        let score_count = first_number(&score_count_text).ok_or_else(|| {
            AppError::parse(
                &context,
                format!("no rating count in {:?}", score_count_text.trim()),
            )
        })?;

        Ok(Item {
            title: title.trim().to_string(),
            identity: resolve_url(&self.base_url, href.trim()),
            score: Self::parse_score(entry, &sel.score),
            score_count,
            note: Self::first_text(entry, &sel.note),
        })
    }

    /// Missing or malformed scores count as zero.
    fn parse_score(entry: &ElementRef, selector: &Selector) -> f32 {
        Self::first_text(entry, selector).parse().unwrap_or(0.0)
    }

    fn first_text(entry: &ElementRef, selector: &Selector) -> String {
        entry
            .select(selector)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

impl ItemExtractor for ListingExtractor {
    fn extract(&self, html: &str) -> Result<Vec<Item>> {
        let sel = Self::compile(&self.selectors)?;
        let document = Html::parse_document(html);

        document
            .select(&sel.entry)
            .enumerate()
            .map(|(position, entry)| self.parse_entry(&entry, &sel, position))
            .collect()
    }
}
