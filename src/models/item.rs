//! Ranked item and snapshot data structures.

use std::slice;

use serde::{Deserialize, Serialize};

/// One ranked entry of the list.
///
/// Field names on disk follow the historical `top250.json` layout, so older
/// snapshot files stay readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Display title (all title spans concatenated)
    pub title: String,

    /// Canonical detail-page URL, stable across snapshots
    #[serde(rename = "url")]
    pub identity: String,

    /// Average score, shown with one decimal digit
    #[serde(rename = "rating")]
    pub score: f32,

    /// Number of ratings backing the score
    #[serde(rename = "ratingNumbers")]
    pub score_count: u64,

    /// One-line quote, may be empty
    #[serde(rename = "inq", default)]
    pub note: String,
}

/// An ordered list of items where position encodes rank.
///
/// The item at index `i` holds rank `i + 1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot {
    items: Vec<Item>,
}

impl Snapshot {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Whether the snapshot holds at least `target_count` items.
    pub fn is_complete(&self, target_count: usize) -> bool {
        self.items.len() >= target_count
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Item;
    type IntoIter = slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(id: &str) -> Item {
        Item {
            title: format!("Title {id}"),
            identity: format!("https://movie.douban.com/subject/{id}/"),
            score: 9.7,
            score_count: 1_234,
            note: "希望让人自由。".to_string(),
        }
    }

    #[test]
    fn test_item_uses_legacy_field_names() {
        let json = serde_json::to_value(sample_item("1292052")).unwrap();
        assert_eq!(json["url"], "https://movie.douban.com/subject/1292052/");
        assert_eq!(json["ratingNumbers"], 1234);
        assert_eq!(json["inq"], "希望让人自由。");
        assert!(json.get("identity").is_none());
    }

    #[test]
    fn test_snapshot_is_a_bare_array() {
        let snapshot = Snapshot::new(vec![sample_item("1"), sample_item("2")]);
        let text = serde_json::to_string(&snapshot).unwrap();
        assert!(text.starts_with('['));

        let parsed: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_missing_note_defaults_to_empty() {
        let text = r#"[{"title":"T","url":"u","rating":8.0,"ratingNumbers":5}]"#;
        let parsed: Snapshot = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.items()[0].note, "");
    }

    #[test]
    fn test_is_complete() {
        let snapshot = Snapshot::new(vec![sample_item("a"), sample_item("b")]);
        assert!(snapshot.is_complete(2));
        assert!(snapshot.is_complete(1));
        assert!(!snapshot.is_complete(3));
    }
}
