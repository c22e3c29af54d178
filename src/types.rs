use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{params, BASE_COLUMNS};

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

/// One upstream announcement. Field order is preserved; unknown fields pass
/// through untouched.
pub type AnnouncementRecord = serde_json::Map<String, Value>;

/// Aggregated announcements. `columns` starts with the base columns, then any
/// extra fields in first-seen order. Every row carries every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementTable {
    pub columns: Vec<String>,
    pub rows: Vec<AnnouncementRecord>,
}

impl AnnouncementTable {
    /// A table with the base columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: BASE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

impl Default for AnnouncementTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// Text of a record field. Missing and null fields read as empty; numbers and
/// other scalars use their JSON form.
pub fn field_text<'a>(record: &'a AnnouncementRecord, key: &str) -> std::borrow::Cow<'a, str> {
    match record.get(key) {
        None | Some(Value::Null) => std::borrow::Cow::Borrowed(""),
        Some(Value::String(s)) => std::borrow::Cow::Borrowed(s.as_str()),
        Some(other) => std::borrow::Cow::Owned(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Fetch trace
// ---------------------------------------------------------------------------

/// Append-only trace of what a fetch attempted. Diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchLog {
    entries: Vec<String>,
}

impl FetchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parameter combinations
// ---------------------------------------------------------------------------

/// One hypothesis for the parameter shape a listing endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub endpoint: String,
    pub segment_type: String,
    pub search_mode: String,
    pub subcategory: String,
    pub page_key: String,
    pub scrip_key: String,
}

impl Combination {
    /// Query parameters for `page` of the range `from..to` (YYYYMMDD).
    pub fn query(&self, from: &str, to: &str, page: u32) -> Vec<(String, String)> {
        vec![
            (self.page_key.clone(), page.to_string()),
            (params::CATEGORY_KEY.to_string(), params::CATEGORY_ALL.to_string()),
            (params::FROM_DATE_KEY.to_string(), from.to_string()),
            (params::TO_DATE_KEY.to_string(), to.to_string()),
            (self.scrip_key.clone(), String::new()),
            (params::SEARCH_KEY.to_string(), self.search_mode.clone()),
            (params::SEGMENT_KEY.to_string(), self.segment_type.clone()),
            (params::SUBCATEGORY_KEY.to_string(), self.subcategory.clone()),
        ]
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} | {} | Type={} | Search={} | Subcategory={}",
            self.endpoint,
            self.page_key,
            self.scrip_key,
            self.segment_type,
            self.search_mode,
            self.subcategory,
        )
    }
}

// ---------------------------------------------------------------------------
// Category views
// ---------------------------------------------------------------------------

pub const CATEGORY_COLUMNS: [&str; 4] = ["Company", "Announcement", "Date", "Link"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Announcement")]
    pub announcement: String,
    /// None when the upstream timestamp did not parse.
    #[serde(rename = "Date")]
    pub date: Option<NaiveDateTime>,
    #[serde(rename = "Link")]
    pub link: String,
}

/// Announcements matching one category, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryView {
    pub rows: Vec<CategoryRow>,
}

impl CategoryView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_table_has_base_columns() {
        let table = AnnouncementTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.columns, BASE_COLUMNS);
    }

    #[test]
    fn field_text_defaults_missing_and_null_to_empty() {
        let record = json!({"HEADLINE": null, "SCRIP_CD": 500325, "SLONGNAME": "Acme"});
        let record = record.as_object().unwrap();
        assert_eq!(field_text(record, "HEADLINE"), "");
        assert_eq!(field_text(record, "NEWSSUB"), "");
        assert_eq!(field_text(record, "SCRIP_CD"), "500325");
        assert_eq!(field_text(record, "SLONGNAME"), "Acme");
    }

    #[test]
    fn query_uses_combination_key_spellings() {
        let combo = Combination {
            endpoint: "http://stub/a".to_string(),
            segment_type: "C".to_string(),
            search_mode: "P".to_string(),
            subcategory: "-1".to_string(),
            page_key: "Pageno".to_string(),
            scrip_key: "strscrip".to_string(),
        };
        let query = combo.query("20250101", "20250131", 3);
        assert_eq!(query[0], ("Pageno".to_string(), "3".to_string()));
        assert_eq!(query[1], ("strCat".to_string(), "-1".to_string()));
        assert_eq!(query[2], ("strPrevDate".to_string(), "20250101".to_string()));
        assert_eq!(query[3], ("strToDate".to_string(), "20250131".to_string()));
        assert_eq!(query[4], ("strscrip".to_string(), String::new()));
        assert_eq!(query[5], ("strSearch".to_string(), "P".to_string()));
        assert_eq!(query[6], ("strType".to_string(), "C".to_string()));
        assert_eq!(query[7], ("subcategory".to_string(), "-1".to_string()));
    }

    #[test]
    fn fetch_log_is_append_only_in_order() {
        let mut log = FetchLog::new();
        log.push("first");
        log.push(String::from("second"));
        assert_eq!(log.entries(), ["first".to_string(), "second".to_string()]);
    }
}
