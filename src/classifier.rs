use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::dates::{newest_first, parse_news_datetime};
use crate::types::{field_text, AnnouncementRecord, AnnouncementTable, CategoryRow, CategoryView};

pub const ORDER_KEYWORDS: &[&str] = &["order", "contract", "bagged", "supply", "purchase order"];

pub const CAPEX_KEYWORDS: &[&str] = &[
    "capex",
    "capital expenditure",
    "capacity expansion",
    "new plant",
    "manufacturing facility",
    "brownfield",
    "greenfield",
    "setting up a plant",
    "increase in capacity",
    "expansion",
];

const COMPANY_FIELD: &str = "SLONGNAME";
const HEADLINE_FIELD: &str = "HEADLINE";
const SUBHEADLINE_FIELD: &str = "NEWSSUB";
const DATE_FIELD: &str = "NEWS_DT";
const LINK_FIELD: &str = "NSURL";

static ORDERS: OnceLock<KeywordFilter> = OnceLock::new();
static CAPEX: OnceLock<KeywordFilter> = OnceLock::new();

/// How keywords are allowed to sit inside the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Keyword must be bounded by non-word characters.
    WholeWord,
    /// Keyword may appear inside a longer word.
    Substring,
}

/// Case-insensitive keyword match over one or more text fields.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    name: &'static str,
    pattern: Regex,
    fields: &'static [&'static str],
}

impl KeywordFilter {
    pub fn new(
        name: &'static str,
        keywords: &[&str],
        mode: MatchMode,
        fields: &'static [&'static str],
    ) -> Result<Self, regex::Error> {
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let source = match mode {
            MatchMode::WholeWord => format!(r"\b(?:{alternation})\b"),
            MatchMode::Substring => format!("(?:{alternation})"),
        };
        let pattern = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Self { name, pattern, fields })
    }

    /// Headline contains an order keyword as a whole word.
    pub fn orders() -> &'static Self {
        ORDERS.get_or_init(|| {
            Self::new("orders", ORDER_KEYWORDS, MatchMode::WholeWord, &[HEADLINE_FIELD])
                .unwrap_or_else(|e| unreachable!("order keywords are escaped literals: {e}"))
        })
    }

    /// Headline or sub-headline contains a capex keyword anywhere.
    pub fn capex() -> &'static Self {
        CAPEX.get_or_init(|| {
            Self::new(
                "capex",
                CAPEX_KEYWORDS,
                MatchMode::Substring,
                &[HEADLINE_FIELD, SUBHEADLINE_FIELD],
            )
            .unwrap_or_else(|e| unreachable!("capex keywords are escaped literals: {e}"))
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The searched fields joined by a space, missing ones as empty.
    fn text(&self, record: &AnnouncementRecord) -> String {
        self.fields
            .iter()
            .map(|f| field_text(record, f))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn matches(&self, record: &AnnouncementRecord) -> bool {
        self.pattern.is_match(&self.text(record))
    }

    /// Matching rows as Company / Announcement / Date / Link, newest first,
    /// undated rows last.
    pub fn apply(&self, table: &AnnouncementTable) -> CategoryView {
        let mut rows: Vec<CategoryRow> = table
            .rows
            .iter()
            .filter(|r| self.matches(r))
            .map(|r| CategoryRow {
                company: field_text(r, COMPANY_FIELD).into_owned(),
                announcement: field_text(r, HEADLINE_FIELD).into_owned(),
                date: parse_news_datetime(&field_text(r, DATE_FIELD)),
                link: field_text(r, LINK_FIELD).into_owned(),
            })
            .collect();

        rows.sort_by(|a, b| newest_first(&a.date, &b.date));

        CategoryView { rows }
    }
}
