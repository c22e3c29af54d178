use chrono::{NaiveDate, NaiveDateTime};

use bse_announcements::dates::{parse_input_date, to_api_date};
use bse_announcements::error::Result;
use bse_announcements::report::AnnouncementReport;
use bse_announcements::types::CategoryView;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Orders,
    Capex,
    All,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Orders, Tab::Capex, Tab::All];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Orders => "Orders",
            Tab::Capex => "Capex",
            Tab::All => "All Announcements",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Orders => 0,
            Tab::Capex => 1,
            Tab::All => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Done,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

/// An in-progress edit of one range bound.
#[derive(Debug, Clone)]
pub struct DateEdit {
    pub field: DateField,
    pub buffer: String,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub editing: Option<DateEdit>,
    pub tab: Tab,
    pub status: FetchStatus,
    pub report: Option<AnnouncementReport>,
    /// Selected row in the current tab.
    pub selected: Option<usize>,
    pub show_log: bool,
    /// One-line feedback shown under the date line.
    pub message: Option<String>,
}

impl AppState {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            editing: None,
            tab: Tab::Orders,
            status: FetchStatus::Idle,
            report: None,
            selected: None,
            show_log: false,
            message: None,
        }
    }

    /// Range bounds in the form the listing endpoints take.
    pub fn api_range(&self) -> (String, String) {
        (to_api_date(self.start), to_api_date(self.end))
    }

    /// (total, orders, capex); zeros before the first fetch.
    pub fn metrics(&self) -> (usize, usize, usize) {
        self.report.as_ref().map_or((0, 0, 0), |r| {
            (r.total(), r.orders_count(), r.capex_count())
        })
    }

    pub fn begin_fetch(&mut self) {
        self.status = FetchStatus::Fetching;
        self.message = None;
    }

    pub fn finish_fetch(&mut self, result: Result<AnnouncementReport>) {
        match result {
            Ok(report) => {
                self.message = report
                    .all
                    .is_empty()
                    .then(|| "No announcements found for this range".to_string());
                self.report = Some(report);
                self.status = FetchStatus::Done;
            }
            Err(e) => {
                self.status = FetchStatus::Error(e.to_string());
            }
        }
        self.selected = None;
    }

    // --- Date editing ---

    pub fn begin_edit(&mut self, field: DateField) {
        let current = match field {
            DateField::Start => self.start,
            DateField::End => self.end,
        };
        self.editing = Some(DateEdit {
            field,
            buffer: current.format("%Y-%m-%d").to_string(),
        });
        self.message = None;
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(edit) = &mut self.editing {
            if (c.is_ascii_digit() || c == '-') && edit.buffer.len() < 10 {
                edit.buffer.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(edit) = &mut self.editing {
            edit.buffer.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Apply the edit buffer. Invalid dates and inverted ranges keep the
    /// previous value and leave a message.
    pub fn commit_edit(&mut self) {
        let Some(edit) = self.editing.take() else {
            return;
        };
        let date = match parse_input_date(&edit.buffer) {
            Ok(d) => d,
            Err(e) => {
                self.message = Some(e.to_string());
                return;
            }
        };
        let (start, end) = match edit.field {
            DateField::Start => (date, self.end),
            DateField::End => (self.start, date),
        };
        if start > end {
            self.message = Some(format!("Start {start} is after end {end}"));
            return;
        }
        self.start = start;
        self.end = end;
        self.message = None;
    }

    // --- Navigation ---

    pub fn select_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.selected = None;
        }
    }

    pub fn row_count(&self) -> usize {
        let Some(report) = &self.report else {
            return 0;
        };
        match self.tab {
            Tab::Orders => report.orders_count(),
            Tab::Capex => report.capex_count(),
            Tab::All => report.total(),
        }
    }

    pub fn current_view(&self) -> Option<&CategoryView> {
        let report = self.report.as_ref()?;
        match self.tab {
            Tab::Orders => Some(&report.orders),
            Tab::Capex => Some(&report.capex),
            Tab::All => None,
        }
    }

    pub fn scroll_down(&mut self) {
        let max = self.row_count().saturating_sub(1);
        self.selected = Some(self.selected.map_or(0, |i| (i + 1).min(max)));
    }

    pub fn scroll_up(&mut self) {
        self.selected = Some(self.selected.map_or(0, |i| i.saturating_sub(1)));
    }

    pub fn log_entries(&self) -> &[String] {
        match &self.report {
            Some(r) => r.log.entries(),
            None => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_date(date: Option<NaiveDateTime>) -> String {
    date.map_or("—".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use bse_announcements::aggregate::build_table;
    use bse_announcements::types::{AnnouncementRecord, FetchLog};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn app() -> AppState {
        AppState::new(d(2025, 1, 1), d(2025, 3, 31))
    }

    fn report() -> AnnouncementReport {
        let rows: Vec<AnnouncementRecord> = [
            json!({"NEWSID": "1", "SLONGNAME": "A", "HEADLINE": "Order win", "NEWS_DT": "2025-01-02T10:00:00"}),
            json!({"NEWSID": "2", "SLONGNAME": "B", "HEADLINE": "Greenfield plant", "NEWS_DT": "2025-01-03T10:00:00"}),
            json!({"NEWSID": "3", "SLONGNAME": "C", "HEADLINE": "AGM notice", "NEWS_DT": "2025-01-04T10:00:00"}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();
        let mut log = FetchLog::new();
        log.push("Full fetch: 20250101..20250331");
        AnnouncementReport::from_table(build_table(rows), log)
    }

    #[test]
    fn tabs_cycle_both_ways() {
        assert_eq!(Tab::Orders.next(), Tab::Capex);
        assert_eq!(Tab::All.next(), Tab::Orders);
        assert_eq!(Tab::Orders.prev(), Tab::All);
    }

    #[test]
    fn edit_commits_valid_date() {
        let mut app = app();
        app.begin_edit(DateField::Start);
        for _ in 0..10 {
            app.pop_char();
        }
        "20250215".chars().for_each(|c| app.push_char(c));
        app.commit_edit();
        assert_eq!(app.start, d(2025, 2, 15));
        assert!(app.editing.is_none());
        assert_eq!(app.api_range(), ("20250215".to_string(), "20250331".to_string()));
    }

    #[test]
    fn edit_rejects_bad_input_and_inverted_range() {
        let mut app = app();
        app.begin_edit(DateField::End);
        for _ in 0..10 {
            app.pop_char();
        }
        "2025-13-01x".chars().for_each(|c| app.push_char(c));
        app.commit_edit();
        assert_eq!(app.end, d(2025, 3, 31));
        assert!(app.message.is_some());

        app.begin_edit(DateField::End);
        for _ in 0..10 {
            app.pop_char();
        }
        "2024-12-31".chars().for_each(|c| app.push_char(c));
        app.commit_edit();
        assert_eq!(app.end, d(2025, 3, 31));
        assert!(app.message.as_deref().unwrap().contains("after"));
    }

    #[test]
    fn metrics_and_rows_follow_the_report() {
        let mut app = app();
        assert_eq!(app.metrics(), (0, 0, 0));
        app.begin_fetch();
        assert_eq!(app.status, FetchStatus::Fetching);

        app.finish_fetch(Ok(report()));
        assert_eq!(app.status, FetchStatus::Done);
        assert_eq!(app.metrics(), (3, 1, 1));
        assert_eq!(app.row_count(), 1);
        assert_eq!(app.log_entries().len(), 1);

        app.select_tab(Tab::All);
        assert_eq!(app.row_count(), 3);
        assert!(app.current_view().is_none());
        app.scroll_down();
        app.scroll_down();
        app.scroll_down();
        app.scroll_down();
        assert_eq!(app.selected, Some(2));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Rs 1,200 crore ₹ order", 10), "Rs 1,200 …");
        assert_eq!(format_date(None), "—");
    }
}
