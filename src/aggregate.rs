use std::collections::HashSet;

use serde_json::Value;
use tracing::info;

use crate::config::{DATE_COLUMN, DEDUP_KEY_COLUMNS};
use crate::dates::{newest_first, parse_news_datetime};
use crate::error::Result;
use crate::fetcher::AnnouncementFetcher;
use crate::session::PortalSession;
use crate::types::{field_text, AnnouncementRecord, AnnouncementTable, FetchLog};

impl<S: PortalSession> AnnouncementFetcher<S> {
    /// Full fetch for `from..to` (YYYYMMDD): warm the session, search the
    /// parameter space over the whole range, and assemble the table.
    /// No data is not an error; the table then has only its base columns.
    pub async fn fetch_announcements(
        &self,
        from: &str,
        to: &str,
        log: &mut FetchLog,
    ) -> Result<AnnouncementTable> {
        self.warm_up(self.portal().warmup_timeout).await;

        let entry = format!("Full fetch: {from}..{to}");
        info!("[FETCH] {entry}");
        log.push(entry);

        let rows = self.fetch_range(from, to, log).await?;
        let table = build_table(rows);
        info!("[FETCH] {from}..{to}: {} unique announcements", table.len());
        Ok(table)
    }
}

/// Assemble fetched rows into a table: base columns first, then extra fields
/// in the order they were first seen. Rows are padded to every column,
/// deduplicated on the identity columns, and sorted newest first with
/// undated rows last.
pub fn build_table(rows: Vec<AnnouncementRecord>) -> AnnouncementTable {
    let mut table = AnnouncementTable::empty();
    if rows.is_empty() {
        return table;
    }

    let mut seen: HashSet<String> = table.columns.iter().cloned().collect();
    for row in &rows {
        for key in row.keys() {
            if seen.insert(key.clone()) {
                table.columns.push(key.clone());
            }
        }
    }

    let key_columns: Vec<&str> = DEDUP_KEY_COLUMNS
        .iter()
        .copied()
        .filter(|k| table.has_column(k))
        .collect();

    let mut identities: HashSet<Vec<String>> = HashSet::new();
    for row in rows {
        // Identity comes from the padded row, so missing and null compare equal.
        let row = normalize(&table.columns, &row);
        if !key_columns.is_empty() {
            let identity: Vec<String> = key_columns
                .iter()
                .map(|k| row.get(*k).map(Value::to_string).unwrap_or_default())
                .collect();
            if !identities.insert(identity) {
                continue;
            }
        }
        table.rows.push(row);
    }

    if table.has_column(DATE_COLUMN) {
        let mut keyed: Vec<_> = table
            .rows
            .drain(..)
            .map(|row| {
                let when = parse_news_datetime(&field_text(&row, DATE_COLUMN));
                (when, row)
            })
            .collect();
        // Stable: equal timestamps keep their fetch order.
        keyed.sort_by(|a, b| newest_first(&a.0, &b.0));
        table.rows = keyed.into_iter().map(|(_, row)| row).collect();
    }

    table
}

/// Rebuild `row` with exactly `columns`, in order, missing ones as null.
fn normalize(columns: &[String], row: &AnnouncementRecord) -> AnnouncementRecord {
    columns
        .iter()
        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::BASE_COLUMNS;
    use crate::session::stub::*;

    fn rec(v: Value) -> AnnouncementRecord {
        v.as_object().unwrap().clone()
    }

    fn ids(table: &AnnouncementTable) -> Vec<String> {
        table.rows.iter().map(|r| field_text(r, "NEWSID").into_owned()).collect()
    }

    #[test]
    fn extra_columns_follow_base_in_first_seen_order() {
        let table = build_table(vec![
            rec(json!({"NEWSID": "1", "X": 1})),
            rec(json!({"NEWSID": "2", "Y": 2})),
            rec(json!({"NEWSID": "3", "X": 3})),
        ]);

        assert_eq!(&table.columns[..BASE_COLUMNS.len()], BASE_COLUMNS);
        assert_eq!(&table.columns[BASE_COLUMNS.len()..], ["X", "Y"]);
    }

    #[test]
    fn rows_carry_every_column_in_order() {
        let table = build_table(vec![rec(json!({"Z": true, "HEADLINE": "h", "NEWSID": "1"}))]);
        let row = &table.rows[0];
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, table.columns.iter().collect::<Vec<_>>());
        assert_eq!(row["SCRIP_CD"], Value::Null);
        assert_eq!(row["Z"], json!(true));
    }

    #[test]
    fn duplicates_on_identity_columns_collapse_to_first() {
        let a = json!({"NSURL": "u", "NEWSID": "1", "ATTACHMENTNAME": "a.pdf", "HEADLINE": "h", "SLONGNAME": "first"});
        let mut b = a.clone();
        b["SLONGNAME"] = json!("second");
        let table = build_table(vec![rec(a), rec(b)]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0]["SLONGNAME"], json!("first"));
    }

    #[test]
    fn missing_and_null_identity_fields_are_the_same_announcement() {
        let table = build_table(vec![
            rec(json!({"NSURL": "u", "NEWSID": "1", "HEADLINE": "h", "SLONGNAME": "first"})),
            rec(json!({"NSURL": "u", "NEWSID": "1", "HEADLINE": "h", "ATTACHMENTNAME": null, "SLONGNAME": "second"})),
        ]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0]["SLONGNAME"], json!("first"));
        assert_eq!(table.rows[0]["ATTACHMENTNAME"], Value::Null);
    }

    #[test]
    fn rows_differing_on_one_identity_column_are_kept() {
        let table = build_table(vec![
            rec(json!({"NEWSID": "1", "HEADLINE": "h"})),
            rec(json!({"NEWSID": "1", "HEADLINE": "h2"})),
        ]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn sorted_newest_first_with_undated_last() {
        let table = build_table(vec![
            rec(json!({"NEWSID": "old", "NEWS_DT": "2025-01-02T09:00:00"})),
            rec(json!({"NEWSID": "bad", "NEWS_DT": "soon"})),
            rec(json!({"NEWSID": "new", "NEWS_DT": "2025-03-01T09:00:00.5"})),
            rec(json!({"NEWSID": "mid", "NEWS_DT": "15/02/2025 12:00:00"})),
        ]);
        assert_eq!(ids(&table), ["new", "mid", "old", "bad"]);
    }

    #[test]
    fn no_rows_gives_base_columns_only() {
        let table = build_table(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.columns, BASE_COLUMNS);
    }

    // --- end to end ---------------------------------------------------------

    const EP1: &str = "http://stub/api/one";
    const EP2: &str = "http://stub/api/two";

    #[tokio::test]
    async fn single_page_with_matching_total_needs_one_call() {
        let session = StubSession::new(|call| {
            if call.url == EP1 || call.url == EP2 {
                json(json!({
                    "Table": [
                        {"NEWSID": "1", "HEADLINE": "Order win", "NEWS_DT": "2025-01-03T10:00:00"},
                        {"NEWSID": "2", "HEADLINE": "Board meeting", "NEWS_DT": "2025-01-04T10:00:00"}
                    ],
                    "Table1": [{"ROWCNT": 2}]
                }))
            } else {
                html(200)
            }
        });
        let fetcher = AnnouncementFetcher::new(session, portal(&[EP1, EP2]));
        let mut log = FetchLog::new();

        let table = fetcher
            .fetch_announcements("20250101", "20250131", &mut log)
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(ids(&table), ["2", "1"]);
        let calls = fetcher.session().calls();
        assert_eq!(calls[0].url, "http://stub/home");
        assert_eq!(calls[1].url, "http://stub/ann.html");
        assert_eq!(fetcher.session().calls_to(EP1).len(), 1);
        assert!(fetcher.session().calls_to(EP2).is_empty());
        assert_eq!(log.entries()[0], "Full fetch: 20250101..20250131");
    }

    #[tokio::test]
    async fn blocked_everywhere_yields_empty_table_and_full_trace() {
        let fetcher = AnnouncementFetcher::new(StubSession::new(|_| html(403)), portal(&[EP1, EP2]));
        let mut log = FetchLog::new();

        let table = fetcher
            .fetch_announcements("20250101", "20250131", &mut log)
            .await
            .unwrap();

        let combos = fetcher.combinations().len();
        assert!(table.is_empty());
        assert_eq!(table.columns, BASE_COLUMNS);
        assert_eq!(log.entries().iter().filter(|e| e.contains("Blocked")).count(), combos);
        let api_calls = fetcher.session().calls_to(EP1).len() + fetcher.session().calls_to(EP2).len();
        assert_eq!(api_calls, combos * 2);
    }

    #[tokio::test]
    async fn duplicate_rows_across_pages_are_merged() {
        let session = StubSession::new(|call| {
            if call.url != EP1 {
                return html(200);
            }
            let dup = json!({"NSURL": "u1", "NEWSID": "9", "ATTACHMENTNAME": "x.pdf", "HEADLINE": "h"});
            match call.param("pageno") {
                Some("1") | Some("2") => json(json!({"Table": [dup], "Table1": [{"ROWCNT": 2}]})),
                _ => json(json!({"Table": []})),
            }
        });
        let fetcher = AnnouncementFetcher::new(session, portal(&[EP1]));
        let mut log = FetchLog::new();

        let table = fetcher
            .fetch_announcements("20250101", "20250131", &mut log)
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
    }
}
