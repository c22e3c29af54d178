use serde::Serialize;
use tracing::info;

use crate::classifier::KeywordFilter;
use crate::error::Result;
use crate::fetcher::AnnouncementFetcher;
use crate::session::PortalSession;
use crate::types::{AnnouncementTable, CategoryView, FetchLog};

/// A fetched table with its order and capex projections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnouncementReport {
    pub orders: CategoryView,
    pub capex: CategoryView,
    pub all: AnnouncementTable,
    pub log: FetchLog,
}

impl AnnouncementReport {
    pub fn from_table(table: AnnouncementTable, log: FetchLog) -> Self {
        let order_filter = KeywordFilter::orders();
        let capex_filter = KeywordFilter::capex();
        let orders = order_filter.apply(&table);
        let capex = capex_filter.apply(&table);
        info!(
            "[REPORT] total={} {}={} {}={}",
            table.len(),
            order_filter.name(),
            orders.len(),
            capex_filter.name(),
            capex.len(),
        );
        Self { orders, capex, all: table, log }
    }

    pub fn total(&self) -> usize {
        self.all.len()
    }

    pub fn orders_count(&self) -> usize {
        self.orders.len()
    }

    pub fn capex_count(&self) -> usize {
        self.capex.len()
    }
}

/// Fetch `from..to` (YYYYMMDD) and classify the result.
pub async fn build_report<S: PortalSession>(
    fetcher: &AnnouncementFetcher<S>,
    from: &str,
    to: &str,
) -> Result<AnnouncementReport> {
    let mut log = FetchLog::new();
    let table = fetcher.fetch_announcements(from, to, &mut log).await?;
    Ok(AnnouncementReport::from_table(table, log))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::stub::*;

    const EP: &str = "http://stub/api";

    #[tokio::test]
    async fn report_counts_each_category() {
        let session = StubSession::new(|call| {
            if call.url != EP {
                return html(200);
            }
            json(json!({
                "Table": [
                    {"NEWSID": "1", "SLONGNAME": "A", "HEADLINE": "Bagged order from Railways", "NEWSSUB": "", "NEWS_DT": "2025-01-03T10:00:00"},
                    {"NEWSID": "2", "SLONGNAME": "B", "HEADLINE": "Capacity expansion at Hosur", "NEWSSUB": "", "NEWS_DT": "2025-01-04T10:00:00"},
                    {"NEWSID": "3", "SLONGNAME": "C", "HEADLINE": "Order for new plant", "NEWSSUB": "", "NEWS_DT": "2025-01-05T10:00:00"},
                    {"NEWSID": "4", "SLONGNAME": "D", "HEADLINE": "Trading window closure", "NEWSSUB": null, "NEWS_DT": "2025-01-06T10:00:00"}
                ],
                "Table1": [{"ROWCNT": 4}]
            }))
        });
        let fetcher = AnnouncementFetcher::new(session, portal(&[EP]));

        let report = build_report(&fetcher, "20250101", "20250131").await.unwrap();

        assert_eq!(report.total(), 4);
        assert_eq!(report.orders_count(), 2);
        assert_eq!(report.capex_count(), 2);
        assert!(!report.log.is_empty());
    }

    #[tokio::test]
    async fn no_data_reports_zero_everywhere() {
        let session = StubSession::new(|call| {
            if call.url == EP {
                json(json!({"Table": [], "Table1": [{"ROWCNT": 0}]}))
            } else {
                html(200)
            }
        });
        let fetcher = AnnouncementFetcher::new(session, portal(&[EP]));

        let report = build_report(&fetcher, "20250101", "20250131").await.unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(report.orders_count(), 0);
        assert_eq!(report.capex_count(), 0);
        assert_eq!(report.all, AnnouncementTable::empty());
    }
}
