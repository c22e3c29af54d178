use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::health::{HealthResponse, HealthState};
use crate::dates::{parse_input_date, to_api_date};
use crate::error::{AppError, Result};
use crate::fetcher::AnnouncementFetcher;
use crate::report::{build_report, AnnouncementReport};
use crate::session::HttpSession;
use crate::types::{AnnouncementTable, CategoryView};

#[derive(Clone)]
pub struct ApiState {
    /// One fetch at a time: the portal session is not shareable mid-fetch.
    pub fetcher: Arc<Mutex<AnnouncementFetcher<HttpSession>>>,
    pub health: Arc<HealthState>,
    pub default_start: NaiveDate,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/announcements", get(get_announcements))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AnnouncementsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ReportResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: usize,
    pub orders_count: usize,
    pub capex_count: usize,
    pub orders: CategoryView,
    pub capex: CategoryView,
    pub all: AnnouncementTable,
    pub log: Vec<String>,
}

impl ReportResponse {
    fn new(from: NaiveDate, to: NaiveDate, report: AnnouncementReport) -> Self {
        Self {
            from,
            to,
            total: report.total(),
            orders_count: report.orders_count(),
            capex_count: report.capex_count(),
            log: report.log.entries().to_vec(),
            orders: report.orders,
            capex: report.capex,
            all: report.all,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_announcements(
    State(state): State<ApiState>,
    Query(params): Query<AnnouncementsQuery>,
) -> Result<Json<ReportResponse>> {
    let today = chrono::Local::now().date_naive();
    let (from, to) = resolve_range(
        params.from.as_deref(),
        params.to.as_deref(),
        state.default_start,
        today,
    )?;

    let fetcher = state.fetcher.lock().await;
    let result = {
        let _in_progress = state.health.begin_fetch();
        build_report(&*fetcher, &to_api_date(from), &to_api_date(to)).await
    };

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            warn!("[API] fetch {from}..{to} failed: {e}");
            state.health.record_failure();
            return Err(e);
        }
    };
    state.health.record_success(report.total() as u64);
    info!(
        "[API] {from}..{to}: total={} orders={} capex={}",
        report.total(),
        report.orders_count(),
        report.capex_count(),
    );

    Ok(Json(ReportResponse::new(from, to, report)))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(state.health.snapshot())
}

/// Fill in missing bounds and reject inverted ranges.
pub fn resolve_range(
    from: Option<&str>,
    to: Option<&str>,
    default_start: NaiveDate,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let from = from.map(parse_input_date).transpose()?.unwrap_or(default_start);
    let to = to.map(parse_input_date).transpose()?.unwrap_or(today);
    if from > to {
        return Err(AppError::InvalidDate(format!("start {from} is after end {to}")));
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn missing_bounds_take_defaults() {
        let (from, to) = resolve_range(None, None, d(2025, 1, 1), d(2025, 6, 30)).unwrap();
        assert_eq!(from, d(2025, 1, 1));
        assert_eq!(to, d(2025, 6, 30));
    }

    #[test]
    fn explicit_bounds_accept_both_formats() {
        let (from, to) =
            resolve_range(Some("20250301"), Some("2025-03-31"), d(2025, 1, 1), d(2025, 6, 30)).unwrap();
        assert_eq!(from, d(2025, 3, 1));
        assert_eq!(to, d(2025, 3, 31));
    }

    #[test]
    fn inverted_or_malformed_range_is_rejected() {
        assert!(matches!(
            resolve_range(Some("20250401"), Some("20250301"), d(2025, 1, 1), d(2025, 6, 30)),
            Err(AppError::InvalidDate(_))
        ));
        assert!(matches!(
            resolve_range(Some("April"), None, d(2025, 1, 1), d(2025, 6, 30)),
            Err(AppError::InvalidDate(_))
        ));
    }
}
