use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ParamSpace, PortalConfig};
use crate::error::Result;
use crate::session::{warm_up, PortalSession};
use crate::types::{AnnouncementRecord, Combination, FetchLog};

/// What one listing call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// JSON answer. `total` is None when the row count could not be read.
    Data {
        rows: Vec<AnnouncementRecord>,
        total: Option<i64>,
    },
    /// Non-JSON answer: the portal is refusing this session.
    Blocked { content_type: String, status: u16 },
}

/// Pull the rows and the advertised row count out of a listing body.
pub fn parse_listing(body: &str) -> Result<(Vec<AnnouncementRecord>, Option<i64>)> {
    let data: Value = serde_json::from_str(body)?;

    let rows = data
        .get("Table")
        .and_then(|t| t.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok((rows, extract_total(&data)))
}

/// `Table1[0].ROWCNT`. Absent or falsy metadata counts as zero, as does a
/// falsy count. Metadata of the wrong shape or a count that is not an
/// integer is None. Negative counts and `true` pass through as integers.
fn extract_total(data: &Value) -> Option<i64> {
    let first = match data.get("Table1") {
        Some(Value::Array(items)) if !items.is_empty() => items[0].as_object()?,
        Some(table1) if is_truthy(table1) => return None,
        _ => return Some(0),
    };

    match first.get("ROWCNT") {
        None => Some(0),
        Some(v) if !is_truthy(v) => Some(0),
        Some(Value::Bool(true)) => Some(1),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(_) => None,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn trace(log: &mut FetchLog, entry: String) {
    debug!("[FETCH] {entry}");
    log.push(entry);
}

/// Drives the listing endpoints through one portal session.
pub struct AnnouncementFetcher<S> {
    session: S,
    portal: PortalConfig,
    space: ParamSpace,
}

impl<S: PortalSession> AnnouncementFetcher<S> {
    pub fn new(session: S, portal: PortalConfig) -> Self {
        Self {
            session,
            portal,
            space: ParamSpace::default(),
        }
    }

    pub fn with_param_space(mut self, space: ParamSpace) -> Self {
        self.space = space;
        self
    }

    pub fn portal(&self) -> &PortalConfig {
        &self.portal
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Best-effort cookie refresh; never fails.
    pub async fn warm_up(&self, timeout: Duration) {
        warm_up(&self.session, &self.portal, timeout).await;
    }

    /// One GET against one endpoint. Only transport failures and bodies that
    /// claim JSON but do not parse are errors.
    pub async fn call_once(&self, url: &str, query: &[(String, String)]) -> Result<CallOutcome> {
        let resp = self.session.get(url, query, self.portal.call_timeout).await?;

        if !resp.content_type.contains("application/json") {
            return Ok(CallOutcome::Blocked {
                content_type: resp.content_type,
                status: resp.status,
            });
        }

        let (rows, total) = parse_listing(&resp.body)?;
        Ok(CallOutcome::Data { rows, total })
    }

    /// Candidate parameter shapes in the order they are tried.
    pub fn combinations(&self) -> Vec<Combination> {
        self.space.combinations(&self.portal.endpoints)
    }

    /// Try each combination until one yields rows, and return every page of
    /// that combination. Later combinations are never called once one
    /// succeeds. Empty when nothing produced data.
    pub async fn fetch_range(
        &self,
        from: &str,
        to: &str,
        log: &mut FetchLog,
    ) -> Result<Vec<AnnouncementRecord>> {
        for combo in self.combinations() {
            trace(log, format!("Trying {combo}"));
            let rows = self.paginate(&combo, from, to, log).await?;
            if !rows.is_empty() {
                info!(
                    "[FETCH] {} rows from {} (page key {}, scrip key {})",
                    rows.len(),
                    combo.endpoint,
                    combo.page_key,
                    combo.scrip_key,
                );
                return Ok(rows);
            }
        }
        info!("[FETCH] no combination returned data for {from}..{to}");
        Ok(Vec::new())
    }

    async fn paginate(
        &self,
        combo: &Combination,
        from: &str,
        to: &str,
        log: &mut FetchLog,
    ) -> Result<Vec<AnnouncementRecord>> {
        let mut acc: Vec<AnnouncementRecord> = Vec::new();
        let mut page: u32 = 1;

        loop {
            if page > self.portal.max_pages {
                trace(log, format!("Page cap {} reached, stopping", self.portal.max_pages));
                break;
            }

            let query = combo.query(from, to, page);
            let mut outcome = self.call_once(&combo.endpoint, &query).await?;

            if let CallOutcome::Blocked { content_type, status } = &outcome {
                let entry =
                    format!("Blocked (content-type={content_type:?}, status={status}): retry warmup");
                warn!("[FETCH] {entry}");
                log.push(entry);
                self.warm_up(self.portal.retry_warmup_timeout).await;
                outcome = self.call_once(&combo.endpoint, &query).await?;
            }

            let (rows, total) = match outcome {
                CallOutcome::Blocked { .. } => break,
                CallOutcome::Data { rows, total } => (rows, total),
            };

            if page == 1 && total == Some(0) && rows.is_empty() {
                break;
            }
            if rows.is_empty() {
                break;
            }

            acc.extend(rows);
            page += 1;

            // Any non-zero total is a stop bound, negative ones included.
            if let Some(total) = total {
                if total != 0 && acc.len() as i64 >= total {
                    break;
                }
            }
        }

        Ok(acc)
    }
}
