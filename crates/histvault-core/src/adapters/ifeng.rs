//! Adapter for the ifeng `akdaily` daily-history endpoint.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::Date;
use tracing::debug;

use histvault_store::{parse_iso_date, SeriesTable};

use crate::data_source::{HistoryRequest, HistorySource, ProviderId, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{DateRange, SeriesId};

const DEFAULT_BASE_URL: &str = "http://api.finance.ifeng.com/akdaily/";

/// Fields of a stock record after the leading date, in wire order.
pub const IFENG_STOCK_COLUMNS: [&str; 14] = [
    "open",
    "high",
    "close",
    "low",
    "volume",
    "price_change",
    "p_change",
    "ma5",
    "ma10",
    "ma20",
    "v_ma5",
    "v_ma10",
    "v_ma20",
    "turnover",
];

/// Index records carry every stock field except `turnover`.
const INDEX_FIELD_COUNT: usize = IFENG_STOCK_COLUMNS.len() - 1;

const INDEX_ALIASES: [(&str, &str); 6] = [
    ("sh", "sh000001"),
    ("sz", "sz399001"),
    ("hs300", "sh000300"),
    ("sz50", "sh000016"),
    ("zxb", "sz399005"),
    ("cyb", "sz399006"),
];

/// Exchange-qualified symbol ifeng expects for a series code.
///
/// Index aliases map to their index symbol; codes starting with `5`, `6`
/// or `9` trade in Shanghai, everything else in Shenzhen.
pub fn market_symbol(series: &SeriesId) -> String {
    let code = series.as_str();
    if let Some((_, symbol)) = INDEX_ALIASES.iter().find(|(alias, _)| *alias == code) {
        return (*symbol).to_owned();
    }

    if code.starts_with(['5', '6', '9']) {
        format!("sh{code}")
    } else {
        format!("sz{code}")
    }
}

#[derive(Debug, Deserialize)]
struct AkDailyResponse {
    #[serde(default)]
    record: Option<Vec<Vec<Value>>>,
}

/// Daily history from ifeng, with bounded retries.
#[derive(Clone)]
pub struct IfengAdapter {
    http_client: Arc<dyn HttpClient>,
    retry: RetryPolicy,
    base_url: String,
}

impl Default for IfengAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()))
    }
}

impl IfengAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self, series: &SeriesId) -> String {
        format!(
            "{}?code={}&type=last",
            self.base_url,
            urlencoding::encode(&market_symbol(series))
        )
    }

    async fn fetch_once(&self, endpoint: &str, range: DateRange) -> Result<SeriesTable, SourceError> {
        let request = HttpRequest::get(endpoint);
        let response = self.http_client.execute(request).await.map_err(|e| {
            if e.retryable() {
                SourceError::unavailable(format!("ifeng transport error: {e}"))
            } else {
                SourceError::internal(format!("ifeng transport error: {e}"))
            }
        })?;

        if response.status == 429 {
            return Err(SourceError::rate_limited("ifeng returned status 429"));
        }
        if self.retry.should_retry_status(response.status) {
            return Err(SourceError::unavailable(format!(
                "ifeng returned status {}",
                response.status
            )));
        }
        if !response.is_success() {
            return Err(SourceError::invalid_request(format!(
                "ifeng returned status {}",
                response.status
            )));
        }

        parse_akdaily(&response.body, range)
    }
}

impl HistorySource for IfengAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Ifeng
    }

    fn daily_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SeriesTable, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let endpoint = self.endpoint(&req.series);
            debug!(series = %req.series, range = %req.range, %endpoint, "requesting ifeng daily history");
            let endpoint = endpoint.as_str();
            self.retry
                .run(req.max_attempts, req.series.as_str(), |_| {
                    self.fetch_once(endpoint, req.range)
                })
                .await
        })
    }
}

/// Decode an `akdaily` body, keeping rows inside `range`, ascending.
pub fn parse_akdaily(body: &str, range: DateRange) -> Result<SeriesTable, SourceError> {
    let response: AkDailyResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::unavailable(format!("failed to parse ifeng response: {e}")))?;

    let Some(records) = response.record.filter(|records| !records.is_empty()) else {
        return Ok(SeriesTable::new(IFENG_STOCK_COLUMNS));
    };

    let field_count = records[0].len().saturating_sub(1);
    if field_count != IFENG_STOCK_COLUMNS.len() && field_count != INDEX_FIELD_COUNT {
        return Err(SourceError::unavailable(format!(
            "ifeng record has {field_count} fields, expected {} or {INDEX_FIELD_COUNT}",
            IFENG_STOCK_COLUMNS.len()
        )));
    }

    let mut table = SeriesTable::new(IFENG_STOCK_COLUMNS[..field_count].iter().copied());
    for (index, record) in records.iter().enumerate() {
        if record.len() != field_count + 1 {
            return Err(SourceError::unavailable(format!(
                "ifeng record {index} has {} fields, expected {}",
                record.len().saturating_sub(1),
                field_count
            )));
        }

        let date = parse_record_date(&record[0])?;
        if !range.contains(date) {
            continue;
        }

        let values = record[1..]
            .iter()
            .map(parse_field)
            .collect::<Result<Vec<_>, _>>()?;
        table
            .push_row(date, values)
            .map_err(|e| SourceError::internal(e.to_string()))?;
    }

    table.sort_by_date();
    Ok(table)
}

fn parse_record_date(value: &Value) -> Result<Date, SourceError> {
    let raw = value
        .as_str()
        .ok_or_else(|| SourceError::unavailable(format!("ifeng record date is not a string: {value}")))?;
    parse_iso_date(raw)
        .map_err(|_| SourceError::unavailable(format!("ifeng record date '{raw}' is invalid")))
}

/// Numeric field: strings may carry thousands separators, and an empty
/// string reads as zero.
fn parse_field(value: &Value) -> Result<Option<f64>, SourceError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => Ok(number.as_f64()),
        Value::String(raw) => {
            let cleaned = raw.replace(',', "");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return Ok(Some(0.0));
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| SourceError::unavailable(format!("ifeng field '{raw}' is not numeric")))
        }
        other => Err(SourceError::unavailable(format!(
            "ifeng field {other} is not numeric"
        ))),
    }
}
