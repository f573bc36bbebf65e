use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use histvault_core::{
    DateRange, HistoryRequest, HistorySource, HttpClient, HttpError, HttpRequest, HttpResponse,
    IfengAdapter, ProviderId, RetryPolicy, SeriesId, SourceErrorKind,
};
use time::macros::date;

/// HTTP client that replays queued responses and records every request.
#[derive(Default)]
struct ScriptedHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    fn with(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::InvalidRequest(String::from("script exhausted"))));
        Box::pin(async move { next })
    }
}

fn ok(body: &str) -> HttpResponse {
    HttpResponse::new(200, body)
}

fn adapter(client: Arc<ScriptedHttpClient>) -> IfengAdapter {
    IfengAdapter::with_http_client(client)
        .with_base_url("http://ifeng.test/akdaily/")
        .with_retry_policy(RetryPolicy::immediate())
}

fn request(code: &str, range: DateRange, attempts: u32) -> HistoryRequest {
    HistoryRequest::new(SeriesId::parse(code).expect("series id"), range, attempts)
        .expect("request")
}

fn june() -> DateRange {
    DateRange::new(date!(2024 - 06 - 01), date!(2024 - 06 - 30)).expect("range")
}

const STOCK_BODY: &str = r#"{"record":[
    ["2024-06-04","35.10","35.80","35.60","35.00","1,234,567.00","0.50","1.42","35.2","35.0","34.8","1,100,000.00","1,000,000.00","900,000.00","0.21"],
    ["2024-05-31","34.90","35.20","35.10","34.70","987,654.00","0.20","0.57","35.0","34.9","34.7","1,000,000.00","950,000.00","880,000.00","0.17"],
    ["2024-06-03","35.10","35.30","35.10","34.90","1,000,000.00","0.00","0.00","35.1","35.0","34.8","1,050,000.00","980,000.00","890,000.00",""]
]}"#;

const INDEX_BODY: &str = r#"{"record":[
    ["2024-06-03","3086.81","3089.02","3078.80","3071.33","32,801,930.00","-8.15","-0.26","3090.1","3100.2","3110.3","30,000,000.00","31,000,000.00","32,000,000.00"]
]}"#;

// =============================================================================
// Decoding
// =============================================================================

#[tokio::test]
async fn stock_records_are_decoded_filtered_and_sorted() {
    // Given: Three records, one before the requested range, out of order
    let client = ScriptedHttpClient::with(vec![Ok(ok(STOCK_BODY))]);
    let source = adapter(Arc::clone(&client));

    // When: June is requested
    let table = source
        .daily_history(request("000651", june(), 3))
        .await
        .expect("history");

    // Then: Only June rows remain, ascending, with separators removed
    assert_eq!(source.id(), ProviderId::Ifeng);
    assert_eq!(table.len(), 2);
    assert_eq!(table.first_date(), Some(date!(2024 - 06 - 03)));
    assert_eq!(table.last_date(), Some(date!(2024 - 06 - 04)));
    assert_eq!(table.columns().len(), 14);
    assert_eq!(table.value(date!(2024 - 06 - 04), "volume"), Some(1_234_567.0));
    assert_eq!(table.value(date!(2024 - 06 - 04), "close"), Some(35.60));
    assert_eq!(table.value(date!(2024 - 06 - 03), "turnover"), Some(0.0));
}

#[tokio::test]
async fn index_records_have_no_turnover_column() {
    let client = ScriptedHttpClient::with(vec![Ok(ok(INDEX_BODY))]);
    let source = adapter(Arc::clone(&client));

    let table = source
        .daily_history(request("sh", june(), 3))
        .await
        .expect("history");

    assert_eq!(table.len(), 1);
    assert_eq!(table.columns().len(), 13);
    assert!(!table.has_column("turnover"));
    assert_eq!(table.value(date!(2024 - 06 - 03), "p_change"), Some(-0.26));
    assert_eq!(
        client.urls(),
        ["http://ifeng.test/akdaily/?code=sh000001&type=last"]
    );
}

#[tokio::test]
async fn missing_record_means_no_history() {
    let client = ScriptedHttpClient::with(vec![Ok(ok("{}"))]);
    let source = adapter(client);

    let table = source
        .daily_history(request("000651", june(), 3))
        .await
        .expect("history");

    assert!(table.is_empty());
}

// =============================================================================
// Endpoint
// =============================================================================

#[tokio::test]
async fn requests_use_exchange_qualified_symbols() {
    let client = ScriptedHttpClient::with(vec![
        Ok(ok("{}")),
        Ok(ok("{}")),
    ]);
    let source = adapter(Arc::clone(&client));

    for code in ["600036", "000651"] {
        source
            .daily_history(request(code, june(), 1))
            .await
            .expect("history");
    }

    assert_eq!(
        client.urls(),
        [
            "http://ifeng.test/akdaily/?code=sh600036&type=last",
            "http://ifeng.test/akdaily/?code=sz000651&type=last",
        ]
    );
}

// =============================================================================
// Retries
// =============================================================================

#[tokio::test]
async fn service_unavailable_is_retried_until_success() {
    // Given: Two 503 responses before a good body
    let client = ScriptedHttpClient::with(vec![
        Ok(HttpResponse::new(503, "busy")),
        Ok(HttpResponse::new(503, "busy")),
        Ok(ok(STOCK_BODY)),
    ]);
    let source = adapter(Arc::clone(&client));

    // When: Five attempts are allowed
    let table = source
        .daily_history(request("000651", june(), 5))
        .await
        .expect("history");

    // Then: The third call answered
    assert_eq!(client.urls().len(), 3);
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn transport_errors_stop_after_the_attempt_budget() {
    let client = ScriptedHttpClient::with(vec![
        Err(HttpError::Connect(String::from("connection reset"))),
        Err(HttpError::Connect(String::from("connection reset"))),
        Err(HttpError::Connect(String::from("connection reset"))),
        Ok(ok(STOCK_BODY)),
    ]);
    let source = adapter(Arc::clone(&client));

    let error = source
        .daily_history(request("000651", june(), 3))
        .await
        .expect_err("budget exhausted");

    assert_eq!(client.urls().len(), 3);
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(!error.retryable());
}

#[tokio::test]
async fn rate_limiting_is_retried() {
    let client = ScriptedHttpClient::with(vec![
        Ok(HttpResponse::new(429, "slow down")),
        Ok(ok("{}")),
    ]);
    let source = adapter(Arc::clone(&client));

    source
        .daily_history(request("000651", june(), 2))
        .await
        .expect("history");

    assert_eq!(client.urls().len(), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let client = ScriptedHttpClient::with(vec![
        Ok(HttpResponse::new(404, "no such code")),
        Ok(ok(STOCK_BODY)),
    ]);
    let source = adapter(Arc::clone(&client));

    let error = source
        .daily_history(request("000651", june(), 5))
        .await
        .expect_err("404");

    assert_eq!(client.urls().len(), 1);
    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
}

#[tokio::test]
async fn malformed_bodies_are_retried_as_transient() {
    let client = ScriptedHttpClient::with(vec![
        Ok(ok("<html>gateway</html>")),
        Ok(ok(STOCK_BODY)),
    ]);
    let source = adapter(Arc::clone(&client));

    let table = source
        .daily_history(request("000651", june(), 2))
        .await
        .expect("history");

    assert_eq!(client.urls().len(), 2);
    assert_eq!(table.len(), 2);
}
