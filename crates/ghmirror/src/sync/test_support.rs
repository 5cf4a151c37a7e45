//! Fixtures shared by the sync tests.

use std::sync::Arc;

use serde_json::Value;

use crate::db::connect_and_migrate;
use crate::github::{ClientOptions, pool_from_tokens};
use crate::http::{HttpMethod, HttpResponse, HttpTransport, MockTransport};

use super::context::SyncContext;
use super::types::SyncOptions;

pub(crate) const API: &str = "https://api.github.com";

pub(crate) fn url(route: &str) -> String {
    format!("{API}{route}")
}

pub(crate) fn page_url(route: &str, page: u32) -> String {
    let separator = if route.contains('?') { '&' } else { '?' };
    format!("{API}{route}{separator}per_page=100&page={page}")
}

/// Register one page of a listing, linking to `next` when given.
pub(crate) fn push_page(mock: &MockTransport, route: &str, page: u32, items: Value, next: Option<u32>) {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    if let Some(next) = next {
        headers.push((
            "Link".to_string(),
            format!("<{}>; rel=\"next\"", page_url(route, next)),
        ));
    }
    mock.push_response(
        HttpMethod::Get,
        page_url(route, page),
        HttpResponse {
            status: 200,
            headers,
            body: items.to_string().into_bytes(),
        },
    );
}

pub(crate) async fn context(mock: &MockTransport, options: SyncOptions) -> SyncContext {
    let db = connect_and_migrate("sqlite::memory:").await.expect("db");
    let transport: Arc<dyn HttpTransport> = Arc::new(mock.clone());
    let pool = pool_from_tokens(&["token-a"], transport, &ClientOptions::default()).expect("pool");
    SyncContext::builder()
        .database(Arc::new(db))
        .pool(Arc::new(pool))
        .options(options)
        .build()
        .expect("context")
}
