//! A stub GitHub API for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ghmirror::connect_and_migrate;
use ghmirror::github::{ClientOptions, pool_from_tokens};
use ghmirror::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use ghmirror::sync::{SyncContext, SyncOptions};
use serde_json::{Value, json};

pub const API: &str = "https://api.github.com";

/// Serves fixed JSON routes. Unlike a queue of canned responses, a route
/// answers every time it is asked, so whole crawls can be replayed.
#[derive(Clone, Default)]
pub struct StubGitHub {
    inner: Arc<Mutex<StubState>>,
}

#[derive(Default)]
struct StubState {
    routes: HashMap<String, HttpResponse>,
    limited_tokens: HashMap<String, u64>,
    requests: Vec<HttpRequest>,
}

fn json_response(status: u16, body: &Value, link: Option<String>) -> HttpResponse {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    if let Some(link) = link {
        headers.push(("Link".to_string(), link));
    }
    HttpResponse {
        status,
        headers,
        body: body.to_string().into_bytes(),
    }
}

pub fn page_url(route: &str, page: u32) -> String {
    let separator = if route.contains('?') { '&' } else { '?' };
    format!("{API}{route}{separator}per_page=100&page={page}")
}

impl StubGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.inner.lock().expect("stub lock")
    }

    /// Answer `route` with `body`, replacing any earlier answer.
    pub fn object(&self, route: &str, body: Value) {
        self.state()
            .routes
            .insert(format!("{API}{route}"), json_response(200, &body, None));
    }

    pub fn status(&self, route: &str, status: u16) {
        self.state().routes.insert(
            format!("{API}{route}"),
            json_response(status, &json!({"message": "stubbed failure"}), None),
        );
    }

    /// Serve a listing split into `pages`, linked with `rel="next"`.
    pub fn listing(&self, route: &str, pages: Vec<Value>) {
        let count = pages.len() as u32;
        let mut state = self.state();
        for (index, items) in pages.into_iter().enumerate() {
            let page = index as u32 + 1;
            let link = (page < count).then(|| format!("<{}>; rel=\"next\"", page_url(route, page + 1)));
            state
                .routes
                .insert(page_url(route, page), json_response(200, &items, link));
        }
    }

    /// Answer every request made with `token` with a secondary rate limit.
    pub fn limit_token(&self, token: &str, retry_after_secs: u64) {
        self.state()
            .limited_tokens
            .insert(format!("Bearer {token}"), retry_after_secs);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    /// Requests whose URL starts with `API + prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<String> {
        let prefix = format!("{API}{prefix}");
        self.requests()
            .into_iter()
            .map(|r| r.url)
            .filter(|url| url.starts_with(&prefix))
            .collect()
    }

    /// Bearer token of each request, in order.
    pub fn tokens_used(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.header("Authorization"))
            .map(|v| v.trim_start_matches("Bearer ").to_string())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for StubGitHub {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut state = self.state();
        state.requests.push(request.clone());

        if let Some(auth) = request.header("Authorization")
            && let Some(secs) = state.limited_tokens.get(auth)
        {
            return Ok(HttpResponse {
                status: 403,
                headers: vec![("Retry-After".to_string(), secs.to_string())],
                body: json!({"message": "You have exceeded a secondary rate limit."})
                    .to_string()
                    .into_bytes(),
            });
        }

        match state.routes.get(&request.url) {
            Some(response) => Ok(response.clone()),
            None => Ok(json_response(404, &json!({"message": "Not Found"}), None)),
        }
    }
}

pub async fn context(stub: &StubGitHub, tokens: &[&str], options: SyncOptions) -> SyncContext {
    let db = connect_and_migrate("sqlite::memory:").await.expect("db");
    let transport: Arc<dyn HttpTransport> = Arc::new(stub.clone());
    let pool = pool_from_tokens(tokens, transport, &ClientOptions::default()).expect("pool");
    SyncContext::builder()
        .database(Arc::new(db))
        .pool(Arc::new(pool))
        .options(options)
        .build()
        .expect("context")
}

pub fn repo(id: i64, name: &str) -> Value {
    json!({"id": id, "name": name, "full_name": format!("acme/{name}"), "owner": {"id": 9, "login": "acme"}})
}

/// Organization `acme` with one member and three repositories.
///
/// `widgets` has issue #1 (one comment) and pull request #2 (one review);
/// the issues listing also returns #2, linked to the pull request.
/// `gadgets` and `secret` are empty.
pub fn acme(stub: &StubGitHub) {
    stub.object("/orgs/acme", json!({"id": 9, "login": "acme", "name": "Acme"}));
    stub.listing("/orgs/acme/members", vec![json!([{"id": 1, "login": "alice"}])]);
    stub.object("/users/alice", json!({"id": 1, "login": "alice", "name": "Alice"}));

    let repos = [(10, "widgets"), (11, "gadgets"), (12, "secret")];
    stub.listing(
        "/orgs/acme/repos",
        vec![json!(repos.iter().map(|(id, name)| repo(*id, name)).collect::<Vec<_>>())],
    );
    for (id, name) in repos {
        stub.object(&format!("/repos/acme/{name}"), repo(id, name));
        if name != "widgets" {
            stub.listing(&format!("/repos/acme/{name}/issues?state=all"), vec![json!([])]);
            stub.listing(&format!("/repos/acme/{name}/pulls?state=all"), vec![json!([])]);
        }
    }

    let issue = json!({"id": 100, "number": 1, "title": "Bug", "state": "open"});
    let linked = json!({"id": 200, "number": 2, "title": "Fix", "state": "open",
        "pull_request": {"url": format!("{API}/repos/acme/widgets/pulls/2")}});
    let pull = json!({"id": 200, "number": 2, "title": "Fix", "state": "open"});
    stub.listing("/repos/acme/widgets/issues?state=all", vec![json!([issue.clone(), linked])]);
    stub.listing("/repos/acme/widgets/pulls?state=all", vec![json!([pull.clone()])]);
    stub.object("/repos/acme/widgets/issues/1", issue);
    stub.object("/repos/acme/widgets/pulls/2", pull);

    stub.listing(
        "/repos/acme/widgets/issues/1/comments",
        vec![json!([{"id": 500, "body": "me too",
            "issue_url": format!("{API}/repos/acme/widgets/issues/1")}])],
    );
    stub.listing(
        "/repos/acme/widgets/pulls/2/reviews",
        vec![json!([{"id": 700, "state": "APPROVED"}])],
    );
    stub.listing("/repos/acme/widgets/pulls/2/comments", vec![json!([])]);
    stub.listing("/repos/acme/widgets/issues/2/comments", vec![json!([])]);
}
