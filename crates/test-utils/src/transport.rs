//! A transport that answers from canned routes and records every request.

use async_trait::async_trait;
use parking_lot::Mutex;
use polanji_client::{HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Debug, Clone)]
struct Route {
    method: HttpMethod,
    target: String,
    match_query: bool,
    status: u16,
    body: String,
}

/// Scripted stand-in for the network.
///
/// Routes registered with [`ScriptedTransport::exact`] match path and query;
/// routes registered with [`ScriptedTransport::route`] match the path only.
/// Exact routes win. Unmatched requests get a `404`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `path` (query ignored).
    pub fn route(mut self, method: HttpMethod, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.push(Route {
            method,
            target: path.to_string(),
            match_query: false,
            status,
            body: body.into(),
        });
        self
    }

    /// Answer requests to `path_and_query` exactly.
    pub fn exact(mut self, method: HttpMethod, path_and_query: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.push(Route {
            method,
            target: path_and_query.to_string(),
            match_query: true,
            status,
            body: body.into(),
        });
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose path (query ignored) equals `path`.
    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && split_url(&r.url).0 == path)
            .cloned()
            .collect()
    }

    fn find(&self, method: HttpMethod, url: &str) -> Option<&Route> {
        let (path, path_and_query) = split_url(url);
        self.routes
            .iter()
            .find(|r| r.method == method && r.match_query && r.target == path_and_query)
            .or_else(|| {
                self.routes
                    .iter()
                    .find(|r| r.method == method && !r.match_query && r.target == path)
            })
    }
}

/// Split a URL into (path, path-and-query), dropping scheme and host.
pub fn split_url(url: &str) -> (&str, &str) {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path_and_query = after_scheme
        .find('/')
        .map(|i| &after_scheme[i..])
        .unwrap_or("/");
    let path = path_and_query
        .split_once('?')
        .map(|(p, _)| p)
        .unwrap_or(path_and_query);
    (path, path_and_query)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> HttpResponse {
        self.requests.lock().push(request.clone());
        match self.find(request.method, &request.url) {
            Some(route) => HttpResponse::new(request.method, &request.url, route.status, route.body.clone()),
            None => HttpResponse::new(request.method, &request.url, 404, r#"{"detail":"Not Found"}"#),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polanji_client::Operation;

    fn request(method: HttpMethod, url: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: url.to_string(),
            body: None,
            headers: Vec::new(),
            operation: Operation::StartQuiz,
        }
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("https://api.test/section-quizzes?course_id=7"),
            ("/section-quizzes", "/section-quizzes?course_id=7")
        );
        assert_eq!(split_url("https://api.test"), ("/", "/"));
    }

    #[tokio::test]
    async fn test_exact_route_wins_over_path_route() {
        let transport = ScriptedTransport::new()
            .route(HttpMethod::Get, "/section-quizzes", 200, "[]")
            .exact(HttpMethod::Get, "/section-quizzes?course_id=7&section_index=1", 200, "[{}]");

        let hit = transport
            .execute(&request(HttpMethod::Get, "http://api.test/section-quizzes?course_id=7&section_index=1"))
            .await;
        let fallback = transport
            .execute(&request(HttpMethod::Get, "http://api.test/section-quizzes?course_id=7&section_index=0"))
            .await;

        assert_eq!(hit.body, "[{}]");
        assert_eq!(fallback.body, "[]");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_request_is_404() {
        let transport = ScriptedTransport::new();
        let response = transport.execute(&request(HttpMethod::Delete, "http://api.test/x")).await;
        assert_eq!(response.status, 404);
    }
}
