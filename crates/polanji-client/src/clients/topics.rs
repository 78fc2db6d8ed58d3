use super::json_headers;
use crate::check::Checks;
use crate::gateway::{ApiRequest, Gateway};
use crate::operation::Operation;
use crate::transport::{HttpMethod, HttpResponse};

/// Topic catalogue endpoints.
#[derive(Clone)]
pub struct TopicsClient {
    gateway: Gateway,
}

impl TopicsClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// `GET /topics`
    pub async fn all_topics(&self, access_token: &str) -> HttpResponse {
        let request = ApiRequest::new(HttpMethod::Get, "/topics", Operation::GetAllTopics)
            .with_headers(json_headers())
            .with_bearer(access_token);
        let checks = Checks::new().status("get all topics status is 200", 200);
        self.gateway.send(request, &checks).await
    }
}
