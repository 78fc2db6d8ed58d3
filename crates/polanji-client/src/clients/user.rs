use super::{json_headers, Id};
use crate::check::Checks;
use crate::error::ClientResult;
use crate::gateway::{ApiRequest, Gateway};
use crate::operation::Operation;
use crate::transport::{Body, HttpMethod, HttpResponse};
use serde::Serialize;

/// Account creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// OAuth2 password-grant form sent to `/log_in`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm<'a> {
    pub grant_type: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub scope: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl<'a> LoginForm<'a> {
    pub fn password_grant(username: &'a str, password: &'a str) -> Self {
        Self {
            grant_type: "password",
            username,
            password,
            scope: "",
            client_id: "",
            client_secret: "",
        }
    }
}

/// User account endpoints.
#[derive(Clone)]
pub struct UserClient {
    gateway: Gateway,
}

impl UserClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// `POST /users/`
    pub async fn create_user(&self, user: &NewUser<'_>) -> ClientResult<HttpResponse> {
        let request = ApiRequest::new(HttpMethod::Post, "/users/", Operation::CreateUser)
            .with_headers(json_headers())
            .with_body(Body::json(user)?);
        let checks = Checks::new().status("create user status is 201", 201);
        Ok(self.gateway.send(request, &checks).await)
    }

    /// `POST /log_in` with a form-encoded body.
    pub async fn login(&self, credentials: &LoginForm<'_>) -> ClientResult<HttpResponse> {
        let request = ApiRequest::new(HttpMethod::Post, "/log_in", Operation::UserLogin)
            .with_headers(json_headers())
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(Body::form(credentials)?);
        let checks = Checks::new()
            .status("login status is 200", 200)
            .json_field_present("auth token available", "access_token");
        Ok(self.gateway.send(request, &checks).await)
    }

    /// `GET /users/interests`
    pub async fn interests(&self, access_token: &str) -> HttpResponse {
        let request = ApiRequest::new(HttpMethod::Get, "/users/interests", Operation::UserInterests)
            .with_headers(json_headers())
            .with_bearer(access_token);
        let checks = Checks::new().status("interests status is 200", 200);
        self.gateway.send(request, &checks).await
    }

    /// `GET /users/{id}/completed-courses`
    pub async fn completed_courses(&self, user_id: Id, access_token: &str) -> HttpResponse {
        let request = ApiRequest::new(
            HttpMethod::Get,
            format!("/users/{}/completed-courses", user_id),
            Operation::GetCompletedCourses,
        )
        .with_headers(json_headers())
        .with_bearer(access_token);
        let checks = Checks::new().status("getCompletedCourses status is 200", 200);
        self.gateway.send(request, &checks).await
    }
}
