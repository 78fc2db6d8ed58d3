use super::{json_headers, Id};
use crate::check::Checks;
use crate::error::ClientResult;
use crate::gateway::{ApiRequest, Gateway};
use crate::operation::Operation;
use crate::transport::{Body, HttpMethod, HttpResponse};
use serde::Serialize;

/// Body of `POST /enroll`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Enrollment {
    pub course_id: Id,
    pub user_id: Id,
}

/// Body of `PUT /courses/update_progress`. Progress is a percentage.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressUpdate {
    pub course_id: Id,
    pub progress: u32,
}

/// Course, enrolment and quiz endpoints.
#[derive(Clone)]
pub struct CourseClient {
    gateway: Gateway,
}

impl CourseClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    fn authed(&self, method: HttpMethod, path: String, operation: Operation, token: &str) -> ApiRequest {
        ApiRequest::new(method, path, operation)
            .with_headers(json_headers())
            .with_bearer(token)
    }

    /// `GET /courses`
    pub async fn list_all_courses(&self, access_token: &str) -> HttpResponse {
        let request = self.authed(
            HttpMethod::Get,
            "/courses".to_string(),
            Operation::ListAllCourses,
            access_token,
        );
        let checks = Checks::new().status("list courses status is 200", 200);
        self.gateway.send(request, &checks).await
    }

    /// `GET /recommendations?user_id=`
    pub async fn recommendations(&self, user_id: Id, access_token: &str) -> HttpResponse {
        let request = self.authed(
            HttpMethod::Get,
            format!("/recommendations?user_id={}", user_id),
            Operation::GetRecommendations,
            access_token,
        );
        let checks = Checks::new().status("recommendations status is 200", 200);
        self.gateway.send(request, &checks).await
    }

    /// `GET /mycourses?user_id=`
    pub async fn enrolled_courses(&self, user_id: Id, access_token: &str) -> HttpResponse {
        let request = self.authed(
            HttpMethod::Get,
            format!("/mycourses?user_id={}", user_id),
            Operation::GetEnrolledCourses,
            access_token,
        );
        let checks = Checks::new().status("my courses status is 200", 200);
        self.gateway.send(request, &checks).await
    }

    /// `POST /enroll`
    pub async fn enroll(&self, enrollment: Enrollment, access_token: &str) -> ClientResult<HttpResponse> {
        let request = self
            .authed(
                HttpMethod::Post,
                "/enroll".to_string(),
                Operation::EnrollCourse,
                access_token,
            )
            .with_body(Body::json(&enrollment)?);
        let checks = Checks::new()
            .status("enroll course status is 200", 200)
            .json_field_eq(
                "enroll course response body status property is success",
                "status",
                "success",
            );
        Ok(self.gateway.send(request, &checks).await)
    }

    /// `GET /courses/{id}`
    pub async fn course_details(&self, course_id: Id, access_token: &str) -> HttpResponse {
        let request = self.authed(
            HttpMethod::Get,
            format!("/courses/{}", course_id),
            Operation::GetCourseDetails,
            access_token,
        );
        let checks = Checks::new().status("course details status is 200", 200);
        self.gateway.send(request, &checks).await
    }

    /// `PUT /courses/update_progress`
    pub async fn update_progress(&self, update: ProgressUpdate, access_token: &str) -> ClientResult<HttpResponse> {
        let request = self
            .authed(
                HttpMethod::Put,
                "/courses/update_progress".to_string(),
                Operation::UpdateProgress,
                access_token,
            )
            .with_body(Body::json(&update)?);
        let checks = Checks::new().status("update progress status is 200", 200);
        Ok(self.gateway.send(request, &checks).await)
    }

    /// `GET /section-quizzes?course_id=&section_index=`
    ///
    /// An empty list in the response means the section has no quiz.
    pub async fn start_quiz(&self, course_id: Id, section_index: u32, access_token: &str) -> HttpResponse {
        let request = self.authed(
            HttpMethod::Get,
            format!(
                "/section-quizzes?course_id={}&section_index={}",
                course_id, section_index
            ),
            Operation::StartQuiz,
            access_token,
        );
        let checks = Checks::new().status("start quiz status is 200", 200);
        self.gateway.send(request, &checks).await
    }

    /// `POST /courses/{id}/sections/{i}/quiz-complete`
    pub async fn complete_quiz(&self, course_id: Id, section_index: u32, access_token: &str) -> HttpResponse {
        let request = self.authed(
            HttpMethod::Post,
            format!(
                "/courses/{}/sections/{}/quiz-complete",
                course_id, section_index
            ),
            Operation::CompleteQuiz,
            access_token,
        );
        let checks = Checks::new().status("complete quiz status is 200", 200);
        self.gateway.send(request, &checks).await
    }
}
