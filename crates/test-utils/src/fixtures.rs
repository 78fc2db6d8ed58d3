//! Canned course API responses.
//!
//! The builders here produce the JSON bodies the journey reads values from,
//! plus a [`CourseScript`] wiring them into a [`ScriptedTransport`].

use crate::transport::ScriptedTransport;
use polanji_client::{HttpMethod, Id};
use serde_json::{json, Map, Value};

/// Login response carrying a user id and token.
pub fn login_response(user_id: Id, token: &str) -> String {
    json!({ "user": { "id": user_id }, "access_token": token, "token_type": "bearer" }).to_string()
}

/// A list of `{id}` objects, the shape of recommendation and course lists.
pub fn course_list(ids: &[Id]) -> String {
    Value::Array(ids.iter().map(|id| json!({ "id": id, "title": format!("Course {}", id) })).collect())
        .to_string()
}

/// Course details with one `quiz_status` entry per section.
pub fn course_details(course_id: Id, quiz_status: &[bool]) -> String {
    let status: Map<String, Value> = quiz_status
        .iter()
        .enumerate()
        .map(|(i, done)| (i.to_string(), Value::Bool(*done)))
        .collect();
    json!({ "id": course_id, "title": format!("Course {}", course_id), "quiz_status": status }).to_string()
}

/// A non-empty quiz payload.
pub fn quiz() -> String {
    json!([{ "question": "2 + 2?", "options": ["3", "4"], "answer": 1 }]).to_string()
}

/// Scripted course API covering one complete journey.
#[derive(Debug, Clone)]
pub struct CourseScript {
    pub user_id: Id,
    pub token: String,
    pub recommended: Vec<Id>,
    pub sections: usize,
    pub sections_with_quiz: Vec<u32>,
    pub completed: Vec<Id>,
    pub create_user_status: u16,
}

impl Default for CourseScript {
    fn default() -> Self {
        Self {
            user_id: 42,
            token: "tok".to_string(),
            recommended: vec![7, 9],
            sections: 3,
            sections_with_quiz: vec![0, 1, 2],
            completed: vec![7, 9, 11],
            create_user_status: 201,
        }
    }
}

impl CourseScript {
    /// Build the transport answering every journey endpoint.
    pub fn transport(&self) -> ScriptedTransport {
        let quiz_status = vec![false; self.sections];
        let mut transport = ScriptedTransport::new()
            .route(HttpMethod::Post, "/users/", self.create_user_status, r#"{"id":1}"#)
            .route(HttpMethod::Post, "/log_in", 200, login_response(self.user_id, &self.token))
            .route(HttpMethod::Get, "/users/interests", 200, "[]")
            .route(HttpMethod::Get, "/recommendations", 200, course_list(&self.recommended))
            .route(HttpMethod::Get, "/topics", 200, r#"[{"id":1,"name":"Rust"}]"#)
            .route(HttpMethod::Get, "/mycourses", 200, "[]")
            .route(HttpMethod::Post, "/enroll", 200, r#"{"status":"success"}"#)
            .route(HttpMethod::Put, "/courses/update_progress", 200, r#"{"status":"ok"}"#)
            .route(HttpMethod::Get, "/section-quizzes", 200, "[]")
            .route(
                HttpMethod::Get,
                &format!("/users/{}/completed-courses", self.user_id),
                200,
                course_list(&self.completed),
            );

        for course_id in &self.recommended {
            transport = transport.route(
                HttpMethod::Get,
                &format!("/courses/{}", course_id),
                200,
                course_details(*course_id, &quiz_status),
            );
            for section in &self.sections_with_quiz {
                transport = transport
                    .exact(
                        HttpMethod::Get,
                        &format!("/section-quizzes?course_id={}&section_index={}", course_id, section),
                        200,
                        quiz(),
                    )
                    .route(
                        HttpMethod::Post,
                        &format!("/courses/{}/sections/{}/quiz-complete", course_id, section),
                        200,
                        r#"{"status":"completed"}"#,
                    );
            }
        }
        transport
    }
}
