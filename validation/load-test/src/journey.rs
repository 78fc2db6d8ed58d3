//! The course-completion journey: one simulated user from sign-up to a
//! completed course.
//!
//! Every step issues its calls in order and feeds values it extracts (user
//! id, token, course id, quiz count) into the next. Failed checks are
//! recorded by the gateway and do not stop the journey; missing data that
//! later calls cannot do without does.

use crate::config::EnvironmentName;
use crate::error::JourneyError;
use async_trait::async_trait;
use polanji_client::{
    Checks, CourseClient, Enrollment, Gateway, HttpResponse, Id, LoginForm, NewUser, Operation,
    ProgressUpdate, TopicsClient, UserClient,
};
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Operations the journey issues, in first-use order.
pub const JOURNEY_OPERATIONS: [Operation; 12] = [
    Operation::CreateUser,
    Operation::UserLogin,
    Operation::UserInterests,
    Operation::GetAllTopics,
    Operation::GetRecommendations,
    Operation::GetEnrolledCourses,
    Operation::EnrollCourse,
    Operation::GetCourseDetails,
    Operation::UpdateProgress,
    Operation::StartQuiz,
    Operation::CompleteQuiz,
    Operation::GetCompletedCourses,
];

/// Environments the journey may run against.
pub const ALLOWED_ENVIRONMENTS: [EnvironmentName; 1] = [EnvironmentName::Staging];

/// Upper bound of the pause before each progress update.
pub const PROGRESS_PAUSE_MAX: Duration = Duration::from_secs(2);
/// Upper bound of the pause before completing a quiz.
pub const QUIZ_PAUSE_MAX: Duration = Duration::from_secs(3);

const COMPLETED_CHECK: &str = "course selected is completed";

/// Suspends a journey to pace requests like a human would.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Pacer backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The three resource clients sharing one gateway.
#[derive(Clone)]
pub struct CourseApi {
    pub user: UserClient,
    pub course: CourseClient,
    pub topics: TopicsClient,
    gateway: Gateway,
}

impl CourseApi {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            user: UserClient::new(gateway.clone()),
            course: CourseClient::new(gateway.clone()),
            topics: TopicsClient::new(gateway.clone()),
            gateway,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

/// Values one journey extracts as it goes. Owned by a single journey.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_email: String,
    pub user_id: Option<Id>,
    pub access_token: Option<String>,
    pub selected_course_id: Option<Id>,
    pub total_quizzes: Option<u32>,
}

/// Outcome of a journey that reached its terminal check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyReport {
    pub session: Session,
    pub course_completed: bool,
}

/// Runs the course-completion journey.
pub struct CourseCompletion<'a, P: Pacer + ?Sized> {
    api: &'a CourseApi,
    password: &'a str,
    pacer: &'a P,
}

impl<'a, P: Pacer + ?Sized> CourseCompletion<'a, P> {
    pub fn new(api: &'a CourseApi, password: &'a str, pacer: &'a P) -> Self {
        Self {
            api,
            password,
            pacer,
        }
    }

    /// Run one journey. `rng` drives the email, course pick and pauses.
    #[instrument(skip_all)]
    pub async fn run<R: Rng + Send>(&self, rng: &mut R) -> Result<JourneyReport, JourneyError> {
        let mut session = Session {
            user_email: random_email(rng),
            ..Session::default()
        };
        info!(user_email = %session.user_email, "Starting journey");

        // Start -> Created
        let new_user = NewUser {
            first_name: "Performance",
            last_name: "Test",
            email: &session.user_email,
            password: self.password,
        };
        self.api.user.create_user(&new_user).await?;

        // Created -> Authenticated
        let login = LoginForm::password_grant(&session.user_email, self.password);
        let resp = self.api.user.login(&login).await?;
        let user_id = resp
            .json_path("user.id")
            .and_then(|v| v.as_i64())
            .ok_or(JourneyError::MissingField {
                operation: Operation::UserLogin.as_str(),
                field: "user.id",
            })?;
        let token = resp
            .json_path("access_token")
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or(JourneyError::MissingField {
                operation: Operation::UserLogin.as_str(),
                field: "access_token",
            })?;
        session.user_id = Some(user_id);
        session.access_token = Some(token.clone());
        info!(user_id, "Logged in");

        // Authenticated -> CourseSelected
        self.api.user.interests(&token).await;
        let resp = self.api.course.recommendations(user_id, &token).await;
        let course_id = select_course(&resp, rng)?;
        session.selected_course_id = Some(course_id);
        info!(course_id, "Random course selected");

        // CourseSelected -> PreEnrollment
        self.api.topics.all_topics(&token).await;
        self.api.course.enrolled_courses(user_id, &token).await;

        // PreEnrollment -> Enrolled
        self.api
            .course
            .enroll(Enrollment { course_id, user_id }, &token)
            .await?;
        self.api.course.enrolled_courses(user_id, &token).await;
        let resp = self.api.course.course_details(course_id, &token).await;
        let total = total_quizzes(&resp)?;
        session.total_quizzes = Some(total);
        debug!(course_id, total_quizzes = total, "Course details loaded");

        // Enrolled -> Completed
        for section in 0..total {
            self.pacer.pause(jitter(rng, PROGRESS_PAUSE_MAX)).await;
            let update = ProgressUpdate {
                course_id,
                progress: progress_percent(section, total),
            };
            self.api.course.update_progress(update, &token).await?;

            let quiz = self.api.course.start_quiz(course_id, section, &token).await;
            // an empty list means the section has no quiz; completing it would 404
            if has_quiz(&quiz) {
                self.pacer.pause(jitter(rng, QUIZ_PAUSE_MAX)).await;
                self.api.course.complete_quiz(course_id, section, &token).await;
            } else {
                debug!(course_id, section, "No quiz for section");
            }
        }

        // Completed: terminal verification
        let resp = self.api.user.completed_courses(user_id, &token).await;
        let checks = Checks::new().custom(COMPLETED_CHECK, move |r| course_in_list(r, course_id));
        let course_completed = self
            .api
            .gateway()
            .verify(Operation::GetCompletedCourses, &resp, &checks);
        if !course_completed {
            warn!(user_id, course_id, "Selected course missing from completed courses");
        }

        Ok(JourneyReport {
            session,
            course_completed,
        })
    }
}

/// A throwaway address, `performancetest09+NNNN@gmail.com`.
pub fn random_email<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("performancetest09+{}@gmail.com", rng.gen_range(1000..=9999))
}

/// Uniform random delay in `[0, max)`.
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    max.mul_f64(rng.gen::<f64>())
}

/// Overall progress after finishing `section` of `total`, rounded half up.
pub fn progress_percent(section: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (200 * (section + 1) + total) / (2 * total)
}

/// Pick one course id uniformly from a recommendation list.
pub fn select_course<R: Rng + ?Sized>(resp: &HttpResponse, rng: &mut R) -> Result<Id, JourneyError> {
    let courses = match resp.json_value() {
        Ok(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(JourneyError::NoCourseAvailable),
    };
    let pick = &courses[rng.gen_range(0..courses.len())];
    pick.get("id")
        .and_then(Value::as_i64)
        .ok_or(JourneyError::MissingField {
            operation: Operation::GetRecommendations.as_str(),
            field: "id",
        })
}

/// Number of quiz sections, taken from the keys of `quiz_status`.
pub fn total_quizzes(resp: &HttpResponse) -> Result<u32, JourneyError> {
    resp.json_path("quiz_status")
        .and_then(|v| v.as_object().map(|m| m.len() as u32))
        .ok_or(JourneyError::MissingField {
            operation: Operation::GetCourseDetails.as_str(),
            field: "quiz_status",
        })
}

/// True when a start-quiz response carries quiz content.
pub fn has_quiz(resp: &HttpResponse) -> bool {
    matches!(resp.json_value(), Ok(Value::Array(items)) if !items.is_empty())
}

/// True when `course_id` appears in a list of `{id}` objects.
pub fn course_in_list(resp: &HttpResponse, course_id: Id) -> bool {
    resp.json::<Vec<Value>>()
        .map(|items| items.iter().any(|item| item.get("id").and_then(Value::as_i64) == Some(course_id)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polanji_client::HttpMethod;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn response(body: &str) -> HttpResponse {
        HttpResponse::new(HttpMethod::Get, "http://api.test", 200, body)
    }

    #[test]
    fn test_progress_sequence_for_three_sections() {
        let progress: Vec<u32> = (0..3).map(|i| progress_percent(i, 3)).collect();
        assert_eq!(progress, vec![33, 67, 100]);
    }

    #[test]
    fn test_progress_is_increasing_and_ends_at_100() {
        for total in 1..=40 {
            let progress: Vec<u32> = (0..total).map(|i| progress_percent(i, total)).collect();
            assert!(progress.windows(2).all(|w| w[0] < w[1]), "total {}", total);
            assert_eq!(*progress.last().unwrap(), 100);
        }
    }

    #[test]
    fn test_select_course_from_recommendations() {
        let mut rng = StdRng::seed_from_u64(7);
        let resp = response(r#"[{"id":7},{"id":9}]"#);
        for _ in 0..20 {
            let id = select_course(&resp, &mut rng).unwrap();
            assert!(id == 7 || id == 9);
        }
    }

    #[test]
    fn test_select_course_empty_list() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            select_course(&response("[]"), &mut rng),
            Err(JourneyError::NoCourseAvailable)
        ));
        assert!(matches!(
            select_course(&response(r#"{"detail":"x"}"#), &mut rng),
            Err(JourneyError::NoCourseAvailable)
        ));
    }

    #[test]
    fn test_total_quizzes_counts_keys() {
        let resp = response(r#"{"quiz_status":{"0":false,"1":false,"2":true}}"#);
        assert_eq!(total_quizzes(&resp).unwrap(), 3);
        assert_eq!(total_quizzes(&response(r#"{"quiz_status":{}}"#)).unwrap(), 0);
        assert!(total_quizzes(&response(r#"{"id":7}"#)).is_err());
    }

    #[test]
    fn test_course_in_list() {
        let resp = response(r#"[{"id":7},{"id":11}]"#);
        assert!(course_in_list(&resp, 7));
        assert!(!course_in_list(&resp, 9));
        assert!(!course_in_list(&response("not json"), 7));
    }

    #[test]
    fn test_random_email_format() {
        let mut rng = StdRng::seed_from_u64(3);
        let email = random_email(&mut rng);
        let n: u32 = email
            .strip_prefix("performancetest09+")
            .and_then(|s| s.strip_suffix("@gmail.com"))
            .unwrap()
            .parse()
            .unwrap();
        assert!((1000..=9999).contains(&n));
    }

    #[test]
    fn test_jitter_is_bounded_and_seedable() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let d = jitter(&mut a, QUIZ_PAUSE_MAX);
            assert!(d < QUIZ_PAUSE_MAX);
            assert_eq!(d, jitter(&mut b, QUIZ_PAUSE_MAX));
        }
    }
}
