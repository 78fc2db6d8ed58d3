//! End-to-end journey tests against a scripted course API.

use async_trait::async_trait;
use load_test::journey::{PROGRESS_PAUSE_MAX, QUIZ_PAUSE_MAX};
use load_test::{CourseApi, CourseCompletion, JourneyError, Pacer};
use parking_lot::Mutex;
use polanji_client::{Gateway, HttpMethod, Operation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use test_utils::fixtures::CourseScript;
use test_utils::{RecordingErrorSink, RecordingObserver, ScriptedTransport};

const BASE_URL: &str = "http://api.test";
const PASSWORD: &str = "secret";

/// Pacer that returns immediately and remembers what it was asked to wait.
#[derive(Default)]
struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().push(duration);
    }
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    errors: Arc<RecordingErrorSink>,
    observer: Arc<RecordingObserver>,
    api: CourseApi,
    pacer: RecordingPacer,
}

impl Harness {
    fn new(transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let errors = Arc::new(RecordingErrorSink::new());
        let observer = Arc::new(RecordingObserver::new());
        let gateway = Gateway::new(BASE_URL, transport.clone(), errors.clone()).with_observer(observer.clone());
        Self {
            transport,
            errors,
            observer,
            api: CourseApi::new(gateway),
            pacer: RecordingPacer::default(),
        }
    }

    fn scripted(script: CourseScript) -> Self {
        Self::new(script.transport())
    }

    async fn run(&self, seed: u64) -> Result<load_test::JourneyReport, JourneyError> {
        let mut rng = StdRng::seed_from_u64(seed);
        CourseCompletion::new(&self.api, PASSWORD, &self.pacer)
            .run(&mut rng)
            .await
    }

    fn progress_values(&self) -> Vec<u64> {
        self.transport
            .requests_to(HttpMethod::Put, "/courses/update_progress")
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_str(r.body.as_ref().unwrap().as_str()).unwrap();
                body["progress"].as_u64().unwrap()
            })
            .collect()
    }
}

#[tokio::test]
async fn test_full_journey_completes_course() {
    let harness = Harness::scripted(CourseScript::default());
    let report = harness.run(1).await.unwrap();

    assert!(report.course_completed);
    assert_eq!(report.session.user_id, Some(42));
    assert_eq!(report.session.access_token.as_deref(), Some("tok"));
    assert_eq!(report.session.total_quizzes, Some(3));
    assert_eq!(harness.progress_values(), vec![33, 67, 100]);
    assert!(harness.errors.records().is_empty());

    let course_id = report.session.selected_course_id.unwrap();
    assert!(course_id == 7 || course_id == 9);
    for request in harness.transport.requests().iter().skip(2) {
        assert_eq!(request.header("authorization"), Some("Bearer tok"));
    }
}

#[tokio::test]
async fn test_operation_order_for_single_section() {
    let harness = Harness::scripted(CourseScript {
        sections: 1,
        sections_with_quiz: vec![0],
        ..CourseScript::default()
    });
    harness.run(2).await.unwrap();

    let operations: Vec<Operation> = harness.transport.requests().iter().map(|r| r.operation).collect();
    assert_eq!(
        operations,
        vec![
            Operation::CreateUser,
            Operation::UserLogin,
            Operation::UserInterests,
            Operation::GetRecommendations,
            Operation::GetAllTopics,
            Operation::GetEnrolledCourses,
            Operation::EnrollCourse,
            Operation::GetEnrolledCourses,
            Operation::GetCourseDetails,
            Operation::UpdateProgress,
            Operation::StartQuiz,
            Operation::CompleteQuiz,
            Operation::GetCompletedCourses,
        ]
    );
    assert_eq!(harness.progress_values(), vec![100]);
}

#[tokio::test]
async fn test_completes_only_sections_with_quiz() {
    let harness = Harness::scripted(CourseScript {
        sections_with_quiz: vec![1],
        ..CourseScript::default()
    });
    let report = harness.run(3).await.unwrap();
    let course_id = report.session.selected_course_id.unwrap();

    let starts = harness.transport.requests_to(HttpMethod::Get, "/section-quizzes");
    assert_eq!(starts.len(), 3);

    let completes: Vec<_> = harness
        .transport
        .requests()
        .into_iter()
        .filter(|r| r.operation == Operation::CompleteQuiz)
        .collect();
    assert_eq!(completes.len(), 1);
    assert_eq!(
        completes[0].url,
        format!("{}/courses/{}/sections/1/quiz-complete", BASE_URL, course_id)
    );

    // three progress pauses and one quiz pause
    let pauses = harness.pacer.pauses.lock().clone();
    assert_eq!(pauses.len(), 4);
    assert!(pauses[0] < PROGRESS_PAUSE_MAX);
    assert!(pauses.iter().all(|p| *p < QUIZ_PAUSE_MAX));
}

#[tokio::test]
async fn test_course_without_sections_skips_progress_and_quizzes() {
    let harness = Harness::scripted(CourseScript {
        sections: 0,
        sections_with_quiz: vec![],
        ..CourseScript::default()
    });
    let report = harness.run(4).await.unwrap();

    assert_eq!(report.session.total_quizzes, Some(0));
    assert!(harness.progress_values().is_empty());
    assert!(harness.transport.requests_to(HttpMethod::Get, "/section-quizzes").is_empty());
    assert!(harness.pacer.pauses.lock().is_empty());
    assert_eq!(
        harness.transport.requests().last().unwrap().operation,
        Operation::GetCompletedCourses
    );
}

#[tokio::test]
async fn test_failed_create_user_is_recorded_and_journey_continues() {
    let harness = Harness::scripted(CourseScript {
        create_user_status: 500,
        ..CourseScript::default()
    });
    let report = harness.run(5).await.unwrap();

    assert!(report.course_completed);
    let records = harness.errors.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name(), Some("createUser"));
    assert_eq!(records[0].status, 500);
    assert_eq!(records[0].url, format!("{}/users/", BASE_URL));
}

#[tokio::test]
async fn test_completed_check_reflects_selected_course() {
    let completed = Harness::scripted(CourseScript {
        recommended: vec![7],
        completed: vec![7, 11],
        ..CourseScript::default()
    });
    assert!(completed.run(6).await.unwrap().course_completed);

    let missing = Harness::scripted(CourseScript {
        recommended: vec![9],
        completed: vec![7, 11],
        ..CourseScript::default()
    });
    let report = missing.run(6).await.unwrap();
    assert!(!report.course_completed);

    // the terminal check feeds check metrics but never the error sink
    assert!(missing.errors.records().is_empty());
    assert_eq!(
        missing.observer.checks(),
        vec![(Operation::GetCompletedCourses, 0, 1)]
    );
}

#[tokio::test]
async fn test_same_seed_same_choices() {
    let first = Harness::scripted(CourseScript::default()).run(77).await.unwrap();
    let second = Harness::scripted(CourseScript::default()).run(77).await.unwrap();

    assert_eq!(first.session.user_email, second.session.user_email);
    assert_eq!(first.session.selected_course_id, second.session.selected_course_id);
}

#[tokio::test]
async fn test_missing_token_stops_journey() {
    let harness = Harness::new(
        ScriptedTransport::new()
            .route(HttpMethod::Post, "/users/", 201, "{}")
            .route(HttpMethod::Post, "/log_in", 200, r#"{"user":{"id":1}}"#),
    );
    let err = harness.run(8).await.unwrap_err();

    assert!(matches!(
        err,
        JourneyError::MissingField {
            field: "access_token",
            ..
        }
    ));
    assert_eq!(harness.transport.requests().len(), 2);
}

#[tokio::test]
async fn test_empty_recommendations_stops_journey() {
    let harness = Harness::scripted(CourseScript {
        recommended: vec![],
        ..CourseScript::default()
    });
    let err = harness.run(9).await.unwrap_err();

    assert!(matches!(err, JourneyError::NoCourseAvailable));
    assert!(harness.transport.requests_to(HttpMethod::Post, "/enroll").is_empty());
}
