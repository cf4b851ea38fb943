// tests/api_tests.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use chrono::{Duration as ChronoDuration, Utc};
use classroom::{
    config::Config,
    models::user::{Role, Student},
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";
const INSTRUCTOR_ID: i64 = 1;
const ANA: i64 = 101;
const BEN: i64 = 102;

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestApp {
    fn token(&self, id: i64, name: &str, role: Role) -> String {
        sign_jwt(id, name, role, SECRET, 600).unwrap()
    }

    fn instructor(&self) -> String {
        self.token(INSTRUCTOR_ID, "Ms. Reyes", Role::Instructor)
    }

    fn student(&self, id: i64) -> String {
        self.token(id, "Student", Role::Student)
    }

    /// A class with Ana and Ben enrolled, in that order.
    async fn seed_class(&self) -> i64 {
        let class_id = self.store.create_class("Physics 101").await;
        self.store
            .enroll(class_id, Student { id: ANA, name: "Ana".to_string() })
            .await;
        self.store
            .enroll(class_id, Student { id: BEN, name: "Ben".to_string() })
            .await;
        class_id
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates the standard quiz and returns (quiz_id, question ids in order).
    async fn create_quiz(&self, class_id: i64, open: bool) -> (i64, Vec<i64>) {
        let response = self
            .post("/api/quizzes", &self.instructor(), quiz_body(class_id, open))
            .await;
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        let quiz = &body["quiz"];
        let ids = quiz["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["id"].as_i64().unwrap())
            .collect();
        (quiz["id"].as_i64().unwrap(), ids)
    }
}

/// Spawns the app over an in-memory store on a random port.
async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        db_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(15),
    };

    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

/// Two multiple-choice questions (answers "b" and "a") and one essay scored 75..100.
fn quiz_body(class_id: i64, open: bool) -> Value {
    let (start, end) = if open {
        (Utc::now() - ChronoDuration::hours(1), Utc::now() + ChronoDuration::hours(1))
    } else {
        (Utc::now() - ChronoDuration::hours(3), Utc::now() - ChronoDuration::hours(2))
    };

    json!({
        "class_id": class_id,
        "title": "Kinematics",
        "description": "Chapter 2",
        "start_time": start,
        "end_time": end,
        "duration_minutes": 30,
        "quiz_type": "objective",
        "questions": [
            {
                "question_text": "Unit of force?",
                "type": "multiple_choice",
                "correct_answer": "b",
                "choices": [
                    { "label": "a", "text": "Joule" },
                    { "label": "b", "text": "Newton" },
                    { "label": "", "text": "" }
                ]
            },
            {
                "question_text": "Unit of energy?",
                "type": "multiple_choice",
                "correct_answer": "a",
                "choices": [
                    { "label": "a", "text": "Joule" },
                    { "label": "b", "text": "Watt" }
                ]
            },
            {
                "question_text": "Define velocity.",
                "type": "essay",
                "reference_answer": "rate of change of position"
            }
        ]
    })
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn missing_or_bad_token_is_401() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let path = format!("{}/api/classes/{}/quizzes", app.address, class_id);

    let response = app.client.get(&path).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app.client.get(&path).bearer_auth("garbage").send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn students_cannot_author_or_grade() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let ana = app.student(ANA);

    let response = app.post("/api/quizzes", &ana, quiz_body(class_id, true)).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .get(&format!("/api/classes/{}/gradebook", class_id), &ana)
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn create_quiz_returns_hydrated_quiz() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;

    let response = app
        .post("/api/quizzes", &app.instructor(), quiz_body(class_id, true))
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    let questions = body["quiz"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0]["type"], "multiple_choice");
    // The blank choice row is dropped.
    assert_eq!(questions[0]["choices"].as_array().unwrap().len(), 2);
    assert_eq!(questions[2]["min_score"], 75);
    assert_eq!(questions[2]["max_score"], 100);
}

#[tokio::test]
async fn invalid_quiz_reports_fields_and_persists_nothing() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;

    let mut body = quiz_body(class_id, true);
    body["end_time"] = body["start_time"].clone();
    body.as_object_mut().unwrap().remove("title");

    let response = app.post("/api/quizzes", &app.instructor(), body).await;
    assert_eq!(response.status().as_u16(), 400);

    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "validation");
    let fields: Vec<&str> = error["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"end_time"));

    let listing: Value = app
        .get(&format!("/api/classes/{}/quizzes", class_id), &app.instructor())
        .await
        .json()
        .await
        .unwrap();
    assert!(listing["quizzes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn quiz_for_unknown_class_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .post("/api/quizzes", &app.instructor(), quiz_body(9_999, true))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let error: Value = response.json().await.unwrap();
    assert_eq!(error["fields"][0]["field"], "class_id");
}

#[tokio::test]
async fn submit_scores_and_second_attempt_is_409() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let (quiz_id, q) = app.create_quiz(class_id, true).await;
    let ana = app.student(ANA);
    let path = format!("/api/quizzes/{}/submit", quiz_id);

    let answers = json!({
        "answers": {
            q[0].to_string(): " B ",
            q[1].to_string(): "a",
            q[2].to_string(): "rate of change of position"
        }
    });
    let response = app.post(&path, &ana, answers).await;
    assert_eq!(response.status().as_u16(), 200);

    // Multiple choice is case-sensitive, so " B " misses against "b".
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["score"], 101);
    assert_eq!(body["total"], 102);
    assert_eq!(body["submission"]["status"], "finished");

    let retry = json!({ "answers": { q[0].to_string(): "b" } });
    let response = app.post(&path, &ana, retry).await;
    assert_eq!(response.status().as_u16(), 409);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "already_submitted");

    let mine: Value = app.get("/api/submissions/mine", &ana).await.json().await.unwrap();
    let attempts = mine["quiz_submissions"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["score"], 101);
}

#[tokio::test]
async fn concurrent_submits_record_one_attempt() {
    let app = Arc::new(spawn_app().await);
    let class_id = app.seed_class().await;
    let (quiz_id, q) = app.create_quiz(class_id, true).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let app = app.clone();
        let first = q[0];
        handles.push(tokio::spawn(async move {
            let body = json!({ "answers": { first.to_string(): "b" } });
            app.post(&format!("/api/quizzes/{}/submit", quiz_id), &app.student(ANA), body)
                .await
                .status()
                .as_u16()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 5);

    let review: Value = app
        .get(&format!("/api/quizzes/{}/submissions", quiz_id), &app.instructor())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(review["submissions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_answers_are_validation_errors() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let (quiz_id, q) = app.create_quiz(class_id, true).await;
    let ana = app.student(ANA);
    let path = format!("/api/quizzes/{}/submit", quiz_id);

    let body = json!({ "answers": { q[0].to_string(): 5 } });
    let response = app.post(&path, &ana, body).await;
    assert_eq!(response.status().as_u16(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "validation");
    assert_eq!(error["fields"][0]["field"], format!("answers.{}", q[0]));

    let body = json!({ "answers": { "abc": "x" } });
    let response = app.post(&path, &ana, body).await;
    assert_eq!(response.status().as_u16(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "validation");

    // Nothing was recorded, so a well-formed attempt still goes through.
    let body = json!({ "answers": { q[0].to_string(): "b" } });
    assert_eq!(app.post(&path, &ana, body).await.status().as_u16(), 200);
}

#[tokio::test]
async fn malformed_quiz_date_names_the_field() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;

    let mut body = quiz_body(class_id, true);
    body["start_time"] = json!("next tuesday");

    let response = app.post("/api/quizzes", &app.instructor(), body).await;
    assert_eq!(response.status().as_u16(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "validation");
    assert_eq!(error["fields"][0]["field"], "start_time");
}

#[tokio::test]
async fn unparseable_body_is_bad_request() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/api/quizzes", app.address))
        .bearer_auth(app.instructor())
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "bad_request");
}

#[tokio::test]
async fn submit_after_window_is_403() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let (quiz_id, q) = app.create_quiz(class_id, false).await;

    let body = json!({ "answers": { q[0].to_string(): "b" } });
    let response = app
        .post(&format!("/api/quizzes/{}/submit", quiz_id), &app.student(ANA), body)
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "window_closed");
}

#[tokio::test]
async fn student_listing_hides_answer_keys() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let (quiz_id, _) = app.create_quiz(class_id, true).await;
    let ana = app.student(ANA);

    let listing: Value = app
        .get(&format!("/api/classes/{}/quizzes", class_id), &ana)
        .await
        .json()
        .await
        .unwrap();
    let quiz = &listing["quizzes"][0];
    assert_eq!(quiz["id"], quiz_id);
    assert_eq!(quiz["window"], "open");
    assert_eq!(quiz["total_possible"], 102);
    for question in quiz["questions"].as_array().unwrap() {
        assert!(question.get("correct_answer").is_none());
        assert!(question.get("reference_answer").is_none());
    }

    app.post(&format!("/api/quizzes/{}/submit", quiz_id), &ana, json!({ "answers": {} }))
        .await;

    let listing: Value = app
        .get(&format!("/api/classes/{}/quizzes", class_id), &ana)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listing["quizzes"][0]["window"], "closed");
    assert_eq!(listing["quizzes"][0]["my_submission"]["score"], 0);
}

#[tokio::test]
async fn deleted_quiz_is_gone() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let (quiz_id, _) = app.create_quiz(class_id, true).await;
    let path = format!("{}/api/quizzes/{}", app.address, quiz_id);

    let response = app
        .client
        .delete(&path)
        .bearer_auth(app.instructor())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .delete(&path)
        .bearer_auth(app.instructor())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .post(
            &format!("/api/quizzes/{}/submit", quiz_id),
            &app.student(ANA),
            json!({ "answers": {} }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn gradebook_mixes_assignment_grades_and_quiz_percentages() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let instructor = app.instructor();

    let book: Value = app
        .get(&format!("/api/classes/{}/gradebook", class_id), &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(book["columns"], json!(["Student", "Average"]));
    assert_eq!(book["rows"][0]["student"], "Ana");
    assert_eq!(book["rows"][0]["average"], 0.0);

    let response = app
        .post(
            &format!("/api/classes/{}/assignments", class_id),
            &instructor,
            json!({ "title": "Lab report", "due_date": Utc::now() + ChronoDuration::days(7) }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();

    let response = app
        .client
        .put(format!(
            "{}/api/assignments/{}/grades/{}",
            app.address, assignment_id, ANA
        ))
        .bearer_auth(&instructor)
        .json(&json!({ "grade": "80", "feedback": "Good work" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let (quiz_id, q) = app.create_quiz(class_id, true).await;
    let body = json!({ "answers": { q[0].to_string(): "b" } });
    app.post(&format!("/api/quizzes/{}/submit", quiz_id), &app.student(ANA), body)
        .await;

    let book: Value = app
        .get(&format!("/api/classes/{}/gradebook", class_id), &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(book["columns"], json!(["Student", "Lab report", "Kinematics", "Average"]));

    // 1/102 on the quiz rounds to 0.98%; (80 + 0.98) / 2 = 40.49.
    let ana = &book["rows"][0];
    assert_eq!(ana["cells"], json!([80.0, 0.98]));
    assert_eq!(ana["average"], 40.49);

    let ben = &book["rows"][1];
    assert_eq!(ben["cells"], json!([0.0, 0.0]));
    assert_eq!(ben["average"], 0.0);
}

#[tokio::test]
async fn grading_a_student_outside_the_class_is_404() {
    let app = spawn_app().await;
    let class_id = app.seed_class().await;
    let instructor = app.instructor();

    let body: Value = app
        .post(
            &format!("/api/classes/{}/assignments", class_id),
            &instructor,
            json!({ "title": "Lab report", "due_date": Utc::now() }),
        )
        .await
        .json()
        .await
        .unwrap();
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();

    let response = app
        .client
        .put(format!("{}/api/assignments/{}/grades/{}", app.address, assignment_id, 999))
        .bearer_auth(&instructor)
        .json(&json!({ "grade": "90" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
