//! In-process stand-in for the EduVerse backend.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use eduverse_client::{ApiClient, Session};

pub const TENANT: &str = "t1";
pub const FAR_FUTURE: i64 = 4_102_444_800; // 2100-01-01

#[derive(Debug, Clone)]
pub struct Call {
    pub what: String,
    pub auth: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct Backend {
    pub token: String,
    pub password: String,
    pub courses: HashMap<String, Value>,
    pub students: Vec<Value>,
    pub quizzes: Vec<Value>,
    pub submissions: Vec<Value>,
    pub fail_reorder: bool,
    pub fail_updates: bool,
    /// Valid tokens get a 403, as for a role without access.
    pub forbidden: bool,
    pub calls: Vec<Call>,
}

impl Backend {
    pub fn count(&self, what: &str) -> usize {
        self.calls.iter().filter(|c| c.what == what).count()
    }

    pub fn last(&self, what: &str) -> Option<&Call> {
        self.calls.iter().rev().find(|c| c.what == what)
    }
}

#[derive(Clone)]
pub struct Shared(Arc<Mutex<Backend>>);

impl Shared {
    pub fn lock(&self) -> MutexGuard<'_, Backend> {
        self.0.lock().unwrap()
    }
}

type Rejection = (StatusCode, Json<Value>);
type Reply = Result<Json<Value>, Rejection>;

fn detail(status: StatusCode, msg: &str) -> Rejection {
    (status, Json(json!({ "detail": msg })))
}

fn e404(msg: &str) -> Rejection {
    detail(StatusCode::NOT_FOUND, msg)
}

#[derive(Deserialize)]
struct TenantQuery {
    #[serde(rename = "tenantId")]
    tenant_id: String,
}

fn authorize(b: &mut Backend, headers: &HeaderMap, what: &str, body: Option<Value>) -> Result<(), Rejection> {
    authorize_with(b, headers, what, HashMap::new(), body)
}

fn authorize_with(
    b: &mut Backend,
    headers: &HeaderMap,
    what: &str,
    query: HashMap<String, String>,
    body: Option<Value>,
) -> Result<(), Rejection> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    b.calls.push(Call {
        what: what.to_string(),
        auth: auth.clone(),
        query,
        body,
    });
    if auth != Some(format!("Bearer {}", b.token)) {
        return Err(detail(StatusCode::UNAUTHORIZED, "Not authenticated"));
    }
    if b.forbidden {
        return Err(detail(StatusCode::FORBIDDEN, "Not enough permissions"));
    }
    Ok(())
}

fn course_mut<'a>(b: &'a mut Backend, id: &str, tenant: &str) -> Result<&'a mut Value, Rejection> {
    match b.courses.get_mut(id) {
        Some(c) if c["tenantId"] == tenant => Ok(c),
        _ => Err(e404("Course not found")),
    }
}

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/token", post(token))
        .route("/auth/:role/signup", post(signup))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/:id", get(get_course).put(put_course).delete(delete_course))
        .route("/courses/:id/reorder/modules", patch(reorder_modules))
        .route("/courses/:id/reorder/lessons", patch(reorder_lessons))
        .route("/courses/:id/publish", post(publish))
        .route("/courses/:id/students", get(students))
        .route("/courses/:id/students/:student_id", delete(unenroll))
        .route("/quizzes", get(quizzes).post(create_quiz))
        .route("/quizzes/:id", patch(update_quiz).delete(delete_quiz))
        .route("/quiz-submissions", post(submit))
        .route("/quiz-submissions/:id", delete(delete_submission))
        .route("/quiz-submissions/quiz/:id", get(quiz_submissions))
        .route("/quiz-submissions/student/:id", get(student_submissions))
        .route("/quiz-submissions/summary/quiz/:id", get(quiz_summary))
        .route("/quiz-submissions/analytics/student/:id", get(student_analytics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn token(State(s): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Reply {
    let mut b = s.lock();
    b.calls.push(Call {
        what: "token".into(),
        auth: None,
        query: HashMap::new(),
        body: Some(json!(form)),
    });
    if form.get("grant_type").map(String::as_str) != Some("password") || form.get("password") != Some(&b.password) {
        return Err(detail(StatusCode::UNAUTHORIZED, "Incorrect username or password"));
    }
    Ok(Json(json!({ "access_token": b.token, "token_type": "bearer" })))
}

async fn signup(
    State(s): State<Shared>,
    Path(role): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut b = s.lock();
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
    b.calls.push(Call {
        what: format!("signup_{role}"),
        auth,
        query: HashMap::new(),
        body: Some(body),
    });
    Ok(Json(json!({ "message": "User created" })))
}

async fn list_courses(
    State(s): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize_with(&mut b, &headers, "list_courses", q.clone(), None)?;
    let tenant = q.get("tenantId").cloned().unwrap_or_default();
    let mut list: Vec<Value> = b.courses.values().filter(|c| c["tenantId"] == tenant.as_str()).cloned().collect();
    if let Some(status) = q.get("status") {
        list.retain(|c| c["status"] == status.as_str());
    }
    list.sort_by(|a, b| a["_id"].as_str().cmp(&b["_id"].as_str()));
    Ok(Json(json!(list)))
}

async fn create_course(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "create_course", Some(body.clone()))?;
    let id = format!("c{}", b.courses.len() + 1);
    let mut course = body;
    course["_id"] = json!(id);
    if course.get("status").is_none() {
        course["status"] = json!("draft");
    }
    if course.get("modules").is_none() {
        course["modules"] = json!([]);
    }
    b.courses.insert(id, course.clone());
    Ok(Json(course))
}

async fn delete_course(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "delete_course", None)?;
    course_mut(&mut b, &id, &q.tenant_id)?;
    b.courses.remove(&id);
    Ok(Json(json!({ "message": "Course deleted" })))
}

async fn get_course(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "get_course", None)?;
    Ok(Json(course_mut(&mut b, &id, &q.tenant_id)?.clone()))
}

async fn put_course(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "put_course", Some(body.clone()))?;
    if b.fail_updates {
        return Err(detail(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable"));
    }
    let course = course_mut(&mut b, &id, &q.tenant_id)?;
    if let (Some(stored), Some(patch)) = (course.as_object_mut(), body.as_object()) {
        for (k, v) in patch {
            stored.insert(k.clone(), v.clone());
        }
    }
    Ok(Json(course.clone()))
}

async fn reorder_modules(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "reorder_modules", Some(body.clone()))?;
    if b.fail_reorder {
        return Err(detail(StatusCode::INTERNAL_SERVER_ERROR, "reorder failed"));
    }
    let course = course_mut(&mut b, &id, &q.tenant_id)?;
    let modules = course["modules"].as_array().cloned().unwrap_or_default();
    let mut reordered = Vec::new();
    for (i, mid) in body["moduleIds"].as_array().into_iter().flatten().enumerate() {
        let mut m = modules
            .iter()
            .find(|m| m["id"] == *mid)
            .cloned()
            .ok_or_else(|| detail(StatusCode::BAD_REQUEST, "unknown module"))?;
        m["order"] = json!(i);
        reordered.push(m);
    }
    course["modules"] = json!(reordered);
    Ok(Json(course.clone()))
}

async fn reorder_lessons(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "reorder_lessons", Some(body.clone()))?;
    let course = course_mut(&mut b, &id, &q.tenant_id)?;
    let module = course["modules"]
        .as_array_mut()
        .and_then(|ms| ms.iter_mut().find(|m| m["id"] == body["moduleId"]))
        .ok_or_else(|| e404("Module not found"))?;
    let lessons = module["lessons"].as_array().cloned().unwrap_or_default();
    let mut reordered = Vec::new();
    for (i, lid) in body["lessonIds"].as_array().into_iter().flatten().enumerate() {
        let mut l = lessons
            .iter()
            .find(|l| l["id"] == *lid)
            .cloned()
            .ok_or_else(|| detail(StatusCode::BAD_REQUEST, "unknown lesson"))?;
        l["order"] = json!(i);
        reordered.push(l);
    }
    module["lessons"] = json!(reordered);
    Ok(Json(course.clone()))
}

async fn publish(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "publish", Some(body.clone()))?;
    let course = course_mut(&mut b, &id, &q.tenant_id)?;
    course["status"] = json!(if body["publish"] == true { "published" } else { "draft" });
    Ok(Json(course.clone()))
}

async fn students(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "students", None)?;
    course_mut(&mut b, &id, &q.tenant_id)?;
    Ok(Json(json!(b.students)))
}

async fn unenroll(
    State(s): State<Shared>,
    Path((id, student_id)): Path<(String, String)>,
    Query(q): Query<TenantQuery>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "unenroll", Some(json!(student_id)))?;
    course_mut(&mut b, &id, &q.tenant_id)?;
    b.students.retain(|st| st["_id"] != student_id.as_str());
    Ok(Json(json!({ "message": "Student unenrolled" })))
}

async fn quizzes(State(s): State<Shared>, Query(q): Query<HashMap<String, String>>, headers: HeaderMap) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "quizzes", Some(json!(q)))?;
    let tenant = q.get("tenant_id").cloned().unwrap_or_default();
    let list: Vec<Value> = b.quizzes.iter().filter(|quiz| quiz["tenantId"] == tenant.as_str()).cloned().collect();
    Ok(Json(json!(list)))
}

async fn create_quiz(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "create_quiz", Some(body.clone()))?;
    let mut quiz = body;
    quiz["_id"] = json!(format!("q-{}", b.quizzes.len() + 1));
    quiz["status"] = json!("active");
    b.quizzes.push(quiz.clone());
    Ok(Json(quiz))
}

fn owned_quiz<'a>(b: &'a mut Backend, id: &str, q: &HashMap<String, String>) -> Result<&'a mut Value, Rejection> {
    let teacher = q.get("teacher_id").cloned().unwrap_or_default();
    b.quizzes
        .iter_mut()
        .find(|quiz| quiz["_id"] == id && quiz["teacherId"] == teacher.as_str())
        .ok_or_else(|| e404("Quiz not found"))
}

async fn update_quiz(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut b = s.lock();
    authorize_with(&mut b, &headers, "update_quiz", q.clone(), Some(body.clone()))?;
    let quiz = owned_quiz(&mut b, &id, &q)?;
    if let (Some(stored), Some(patch)) = (quiz.as_object_mut(), body.as_object()) {
        for (k, v) in patch {
            stored.insert(k.clone(), v.clone());
        }
    }
    Ok(Json(quiz.clone()))
}

async fn delete_quiz(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize_with(&mut b, &headers, "delete_quiz", q.clone(), None)?;
    owned_quiz(&mut b, &id, &q)?;
    b.quizzes.retain(|quiz| quiz["_id"] != id.as_str());
    Ok(Json(json!({ "message": "Quiz deleted" })))
}

async fn quiz_submissions(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize_with(&mut b, &headers, "quiz_submissions", q.clone(), None)?;
    let mut list: Vec<Value> = b.submissions.iter().filter(|sub| sub["quizId"] == id.as_str()).cloned().collect();
    if q.get("sort").map(String::as_str) == Some("score") {
        list.sort_by(|a, b| b["percentage"].as_f64().partial_cmp(&a["percentage"].as_f64()).unwrap());
    }
    Ok(Json(json!(list)))
}

async fn quiz_summary(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize_with(&mut b, &headers, "quiz_summary", q.clone(), None)?;
    let top_n: usize = q.get("top_n").and_then(|n| n.parse().ok()).unwrap_or(5);
    let mut subs: Vec<&Value> = b.submissions.iter().filter(|sub| sub["quizId"] == id.as_str()).collect();
    subs.sort_by(|a, b| b["percentage"].as_f64().partial_cmp(&a["percentage"].as_f64()).unwrap());
    let pcts: Vec<f64> = subs.iter().filter_map(|sub| sub["percentage"].as_f64()).collect();
    let average = if pcts.is_empty() { 0.0 } else { pcts.iter().sum::<f64>() / pcts.len() as f64 };
    let top: Vec<Value> = subs
        .iter()
        .take(top_n)
        .map(|sub| json!({ "studentId": sub["studentId"], "obtainedMarks": sub["obtainedMarks"], "percentage": sub["percentage"] }))
        .collect();
    Ok(Json(json!({
        "quizId": id,
        "totalSubmissions": subs.len(),
        "averagePercentage": average,
        "highestPercentage": pcts.first().copied().unwrap_or(0.0),
        "lowestPercentage": pcts.last().copied().unwrap_or(0.0),
        "topScorers": top,
    })))
}

async fn student_analytics(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    let mut b = s.lock();
    authorize_with(&mut b, &headers, "student_analytics", q.clone(), None)?;
    let recent: usize = q.get("recent").and_then(|n| n.parse().ok()).unwrap_or(5);
    let subs: Vec<Value> = b.submissions.iter().filter(|sub| sub["studentId"] == id.as_str()).cloned().collect();
    let pcts: Vec<f64> = subs.iter().filter_map(|sub| sub["percentage"].as_f64()).collect();
    let average = if pcts.is_empty() { 0.0 } else { pcts.iter().sum::<f64>() / pcts.len() as f64 };
    let recent_attempts: Vec<Value> = subs.iter().rev().take(recent).cloned().collect();
    Ok(Json(json!({
        "studentId": id,
        "totalQuizzes": subs.len(),
        "averagePercentage": average,
        "recentAttempts": recent_attempts,
    })))
}

async fn delete_submission(State(s): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "delete_submission", Some(json!(id)))?;
    let before = b.submissions.len();
    b.submissions.retain(|sub| sub["_id"] != id.as_str());
    if b.submissions.len() == before {
        return Err(e404("Submission not found"));
    }
    Ok(Json(json!({ "message": "Submission deleted" })))
}

async fn student_submissions(State(s): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "student_submissions", None)?;
    let list: Vec<Value> = b.submissions.iter().filter(|sub| sub["studentId"] == id.as_str()).cloned().collect();
    Ok(Json(json!(list)))
}

async fn submit(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut b = s.lock();
    authorize(&mut b, &headers, "submit", Some(body.clone()))?;
    if b
        .submissions
        .iter()
        .any(|sub| sub["quizId"] == body["quizId"] && sub["studentId"] == body["studentId"])
    {
        return Err(detail(StatusCode::BAD_REQUEST, "Student already submitted this quiz."));
    }
    let quiz = b
        .quizzes
        .iter()
        .find(|q| q["_id"] == body["quizId"])
        .cloned()
        .ok_or_else(|| e404("Quiz not found"))?;
    let questions = quiz["questions"].as_array().cloned().unwrap_or_default();
    let obtained = body["answers"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|a| {
            let idx = a["questionIndex"].as_u64().unwrap_or(u64::MAX) as usize;
            questions.get(idx).is_some_and(|q| q["answer"] == a["selected"])
        })
        .count();
    let total = questions.len().max(1);
    let submission = json!({
        "_id": format!("sub-{}", b.submissions.len() + 1),
        "studentId": body["studentId"],
        "quizId": body["quizId"],
        "courseId": body["courseId"],
        "answers": body["answers"],
        "obtainedMarks": obtained,
        "totalMarks": questions.len(),
        "percentage": obtained as f64 * 100.0 / total as f64,
    });
    b.submissions.push(submission.clone());
    Ok(Json(submission))
}

/// Binds an ephemeral port and serves `backend` until the test ends.
pub async fn spawn(backend: Backend) -> (String, Shared) {
    let shared = Shared(Arc::new(Mutex::new(backend)));
    let app = router(shared.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), shared)
}

/// Token with an `alg: none` header; the client never checks signatures.
pub fn unsigned_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

pub fn teacher_token() -> String {
    unsigned_token(&json!({
        "user_id": "u-teacher",
        "email": "teacher@example.com",
        "role": "teacher",
        "tenant_id": TENANT,
        "teacher_id": "teach-1",
        "full_name": "Grace Hopper",
        "exp": FAR_FUTURE,
        "iat": 0,
    }))
}

pub fn student_token() -> String {
    unsigned_token(&json!({
        "user_id": "u-student",
        "email": "student@example.com",
        "role": "student",
        "tenant_id": TENANT,
        "student_id": "st-1",
        "exp": FAR_FUTURE,
    }))
}

pub fn course_json() -> Value {
    json!({
        "_id": "c1",
        "title": "Systems Programming",
        "tenantId": TENANT,
        "teacherId": "teach-1",
        "status": "draft",
        "enrolledStudents": 2,
        "modules": [
            { "id": "m1", "title": "Memory", "order": 0, "lessons": [
                { "id": "l1", "title": "Stack and heap", "type": "video", "duration": "12:30", "content": "https://v/1", "order": 0 }
            ]},
            { "id": "m2", "title": "Concurrency", "order": 1, "lessons": [] }
        ]
    })
}

pub fn backend_with(token: &str) -> Backend {
    let mut b = Backend {
        token: token.to_string(),
        password: "secret".into(),
        ..Default::default()
    };
    b.courses.insert("c1".into(), course_json());
    b
}

/// Client whose session already holds `token`.
pub fn signed_in(base_url: &str, token: String) -> ApiClient {
    let session = Session::in_memory();
    session.establish(token).unwrap();
    ApiClient::new(base_url, session)
}
