mod support;

use eduverse_client::confirm::Always;
use eduverse_client::models::{CourseCreate, CourseFilters, CourseStatus, LessonType};
use eduverse_client::validation::ModuleDraft;
use eduverse_client::{ApiError, BuilderError, CourseBuilder, CourseClient, CourseGateway};
use serde_json::json;

use support::{backend_with, signed_in, spawn, teacher_token, TENANT};

#[tokio::test]
async fn get_sends_bearer_and_tenant_and_decodes_mongo_ids() {
    let token = teacher_token();
    let (base, backend) = spawn(backend_with(&token)).await;
    let client = CourseClient::new(signed_in(&base, token.clone()));

    let course = client.get("c1", TENANT).await.unwrap();
    assert_eq!(course.id, "c1");
    assert_eq!(course.modules.len(), 2);
    assert_eq!(course.modules[0].lessons[0].kind, LessonType::Video);

    let b = backend.lock();
    assert_eq!(b.last("get_course").unwrap().auth, Some(format!("Bearer {token}")));
}

#[tokio::test]
async fn wrong_tenant_surfaces_backend_detail() {
    let token = teacher_token();
    let (base, _backend) = spawn(backend_with(&token)).await;
    let client = CourseClient::new(signed_in(&base, token));

    match client.get("c1", "other").await {
        Err(ApiError::Rejected { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Course not found");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_response_clears_the_session() {
    let (base, _backend) = spawn(backend_with("a-different-token")).await;
    let api = signed_in(&base, teacher_token());
    let session = api.session().clone();
    let client = CourseClient::new(api);

    let err = client.get("c1", TENANT).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.is_authenticated());
    assert!(session.tenant_id().is_none());
}

#[tokio::test]
async fn forbidden_response_also_clears_the_session() {
    let token = teacher_token();
    let mut b = backend_with(&token);
    b.forbidden = true;
    let (base, _backend) = spawn(b).await;
    let api = signed_in(&base, token);
    let session = api.session().clone();

    match CourseClient::new(api).get("c1", TENANT).await {
        Err(ApiError::Unauthorized { status }) => assert_eq!(status, 403),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn create_list_and_delete_courses() {
    let token = teacher_token();
    let (base, backend) = spawn(backend_with(&token)).await;
    let client = CourseClient::new(signed_in(&base, token));

    let created = client
        .create_course(&CourseCreate {
            title: "Compilers".into(),
            description: None,
            category: "Computer Science".into(),
            level: "Advanced".into(),
            status: Some(CourseStatus::Published),
            course_code: None,
            teacher_id: "teach-1".into(),
            tenant_id: TENANT.into(),
            thumbnail_url: None,
            modules: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "c2");
    assert_eq!(created.status, CourseStatus::Published);
    {
        let b = backend.lock();
        let body = b.last("create_course").unwrap().body.clone().unwrap();
        assert_eq!(body["teacherId"], "teach-1");
        assert!(body.get("courseCode").is_none());
    }

    let filters = CourseFilters {
        status: Some(CourseStatus::Published),
        limit: Some(20),
        ..Default::default()
    };
    let listed = client.list_courses(TENANT, &filters).await.unwrap();
    assert_eq!(listed.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["c2"]);
    {
        let b = backend.lock();
        let query = &b.last("list_courses").unwrap().query;
        assert_eq!(query.get("tenantId").map(String::as_str), Some(TENANT));
        assert_eq!(query.get("status").map(String::as_str), Some("published"));
        assert_eq!(query.get("limit").map(String::as_str), Some("20"));
        assert!(!query.contains_key("search"));
        assert!(!query.contains_key("skip"));
    }

    client.delete_course("c1", TENANT).await.unwrap();
    assert!(!backend.lock().courses.contains_key("c1"));
    match client.get("c1", TENANT).await {
        Err(ApiError::Rejected { status, .. }) => assert_eq!(status, 404),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn malformed_lesson_type_is_a_decode_error() {
    let token = teacher_token();
    let mut b = backend_with(&token);
    b.courses.get_mut("c1").unwrap()["modules"][0]["lessons"][0]["type"] = json!("podcast");
    let (base, _backend) = spawn(b).await;
    let client = CourseClient::new(signed_in(&base, token));

    assert!(matches!(client.get("c1", TENANT).await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn added_module_is_persisted_in_order() {
    let token = teacher_token();
    let (base, backend) = spawn(backend_with(&token)).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    builder.add_module(&ModuleDraft::new("Async Rust")).await.unwrap();

    let b = backend.lock();
    let body = b.last("put_course").unwrap().body.clone().unwrap();
    let titles: Vec<_> = body["modules"].as_array().unwrap().iter().map(|m| m["title"].clone()).collect();
    assert_eq!(titles, vec![json!("Memory"), json!("Concurrency"), json!("Async Rust")]);
    assert_eq!(body["modules"][2]["order"], 2);
    assert!(body["courseCode"].is_string());
}

#[tokio::test]
async fn failed_reorder_reloads_the_server_order() {
    let token = teacher_token();
    let mut b = backend_with(&token);
    b.fail_reorder = true;
    let (base, backend) = spawn(b).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    let err = builder.move_module(0, 1).await.unwrap_err();
    match err {
        BuilderError::Api(ApiError::Rejected { message, .. }) => assert_eq!(message, "reorder failed"),
        other => panic!("unexpected {other:?}"),
    }

    let ids: Vec<_> = builder.course().unwrap().modules.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(backend.lock().count("get_course"), 2);
}

#[tokio::test]
async fn failed_save_reloads_the_server_copy() {
    let token = teacher_token();
    let mut b = backend_with(&token);
    b.fail_updates = true;
    let (base, backend) = spawn(b).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    match builder.add_module(&ModuleDraft::new("Async Rust")).await.unwrap_err() {
        BuilderError::Api(ApiError::Rejected { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(builder.course().unwrap().modules.len(), 2);
    let b = backend.lock();
    assert_eq!(b.count("put_course"), 1);
    assert_eq!(b.count("get_course"), 2);
}

#[tokio::test]
async fn lesson_move_is_sent_as_lesson_ids() {
    let token = teacher_token();
    let mut b = backend_with(&token);
    b.courses.get_mut("c1").unwrap()["modules"][0]["lessons"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "id": "l2", "title": "Boxes", "type": "video", "duration": "4:00", "content": "https://v/2", "order": 1 }));
    let (base, backend) = spawn(b).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    assert!(builder.move_lesson("m1", 1, 0).await.unwrap());
    let ids: Vec<_> = builder.course().unwrap().modules[0].lessons.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["l2", "l1"]);

    let b = backend.lock();
    let body = b.last("reorder_lessons").unwrap().body.clone().unwrap();
    assert_eq!(body["moduleId"], "m1");
    assert_eq!(body["lessonIds"], json!(["l2", "l1"]));
    assert_eq!(b.courses["c1"]["modules"][0]["lessons"][0]["id"], "l2");
    assert_eq!(b.courses["c1"]["modules"][0]["lessons"][0]["order"], 0);
}

#[tokio::test]
async fn successful_reorder_is_sent_as_module_ids() {
    let token = teacher_token();
    let (base, backend) = spawn(backend_with(&token)).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    assert!(builder.move_module(1, 0).await.unwrap());

    let b = backend.lock();
    let body = b.last("reorder_modules").unwrap().body.clone().unwrap();
    assert_eq!(body["moduleIds"], json!(["m2", "m1"]));
    assert_eq!(b.courses["c1"]["modules"][0]["id"], "m2");
}

#[tokio::test]
async fn publish_round_trips_status() {
    let token = teacher_token();
    let (base, backend) = spawn(backend_with(&token)).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    assert!(!builder.set_published(true, &mut Always(false)).await.unwrap());
    assert_eq!(backend.lock().count("publish"), 0);

    assert!(builder.set_published(true, &mut Always(true)).await.unwrap());
    assert_eq!(builder.course().unwrap().status, CourseStatus::Published);
    assert_eq!(backend.lock().courses["c1"]["status"], "published");

    assert!(builder.toggle_publish(&mut Always(true)).await.unwrap());
    assert_eq!(builder.course().unwrap().status, CourseStatus::Draft);
}

#[tokio::test]
async fn unenroll_removes_student_and_decrements_count() {
    let token = teacher_token();
    let mut b = backend_with(&token);
    b.students = vec![
        json!({ "_id": "s1", "fullName": "Ada", "email": "ada@example.com", "progress": 40.0 }),
        json!({ "_id": "s2", "name": "Linus", "email": "linus@example.com" }),
    ];
    let (base, backend) = spawn(b).await;
    let mut builder = CourseBuilder::new(CourseClient::new(signed_in(&base, token)), "c1", TENANT);
    builder.load().await.unwrap();

    assert_eq!(builder.load_students().await.len(), 2);
    assert_eq!(builder.filtered_students("linus").len(), 1);

    assert!(builder.unenroll("s1", &mut Always(true)).await.unwrap());
    assert_eq!(builder.students().len(), 1);
    assert_eq!(builder.course().unwrap().enrolled_students, 1);
    assert_eq!(backend.lock().students.len(), 1);
}
