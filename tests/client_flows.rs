//! End-to-end client flows against a mock backend.
//!
//! The mock speaks the same wire protocol as the real platform and counts
//! requests per endpoint, so these tests can assert not just on outcomes but
//! on which requests were (and were not) issued.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use notes_client::{
    ApiError, ApiGateway, AppState, Client, Command, EditPhase, FormField, ModalMode, NoteField,
    Outcome, SessionStore, SubmitOutcome, View, ViewRouter, SESSION_EXPIRED_NOTICE,
};

const TOKEN: &str = "tok-test-1";

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Default)]
struct MockState {
    token_expired: AtomicBool,
    fail_next_put: AtomicBool,
    search_hits: AtomicUsize,
    note_detail_hits: AtomicUsize,
    create_hits: AtomicUsize,
    delete_hits: AtomicUsize,
    put_bodies: Mutex<Vec<Value>>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    match bearer(headers) {
        Some(token) if token == TOKEN && !state.token_expired.load(Ordering::SeqCst) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Token has expired"})),
        )
            .into_response()),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let role = match (email, password) {
        ("a@x.com", "secret") => "admin",
        ("u@x.com", "secret") => "user",
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid email or password"})),
            )
                .into_response()
        }
    };
    Json(json!({
        "message": "Login successful!",
        "token": TOKEN,
        "user": {"id": 1, "email": email, "role": role},
    }))
    .into_response()
}

async fn logout() -> Json<Value> {
    Json(json!({"success": true, "message": "Logged out successfully"}))
}

async fn change_password(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    if body["new_password"] != body["confirm_password"] {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "New passwords do not match"})),
        )
            .into_response();
    }
    Json(json!({"success": true, "message": "Password changed successfully!"})).into_response()
}

async fn categories() -> Json<Value> {
    Json(json!([
        {
            "db_name": "anatomy",
            "name": "Anatomy",
            "description": "Structure and organization of the human body",
            "notes": 2,
            "major_group": "Medical"
        },
        {
            "db_name": "cardiology",
            "name": "Cardiology",
            "description": "Heart and vascular diseases",
            "notes": 1,
            "major_group": "Specialty"
        }
    ]))
}

async fn categories_all(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!(["anatomy", "cardiology", "physiology"])).into_response()
}

#[derive(serde::Deserialize)]
struct NotesQuery {
    category: Option<String>,
    search: Option<String>,
}

async fn notes(
    State(state): State<Arc<MockState>>,
    Query(query): Query<NotesQuery>,
) -> Json<Value> {
    if query.search.is_some() {
        state.search_hits.fetch_add(1, Ordering::SeqCst);
        // More matches than the client is allowed to surface.
        let rows: Vec<Value> = (1..=8)
            .map(|i| json!({"id": i, "title": format!("Heart {}", i), "category": "anatomy", "views": i}))
            .collect();
        return Json(json!(rows));
    }
    match query.category.as_deref() {
        Some("anatomy") => Json(json!([
            {"id": 1, "title": "Human Heart Structure", "category": "anatomy", "views": 5},
            {"id": 2, "title": "Skeletal System", "category": "anatomy", "views": 3}
        ])),
        _ => Json(json!([])),
    }
}

async fn note_detail(State(state): State<Arc<MockState>>, Path(id): Path<u64>) -> Response {
    state.note_detail_hits.fetch_add(1, Ordering::SeqCst);
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Note not found or not published."})),
        )
            .into_response();
    }
    Json(json!({
        "id": id,
        "title": "Human Heart Structure",
        "content": "<p>Four chambers.</p>",
        "category": "anatomy",
        "views": 5,
        "updated_at": "2024-03-05 10:22:01"
    }))
    .into_response()
}

async fn update_note(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    if state.fail_next_put.swap(false, Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "An error occurred during update."})),
        )
            .into_response();
    }
    state.put_bodies.lock().unwrap().push(body);
    Json(json!({"message": "Note updated successfully!"})).into_response()
}

async fn create_note(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    state.create_hits.fetch_add(1, Ordering::SeqCst);
    if body["title"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Title, category, and content are required."})),
        )
            .into_response();
    }
    Json(json!({"message": "Note added successfully!"})).into_response()
}

async fn delete_note(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    state.delete_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({"message": "Note deleted successfully."})).into_response()
}

async fn admin_stats(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!({
        "stats": {
            "total_notes": 6,
            "total_users": 2,
            "total_views": 41,
            "last_update": "2024-03-05 10:22:01"
        }
    }))
    .into_response()
}

async fn note_views(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!([
        {"title": "Human Heart Structure", "views": 5},
        {"title": "Cardiac Cycle", "views": 4}
    ]))
    .into_response()
}

async fn spawn_mock() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/change_password", post(change_password))
        .route("/api/categories", get(categories))
        .route("/api/categories/all", get(categories_all))
        .route("/api/notes", get(notes))
        .route("/api/note", post(create_note))
        .route(
            "/api/note/{id}",
            get(note_detail).put(update_note).delete(delete_note),
        )
        .route("/api/admin_stats", get(admin_stats))
        .route("/api/note_views", get(note_views))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server error");
    });
    (format!("http://{}", addr), state)
}

// ============================================================================
// Client harness
// ============================================================================

fn build_client(base: &str) -> Client {
    let session = Arc::new(SessionStore::temporary().expect("temporary session store"));
    let router = Arc::new(ViewRouter::new());
    let gateway = Arc::new(
        ApiGateway::new(base, Arc::clone(&session), Arc::clone(&router))
            .expect("gateway construction"),
    );
    Client::new(AppState {
        session,
        router,
        gateway,
    })
}

async fn login_as(client: &mut Client, email: &str) {
    let outcome = client
        .dispatch(Command::Login {
            email: email.to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("login");
    assert!(matches!(outcome, Outcome::LoggedIn(_)));
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn admin_login_activates_editing_on_next_render() {
    let (base, _state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    assert!(client.session().is_admin());
    assert_eq!(client.router().current(), View::Dashboard);

    let outcome = client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();
    assert!(matches!(outcome, Outcome::NoteOpened(_)));
    assert!(client.editor().is_editable(1));
}

#[tokio::test]
async fn bad_login_is_a_business_error_not_a_rejection() {
    let (base, _state) = spawn_mock().await;
    let mut client = build_client(&base);

    let result = client
        .dispatch(Command::Login {
            email: "a@x.com".to_string(),
            password: "wrong".to_string(),
        })
        .await;

    match result {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("expected a business error, got {:?}", other.map(|_| ())),
    }
    // No session was torn down and no forced navigation happened.
    assert!(client.session().restore().is_none());
    assert_eq!(client.router().current(), View::Home);
    assert!(client.take_notice().is_none());
}

#[tokio::test]
async fn credential_rejection_recovers_uniformly() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();
    state.token_expired.store(true, Ordering::SeqCst);

    let result = client
        .dispatch(Command::Blur {
            note_id: 1,
            field: NoteField::Title,
            value: "New Title".to_string(),
        })
        .await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(client.session().restore().is_none());
    assert_eq!(client.router().current(), View::Login);
    assert_eq!(client.take_notice().as_deref(), Some(SESSION_EXPIRED_NOTICE));
    // The aborted flow may not keep editing against a dead session.
    assert!(!client.editor().is_editable(1));
}

#[tokio::test]
async fn short_queries_suppress_search_requests() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    for query in ["", "a"] {
        let outcome = client
            .dispatch(Command::Search {
                query: query.to_string(),
            })
            .await
            .unwrap();
        match outcome {
            Outcome::Suggestions(results) => assert!(results.is_empty()),
            other => panic!("expected suggestions, got {:?}", other),
        }
    }
    assert_eq!(state.search_hits.load(Ordering::SeqCst), 0);

    let outcome = client
        .dispatch(Command::Search {
            query: "he".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(state.search_hits.load(Ordering::SeqCst), 1);
    match outcome {
        Outcome::Suggestions(results) => assert_eq!(results.len(), 6),
        other => panic!("expected suggestions, got {:?}", other),
    }
}

#[tokio::test]
async fn opening_a_note_always_fetches_detail() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    client
        .dispatch(Command::OpenCategory {
            key: "anatomy".to_string(),
        })
        .await
        .unwrap();
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();

    // The summary listing never substitutes for detail.
    assert_eq!(state.note_detail_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_privileged_identity_never_edits() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "u@x.com").await;
    assert_eq!(client.router().current(), View::Home);

    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();
    assert!(!client.editor().is_editable(1));

    let outcome = client
        .dispatch(Command::Blur {
            note_id: 1,
            field: NoteField::Title,
            value: "Defaced".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::SaveSkipped));
    assert!(state.put_bodies.lock().unwrap().is_empty());

    // The structured admin paths are gated the same way.
    assert!(matches!(
        client
            .dispatch(Command::OpenModal { note_id: None })
            .await
            .unwrap(),
        Outcome::Denied(_)
    ));
    assert!(matches!(
        client.dispatch(Command::ShowDashboard).await.unwrap(),
        Outcome::Denied(_)
    ));
}

#[tokio::test]
async fn live_edit_issues_one_put_with_the_full_payload() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();

    let outcome = client
        .dispatch(Command::Blur {
            note_id: 1,
            field: NoteField::Title,
            value: "New Title".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        Outcome::SaveSettled { note_id: 1, error: None }
    ));

    let bodies = state.put_bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["title"], "New Title");
    assert_eq!(bodies[0]["category"], "anatomy");
    assert_eq!(bodies[0]["content"], "<p>Four chambers.</p>");
    assert_eq!(bodies[0]["is_published"], json!(true));
    drop(bodies);

    assert!(matches!(
        client.editor().phase(1),
        Some(EditPhase::SaveAcknowledged { .. })
    ));
}

#[tokio::test]
async fn unchanged_content_produces_no_save() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();

    let outcome = client
        .dispatch(Command::Blur {
            note_id: 1,
            field: NoteField::Title,
            value: "Human Heart Structure".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::SaveSkipped));
    assert!(state.put_bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_save_keeps_the_edit_and_retries() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();
    state.fail_next_put.store(true, Ordering::SeqCst);

    let outcome = client
        .dispatch(Command::Blur {
            note_id: 1,
            field: NoteField::Title,
            value: "New Title".to_string(),
        })
        .await
        .unwrap();
    match outcome {
        Outcome::SaveSettled { error: Some(message), .. } => {
            assert_eq!(message, "An error occurred during update.")
        }
        other => panic!("expected a failed save, got {:?}", other),
    }
    assert!(matches!(
        client.editor().phase(1),
        Some(EditPhase::SaveFailed { .. })
    ));

    // The DOM was not rolled back: blurring the same edit again retries it.
    let outcome = client
        .dispatch(Command::Blur {
            note_id: 1,
            field: NoteField::Title,
            value: "New Title".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::SaveSettled { error: None, .. }));
    assert_eq!(state.put_bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn declined_delete_issues_no_request() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();

    let outcome = client.dispatch(Command::RequestDelete).await.unwrap();
    assert!(matches!(outcome, Outcome::DeleteRequested { note_id: 1 }));

    let outcome = client
        .dispatch(Command::ConfirmDelete { confirmed: false })
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Nothing));
    assert_eq!(state.delete_hits.load(Ordering::SeqCst), 0);
    assert_eq!(client.router().current(), View::Note);
}

#[tokio::test]
async fn confirmed_delete_returns_to_the_library_root() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client.dispatch(Command::OpenNote { id: 1 }).await.unwrap();
    client.dispatch(Command::RequestDelete).await.unwrap();

    let outcome = client
        .dispatch(Command::ConfirmDelete { confirmed: true })
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Deleted { .. }));
    assert_eq!(state.delete_hits.load(Ordering::SeqCst), 1);
    assert_eq!(client.router().current(), View::Library);
}

#[tokio::test]
async fn create_with_empty_title_never_reaches_the_backend() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    let outcome = client
        .dispatch(Command::OpenModal { note_id: None })
        .await
        .unwrap();
    match outcome {
        Outcome::ModalOpened { mode, categories } => {
            assert_eq!(mode, ModalMode::Create);
            assert_eq!(categories, ["anatomy", "cardiology", "physiology"]);
        }
        other => panic!("expected the modal, got {:?}", other),
    }

    for (field, value) in [
        (FormField::Category, "anatomy"),
        (FormField::Content, "<p>Body.</p>"),
    ] {
        client
            .dispatch(Command::FormInput {
                field,
                value: value.to_string(),
            })
            .await
            .unwrap();
    }

    let result = client.dispatch(Command::SubmitModal).await;
    assert!(matches!(result, Err(ApiError::Invalid(_))));
    assert_eq!(state.create_hits.load(Ordering::SeqCst), 0);
    assert!(client.modal().is_open());
}

#[tokio::test]
async fn create_submission_refreshes_the_active_listing() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    client
        .dispatch(Command::OpenCategory {
            key: "anatomy".to_string(),
        })
        .await
        .unwrap();
    client
        .dispatch(Command::OpenModal { note_id: None })
        .await
        .unwrap();

    for (field, value) in [
        (FormField::Title, "Pericardium"),
        (FormField::Category, "anatomy"),
        (FormField::Content, "<p>The sac around the heart.</p>"),
    ] {
        client
            .dispatch(Command::FormInput {
                field,
                value: value.to_string(),
            })
            .await
            .unwrap();
    }

    let outcome = client.dispatch(Command::SubmitModal).await.unwrap();
    match outcome {
        Outcome::Submitted { result, notes } => {
            assert_eq!(result, SubmitOutcome::Created);
            let (category, listing) = notes.expect("active category refresh");
            assert_eq!(category, "anatomy");
            assert_eq!(listing.len(), 2);
        }
        other => panic!("expected a submission, got {:?}", other),
    }
    assert_eq!(state.create_hits.load(Ordering::SeqCst), 1);
    assert!(!client.modal().is_open());
}

#[tokio::test]
async fn edit_modal_prefills_from_a_fresh_fetch() {
    let (base, state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    let outcome = client
        .dispatch(Command::OpenModal { note_id: Some(1) })
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::ModalOpened { mode: ModalMode::Edit(1), .. }
    ));
    assert_eq!(client.modal().form().title, "Human Heart Structure");
    assert_eq!(client.modal().form().category, "anatomy");
    assert_eq!(state.note_detail_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_clears_the_session_and_goes_home() {
    let (base, _state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    let outcome = client.dispatch(Command::Logout).await.unwrap();

    assert!(matches!(outcome, Outcome::LoggedOut));
    assert!(client.session().restore().is_none());
    assert_eq!(client.router().current(), View::Home);
}

#[tokio::test]
async fn change_password_round_trips() {
    let (base, _state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    let outcome = client
        .dispatch(Command::ChangePassword {
            current: "secret".to_string(),
            new: "longenough".to_string(),
            confirm: "longenough".to_string(),
        })
        .await
        .unwrap();

    match outcome {
        Outcome::Message(message) => assert_eq!(message, "Password changed successfully!"),
        other => panic!("expected a message, got {:?}", other),
    }
}

#[tokio::test]
async fn dashboard_decodes_the_stats_envelope() {
    let (base, _state) = spawn_mock().await;
    let mut client = build_client(&base);

    login_as(&mut client, "a@x.com").await;
    let outcome = client.dispatch(Command::ShowDashboard).await.unwrap();

    match outcome {
        Outcome::Dashboard(dashboard) => {
            assert_eq!(dashboard.stats.total_notes, 6);
            assert_eq!(dashboard.stats.total_views, 41);
            assert_eq!(dashboard.top_notes.len(), 2);
        }
        other => panic!("expected the dashboard, got {:?}", other),
    }
    assert_eq!(client.router().current(), View::Dashboard);
}
