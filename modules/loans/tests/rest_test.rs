//! REST layer tests: the real router from `Loans::register_rest`, driven
//! with `tower::ServiceExt::oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

use loans::config::LoansConfig;
use loans::Loans;

use common::{cheap_hashing, create_test_db};

async fn app() -> Router {
    let cfg = LoansConfig {
        password_hash: cheap_hashing(),
        ..LoansConfig::default()
    };
    let loans = Loans::init(create_test_db().await, cfg)
        .await
        .expect("module init");
    assert_eq!(loans.seed_report().technicians_created, 4);
    loans.register_rest(Router::new())
}

fn basic(name: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{name}:{password}")))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some((name, password)) = auth {
        req = req.header(header::AUTHORIZATION, basic(name, password));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

const TECH: Option<(&str, &str)> = Some(("Juanjo", "juanjo123"));
const ANA: Option<(&str, &str)> = Some(("Ana", "ana-pw"));

async fn register_ana(app: &Router) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": "Ana", "password": "ana-pw", "confirm_password": "ana-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn nb001(app: &Router) -> String {
    let (status, body) = call(
        app,
        Method::GET,
        "/materials/available?kind=notebook",
        ANA,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body.as_array()
        .unwrap()
        .iter()
        .find(|m| m["tag"] == "NB001")
        .map(|m| m["id"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn registration_and_login() {
    let app = app().await;

    let ana = register_ana(&app).await;
    assert_eq!(ana["role"], "teacher");
    assert!(ana.get("password_hash").is_none());

    let (status, problem) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": "Ana", "password": "x", "confirm_password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "LOANS_DUPLICATE_USER");
    assert_eq!(problem["instance"], "/auth/register");

    let (status, problem) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": "Luis", "password": "a", "confirm_password": "b" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["errors"][0]["pointer"], "/confirm_password");

    let (status, user) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "name": "Ana", "password": "ana-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], ana["id"]);

    let (status, problem) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "name": "Ana", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(problem["code"], "LOANS_INVALID_CREDENTIALS");
}

#[tokio::test]
async fn basic_auth_guards_routes() {
    let app = app().await;

    let (status, problem) = call(&app, Method::GET, "/requests", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(problem["code"], "LOANS_UNAUTHENTICATED");

    let (status, _) = call(&app, Method::GET, "/me", Some(("Juanjo", "nope")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = call(&app, Method::GET, "/me", TECH, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Juanjo");
    assert_eq!(me["role"], "technician");
}

#[tokio::test]
async fn unauthenticated_responses_carry_a_challenge() {
    let app = app().await;
    let req = Request::builder()
        .uri("/materials")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic")));
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn notebook_loan_over_http() {
    let app = app().await;
    register_ana(&app).await;
    let material_id = nb001(&app).await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/requests",
        ANA,
        Some(json!({ "kind": "notebook", "material_id": material_id, "description": "Aula 4" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "pending");
    assert_eq!(created["technician_id"], Value::Null);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, problem) = call(
        &app,
        Method::POST,
        "/requests",
        ANA,
        Some(json!({ "kind": "notebook", "material_id": material_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "LOANS_MATERIAL_UNAVAILABLE");

    let (status, problem) = call(
        &app,
        Method::POST,
        &format!("/requests/{id}/approve"),
        ANA,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(problem["code"], "LOANS_FORBIDDEN");

    let (status, approved) = call(
        &app,
        Method::POST,
        &format!("/requests/{id}/approve"),
        TECH,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "on_loan");

    let (status, problem) = call(
        &app,
        Method::POST,
        &format!("/requests/{id}/deny"),
        TECH,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "LOANS_INVALID_TRANSITION");

    let (status, returned) = call(
        &app,
        Method::POST,
        &format!("/requests/{id}/return"),
        TECH,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "returned");
    assert!(returned["resolved_at"].is_string());

    let (status, inventory) = call(&app, Method::GET, "/materials", TECH, None).await;
    assert_eq!(status, StatusCode::OK);
    let nb = inventory
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["tag"] == "NB001")
        .unwrap();
    assert_eq!(nb["status"], "available");
    assert_eq!(nb["current_request"], Value::Null);

    let (status, list) = call(&app, Method::GET, "/requests", ANA, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["requests"][0]["id"], id.as_str());
}

#[tokio::test]
async fn technician_files_for_a_teacher() {
    let app = app().await;
    let ana = register_ana(&app).await;

    let (status, problem) = call(
        &app,
        Method::POST,
        "/requests",
        TECH,
        Some(json!({ "kind": "assistance" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "LOANS_MISSING_TARGET");

    let (status, teachers) = call(&app, Method::GET, "/teachers", TECH, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(teachers[0]["id"], ana["id"]);

    let (status, created) = call(
        &app,
        Method::POST,
        "/requests",
        TECH,
        Some(json!({ "kind": "assistance", "teacher_id": ana["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["teacher_id"], ana["id"]);

    let (status, _) = call(&app, Method::GET, "/teachers", ANA, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_input_is_a_problem_not_a_crash() {
    let app = app().await;
    register_ana(&app).await;

    let (status, problem) = call(
        &app,
        Method::POST,
        "/requests",
        ANA,
        Some(json!({ "kind": "projector" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "LOANS_BAD_REQUEST");

    let (status, problem) = call(&app, Method::GET, "/requests/not-a-uuid", ANA, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "LOANS_BAD_REQUEST");

    let (status, problem) = call(
        &app,
        Method::GET,
        "/requests/00000000-0000-0000-0000-000000000000",
        ANA,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "LOANS_NOT_FOUND");

    let (status, problem) = call(
        &app,
        Method::POST,
        "/requests",
        ANA,
        Some(json!({ "kind": "notebook" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "LOANS_MISSING_MATERIAL");
}

#[tokio::test]
async fn unknown_material_kind_is_a_problem() {
    let app = app().await;
    let req = Request::builder()
        .uri("/materials/available?kind=hdmi_cable")
        .header(header::AUTHORIZATION, basic("Juanjo", "juanjo123"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let problem: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["code"], "LOANS_BAD_REQUEST");
    assert_eq!(problem["instance"], "/materials/available");
    assert!(problem["detail"].as_str().unwrap().contains("hdmi_cable"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app().await;
    let (status, doc) = call(&app, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/requests/{id}/approve"]["post"].is_object());
    assert_eq!(doc["components"]["securitySchemes"]["basic"]["scheme"], "basic");
}
