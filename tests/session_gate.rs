use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use rollcall::directory::{Directory, DirectoryConfig};
use rollcall::http::{self, AppState};
use rollcall::store::Store;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn test_app() -> Router {
    let store = Store::open(&temp_dir("rollcall-session-gate")).expect("open store");
    let directory = Directory::from_config(DirectoryConfig {
        instructors: vec!["imogen".to_string()],
        faculty_groups: [("ravi".to_string(), vec![3])].into_iter().collect(),
        faculty_departments: [("ravi".to_string(), "CE".to_string())].into_iter().collect(),
        admins: Vec::new(),
    });
    http::router(AppState {
        store: Arc::new(store),
        directory: Arc::new(directory),
        session_secret: Arc::from("test-secret"),
    })
}

#[tokio::test]
async fn protected_routes_redirect_to_login_without_a_session() {
    let app = test_app();
    for path in ["/dashboard", "/export_attendance", "/mark_attendance/3"] {
        let resp = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(
            resp.headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/login"),
            "{}",
            path
        );
    }
}

#[tokio::test]
async fn root_redirects_to_login() {
    let app = test_app();
    let resp = app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn known_name_logs_in_and_reaches_the_dashboard() {
    let app = test_app();
    let resp = app
        .clone()
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("faculty_name=imogen"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/dashboard")
    );
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string();

    let resp = app
        .oneshot(
            Request::get("/dashboard")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    let page = String::from_utf8(body.to_vec()).expect("utf8");
    assert!(page.contains("imogen"));
    assert!(page.contains("/export_attendance"), "instructor sees export");
}

#[tokio::test]
async fn unknown_name_rerenders_login_without_a_cookie() {
    let app = test_app();
    let resp = app
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("faculty_name=stranger"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn tampered_session_cookie_is_treated_as_unauthenticated() {
    let app = test_app();
    let resp = app
        .oneshot(
            Request::get("/dashboard")
                .header(header::COOKIE, "rollcall_session=forged.payload")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_expires_the_cookie_and_redirects() {
    let app = test_app();
    let resp = app
        .oneshot(Request::get("/logout").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("clearing cookie");
    assert!(set_cookie.contains("Max-Age=0"));
}
