use axum::extract::{Form, State};
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect};
use tracing::info;

use crate::http::pages;
use crate::http::session::{self, Session};
use crate::http::AppState;

pub async fn index() -> Redirect {
    Redirect::to("/login")
}

pub async fn login_page(State(state): State<AppState>) -> Html<String> {
    pages::login(&state.directory.user_names())
}

pub async fn login_submit(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    let name = fields
        .iter()
        .find(|(k, _)| k == "faculty_name")
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default();

    let Some(profile) = state.directory.lookup(&name) else {
        // Unknown name: re-render the login page rather than erroring.
        return pages::login(&state.directory.user_names()).into_response();
    };

    info!("login: {}", profile.name);
    let session = Session {
        user_name: profile.name.clone(),
        is_instructor: profile.is_instructor(),
    };
    let cookie = session::issue_cookie(&state.session_secret, &session);
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to("/dashboard"),
    )
        .into_response()
}

pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, session::clear_cookie())]),
        Redirect::to("/login"),
    )
}

pub async fn dashboard(State(state): State<AppState>, session: Session) -> Html<String> {
    let groups = state.directory.groups_for(&session.user_name);
    let department = state
        .directory
        .lookup(&session.user_name)
        .and_then(|u| u.department.clone());
    pages::dashboard(
        &session.user_name,
        session.is_instructor,
        state.directory.is_admin(&session.user_name),
        &groups,
        department.as_deref(),
    )
}
