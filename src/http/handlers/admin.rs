//! Roster mutations, restricted to the configured allow-list. Each
//! operation is a direct single-document write; the only validation is
//! type coercion (the group must parse as an integer).

use axum::extract::{Form, Path, State};
use axum::response::Html;
use tracing::info;

use crate::http::error::AppError;
use crate::http::pages;
use crate::http::session::Session;
use crate::http::AppState;
use crate::records::Student;

fn require_admin(state: &AppState, session: &Session) -> Result<(), AppError> {
    if state.directory.is_admin(&session.user_name) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn field<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(fields: &'a [(String, String)], key: &str) -> Result<&'a str, AppError> {
    field(fields, key).ok_or_else(|| AppError::Validation(format!("missing {}", key)))
}

fn parse_group(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("group must be an integer, got {:?}", raw)))
}

pub async fn add_student(
    State(state): State<AppState>,
    session: Session,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    require_admin(&state, &session)?;

    let student = Student {
        id: required(&fields, "id")?.to_uppercase(),
        name: required(&fields, "name")?.to_uppercase(),
        department: required(&fields, "department")?.to_uppercase(),
        group: parse_group(required(&fields, "group")?)?,
    };
    state.store.upsert_student(&student)?;
    info!("admin add: {} by {}", student.id, session.user_name);
    Ok(pages::status(true, &format!("Student {} saved", student.id)))
}

pub async fn update_student(
    State(state): State<AppState>,
    session: Session,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    require_admin(&state, &session)?;

    let id = required(&fields, "id")?;
    let group = field(&fields, "group").map(parse_group).transpose()?;
    let department = field(&fields, "department").map(str::to_uppercase);
    if group.is_none() && department.is_none() {
        return Err(AppError::Validation(
            "nothing to update: supply group and/or department".to_string(),
        ));
    }

    if !state.store.update_student(id, group, department.as_deref())? {
        return Err(AppError::NotFound(format!("student {} not found", id)));
    }
    info!("admin update: {} by {}", id, session.user_name);
    Ok(pages::status(true, &format!("Student {} updated", id)))
}

pub async fn delete_student(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    require_admin(&state, &session)?;

    if !state.store.delete_student(&id)? {
        return Err(AppError::NotFound(format!("student {} not found", id)));
    }
    info!("admin delete: {} by {}", id, session.user_name);
    Ok(pages::status(true, &format!("Student {} deleted", id)))
}
