use std::collections::HashSet;

use axum::extract::{Form, Path, State};
use axum::response::Html;
use tracing::{info, warn};

use crate::http::error::AppError;
use crate::http::pages;
use crate::http::session::Session;
use crate::http::AppState;
use crate::records::{self, Mode, Student};

fn required_field(fields: &[(String, String)], key: &str) -> Result<String, AppError> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("missing {}", key)))
}

fn present_ids(fields: &[(String, String)]) -> HashSet<String> {
    fields
        .iter()
        .filter(|(k, _)| k == "status")
        .map(|(_, v)| v.trim().to_string())
        .collect()
}

fn roster_or_not_found(roster: Vec<Student>, cohort_label: &str) -> Result<Vec<Student>, AppError> {
    if roster.is_empty() {
        return Err(AppError::NotFound(format!(
            "no students found for {}",
            cohort_label
        )));
    }
    Ok(roster)
}

/// Shared marking path for both cohort kinds. Derives one record per roster
/// student and writes them as a single atomic batch; a failed commit is
/// rendered as a failure status page carrying the message, never a raw
/// transport fault.
fn submit(
    state: &AppState,
    session: &Session,
    roster: &[Student],
    cohort: &str,
    mode: Mode,
    fields: &[(String, String)],
) -> Result<Html<String>, AppError> {
    let date = required_field(fields, "attendance_date")?;
    let session_label = required_field(fields, "session")?;
    let present = present_ids(fields);

    let records = records::build_records(
        roster,
        cohort,
        mode,
        &date,
        &session_label,
        &present,
        &session.user_name,
    );
    match state.store.write_attendance_batch(&records) {
        Ok(n) => {
            info!(
                "attendance saved: cohort={} mode={} date={} session={} records={}",
                cohort,
                mode.as_str(),
                date,
                session_label,
                n
            );
            Ok(pages::status(
                true,
                &format!("Saved {} records for {} on {}", n, cohort, date),
            ))
        }
        Err(e) => {
            warn!("attendance batch failed: {}", e);
            Ok(pages::status(false, &e.to_string()))
        }
    }
}

pub async fn mark_group_page(
    State(state): State<AppState>,
    session: Session,
    Path(group): Path<i64>,
) -> Result<Html<String>, AppError> {
    if !state.directory.may_mark_group(&session.user_name, group) {
        return Err(AppError::Forbidden);
    }
    let roster = roster_or_not_found(
        state.store.roster_for_group(group)?,
        &format!("group {}", group),
    )?;
    Ok(pages::mark_form(
        &format!("Group {}", group),
        &format!("/mark_attendance/{}", group),
        &roster,
    ))
}

pub async fn mark_group_submit(
    State(state): State<AppState>,
    session: Session,
    Path(group): Path<i64>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    if !state.directory.may_mark_group(&session.user_name, group) {
        return Err(AppError::Forbidden);
    }
    let roster = roster_or_not_found(
        state.store.roster_for_group(group)?,
        &format!("group {}", group),
    )?;
    submit(
        &state,
        &session,
        &roster,
        &group.to_string(),
        Mode::Engagement,
        &fields,
    )
}

pub async fn mark_department_page(
    State(state): State<AppState>,
    session: Session,
    Path(department): Path<String>,
) -> Result<Html<String>, AppError> {
    if !state
        .directory
        .may_mark_department(&session.user_name, &department)
    {
        return Err(AppError::Forbidden);
    }
    let roster = roster_or_not_found(
        state.store.roster_for_department(&department)?,
        &format!("department {}", department),
    )?;
    Ok(pages::mark_form(
        &format!("Department {}", department),
        &format!("/mark_dept_attendance/{}", department),
        &roster,
    ))
}

pub async fn mark_department_submit(
    State(state): State<AppState>,
    session: Session,
    Path(department): Path<String>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    if !state
        .directory
        .may_mark_department(&session.user_name, &department)
    {
        return Err(AppError::Forbidden);
    }
    let roster = roster_or_not_found(
        state.store.roster_for_department(&department)?,
        &format!("department {}", department),
    )?;
    submit(&state, &session, &roster, &department, Mode::Academic, &fields)
}
