use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use tracing::info;

use crate::export::{self, REPORT_FILE_NAME};
use crate::http::error::AppError;
use crate::http::session::Session;
use crate::http::AppState;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Instructor-only download of the aggregate report: one master sheet plus
/// one sheet per distinct date.
pub async fn export_attendance(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    if !session.is_instructor {
        return Err(AppError::Forbidden);
    }
    let records = state.store.all_attendance()?;
    if records.is_empty() {
        return Err(AppError::NotFound("no attendance records".to_string()));
    }

    let count = records.len();
    let bytes = export::build_workbook(records)?;
    info!("export: {} records, {} bytes", count, bytes.len());

    // Plain header pairs override the body's default content type; appending
    // would leave a second Content-Type header behind it.
    Ok((
        [
            (CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILE_NAME),
            ),
        ],
        bytes,
    ))
}
