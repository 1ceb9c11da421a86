//! Report assembly: read every attendance record, normalize drifted rows,
//! sort by the report contract, and serialize a master sheet plus one sheet
//! per distinct date.

use std::collections::BTreeMap;

use crate::store::StoredRecord;
use crate::xlsx::Workbook;

/// Sentinel for fields older submission versions never wrote.
const MISSING: &str = "N/A";

pub const REPORT_FILE_NAME: &str = "attendance_master_report.xlsx";

const HEADER: [&str; 10] = [
    "Date",
    "Student ID",
    "Name",
    "Department",
    "Cohort",
    "Session",
    "Mode",
    "Status",
    "Marked By",
    "Timestamp",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub mode: String,
    pub cohort: String,
    pub date: String,
    pub session: String,
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub marked_by: String,
    pub status: String,
    pub timestamp: String,
}

fn normalize(rec: StoredRecord) -> ReportRow {
    let or_missing = |v: Option<String>| v.unwrap_or_else(|| MISSING.to_string());
    ReportRow {
        mode: or_missing(rec.mode),
        cohort: or_missing(rec.cohort),
        date: rec.date,
        session: or_missing(rec.session),
        student_id: rec.student_id,
        student_name: or_missing(rec.student_name),
        department: or_missing(rec.department),
        marked_by: or_missing(rec.marked_by),
        status: rec.status,
        timestamp: rec.timestamp,
    }
}

/// Numeric cohorts (group numbers) order by value, so "10" lands after "2";
/// non-numeric cohorts (departments) fall back to lexicographic order.
fn cohort_sort_key(row: &ReportRow) -> (&str, Option<i64>, &str, &str, &str, &str) {
    (
        &row.mode,
        row.cohort.parse::<i64>().ok(),
        &row.cohort,
        &row.date,
        &row.session,
        &row.student_id,
    )
}

/// Normalize and sort into the report's contractual order:
/// (mode, cohort, date, session, student ID).
pub fn report_rows(records: Vec<StoredRecord>) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = records.into_iter().map(normalize).collect();
    rows.sort_by(|a, b| cohort_sort_key(a).cmp(&cohort_sort_key(b)));
    rows
}

fn to_cells(row: &ReportRow) -> Vec<String> {
    vec![
        row.date.clone(),
        row.student_id.clone(),
        row.student_name.clone(),
        row.department.clone(),
        row.cohort.clone(),
        row.session.clone(),
        row.mode.clone(),
        row.status.clone(),
        row.marked_by.clone(),
        row.timestamp.clone(),
    ]
}

fn sheet_rows(rows: &[&ReportRow]) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(HEADER.iter().map(|h| h.to_string()).collect());
    out.extend(rows.iter().map(|r| to_cells(r)));
    out
}

/// Build the downloadable workbook: a master sheet with every record, then
/// one sheet per distinct date. The caller is responsible for rejecting an
/// empty collection beforehand.
pub fn build_workbook(records: Vec<StoredRecord>) -> anyhow::Result<Vec<u8>> {
    let rows = report_rows(records);

    let mut by_date: BTreeMap<String, Vec<&ReportRow>> = BTreeMap::new();
    for row in &rows {
        by_date.entry(row.date.clone()).or_default().push(row);
    }

    let mut workbook = Workbook::new();
    let all: Vec<&ReportRow> = rows.iter().collect();
    workbook.add_sheet("Master", sheet_rows(&all));
    for (date, date_rows) in &by_date {
        workbook.add_sheet(format!("Date_{}", date.replace('-', "_")), sheet_rows(date_rows));
    }
    workbook.finish()
}
