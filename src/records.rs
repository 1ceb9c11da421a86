use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification of an attendance session. Group-based marking is
/// Engagement, department-based marking is Academic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    Academic,
    Engagement,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Academic => "Academic",
            Mode::Engagement => "Engagement",
        }
    }

    pub fn parse(s: &str) -> Option<Mode> {
        match s {
            "Academic" => Some(Mode::Academic),
            "Engagement" => Some(Mode::Engagement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "Present",
            Status::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub department: String,
    pub group: i64,
}

/// One attendance entry as derived from a submission, before the store
/// stamps its commit timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub doc_key: String,
    pub date: String,
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub cohort: String,
    pub session: String,
    pub mode: Mode,
    pub marked_by: String,
    pub status: Status,
}

/// The composite document key. This is the sole deduplication mechanism:
/// the same (date, student, session, mode) always lands on the same key,
/// so re-marking a session overwrites instead of duplicating.
pub fn document_key(date: &str, student_id: &str, session: &str, mode: Mode) -> String {
    format!("{}_{}_{}_{}", date, student_id, session, mode.as_str())
}

/// Derive one record per roster student for a single submission. Students
/// whose ID appears in `present_ids` are Present, everyone else Absent.
pub fn build_records(
    roster: &[Student],
    cohort: &str,
    mode: Mode,
    date: &str,
    session: &str,
    present_ids: &HashSet<String>,
    marked_by: &str,
) -> Vec<AttendanceRecord> {
    roster
        .iter()
        .map(|student| {
            let status = if present_ids.contains(&student.id) {
                Status::Present
            } else {
                Status::Absent
            };
            AttendanceRecord {
                doc_key: document_key(date, &student.id, session, mode),
                date: date.to_string(),
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                department: student.department.clone(),
                cohort: cohort.to_string(),
                session: session.to_string(),
                mode,
                marked_by: marked_by.to_string(),
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, group: i64) -> Student {
        Student {
            id: id.to_string(),
            name: format!("Student {}", id),
            department: "CE".to_string(),
            group,
        }
    }

    #[test]
    fn document_key_is_date_id_session_mode() {
        assert_eq!(
            document_key("2025-01-10", "S42", "Morning", Mode::Engagement),
            "2025-01-10_S42_Morning_Engagement"
        );
        assert_eq!(
            document_key("2025-01-10", "S42", "Morning", Mode::Academic),
            "2025-01-10_S42_Morning_Academic"
        );
    }

    #[test]
    fn present_set_membership_decides_status() {
        let roster = vec![student("S1", 3), student("S2", 3)];
        let present: HashSet<String> = ["S1".to_string()].into_iter().collect();
        let records = build_records(
            &roster,
            "3",
            Mode::Engagement,
            "2025-01-10",
            "Morning",
            &present,
            "Ms. Khushali",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Present);
        assert_eq!(records[1].status, Status::Absent);
        assert_eq!(records[0].doc_key, "2025-01-10_S1_Morning_Engagement");
        assert_eq!(records[1].doc_key, "2025-01-10_S2_Morning_Engagement");
        assert_eq!(records[0].cohort, "3");
        assert_eq!(records[0].marked_by, "Ms. Khushali");
    }

    #[test]
    fn same_parameters_derive_same_keys() {
        let roster = vec![student("S7", 5)];
        let present = HashSet::new();
        let a = build_records(&roster, "5", Mode::Engagement, "2025-02-01", "Evening", &present, "u");
        let b = build_records(&roster, "5", Mode::Engagement, "2025-02-01", "Evening", &present, "u");
        assert_eq!(a[0].doc_key, b[0].doc_key);
    }
}
