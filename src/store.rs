use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::records::{AttendanceRecord, Student};

const DB_FILE: &str = "rollcall.sqlite3";

/// Attendance row as persisted. Optional columns may be absent on records
/// written by earlier submission versions; the exporter normalizes them.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub doc_key: String,
    pub date: String,
    pub student_id: String,
    pub student_name: Option<String>,
    pub department: Option<String>,
    pub cohort: Option<String>,
    pub session: Option<String>,
    pub mode: Option<String>,
    pub marked_by: Option<String>,
    pub status: String,
    pub timestamp: String,
}

/// The shared document store: two collections, `students` keyed by student
/// ID and `attendance` keyed by the composite document key. Batch atomicity
/// is the store's transaction; the handlers do no locking of their own.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(data_dir: &Path) -> anyhow::Result<Store> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.to_string_lossy()))?;
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        init_schema(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-statement; nothing to salvage.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn roster_for_group(&self, group: i64) -> Result<Vec<Student>, rusqlite::Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, department, group_no FROM students
             WHERE group_no = ? ORDER BY id",
        )?;
        let rows = stmt.query_map([group], row_to_student)?;
        rows.collect()
    }

    pub fn roster_for_department(&self, department: &str) -> Result<Vec<Student>, rusqlite::Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, department, group_no FROM students
             WHERE department = ? ORDER BY id",
        )?;
        let rows = stmt.query_map([department], row_to_student)?;
        rows.collect()
    }

    pub fn get_student(&self, id: &str) -> Result<Option<Student>, rusqlite::Error> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, name, department, group_no FROM students WHERE id = ?",
            [id],
            row_to_student,
        )
        .optional()
    }

    /// Direct single-document write, used by admin add and the bulk import.
    pub fn upsert_student(&self, student: &Student) -> Result<(), rusqlite::Error> {
        let conn = self.lock();
        upsert_student_stmt(&conn, student)
    }

    /// Admin update of group and/or department. Returns false when no such
    /// student exists.
    pub fn update_student(
        &self,
        id: &str,
        group: Option<i64>,
        department: Option<&str>,
    ) -> Result<bool, rusqlite::Error> {
        let conn = self.lock();
        // One statement keeps the write atomic; COALESCE leaves a column
        // untouched when the caller passed None for it.
        let n = conn.execute(
            "UPDATE students
             SET group_no = COALESCE(?1, group_no),
                 department = COALESCE(?2, department)
             WHERE id = ?3",
            (group, department, id),
        )?;
        Ok(n > 0)
    }

    pub fn delete_student(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.lock();
        let n = conn.execute("DELETE FROM students WHERE id = ?", [id])?;
        Ok(n > 0)
    }

    /// Write one submission's records as a single atomic batch. Every record
    /// is stamped with the same commit-time timestamp; conflicting document
    /// keys are overwritten, which is what makes resubmission idempotent.
    pub fn write_attendance_batch(
        &self,
        records: &[AttendanceRecord],
    ) -> Result<usize, rusqlite::Error> {
        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;
        let stamp = Utc::now().to_rfc3339();
        for rec in records {
            tx.execute(
                "INSERT INTO attendance(
                    doc_key, date, student_id, student_name, department,
                    cohort, session, mode, marked_by, status, timestamp)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(doc_key) DO UPDATE SET
                   date = excluded.date,
                   student_id = excluded.student_id,
                   student_name = excluded.student_name,
                   department = excluded.department,
                   cohort = excluded.cohort,
                   session = excluded.session,
                   mode = excluded.mode,
                   marked_by = excluded.marked_by,
                   status = excluded.status,
                   timestamp = excluded.timestamp",
                (
                    &rec.doc_key,
                    &rec.date,
                    &rec.student_id,
                    &rec.student_name,
                    &rec.department,
                    &rec.cohort,
                    &rec.session,
                    rec.mode.as_str(),
                    &rec.marked_by,
                    rec.status.as_str(),
                    &stamp,
                ),
            )?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn all_attendance(&self) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT doc_key, date, student_id, student_name, department,
                    cohort, session, mode, marked_by, status, timestamp
             FROM attendance",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(StoredRecord {
                doc_key: r.get(0)?,
                date: r.get(1)?,
                student_id: r.get(2)?,
                student_name: r.get(3)?,
                department: r.get(4)?,
                cohort: r.get(5)?,
                session: r.get(6)?,
                mode: r.get(7)?,
                marked_by: r.get(8)?,
                status: r.get(9)?,
                timestamp: r.get(10)?,
            })
        })?;
        rows.collect()
    }

    /// Bulk roster import from a flat CSV file, upserted by student ID in
    /// one transaction. The header names the columns; field order does not
    /// matter and extra columns are ignored.
    pub fn import_roster_csv(&self, path: &Path) -> anyhow::Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster file {}", path.to_string_lossy()))?;
        let students = parse_roster_csv(&text)?;

        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;
        for s in &students {
            upsert_student_stmt(&tx, s)?;
        }
        tx.commit()?;
        Ok(students.len())
    }
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            group_no INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_group ON students(group_no)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_department ON students(department)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            doc_key TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            student_id TEXT NOT NULL,
            student_name TEXT,
            department TEXT,
            cohort TEXT,
            session TEXT,
            mode TEXT,
            marked_by TEXT,
            status TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;
    Ok(())
}

fn row_to_student(r: &rusqlite::Row<'_>) -> Result<Student, rusqlite::Error> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        department: r.get(2)?,
        group: r.get(3)?,
    })
}

fn upsert_student_stmt(conn: &Connection, student: &Student) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO students(id, name, department, group_no)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           department = excluded.department,
           group_no = excluded.group_no",
        (&student.id, &student.name, &student.department, student.group),
    )?;
    Ok(())
}

fn parse_roster_csv(text: &str) -> anyhow::Result<Vec<Student>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("roster file is empty"))?;
    let columns: Vec<String> = header
        .split(',')
        .map(|c| c.trim().to_ascii_lowercase())
        .collect();

    let col = |name: &str| columns.iter().position(|c| c == name);
    let id_col = col("id").ok_or_else(|| anyhow!("roster header missing ID column"))?;
    let name_col = col("name").ok_or_else(|| anyhow!("roster header missing Name column"))?;
    let dept_col = col("department")
        .ok_or_else(|| anyhow!("roster header missing Department column"))?;
    let group_col = col("assigned_group")
        .or_else(|| col("group"))
        .ok_or_else(|| anyhow!("roster header missing Assigned_Group column"))?;

    let mut out = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        let field = |idx: usize| -> anyhow::Result<&str> {
            fields
                .get(idx)
                .copied()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| anyhow!("roster line {} is missing a field", lineno + 2))
        };
        let group: i64 = field(group_col)?
            .parse()
            .with_context(|| format!("roster line {} has a non-integer group", lineno + 2))?;
        out.push(Student {
            id: field(id_col)?.to_string(),
            name: field(name_col)?.to_string(),
            department: field(dept_col)?.to_string(),
            group,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{build_records, Mode};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

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

    fn student(id: &str, group: i64, dept: &str) -> Student {
        Student {
            id: id.to_string(),
            name: format!("Student {}", id),
            department: dept.to_string(),
            group,
        }
    }

    #[test]
    fn roster_queries_filter_and_sort_by_id() {
        let store = Store::open(&temp_dir("rollcall-roster")).expect("open store");
        for s in [
            student("S3", 3, "CE"),
            student("S1", 3, "CE"),
            student("S2", 4, "ME"),
        ] {
            store.upsert_student(&s).expect("upsert");
        }

        let group3 = store.roster_for_group(3).expect("query");
        let ids: Vec<&str> = group3.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S3"]);

        let ce = store.roster_for_department("CE").expect("query");
        assert_eq!(ce.len(), 2);
        let me = store.roster_for_department("ME").expect("query");
        assert_eq!(me.len(), 1);
        assert_eq!(me[0].id, "S2");
    }

    #[test]
    fn batch_resubmission_overwrites_instead_of_duplicating() {
        let store = Store::open(&temp_dir("rollcall-batch")).expect("open store");
        let roster = vec![student("S1", 3, "CE"), student("S2", 3, "CE")];
        let present: HashSet<String> = ["S1".to_string()].into_iter().collect();

        let records = build_records(
            &roster,
            "3",
            Mode::Engagement,
            "2025-01-10",
            "Morning",
            &present,
            "imogen",
        );
        store.write_attendance_batch(&records).expect("first write");
        store.write_attendance_batch(&records).expect("second write");

        let all = store.all_attendance().expect("read back");
        assert_eq!(all.len(), 2, "resubmission must not duplicate");
        let s1 = all.iter().find(|r| r.student_id == "S1").expect("S1 row");
        assert_eq!(s1.doc_key, "2025-01-10_S1_Morning_Engagement");
        assert_eq!(s1.status, "Present");
        let s2 = all.iter().find(|r| r.student_id == "S2").expect("S2 row");
        assert_eq!(s2.status, "Absent");
    }

    #[test]
    fn update_and_delete_report_missing_students() {
        let store = Store::open(&temp_dir("rollcall-crud")).expect("open store");
        store.upsert_student(&student("S1", 1, "CE")).expect("upsert");

        assert!(store.update_student("S1", Some(2), None).expect("update"));
        assert!(store
            .update_student("S1", None, Some("ME"))
            .expect("update dept"));
        let s = store.get_student("S1").expect("get").expect("exists");
        assert_eq!(s.group, 2);
        assert_eq!(s.department, "ME");

        assert!(store
            .update_student("S1", Some(5), Some("EE"))
            .expect("update both"));
        let s = store.get_student("S1").expect("get").expect("exists");
        assert_eq!((s.group, s.department.as_str()), (5, "EE"));

        assert!(!store.update_student("NOPE", Some(1), None).expect("update"));
        assert!(store.delete_student("S1").expect("delete"));
        assert!(!store.delete_student("S1").expect("second delete"));
    }

    #[test]
    fn roster_csv_import_trims_and_upserts() {
        let dir = temp_dir("rollcall-csv");
        let csv_path = dir.join("students.csv");
        std::fs::write(
            &csv_path,
            "ID, Name, Phone, Department, Assigned_Group\n\
             S1, Asha Patel, 555, CE, 3\n\
             \n\
             S2, Dev Mehta, 556, ME, 4\n",
        )
        .expect("write csv");

        let store = Store::open(&dir).expect("open store");
        let n = store.import_roster_csv(&csv_path).expect("import");
        assert_eq!(n, 2);
        let s1 = store.get_student("S1").expect("get").expect("exists");
        assert_eq!(s1.name, "Asha Patel");
        assert_eq!(s1.group, 3);

        // Re-import with a changed group lands on the same document.
        std::fs::write(
            &csv_path,
            "ID,Name,Department,Assigned_Group\nS1,Asha Patel,CE,5\n",
        )
        .expect("rewrite csv");
        store.import_roster_csv(&csv_path).expect("reimport");
        let s1 = store.get_student("S1").expect("get").expect("exists");
        assert_eq!(s1.group, 5);
    }

    #[test]
    fn roster_csv_rejects_bad_group() {
        let dir = temp_dir("rollcall-csv-bad");
        let csv_path = dir.join("students.csv");
        std::fs::write(&csv_path, "ID,Name,Department,Assigned_Group\nS1,A,CE,three\n")
            .expect("write csv");
        let store = Store::open(&dir).expect("open store");
        assert!(store.import_roster_csv(&csv_path).is_err());
    }
}
