//! All SQL lives here: plain functions over a borrowed connection, returning
//! typed rows. Mutations that touch more than one table run inside a
//! transaction; the attendance upsert is a single `ON CONFLICT` statement so
//! concurrent marks for the same (student, class) pair can never produce two
//! rows or a lost update.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed lower bound used when a report request carries no start date.
pub const REPORT_EPOCH: &str = "1970-01-01";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("student id already exists")]
    DuplicateStudent,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database unavailable: {0}")]
    Pool(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
        }
    }

    pub fn parse(raw: &str) -> Option<Status> {
        match raw {
            "present" => Some(Status::Present),
            "absent" => Some(Status::Absent),
            _ => None,
        }
    }
}

fn status_from_db(raw: &str) -> Status {
    // The column only ever holds values written through `Status::as_str`.
    Status::parse(raw).unwrap_or(Status::Absent)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub has_face_encoding: bool,
    pub photo_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub status: Status,
    pub marked_at: String,
    pub terminal_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    pub record: AttendanceRecord,
    /// Previous status when this mark overwrote an existing record.
    pub previous: Option<Status>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub student_id: String,
    pub student_name: String,
    pub email: String,
    pub status: Status,
    pub marked_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub total: i64,
    pub present: i64,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub class_id: String,
    pub class_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub student_id: String,
    pub student_name: String,
    pub status: Status,
    pub marked_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub students: i64,
    pub classes: i64,
    pub classes_today: i64,
    pub present_today: i64,
    pub absent_today: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub message: String,
    pub created_at: String,
}

// --- students ---

pub fn create_student(
    conn: &Connection,
    student_id: &str,
    name: &str,
    email: &str,
    photo_path: Option<&str>,
    now: NaiveDateTime,
) -> Result<Student, StoreError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE student_id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(StoreError::DuplicateStudent);
    }

    let created_at = now.format(DATETIME_FMT).to_string();
    conn.execute(
        "INSERT INTO students(student_id, name, email, photo_path, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (student_id, name, email, photo_path, &created_at),
    )?;

    Ok(Student {
        student_id: student_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        has_face_encoding: false,
        photo_path: photo_path.map(|p| p.to_string()),
        created_at,
    })
}

pub fn list_students(conn: &Connection) -> Result<Vec<Student>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT student_id, name, email, face_encoding, photo_path, created_at
         FROM students
         ORDER BY name, student_id",
    )?;
    let rows = stmt
        .query_map([], map_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_student(conn: &Connection, student_id: &str) -> Result<Student, StoreError> {
    conn.query_row(
        "SELECT student_id, name, email, face_encoding, photo_path, created_at
         FROM students WHERE student_id = ?",
        [student_id],
        map_student,
    )
    .optional()?
    .ok_or(StoreError::NotFound("student"))
}

fn map_student(r: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    let encoding: Option<String> = r.get(3)?;
    Ok(Student {
        student_id: r.get(0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        has_face_encoding: encoding.map(|e| !e.trim().is_empty()).unwrap_or(false),
        photo_path: r.get(4)?,
        created_at: r.get(5)?,
    })
}

/// Deletes the student and every attendance record referencing it, in one
/// transaction. Returns the stored photo path so the caller can remove the
/// file after the rows are gone.
pub fn delete_student(conn: &Connection, student_id: &str) -> Result<Option<String>, StoreError> {
    let photo: Option<Option<String>> = conn
        .query_row(
            "SELECT photo_path FROM students WHERE student_id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(photo_path) = photo else {
        return Err(StoreError::NotFound("student"));
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance WHERE student_id = ?", [student_id])?;
    tx.execute("DELETE FROM students WHERE student_id = ?", [student_id])?;
    tx.commit()?;
    Ok(photo_path)
}

// --- classes ---

pub fn create_class(
    conn: &Connection,
    name: &str,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    now: NaiveDateTime,
) -> Result<Class, StoreError> {
    let id = Uuid::new_v4().to_string();
    let created_at = now.format(DATETIME_FMT).to_string();
    conn.execute(
        "INSERT INTO classes(id, name, date, start_time, end_time, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &id,
            name,
            date.to_string(),
            start_time.to_string(),
            end_time.to_string(),
            &created_at,
        ),
    )?;
    Ok(Class {
        id,
        name: name.to_string(),
        date,
        start_time,
        end_time,
        created_at,
    })
}

pub fn list_classes(conn: &Connection) -> Result<Vec<Class>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, date, start_time, end_time, created_at
         FROM classes
         ORDER BY date DESC, start_time, name",
    )?;
    let rows = stmt
        .query_map([], map_class)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_class(conn: &Connection, class_id: &str) -> Result<Class, StoreError> {
    conn.query_row(
        "SELECT id, name, date, start_time, end_time, created_at
         FROM classes WHERE id = ?",
        [class_id],
        map_class,
    )
    .optional()?
    .ok_or(StoreError::NotFound("class"))
}

pub fn classes_on_date(conn: &Connection, date: NaiveDate) -> Result<Vec<Class>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, date, start_time, end_time, created_at
         FROM classes
         WHERE date = ?
         ORDER BY start_time, name",
    )?;
    let rows = stmt
        .query_map([date.to_string()], map_class)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_class(r: &rusqlite::Row<'_>) -> rusqlite::Result<Class> {
    let date: String = r.get(2)?;
    let start: String = r.get(3)?;
    let end: String = r.get(4)?;
    Ok(Class {
        id: r.get(0)?,
        name: r.get(1)?,
        date: parse_date(&date, 2)?,
        start_time: parse_time(&start, 3)?,
        end_time: parse_time(&end, 4)?,
        created_at: r.get(5)?,
    })
}

fn parse_date(raw: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_time(raw: &str, idx: usize) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Deletes the class and its attendance records in one transaction.
pub fn delete_class(conn: &Connection, class_id: &str) -> Result<(), StoreError> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::NotFound("class"));
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance WHERE class_id = ?", [class_id])?;
    tx.execute("DELETE FROM classes WHERE id = ?", [class_id])?;
    tx.commit()?;
    Ok(())
}

// --- attendance ---

pub fn mark_attendance(
    conn: &Connection,
    student_id: &str,
    class_id: &str,
    status: Status,
    terminal_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<MarkOutcome, StoreError> {
    let tx = conn.unchecked_transaction()?;

    let student_name: Option<String> = tx
        .query_row(
            "SELECT name FROM students WHERE student_id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(student_name) = student_name else {
        return Err(StoreError::NotFound("student"));
    };
    let class_name: Option<String> = tx
        .query_row("SELECT name FROM classes WHERE id = ?", [class_id], |r| {
            r.get(0)
        })
        .optional()?;
    let Some(class_name) = class_name else {
        return Err(StoreError::NotFound("class"));
    };

    let previous: Option<String> = tx
        .query_row(
            "SELECT status FROM attendance WHERE student_id = ? AND class_id = ?",
            (student_id, class_id),
            |r| r.get(0),
        )
        .optional()?;
    let previous = previous.as_deref().map(status_from_db);

    let marked_at = now.format(DATETIME_FMT).to_string();
    let new_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO attendance(id, student_id, class_id, status, marked_at, terminal_id)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, class_id) DO UPDATE SET
           status = excluded.status,
           marked_at = excluded.marked_at,
           terminal_id = excluded.terminal_id",
        (
            &new_id,
            student_id,
            class_id,
            status.as_str(),
            &marked_at,
            terminal_id,
        ),
    )?;
    let id: String = tx.query_row(
        "SELECT id FROM attendance WHERE student_id = ? AND class_id = ?",
        (student_id, class_id),
        |r| r.get(0),
    )?;

    let message = match previous {
        Some(old) if old != status => format!(
            "attendance: {} ({}) {} -> {} in {}",
            student_name,
            student_id,
            old.as_str(),
            status.as_str(),
            class_name
        ),
        Some(_) => format!(
            "attendance: {} ({}) re-marked {} in {}",
            student_name,
            student_id,
            status.as_str(),
            class_name
        ),
        None => format!(
            "attendance: {} ({}) marked {} in {}",
            student_name,
            student_id,
            status.as_str(),
            class_name
        ),
    };
    append_log_tx(&tx, &message, now)?;

    tx.commit()?;

    Ok(MarkOutcome {
        record: AttendanceRecord {
            id,
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            status,
            marked_at,
            terminal_id: terminal_id.map(|t| t.to_string()),
        },
        previous,
    })
}

pub fn class_attendance(
    conn: &Connection,
    class_id: &str,
) -> Result<Vec<RosterEntry>, StoreError> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::NotFound("class"));
    }

    let mut stmt = conn.prepare(
        "SELECT a.student_id, s.name, s.email, a.status, a.marked_at
         FROM attendance a
         JOIN students s ON s.student_id = a.student_id
         WHERE a.class_id = ?
         ORDER BY s.name, a.student_id",
    )?;
    let rows = stmt
        .query_map([class_id], |r| {
            let status: String = r.get(3)?;
            Ok(RosterEntry {
                student_id: r.get(0)?,
                student_name: r.get(1)?,
                email: r.get(2)?,
                status: status_from_db(&status),
                marked_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn student_summary(
    conn: &Connection,
    student_id: &str,
) -> Result<StudentSummary, StoreError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE student_id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::NotFound("student"));
    }

    let (total, present): (i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'present' THEN 1 ELSE 0 END), 0)
         FROM attendance WHERE student_id = ?",
        [student_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    let rate = if total == 0 {
        0.0
    } else {
        ((present as f64 / total as f64) * 100.0).round() / 100.0
    };
    Ok(StudentSummary {
        total,
        present,
        rate,
    })
}

// --- reports ---

pub fn report(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    student_id: Option<&str>,
) -> Result<Vec<ReportRow>, StoreError> {
    let mut sql = String::from(
        "SELECT c.id, c.name, c.date, c.start_time, c.end_time,
                a.student_id, s.name, a.status, a.marked_at
         FROM attendance a
         JOIN classes c ON c.id = a.class_id
         JOIN students s ON s.student_id = a.student_id
         WHERE c.date >= ? AND c.date <= ?",
    );
    if student_id.is_some() {
        sql.push_str(" AND a.student_id = ?");
    }
    sql.push_str(" ORDER BY c.date DESC, c.start_time ASC, s.name ASC");

    let mut stmt = conn.prepare(&sql)?;
    let map = |r: &rusqlite::Row<'_>| -> rusqlite::Result<ReportRow> {
        let date: String = r.get(2)?;
        let start: String = r.get(3)?;
        let end: String = r.get(4)?;
        let status: String = r.get(7)?;
        Ok(ReportRow {
            class_id: r.get(0)?,
            class_name: r.get(1)?,
            date: parse_date(&date, 2)?,
            start_time: parse_time(&start, 3)?,
            end_time: parse_time(&end, 4)?,
            student_id: r.get(5)?,
            student_name: r.get(6)?,
            status: status_from_db(&status),
            marked_at: r.get(8)?,
        })
    };

    let rows = match student_id {
        Some(sid) => stmt
            .query_map((start.to_string(), end.to_string(), sid), map)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map((start.to_string(), end.to_string()), map)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

pub fn dashboard_stats(conn: &Connection, today: NaiveDate) -> Result<DashboardStats, StoreError> {
    let students: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    let classes: i64 = conn.query_row("SELECT COUNT(*) FROM classes", [], |r| r.get(0))?;
    let classes_today: i64 = conn.query_row(
        "SELECT COUNT(*) FROM classes WHERE date = ?",
        [today.to_string()],
        |r| r.get(0),
    )?;
    let (present_today, absent_today): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN a.status = 'present' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN a.status = 'absent' THEN 1 ELSE 0 END), 0)
         FROM attendance a
         JOIN classes c ON c.id = a.class_id
         WHERE c.date = ?",
        [today.to_string()],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    Ok(DashboardStats {
        students,
        classes,
        classes_today,
        present_today,
        absent_today,
    })
}

// --- activity log ---

pub fn append_log(conn: &Connection, message: &str, now: NaiveDateTime) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO activity_log(message, created_at) VALUES(?, ?)",
        (message, now.format(DATETIME_FMT).to_string()),
    )?;
    Ok(())
}

fn append_log_tx(
    tx: &rusqlite::Transaction<'_>,
    message: &str,
    now: NaiveDateTime,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO activity_log(message, created_at) VALUES(?, ?)",
        (message, now.format(DATETIME_FMT).to_string()),
    )?;
    Ok(())
}

/// Last `limit` entries, newest first, optionally filtered to entries whose
/// message contains `filter` (the dashboard greps for "camera" / "face").
pub fn recent_logs(
    conn: &Connection,
    limit: i64,
    filter: Option<&str>,
) -> Result<Vec<LogEntry>, StoreError> {
    let mut sql = String::from("SELECT id, message, created_at FROM activity_log");
    if filter.is_some() {
        sql.push_str(" WHERE message LIKE '%' || ? || '%'");
    }
    sql.push_str(" ORDER BY id DESC LIMIT ?");

    let mut stmt = conn.prepare(&sql)?;
    let map = |r: &rusqlite::Row<'_>| -> rusqlite::Result<LogEntry> {
        Ok(LogEntry {
            id: r.get(0)?,
            message: r.get(1)?,
            created_at: r.get(2)?,
        })
    };
    let rows = match filter {
        Some(f) => stmt
            .query_map((f, limit), map)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([limit], map)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}
