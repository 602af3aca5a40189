use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use attendanced::db::init_schema;
use attendanced::store::{self, Status, StoreError};

fn open_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-03-01 09:05:00", "%Y-%m-%d %H:%M:%S").expect("datetime")
}

fn seed(conn: &Connection) -> (String, String) {
    store::create_student(conn, "S1", "Amara Osei", "s1@example.org", Some("/tmp/s1.jpg"), now())
        .expect("create student");
    store::create_student(conn, "S2", "Liam Chen", "s2@example.org", None, now())
        .expect("create student");
    let c1 = store::create_class(
        conn,
        "Math 101",
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
        "09:00:00".parse().expect("time"),
        "10:30:00".parse().expect("time"),
        now(),
    )
    .expect("create class")
    .id;
    let c2 = store::create_class(
        conn,
        "Physics",
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
        "11:00:00".parse().expect("time"),
        "12:30:00".parse().expect("time"),
        now(),
    )
    .expect("create class")
    .id;

    for (sid, cid) in [("S1", &c1), ("S1", &c2), ("S2", &c1)] {
        store::mark_attendance(conn, sid, cid, Status::Present, None, now()).expect("mark");
    }
    (c1, c2)
}

fn attendance_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM attendance", [], |r| r.get(0))
        .expect("count")
}

#[test]
fn deleting_a_student_removes_its_records() {
    let conn = open_conn();
    let (c1, _c2) = seed(&conn);
    assert_eq!(attendance_count(&conn), 3);

    let photo = store::delete_student(&conn, "S1").expect("delete student");
    assert_eq!(photo.as_deref(), Some("/tmp/s1.jpg"));

    assert_eq!(attendance_count(&conn), 1);
    let roster = store::class_attendance(&conn, &c1).expect("roster");
    assert!(roster.iter().all(|r| r.student_id != "S1"));

    let err = store::get_student(&conn, "S1").expect_err("student is gone");
    assert!(matches!(err, StoreError::NotFound("student")));
}

#[test]
fn deleting_a_class_removes_its_records() {
    let conn = open_conn();
    let (c1, c2) = seed(&conn);

    store::delete_class(&conn, &c1).expect("delete class");

    assert_eq!(attendance_count(&conn), 1);
    let remaining = store::class_attendance(&conn, &c2).expect("roster");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].student_id, "S1");

    let err = store::get_class(&conn, &c1).expect_err("class is gone");
    assert!(matches!(err, StoreError::NotFound("class")));
}

#[test]
fn deleting_unknown_ids_is_not_found() {
    let conn = open_conn();
    seed(&conn);

    let err = store::delete_student(&conn, "ghost").expect_err("unknown student");
    assert!(matches!(err, StoreError::NotFound("student")));

    let err = store::delete_class(&conn, "no-such-class").expect_err("unknown class");
    assert!(matches!(err, StoreError::NotFound("class")));

    // Nothing was removed by the failed deletes.
    assert_eq!(attendance_count(&conn), 3);
}
