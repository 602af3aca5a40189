use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use attendanced::db::init_schema;
use attendanced::store::{self, Status};

fn open_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-03-05 12:00:00", "%Y-%m-%d %H:%M:%S").expect("datetime")
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
}

fn seed_class(conn: &Connection, name: &str, day: &str, start: &str, end: &str) -> String {
    store::create_class(
        conn,
        name,
        date(day),
        start.parse().expect("start"),
        end.parse().expect("end"),
        now(),
    )
    .expect("create class")
    .id
}

fn seed(conn: &Connection) -> (String, String, String) {
    store::create_student(conn, "S1", "Zola Mbeki", "s1@example.org", None, now())
        .expect("student");
    store::create_student(conn, "S2", "Amara Osei", "s2@example.org", None, now())
        .expect("student");

    let mon = seed_class(conn, "Math", "2024-03-04", "09:00:00", "10:00:00");
    let mon_late = seed_class(conn, "Physics", "2024-03-04", "11:00:00", "12:00:00");
    let tue = seed_class(conn, "Chemistry", "2024-03-05", "09:00:00", "10:00:00");

    for cid in [&mon, &mon_late, &tue] {
        store::mark_attendance(conn, "S1", cid, Status::Present, None, now()).expect("mark");
        store::mark_attendance(conn, "S2", cid, Status::Absent, None, now()).expect("mark");
    }
    (mon, mon_late, tue)
}

#[test]
fn rows_are_ordered_by_date_desc_then_start_then_name() {
    let conn = open_conn();
    seed(&conn);

    let rows =
        store::report(&conn, date("2024-03-01"), date("2024-03-31"), None).expect("report");
    assert_eq!(rows.len(), 6);

    let keys: Vec<(String, String, String)> = rows
        .iter()
        .map(|r| {
            (
                r.date.to_string(),
                r.start_time.to_string(),
                r.student_name.clone(),
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("2024-03-05".into(), "09:00:00".into(), "Amara Osei".into()),
            ("2024-03-05".into(), "09:00:00".into(), "Zola Mbeki".into()),
            ("2024-03-04".into(), "09:00:00".into(), "Amara Osei".into()),
            ("2024-03-04".into(), "09:00:00".into(), "Zola Mbeki".into()),
            ("2024-03-04".into(), "11:00:00".into(), "Amara Osei".into()),
            ("2024-03-04".into(), "11:00:00".into(), "Zola Mbeki".into()),
        ]
    );
}

#[test]
fn range_is_inclusive_on_both_ends() {
    let conn = open_conn();
    seed(&conn);

    let rows =
        store::report(&conn, date("2024-03-04"), date("2024-03-04"), None).expect("report");
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.date == date("2024-03-04")));

    let rows =
        store::report(&conn, date("2024-03-05"), date("2024-03-05"), None).expect("report");
    assert_eq!(rows.len(), 2);

    let rows =
        store::report(&conn, date("2024-03-06"), date("2024-03-07"), None).expect("report");
    assert!(rows.is_empty());
}

#[test]
fn student_filter_narrows_rows() {
    let conn = open_conn();
    seed(&conn);

    let rows = store::report(&conn, date("2024-03-01"), date("2024-03-31"), Some("S2"))
        .expect("report");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.student_id == "S2"));
    assert!(rows.iter().all(|r| r.status == Status::Absent));
}

#[test]
fn dashboard_stats_count_todays_marks() {
    let conn = open_conn();
    seed(&conn);

    let stats = store::dashboard_stats(&conn, date("2024-03-04")).expect("stats");
    assert_eq!(stats.students, 2);
    assert_eq!(stats.classes, 3);
    assert_eq!(stats.classes_today, 2);
    assert_eq!(stats.present_today, 2);
    assert_eq!(stats.absent_today, 2);
}
