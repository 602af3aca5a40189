use chrono::{NaiveDate, NaiveDateTime};

use attendanced::schedule::{current_class, upcoming_class, DEFAULT_LOOKAHEAD_MINUTES};
use attendanced::store::Class;

fn class(name: &str, date: &str, start: &str, end: &str) -> Class {
    Class {
        id: format!("class-{name}"),
        name: name.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
        start_time: start.parse().expect("start"),
        end_time: end.parse().expect("end"),
        created_at: "2024-01-01 00:00:00".to_string(),
    }
}

fn at(date: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")
        .expect("datetime")
}

#[test]
fn class_in_session_is_current() {
    let classes = vec![class("math", "2024-03-01", "09:00:00", "10:30:00")];

    let hit = current_class(&classes, at("2024-03-01", "09:15:00")).expect("active class");
    assert_eq!(hit.name, "math");

    assert!(current_class(&classes, at("2024-03-01", "10:31:00")).is_none());
    assert!(current_class(&classes, at("2024-03-02", "09:15:00")).is_none());
}

#[test]
fn window_bounds_are_inclusive() {
    let classes = vec![class("math", "2024-03-01", "09:00:00", "10:30:00")];

    assert!(current_class(&classes, at("2024-03-01", "09:00:00")).is_some());
    assert!(current_class(&classes, at("2024-03-01", "10:30:00")).is_some());
    assert!(current_class(&classes, at("2024-03-01", "08:59:59")).is_none());
}

#[test]
fn overlapping_windows_resolve_to_earliest_start() {
    let classes = vec![
        class("late", "2024-03-01", "09:30:00", "11:00:00"),
        class("early", "2024-03-01", "09:00:00", "10:30:00"),
    ];

    let hit = current_class(&classes, at("2024-03-01", "09:45:00")).expect("active class");
    assert_eq!(hit.name, "early");
}

#[test]
fn upcoming_is_strictly_after_now_within_lookahead() {
    let classes = vec![class("math", "2024-03-01", "10:00:00", "11:00:00")];

    let hit = upcoming_class(&classes, at("2024-03-01", "09:15:00"), DEFAULT_LOOKAHEAD_MINUTES)
        .expect("upcoming class");
    assert_eq!(hit.name, "math");

    // Exactly at the start the class is current, not upcoming.
    assert!(upcoming_class(
        &classes,
        at("2024-03-01", "10:00:00"),
        DEFAULT_LOOKAHEAD_MINUTES
    )
    .is_none());

    // Outside the lookahead window.
    assert!(upcoming_class(
        &classes,
        at("2024-03-01", "08:59:00"),
        DEFAULT_LOOKAHEAD_MINUTES
    )
    .is_none());
}

#[test]
fn upcoming_picks_the_earliest_candidate() {
    let classes = vec![
        class("second", "2024-03-01", "10:30:00", "11:30:00"),
        class("first", "2024-03-01", "10:00:00", "11:00:00"),
    ];

    let hit = upcoming_class(&classes, at("2024-03-01", "09:45:00"), DEFAULT_LOOKAHEAD_MINUTES)
        .expect("upcoming class");
    assert_eq!(hit.name, "first");
}

#[test]
fn lookahead_crossing_midnight_still_sees_late_classes() {
    let classes = vec![class("evening", "2024-03-01", "23:45:00", "23:59:00")];

    let hit = upcoming_class(&classes, at("2024-03-01", "23:30:00"), DEFAULT_LOOKAHEAD_MINUTES)
        .expect("upcoming class");
    assert_eq!(hit.name, "evening");

    // Tomorrow's classes are out of scope even when the horizon wraps.
    let tomorrow = vec![class("morning", "2024-03-02", "00:15:00", "01:00:00")];
    assert!(upcoming_class(
        &tomorrow,
        at("2024-03-01", "23:30:00"),
        DEFAULT_LOOKAHEAD_MINUTES
    )
    .is_none());
}

#[test]
fn no_classes_means_no_resolution() {
    assert!(current_class(&[], at("2024-03-01", "09:15:00")).is_none());
    assert!(upcoming_class(&[], at("2024-03-01", "09:15:00"), DEFAULT_LOOKAHEAD_MINUTES).is_none());
}
