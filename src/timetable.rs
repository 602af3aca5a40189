//! Bulk timetable import. The upload is a CSV with a
//! `name,date,start_time,end_time` row per class; a header row is detected
//! and skipped. Bad lines are collected as per-line errors instead of
//! aborting the whole import.

use chrono::{NaiveDate, NaiveTime};

pub struct ParsedTimetable {
    pub rows: Vec<TimetableRow>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TimetableRow {
    pub name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

pub fn parse_timetable(text: &str) -> ParsedTimetable {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let t = raw.trim().trim_start_matches('\u{feff}');
        if t.is_empty() {
            continue;
        }
        if idx == 0 && looks_like_header(t) {
            continue;
        }

        let fields: Vec<&str> = t.split(',').map(|f| f.trim().trim_matches('"')).collect();
        if fields.len() != 4 {
            errors.push(format!(
                "line {}: expected 4 fields (name,date,start_time,end_time), got {}",
                line_no,
                fields.len()
            ));
            continue;
        }

        let name = fields[0];
        if name.is_empty() {
            errors.push(format!("line {}: empty class name", line_no));
            continue;
        }
        let Some(date) = parse_date(fields[1]) else {
            errors.push(format!("line {}: bad date {:?}", line_no, fields[1]));
            continue;
        };
        let Some(start_time) = parse_time(fields[2]) else {
            errors.push(format!("line {}: bad start time {:?}", line_no, fields[2]));
            continue;
        };
        let Some(end_time) = parse_time(fields[3]) else {
            errors.push(format!("line {}: bad end time {:?}", line_no, fields[3]));
            continue;
        };
        if start_time >= end_time {
            errors.push(format!(
                "line {}: start time {} is not before end time {}",
                line_no, fields[2], fields[3]
            ));
            continue;
        }

        rows.push(TimetableRow {
            name: name.to_string(),
            date,
            start_time,
            end_time,
        });
    }

    ParsedTimetable { rows, errors }
}

fn looks_like_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains("name") && (lower.contains("date") || lower.contains("start"))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}
