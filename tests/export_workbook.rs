use std::io::{Cursor, Read};

use zip::ZipArchive;

use attendanced::xlsx::write_workbook;

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("workbook missing entry {name}"))
        .read_to_string(&mut text)
        .expect("read entry");
    text
}

#[test]
fn workbook_contains_expected_parts() {
    let rows = vec![vec![
        "2024-03-01".to_string(),
        "Math 101".to_string(),
        "present".to_string(),
    ]];
    let bytes =
        write_workbook("Attendance", &["Date", "Class", "Status"], &rows).expect("workbook");

    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open workbook as zip");
    for name in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/worksheets/sheet1.xml",
    ] {
        assert!(archive.by_name(name).is_ok(), "missing entry {name}");
    }

    let workbook = read_entry(&mut archive, "xl/workbook.xml");
    assert!(workbook.contains("name=\"Attendance\""));

    let sheet = read_entry(&mut archive, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<t>Date</t>"));
    assert!(sheet.contains("<t>Math 101</t>"));
    assert!(sheet.contains("<t>present</t>"));
    // Header row plus one data row.
    assert_eq!(sheet.matches("<row>").count(), 2);
}

#[test]
fn cell_text_is_xml_escaped() {
    let rows = vec![vec!["Maths <advanced> & \"fun\"".to_string()]];
    let bytes = write_workbook("Attendance", &["Class"], &rows).expect("workbook");

    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open workbook as zip");
    let sheet = read_entry(&mut archive, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("Maths &lt;advanced&gt; &amp; &quot;fun&quot;"));
    assert!(!sheet.contains("<advanced>"));
}

#[test]
fn empty_report_still_produces_a_valid_workbook() {
    let bytes = write_workbook("Attendance", &["Date", "Class"], &[]).expect("workbook");

    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open workbook as zip");
    let sheet = read_entry(&mut archive, "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row>").count(), 1);
}
