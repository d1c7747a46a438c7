//! Log records emitted while establishing connections.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Once;

use log::{Level, Metadata, Record};
use sqlsheet::driver::{Driver, OptionMap};
use url::Url;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Collects records of the calling thread so parallel tests stay apart.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("sqlsheet")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            RECORDS.with(|records| {
                records
                    .borrow_mut()
                    .push((record.level(), record.args().to_string()))
            });
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Run `f` and return the warnings it logged on this thread.
fn warnings_during<F: FnOnce()>(f: F) -> Vec<String> {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
    f();
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    })
}

fn stream_write(path: &Path) {
    let url = format!("jdbc:xls:{}?writeStreaming", Url::from_file_path(path).unwrap());
    let conn = Driver::new().connect(&url, &OptionMap::new()).unwrap().unwrap();
    assert!(conn.is_streaming());
}

fn xlsx_with_sheet() -> Vec<u8> {
    let mut workbook = sqlsheet::Workbook::new(sqlsheet::WorkbookFormat::Xlsx);
    workbook.add_worksheet("Data").unwrap();
    let mut out = std::io::Cursor::new(Vec::new());
    workbook.write_to(&mut out).unwrap();
    out.into_inner()
}

#[test]
fn stream_write_on_existing_file_warns_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("existing.xlsx");
    fs::write(&path, xlsx_with_sheet()).unwrap();

    let warnings = warnings_during(|| stream_write(&path));
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("existing.xlsx"));
    assert!(warnings[0].contains("memory"));
}

#[test]
fn stream_write_on_absent_file_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.xlsx");

    let warnings = warnings_during(|| stream_write(&path));
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn stream_write_on_empty_file_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.xlsx");
    fs::write(&path, b"").unwrap();

    let warnings = warnings_during(|| stream_write(&path));
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn in_memory_open_never_warns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.xlsx");
    fs::write(&path, xlsx_with_sheet()).unwrap();

    let url = format!("jdbc:xls:{}", Url::from_file_path(&path).unwrap());
    let warnings = warnings_during(|| {
        Driver::new().connect(&url, &OptionMap::new()).unwrap().unwrap();
    });
    assert!(warnings.is_empty(), "{warnings:?}");
}
