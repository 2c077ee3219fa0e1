use std::cell::RefCell;

use pdfqa_core::error::AppError;
use pdfqa_core::logs::{
    feedback_label, FeedbackLogger, LogName, LogOutcome, LogSink, SqliteLogSink, UsageLogger,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct RecordingSink {
    rows: RefCell<Vec<(LogName, Vec<String>)>>,
}

impl LogSink for RecordingSink {
    fn append_row(&self, log: LogName, row: &[String]) -> Result<(), AppError> {
        self.rows.borrow_mut().push((log, row.to_vec()));
        Ok(())
    }
}

struct FailingSink;

impl LogSink for FailingSink {
    fn append_row(&self, _log: LogName, _row: &[String]) -> Result<(), AppError> {
        Err(AppError::new("LOGGING_FAILED", "sheet unavailable"))
    }
}

fn fixed_clock() -> Result<String, AppError> {
    Ok("2026-02-10 09:30:00".to_string())
}

#[test]
fn usage_row_has_fixed_column_order() {
    let sink = RecordingSink::default();
    let logger = UsageLogger::new(&sink).with_clock(fixed_clock);
    logger.log("What is X?", 321, "X is Y.").unwrap();

    let rows = sink.rows.borrow();
    assert_eq!(
        *rows,
        vec![(
            LogName::Usage,
            vec![
                "2026-02-10 09:30:00".to_string(),
                "What is X?".to_string(),
                "X is Y.".to_string(),
                "321".to_string(),
            ]
        )]
    );
}

#[test]
fn feedback_labels_are_exact() {
    assert_eq!(feedback_label(0), "Negative");
    assert_eq!(feedback_label(1), "Positive");
    assert_eq!(feedback_label(2), "Not Provided");
    assert_eq!(feedback_label(-1), "Not Provided");
}

#[test]
fn feedback_row_maps_score_to_label() {
    let sink = RecordingSink::default();
    let logger = FeedbackLogger::new(&sink).with_clock(fixed_clock);

    assert_eq!(logger.log(Some(0), Some("q"), "a").unwrap(), LogOutcome::Appended);
    assert_eq!(logger.log(Some(1), Some("q"), "a").unwrap(), LogOutcome::Appended);
    assert_eq!(logger.log(Some(5), Some("q"), "a").unwrap(), LogOutcome::Appended);

    let labels: Vec<String> = sink.rows.borrow().iter().map(|(_, r)| r[3].clone()).collect();
    assert_eq!(labels, vec!["Negative", "Positive", "Not Provided"]);
    assert!(sink.rows.borrow().iter().all(|(log, _)| *log == LogName::Feedback));
}

#[test]
fn feedback_is_a_noop_without_feedback_or_query() {
    let sink = RecordingSink::default();
    let logger = FeedbackLogger::new(&sink).with_clock(fixed_clock);

    assert_eq!(logger.log(None, Some("q"), "a").unwrap(), LogOutcome::Skipped);
    assert_eq!(logger.log(Some(1), None, "a").unwrap(), LogOutcome::Skipped);
    assert_eq!(logger.log(Some(1), Some("   "), "a").unwrap(), LogOutcome::Skipped);
    assert!(sink.rows.borrow().is_empty());
}

#[test]
fn sink_failures_surface_as_errors() {
    let logger = UsageLogger::new(&FailingSink).with_clock(fixed_clock);
    let err = logger.log("q", 0, "a").unwrap_err();
    assert_eq!(err.code, "LOGGING_FAILED");
}

#[test]
fn sqlite_sink_keeps_logs_apart_and_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let sink = SqliteLogSink::open(&dir.path().join("logs.sqlite")).unwrap();

    UsageLogger::new(&sink).with_clock(fixed_clock).log("first", 10, "a1").unwrap();
    UsageLogger::new(&sink).with_clock(fixed_clock).log("second", 20, "a2").unwrap();
    FeedbackLogger::new(&sink)
        .with_clock(fixed_clock)
        .log(Some(1), Some("first"), "a1")
        .unwrap();

    let usage = sink.rows(LogName::Usage).unwrap();
    assert_eq!(usage.len(), 2);
    assert_eq!(usage[0].cells[1], "first");
    assert_eq!(usage[1].cells[1], "second");
    assert_eq!(usage[1].cells[3], "20");
    assert_eq!(usage[0].row_hash.len(), 64);

    let feedback = sink.rows(LogName::Feedback).unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].cells[3], "Positive");
}

#[test]
fn sqlite_sink_rejects_malformed_rows() {
    let sink = SqliteLogSink::open_in_memory().unwrap();
    let err = sink
        .append_row(LogName::Usage, &["only".to_string(), "two".to_string()])
        .unwrap_err();
    assert_eq!(err.code, "LOGGING_FAILED");
    assert!(sink.rows(LogName::Usage).unwrap().is_empty());
}
