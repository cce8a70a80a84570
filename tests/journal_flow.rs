use approx::assert_relative_eq;
use chrono::NaiveDate;
use std::fs;

use sleep_journal::entry::{parse_date, parse_time};
use sleep_journal::report;
use sleep_journal::stats::{self, Correlation, DateRange, Direction, PerformanceMetric, SearchCriteria, SleepMetric};
use sleep_journal::storage::{PERFORMANCE_FILE, SLEEP_FILE};
use sleep_journal::{FileStore, Journal, PerformanceEntry, Rating, Recorded, SleepEntry, Theme};

fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn rating(v: u8) -> Rating {
    Rating::new(v).unwrap()
}

fn night(d: &str, quality: u8, dream: &str, emotions: &[&str]) -> SleepEntry {
    SleepEntry::new(date(d), parse_time("23:00").unwrap(), parse_time("07:00").unwrap(), rating(quality))
        .with_dream(dream, emotions.iter().map(|e| e.to_string()).collect())
}

fn day(d: &str, productivity: u8) -> PerformanceEntry {
    PerformanceEntry::new(date(d), rating(6), rating(6), rating(productivity), rating(4))
}

fn open(dir: &std::path::Path) -> Journal<FileStore> {
    Journal::open(FileStore::open(dir).unwrap())
}

#[test]
fn quality_and_productivity_move_together() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = open(dir.path());
    journal.record_sleep(night("2024-01-01", 8, "", &[])).unwrap();
    journal.record_performance(day("2024-01-01", 9)).unwrap();
    journal.record_sleep(night("2024-01-02", 3, "", &[])).unwrap();
    journal.record_performance(day("2024-01-02", 4)).unwrap();

    // Reopen to make sure the result comes from what was persisted.
    let journal = open(dir.path());
    let result = stats::correlate(
        journal.sleep_entries().unwrap(),
        journal.performance_entries().unwrap(),
        SleepMetric::Quality,
        PerformanceMetric::Productivity,
    );
    assert_eq!(result.correlation.direction(), Some(Direction::Positive));
    match result.correlation {
        Correlation::Indicator { strength, sample_size, .. } => {
            assert_relative_eq!(strength, 1.0, epsilon = 1e-9);
            assert_eq!(sample_size, 2);
        }
        other => panic!("expected an indicator, got {:?}", other),
    }

    let overall = stats::summarize(
        &journal
            .performance_entries()
            .unwrap()
            .iter()
            .map(|p| p.overall_score())
            .collect::<Vec<_>>(),
    );
    // (9 + 6 + 6 + 7) / 4 = 7.0 and (4 + 6 + 6 + 7) / 4 = 5.75 -> 5.8
    assert_relative_eq!(overall.mean, 6.4, epsilon = 1e-9);
}

#[test]
fn recorded_dream_is_analyzed_and_searchable() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = open(dir.path());
    journal
        .record_sleep(night(
            "2024-01-01",
            7,
            "I was flying over my old school, then falling suddenly",
            &["anxious", "Excited"],
        ))
        .unwrap();
    journal
        .record_sleep(night("2024-01-02", 5, "a dog chased me into the sea", &["scared"]))
        .unwrap();
    journal.record_sleep(night("2024-01-03", 9, "", &[])).unwrap();

    let journal = open(dir.path());
    let first = journal.sleep_on(date("2024-01-01")).unwrap().unwrap();
    let found: Vec<Theme> = first.themes().iter().map(|m| m.theme).collect();
    assert!(found.contains(&Theme::Flying));
    assert!(found.contains(&Theme::Falling));
    assert!(found.contains(&Theme::SchoolExam));
    assert!(!found.contains(&Theme::Water));
    assert_eq!(first.dream_emotions(), ["anxious", "excited"]);

    let by_theme = SearchCriteria {
        theme: Some(Theme::Water),
        ..Default::default()
    };
    let hits = stats::search(journal.sleep_entries().unwrap(), &by_theme);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].date(), date("2024-01-02"));

    let by_emotion = SearchCriteria {
        emotion: Some("EXCITED".to_string()),
        ..Default::default()
    };
    assert_eq!(stats::search(journal.sleep_entries().unwrap(), &by_emotion).len(), 1);

    let in_range = SearchCriteria {
        min_quality: Some(6),
        range: DateRange::new(Some(date("2024-01-02")), None),
        ..Default::default()
    };
    let hits = stats::search(journal.sleep_entries().unwrap(), &in_range);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].date(), date("2024-01-03"));
}

#[test]
fn backup_twice_leaves_data_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = open(dir.path());
    journal.record_sleep(night("2024-01-01", 8, "flying", &[])).unwrap();
    journal.record_performance(day("2024-01-01", 7)).unwrap();

    let sleep_before = fs::read_to_string(dir.path().join(SLEEP_FILE)).unwrap();
    let perf_before = fs::read_to_string(dir.path().join(PERFORMANCE_FILE)).unwrap();

    let first = journal.backup().unwrap();
    let second = journal.backup().unwrap();
    assert_ne!(first.path, second.path);
    for backup in [&first, &second] {
        assert_eq!(fs::read_to_string(backup.path.join(SLEEP_FILE)).unwrap(), sleep_before);
        assert_eq!(fs::read_to_string(backup.path.join(PERFORMANCE_FILE)).unwrap(), perf_before);
    }

    assert_eq!(fs::read_to_string(dir.path().join(SLEEP_FILE)).unwrap(), sleep_before);
    let reopened = open(dir.path());
    assert_eq!(reopened.sleep_entries().unwrap(), journal.sleep_entries().unwrap());
    assert_eq!(reopened.performance_entries().unwrap(), journal.performance_entries().unwrap());
}

#[test]
fn same_date_reentry_keeps_latest() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = open(dir.path());
    assert_eq!(journal.record_performance(day("2024-01-05", 3)).unwrap(), Recorded::New);
    assert_eq!(journal.record_performance(day("2024-01-05", 8)).unwrap(), Recorded::Superseded);

    let journal = open(dir.path());
    assert_eq!(journal.performance_entries().unwrap().len(), 1);
    assert_eq!(journal.performance_entries().unwrap()[0].productivity, rating(8));
}

#[test]
fn saved_report_matches_rendered_text() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = open(dir.path());
    for (i, q) in [6, 7, 8, 5].into_iter().enumerate() {
        let d = format!("2024-03-0{}", i + 1);
        journal.record_sleep(night(&d, q, "walking through my house", &["calm"])).unwrap();
        journal.record_performance(day(&d, q)).unwrap();
    }

    let at = date("2024-03-05").and_hms_opt(8, 0, 0).unwrap();
    let analysis = journal.analysis(0.2).unwrap();
    let text = report::render_report(&analysis, at, 20);
    assert_eq!(text, report::render_report(&journal.analysis(0.2).unwrap(), at, 20));
    assert!(text.contains("Date Range: 2024-03-01 to 2024-03-04"));
    assert!(text.contains("House/Home"));
    assert!(text.contains("sleep quality vs productivity: strong positive"));

    let path = journal.store().save_report(&text).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), text);
}

#[test]
fn corrupt_sleep_file_leaves_performance_and_backup_working() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = open(dir.path());
    journal.record_performance(day("2024-01-01", 7)).unwrap();
    fs::write(dir.path().join(SLEEP_FILE), "[{ truncated").unwrap();

    let journal = open(dir.path());
    assert!(journal.sleep_entries().is_err());
    assert!(journal.analysis(0.2).is_err());
    assert_eq!(journal.performance_entries().unwrap().len(), 1);

    let backup = journal.backup().unwrap();
    assert_eq!(
        fs::read_to_string(backup.path.join(SLEEP_FILE)).unwrap(),
        "[{ truncated"
    );
}
