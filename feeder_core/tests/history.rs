use chrono::{DateTime, NaiveDate};
use feeder_core::{ConsumptionLog, FeedRecord};

fn rec(ts: &str, fed: f64) -> FeedRecord {
    FeedRecord {
        timestamp: DateTime::parse_from_rfc3339(ts).unwrap(),
        target_g: 50.0,
        fed_g: fed,
        success: true,
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn daily_limits_to_the_newest_days() {
    let dir = tempfile::tempdir().unwrap();
    let log = ConsumptionLog::new(dir.path().join("consumption.jsonl"), 90);
    for d in 1..=5 {
        log.append(&rec(&format!("2026-04-0{d}T07:30:00+02:00"), 10.0 * f64::from(d)))
            .unwrap();
    }
    let s = log.daily_as_of(day(2026, 4, 5), 2).unwrap();
    assert_eq!(s.len(), 2);
    assert_eq!(s[0].date, day(2026, 4, 4));
    assert_eq!(s[1].total_g, 50.0);
}

#[test]
fn retention_hides_and_compact_drops_old_records() {
    let dir = tempfile::tempdir().unwrap();
    let log = ConsumptionLog::new(dir.path().join("consumption.jsonl"), 7);
    log.append(&rec("2026-01-01T08:00:00+00:00", 30.0)).unwrap();
    log.append(&rec("2026-01-20T08:00:00+00:00", 40.0)).unwrap();
    log.append(&rec("2026-01-21T08:00:00+00:00", 45.0)).unwrap();

    let today = day(2026, 1, 22);
    assert_eq!(log.daily_as_of(today, 30).unwrap().len(), 2);
    assert_eq!(log.compact(today).unwrap(), 1);
    assert_eq!(log.records().unwrap().len(), 2);
    assert_eq!(log.compact(today).unwrap(), 0);
}

#[test]
fn missing_log_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = ConsumptionLog::new(dir.path().join("nope.jsonl"), 90);
    assert!(log.records().unwrap().is_empty());
    assert!(log.daily(7).unwrap().is_empty());
}
