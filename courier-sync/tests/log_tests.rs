use courier_sync::{LogLevel, SyncLog};

#[test]
fn lines_come_back_in_order() {
    let log = SyncLog::with_capacity(10);
    log.debug("one");
    log.warn("two");
    log.error("three");

    let lines = log.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].message, "one");
    assert_eq!(lines[0].level, LogLevel::Debug);
    assert_eq!(lines[2].message, "three");
    assert_eq!(lines[2].level, LogLevel::Error);
}

#[test]
fn capacity_evicts_oldest() {
    let log = SyncLog::with_capacity(3);
    for i in 0..5 {
        log.info(format!("line {i}"));
    }

    let lines = log.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].message, "line 2");
    assert_eq!(lines[2].message, "line 4");
}

#[test]
fn tail_returns_newest_lines() {
    let log = SyncLog::with_capacity(10);
    for i in 0..6 {
        log.info(format!("line {i}"));
    }

    let tail = log.tail(2);
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].message, "line 4");
    assert_eq!(tail[1].message, "line 5");

    assert_eq!(log.tail(100).len(), 6);
}

#[test]
fn clear_empties_the_buffer() {
    let log = SyncLog::with_capacity(10);
    log.info("something");
    log.clear();
    assert!(log.lines().is_empty());
}
