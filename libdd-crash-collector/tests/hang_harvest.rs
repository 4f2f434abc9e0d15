// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![cfg(feature = "hang")]

use libdd_crash_collector::{
    ArtifactKind, CollectorConfiguration, CollectorIssue, DiagnosticCounters, ExitEvent,
    ExitReason, FileWatermarkStore, HangHarvester, QuarantineStore, UploadScheduler,
    WatermarkStore, DD_HANG_CAUSE_PLACEHOLDER,
};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const THREAD_DUMP: &str = "\
----- pid 1234 at 2024-01-01 00:00:00 -----
Cmd line: com.example
\"main\" prio=5 tid=1 Sleeping
  at java.lang.Thread.sleep(Native method)
  at com.example.MainActivity.onClick(MainActivity.java:42)
\"Signal Catcher\" daemon prio=10 tid=6 Runnable
  at signal.catch()
\"HeapTaskDaemon\" daemon prio=5 tid=7 Blocked
  at heap.task()
";

#[derive(Default)]
struct CountingScheduler {
    calls: AtomicUsize,
}

impl UploadScheduler for CountingScheduler {
    fn schedule_upload(&self, kind: ArtifactKind) {
        assert_eq!(kind, ArtifactKind::HangReport);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// An exit history the test can edit between passes, the way the OS keeps replaying entries.
#[derive(Clone, Default)]
struct History {
    entries: Arc<Mutex<Vec<(i64, ExitReason, Option<&'static str>)>>>,
}

impl History {
    fn push(&self, timestamp_ms: i64, reason: ExitReason, version: Option<&'static str>) {
        self.entries
            .lock()
            .unwrap()
            .push((timestamp_ms, reason, version));
    }

    fn snapshot(&self) -> anyhow::Result<Vec<ExitEvent>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|&(timestamp_ms, reason, version)| {
                ExitEvent::new(
                    timestamp_ms,
                    reason,
                    version.map(|v| v.as_bytes().to_vec()),
                    || Ok(Box::new(Cursor::new(THREAD_DUMP.as_bytes())) as Box<dyn Read + Send>),
                )
            })
            .collect())
    }
}

struct Fixture {
    harvester: HangHarvester,
    history: History,
    quarantine: QuarantineStore,
    scheduler: Arc<CountingScheduler>,
    watermark: Arc<FileWatermarkStore>,
}

fn fixture(base: &Path) -> Fixture {
    let config = CollectorConfiguration::with_base_dir(base).unwrap();
    let quarantine = QuarantineStore::new(&config);
    let history = History::default();
    let watermark = Arc::new(FileWatermarkStore::new(config.watermark_path()));
    let scheduler = Arc::new(CountingScheduler::default());
    let harvester = HangHarvester::new(
        Arc::new({
            let history = history.clone();
            move || history.snapshot()
        }),
        watermark.clone(),
        quarantine.clone(),
        scheduler.clone(),
        Arc::new(DiagnosticCounters::new()),
    );
    Fixture {
        harvester,
        history,
        quarantine,
        scheduler,
        watermark,
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_new_hang_is_quarantined() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let f = fixture(tmp.path());
    f.history.push(500, ExitReason::Hang, Some("1.2.3"));

    let written = f.harvester.harvest();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].timestamp_ms, 500);
    assert_eq!(written[0].version_tag, b"1.2.3");
    assert_eq!(f.watermark.get()?, 500);
    assert_eq!(f.quarantine.hang_records()?, vec![written[0].path.clone()]);

    let record = f.quarantine.read_hang_record(&written[0].path)?;
    assert_eq!(record.version_tag, b"1.2.3");
    assert_eq!(record.timestamp_ms, 500);
    let report = record.report.expect("report");
    assert_eq!(report.cause, DD_HANG_CAUSE_PLACEHOLDER);
    assert_eq!(
        report.preamble,
        "----- pid 1234 at 2024-01-01 00:00:00 -----\nCmd line: com.example\n"
    );
    assert_eq!(
        report.main_thread_stack,
        "\"main\" prio=5 tid=1 Sleeping\n  at java.lang.Thread.sleep(Native method)\n  at com.example.MainActivity.onClick(MainActivity.java:42)\n"
    );
    assert_eq!(
        report.other_thread_stacks,
        "\"Signal Catcher\" daemon prio=10 tid=6 Runnable\n  at signal.catch()\n\"HeapTaskDaemon\" daemon prio=5 tid=7 Blocked\n  at heap.task()\n"
    );
    assert_eq!(f.scheduler.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_only_hangs_past_watermark_are_processed() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let f = fixture(tmp.path());
    f.watermark.set(500)?;
    f.history.push(500, ExitReason::Hang, Some("1.0"));
    f.history.push(700, ExitReason::Hang, Some("1.1"));

    let written = f.harvester.harvest();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].timestamp_ms, 700);
    assert_eq!(written[0].version_tag, b"1.1");
    assert_eq!(f.watermark.get()?, 700);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_second_pass_without_new_hangs_writes_nothing() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let f = fixture(tmp.path());
    f.history.push(100, ExitReason::Hang, Some("1.0"));
    f.history.push(300, ExitReason::Hang, Some("1.0"));

    assert_eq!(f.harvester.harvest().len(), 2);
    assert!(f.harvester.harvest().is_empty());
    assert_eq!(f.quarantine.hang_records()?.len(), 2);
    assert_eq!(f.watermark.get()?, 300);
    assert_eq!(f.scheduler.calls.load(Ordering::SeqCst), 1);

    // Only the newer entry is picked up once the OS reports it.
    f.history.push(400, ExitReason::Hang, Some("1.0"));
    assert_eq!(f.harvester.harvest().len(), 1);
    assert_eq!(f.quarantine.hang_records()?.len(), 3);
    assert_eq!(f.scheduler.calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_unattributable_hang_advances_watermark() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let f = fixture(tmp.path());
    f.history.push(800, ExitReason::Hang, Some(""));
    f.history.push(900, ExitReason::Hang, None);

    assert!(f.harvester.harvest().is_empty());
    assert!(f.quarantine.hang_records()?.is_empty());
    assert_eq!(f.watermark.get()?, 900);
    assert_eq!(
        f.harvester
            .counters()
            .get(CollectorIssue::HangUnattributable),
        2
    );
    assert_eq!(f.scheduler.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_watermark_survives_restart() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let f = fixture(tmp.path());
    f.history.push(1_000, ExitReason::Hang, Some("1.0"));
    f.history.push(1_500, ExitReason::Crash, Some("1.0"));
    assert_eq!(f.harvester.harvest().len(), 1);
    drop(f);

    // A new process sees the same history and the persisted watermark.
    let f = fixture(tmp.path());
    f.history.push(1_000, ExitReason::Hang, Some("1.0"));
    assert!(f.harvester.harvest().is_empty());
    assert_eq!(f.watermark.get()?, 1_000);
    assert_eq!(f.quarantine.hang_records()?.len(), 1);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_foreign_entries_in_watermark_file_do_not_stop_harvest() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let f = fixture(tmp.path());
    std::fs::write(
        f.watermark.path(),
        r#"{"some_other_key": "text", "settings": {"enabled": false}}"#,
    )?;
    f.history.push(100, ExitReason::Hang, Some("1.0"));

    assert_eq!(f.harvester.harvest().len(), 1);
    assert_eq!(f.watermark.get()?, 100);
    assert!(f.harvester.harvest().is_empty());

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(f.watermark.path())?)?;
    assert_eq!(raw["some_other_key"], "text");
    assert_eq!(raw["settings"]["enabled"], false);
    Ok(())
}
