//! Shared fixtures for trellis benchmarks.
//!
//! The fixture generator builds a realistic issue hierarchy:
//! - 10% epics
//! - 30% features, each the child of an epic
//! - 60% tasks, each the child of a feature
//! - 20% of tasks additionally blocked by another random task
//!
//! Creation dates fall within the past 180 days for epics, 150 for features
//! and 120 for tasks, so the hybrid sort sees both recent and older issues.
//!
//! Status is closed for half the issues and otherwise spread evenly over
//! open, in progress and blocked. Priorities follow a realistic skew
//! (P0 5%, P1 15%, P2 50%, P3 25%, P4 5%).

// Benchmark utilities - pedantic lints not critical here
#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis::{
    Dependency, DependencyType, Issue, IssueId, IssueStatus, IssueTracker, IssueType, Tracker,
    TrackerConfig,
};

/// Labels drawn from when generating issues.
pub const COMMON_LABELS: [&str; 10] = [
    "backend",
    "frontend",
    "urgent",
    "tech-debt",
    "documentation",
    "performance",
    "security",
    "ux",
    "api",
    "database",
];

/// Assignees drawn from when generating issues.
pub const ASSIGNEES: [&str; 6] = ["alice", "bob", "charlie", "diana", "eve", "frank"];

const ACTOR: &str = "fixture";

/// Seed used by every fixture so runs are comparable.
pub const FIXTURE_SEED: u64 = 42;

/// Initialise logging once. `RUST_LOG` overrides the default `trellis=info`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trellis=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// A current-thread runtime for driving the async tracker from criterion.
pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
}

fn random_status(rng: &mut StdRng) -> IssueStatus {
    if rng.gen_bool(0.5) {
        return IssueStatus::Closed;
    }
    *[IssueStatus::Open, IssueStatus::InProgress, IssueStatus::Blocked]
        .choose(rng)
        .expect("non-empty")
}

fn random_priority(rng: &mut StdRng) -> u8 {
    match rng.gen_range(0..100) {
        0..5 => 0,
        5..20 => 1,
        20..70 => 2,
        70..95 => 3,
        _ => 4,
    }
}

/// A timestamp up to `max_days_ago` whole days in the past.
fn random_time(rng: &mut StdRng, now: DateTime<Utc>, max_days_ago: i64) -> DateTime<Utc> {
    now - Duration::days(rng.gen_range(0..max_days_ago))
}

fn link(from: &IssueId, to: &IssueId, dep_type: DependencyType, now: DateTime<Utc>) -> Dependency {
    Dependency {
        issue_id: from.clone(),
        depends_on_id: to.clone(),
        dep_type,
        created_at: now,
        created_by: ACTOR.to_string(),
    }
}

fn random_record(
    rng: &mut StdRng,
    index: usize,
    issue_type: IssueType,
    max_days_ago: i64,
    now: DateTime<Utc>,
) -> Issue {
    let status = random_status(rng);
    let label_count = rng.gen_range(1..=3);
    let labels = COMMON_LABELS
        .choose_multiple(rng, label_count)
        .map(ToString::to_string)
        .collect();
    let created_at = random_time(rng, now, max_days_ago);
    let closed_at = (status == IssueStatus::Closed).then(|| random_time(rng, now, 30));
    Issue {
        id: IssueId::new(format!("bench-{index:05}")),
        title: format!("{issue_type:?} {index}"),
        description: format!("Generated {issue_type:?} for benchmarking"),
        status,
        priority: random_priority(rng),
        issue_type,
        assignee: ASSIGNEES.choose(rng).map(ToString::to_string),
        labels,
        dependencies: Vec::new(),
        created_at,
        updated_at: now,
        closed_at,
    }
}

/// Generate `count` records of one level, each linked to a random parent.
fn generate_level(
    rng: &mut StdRng,
    records: &mut Vec<Issue>,
    count: usize,
    issue_type: IssueType,
    max_days_ago: i64,
    parents: &[IssueId],
    now: DateTime<Utc>,
) -> Vec<IssueId> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let mut record = random_record(rng, records.len(), issue_type, max_days_ago, now);
        if let Some(parent) = parents.choose(rng) {
            record
                .dependencies
                .push(link(&record.id, parent, DependencyType::ParentChild, now));
        }
        ids.push(record.id.clone());
        records.push(record);
    }
    ids
}

/// Generate the fixture records, creation dates spread over the past
/// 120 to 180 days depending on the level.
pub fn generate_records(total: usize, seed: u64) -> Vec<Issue> {
    let mut rng = StdRng::seed_from_u64(seed);
    let now = Utc::now();

    let epic_count = total / 10;
    let feature_count = total * 3 / 10;
    let task_count = total - epic_count - feature_count;

    let mut records = Vec::with_capacity(total);
    let epics = generate_level(&mut rng, &mut records, epic_count, IssueType::Epic, 180, &[], now);
    let features = generate_level(
        &mut rng,
        &mut records,
        feature_count,
        IssueType::Feature,
        150,
        &epics,
        now,
    );
    let tasks = generate_level(
        &mut rng,
        &mut records,
        task_count,
        IssueType::Task,
        120,
        &features,
        now,
    );

    // Tasks occupy the tail of `records`
    let task_offset = epic_count + feature_count;
    for _ in 0..task_count / 5 {
        let from = rng.gen_range(0..tasks.len());
        let to = tasks.choose(&mut rng).expect("tasks exist");
        let record = &mut records[task_offset + from];
        let dep = link(&record.id, to, DependencyType::Blocks, now);
        record.dependencies.push(dep);
    }
    records
}

/// Build a tracker holding `total` generated issues.
///
/// Records go through `import`, so cross links that would close a cycle or
/// point at their own issue are skipped and counted instead of failing.
pub async fn build_fixture(total: usize, seed: u64) -> Tracker {
    let tracker = Tracker::new(TrackerConfig::new("bench")).expect("valid config");
    let records = generate_records(total, seed);
    let report = tracker
        .import(records, ACTOR)
        .await
        .expect("failed to import fixture");

    info!(
        total,
        issues = report.issues_imported,
        edges = report.edges_imported,
        cycles = report.cycles,
        self_references = report.self_references,
        "Fixture built"
    );
    tracker
}

/// Write every issue as one JSON object per line.
pub fn write_jsonl(issues: &[Issue], dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("issues.jsonl");
    let mut writer = BufWriter::new(File::create(&path).expect("failed to create JSONL file"));
    for issue in issues {
        serde_json::to_writer(&mut writer, issue).expect("failed to serialize issue");
        writer.write_all(b"\n").expect("failed to write newline");
    }
    writer.flush().expect("failed to flush JSONL file");
    path
}

/// Read issues written by [`write_jsonl`].
pub fn read_jsonl(path: &std::path::Path) -> Vec<Issue> {
    let reader = BufReader::new(File::open(path).expect("failed to open JSONL file"));
    reader
        .lines()
        .map(|line| line.expect("failed to read line"))
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(&line).expect("failed to parse issue"))
        .collect()
}

/// Build a fixture, export it through a JSONL file and import it into a
/// fresh tracker.
pub async fn build_round_tripped_fixture(total: usize, seed: u64) -> Tracker {
    let source = build_fixture(total, seed).await;
    let exported = source.export_all().await.expect("export failed");

    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = write_jsonl(&exported, &dir);
    let issues = read_jsonl(&path);

    let target = Tracker::new(TrackerConfig::new("bench")).expect("valid config");
    let report = target.import(issues, ACTOR).await.expect("import failed");
    info!(
        issues = report.issues_imported,
        edges = report.edges_imported,
        skipped = report.skipped(),
        "Fixture round-tripped through JSONL"
    );
    target
}
