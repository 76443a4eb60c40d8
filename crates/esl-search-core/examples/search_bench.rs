//! Search latency benchmark over a seeded store

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use esl_search::{ContentRow, EntityKind, Result, SearchRequest, SearchService, SqliteStore};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WORDS: &[&str] = &[
    "grammar", "present", "perfect", "listening", "airport", "story", "phrasal", "verbs",
    "ielts", "travel", "interview", "pronunciation", "idioms", "email", "weather", "family",
];

const QUERIES: &[&str] = &[
    "present perfect",
    "story",
    "ielts listening",
    "phrasal verbs for travel",
    "",
    "no-such-word",
];

#[tokio::main]
async fn main() -> Result<()> {
    // Get rows per entity and iteration count from args
    let args: Vec<String> = std::env::args().collect();
    let rows_per_kind: i64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(2000);
    let iterations: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);

    println!("Seeding {} rows per entity type...", rows_per_kind);
    let store = SqliteStore::open_in_memory()?;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut rows = Vec::new();
    for kind in EntityKind::ALL {
        for i in 0..rows_per_kind {
            let word = |n: i64| WORDS[(n as usize) % WORDS.len()];
            let mut row = ContentRow::new(
                i + 1,
                format!("{} {} {}", word(i), word(i / 3), kind),
                base + ChronoDuration::minutes(i),
            );
            row.description = Some(format!("Practice {} with {}", word(i / 7), word(i / 11)));
            row.content = Some(format!("{} {} {}", word(i / 2), word(i / 5), word(i / 13)));
            row.level = Some(["a1", "a2", "b1", "b2", "c1", "c2"][(i % 6) as usize].to_string());
            row.tags = vec![word(i + 1).to_string()];
            rows.push((kind, row));
        }
    }
    store.load_rows(&rows)?;

    let service = SearchService::new(Arc::new(store));

    for query in QUERIES {
        let request = SearchRequest::new(*query).limit(20);
        let mut samples: Vec<Duration> = Vec::with_capacity(iterations);
        let mut total = 0;

        for _ in 0..iterations {
            let start = Instant::now();
            let response = service.search(&request).await?;
            samples.push(start.elapsed());
            total = response.total;
        }

        samples.sort();
        println!(
            "  {:<28} total={:<6} p50={:>8.2?} p95={:>8.2?} max={:>8.2?}",
            format!("{:?}", query),
            total,
            percentile(&samples, 50),
            percentile(&samples, 95),
            samples.last().copied().unwrap_or_default()
        );
    }

    Ok(())
}

fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = (sorted.len() * pct / 100).min(sorted.len() - 1);
    sorted[idx]
}
