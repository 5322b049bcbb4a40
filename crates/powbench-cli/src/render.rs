//! Plain-text rendering of batch state.

use std::fmt::Write;

use powbench_core::BatchRequest;
use powbench_runtime::{AsyncMetrics, BatchSnapshot, HealthSnapshot, Runtime, SyncMetrics};

fn ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1} ms", v))
}

fn text(value: Option<&str>) -> String {
    match value {
        Some(v) if v.chars().count() > 16 => format!("{}...", v.chars().take(16).collect::<String>()),
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn runtime(runtime: &Runtime) -> String {
    format!("{} {:.1} ms", runtime.label(), runtime.ms())
}

pub fn processing_details(request: &BatchRequest) -> String {
    format!(
        "{} seeds, difficulty {}, {} ({} iterations per item)",
        request.len(),
        request.difficulty,
        request.algorithm.label(),
        request.total_iterations()
    )
}

pub fn health_line(endpoint: &str, health: &HealthSnapshot) -> String {
    let mut line = format!("Backend {}: {}", endpoint, health.status);
    if let Some(latency) = health.latency_ms {
        let _ = write!(line, " ({:.1} ms)", latency);
    }
    line
}

pub fn sync_table(snapshot: &BatchSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>5}  {:<30} {:<8} {:>12}  {}", "Cycle", "Seed", "Status", "Latency", "Hash");
    for r in &snapshot.sync_results {
        let _ = writeln!(
            out,
            "{:>5}  {:<30} {:<8} {:>12}  {}",
            r.cycle,
            r.seed,
            r.status.to_string(),
            ms(r.latency_ms),
            text(r.hash.as_deref())
        );
    }
    out
}

pub fn ack_table(snapshot: &BatchSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>5}  {:<30} {:<20} {:>10}", "Cycle", "Seed", "Request", "Ack");
    for a in &snapshot.acks {
        let _ = writeln!(
            out,
            "{:>5}  {:<30} {:<20} {:>10}",
            a.cycle,
            a.seed,
            text(Some(&a.request_id)),
            format!("{:.1} ms", a.ack_time_ms)
        );
    }
    out
}

pub fn callback_table(snapshot: &BatchSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<20} {:<9} {:>8} {:>12}  {}",
        "Cycle", "Request", "Status", "Attempts", "Callback", "Hash"
    );
    for r in &snapshot.callbacks {
        let _ = writeln!(
            out,
            "{:>5}  {:<20} {:<9} {:>8} {:>12}  {}",
            r.cycle,
            text(Some(&r.request_id)),
            r.status.to_string(),
            r.attempts,
            ms(r.callback_time_ms),
            text(r.hash.as_deref())
        );
    }
    out
}

pub fn sync_panel(metrics: &SyncMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sync metrics");
    let _ = writeln!(out, "  Requests:   {}", metrics.total);
    let _ = writeln!(out, "  Done:       {}", metrics.done);
    let _ = writeln!(out, "  Failed:     {}", metrics.failed);
    let _ = writeln!(out, "  Progress:   {:.0}%", metrics.progress * 100.0);
    let _ = writeln!(
        out,
        "  Latency:    p50 {} / p95 {} / p99 {}",
        ms(metrics.p50_ms),
        ms(metrics.p95_ms),
        ms(metrics.p99_ms)
    );
    let _ = writeln!(out, "  Runtime:    {}", runtime(&metrics.runtime));
    out
}

pub fn async_panel(metrics: &AsyncMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Async metrics");
    let _ = writeln!(out, "  Acked:      {}", metrics.acknowledged);
    let _ = writeln!(out, "  Done:       {}", metrics.done);
    let _ = writeln!(out, "  Failed:     {}", metrics.failed);
    let _ = writeln!(out, "  Retrying:   {}", metrics.retrying);
    let _ = writeln!(out, "  Avg ack:    {}", ms(metrics.avg_ack_ms));
    let _ = writeln!(
        out,
        "  Callback:   p50 {} / p95 {} / p99 {}",
        ms(metrics.p50_callback_ms),
        ms(metrics.p95_callback_ms),
        ms(metrics.p99_callback_ms)
    );
    let _ = writeln!(out, "  Retries:    {}", metrics.total_retries);
    let _ = writeln!(out, "  Runtime:    {}", runtime(&metrics.runtime));
    out
}

/// One-line progress summary printed while a batch runs.
pub fn progress_line(snapshot: &BatchSnapshot) -> String {
    let sync = SyncMetrics::from_snapshot(snapshot);
    let asynchronous = AsyncMetrics::from_snapshot(snapshot);
    format!(
        "sync {}/{} | async {} done, {} failed, {} retrying of {}",
        sync.done + sync.failed,
        sync.total,
        asynchronous.done,
        asynchronous.failed,
        asynchronous.retrying,
        asynchronous.acknowledged
    )
}

pub fn report(snapshot: &BatchSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Batch {} ===", snapshot.id);
    let _ = writeln!(out, "{}", processing_details(&snapshot.request));
    let _ = writeln!(out);
    let _ = writeln!(out, "Sequential results");
    out.push_str(&sync_table(snapshot));
    let _ = writeln!(out);
    let _ = writeln!(out, "Async acknowledgments");
    out.push_str(&ack_table(snapshot));
    let _ = writeln!(out);
    let _ = writeln!(out, "Async callbacks");
    out.push_str(&callback_table(snapshot));
    let _ = writeln!(out);
    out.push_str(&sync_panel(&SyncMetrics::from_snapshot(snapshot)));
    let _ = writeln!(out);
    out.push_str(&async_panel(&AsyncMetrics::from_snapshot(snapshot)));
    if let Some(error) = &snapshot.error {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error: {}", error);
    }
    out
}
