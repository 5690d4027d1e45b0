//! Synthetic load generator for the serving API.
//!
//! Posts a fixed 15-row OHLC payload against `/invocations` at a short,
//! configurable interval and prints a latency/status summary.

use clap::Parser;
use serde_json::json;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Invocations endpoint to hit
    #[arg(long, default_value = "http://127.0.0.1:8000/invocations")]
    url: String,

    /// Think time between requests per worker, in milliseconds
    #[arg(long, default_value_t = 75)]
    interval_ms: u64,

    /// Total number of requests to send
    #[arg(long, default_value_t = 1000)]
    requests: usize,

    /// Concurrent workers
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

fn payload_rows() -> Vec<[f64; 4]> {
    let block = [
        [59748.4, 58127.4, 61229.0, 57900.0],
        [58118.7, 58076.8, 58890.9, 57686.0],
        [58077.4, 55948.0, 58136.7, 55721.6],
    ];
    block.iter().copied().cycle().take(15).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let per_worker = args.requests.div_ceil(args.concurrency.max(1));
    let body = json!({ "data": payload_rows() });

    println!(
        "Load test: {} requests, {} workers, {}ms interval -> {}",
        args.requests, args.concurrency, args.interval_ms, args.url
    );

    let start = Instant::now();
    let mut handles = Vec::with_capacity(args.concurrency);

    for _ in 0..args.concurrency {
        let url = args.url.clone();
        let body = body.clone();
        let interval = Duration::from_millis(args.interval_ms);

        handles.push(tokio::spawn(async move {
            let client = reqwest::Client::new();
            let mut ok = 0usize;
            let mut failed = 0usize;
            let mut latencies_ms: Vec<f64> = Vec::with_capacity(per_worker);

            for _ in 0..per_worker {
                let sent = Instant::now();
                match client.post(&url).json(&body).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        ok += 1;
                        latencies_ms.push(sent.elapsed().as_secs_f64() * 1000.0);
                    }
                    Ok(resp) => {
                        failed += 1;
                        eprintln!("Request failed with status {}", resp.status());
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("Request error: {e}");
                    }
                }
                tokio::time::sleep(interval).await;
            }

            (ok, failed, latencies_ms)
        }));
    }

    let mut ok = 0usize;
    let mut failed = 0usize;
    let mut latencies_ms: Vec<f64> = Vec::new();
    for handle in handles {
        let (w_ok, w_failed, w_lat) = handle.await?;
        ok += w_ok;
        failed += w_failed;
        latencies_ms.extend(w_lat);
    }

    let elapsed = start.elapsed().as_secs_f64();
    latencies_ms.sort_by(|a, b| a.total_cmp(b));
    let pct = |p: f64| -> f64 {
        if latencies_ms.is_empty() {
            return 0.0;
        }
        let idx = ((latencies_ms.len() as f64 - 1.0) * p).round() as usize;
        latencies_ms[idx]
    };

    println!("\n══════════════════════════════════════");
    println!("  LOAD TEST SUMMARY");
    println!("══════════════════════════════════════");
    println!("  Sent:      {}", ok + failed);
    println!("  OK:        {}", ok);
    println!("  Failed:    {}", failed);
    println!("  Elapsed:   {:.1}s ({:.1} req/s)", elapsed, (ok + failed) as f64 / elapsed);
    if !latencies_ms.is_empty() {
        println!("  Latency p50: {:.1}ms", pct(0.50));
        println!("  Latency p95: {:.1}ms", pct(0.95));
        println!("  Latency p99: {:.1}ms", pct(0.99));
    }

    Ok(())
}
