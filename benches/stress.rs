use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hallsched::auth::Principal;
use hallsched::model::*;
use hallsched::scheduler::{Scheduler, SchedulerError};
use ulid::Ulid;

const HOUR: i64 = 3_600_000; // 1 hour in ms
/// 2026-01-01T00:00:00Z
const T0: i64 = 1_767_225_600_000;

fn bench_wal_path() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hallsched_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).expect("create bench dir");
    dir.join("bench.wal")
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

async fn setup(scheduler: &Scheduler, n_halls: usize) -> Vec<HallId> {
    let admin = Principal::admin("bench-admin@uni.edu");
    let mut halls = Vec::with_capacity(n_halls);
    for i in 0..n_halls {
        let hall = scheduler
            .create_hall(
                &admin,
                NewHall {
                    name: format!("Bench Hall {i}"),
                    capacity: 50,
                    location: None,
                    image: None,
                    amenities: Vec::new(),
                },
            )
            .await
            .unwrap();
        halls.push(hall.id);
    }
    println!("  created {n_halls} halls");
    halls
}

async fn phase1_sequential(scheduler: &Scheduler, hall: HallId) {
    let who = Principal::student("seq@uni.edu");
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let s = T0 + (i as i64) * HOUR;
        let t = Instant::now();
        scheduler
            .request_booking(hall, &who, s, s + HOUR, "sequential")
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("write latency", &mut latencies);
}

async fn phase2_concurrent(scheduler: Arc<Scheduler>, halls: &[HallId]) {
    let n_tasks = 10;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();

    for i in 0..n_tasks {
        let scheduler = scheduler.clone();
        let hall = halls[i % halls.len()];
        handles.push(tokio::spawn(async move {
            let who = Principal::student(format!("task{i}@uni.edu"));
            for j in 0..n_per_task {
                let s = T0 + (j as i64) * HOUR;
                scheduler
                    .request_booking(hall, &who, s, s + HOUR, "concurrent")
                    .await
                    .unwrap();
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} bookings = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

/// Many callers race for the same slots; exactly one wins each.
async fn phase3_contended(scheduler: Arc<Scheduler>, hall: HallId) {
    let n_slots = 100;
    let n_racers = 32;

    let start = Instant::now();
    let mut admitted = 0;
    let mut conflicts = 0;

    for slot in 0..n_slots {
        let s = T0 + (slot as i64) * HOUR;
        let mut handles = Vec::with_capacity(n_racers);
        for r in 0..n_racers {
            let scheduler = scheduler.clone();
            handles.push(tokio::spawn(async move {
                let who = Principal::student(format!("racer{r}@uni.edu"));
                scheduler.request_booking(hall, &who, s, s + HOUR, "race").await
            }));
        }
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(SchedulerError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }

    let elapsed = start.elapsed();
    println!(
        "  {n_slots} slots x {n_racers} racers in {:.2}s: {admitted} admitted, {conflicts} conflicts",
        elapsed.as_secs_f64()
    );
    assert_eq!(admitted, n_slots, "each slot must be admitted exactly once");
}

async fn phase4_read_under_load(scheduler: Arc<Scheduler>, hall: HallId) {
    let writer = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let who = Principal::student("writer@uni.edu");
            for j in 0..1000 {
                let s = T0 + 10_000 * HOUR + (j as i64) * HOUR;
                let _ = scheduler.request_booking(hall, &who, s, s + HOUR, "load").await;
            }
        })
    };

    let n = 500;
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let s = T0 + (i as i64 % 100) * 24 * HOUR;
        let t = Instant::now();
        scheduler.free_slots(hall, s, s + 24 * HOUR).await.unwrap();
        latencies.push(t.elapsed());
    }
    writer.await.unwrap();
    print_latency("free_slots latency", &mut latencies);

    let t = Instant::now();
    let listed = scheduler
        .list_bookings(&BookingFilter {
            hall_id: Some(hall),
            requester_email: None,
        })
        .await;
    println!(
        "  list_bookings: {} bookings in {:.2}ms",
        listed.len(),
        t.elapsed().as_secs_f64() * 1000.0
    );
}

#[tokio::main]
async fn main() {
    let path = bench_wal_path();
    println!("=== hallsched stress benchmark ===");
    println!("wal: {}\n", path.display());

    let scheduler = Arc::new(Scheduler::open(&path).expect("open scheduler"));

    println!("[setup]");
    let halls = setup(&scheduler, 13).await;

    println!("\n[phase 1] sequential admission");
    phase1_sequential(&scheduler, halls[0]).await;

    println!("\n[phase 2] concurrent admission across halls");
    phase2_concurrent(scheduler.clone(), &halls[1..11]).await;

    println!("\n[phase 3] contended admission on one hall");
    phase3_contended(scheduler.clone(), halls[11]).await;

    println!("\n[phase 4] read latency under write load");
    phase4_read_under_load(scheduler.clone(), halls[12]).await;

    println!("\n[compaction]");
    let t = Instant::now();
    let events = scheduler.compact().await.unwrap();
    println!("  {events} events rewritten in {:.2}ms", t.elapsed().as_secs_f64() * 1000.0);

    println!("\n=== benchmark complete ===");
}
