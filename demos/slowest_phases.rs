//! Slowest-Phases Demo
//!
//! Simulates one profiled build: phase markers, a burst of VFS traffic,
//! action execution, and remote-execution phases, then prints what the
//! session kept. Shows admission folding, per-category slow retention,
//! and the merged slowest ranking.
//!
//! Run with: cargo run --example slowest_phases
//!
//! Set RUST_LOG=demora=debug to watch retention decisions as they happen.

use anyhow::Result;
use demora::category::CategoryId;
use demora::event::TimedEvent;
use demora::session::{ProfileSession, SessionConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

const MILLI: u64 = 1_000_000;

fn simulate_build(session: &ProfileSession) {
    // Fixed seed so the demo prints the same story every run.
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut clock = 0u64;

    for (phase, action_count) in [("loading", 40u64), ("analysis", 120), ("execution", 240)] {
        session.record(&TimedEvent::new(CategoryId::Phase, clock, 0, phase));

        for action in 0..action_count {
            let label = format!("//demo/{phase}:target_{action}");

            // Dependency checking is fast and mostly folds away.
            session.record(&TimedEvent::new(
                CategoryId::ActionCheck,
                clock,
                rng.gen_range(0..12u64) * MILLI,
                &label,
            ));
            clock += 50;

            // VFS traffic: the occasional cold read is two orders slower.
            for file in 0..4u64 {
                let path = format!("/src/{phase}/file_{action}_{file}.rs");
                let duration = if rng.gen_range(0..100u64) < 3 {
                    (80 + rng.gen_range(0..400u64)) * MILLI
                } else {
                    rng.gen_range(0..8u64) * MILLI
                };
                session.record(&TimedEvent::new(CategoryId::VfsRead, clock, duration, &path));
                clock += 25;
            }

            // Execution phase pays remote queue and fetch time.
            if phase == "execution" {
                session.record(&TimedEvent::new(
                    CategoryId::RemoteQueue,
                    clock,
                    (20 + rng.gen_range(0..150u64)) * MILLI,
                    &label,
                ));
                session.record(&TimedEvent::new(
                    CategoryId::Fetch,
                    clock + 10,
                    (10 + rng.gen_range(0..90u64)) * MILLI,
                    &label,
                ));
                clock += 100;
            }

            session.record(&TimedEvent::new(
                CategoryId::Action,
                clock,
                (5 + rng.gen_range(0..60u64)) * MILLI,
                &label,
            ));
            clock += 200;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("🚀 Demora Slowest-Phases Demo\n");

    let session = ProfileSession::new(SessionConfig::default());
    session.begin_session();
    simulate_build(&session);

    let summary = session.summary();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Admission: standalone records vs folded events");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    for snapshot in &summary.categories {
        if snapshot.emitted + snapshot.suppressed == 0 {
            continue;
        }
        println!(
            "   {:<36} emitted {:>5}   folded {:>5}",
            snapshot.description, snapshot.emitted, snapshot.suppressed
        );
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Slowest VFS reads retained this session");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    for record in session.slowest(CategoryId::VfsRead).iter().take(10) {
        println!(
            "   #{:<3} {:>8.1}ms  {}",
            record.rank,
            record.duration_nanos as f64 / MILLI as f64,
            record.description
        );
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Slowest events overall, across every tracked category");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    for record in summary.slowest_overall.iter().take(10) {
        println!(
            "   #{:<3} {:>8.1}ms  [{:?}] {}",
            record.rank,
            record.duration_nanos as f64 / MILLI as f64,
            record.category,
            record.description
        );
    }

    let report = session.end_session();
    println!(
        "\n✅ Session ended: {} standalone records, {} folded, {} slow events kept",
        report.total_emitted(),
        report.total_suppressed(),
        report.slowest_overall.len()
    );

    Ok(())
}
