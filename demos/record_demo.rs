//! Demonstration of the varbit recorder.
//!
//! This example shows how to:
//! 1. Build a simulated host from a small field catalog
//! 2. Start a recording session
//! 3. Deliver host notifications to the recorder as each write happens
//! 4. Inspect the batches produced on each tick
//!
//! Run with: cargo run --example record_demo
//!
//! Batches go to an in-memory sink, so no collector is needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use varbit_recorder::{FieldDescriptor, FieldName, MemorySink, Recorder, SessionControl, SimulatedHost};

const DEMO_TICKS: u32 = 20;

fn main() {
    println!("Varbit Recorder - Demo");
    println!("======================");
    println!();

    // Two containers: one with four nibbles, one with a flag and a counter.
    let catalog = vec![
        FieldDescriptor::new(10, 0, 0, 3),
        FieldDescriptor::new(11, 0, 4, 7),
        FieldDescriptor::new(12, 0, 8, 11),
        FieldDescriptor::new(13, 0, 12, 15),
        FieldDescriptor::new(20, 1, 0, 0),
        FieldDescriptor::new(21, 1, 1, 10),
    ];
    let names = vec![
        FieldName {
            id: 20,
            name: "DOOR_OPEN".to_string(),
        },
        FieldName {
            id: 21,
            name: "KILL_COUNT".to_string(),
        },
    ];

    let host = Arc::new(SimulatedHost::from_catalog(catalog, names));
    let sink = Arc::new(MemorySink::new());
    let recorder = Recorder::new(Arc::clone(&host), Arc::clone(&sink));

    if let Err(e) = recorder.start() {
        eprintln!("Error starting recorder: {e}");
        return;
    }
    println!("Session: {}", recorder.session_id());
    println!("Recording {DEMO_TICKS} ticks...");
    println!();

    // Set up stop flag
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let mut rng = rand::thread_rng();
    for _ in 0..DEMO_TICKS {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
        let tick = host.run_tick(&mut rng, 2, |event| recorder.handle_event(event));

        for payload in sink.take() {
            println!("[tick {tick}] {} change(s)", payload.len());
            for change in &payload.info {
                println!(
                    "    {}: {} -> {} (tick {})",
                    change.name, change.old_value, change.new_value, change.tick
                );
            }
            match payload.to_json() {
                Ok(json) => println!("    payload: {json}"),
                Err(e) => eprintln!("    payload error: {e}"),
            }
        }
    }

    println!();
    println!("Stopping recording...");
    recorder.stop();

    println!();
    println!("{}", recorder.stats().summary());
    println!();
    println!("Demo complete!");
}
