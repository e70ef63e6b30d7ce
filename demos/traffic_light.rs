//! Traffic Light State Machine
//!
//! This example demonstrates a simple cyclic state machine.
//!
//! Key concepts:
//! - Cyclic state transitions (states repeat)
//! - The throwing and non-throwing fire forms
//! - Transition observers
//! - Practical real-world pattern
//!
//! Run with: cargo run --example traffic_light

use statik::{MachineBuilder, TransitionBuilder};

fn main() {
    println!("=== Traffic Light State Machine ===\n");

    let mut b: MachineBuilder = MachineBuilder::new("traffic_light");
    let red = b.state("red");
    let green = b.state("green");
    let yellow = b.state("yellow");
    b.initial(red);

    let tick = b.event("tick");
    b.transition(TransitionBuilder::new().on(tick).from(red).to(green))
        .unwrap();
    b.transition(TransitionBuilder::new().on(tick).from(green).to(yellow))
        .unwrap();
    b.transition(TransitionBuilder::new().on(tick).from(yellow).to(red))
        .unwrap();

    let mut light = b.build().unwrap();
    light.on_transition(|event| {
        println!("  {} -> {}", event.from_name, event.to_name);
    });

    println!("Traffic light created");
    println!("Initial state: {}\n", light.state_name(light.current_state()));

    println!("One full cycle:");
    for _ in 0..3 {
        light.fire(tick).unwrap();
    }

    println!(
        "\nBack at the start: {}",
        light.state_name(light.current_state())
    );
    println!("This is a cyclic machine - the sequence repeats indefinitely.");

    println!("\n=== Example Complete ===");
}
