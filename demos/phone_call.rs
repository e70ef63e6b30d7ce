//! Phone Call State Machine
//!
//! This example demonstrates hierarchy, groups and checkpointing.
//!
//! Key concepts:
//! - Nested machines (the call owns a talking/on-hold sub-machine)
//! - Group boundary handlers (the line is engaged across call states)
//! - Saving the active configuration and restoring it after a rebuild
//!
//! Run with: cargo run --example phone_call

use statik::{Checkpoint, EventId, MachineBuilder, StateMachine, TransitionBuilder};

struct Phone {
    machine: StateMachine,
    dial: EventId,
    hang_up: EventId,
    hold: EventId,
    resume: EventId,
}

fn build_phone() -> Phone {
    let mut b: MachineBuilder = MachineBuilder::new("phone");
    let idle = b.state("idle");
    let in_call = b.state("in_call");
    b.initial(idle);

    let call = b.child_machine(in_call, "call");
    let talking = b.state_in(call, "talking");
    let on_hold = b.state_in(call, "on_hold");
    b.initial(talking);

    let engaged = b.group("engaged");
    b.add_to_group(in_call, engaged);
    b.on_group_entry(engaged, |_| println!("  [line engaged]"));
    b.on_group_exit(engaged, |_| println!("  [line free]"));

    let dial = b.event("dial");
    let hang_up = b.event("hang_up");
    let hold = b.event("hold");
    let resume = b.event("resume");
    b.transition(TransitionBuilder::new().on(dial).from(idle).to(in_call))
        .unwrap();
    b.transition(
        TransitionBuilder::new()
            .on(hang_up)
            .from(in_call)
            .to(idle),
    )
    .unwrap();
    b.transition(TransitionBuilder::new().on(hold).from(talking).to(on_hold))
        .unwrap();
    b.transition(
        TransitionBuilder::new()
            .on(resume)
            .from(on_hold)
            .to(talking),
    )
    .unwrap();

    let mut machine = b.build().unwrap();
    machine.on_transition(|event| {
        println!("  {} -> {} on '{}'", event.from_name, event.to_name, event.event_name);
    });

    Phone {
        machine,
        dial,
        hang_up,
        hold,
        resume,
    }
}

fn main() {
    println!("=== Phone Call State Machine ===\n");

    let mut phone = build_phone();
    println!("Dialing:");
    phone.machine.fire(phone.dial).unwrap();

    println!("\nPutting the call on hold:");
    phone.machine.fire(phone.hold).unwrap();
    println!("Active configuration: {}", phone.machine.serialize());

    // Capture the configuration mid-call.
    let checkpoint = phone.machine.checkpoint();
    let json = checkpoint.to_json().unwrap();
    println!("\nCheckpoint saved: {json}");

    println!("\nHanging up:");
    phone.machine.fire(phone.hang_up).unwrap();

    // A fresh machine (say, after a restart) resumes the held call.
    println!("\nRestoring the checkpoint into a fresh machine:");
    let mut restored = build_phone();
    let checkpoint = Checkpoint::from_json(&json).unwrap();
    restored.machine.restore(&checkpoint).unwrap();
    println!("Active configuration: {}", restored.machine.serialize());

    println!("\nResuming the call:");
    restored.machine.fire(restored.resume).unwrap();

    println!("\n=== Example Complete ===");
}
