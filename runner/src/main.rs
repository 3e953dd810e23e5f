//! Command-line front end for the 8-bit microcomputer simulator.
//!
//! Owns everything the simulation core treats as an external collaborator: the
//! bundled demo catalog standing in for an interactive hex-entry menu, raw-mode
//! stdin key capture, and the `debug`-gated diagnostic log.

mod demos;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::{error, info};
use sim_core::Byte;
use sim_cpu::{Clock, Cpu, Mos6502InstructionSet, System, Verdict};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "microsim", about = "Cycle-accurate 8-bit microcomputer simulator")]
struct Cli {
    /// Name of the bundled demo program to run.
    #[arg(long)]
    program: Option<String>,

    /// List the bundled demo programs and exit.
    #[arg(long)]
    list: bool,

    /// Let ADC honor an incoming Carry flag.
    #[arg(long)]
    use_carry: bool,

    /// Enable structured diagnostic logging.
    #[arg(long)]
    debug: bool,

    /// Accept live keystrokes from the terminal (raw mode) while the program runs,
    /// instead of running unattended to completion. Press 'q' to stop.
    #[arg(long)]
    interactive: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    }

    let catalog = demos::catalog();
    if cli.list {
        for program in &catalog {
            println!("{}", program.name);
        }
        return ExitCode::SUCCESS;
    }

    let Some(program) = cli
        .program
        .as_deref()
        .and_then(|name| catalog.into_iter().find(|p| p.name == name))
    else {
        eprintln!("unknown or missing --program; pass --list to see the bundled catalog");
        return ExitCode::FAILURE;
    };

    let mut cpu = Cpu::new(Box::new(Mos6502InstructionSet));
    cpu.use_carry = cli.use_carry;
    let mut system = System::new(cpu).with_clock(Clock::new(Duration::ZERO));
    system.load(&program);
    info!("running \"{}\"", program.name);

    let keyboard_feed = cli.interactive.then(spawn_keyboard_feed);

    while !system.cpu().stop_requested() {
        if let Some((receiver, _stop)) = &keyboard_feed {
            while let Ok(byte) = receiver.try_recv() {
                system.publish_key(byte);
            }
        }
        system.pulse();
    }

    if let Some((_receiver, stop)) = &keyboard_feed {
        stop.store(true, Ordering::Relaxed);
        let _ = disable_raw_mode();
    }

    let output = system.console_output();
    if !output.is_empty() {
        println!("{output}");
    }

    match system.verdict() {
        Verdict::NoExpectation => {}
        Verdict::Pass => println!("PASS"),
        Verdict::Fail => {
            error!("program \"{}\" did not match its expected register snapshot", program.name);
            println!("FAIL");
        }
    }

    ExitCode::SUCCESS
}

/// Spawn a thread reading raw-mode key events and forwarding printable bytes to the
/// returned channel. The CPU's own `InterruptCheck` stage is what actually reacts to
/// a 'q'/'Q' byte by stopping the run (§4.5) — this thread only ever produces bytes.
fn spawn_keyboard_feed() -> (mpsc::Receiver<Byte>, Arc<AtomicBool>) {
    let (sender, receiver) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_thread = Arc::clone(&stop);

    thread::spawn(move || {
        if enable_raw_mode().is_err() {
            return;
        }
        while !stop_for_thread.load(Ordering::Relaxed) {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => {
                    if let Ok(Event::Key(key)) = event::read() {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if let KeyCode::Char(ch) = key.code {
                            if sender.send(Byte(ch as u8)).is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(false) => {}
                Err(_) => break,
            }
        }
        let _ = disable_raw_mode();
    });

    (receiver, stop)
}
