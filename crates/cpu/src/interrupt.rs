//! Interrupt records and priority arbitration (§3, §4.3).

use crate::cpu::Cpu;
use sim_core::Byte;

/// A single interrupt request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupt {
    pub irq_number: Byte,
    /// Higher values are more urgent.
    pub priority: i32,
    pub device_name: String,
    pub data: Byte,
}

impl Interrupt {
    #[must_use]
    pub fn keyboard(data: Byte) -> Self {
        Self {
            irq_number: Byte(1),
            priority: 1,
            device_name: "Keyboard".to_string(),
            data,
        }
    }
}

/// Buffers interrupts arriving during a tick and arbitrates a single winner per tick.
#[derive(Debug, Default)]
pub struct InterruptController {
    waiting: Vec<Interrupt>,
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, interrupt: Interrupt) {
        self.waiting.push(interrupt);
    }

    pub fn clear(&mut self) {
        self.waiting.clear();
    }

    /// Pick the highest-priority waiting interrupt (ties broken by arrival order)
    /// and deliver it to the CPU's pending slot, then empty `waiting`.
    ///
    /// If nothing is waiting this tick, the CPU's existing pending slot is left
    /// untouched — only the `InterruptCheck` pipeline stage clears it, once the CPU
    /// has actually serviced it (§4.3, §4.5).
    pub fn tick(&mut self, cpu: &mut Cpu) {
        if let Some(winner) = self.select_winner() {
            cpu.set_pending_interrupt(Some(winner));
        }
        self.waiting.clear();
    }

    #[cfg(test)]
    pub(crate) fn select_winner_for_test(&self) -> Option<Interrupt> {
        self.select_winner()
    }

    fn select_winner(&self) -> Option<Interrupt> {
        let mut best: Option<&Interrupt> = None;
        for candidate in &self.waiting {
            match best {
                Some(current) if candidate.priority <= current.priority => {}
                _ => best = Some(candidate),
            }
        }
        best.cloned()
    }
}
