//! Keyboard device: publishes one interrupt per keystroke (§1, §4, §6).
//!
//! Raw key capture itself is an external collaborator (stdin raw-mode reading lives
//! on the host). This device only owns the queue of bytes the host has handed it and
//! drains it into the [`InterruptController`] one byte per tick, so a burst of
//! keystrokes between ticks is never silently dropped by the controller's per-tick
//! `waiting` reset (§5).

use crate::interrupt::{Interrupt, InterruptController};
use sim_core::Byte;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct Keyboard {
    inbox: VecDeque<Byte>,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the host whenever a keystroke arrives.
    pub fn publish(&mut self, byte: Byte) {
        self.inbox.push_back(byte);
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.inbox.is_empty()
    }

    /// Drain at most one queued keystroke into an interrupt accepted by `controller`.
    pub fn tick(&mut self, controller: &mut InterruptController) {
        if let Some(byte) = self.inbox.pop_front() {
            controller.accept(Interrupt::keyboard(byte));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_one_interrupt_per_tick_even_with_a_burst_queued() {
        let mut keyboard = Keyboard::new();
        let mut controller = InterruptController::new();
        keyboard.publish(Byte(b'a'));
        keyboard.publish(Byte(b'b'));

        keyboard.tick(&mut controller);
        assert_eq!(controller.select_winner_for_test().unwrap().data, Byte(b'a'));

        controller.clear();
        keyboard.tick(&mut controller);
        assert_eq!(controller.select_winner_for_test().unwrap().data, Byte(b'b'));

        assert!(!keyboard.has_pending());
    }
}
