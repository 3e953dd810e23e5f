//! The two condition flags this subset implements: Zero and Carry (§3).

use bitflags::bitflags;

bitflags! {
    /// Condition-code flags. Only Z and C exist in this subset (§4.5) — no other
    /// flags are modeled, and ADC deliberately never touches Z (§9).
    #[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Flags: u8 {
        const ZERO = 0b0000_0001;
        const CARRY = 0b0000_0010;
    }
}

impl Flags {
    #[inline]
    pub fn set_zero(&mut self, zero: bool) {
        self.set(Flags::ZERO, zero);
    }

    #[inline]
    pub fn set_carry(&mut self, carry: bool) {
        self.set(Flags::CARRY, carry);
    }

    #[inline]
    #[must_use]
    pub fn zero(self) -> bool {
        self.contains(Flags::ZERO)
    }

    #[inline]
    #[must_use]
    pub fn carry(self) -> bool {
        self.contains(Flags::CARRY)
    }
}
