//! Marker trait for values that can index the 64 KiB memory array.

use crate::{Byte, Word};

pub trait Address: Copy {
    fn as_usize(self) -> usize;
}

impl Address for Byte {
    #[inline]
    fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Address for Word {
    #[inline]
    fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Address for usize {
    #[inline]
    fn as_usize(self) -> usize {
        self
    }
}
