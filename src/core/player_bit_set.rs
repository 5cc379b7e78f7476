use std::fmt;

use serde::{Deserialize, Serialize};

/// A compact set of seat indices. Used for the active, all-in and
/// needs-action sets of a hand. Seats above 15 are not representable.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerBitSet {
    set: u16,
}

impl fmt::Debug for PlayerBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

impl PlayerBitSet {
    /// Create a set with seats `0..num_players` enabled.
    pub fn new(num_players: usize) -> Self {
        let set = if num_players >= 16 {
            u16::MAX
        } else {
            (1u16 << num_players) - 1
        };
        Self { set }
    }

    pub fn from_seats(seats: impl IntoIterator<Item = usize>) -> Self {
        let mut s = Self::default();
        for seat in seats {
            s.enable(seat);
        }
        s
    }

    pub fn count(&self) -> usize {
        self.set.count_ones() as usize
    }

    pub fn empty(&self) -> bool {
        self.set == 0
    }

    pub fn enable(&mut self, idx: usize) {
        if idx < 16 {
            self.set |= 1 << idx;
        }
    }

    pub fn disable(&mut self, idx: usize) {
        if idx < 16 {
            self.set &= !(1 << idx);
        }
    }

    pub fn get(&self, idx: usize) -> bool {
        idx < 16 && (self.set & (1 << idx)) != 0
    }

    /// Iterate the enabled seats in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..16).filter(move |i| self.get(*i))
    }

    /// Seats in `self` that are not in `other`.
    pub fn difference(&self, other: PlayerBitSet) -> PlayerBitSet {
        PlayerBitSet {
            set: self.set & !other.set,
        }
    }
}
