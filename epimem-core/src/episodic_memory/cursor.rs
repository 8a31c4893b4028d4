//! Bookkeeping of the episode in progress and of the cyclic episode slots.
use serde::{Deserialize, Serialize};

/// Cursor state of an [`EpisodicMemory`](super::EpisodicMemory).
///
/// The state changes only through [`CursorState::advance_step`] while an episode
/// is staged and [`CursorState::advance_commit`] when it is committed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Steps written into the staged episode.
    pub local_step: usize,

    /// Number of slots holding committed episodes that can be sampled.
    pub used_size: usize,

    /// Slot that receives the next committed episode.
    pub write_pointer: usize,

    /// Number of episodes committed so far.
    pub episode_count: usize,
}

impl CursorState {
    /// Creates the initial state `(0, 0, 0, 0)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the length of the staged episode if the step just written at
    /// `local_step` ends it, either by `done` or by reaching `max_episode_length`.
    pub fn completed_length(&self, done: bool, max_episode_length: usize) -> Option<usize> {
        let length = self.local_step + 1;
        if done || length >= max_episode_length {
            Some(length)
        } else {
            None
        }
    }

    /// Moves to the next row of the staged episode.
    pub fn advance_step(&mut self) {
        self.local_step += 1;
    }

    /// Updates the state after an episode was committed at `write_pointer`.
    ///
    /// `used_size` grows while it is below `capacity - 1`, so the number of
    /// sampleable slots saturates one short of the capacity. The write pointer
    /// moves forward and rewinds to 0 once it reaches `used_size` or the last
    /// slot, which keeps it in `[0, min(used_size, capacity - 1)]`. Returns `true`
    /// when the pointer rewound.
    pub fn advance_commit(&mut self, capacity: usize) -> bool {
        if self.used_size + 1 < capacity {
            self.used_size += 1;
        }

        let wrapped =
            self.write_pointer >= self.used_size || self.write_pointer + 1 >= capacity;
        if wrapped {
            self.write_pointer = 0;
        } else {
            self.write_pointer += 1;
        }

        self.local_step = 0;
        self.episode_count += 1;
        wrapped
    }
}
