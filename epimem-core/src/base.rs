//! Core interfaces.
mod array_store;
mod replay_buffer;
pub use array_store::{ArrayStore, BatchIndex, SliceIndex};
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
