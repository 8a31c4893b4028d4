#![warn(missing_docs)]
//! Episodic experience replay memory for reinforcement learning.
//!
//! The memory stores whole episodes of experiences whose structure is given by a
//! nested [`Schema`], and samples batches in (state, action, reward, next state)
//! form. Array storage is abstracted by [`ArrayStore`]; see the `epimem-ndarray`
//! crate for an implementation.
pub mod error;
pub mod episodic_memory;

mod base;
pub use base::{ArrayStore, BatchIndex, ExperienceBufferBase, ReplayBufferBase, SliceIndex};

mod schema;
pub use schema::{DType, LeafSpec, Schema, MANDATORY_KEYS, RESERVED_KEYS};

mod tree;
pub use tree::Tree;

pub use episodic_memory::{
    CursorState, Episode, EpisodicMemory, EpisodicMemoryConfig, SarsBatch, UniformSampler,
};
pub use error::MemoryError;
