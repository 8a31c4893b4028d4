//! Episodic replay memory.
//!
//! The memory stores whole episodes of experiences in a fixed number of slots and
//! overwrites slots cyclically once they are all in use. Experiences are records
//! whose structure is given by a [`Schema`](crate::Schema); every leaf of the
//! schema is backed by its own [`ArrayStore`](crate::ArrayStore).
//!
//! # Key Components
//!
//! - [`EpisodicMemory`]: ingestion, commit, point queries and sampling
//! - [`EpisodicMemoryConfig`]: construction parameters, loadable from YAML
//! - [`CursorState`]: step, size and write pointer bookkeeping
//! - [`UniformSampler`]: draws `(episode, step)` pairs with a valid preceding step
//! - [`FieldStore`], [`StagingBuffer`]: committed episodes and the episode in progress
//! - [`Episode`], [`SarsBatch`]: values returned by queries and sampling
//!
//! # Examples
//!
//! ```ignore
//! use epimem_core::{EpisodicMemory, EpisodicMemoryConfig};
//!
//! let config = EpisodicMemoryConfig::new(schema, 200)
//!     .max_total_experiences(100_000)
//!     .batch_size(32);
//! let mut memory = EpisodicMemory::<TypedArray>::build(&config)?;
//!
//! for record in experiences {
//!     memory.add_experience(&record)?;
//! }
//!
//! let (indices, batch) = memory.sample_batch()?;
//! let state = batch.state();
//! ```
mod base;
mod batch;
mod config;
mod cursor;
mod sampler;
mod store;
pub use base::EpisodicMemory;
pub use batch::{Episode, SarsBatch};
pub use config::EpisodicMemoryConfig;
pub use cursor::CursorState;
pub use sampler::UniformSampler;
pub use store::{FieldStore, StagingBuffer};
