#![warn(missing_docs)]
//! [`ndarray`] backend of the episodic replay memory.
//!
//! Every field of the memory is backed by a [`TypedArray`], an `ndarray::ArrayD`
//! of one of the element types of [`DType`].
//!
//! ```
//! use epimem_ndarray::{
//!     DType, EpisodicMemoryConfig, LeafSpec, NdarrayMemory, NdarrayRecord, Schema, Tree,
//!     TypedArray,
//! };
//!
//! let schema = Schema::new(Tree::group(vec![
//!     ("action", Tree::leaf(LeafSpec::new(&[], DType::I64))),
//!     ("reward", Tree::leaf(LeafSpec::f32(&[]))),
//!     ("done", Tree::leaf(LeafSpec::scalar(DType::Bool))),
//!     ("state_next", Tree::leaf(LeafSpec::f32(&[2]))),
//! ]))
//! .unwrap();
//! let config = EpisodicMemoryConfig::new(schema, 4).max_total_experiences(16);
//! let mut memory = NdarrayMemory::build(&config).unwrap();
//!
//! let record: NdarrayRecord = Tree::group(vec![
//!     ("action", Tree::leaf(TypedArray::from(1i64))),
//!     ("reward", Tree::leaf(TypedArray::from(0.5f32))),
//!     ("done", Tree::leaf(TypedArray::from(true))),
//!     ("state_next", Tree::leaf(TypedArray::from(vec![0.1f32, 0.2]))),
//! ]);
//! memory.add_experience(&record).unwrap();
//!
//! assert_eq!(memory.used_size(), 1);
//! assert_eq!(memory.get_episode(0).unwrap().len(), 1);
//! ```
mod typed_array;
pub use typed_array::TypedArray;

pub use epimem_core::{
    error::Result, ArrayStore, BatchIndex, CursorState, DType, Episode, EpisodicMemoryConfig,
    ExperienceBufferBase, LeafSpec, MemoryError, ReplayBufferBase, SarsBatch, Schema, SliceIndex,
    Tree,
};

/// Episodic replay memory backed by [`TypedArray`]s.
pub type NdarrayMemory = epimem_core::EpisodicMemory<TypedArray>;

/// An experience record or a batch of [`TypedArray`]s.
pub type NdarrayRecord = Tree<TypedArray>;

/// A SARS batch of [`TypedArray`]s.
pub type NdarrayBatch = SarsBatch<TypedArray>;
