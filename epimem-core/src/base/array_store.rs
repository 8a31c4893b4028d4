//! Interface of typed-array backends.
//!
//! The memory never touches array data directly. Every field of the field store
//! and of the staging buffer is an [`ArrayStore`], and the memory issues only the
//! operations of this trait against it.
use crate::{error::Result, DType};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, ops::Range};

/// Selector of one leading axis of an array.
///
/// An index spec is a list of selectors applied to the leading axes in order;
/// the remaining trailing axes are taken whole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SliceIndex {
    /// Selects a single position and removes the axis.
    At(usize),

    /// Selects a range of positions and keeps the axis.
    Range(Range<usize>),
}

/// Position of an experience in the memory: an episode slot and a step in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchIndex {
    /// Episode slot.
    pub episode: usize,

    /// Step within the episode.
    pub step: usize,
}

impl BatchIndex {
    /// Creates an index.
    pub fn new(episode: usize, step: usize) -> Self {
        Self { episode, step }
    }

    /// The index of the preceding step in the same episode, if any.
    pub fn previous(&self) -> Option<Self> {
        self.step.checked_sub(1).map(|step| Self {
            episode: self.episode,
            step,
        })
    }
}

impl From<(usize, usize)> for BatchIndex {
    fn from((episode, step): (usize, usize)) -> Self {
        Self::new(episode, step)
    }
}

/// A typed n-dimensional array used as backing storage of a field.
///
/// The same type represents stored arrays and the values read from or written
/// to them, e.g. one experience's value of a field or a gathered batch.
///
/// Out-of-bounds selectors and shape or type mismatches must be reported as
/// [`MemoryError::BackendError`](crate::MemoryError::BackendError), not by
/// panicking.
///
/// # Examples
///
/// ```ignore
/// // A field of dims [4] in a memory of 10 episodes of at most 5 steps:
/// let mut store = A::allocate(&[10, 5, 4], DType::F32);
///
/// // Rows 0..3 of episode 2, shape [3, 4]:
/// let rows = store.read_slice(&[SliceIndex::At(2), SliceIndex::Range(0..3)])?;
///
/// // Experience (1, 4) and (2, 0), shape [2, 4]:
/// let batch = store.gather(&[BatchIndex::new(1, 4), BatchIndex::new(2, 0)])?;
/// ```
pub trait ArrayStore: Clone + Debug + Sized {
    /// Allocates a zero-filled array.
    fn allocate(shape: &[usize], dtype: DType) -> Self;

    /// Element type.
    fn dtype(&self) -> DType;

    /// Shape.
    fn shape(&self) -> Vec<usize>;

    /// Reads a slice as a new array.
    fn read_slice(&self, index: &[SliceIndex]) -> Result<Self>;

    /// Overwrites a slice with `value`, whose shape must equal the slice shape.
    fn write_slice(&mut self, index: &[SliceIndex], value: &Self) -> Result<()>;

    /// Gathers elements at `(episode, step)` positions of the first two axes.
    ///
    /// The result has shape `[ixs.len(), *trailing_dims]`, in the order of `ixs`.
    fn gather(&self, ixs: &[BatchIndex]) -> Result<Self>;

    /// Truth value of a single-element array; `None` for any other size.
    fn as_flag(&self) -> Option<bool>;
}
