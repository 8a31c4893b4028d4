//! Backing storage of committed episodes and of the episode in progress.
use crate::{
    error::{MemoryError, Result},
    ArrayStore, BatchIndex, Schema, SliceIndex, Tree,
};

/// Committed episodes.
///
/// Every leaf of the schema is backed by an array of shape
/// `[capacity, max_episode_length, *dims]`. Slot `i` holds a valid episode in
/// rows `0..episode_length[i]`; rows past the length keep whatever was written
/// there before.
pub struct FieldStore<A: ArrayStore> {
    fields: Tree<A>,
    episode_length: Vec<usize>,
    max_episode_length: usize,
}

impl<A: ArrayStore> FieldStore<A> {
    /// Allocates the arrays of all fields.
    ///
    /// Lengths of never-written slots read as 1.
    pub fn new(schema: &Schema, capacity: usize, max_episode_length: usize) -> Self {
        let fields = schema.tree().map(|spec| {
            A::allocate(&spec.shape_with(&[capacity, max_episode_length]), spec.dtype)
        });
        Self {
            fields,
            episode_length: vec![1; capacity],
            max_episode_length,
        }
    }

    /// Number of episode slots.
    pub fn capacity(&self) -> usize {
        self.episode_length.len()
    }

    /// Lengths of all slots.
    pub fn episode_lengths(&self) -> &[usize] {
        &self.episode_length
    }

    /// Length of the episode in `slot`.
    pub fn episode_length(&self, slot: usize) -> Result<usize> {
        self.episode_length
            .get(slot)
            .copied()
            .ok_or(MemoryError::IndexError {
                index: slot,
                bound: self.capacity().saturating_sub(1),
            })
    }

    /// Copies the first `length` staged rows into `slot`.
    pub fn write_episode(
        &mut self,
        slot: usize,
        staging: &StagingBuffer<A>,
        length: usize,
    ) -> Result<()> {
        if slot >= self.capacity() {
            return Err(MemoryError::IndexError {
                index: slot,
                bound: self.capacity().saturating_sub(1),
            });
        }
        if length == 0 || length > self.max_episode_length {
            return Err(MemoryError::IndexError {
                index: length,
                bound: self.max_episode_length,
            });
        }

        let rows = staging.rows(length)?;
        let index = [SliceIndex::At(slot), SliceIndex::Range(0..length)];
        self.fields
            .try_zip_mut(&rows, |_, array, value| array.write_slice(&index, value))?;
        self.episode_length[slot] = length;
        Ok(())
    }

    /// Rows `0..episode_length[slot]` of every field.
    pub fn episode(&self, slot: usize) -> Result<Tree<A>> {
        let length = self.episode_length(slot)?;
        let index = [SliceIndex::At(slot), SliceIndex::Range(0..length)];
        self.fields.try_map(|_, array| array.read_slice(&index))
    }

    /// The experience at `ix` in every field.
    pub fn experience(&self, ix: BatchIndex) -> Result<Tree<A>> {
        let index = [SliceIndex::At(ix.episode), SliceIndex::At(ix.step)];
        self.fields.try_map(|_, array| array.read_slice(&index))
    }

    /// Experiences at `ixs` in every field, stacked along a new leading axis.
    pub fn gather(&self, ixs: &[BatchIndex]) -> Result<Tree<A>> {
        self.fields.try_map(|_, array| array.gather(ixs))
    }

    /// Like [`FieldStore::gather`], restricted to the top-level field `key`.
    pub fn gather_field(&self, key: &str, ixs: &[BatchIndex]) -> Result<Tree<A>> {
        self.fields
            .get(key)
            .ok_or_else(|| MemoryError::RecordError(format!("no field `{}` in the memory", key)))?
            .try_map(|_, array| array.gather(ixs))
    }
}

/// Scratch storage of the episode in progress.
///
/// Every leaf of the schema is backed by an array of shape
/// `[max_episode_length, *dims]`, overwritten row by row.
pub struct StagingBuffer<A: ArrayStore> {
    fields: Tree<A>,
}

impl<A: ArrayStore> StagingBuffer<A> {
    /// Allocates the arrays of all fields.
    pub fn new(schema: &Schema, max_episode_length: usize) -> Self {
        let fields = schema
            .tree()
            .map(|spec| A::allocate(&spec.shape_with(&[max_episode_length]), spec.dtype));
        Self { fields }
    }

    /// Checks that `record` has the structure, shapes and element types of the
    /// staged fields.
    pub fn check_record(&self, record: &Tree<A>) -> Result<()> {
        self.fields.try_zip(record, |path, buffer, value| {
            let shape = buffer.shape();
            let dims = &shape[1..];
            if value.shape() != dims {
                return Err(MemoryError::RecordError(format!(
                    "field `{}` has shape {:?}, expected {:?}",
                    path,
                    value.shape(),
                    dims
                )));
            }
            if value.dtype() != buffer.dtype() {
                return Err(MemoryError::RecordError(format!(
                    "field `{}` has element type {}, expected {}",
                    path,
                    value.dtype(),
                    buffer.dtype()
                )));
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Writes `record` into row `step`.
    pub fn write_step(&mut self, step: usize, record: &Tree<A>) -> Result<()> {
        let index = [SliceIndex::At(step)];
        self.fields
            .try_zip_mut(record, |_, buffer, value| buffer.write_slice(&index, value))
    }

    /// Rows `0..length` of every field.
    pub fn rows(&self, length: usize) -> Result<Tree<A>> {
        let index = [SliceIndex::Range(0..length)];
        self.fields.try_map(|_, buffer| buffer.read_slice(&index))
    }
}
