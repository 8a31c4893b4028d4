//! Episodic replay memory.
use super::{
    CursorState, Episode, EpisodicMemoryConfig, FieldStore, SarsBatch, StagingBuffer,
    UniformSampler,
};
use crate::{
    error::{MemoryError, Result},
    ArrayStore, BatchIndex, ExperienceBufferBase, ReplayBufferBase, Schema, Tree,
};
use log::{debug, info, trace};

/// Sequential and random access replay memory of whole episodes.
///
/// The memory holds `capacity = max_total_experiences / max_episode_length`
/// episode slots. Experiences are pushed one at a time with
/// [`EpisodicMemory::add_experience`] into a staging buffer; an episode is
/// committed to the slot under the write pointer when an experience has its
/// `done` flag set or the episode reaches `max_episode_length` steps.
///
/// Slots are reused cyclically. The number of sampleable slots, `used_size`,
/// grows with each commit up to `capacity - 1`, and the write pointer rewinds to
/// slot 0 once it reaches `used_size`. Point queries accept slots up to and
/// including `used_size`.
///
/// The memory is not synchronized. Sampling indices and gathering the batch for
/// them must not be interleaved with commits; [`EpisodicMemory::sample_batch`]
/// does both in one call.
///
/// # Type Parameters
///
/// * `A` - The array type backing every field, must implement [`ArrayStore`]
pub struct EpisodicMemory<A: ArrayStore> {
    schema: Schema,
    max_episode_length: usize,
    capacity: usize,
    batch_size: usize,
    store: FieldStore<A>,
    staging: StagingBuffer<A>,
    cursor: CursorState,
    sampler: UniformSampler,
    batch_indices: Option<Vec<BatchIndex>>,
}

impl<A: ArrayStore> EpisodicMemory<A> {
    /// Allocates a memory.
    ///
    /// # Errors
    ///
    /// [`MemoryError::CapacityError`] if the memory could not hold a single
    /// episode. The schema is validated when it is constructed.
    pub fn build(config: &EpisodicMemoryConfig) -> Result<Self> {
        let capacity = config.capacity()?;
        let max_episode_length = config.max_episode_length;
        let schema = config.schema.clone();

        let store = FieldStore::new(&schema, capacity, max_episode_length);
        let staging = StagingBuffer::new(&schema, max_episode_length);

        info!(
            "Built episodic memory: {} episodes of up to {} steps, {} fields {:?}",
            capacity,
            max_episode_length,
            schema.num_leaves(),
            schema.leaf_paths()
        );

        Ok(Self {
            schema,
            max_episode_length,
            capacity,
            batch_size: config.batch_size,
            store,
            staging,
            cursor: CursorState::new(),
            sampler: UniformSampler::new(config.seed),
            batch_indices: None,
        })
    }

    /// Writes a single experience into the staging buffer.
    ///
    /// The staged episode is committed if `done` is set in `record` or the
    /// episode reached `max_episode_length` steps.
    ///
    /// # Errors
    ///
    /// [`MemoryError::RecordError`] if `record` does not match the schema. The
    /// memory is left unchanged in that case.
    pub fn add_experience(&mut self, record: &Tree<A>) -> Result<()> {
        self.staging.check_record(record)?;
        let done = record
            .get("done")
            .and_then(Tree::as_leaf)
            .and_then(|value| value.as_flag())
            .ok_or_else(|| {
                MemoryError::RecordError("field `done` must hold a single element".to_string())
            })?;

        let step = self.cursor.local_step;
        self.staging.write_step(step, record)?;
        trace!("Staged experience at step {} (done = {})", step, done);

        match self.cursor.completed_length(done, self.max_episode_length) {
            Some(length) => self.commit_episode(length),
            None => {
                self.cursor.advance_step();
                Ok(())
            }
        }
    }

    /// Same as [`EpisodicMemory::add_experience`].
    pub fn update(&mut self, record: &Tree<A>) -> Result<()> {
        self.add_experience(record)
    }

    /// Commits the first `length` staged steps as an episode.
    ///
    /// The episode is written to the slot under the write pointer, then the
    /// cursor advances and the staging buffer starts a new episode.
    pub fn commit_episode(&mut self, length: usize) -> Result<()> {
        let slot = self.cursor.write_pointer;
        self.store.write_episode(slot, &self.staging, length)?;
        let wrapped = self.cursor.advance_commit(self.capacity);

        debug!(
            "Committed episode {} of {} steps to slot {}; used size = {}, write pointer = {}",
            self.cursor.episode_count, length, slot, self.cursor.used_size, self.cursor.write_pointer
        );
        if wrapped {
            debug!("Write pointer rewound to slot 0");
        }
        Ok(())
    }

    /// Returns the episode in slot `index`.
    ///
    /// # Errors
    ///
    /// [`MemoryError::IndexError`] if `index > used_size`. Slot `used_size`
    /// itself is accepted and may hold an overwritten or never-written episode.
    pub fn get_episode(&self, index: usize) -> Result<Episode<A>> {
        if index > self.cursor.used_size {
            return Err(MemoryError::IndexError {
                index,
                bound: self.cursor.used_size,
            });
        }
        Ok(Episode {
            fields: self.store.episode(index)?,
            episode_length: self.store.episode_length(index)?,
        })
    }

    /// Returns the experience at `step_index` of the episode in `episode_index`.
    ///
    /// Only array bounds are checked; a step past the episode length returns
    /// stale data.
    pub fn get_experience(&self, episode_index: usize, step_index: usize) -> Result<Tree<A>> {
        self.store
            .experience(BatchIndex::new(episode_index, step_index))
    }

    /// Returns the lengths of the episodes in the given slots.
    pub fn get_episode_lengths(&self, indices: &[usize]) -> Result<Vec<usize>> {
        indices
            .iter()
            .map(|&ix| self.store.episode_length(ix))
            .collect()
    }

    /// Gathers experiences at the given indices, in order.
    ///
    /// Every leaf of the result has shape `[indices.len(), *dims]`.
    pub fn gather_batch(&self, indices: &[BatchIndex]) -> Result<Tree<A>> {
        self.store.gather(indices)
    }

    /// Samples `batch_size` indices and keeps them for
    /// [`EpisodicMemory::sample_sars_batch`].
    ///
    /// See [`UniformSampler`] for the distribution.
    ///
    /// # Errors
    ///
    /// [`MemoryError::SamplingError`] if `used_size < 2` or
    /// `batch_size > used_size`.
    pub fn sample_indices(&mut self, batch_size: usize) -> Result<Vec<BatchIndex>> {
        let ixs = self.sampler.sample(
            batch_size,
            self.cursor.used_size,
            self.store.episode_lengths(),
        )?;
        self.batch_indices = Some(ixs.clone());
        Ok(ixs)
    }

    /// Returns the SARS batch for the indices of the last
    /// [`EpisodicMemory::sample_indices`] call.
    pub fn sample_sars_batch(&self) -> Result<SarsBatch<A>> {
        let ixs = self.batch_indices.as_ref().ok_or_else(|| {
            MemoryError::SamplingError("No batch indices have been sampled yet.".to_string())
        })?;
        self.sars_batch(ixs)
    }

    /// Samples a SARS batch of the configured batch size.
    ///
    /// Returns the sampled indices together with the batch.
    pub fn sample_batch(&mut self) -> Result<(Vec<BatchIndex>, SarsBatch<A>)> {
        let ixs = self.sample_indices(self.batch_size)?;
        let batch = self.sars_batch(&ixs)?;
        Ok((ixs, batch))
    }

    fn sars_batch(&self, ixs: &[BatchIndex]) -> Result<SarsBatch<A>> {
        let previous = ixs
            .iter()
            .map(|ix| {
                ix.previous().ok_or_else(|| {
                    MemoryError::SamplingError(format!(
                        "Experience {:?} has no preceding step to take the state from.",
                        ix
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fields = self.store.gather(ixs)?;
        let state = self.store.gather_field("state_next", &previous)?;
        fields.insert("state", state)?;

        Ok(SarsBatch {
            fields,
            ix_sample: ixs.to_vec(),
        })
    }

    /// Indices of the last sampled batch.
    pub fn sampled_indices(&self) -> Option<&[BatchIndex]> {
        self.batch_indices.as_deref()
    }

    /// Schema of experiences.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of episode slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of steps of an episode.
    pub fn max_episode_length(&self) -> usize {
        self.max_episode_length
    }

    /// Default batch size of [`EpisodicMemory::sample_batch`].
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Snapshot of the cursor state.
    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    /// Number of sampleable episode slots.
    pub fn used_size(&self) -> usize {
        self.cursor.used_size
    }

    /// Slot of the next committed episode.
    pub fn write_pointer(&self) -> usize {
        self.cursor.write_pointer
    }

    /// Number of steps staged for the episode in progress.
    pub fn local_step(&self) -> usize {
        self.cursor.local_step
    }

    /// Number of episodes committed since construction.
    pub fn episode_count(&self) -> usize {
        self.cursor.episode_count
    }

    /// Sets the number of sampleable slots, e.g. when restoring a memory.
    ///
    /// Commits never grow `used_size` past `capacity - 1`, so larger values are
    /// rejected.
    ///
    /// # Errors
    ///
    /// [`MemoryError::CapacityError`] if `value >= capacity`.
    pub fn set_used_size(&mut self, value: usize) -> Result<()> {
        if value >= self.capacity {
            return Err(MemoryError::CapacityError(format!(
                "Used size <{}> must be smaller than the memory capacity <{}>.",
                value, self.capacity
            )));
        }
        self.cursor.used_size = value;
        Ok(())
    }

    /// Sets the slot of the next committed episode, e.g. when restoring a memory.
    ///
    /// # Errors
    ///
    /// [`MemoryError::IndexError`] if `value >= capacity`.
    pub fn set_write_pointer(&mut self, value: usize) -> Result<()> {
        if value >= self.capacity {
            return Err(MemoryError::IndexError {
                index: value,
                bound: self.capacity - 1,
            });
        }
        self.cursor.write_pointer = value;
        Ok(())
    }
}

impl<A: ArrayStore> ExperienceBufferBase for EpisodicMemory<A> {
    type Item = Tree<A>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.add_experience(&tr)
    }

    /// Number of sampleable episodes.
    fn len(&self) -> usize {
        self.cursor.used_size
    }
}

impl<A: ArrayStore> ReplayBufferBase for EpisodicMemory<A> {
    type Config = EpisodicMemoryConfig;
    type Batch = SarsBatch<A>;

    fn build(config: &Self::Config) -> Result<Self> {
        EpisodicMemory::build(config)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.sample_indices(size)?;
        self.sample_sars_batch()
    }
}
