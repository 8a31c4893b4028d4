//! Replay buffer interface for reinforcement learning.
//!
//! These traits separate the two sides of a replay buffer: the process that
//! pushes experiences and the process that samples batches for training.

use crate::error::Result;

/// Interface for buffers that store experiences from environments.
///
/// # Examples
///
/// ```ignore
/// fn collect<B: ExperienceBufferBase>(buffer: &mut B, items: Vec<B::Item>) -> Result<()> {
///     for item in items {
///         buffer.push(item)?;
///     }
///     Ok(())
/// }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    ///
    /// # Arguments
    ///
    /// * `tr` - The experience to store
    ///
    /// # Errors
    ///
    /// Returns an error if the experience cannot be stored, e.g. when it does
    /// not match the layout of the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the number of stored units that are available for sampling.
    ///
    /// A unit is whatever the buffer samples from, e.g. a transition or a
    /// whole episode.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is available for sampling.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase: Sized {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration of the buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot produce a usable buffer.
    fn build(config: &Self::Config) -> Result<Self>;

    /// Samples a batch of experiences for training.
    ///
    /// # Arguments
    ///
    /// * `size` - The number of experiences in the batch
    ///
    /// # Returns
    ///
    /// The sampled batch
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not hold enough experiences.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
