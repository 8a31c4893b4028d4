//! Configuration of [`EpisodicMemory`](super::EpisodicMemory).
use crate::{
    error::{MemoryError, Result},
    Schema,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

fn default_max_total_experiences() -> usize {
    100_000
}

fn default_batch_size() -> usize {
    32
}

fn default_seed() -> u64 {
    42
}

/// Configuration of [`EpisodicMemory`](super::EpisodicMemory).
///
/// # Examples
///
/// ```rust
/// use epimem_core::{DType, EpisodicMemoryConfig, LeafSpec, Schema, Tree};
///
/// let schema = Schema::new(Tree::group(vec![
///     ("action", Tree::leaf(LeafSpec::f32(&[1]))),
///     ("reward", Tree::leaf(LeafSpec::f32(&[]))),
///     ("done", Tree::leaf(LeafSpec::scalar(DType::Bool))),
///     ("state_next", Tree::leaf(LeafSpec::f32(&[4]))),
/// ]))
/// .unwrap();
///
/// let config = EpisodicMemoryConfig::new(schema, 3)
///     .max_total_experiences(9)
///     .batch_size(2)
///     .seed(7);
/// assert_eq!(config.capacity().unwrap(), 3);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpisodicMemoryConfig {
    /// Structure of an experience.
    pub schema: Schema,

    /// Maximum number of steps of an episode. Longer episodes are split.
    pub max_episode_length: usize,

    /// Maximum number of experiences held by the memory.
    ///
    /// The memory holds `max_total_experiences / max_episode_length` episodes.
    #[serde(default = "default_max_total_experiences")]
    pub max_total_experiences: usize,

    /// Default number of experiences in a sampled batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seed of the random number generator used for sampling.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl EpisodicMemoryConfig {
    /// Creates a configuration with default size, batch size and seed.
    pub fn new(schema: Schema, max_episode_length: usize) -> Self {
        Self {
            schema,
            max_episode_length,
            max_total_experiences: default_max_total_experiences(),
            batch_size: default_batch_size(),
            seed: default_seed(),
        }
    }

    /// Sets the schema.
    ///
    /// # Arguments
    ///
    /// * `schema` - The structure of an experience
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the maximum episode length.
    ///
    /// # Arguments
    ///
    /// * `v` - The new maximum number of steps of an episode
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn max_episode_length(mut self, v: usize) -> Self {
        self.max_episode_length = v;
        self
    }

    /// Sets the maximum number of experiences.
    ///
    /// # Arguments
    ///
    /// * `v` - The new maximum number of experiences held by the memory
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn max_total_experiences(mut self, v: usize) -> Self {
        self.max_total_experiences = v;
        self
    }

    /// Sets the default batch size.
    ///
    /// # Arguments
    ///
    /// * `v` - The new default number of experiences in a batch
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the random seed.
    ///
    /// # Arguments
    ///
    /// * `seed` - The new random seed
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of episode slots, `max_total_experiences / max_episode_length`.
    ///
    /// # Errors
    ///
    /// [`MemoryError::CapacityError`] if the memory could not hold one episode.
    pub fn capacity(&self) -> Result<usize> {
        if self.max_episode_length == 0 {
            return Err(MemoryError::CapacityError(
                "Maximum episode length must be positive.".to_string(),
            ));
        }
        let capacity = self.max_total_experiences / self.max_episode_length;
        if capacity < 1 {
            return Err(MemoryError::CapacityError(format!(
                "Memory maximum size <{}> is smaller than maximum single episode length <{}>.",
                self.max_total_experiences, self.max_episode_length
            )));
        }
        Ok(capacity)
    }

    /// Loads the configuration from a YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if its content is not a
    /// configuration with a valid schema.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the YAML file, overwritten if it exists
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
