//! Uniform sampling of experience indices.
use crate::{
    error::{MemoryError, Result},
    BatchIndex,
};
use log::trace;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Draws `(episode, step)` pairs uniformly at random.
///
/// A SARS batch reads the state of each sampled experience from the preceding
/// step of the same episode. The sampler therefore never returns step 0 of an
/// episode, and never returns episode slot 0, which is treated as having no
/// predecessor either:
///
/// * `episode` is uniform in `[1, used_size)`;
/// * `step` is `1 + floor((episode_length - 1) * u)` with `u` uniform in `[0, 1)`,
///   i.e. uniform in `[1, episode_length - 1]`.
///
/// An episode of length 1 has no step satisfying this; the formula then yields
/// step 1, past the end of the episode.
pub struct UniformSampler {
    rng: StdRng,
}

impl UniformSampler {
    /// Creates a sampler with a seeded random number generator.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Samples `batch_size` indices.
    ///
    /// `episode_length[i]` is the length of the episode in slot `i`.
    ///
    /// # Errors
    ///
    /// [`MemoryError::SamplingError`] if `batch_size` is zero or larger than
    /// `used_size`, or if `used_size < 2`, in which case no slot other than the
    /// excluded slot 0 holds an episode.
    pub fn sample(
        &mut self,
        batch_size: usize,
        used_size: usize,
        episode_length: &[usize],
    ) -> Result<Vec<BatchIndex>> {
        if batch_size == 0 {
            return Err(MemoryError::SamplingError(
                "Batch size must be positive.".to_string(),
            ));
        }
        if used_size < 2 {
            return Err(MemoryError::SamplingError(format!(
                "Memory contains {} episodes; at least 2 are required since episode 0 is never sampled.",
                used_size
            )));
        }
        if batch_size > used_size {
            return Err(MemoryError::SamplingError(format!(
                "Requested memory batch of size {} can not be sampled: memory contains {} episodes.",
                batch_size, used_size
            )));
        }

        let episodes = (0..batch_size)
            .map(|_| self.rng.gen_range(1..used_size))
            .collect::<Vec<_>>();

        let lengths = episodes
            .iter()
            .map(|&e| {
                episode_length
                    .get(e)
                    .copied()
                    .ok_or(MemoryError::IndexError {
                        index: e,
                        bound: episode_length.len().saturating_sub(1),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let ixs = episodes
            .into_iter()
            .zip(lengths.into_iter())
            .map(|(episode, length)| {
                let u: f64 = self.rng.gen();
                let step = 1 + (length.saturating_sub(1) as f64 * u).floor() as usize;
                BatchIndex::new(episode, step)
            })
            .collect::<Vec<_>>();

        trace!("Sampled indices {:?}", ixs);
        Ok(ixs)
    }
}
