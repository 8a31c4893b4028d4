//! Values returned by queries and sampling.
use crate::{BatchIndex, Tree};

/// A single episode read from the memory.
#[derive(Clone, Debug, PartialEq)]
pub struct Episode<A> {
    /// Rows `0..episode_length` of every field.
    pub fields: Tree<A>,

    /// Length of the episode recorded in its slot.
    pub episode_length: usize,
}

impl<A> Episode<A> {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.episode_length
    }

    /// Returns `true` if the episode has no step.
    pub fn is_empty(&self) -> bool {
        self.episode_length == 0
    }

    /// The field at a slash-joined path.
    pub fn get(&self, path: &str) -> Option<&Tree<A>> {
        self.fields.get_path(path)
    }
}

/// A batch of experiences in (state, action, reward, next state) form.
///
/// `fields` has every top-level field of the schema, gathered at the sampled
/// indices, plus `state`: the `state_next` subtree gathered one step earlier.
/// Every leaf has shape `[batch_size, *dims]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SarsBatch<A> {
    /// Batched fields.
    pub fields: Tree<A>,

    /// Indices of sampled experiences.
    pub ix_sample: Vec<BatchIndex>,
}

impl<A> SarsBatch<A> {
    /// Number of experiences.
    pub fn len(&self) -> usize {
        self.ix_sample.len()
    }

    /// Returns `true` if the batch has no experience.
    pub fn is_empty(&self) -> bool {
        self.ix_sample.is_empty()
    }

    /// The field at a slash-joined path.
    pub fn get(&self, path: &str) -> Option<&Tree<A>> {
        self.fields.get_path(path)
    }

    /// States, taken from `state_next` of the preceding steps.
    pub fn state(&self) -> Option<&Tree<A>> {
        self.fields.get("state")
    }

    /// Actions.
    pub fn action(&self) -> Option<&Tree<A>> {
        self.fields.get("action")
    }

    /// Rewards.
    pub fn reward(&self) -> Option<&Tree<A>> {
        self.fields.get("reward")
    }

    /// Done flags.
    pub fn done(&self) -> Option<&Tree<A>> {
        self.fields.get("done")
    }

    /// Next states.
    pub fn state_next(&self) -> Option<&Tree<A>> {
        self.fields.get("state_next")
    }

    /// Decomposes the batch into its fields and sample indices.
    pub fn unpack(self) -> (Tree<A>, Vec<BatchIndex>) {
        (self.fields, self.ix_sample)
    }
}
