//! Schema of experience records.
//!
//! A schema is a [`Tree`] of [`LeafSpec`]s. Its top level must contain the
//! mandatory fields [`MANDATORY_KEYS`]; any other field, nested to any depth, is
//! stored alongside them.
//!
//! In YAML a leaf is a mapping with the optional keys `dims` and `dtype`; every
//! other mapping is a group:
//!
//! ```yaml
//! action:
//!   dims: [4]
//!   dtype: u8
//! reward: {}          # scalar f32
//! done:
//!   dtype: bool
//! state_next:
//!   position:
//!     dims: [3]
//! ```
use crate::{
    error::{MemoryError, Result},
    Tree,
};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Fields that must be present at the top level of every schema.
pub const MANDATORY_KEYS: [&str; 4] = ["action", "reward", "done", "state_next"];

/// Top-level names used by the memory itself.
///
/// `episode_length` is the per-slot length array and `state` is synthesized in
/// SARS batches from `state_next`.
pub const RESERVED_KEYS: [&str; 2] = ["episode_length", "state"];

/// Element type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit float, the default.
    F32,
    /// 64-bit float.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// Boolean.
    Bool,
}

impl Default for DType {
    fn default() -> Self {
        DType::F32
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::Bool => "bool",
        };
        write!(f, "{}", s)
    }
}

/// Shape and element type of a single field of an experience.
///
/// `dims` is the shape of one experience's value; an empty `dims` is a scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafSpec {
    /// Shape of the value of a single experience.
    #[serde(default)]
    pub dims: Vec<usize>,

    /// Element type.
    #[serde(default)]
    pub dtype: DType,
}

impl LeafSpec {
    /// Creates a leaf with the given shape and element type.
    pub fn new(dims: &[usize], dtype: DType) -> Self {
        Self {
            dims: dims.to_vec(),
            dtype,
        }
    }

    /// Creates a scalar leaf.
    pub fn scalar(dtype: DType) -> Self {
        Self::new(&[], dtype)
    }

    /// Creates an `f32` leaf.
    pub fn f32(dims: &[usize]) -> Self {
        Self::new(dims, DType::F32)
    }

    /// Returns `leading` followed by the dims of this leaf.
    pub fn shape_with(&self, leading: &[usize]) -> Vec<usize> {
        leading.iter().chain(self.dims.iter()).copied().collect()
    }
}

/// A validated schema.
///
/// A `Schema` can only be obtained through [`Schema::new`] (or deserialization,
/// which runs the same checks), so every value of this type satisfies:
///
/// * the root is a group containing all of [`MANDATORY_KEYS`] and none of [`RESERVED_KEYS`];
/// * `done` is a leaf holding a single element;
/// * every group has at least one child;
/// * names are non-empty and contain no `/`;
/// * every dimension is positive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Tree<LeafSpec>", into = "Tree<LeafSpec>")]
pub struct Schema {
    tree: Tree<LeafSpec>,
}

impl Schema {
    /// Validates `tree` and wraps it as a schema.
    pub fn new(tree: Tree<LeafSpec>) -> Result<Self> {
        if tree.is_leaf() {
            return Err(MemoryError::SchemaError(
                "The top level of a schema must be a group of fields.".to_string(),
            ));
        }
        for key in MANDATORY_KEYS.iter() {
            if !tree.contains_key(key) {
                return Err(MemoryError::SchemaError(format!(
                    "Mandatory key [{}] not found at top level of the schema. Hint: mandatory keys are {:?}.",
                    key, MANDATORY_KEYS
                )));
            }
        }
        for key in RESERVED_KEYS.iter() {
            if tree.contains_key(key) {
                return Err(MemoryError::SchemaError(format!(
                    "Key [{}] is reserved by the memory and cannot be a field.",
                    key
                )));
            }
        }
        match tree.get("done").and_then(Tree::as_leaf) {
            Some(spec) if spec.dims.iter().product::<usize>() == 1 => {}
            _ => {
                return Err(MemoryError::SchemaError(
                    "Field [done] must be a single-element leaf, e.g. a boolean scalar."
                        .to_string(),
                ))
            }
        }
        validate_node(&tree, "")?;
        Ok(Self { tree })
    }

    /// The underlying tree.
    pub fn tree(&self) -> &Tree<LeafSpec> {
        &self.tree
    }

    /// Slash-joined paths of all leaves, in sorted order.
    pub fn leaf_paths(&self) -> Vec<String> {
        self.tree.leaves().into_iter().map(|(p, _)| p).collect()
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.tree.leaves().len()
    }

    /// The leaf at a slash-joined path.
    pub fn leaf(&self, path: &str) -> Option<&LeafSpec> {
        self.tree.get_path(path).and_then(Tree::as_leaf)
    }
}

fn validate_node(node: &Tree<LeafSpec>, path: &str) -> Result<()> {
    match node {
        Tree::Leaf(spec) => {
            if spec.dims.iter().any(|&d| d == 0) {
                return Err(MemoryError::SchemaError(format!(
                    "Field `{}` has a zero dimension in {:?}; dimensions must be positive.",
                    path, spec.dims
                )));
            }
            Ok(())
        }
        Tree::Group(children) => {
            if children.is_empty() {
                return Err(MemoryError::SchemaError(format!(
                    "Group `{}` has no fields.",
                    path
                )));
            }
            for (key, child) in children.iter() {
                if key.is_empty() || key.contains('/') {
                    return Err(MemoryError::SchemaError(format!(
                        "Invalid field name {:?} in group `{}`.",
                        key, path
                    )));
                }
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}/{}", path, key)
                };
                validate_node(child, &child_path)?;
            }
            Ok(())
        }
    }
}

impl TryFrom<Tree<LeafSpec>> for Schema {
    type Error = MemoryError;

    fn try_from(tree: Tree<LeafSpec>) -> Result<Self> {
        Schema::new(tree)
    }
}

impl From<Schema> for Tree<LeafSpec> {
    fn from(schema: Schema) -> Self {
        schema.tree
    }
}
