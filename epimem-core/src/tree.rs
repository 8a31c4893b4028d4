//! Named, nested trees of values.
//!
//! A [`Tree`] is the single recursive structure of the library. The schema is a
//! `Tree<LeafSpec>`, the field store and the staging buffer are trees of backing
//! arrays, an experience record is a tree of values and so is a sampled batch.
//! All recursive walks go through [`Tree::try_map`], [`Tree::try_zip`] and
//! [`Tree::try_zip_mut`], which report paths of leaves as slash-joined names,
//! e.g. `state_next/external/camera`.
use crate::error::{MemoryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tree whose internal nodes are named groups and whose leaves hold a value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tree<T> {
    /// A leaf value.
    Leaf(T),

    /// A named group of subtrees.
    Group(BTreeMap<String, Tree<T>>),
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", path, key)
    }
}

fn display(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

impl<T> Tree<T> {
    /// Creates a leaf.
    pub fn leaf(value: T) -> Self {
        Tree::Leaf(value)
    }

    /// Creates a group from `(name, subtree)` pairs.
    ///
    /// ```
    /// use epimem_core::Tree;
    ///
    /// let tree = Tree::group(vec![
    ///     ("reward", Tree::leaf(1.0)),
    ///     ("state_next", Tree::group(vec![("x", Tree::leaf(2.0))])),
    /// ]);
    /// assert_eq!(tree.get_path("state_next/x").and_then(Tree::as_leaf), Some(&2.0));
    /// ```
    pub fn group<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Tree<T>)>,
    {
        Tree::Group(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` if the tree is a single leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Tree::Leaf(_))
    }

    /// Returns the value of a leaf.
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Tree::Leaf(v) => Some(v),
            Tree::Group(_) => None,
        }
    }

    /// Returns the direct child `key` of a group.
    pub fn get(&self, key: &str) -> Option<&Tree<T>> {
        match self {
            Tree::Group(children) => children.get(key),
            Tree::Leaf(_) => None,
        }
    }

    /// Returns the subtree at a slash-joined path, e.g. `state_next/position`.
    pub fn get_path(&self, path: &str) -> Option<&Tree<T>> {
        path.split('/')
            .filter(|k| !k.is_empty())
            .try_fold(self, |node, key| node.get(key))
    }

    /// Returns `true` if the group has a direct child `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Names of the direct children, in sorted order. Empty for a leaf.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Tree::Group(children) => children.keys().map(String::as_str).collect(),
            Tree::Leaf(_) => vec![],
        }
    }

    /// Inserts a child into a group, returning the replaced subtree if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Tree<T>) -> Result<Option<Tree<T>>> {
        match self {
            Tree::Group(children) => Ok(children.insert(key.into(), value)),
            Tree::Leaf(_) => Err(MemoryError::RecordError(
                "cannot insert a field into a leaf".to_string(),
            )),
        }
    }

    /// Returns all leaves with their slash-joined paths, in sorted order.
    pub fn leaves(&self) -> Vec<(String, &T)> {
        fn walk<'a, T>(node: &'a Tree<T>, path: &str, out: &mut Vec<(String, &'a T)>) {
            match node {
                Tree::Leaf(v) => out.push((path.to_string(), v)),
                Tree::Group(children) => {
                    for (k, child) in children.iter() {
                        walk(child, &join(path, k), out);
                    }
                }
            }
        }
        let mut out = vec![];
        walk(self, "", &mut out);
        out
    }

    /// Applies `f` to every leaf, preserving the tree shape.
    pub fn map<U, F>(&self, mut f: F) -> Tree<U>
    where
        F: FnMut(&T) -> U,
    {
        fn walk<T, U, F: FnMut(&T) -> U>(node: &Tree<T>, f: &mut F) -> Tree<U> {
            match node {
                Tree::Leaf(v) => Tree::Leaf(f(v)),
                Tree::Group(children) => Tree::Group(
                    children
                        .iter()
                        .map(|(k, child)| (k.clone(), walk(child, f)))
                        .collect(),
                ),
            }
        }
        walk(self, &mut f)
    }

    /// Applies a fallible `f` to every leaf together with its path.
    ///
    /// Stops at the first error.
    pub fn try_map<U, F>(&self, mut f: F) -> Result<Tree<U>>
    where
        F: FnMut(&str, &T) -> Result<U>,
    {
        fn walk<T, U, F>(node: &Tree<T>, path: &str, f: &mut F) -> Result<Tree<U>>
        where
            F: FnMut(&str, &T) -> Result<U>,
        {
            match node {
                Tree::Leaf(v) => Ok(Tree::Leaf(f(path, v)?)),
                Tree::Group(children) => {
                    let mut out = BTreeMap::new();
                    for (k, child) in children.iter() {
                        out.insert(k.clone(), walk(child, &join(path, k), f)?);
                    }
                    Ok(Tree::Group(out))
                }
            }
        }
        walk(self, "", &mut f)
    }

    /// Walks two trees of identical structure, combining their leaves with `f`.
    ///
    /// `other` must have exactly the groups and leaves of `self`; a missing field,
    /// an unexpected field or a leaf standing where a group is expected (or the
    /// reverse) is reported as [`MemoryError::RecordError`].
    pub fn try_zip<U, V, F>(&self, other: &Tree<U>, mut f: F) -> Result<Tree<V>>
    where
        F: FnMut(&str, &T, &U) -> Result<V>,
    {
        fn walk<T, U, V, F>(a: &Tree<T>, b: &Tree<U>, path: &str, f: &mut F) -> Result<Tree<V>>
        where
            F: FnMut(&str, &T, &U) -> Result<V>,
        {
            match (a, b) {
                (Tree::Leaf(x), Tree::Leaf(y)) => Ok(Tree::Leaf(f(path, x, y)?)),
                (Tree::Group(xs), Tree::Group(ys)) => {
                    check_keys(xs, ys, path)?;
                    let mut out = BTreeMap::new();
                    for (k, x) in xs.iter() {
                        let p = join(path, k);
                        // Presence is guaranteed by check_keys().
                        if let Some(y) = ys.get(k) {
                            out.insert(k.clone(), walk(x, y, &p, f)?);
                        }
                    }
                    Ok(Tree::Group(out))
                }
                _ => Err(mismatch(path)),
            }
        }
        walk(self, other, "", &mut f)
    }

    /// Walks two trees of identical structure, mutating the leaves of `self`.
    ///
    /// Structure is checked as in [`Tree::try_zip`]; leaves visited before an
    /// error stay mutated.
    pub fn try_zip_mut<U, F>(&mut self, other: &Tree<U>, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &mut T, &U) -> Result<()>,
    {
        fn walk<T, U, F>(a: &mut Tree<T>, b: &Tree<U>, path: &str, f: &mut F) -> Result<()>
        where
            F: FnMut(&str, &mut T, &U) -> Result<()>,
        {
            match (a, b) {
                (Tree::Leaf(x), Tree::Leaf(y)) => f(path, x, y),
                (Tree::Group(xs), Tree::Group(ys)) => {
                    check_keys(xs, ys, path)?;
                    for (k, x) in xs.iter_mut() {
                        let p = join(path, k);
                        if let Some(y) = ys.get(k) {
                            walk(x, y, &p, f)?;
                        }
                    }
                    Ok(())
                }
                _ => Err(mismatch(path)),
            }
        }
        walk(self, other, "", &mut f)
    }
}

fn check_keys<T, U>(
    xs: &BTreeMap<String, Tree<T>>,
    ys: &BTreeMap<String, Tree<U>>,
    path: &str,
) -> Result<()> {
    if let Some(k) = xs.keys().find(|k| !ys.contains_key(*k)) {
        return Err(MemoryError::RecordError(format!(
            "missing field `{}`",
            join(path, k)
        )));
    }
    if let Some(k) = ys.keys().find(|k| !xs.contains_key(*k)) {
        return Err(MemoryError::RecordError(format!(
            "unexpected field `{}`",
            join(path, k)
        )));
    }
    Ok(())
}

fn mismatch(path: &str) -> MemoryError {
    MemoryError::RecordError(format!(
        "field `{}` does not match the schema structure",
        display(path)
    ))
}

#[cfg(test)]
mod tests {
    use super::Tree;
    use crate::error::MemoryError;
    use test_log::test;

    fn sample() -> Tree<i32> {
        Tree::group(vec![
            ("reward", Tree::leaf(1)),
            (
                "state_next",
                Tree::group(vec![("a", Tree::leaf(2)), ("b", Tree::leaf(3))]),
            ),
        ])
    }

    #[test]
    fn test_leaves_are_sorted_with_paths() {
        let tree = sample();
        let leaves = tree
            .leaves()
            .into_iter()
            .map(|(p, v)| (p, *v))
            .collect::<Vec<_>>();
        assert_eq!(
            leaves,
            vec![
                ("reward".to_string(), 1),
                ("state_next/a".to_string(), 2),
                ("state_next/b".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_try_map_passes_paths() {
        let tree = sample();
        let paths = tree.try_map(|p, _| Ok(p.to_string())).unwrap();
        assert_eq!(
            paths.get_path("state_next/b").and_then(Tree::as_leaf),
            Some(&"state_next/b".to_string())
        );
    }

    #[test]
    fn test_try_zip_reports_missing_and_unexpected_fields() {
        let tree = sample();
        let missing = Tree::group(vec![(
            "state_next",
            Tree::group(vec![("a", Tree::leaf(0)), ("b", Tree::leaf(0))]),
        )]);
        let err = tree.try_zip(&missing, |_, x, y| Ok(x + y)).unwrap_err();
        assert_eq!(
            err,
            MemoryError::RecordError("missing field `reward`".to_string())
        );

        let mut extra = sample();
        extra.insert("bonus", Tree::leaf(0)).unwrap();
        let err = tree.try_zip(&extra, |_, x, y| Ok(x + y)).unwrap_err();
        assert_eq!(
            err,
            MemoryError::RecordError("unexpected field `bonus`".to_string())
        );

        let flat = Tree::group(vec![("reward", Tree::leaf(0)), ("state_next", Tree::leaf(0))]);
        assert!(tree.try_zip(&flat, |_, x, y| Ok(x + y)).is_err());
    }

    #[test]
    fn test_try_zip_mut_updates_leaves() {
        let mut tree = sample();
        tree.try_zip_mut(&sample(), |_, x, y| {
            *x += y;
            Ok(())
        })
        .unwrap();
        assert_eq!(tree, sample().map(|v| v * 2));
    }

    #[test]
    fn test_insert_into_leaf_fails() {
        let mut leaf = Tree::leaf(1);
        assert!(leaf.insert("x", Tree::leaf(2)).is_err());
    }
}
