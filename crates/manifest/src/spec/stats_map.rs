// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Map view over the `(key, value)` arrays that hold per-column statistics.
//!
//! Manifests store `column_sizes`, `value_counts`, bounds and friends as
//! arrays of key/value records. Decoding keeps that array as is; the hash
//! index used for lookups is built on the first lookup and reused after.
//! Wide tables carry thousands of columns while planning usually touches a
//! few of them, so iteration and `len` never build the index.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use once_cell::sync::OnceCell;

/// Read-only map over an ordered sequence of `(key, value)` pairs.
///
/// When a key occurs more than once, lookups return the last occurrence.
/// Manifest writers and readers reject such maps, see
/// [`StatsMap::first_duplicate_key`].
#[derive(Clone)]
pub struct StatsMap<K, V> {
    entries: Vec<(K, V)>,
    index: OnceCell<HashMap<K, usize>>,
}

impl<K, V> StatsMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: OnceCell::new(),
        }
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates pairs in stored order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in stored order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// The pairs as stored.
    pub fn as_slice(&self) -> &[(K, V)] {
        &self.entries
    }

    /// Whether the lookup index has been built.
    pub fn is_materialized(&self) -> bool {
        self.index.get().is_some()
    }

    /// Consumes the map, returning its pairs in stored order.
    pub fn into_inner(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K: Eq + Hash + Clone, V> StatsMap<K, V> {
    fn index(&self) -> &HashMap<K, usize> {
        self.index.get_or_init(|| {
            self.entries
                .iter()
                .enumerate()
                .map(|(pos, (k, _))| (k.clone(), pos))
                .collect()
        })
    }

    /// Looks up the value of `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.index().get(key).map(|pos| &self.entries[*pos].1)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index().contains_key(key)
    }

    /// First key, in stored order, that occurs more than once.
    ///
    /// Scans the pairs directly and leaves the lookup index untouched.
    pub fn first_duplicate_key(&self) -> Option<&K> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries
            .iter()
            .map(|(k, _)| k)
            .find(|k| !seen.insert(*k))
    }
}

impl<K, V> Default for StatsMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for StatsMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Ord, V> StatsMap<K, V> {
    /// Pairs ordered by key; pairs of a repeated key keep their stored order.
    fn sorted_pairs(&self) -> Vec<&(K, V)> {
        let mut pairs: Vec<_> = self.entries.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

/// Maps are equal when they hold the same pairs, in any order.
impl<K: Ord, V: PartialEq> PartialEq for StatsMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .sorted_pairs()
                .into_iter()
                .zip(other.sorted_pairs())
                .all(|(a, b)| a == b)
    }
}

impl<K: Ord, V: Eq> Eq for StatsMap<K, V> {}

impl<K, V> From<Vec<(K, V)>> for StatsMap<K, V> {
    fn from(entries: Vec<(K, V)>) -> Self {
        Self {
            entries,
            index: OnceCell::new(),
        }
    }
}

impl<K: Ord, V> From<HashMap<K, V>> for StatsMap<K, V> {
    /// Pairs are sorted by key so that encoded files are deterministic.
    fn from(map: HashMap<K, V>) -> Self {
        let mut entries: Vec<(K, V)> = map.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for StatsMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        Vec::from(arr).into()
    }
}

impl<K, V> FromIterator<(K, V)> for StatsMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<K, V> IntoIterator for StatsMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
