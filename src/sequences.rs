//! Sequence storage and segment-to-node translation.
//!
//! A [`SequenceStore`] maps node identifiers to their sequences. It works in
//! one of two modes, fixed at the first write: in direct mode the segment
//! names already are node identifiers, while in translated mode every
//! segment is assigned a fresh contiguous range of node identifiers, with
//! over-long sequences split into chunks. Node identifier 0 is reserved.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Error, ErrorKind};
use std::io;

use simple_sds::serialize::Serialize;

use crate::serialize::{load_string, serialize_string, string_size};

/// Storage mode of a [`SequenceStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StoreMode {
    Unset,
    Direct,
    Translated,
}

/// Node sequences, with an optional segment-name translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceStore {
    pub(crate) mode: StoreMode,
    /// Node sequences keyed by node identifier. In translated mode each
    /// entry is one chunk of a segment, keyed by the chunk's node id.
    pub(crate) nodes: BTreeMap<u64, Vec<u8>>,
    /// Segment names in source order with their node ranges (translated
    /// mode only).
    pub(crate) segments: Vec<(String, u64, u64)>,
    /// Segment name to `[first, limit)` (translated mode only).
    pub(crate) translation: HashMap<String, (u64, u64)>,
    /// The next unassigned node identifier in translated mode. Assigned
    /// ranges are disjoint and cover `[1, next_id)` contiguously.
    pub(crate) next_id: u64,
}

impl SequenceStore {
    pub fn new() -> Self {
        SequenceStore {
            mode: StoreMode::Unset,
            nodes: BTreeMap::new(),
            segments: Vec::new(),
            translation: HashMap::new(),
            next_id: 1,
        }
    }

    /// Stores a sequence under a node identifier taken directly from the
    /// segment name.
    ///
    /// # Panics
    ///
    /// Panics if the store already uses translation or if `id` is 0.
    pub fn add_node(&mut self, id: u64, sequence: &[u8]) {
        assert!(
            self.mode != StoreMode::Translated,
            "cannot add a node directly to a store that uses translation"
        );
        assert!(id != 0, "node identifier 0 is reserved");
        self.mode = StoreMode::Direct;
        self.nodes.insert(id, sequence.to_vec());
    }

    /// Assigns a fresh range of node identifiers to the segment and stores
    /// the sequence in chunks of at most `max_length` bases, laid out in
    /// forward orientation. Returns the assigned range `[first, limit)`.
    ///
    /// # Panics
    ///
    /// Panics if the store already stores nodes directly, or if `max_length`
    /// is 0.
    pub fn translate_segment(&mut self, name: &str, sequence: &[u8], max_length: usize) -> (u64, u64) {
        assert!(
            self.mode != StoreMode::Direct,
            "cannot translate a segment in a store with direct node ids"
        );
        assert!(max_length > 0, "maximum node length must be positive");
        self.mode = StoreMode::Translated;

        let first = self.next_id;
        let mut start = 0;
        while start < sequence.len() {
            let end = start.saturating_add(max_length).min(sequence.len());
            self.nodes.insert(self.next_id, sequence[start..end].to_vec());
            self.next_id += 1;
            start = end;
        }
        let limit = self.next_id;

        self.segments.push((name.to_string(), first, limit));
        self.translation.insert(name.to_string(), (first, limit));
        (first, limit)
    }

    /// Returns `true` if the store maps segment names to node ranges.
    pub fn uses_translation(&self) -> bool {
        self.mode == StoreMode::Translated
    }

    /// Returns the node range assigned to the segment name, if any.
    pub fn get_translation(&self, name: &str) -> Option<(u64, u64)> {
        self.translation.get(name).copied()
    }

    /// Number of nodes in the store.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of segments in the store.
    pub fn segment_count(&self) -> usize {
        if self.uses_translation() {
            self.segments.len()
        } else {
            self.nodes.len()
        }
    }

    /// The sequence of a node.
    pub fn sequence(&self, id: u64) -> Option<&[u8]> {
        self.nodes.get(&id).map(Vec::as_slice)
    }

    /// Length of the sequence of a node, or 0 if there is no such node.
    pub fn sequence_len(&self, id: u64) -> usize {
        self.nodes.get(&id).map_or(0, Vec::len)
    }

    /// Iterates over `(node id, sequence)` in ascending node order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (u64, &[u8])> {
        self.nodes.iter().map(|(id, seq)| (*id, seq.as_slice()))
    }

    /// Iterates over the segments as `(name, first, limit)`: in translated
    /// mode in source order, in direct mode one single-node segment per node
    /// in ascending node order. Stops early if the callback returns `false`.
    pub fn for_each_segment(&self, mut segment: impl FnMut(&str, u64, u64) -> bool) {
        if self.uses_translation() {
            for (name, first, limit) in &self.segments {
                if !segment(name, *first, *limit) {
                    return;
                }
            }
        } else {
            for &id in self.nodes.keys() {
                if !segment(&id.to_string(), id, id + 1) {
                    return;
                }
            }
        }
    }
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for SequenceStore {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        let mode = match self.mode {
            StoreMode::Unset => 0usize,
            StoreMode::Direct => 1,
            StoreMode::Translated => 2,
        };
        mode.serialize(writer)
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.nodes.len().serialize(writer)?;
        for (id, sequence) in &self.nodes {
            (*id as usize).serialize(writer)?;
            sequence.serialize(writer)?;
        }
        if self.uses_translation() {
            self.segments.len().serialize(writer)?;
            for (name, first, limit) in &self.segments {
                serialize_string(name, writer)?;
                (*first as usize).serialize(writer)?;
                (*limit as usize).serialize(writer)?;
            }
            (self.next_id as usize).serialize(writer)?;
        }
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let mode = match usize::load(reader)? {
            0 => StoreMode::Unset,
            1 => StoreMode::Direct,
            2 => StoreMode::Translated,
            mode => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("SequenceStore: invalid mode {}", mode),
                ))
            }
        };

        let mut store = SequenceStore::new();
        store.mode = mode;
        let nodes = usize::load(reader)?;
        for _ in 0..nodes {
            let id = usize::load(reader)? as u64;
            let sequence = Vec::<u8>::load(reader)?;
            store.nodes.insert(id, sequence);
        }

        if mode == StoreMode::Translated {
            let segments = usize::load(reader)?;
            for _ in 0..segments {
                let name = load_string(reader)?;
                let first = usize::load(reader)? as u64;
                let limit = usize::load(reader)? as u64;
                store.segments.push((name.clone(), first, limit));
                store.translation.insert(name, (first, limit));
            }
            store.next_id = usize::load(reader)? as u64;
        }
        Ok(store)
    }

    fn size_in_elements(&self) -> usize {
        let mut result = 2;
        for sequence in self.nodes.values() {
            result += 1 + sequence.size_in_elements();
        }
        if self.uses_translation() {
            result += 2;
            for (name, _, _) in &self.segments {
                result += string_size(name) + 2;
            }
        }
        result
    }
}

/// A graph with a node set but no topology. Path indexing only needs to
/// know which nodes exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmptyGraph {
    nodes: BTreeSet<u64>,
}

impl EmptyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph.
    pub fn create_node(&mut self, id: u64) {
        self.nodes.insert(id);
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the node exists.
    pub fn has_node(&self, id: u64) -> bool {
        self.nodes.contains(&id)
    }

    /// Smallest node identifier, if any.
    pub fn min_node_id(&self) -> Option<u64> {
        self.nodes.iter().next().copied()
    }

    /// Largest node identifier, if any.
    pub fn max_node_id(&self) -> Option<u64> {
        self.nodes.iter().next_back().copied()
    }
}
