//! Node encoding and the path index builder.
//!
//! Encoded node positions use the GBWT scheme from [`gbwt::support`]:
//! `2 * id + orientation`, with node identifier 0 reserved as the endmarker.
//! The [`GbwtBuilder`] accepts encoded sequences one path at a time, buffers
//! them, and commits them to dynamic storage in batches;
//! [`GbwtBuilder::finish`] packs the committed sequences into bit-packed
//! [`IntVector`]s and returns the immutable [`GbwtIndex`]. A bidirectional
//! index stores each path in forward orientation and synthesizes the
//! reverse sequence on extraction by reversing the order and flipping the
//! orientations.

use gbwt::{support, Orientation};

use simple_sds::int_vector::IntVector;
use simple_sds::ops::Pack;
use simple_sds::ops::{Access, Vector};
use simple_sds::serialize::Serialize;

use std::io::{Error, ErrorKind};
use std::io;

use crate::metadata::Metadata;

/// Node identifier 0 is reserved for technical purposes and does not exist
/// in the graph.
pub const ENDMARKER: u64 = gbwt::ENDMARKER as u64;

#[inline]
fn orientation(is_reverse: bool) -> Orientation {
    if is_reverse {
        Orientation::Reverse
    } else {
        Orientation::Forward
    }
}

/// Encodes a node identifier and an orientation as a single integer.
#[inline]
pub fn encode_node(id: u64, is_reverse: bool) -> u64 {
    support::encode_node(id as usize, orientation(is_reverse)) as u64
}

/// The node identifier of an encoded position.
#[inline]
pub fn node_id(encoded: u64) -> u64 {
    support::node_id(encoded as usize) as u64
}

/// The orientation of an encoded position.
#[inline]
pub fn node_is_reverse(encoded: u64) -> bool {
    support::node_orientation(encoded as usize) == Orientation::Reverse
}

/// The same node in the opposite orientation.
#[inline]
pub fn flip_node(encoded: u64) -> u64 {
    let id = support::node_id(encoded as usize);
    support::encode_node(id, support::node_orientation(encoded as usize).flip()) as u64
}

/// Sequence identifier of path `id` in the given orientation within a
/// bidirectional index.
#[inline]
pub fn path_to_sequence(id: usize, is_reverse: bool) -> usize {
    2 * id + (is_reverse as usize)
}

/// An immutable index over the paths and walks of a graph.
///
/// The forward sequences are concatenated into a bit-packed integer vector,
/// with a second packed vector giving the start offset of each sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GbwtIndex {
    pub(crate) node_width: usize,
    pub(crate) bidirectional: bool,
    /// Concatenated encoded positions of the forward sequences.
    pub(crate) data: IntVector,
    /// Start offset of each forward sequence in `data`, with a final
    /// sentinel equal to `data.len()`.
    pub(crate) offsets: IntVector,
    pub(crate) max_node: u64,
    pub(crate) metadata: Option<Metadata>,
}

impl GbwtIndex {
    /// Number of paths in the index.
    pub fn paths(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of sequences in the index: two per path when the index is
    /// bidirectional.
    pub fn sequences(&self) -> usize {
        if self.bidirectional {
            2 * self.paths()
        } else {
            self.paths()
        }
    }

    /// Total length of the sequences in the index.
    pub fn len(&self) -> usize {
        if self.bidirectional {
            2 * self.data.len()
        } else {
            self.data.len()
        }
    }

    /// Returns `true` if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the index stores both orientations of every path.
    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    /// Width of an encoded position in bits, as requested at construction.
    pub fn node_width(&self) -> usize {
        self.node_width
    }

    /// Size of the alphabet of encoded positions.
    pub fn alphabet_size(&self) -> u64 {
        if self.max_node == 0 {
            1
        } else {
            encode_node(self.max_node, true) + 1
        }
    }

    /// Returns `true` if the node identifier may occur in the index.
    pub fn has_node(&self, id: u64) -> bool {
        id != ENDMARKER && id <= self.max_node
    }

    /// Largest node identifier occurring in the index.
    pub fn max_node(&self) -> u64 {
        self.max_node
    }

    /// The metadata attached to the index, if any.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// The forward sequence of path `id`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such path.
    pub fn forward_path(&self, id: usize) -> Vec<u64> {
        let start = self.offsets.get(id) as usize;
        let limit = self.offsets.get(id + 1) as usize;
        (start..limit).map(|offset| self.data.get(offset)).collect()
    }

    /// Extracts sequence `sequence` as encoded positions. In a
    /// bidirectional index, even identifiers are forward paths and odd
    /// identifiers are the corresponding reverse sequences.
    ///
    /// # Panics
    ///
    /// Panics if there is no such sequence.
    pub fn extract(&self, sequence: usize) -> Vec<u64> {
        if !self.bidirectional {
            return self.forward_path(sequence);
        }
        let path = self.forward_path(sequence / 2);
        if sequence % 2 == 0 {
            path
        } else {
            path.iter().rev().map(|&pos| flip_node(pos)).collect()
        }
    }
}

impl Serialize for GbwtIndex {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.node_width.serialize(writer)?;
        (self.bidirectional as usize).serialize(writer)?;
        (self.max_node as usize).serialize(writer)?;
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.offsets.serialize(writer)?;
        self.data.serialize(writer)?;
        self.metadata.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let node_width = usize::load(reader)?;
        if !(1..=64).contains(&node_width) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("GbwtIndex: invalid node width {}", node_width),
            ));
        }
        let bidirectional = usize::load(reader)? != 0;
        let max_node = usize::load(reader)? as u64;

        let offsets = IntVector::load(reader)?;
        let data = IntVector::load(reader)?;
        // The offsets must partition the data.
        if offsets.len() == 0
            || offsets.get(0) != 0
            || offsets.get(offsets.len() - 1) as usize != data.len()
            || (1..offsets.len()).any(|i| offsets.get(i - 1) > offsets.get(i))
        {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "GbwtIndex: path offsets do not match the sequence data",
            ));
        }

        let metadata = Option::<Metadata>::load(reader)?;

        Ok(GbwtIndex {
            node_width,
            bidirectional,
            data,
            offsets,
            max_node,
            metadata,
        })
    }

    fn size_in_elements(&self) -> usize {
        3 + self.offsets.size_in_elements()
            + self.data.size_in_elements()
            + self.metadata.size_in_elements()
    }
}

/// Builds a [`GbwtIndex`] from inserted paths.
///
/// Metadata must be installed before the first insertion. Each insertion
/// buffers one path; the buffer is committed whenever the number of
/// buffered encoded positions reaches the batch size, and a final commit
/// happens in [`GbwtBuilder::finish`].
pub struct GbwtBuilder {
    node_width: usize,
    batch_size: usize,
    sample_interval: usize,
    metadata: Option<Metadata>,
    bidirectional: Option<bool>,
    buffer: Vec<Vec<u64>>,
    buffered: usize,
    data: Vec<u64>,
    offsets: Vec<u64>,
    max_node: u64,
    inserted: usize,
}

impl GbwtBuilder {
    /// Minimum number of sequences per insertion batch assumed by automatic
    /// batch size selection.
    pub const MIN_SEQUENCES_PER_BATCH: usize = 10;

    /// Default insertion batch size in encoded positions.
    pub const INSERT_BATCH_SIZE: usize = 100_000_000;

    /// Default document array sample interval.
    pub const SAMPLE_INTERVAL: usize = 1024;

    /// Default width of an encoded position in bits.
    pub const WORD_BITS: usize = 64;

    /// Creates a builder.
    ///
    /// # Panics
    ///
    /// Panics if `node_width` is not in `1..=64` or if `batch_size` is 0.
    pub fn new(node_width: usize, batch_size: usize, sample_interval: usize) -> Self {
        assert!(
            (1..=64).contains(&node_width),
            "node width must be between 1 and 64 bits"
        );
        assert!(batch_size > 0, "batch size must be positive");
        GbwtBuilder {
            node_width,
            batch_size,
            sample_interval,
            metadata: None,
            bidirectional: None,
            buffer: Vec::new(),
            buffered: 0,
            data: Vec::new(),
            offsets: vec![0],
            max_node: 0,
            inserted: 0,
        }
    }

    /// Installs metadata for the finished index.
    ///
    /// # Panics
    ///
    /// Panics if paths have already been inserted.
    pub fn set_metadata(&mut self, metadata: Metadata) {
        assert!(
            self.inserted == 0,
            "metadata must be installed before the first insertion"
        );
        self.metadata = Some(metadata);
    }

    /// Inserts one path as a new sequence. With `both_strands` the index
    /// also answers for the reverse sequence.
    ///
    /// # Panics
    ///
    /// Panics if `both_strands` differs from earlier insertions, or if an
    /// encoded position does not fit in the node width.
    pub fn insert(&mut self, path: &[u64], both_strands: bool) {
        match self.bidirectional {
            None => self.bidirectional = Some(both_strands),
            Some(flag) => assert!(
                flag == both_strands,
                "cannot mix single-strand and both-strand insertions"
            ),
        }
        for &pos in path {
            if self.node_width < 64 {
                assert!(
                    pos < (1u64 << self.node_width),
                    "encoded position {} does not fit in {} bits",
                    pos,
                    self.node_width
                );
            }
            self.max_node = self.max_node.max(node_id(pos));
        }

        // Each strand of the sequence ends with an endmarker.
        let strands = if both_strands { 2 } else { 1 };
        self.buffered += strands * (path.len() + 1);
        self.buffer.push(path.to_vec());
        self.inserted += 1;
        if self.buffered >= self.batch_size {
            self.flush();
        }
    }

    /// Commits the buffered sequences to the dynamic storage.
    fn flush(&mut self) {
        for path in self.buffer.drain(..) {
            self.data.extend_from_slice(&path);
            self.offsets.push(self.data.len() as u64);
        }
        self.buffered = 0;
    }

    /// Commits the remaining buffer and returns the finished index with its
    /// sequences packed to the smallest possible width.
    pub fn finish(mut self) -> GbwtIndex {
        self.flush();
        let mut data = IntVector::from(self.data);
        data.pack();
        let mut offsets = IntVector::from(self.offsets);
        offsets.pack();
        GbwtIndex {
            node_width: self.node_width,
            bidirectional: self.bidirectional.unwrap_or(true),
            data,
            offsets,
            max_node: self.max_node,
            metadata: self.metadata,
        }
    }

    /// Number of paths inserted so far.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// The insertion batch size in encoded positions.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The document array sample interval.
    pub fn sample_interval(&self) -> usize {
        self.sample_interval
    }
}
