//! Saving and loading the sequence store and the path index.
//!
//! The components implement [`Serialize`] from Simple-SDS and are written
//! sequentially into one file behind a magic number and a version, so that
//! the `ingest` and `emit` commands can compose through a file.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Error, ErrorKind, Read, Write};
use std::path::Path;

use simple_sds::serialize::Serialize;

use crate::builder::GbwtIndex;
use crate::sequences::SequenceStore;

/// Magic number identifying the file, `GFA2GBWT` in little-endian order.
const MAGIC: usize = usize::from_le_bytes(*b"GFA2GBWT");

/// Current version of the file format.
const VERSION: usize = 1;

/// Serializes a string as its bytes.
pub(crate) fn serialize_string<T: Write>(value: &str, writer: &mut T) -> io::Result<()> {
    value.as_bytes().to_vec().serialize(writer)
}

/// Loads a string serialized with [`serialize_string`].
pub(crate) fn load_string<T: Read>(reader: &mut T) -> io::Result<String> {
    let bytes = Vec::<u8>::load(reader)?;
    String::from_utf8(bytes)
        .map_err(|_| Error::new(ErrorKind::InvalidData, "invalid string in index file"))
}

/// Serialized size of a string in elements.
pub(crate) fn string_size(value: &str) -> usize {
    value.as_bytes().to_vec().size_in_elements()
}

/// Saves the sequence store and the index to a file.
pub fn save<P: AsRef<Path>>(
    filename: P,
    source: &SequenceStore,
    index: &GbwtIndex,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(filename)?);
    MAGIC.serialize(&mut out)?;
    VERSION.serialize(&mut out)?;
    source.serialize(&mut out)?;
    index.serialize(&mut out)?;
    out.flush()
}

/// Loads a sequence store and an index saved by [`save`].
pub fn load<P: AsRef<Path>>(filename: P) -> io::Result<(SequenceStore, GbwtIndex)> {
    let mut input = BufReader::new(File::open(filename)?);
    let magic = usize::load(&mut input)?;
    if magic != MAGIC {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "not a gfa2gbwt index file",
        ));
    }
    let version = usize::load(&mut input)?;
    if version != VERSION {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("unsupported index file version {}", version),
        ));
    }
    let store = SequenceStore::load(&mut input)?;
    let index = GbwtIndex::load(&mut input)?;
    Ok((store, index))
}
