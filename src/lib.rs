//! # gfa2gbwt
//!
//! Bidirectional translation between [GFA](https://github.com/GFA-spec/GFA-spec)
//! text and a compact path/walk index over a directed sequence graph.
//!
//! Ingest memory-maps the GFA file, validates and preprocesses it in a
//! single pass, and then re-scans it to build a [`SequenceStore`] (node
//! sequences plus an optional segment-name translation), structured path
//! metadata, and a [`GbwtIndex`] over the paths and walks. Emit writes a
//! store and an index back out as GFA.

pub mod builder;
pub mod convert;
pub mod emit;
pub mod error;
pub mod field;
pub mod gfa;
pub mod metadata;
pub mod progress;
pub mod sequences;
pub mod serialize;

pub use crate::builder::{GbwtBuilder, GbwtIndex, ENDMARKER};
pub use crate::convert::{gfa_to_gbwt, GfaParsingParameters};
pub use crate::emit::gbwt_to_gfa;
pub use crate::error::{GfaError, Result};
pub use crate::gfa::GfaFile;
pub use crate::metadata::{Metadata, MetadataBuilder, PathName, REF_SAMPLE};
pub use crate::sequences::{EmptyGraph, SequenceStore};
