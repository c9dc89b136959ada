//! The GFA ingest pipeline.
//!
//! [`gfa_to_gbwt`] memory-maps and validates the file, decides how segment
//! names map to node identifiers, parses metadata from path names or walk
//! fields, and streams the encoded paths and walks into a [`GbwtBuilder`].
//! The phases run sequentially over the preprocessed file; iteration always
//! follows source order.

use std::cell::RefCell;
use std::path::Path;
use std::time::Instant;

use crate::builder::{encode_node, GbwtBuilder, GbwtIndex};
use crate::error::{GfaError, Result};
use crate::gfa::GfaFile;
use crate::metadata::{Metadata, MetadataBuilder, DEFAULT_FIELDS, DEFAULT_REGEX, REF_SAMPLE};
use crate::progress;
use crate::sequences::{EmptyGraph, SequenceStore};

/// Parameters for GFA parsing and index construction.
#[derive(Clone, Debug)]
pub struct GfaParsingParameters {
    /// Maximum length of a node sequence in bases; 0 means unbounded.
    /// Segments longer than this are split into multiple nodes.
    pub max_node_length: usize,
    /// Insertion batch size in encoded positions; 0 means automatic.
    pub batch_size: usize,
    /// Choose the batch size from the maximum path length and the file
    /// size, using `batch_size` as a lower bound.
    pub automatic_batch_size: bool,
    /// Regular expression applied to P-line path names.
    pub path_name_regex: String,
    /// Field assignment for the capture groups of `path_name_regex`.
    pub path_name_fields: String,
    /// Width of an encoded node position in bits.
    pub node_width: usize,
    /// Document array sample interval for the builder.
    pub sample_interval: usize,
    /// Write progress information to stderr.
    pub show_progress: bool,
}

impl Default for GfaParsingParameters {
    fn default() -> Self {
        GfaParsingParameters {
            max_node_length: 0,
            batch_size: GbwtBuilder::INSERT_BATCH_SIZE,
            automatic_batch_size: true,
            path_name_regex: DEFAULT_REGEX.to_string(),
            path_name_fields: DEFAULT_FIELDS.to_string(),
            node_width: GbwtBuilder::WORD_BITS,
            sample_interval: GbwtBuilder::SAMPLE_INTERVAL,
            show_progress: false,
        }
    }
}

/// Checks that the file has something to index: at least one segment and at
/// least one path or walk.
pub fn check_gfa_file(gfa: &GfaFile, parameters: &GfaParsingParameters) -> Result<()> {
    if gfa.segments() == 0 {
        return Err(GfaError::Content("no segments in the GFA file".to_string()));
    }
    if gfa.paths() > 0 && gfa.walks() > 0 && parameters.show_progress {
        eprintln!("Storing reference paths as sample {}", REF_SAMPLE);
    }
    if gfa.paths() == 0 && gfa.walks() == 0 {
        return Err(GfaError::Content(
            "no paths or walks in the GFA file".to_string(),
        ));
    }
    Ok(())
}

/// Chooses the insertion batch size. A fixed user-supplied size is honored;
/// otherwise the size is at least [`GbwtBuilder::MIN_SEQUENCES_PER_BATCH`]
/// sequences of maximum path length, clipped to the file size.
pub fn determine_batch_size(gfa: &GfaFile, parameters: &GfaParsingParameters) -> usize {
    let mut batch_size = parameters.batch_size;
    if parameters.automatic_batch_size || parameters.batch_size == 0 {
        let min_size = GbwtBuilder::MIN_SEQUENCES_PER_BATCH * (gfa.max_path_length() + 1);
        batch_size = batch_size.max(min_size).min(gfa.size());
    }
    if parameters.show_progress {
        eprintln!("GBWT insertion batch size: {} nodes", batch_size);
    }
    batch_size
}

/// Parses a node identifier from a segment name that preprocessing already
/// accepted as a plain integer.
fn node_id_from_name(name: &str) -> u64 {
    name.bytes().fold(0, |id, byte| 10 * id + u64::from(byte - b'0'))
}

/// Builds the sequence store and the node set from the S-lines. Translation
/// is used if some segment name is not a valid node identifier or some
/// segment is longer than the maximum node length.
pub fn parse_segments(
    gfa: &GfaFile,
    parameters: &GfaParsingParameters,
) -> (SequenceStore, EmptyGraph) {
    let start = Instant::now();
    if parameters.show_progress {
        eprintln!("Parsing segments");
    }

    let max_node_length = if parameters.max_node_length == 0 {
        usize::MAX
    } else {
        parameters.max_node_length
    };
    let mut translate = false;
    if gfa.max_segment_length() > max_node_length {
        translate = true;
        if parameters.show_progress {
            eprintln!("Breaking segments into {} bp nodes", max_node_length);
        }
    } else if gfa.requires_translation() {
        translate = true;
        if parameters.show_progress {
            eprintln!("Translating segment ids into valid node ids");
        }
    }

    let mut store = SequenceStore::new();
    let mut graph = EmptyGraph::new();
    let bar = parameters
        .show_progress
        .then(|| progress::count_progress_bar("segments", "segments", gfa.segments() as u64));
    gfa.for_each_segment(|name, sequence| {
        if translate {
            let (first, limit) = store.translate_segment(name, sequence, max_node_length);
            for id in first..limit {
                graph.create_node(id);
            }
        } else {
            let id = node_id_from_name(name);
            store.add_node(id, sequence);
            graph.create_node(id);
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        true
    });
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if parameters.show_progress {
        eprintln!(
            "Parsed {} nodes in {:.2?}",
            store.node_count(),
            start.elapsed()
        );
    }
    (store, graph)
}

/// Parses path and walk metadata. With walks present, P-line names become
/// reference paths and the structured walk fields are recorded verbatim;
/// otherwise the configured regular expression is applied to every P-line
/// name.
pub fn parse_metadata(
    gfa: &GfaFile,
    parameters: &GfaParsingParameters,
    metadata: &mut MetadataBuilder,
) -> Result<Metadata> {
    let start = Instant::now();
    if parameters.show_progress {
        eprintln!("Parsing metadata");
    }

    if gfa.walks() > 0 {
        // Reference paths.
        if gfa.paths() > 0 {
            let mut failed = None;
            gfa.for_each_path_name(|name| {
                if !metadata.add_reference_path(name) {
                    failed = Some(name.to_string());
                    return false;
                }
                true
            });
            if let Some(name) = failed {
                return Err(GfaError::Metadata(format!(
                    "could not parse metadata from reference path name '{}'",
                    name
                )));
            }
        }
        // Walks.
        let mut failed = None;
        gfa.for_each_walk_name(|sample, haplotype, contig, start_pos| {
            if !metadata.add_walk(sample, haplotype, contig, start_pos) {
                failed = Some(format!("{}#{}#{}@{}", sample, haplotype, contig, start_pos));
                return false;
            }
            true
        });
        if let Some(walk) = failed {
            return Err(GfaError::Metadata(format!(
                "could not parse metadata from walk {}",
                walk
            )));
        }
    } else if gfa.paths() > 0 {
        let mut failed = None;
        gfa.for_each_path_name(|name| {
            if !metadata.parse(name) {
                failed = Some(name.to_string());
                return false;
            }
            true
        });
        if let Some(name) = failed {
            return Err(GfaError::Metadata(format!(
                "could not parse metadata from path name '{}'",
                name
            )));
        }
    }

    let result = metadata.get_metadata();
    if parameters.show_progress {
        eprintln!(
            "Parsed metadata for {} paths in {:.2?}",
            result.paths(),
            start.elapsed()
        );
    }
    Ok(result)
}

/// Expands one oriented segment reference into encoded node positions. A
/// translated range is emitted in order for forward orientation and in
/// reverse order with flipped orientations for reverse orientation. Returns
/// `false` if the segment has no translation or no valid node identifier.
fn encode_segment(source: &SequenceStore, name: &str, is_reverse: bool, out: &mut Vec<u64>) -> bool {
    if source.uses_translation() {
        let (first, limit) = match source.get_translation(name) {
            Some(range) => range,
            None => return false,
        };
        if is_reverse {
            for id in (first..limit).rev() {
                out.push(encode_node(id, true));
            }
        } else {
            for id in first..limit {
                out.push(encode_node(id, false));
            }
        }
    } else {
        match parse_node_id(name) {
            Some(id) => out.push(encode_node(id, is_reverse)),
            None => return false,
        }
    }
    true
}

/// Parses a segment name as a node identifier: a run of digits with a
/// nonzero value.
fn parse_node_id(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    match name.parse::<u64>() {
        Ok(id) if id > 0 => Some(id),
        _ => None,
    }
}

/// Re-scans the paths and the walks in source order, encodes them, and
/// inserts them into the builder, each as one sample insertion on both
/// strands. Returns the finished index.
pub fn parse_paths(
    gfa: &GfaFile,
    parameters: &GfaParsingParameters,
    source: &SequenceStore,
    mut builder: GbwtBuilder,
) -> Result<GbwtIndex> {
    let start = Instant::now();
    if parameters.show_progress {
        eprintln!("Indexing paths/walks");
    }
    let bar = parameters.show_progress.then(|| {
        progress::count_progress_bar("index", "paths", (gfa.paths() + gfa.walks()) as u64)
    });

    let current = RefCell::new(Vec::new());
    let mut missing: Option<String> = None;

    // Paths.
    gfa.for_each_path(
        |_| true,
        |name, is_reverse| {
            if !encode_segment(source, name, is_reverse, &mut current.borrow_mut()) {
                missing = Some(name.to_string());
                return false;
            }
            true
        },
        || {
            builder.insert(&current.borrow(), true);
            current.borrow_mut().clear();
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            true
        },
    );
    if let Some(name) = missing.take() {
        return Err(GfaError::Reference(name));
    }

    // Walks.
    gfa.for_each_walk(
        |_, _, _, _| true,
        |name, is_reverse| {
            if !encode_segment(source, name, is_reverse, &mut current.borrow_mut()) {
                missing = Some(name.to_string());
                return false;
            }
            true
        },
        || {
            builder.insert(&current.borrow(), true);
            current.borrow_mut().clear();
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            true
        },
    );
    if let Some(name) = missing.take() {
        return Err(GfaError::Reference(name));
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    // Finish construction.
    let index = builder.finish();
    if parameters.show_progress {
        eprintln!(
            "Indexed {} paths and {} walks in {:.2?}",
            gfa.paths(),
            gfa.walks(),
            start.elapsed()
        );
    }
    Ok(index)
}

/// Parses a GFA file into a sequence store and a path index.
///
/// The mapped file is released on every exit path, including errors; the
/// store and the index outlive the call.
pub fn gfa_to_gbwt<P: AsRef<Path>>(
    filename: P,
    parameters: &GfaParsingParameters,
) -> Result<(SequenceStore, GbwtIndex)> {
    // Metadata handling.
    let mut metadata =
        MetadataBuilder::new(&parameters.path_name_regex, &parameters.path_name_fields)?;

    // GFA parsing.
    let gfa = GfaFile::open(filename, parameters.show_progress)?;
    check_gfa_file(&gfa, parameters)?;

    // Adjust the batch size by the file size and the maximum path length.
    let batch_size = determine_batch_size(&gfa, parameters);

    // Parse the segments.
    let (source, graph) = parse_segments(&gfa, parameters);
    // Topology is not needed for path indexing.
    drop(graph);

    // Parse metadata from path names and walks. It must be installed in the
    // builder before the first insertion.
    let mut builder =
        GbwtBuilder::new(parameters.node_width, batch_size, parameters.sample_interval);
    builder.set_metadata(parse_metadata(&gfa, parameters, &mut metadata)?);

    // Build the index from the paths and the walks.
    let index = parse_paths(&gfa, parameters, &source, builder)?;

    Ok((source, index))
}
