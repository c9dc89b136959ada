//! Writing a graph and its paths back out as GFA.
//!
//! [`gbwt_to_gfa`] writes an `H` line, the segments of the attached
//! sequence store, and then the paths of the index: with path metadata,
//! paths under the reference sample become P-lines named by their contig
//! and all other paths become W-lines; without metadata, every path becomes
//! a numbered P-line. Records go through a tab-delimited [`csv`] writer
//! with quoting disabled. The ingest data model keeps no topology, so no
//! L-lines are written.

use std::io::{self, Error, ErrorKind, Write};
use std::time::Instant;

use csv::{QuoteStyle, Writer, WriterBuilder};

use crate::builder::{node_id, node_is_reverse, GbwtIndex};
use crate::metadata::{Metadata, REF_SAMPLE};
use crate::sequences::SequenceStore;

/// A tab-delimited record writer for GFA output.
fn gfa_writer<W: Write>(out: W) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .flexible(true)
        .has_headers(false)
        .from_writer(out)
}

/// Cached node-to-segment resolution: for every node, the name of its
/// segment and the length of the segment in nodes.
struct SegmentCache {
    /// `(first node id, length in nodes, name)`, sorted by first node id.
    entries: Vec<(u64, u64, String)>,
}

impl SegmentCache {
    fn new(source: &SequenceStore) -> Self {
        let mut entries = Vec::with_capacity(source.segment_count());
        source.for_each_segment(|name, first, limit| {
            entries.push((first, limit - first, name.to_string()));
            true
        });
        SegmentCache { entries }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// The segment containing node `id`, as `(name, length in nodes)`.
    fn get(&self, id: u64) -> io::Result<(&str, u64)> {
        let after = self.entries.partition_point(|entry| entry.0 <= id);
        if after > 0 {
            let (first, length, name) = &self.entries[after - 1];
            if id < first + length {
                return Ok((name, *length));
            }
        }
        Err(Error::new(
            ErrorKind::InvalidData,
            format!("node {} does not belong to any segment", id),
        ))
    }
}

/// Label used for a sample or contig field: the name if one is known, the
/// numeric identifier otherwise.
fn name_or_id(name: &str, id: u32) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

fn write_segments<W: Write>(
    source: &SequenceStore,
    writer: &mut Writer<W>,
    show_progress: bool,
) -> io::Result<()> {
    let start = Instant::now();
    let mut segments = 0;
    if show_progress {
        eprintln!("Writing segments");
    }

    let mut result = Ok(());
    source.for_each_segment(|name, first, limit| {
        // A split segment is stored as consecutive chunks in forward
        // orientation.
        let mut sequence = Vec::new();
        for id in first..limit {
            if let Some(chunk) = source.sequence(id) {
                sequence.extend_from_slice(chunk);
            }
        }
        segments += 1;
        if let Err(err) = writer.write_record([&b"S"[..], name.as_bytes(), sequence.as_slice()]) {
            result = Err(io::Error::from(err));
            return false;
        }
        true
    });
    result?;

    if show_progress {
        eprintln!("Wrote {} segments in {:.2?}", segments, start.elapsed());
    }
    Ok(())
}

/// Builds the oriented segment list and the star overlap field of a P-line.
fn path_record(path: &[u64], cache: &SegmentCache) -> io::Result<(String, String)> {
    let mut visits = String::new();
    let mut segments = 0;
    let mut offset = 0;
    while offset < path.len() {
        let (name, length) = cache.get(node_id(path[offset]))?;
        visits.push_str(name);
        visits.push(if node_is_reverse(path[offset]) { '-' } else { '+' });
        segments += 1;
        offset += length as usize;
        if offset < path.len() {
            visits.push(',');
        }
    }

    let mut overlaps = String::new();
    for i in 1..segments {
        overlaps.push('*');
        if i + 1 < segments {
            overlaps.push(',');
        }
    }
    Ok((visits, overlaps))
}

fn write_paths<W: Write>(
    index: &GbwtIndex,
    metadata: &Metadata,
    cache: &SegmentCache,
    writer: &mut Writer<W>,
    ref_sample: u32,
    show_progress: bool,
) -> io::Result<()> {
    let start = Instant::now();
    if show_progress {
        eprintln!("Writing reference paths");
    }

    let ref_paths = metadata.paths_for_sample(ref_sample);
    for &path_id in &ref_paths {
        let path = index.forward_path(path_id);
        let (visits, overlaps) = path_record(&path, cache)?;
        let contig = metadata.contig_name(metadata.path(path_id).contig);
        writer.write_record(["P", contig, visits.as_str(), overlaps.as_str()])?;
    }

    if show_progress && !ref_paths.is_empty() {
        eprintln!("Wrote {} paths in {:.2?}", ref_paths.len(), start.elapsed());
    }
    Ok(())
}

fn write_walks<W: Write>(
    source: &SequenceStore,
    index: &GbwtIndex,
    metadata: &Metadata,
    cache: &SegmentCache,
    writer: &mut Writer<W>,
    ref_sample: Option<u32>,
    show_progress: bool,
) -> io::Result<()> {
    let start = Instant::now();
    let mut walks = 0;
    if show_progress {
        eprintln!("Writing walks");
    }

    for path_id in 0..metadata.paths() {
        let path_name = metadata.path(path_id);
        if Some(path_name.sample) == ref_sample {
            continue;
        }
        walks += 1;
        let path = index.forward_path(path_id);
        let mut length = 0;
        for &pos in &path {
            length += source.sequence_len(node_id(pos)) as u64;
        }

        let mut visits = String::new();
        let mut offset = 0;
        while offset < path.len() {
            let (name, segment_length) = cache.get(node_id(path[offset]))?;
            visits.push(if node_is_reverse(path[offset]) { '<' } else { '>' });
            visits.push_str(name);
            offset += segment_length as usize;
        }

        let sample = name_or_id(metadata.sample_name(path_name.sample), path_name.sample);
        let contig = name_or_id(metadata.contig_name(path_name.contig), path_name.contig);
        let phase = path_name.phase.to_string();
        let walk_start = path_name.fragment.to_string();
        let walk_end = (path_name.fragment as u64 + length).to_string();
        writer.write_record([
            "W",
            sample.as_str(),
            phase.as_str(),
            contig.as_str(),
            walk_start.as_str(),
            walk_end.as_str(),
            visits.as_str(),
        ])?;
    }

    if show_progress && walks > 0 {
        eprintln!("Wrote {} walks in {:.2?}", walks, start.elapsed());
    }
    Ok(())
}

fn write_all_paths<W: Write>(
    index: &GbwtIndex,
    cache: &SegmentCache,
    writer: &mut Writer<W>,
    show_progress: bool,
) -> io::Result<()> {
    let start = Instant::now();
    if show_progress {
        eprintln!("Writing paths");
    }

    for path_id in 0..index.paths() {
        let path = index.forward_path(path_id);
        let (visits, overlaps) = path_record(&path, cache)?;
        let name = path_id.to_string();
        writer.write_record(["P", name.as_str(), visits.as_str(), overlaps.as_str()])?;
    }

    if show_progress {
        eprintln!("Wrote {} paths in {:.2?}", index.paths(), start.elapsed());
    }
    Ok(())
}

/// Writes the graph and its paths as GFA.
pub fn gbwt_to_gfa<W: Write>(
    source: &SequenceStore,
    index: &GbwtIndex,
    out: W,
    show_progress: bool,
) -> io::Result<()> {
    // Cache segment names.
    let start = Instant::now();
    if show_progress {
        eprintln!("Caching segments");
    }
    let cache = SegmentCache::new(source);
    if show_progress {
        eprintln!("Cached {} segments in {:.2?}", cache.len(), start.elapsed());
    }

    let mut writer = gfa_writer(out);

    // GFA header.
    writer.write_record(["H", "VN:Z:1.0"])?;

    // The graph.
    write_segments(source, &mut writer, show_progress)?;

    // The paths.
    match index.metadata() {
        Some(metadata) if metadata.has_path_names() => {
            let ref_sample = metadata.sample_id(REF_SAMPLE);
            if let Some(sample) = ref_sample {
                write_paths(index, metadata, &cache, &mut writer, sample, show_progress)?;
            }
            write_walks(
                source,
                index,
                metadata,
                &cache,
                &mut writer,
                ref_sample,
                show_progress,
            )?;
        }
        _ => write_all_paths(index, &cache, &mut writer, show_progress)?,
    }

    writer.flush()?;
    Ok(())
}
