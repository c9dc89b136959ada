//! Memory-mapped GFA files: validation, preprocessing, and record iteration.
//!
//! [`GfaFile::open`] maps the file read-only and makes a single forward pass
//! that classifies every line by its first byte, validates the mandatory
//! fields of S/L/P/W records, stores per-kind line-start offsets, and
//! accumulates the statistics that later phases need (maximum segment
//! length, maximum path length, whether segment ids require translation).
//! The `for_each_*` methods then re-scan the stored offsets and hand parsed
//! fields to caller-supplied callbacks. There are no checks for duplicate
//! segments, and link or path endpoints are not verified against the
//! declared segments.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use memmap2::{Mmap, MmapOptions};

use crate::error::{GfaError, Result};
use crate::field::{ByteClass, Field};
use crate::progress;

/// File extension for GFA files.
pub const GFA_EXTENSION: &str = ".gfa";

/// How many lines to preprocess between progress bar updates.
const PROGRESS_GRANULARITY: usize = 4096;

/// A validated, memory-mapped GFA file.
pub struct GfaFile {
    path: PathBuf,
    map: Mmap,

    // Statistics accumulated by the preprocessing pass.
    translate_segment_ids: bool,
    max_segment_length: usize,
    max_path_length: usize,

    // Separator classes. These could depend on the GFA version.
    field_end: ByteClass,
    subfield_end: ByteClass,
    walk_subfield_end: ByteClass,

    // Offsets of the first byte of each preserved line, in source order.
    s_lines: Vec<usize>,
    l_lines: Vec<usize>,
    p_lines: Vec<usize>,
    w_lines: Vec<usize>,
}

impl GfaFile {
    /// Opens and memory-maps a GFA file, then preprocesses and validates it.
    ///
    /// The whole file must be mappable; streaming input is not supported.
    /// Returns an error on the first structural violation.
    pub fn open<P: AsRef<Path>>(filename: P, show_progress: bool) -> Result<GfaFile> {
        let path = filename.as_ref().to_path_buf();
        if show_progress {
            eprintln!("Opening GFA file {}", path.display());
        }

        let file = File::open(&path).map_err(|source| GfaError::Open {
            path: path.clone(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| GfaError::Open {
                path: path.clone(),
                source,
            })?
            .len();
        if len == 0 {
            return Err(GfaError::Content(format!(
                "GFA file {} is empty",
                path.display()
            )));
        }
        let map = unsafe { MmapOptions::new().map(&file) }.map_err(|source| GfaError::Open {
            path: path.clone(),
            source,
        })?;
        // We will be making sequential passes over the data.
        #[cfg(unix)]
        let _ = map.advise(memmap2::Advice::Sequential);

        let mut result = GfaFile {
            path,
            map,
            translate_segment_ids: false,
            max_segment_length: 0,
            max_path_length: 0,
            field_end: ByteClass::from_bytes(b"\t\n"),
            subfield_end: ByteClass::from_bytes(b"\t\n,"),
            walk_subfield_end: ByteClass::from_bytes(b"\t\n<>"),
            s_lines: Vec::new(),
            l_lines: Vec::new(),
            p_lines: Vec::new(),
            w_lines: Vec::new(),
        };
        result.preprocess(show_progress)?;
        Ok(result)
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the mapped region in bytes.
    pub fn size(&self) -> usize {
        self.map.len()
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        &self.map
    }

    /// Number of S-lines in the file.
    pub fn segments(&self) -> usize {
        self.s_lines.len()
    }

    /// Number of L-lines in the file.
    pub fn links(&self) -> usize {
        self.l_lines.len()
    }

    /// Number of P-lines in the file.
    pub fn paths(&self) -> usize {
        self.p_lines.len()
    }

    /// Number of W-lines in the file.
    pub fn walks(&self) -> usize {
        self.w_lines.len()
    }

    /// Returns `true` if some segment name does not parse as a nonzero
    /// integer, so segment ids must be translated into node ids.
    pub fn requires_translation(&self) -> bool {
        self.translate_segment_ids
    }

    /// Length of the longest segment sequence in bases.
    pub fn max_segment_length(&self) -> usize {
        self.max_segment_length
    }

    /// Number of segments on the longest path or walk.
    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }
}

// Tokenization. All returned tokens are offsets into the mapped region.
impl GfaFile {
    /// Offset of the beginning of the next line.
    fn next_line(&self, mut iter: usize) -> usize {
        let data = self.bytes();
        while iter < data.len() && data[iter] != b'\n' {
            iter += 1;
        }
        if iter < data.len() {
            iter += 1;
        }
        iter
    }

    /// The first tab-separated field of the line.
    fn first_field(&self, line_start: usize, line_num: usize) -> Field {
        let data = self.bytes();
        let mut limit = line_start;
        while limit < data.len() && !self.field_end.contains(data[limit]) {
            limit += 1;
        }
        Field {
            begin: line_start,
            end: limit,
            line: line_num,
            record: data[line_start],
            has_next: limit < data.len() && data[limit] == b'\t',
        }
    }

    /// The next tab-separated field, assuming there is one.
    fn next_field(&self, field: Field) -> Field {
        let data = self.bytes();
        let begin = field.end + 1;
        let mut limit = begin;
        while limit < data.len() && !self.field_end.contains(data[limit]) {
            limit += 1;
        }
        Field {
            begin,
            end: limit,
            line: field.line,
            record: field.record,
            has_next: limit < data.len() && data[limit] == b'\t',
        }
    }

    /// The next comma-separated subfield, assuming there is one.
    fn next_subfield(&self, field: Field) -> Field {
        let data = self.bytes();
        let begin = field.end + 1;
        let mut limit = begin;
        while limit < data.len() && !self.subfield_end.contains(data[limit]) {
            limit += 1;
        }
        Field {
            begin,
            end: limit,
            line: field.line,
            record: field.record,
            has_next: limit < data.len() && data[limit] == b',',
        }
    }

    /// The next walk subfield, assuming there is one. The orientation glyph
    /// at the start of the segment doubles as the subfield separator, so the
    /// token begins at `field.end` instead of `field.end + 1`.
    fn next_walk_subfield(&self, field: Field) -> Field {
        let data = self.bytes();
        let begin = field.end;
        let mut limit = begin;
        if limit < data.len() && matches!(data[limit], b'<' | b'>') {
            limit += 1;
            while limit < data.len() && !self.walk_subfield_end.contains(data[limit]) {
                limit += 1;
            }
        }
        Field {
            begin,
            end: limit,
            line: field.line,
            record: field.record,
            has_next: limit < data.len() && matches!(data[limit], b'<' | b'>'),
        }
    }
}

/// Returns an error if the field is empty, or if the record ends here even
/// though more fields are required.
fn check_field(field: &Field, name: &str, should_have_next: bool) -> Result<()> {
    if field.is_empty() {
        return Err(GfaError::Structure {
            record: field.record as char,
            line: field.line,
            what: format!("has no {}", name),
        });
    }
    if should_have_next && !field.has_next {
        return Err(GfaError::Structure {
            record: field.record as char,
            line: field.line,
            what: format!("ended after {}", name),
        });
    }
    Ok(())
}

// Preprocessing.
impl GfaFile {
    fn preprocess(&mut self, show_progress: bool) -> Result<()> {
        let start = Instant::now();
        if show_progress {
            eprintln!("Validating GFA file {}", self.path.display());
        }
        let bar = show_progress
            .then(|| progress::byte_progress_bar("validate", self.size() as u64));

        let mut iter = 0;
        let mut line_num = 1;
        while iter < self.size() {
            iter = match self.bytes()[iter] {
                b'S' => self.add_s_line(iter, line_num)?,
                b'L' => self.add_l_line(iter, line_num)?,
                b'P' => self.add_p_line(iter, line_num)?,
                b'W' => self.add_w_line(iter, line_num)?,
                _ => self.next_line(iter),
            };
            if line_num % PROGRESS_GRANULARITY == 0 {
                if let Some(bar) = &bar {
                    bar.set_position(iter as u64);
                }
            }
            line_num += 1;
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        if show_progress {
            eprintln!(
                "Found {} segments, {} links, {} paths, and {} walks in {:.2?}",
                self.segments(),
                self.links(),
                self.paths(),
                self.walks(),
                start.elapsed()
            );
        }
        Ok(())
    }

    /// Preprocesses a new S-line. Returns the offset of the next line.
    fn add_s_line(&mut self, iter: usize, line_num: usize) -> Result<usize> {
        self.s_lines.push(iter);

        // Skip the record type field.
        let field = self.first_field(iter, line_num);
        check_field(&field, "record type", true)?;

        // Segment name field.
        let field = self.next_field(field);
        check_field(&field, "segment name", true)?;
        if !self.translate_segment_ids {
            // A direct node identifier is a run of digits parsing to a
            // nonzero integer; anything else forces translation.
            let bytes = field.bytes(self.bytes());
            let parsed = if bytes.iter().all(|byte| byte.is_ascii_digit()) {
                std::str::from_utf8(bytes)
                    .ok()
                    .and_then(|name| name.parse::<u64>().ok())
            } else {
                None
            };
            match parsed {
                Some(id) if id > 0 => {}
                _ => self.translate_segment_ids = true,
            }
        }

        // Sequence field.
        let field = self.next_field(field);
        check_field(&field, "sequence", false)?;
        self.max_segment_length = self.max_segment_length.max(field.len());

        Ok(self.next_line(field.end))
    }

    /// Preprocesses a new L-line. Returns the offset of the next line.
    fn add_l_line(&mut self, iter: usize, line_num: usize) -> Result<usize> {
        self.l_lines.push(iter);

        // Skip the record type field.
        let field = self.first_field(iter, line_num);
        check_field(&field, "record type", true)?;

        // Source segment field.
        let field = self.next_field(field);
        check_field(&field, "source segment", true)?;

        // Source orientation field.
        let field = self.next_field(field);
        check_field(&field, "source orientation", true)?;
        if !field.is_valid_orientation(self.bytes()) {
            return Err(GfaError::Shape {
                record: 'L',
                line: line_num,
                what: format!(
                    "invalid source orientation '{}'",
                    field.to_text(self.bytes())
                ),
            });
        }

        // Destination segment field.
        let field = self.next_field(field);
        check_field(&field, "destination segment", true)?;

        // Destination orientation field.
        let field = self.next_field(field);
        check_field(&field, "destination orientation", false)?;
        if !field.is_valid_orientation(self.bytes()) {
            return Err(GfaError::Shape {
                record: 'L',
                line: line_num,
                what: format!(
                    "invalid destination orientation '{}'",
                    field.to_text(self.bytes())
                ),
            });
        }

        Ok(self.next_line(field.end))
    }

    /// Preprocesses a new P-line. Returns the offset of the next line.
    fn add_p_line(&mut self, iter: usize, line_num: usize) -> Result<usize> {
        self.p_lines.push(iter);

        // Skip the record type field.
        let field = self.first_field(iter, line_num);
        check_field(&field, "record type", true)?;

        // Path name field.
        let field = self.next_field(field);
        check_field(&field, "path name", true)?;

        // Segment names field.
        let mut field = field;
        let mut path_length = 0;
        loop {
            field = self.next_subfield(field);
            if !field.is_valid_path_segment(self.bytes()) {
                if field.is_empty() && path_length == 0 && !field.has_next {
                    return Err(GfaError::EmptyCollection {
                        record: 'P',
                        line: line_num,
                    });
                }
                return Err(GfaError::Shape {
                    record: 'P',
                    line: line_num,
                    what: format!("invalid path segment '{}'", field.to_text(self.bytes())),
                });
            }
            path_length += 1;
            if !field.has_next {
                break;
            }
        }
        self.max_path_length = self.max_path_length.max(path_length);

        Ok(self.next_line(field.end))
    }

    /// Preprocesses a new W-line. Returns the offset of the next line.
    fn add_w_line(&mut self, iter: usize, line_num: usize) -> Result<usize> {
        self.w_lines.push(iter);

        // Skip the record type field.
        let field = self.first_field(iter, line_num);
        check_field(&field, "record type", true)?;

        // Sample name field.
        let field = self.next_field(field);
        check_field(&field, "sample name", true)?;

        // Haplotype index field.
        let field = self.next_field(field);
        check_field(&field, "haplotype index", true)?;

        // Contig name field.
        let field = self.next_field(field);
        check_field(&field, "contig name", true)?;

        // Start position field.
        let field = self.next_field(field);
        check_field(&field, "start position", true)?;

        // End position field. It may be the last field of the line, in which
        // case the walk has no segments to index.
        let field = self.next_field(field);
        check_field(&field, "end position", false)?;
        if !field.has_next {
            return Err(GfaError::EmptyCollection {
                record: 'W',
                line: line_num,
            });
        }

        // Segment names field.
        let mut field = field.start_walk();
        let mut path_length = 0;
        loop {
            field = self.next_walk_subfield(field);
            if !field.is_valid_walk_segment(self.bytes()) {
                // An empty first token ending at a field separator means the
                // walk list itself is empty; anything else is malformed.
                let list_is_empty = field.is_empty()
                    && path_length == 0
                    && !field.has_next
                    && (field.end >= self.size()
                        || matches!(self.bytes()[field.end], b'\n' | b'\t'));
                if list_is_empty {
                    return Err(GfaError::EmptyCollection {
                        record: 'W',
                        line: line_num,
                    });
                }
                return Err(GfaError::Shape {
                    record: 'W',
                    line: line_num,
                    what: format!("invalid walk segment '{}'", field.to_text(self.bytes())),
                });
            }
            path_length += 1;
            if !field.has_next {
                break;
            }
        }
        self.max_path_length = self.max_path_length.max(path_length);

        Ok(self.next_line(field.end))
    }
}

// Record iteration over the preprocessed line offsets. Iteration follows
// source order, and every callback can return `false` to stop cleanly.
impl GfaFile {
    /// Iterates over the S-lines, calling `segment` with the name and the
    /// sequence of every segment. Stops early if the callback returns
    /// `false`.
    pub fn for_each_segment(&self, mut segment: impl FnMut(&str, &[u8]) -> bool) {
        let data = self.bytes();
        for &iter in &self.s_lines {
            // Skip the record type field.
            let field = self.first_field(iter, 0);

            // Segment name field.
            let field = self.next_field(field);
            let name = field.to_text(data);

            // Sequence field.
            let field = self.next_field(field);
            if !segment(&name, field.bytes(data)) {
                return;
            }
        }
    }

    /// Iterates over the L-lines, calling `link` with the endpoints of every
    /// link. Stops early if the callback returns `false`.
    pub fn for_each_link(&self, mut link: impl FnMut(&str, bool, &str, bool) -> bool) {
        let data = self.bytes();
        for &iter in &self.l_lines {
            // Skip the record type field.
            let field = self.first_field(iter, 0);

            // Source segment field.
            let field = self.next_field(field);
            let from = field.to_text(data);

            // Source orientation field.
            let field = self.next_field(field);
            let from_is_reverse = field.is_reverse_orientation(data);

            // Destination segment field.
            let field = self.next_field(field);
            let to = field.to_text(data);

            // Destination orientation field.
            let field = self.next_field(field);
            let to_is_reverse = field.is_reverse_orientation(data);

            if !link(&from, from_is_reverse, &to, to_is_reverse) {
                return;
            }
        }
    }

    /// Iterates over the P-lines, calling `path` with every path name.
    /// Stops early if the callback returns `false`.
    pub fn for_each_path_name(&self, mut path: impl FnMut(&str) -> bool) {
        let data = self.bytes();
        for &iter in &self.p_lines {
            // Skip the record type field.
            let field = self.first_field(iter, 0);

            // Path name field.
            let field = self.next_field(field);
            if !path(&field.to_text(data)) {
                return;
            }
        }
    }

    /// Iterates over the P-lines, calling `path` with the path name,
    /// `path_segment` with every oriented segment, and `finish_path` after
    /// each path. Stops early if any callback returns `false`.
    pub fn for_each_path(
        &self,
        mut path: impl FnMut(&str) -> bool,
        mut path_segment: impl FnMut(&str, bool) -> bool,
        mut finish_path: impl FnMut() -> bool,
    ) {
        let data = self.bytes();
        for &iter in &self.p_lines {
            // Skip the record type field.
            let field = self.first_field(iter, 0);

            // Path name field.
            let mut field = self.next_field(field);
            if !path(&field.to_text(data)) {
                return;
            }

            // Segment names field.
            loop {
                field = self.next_subfield(field);
                let name = String::from_utf8_lossy(field.path_segment(data));
                if !path_segment(&name, field.is_reverse_path_segment(data)) {
                    return;
                }
                if !field.has_next {
                    break;
                }
            }

            if !finish_path() {
                return;
            }
        }
    }

    /// Iterates over the W-lines, calling `walk` with the sample, haplotype,
    /// contig, and start fields of every walk. Stops early if the callback
    /// returns `false`.
    pub fn for_each_walk_name(&self, mut walk: impl FnMut(&str, &str, &str, &str) -> bool) {
        let data = self.bytes();
        for &iter in &self.w_lines {
            // Skip the record type field.
            let field = self.first_field(iter, 0);

            // Sample field.
            let field = self.next_field(field);
            let sample = field.to_text(data);

            // Haplotype field.
            let field = self.next_field(field);
            let haplotype = field.to_text(data);

            // Contig field.
            let field = self.next_field(field);
            let contig = field.to_text(data);

            // Start field.
            let field = self.next_field(field);
            let start = field.to_text(data);

            if !walk(&sample, &haplotype, &contig, &start) {
                return;
            }
        }
    }

    /// Iterates over the W-lines, calling `walk` with the header fields,
    /// `walk_segment` with every oriented segment, and `finish_walk` after
    /// each walk. Stops early if any callback returns `false`.
    pub fn for_each_walk(
        &self,
        mut walk: impl FnMut(&str, &str, &str, &str) -> bool,
        mut walk_segment: impl FnMut(&str, bool) -> bool,
        mut finish_walk: impl FnMut() -> bool,
    ) {
        let data = self.bytes();
        for &iter in &self.w_lines {
            // Skip the record type field.
            let field = self.first_field(iter, 0);

            // Sample field.
            let field = self.next_field(field);
            let sample = field.to_text(data);

            // Haplotype field.
            let field = self.next_field(field);
            let haplotype = field.to_text(data);

            // Contig field.
            let field = self.next_field(field);
            let contig = field.to_text(data);

            // Start field.
            let field = self.next_field(field);
            let start = field.to_text(data);

            if !walk(&sample, &haplotype, &contig, &start) {
                return;
            }

            // Skip the end position field.
            let field = self.next_field(field);

            // Segment names field.
            let mut field = field.start_walk();
            loop {
                field = self.next_walk_subfield(field);
                let name = String::from_utf8_lossy(field.walk_segment(data));
                if !walk_segment(&name, field.is_reverse_walk_segment(data)) {
                    return;
                }
                if !field.has_next {
                    break;
                }
            }

            if !finish_walk() {
                return;
            }
        }
    }
}
