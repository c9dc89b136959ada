//! Structured path and walk metadata.
//!
//! Path names carry sample, contig, haplotype, and fragment information.
//! When the file contains walks, the structured W-line fields provide the
//! metadata directly and P-line names become reference paths under the
//! reserved sample [`REF_SAMPLE`]. Otherwise a configurable regular
//! expression extracts the fields from P-line names.

use std::collections::{HashMap, HashSet};
use std::io::{Error, ErrorKind};
use std::io;

use regex::Regex;
use simple_sds::int_vector::IntVector;
use simple_sds::ops::{Access, Vector};
use simple_sds::serialize::Serialize;

use crate::error::{GfaError, Result};
use crate::serialize::{load_string, serialize_string, string_size};

/// Sample name under which P-line paths are stored when the file also
/// contains walks. The path name itself is stored as the contig name.
pub use gbwt::REF_SAMPLE;

/// Default regular expression applied to path names.
pub const DEFAULT_REGEX: &str = ".*";

/// Default field assignment: the whole match is the sample name.
pub const DEFAULT_FIELDS: &str = "S";

/// A structured path name. The fields are identifiers into the sample and
/// contig dictionaries of the [`Metadata`] the name belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathName {
    pub sample: u32,
    pub contig: u32,
    pub phase: u32,
    pub fragment: u32,
}

/// Path metadata for a finished index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub(crate) sample_names: Vec<String>,
    pub(crate) contig_names: Vec<String>,
    pub(crate) haplotype_count: usize,
    pub(crate) path_names: Vec<PathName>,
}

impl Metadata {
    /// Number of paths.
    pub fn paths(&self) -> usize {
        self.path_names.len()
    }

    /// The structured name of path `id`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such path.
    pub fn path(&self, id: usize) -> PathName {
        self.path_names[id]
    }

    /// Returns `true` if the metadata contains path names.
    pub fn has_path_names(&self) -> bool {
        !self.path_names.is_empty()
    }

    /// Number of samples.
    pub fn samples(&self) -> usize {
        self.sample_names.len()
    }

    /// Number of contigs.
    pub fn contigs(&self) -> usize {
        self.contig_names.len()
    }

    /// Number of haplotypes: distinct `(sample, phase)` combinations.
    pub fn haplotypes(&self) -> usize {
        self.haplotype_count
    }

    /// Name of sample `id`.
    pub fn sample_name(&self, id: u32) -> &str {
        &self.sample_names[id as usize]
    }

    /// Name of contig `id`.
    pub fn contig_name(&self, id: u32) -> &str {
        &self.contig_names[id as usize]
    }

    /// Identifier of the sample with the given name, if any.
    pub fn sample_id(&self, name: &str) -> Option<u32> {
        self.sample_names
            .iter()
            .position(|sample| sample == name)
            .map(|id| id as u32)
    }

    /// Identifier of the contig with the given name, if any.
    pub fn contig_id(&self, name: &str) -> Option<u32> {
        self.contig_names
            .iter()
            .position(|contig| contig == name)
            .map(|id| id as u32)
    }

    /// Identifiers of the paths that belong to the given sample, in path
    /// order.
    pub fn paths_for_sample(&self, sample: u32) -> Vec<usize> {
        self.path_names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.sample == sample)
            .map(|(id, _)| id)
            .collect()
    }

    /// The path names packed two words per path for serialization.
    fn packed_names(&self) -> IntVector {
        let mut packed = Vec::with_capacity(2 * self.path_names.len());
        for path in &self.path_names {
            packed.push((u64::from(path.sample) << 32) | u64::from(path.contig));
            packed.push((u64::from(path.phase) << 32) | u64::from(path.fragment));
        }
        IntVector::from(packed)
    }
}

impl Serialize for Metadata {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.sample_names.len().serialize(writer)?;
        self.contig_names.len().serialize(writer)?;
        self.haplotype_count.serialize(writer)?;
        self.path_names.len().serialize(writer)?;
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        for name in &self.sample_names {
            serialize_string(name, writer)?;
        }
        for name in &self.contig_names {
            serialize_string(name, writer)?;
        }
        self.packed_names().serialize(writer)
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let samples = usize::load(reader)?;
        let contigs = usize::load(reader)?;
        let haplotype_count = usize::load(reader)?;
        let paths = usize::load(reader)?;

        let mut metadata = Metadata {
            sample_names: Vec::with_capacity(samples),
            contig_names: Vec::with_capacity(contigs),
            haplotype_count,
            path_names: Vec::with_capacity(paths),
        };
        for _ in 0..samples {
            metadata.sample_names.push(load_string(reader)?);
        }
        for _ in 0..contigs {
            metadata.contig_names.push(load_string(reader)?);
        }

        let packed = IntVector::load(reader)?;
        if packed.len() != 2 * paths {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Metadata: path name count does not match the header",
            ));
        }
        for id in 0..paths {
            let high = packed.get(2 * id);
            let low = packed.get(2 * id + 1);
            metadata.path_names.push(PathName {
                sample: (high >> 32) as u32,
                contig: high as u32,
                phase: (low >> 32) as u32,
                fragment: low as u32,
            });
        }
        Ok(metadata)
    }

    fn size_in_elements(&self) -> usize {
        let mut result = 4;
        for name in self.sample_names.iter().chain(self.contig_names.iter()) {
            result += string_size(name);
        }
        result + self.packed_names().size_in_elements()
    }
}

/// The metadata field a regex capture group feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NameField {
    Sample,
    Contig,
    Haplotype,
    Fragment,
}

/// Builds [`Metadata`] from path names and walks.
pub struct MetadataBuilder {
    regex: Regex,
    /// Capture group index and the field it feeds.
    fields: Vec<(usize, NameField)>,
    sample_ids: HashMap<String, u32>,
    contig_ids: HashMap<String, u32>,
    sample_names: Vec<String>,
    contig_names: Vec<String>,
    haplotypes: HashSet<(u32, u32)>,
    path_names: Vec<PathName>,
    seen: HashSet<PathName>,
}

impl MetadataBuilder {
    /// Creates a builder with the given path name expression and field
    /// assignment. Character `i` of `field_spec` labels capture group `i`
    /// (group 0 is the whole match): `S` sample, `C` contig, `H` haplotype,
    /// `F` fragment, `X` ignore the group. If the expression declares named
    /// capture groups `sample`, `haplotype`, `contig`, or `fragment`, those
    /// take precedence over the positional assignment.
    pub fn new(pattern: &str, field_spec: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|err| GfaError::Metadata(format!("invalid path name regex: {}", err)))?;

        let mut fields = Vec::new();
        for (group, name) in regex.capture_names().enumerate() {
            let field = match name {
                Some("sample") => NameField::Sample,
                Some("haplotype") => NameField::Haplotype,
                Some("contig") => NameField::Contig,
                Some("fragment") => NameField::Fragment,
                _ => continue,
            };
            fields.push((group, field));
        }
        if fields.is_empty() {
            for (group, spec) in field_spec.chars().enumerate() {
                let field = match spec.to_ascii_uppercase() {
                    'S' => NameField::Sample,
                    'C' => NameField::Contig,
                    'H' => NameField::Haplotype,
                    'F' => NameField::Fragment,
                    'X' => continue,
                    _ => {
                        return Err(GfaError::Metadata(format!(
                            "unknown path name field '{}'",
                            spec
                        )))
                    }
                };
                fields.push((group, field));
            }
        }

        Ok(MetadataBuilder {
            regex,
            fields,
            sample_ids: HashMap::new(),
            contig_ids: HashMap::new(),
            sample_names: Vec::new(),
            contig_names: Vec::new(),
            haplotypes: HashSet::new(),
            path_names: Vec::new(),
            seen: HashSet::new(),
        })
    }

    fn sample_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.sample_ids.get(name) {
            return id;
        }
        let id = self.sample_names.len() as u32;
        self.sample_ids.insert(name.to_string(), id);
        self.sample_names.push(name.to_string());
        id
    }

    fn contig_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.contig_ids.get(name) {
            return id;
        }
        let id = self.contig_names.len() as u32;
        self.contig_ids.insert(name.to_string(), id);
        self.contig_names.push(name.to_string());
        id
    }

    /// Registers a path name. Returns `false` on a duplicate.
    fn add_path(&mut self, sample: u32, contig: u32, phase: u32, fragment: u32) -> bool {
        let name = PathName {
            sample,
            contig,
            phase,
            fragment,
        };
        if !self.seen.insert(name) {
            return false;
        }
        self.haplotypes.insert((sample, phase));
        self.path_names.push(name);
        true
    }

    /// Parses a P-line name with the configured expression. Fields the
    /// expression does not produce default to an empty sample, haplotype 0,
    /// an empty contig, and fragment 0. Returns `false` if the expression
    /// does not match, a produced field does not convert, or the resulting
    /// name is a duplicate.
    pub fn parse(&mut self, name: &str) -> bool {
        let captures = match self.regex.captures(name) {
            Some(captures) => captures,
            None => return false,
        };

        let mut sample = String::new();
        let mut contig = String::new();
        let mut phase = 0;
        let mut fragment = 0;
        for &(group, field) in &self.fields {
            let value = match captures.get(group) {
                Some(value) => value.as_str(),
                None => continue,
            };
            match field {
                NameField::Sample => sample = value.to_string(),
                NameField::Contig => contig = value.to_string(),
                NameField::Haplotype => match value.parse() {
                    Ok(value) => phase = value,
                    Err(_) => return false,
                },
                NameField::Fragment => match value.parse() {
                    Ok(value) => fragment = value,
                    Err(_) => return false,
                },
            }
        }

        let sample = self.sample_id(&sample);
        let contig = self.contig_id(&contig);
        self.add_path(sample, contig, phase, fragment)
    }

    /// Registers a P-line name as a reference path: sample [`REF_SAMPLE`],
    /// the name itself as the contig. Returns `false` on a duplicate.
    pub fn add_reference_path(&mut self, name: &str) -> bool {
        let sample = self.sample_id(REF_SAMPLE);
        let contig = self.contig_id(name);
        self.add_path(sample, contig, 0, 0)
    }

    /// Registers a walk from the structured W-line fields. Returns `false`
    /// if the haplotype or start field does not parse as an integer, or if
    /// the resulting name is a duplicate.
    pub fn add_walk(&mut self, sample: &str, haplotype: &str, contig: &str, start: &str) -> bool {
        let phase = match haplotype.parse() {
            Ok(phase) => phase,
            Err(_) => return false,
        };
        let fragment = match start.parse() {
            Ok(fragment) => fragment,
            Err(_) => return false,
        };
        let sample = self.sample_id(sample);
        let contig = self.contig_id(contig);
        self.add_path(sample, contig, phase, fragment)
    }

    /// The metadata registered so far.
    pub fn get_metadata(&self) -> Metadata {
        Metadata {
            sample_names: self.sample_names.clone(),
            contig_names: self.contig_names.clone(),
            haplotype_count: self.haplotypes.len(),
            path_names: self.path_names.clone(),
        }
    }
}
