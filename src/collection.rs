//! Named sequence collections and FASTA-like loading
//!
//! A `SequenceCollection` is the only input the uniqueness index reads. It
//! keeps sequences in insertion order and guarantees identifier uniqueness
//! (re-inserting an identifier replaces its residues in place).

use crate::error::{Result, UnikmerError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// A named residue string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: String,
    residues: String,
}

impl Sequence {
    pub fn new(id: impl Into<String>, residues: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            residues: residues.into(),
        }
    }

    /// Sequence identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Residue string, case and characters as loaded
    pub fn residues(&self) -> &str {
        &self.residues
    }

    /// Number of residues (characters, not bytes)
    pub fn len(&self) -> usize {
        self.residues.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// Insertion-ordered mapping from identifier to sequence
#[derive(Debug, Clone, Default)]
pub struct SequenceCollection {
    sequences: Vec<Sequence>,
    /// Fast lookup from identifier to position in `sequences`
    id_to_index: HashMap<String, usize>,
}

impl SequenceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sequence, replacing the residues of an existing identifier
    ///
    /// A replaced sequence keeps its original position. Returns the previous
    /// residues when the identifier was already present.
    pub fn insert(&mut self, id: impl Into<String>, residues: impl Into<String>) -> Option<String> {
        let id = id.into();
        let residues = residues.into();

        if let Some(&index) = self.id_to_index.get(&id) {
            let previous = std::mem::replace(&mut self.sequences[index].residues, residues);
            return Some(previous);
        }

        self.id_to_index.insert(id.clone(), self.sequences.len());
        self.sequences.push(Sequence { id, residues });
        None
    }

    /// Look up a sequence by identifier
    pub fn get(&self, id: &str) -> Option<&Sequence> {
        self.id_to_index.get(id).map(|&index| &self.sequences[index])
    }

    /// Position of an identifier in insertion order
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    /// Sequence at a given position in insertion order
    pub fn by_index(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequences in insertion order
    pub fn as_slice(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Iterator over sequences in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.iter()
    }

    /// Iterator over identifiers in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sequences.iter().map(|s| s.id())
    }

    /// Total number of residues across all sequences
    pub fn total_residues(&self) -> usize {
        self.sequences.iter().map(|s| s.len()).sum()
    }

    /// Loads a collection from a FASTA-like file
    ///
    /// # Returns
    /// * `Ok(SequenceCollection)` - At least one record was read
    /// * `Err(UnikmerError)` - Missing file, I/O error, or no records
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(UnikmerError::InputNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let collection = Self::from_reader(BufReader::new(file))?;

        if collection.is_empty() {
            return Err(UnikmerError::invalid_fasta(0, "No sequences found in input"));
        }

        debug!(
            path = %path.display(),
            sequences = collection.len(),
            residues = collection.total_residues(),
            "Loaded sequence collection"
        );
        Ok(collection)
    }

    /// Parses FASTA-like records from any buffered reader
    ///
    /// Lines are trimmed. `>` starts a record named by the rest of the line;
    /// every other line is appended to the current record. Lines before the
    /// first header are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut collection = Self::new();
        let mut current: Option<(String, String)> = None;

        for (line_no, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line = line.trim();

            if let Some(header) = line.strip_prefix('>') {
                if let Some((id, residues)) = current.take() {
                    collection.push_record(id, residues);
                }
                current = Some((header.to_string(), String::new()));
            } else if let Some((_, residues)) = current.as_mut() {
                residues.push_str(line);
            } else if !line.is_empty() {
                warn!(line = line_no + 1, "Ignoring residues before the first header");
            }
        }

        if let Some((id, residues)) = current {
            collection.push_record(id, residues);
        }

        Ok(collection)
    }

    fn push_record(&mut self, id: String, residues: String) {
        if self.insert(id.as_str(), residues).is_some() {
            warn!(id = %id, "Duplicate sequence identifier, keeping the last record");
        }
    }
}

impl<I, S> FromIterator<(I, S)> for SequenceCollection
where
    I: Into<String>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, S)>>(iter: T) -> Self {
        let mut collection = Self::new();
        for (id, residues) in iter {
            collection.insert(id, residues);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a SequenceCollection {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}
