//! K-mer uniqueness index
//!
//! Partitions every k-mer observed in a `SequenceCollection` by the set of
//! sequences it occurs in and keeps the k-mers whose occurrence set has a
//! single member, grouped back by owning sequence. K-mers are borrowed `&str`
//! windows of the collection, so no residue data is copied.
//!
//! Hashing uses ahash with fixed seeds so that repeated runs walk the
//! occurrence index in the same order.

use crate::collection::{Sequence, SequenceCollection};
use crate::error::{Result, UnikmerError};
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Minimum supported k-mer length
pub const MIN_K: usize = 1;

/// Fixed seeds for deterministic hashing across runs
const HASH_SEED: u64 = 0x51f3b5b8;
const HASH_SEED2: u64 = 0x9e3779b9;

/// Iterator over every length-`k` window of a residue string
///
/// ASCII input is sliced by byte offset. Anything else is sliced on character
/// boundaries, so a window never splits a code point.
#[derive(Debug, Clone)]
pub struct KmerWindows<'a> {
    residues: &'a str,
    /// Start offset of every character plus the end offset; empty for ASCII
    boundaries: Vec<usize>,
    k: usize,
    next: usize,
    remaining: usize,
}

impl<'a> KmerWindows<'a> {
    /// Yields nothing when `k` is 0 or longer than the sequence.
    pub fn new(residues: &'a str, k: usize) -> Self {
        let (boundaries, num_chars) = if residues.is_ascii() {
            (Vec::new(), residues.len())
        } else {
            let boundaries: Vec<usize> = residues
                .char_indices()
                .map(|(offset, _)| offset)
                .chain(std::iter::once(residues.len()))
                .collect();
            let num_chars = boundaries.len() - 1;
            (boundaries, num_chars)
        };

        let remaining = if k == 0 || num_chars < k {
            0
        } else {
            num_chars - k + 1
        };

        Self {
            residues,
            boundaries,
            k,
            next: 0,
            remaining,
        }
    }
}

impl<'a> Iterator for KmerWindows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.next;
        let window = if self.boundaries.is_empty() {
            &self.residues[i..i + self.k]
        } else {
            &self.residues[self.boundaries[i]..self.boundaries[i + self.k]]
        };
        self.next += 1;
        self.remaining -= 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for KmerWindows<'_> {}

/// Set of sequences (by collection position) a k-mer occurs in
///
/// Members are kept sorted; a sequence is recorded once no matter how many
/// times the k-mer repeats inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceSet {
    members: Vec<usize>,
}

impl OccurrenceSet {
    /// Returns `false` if `owner` was already a member
    pub fn insert(&mut self, owner: usize) -> bool {
        // Sequences are scanned in order, so this is almost always a push
        if self.members.last().is_some_and(|&last| last < owner) {
            self.members.push(owner);
            return true;
        }
        match self.members.binary_search(&owner) {
            Ok(_) => false,
            Err(pos) => {
                self.members.insert(pos, owner);
                true
            }
        }
    }

    pub fn contains(&self, owner: usize) -> bool {
        self.members.binary_search(&owner).is_ok()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The owning sequence if exactly one sequence contains the k-mer
    pub fn sole_owner(&self) -> Option<usize> {
        match self.members.as_slice() {
            [owner] => Some(*owner),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }
}

/// Counters describing one uniqueness computation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Sequences in the collection
    pub sequences: usize,
    /// Sequences shorter than k (no window)
    pub short_sequences: usize,
    /// Windows scanned across all sequences
    pub windows: usize,
    /// Distinct k-mers observed
    pub distinct_kmers: usize,
    /// K-mers present in two or more sequences
    pub shared_kmers: usize,
    /// K-mers present in exactly one sequence
    pub unique_kmers: usize,
    /// Sequences owning at least one unique k-mer
    pub owners: usize,
}

/// Mapping from k-mer to the set of sequences it occurs in
///
/// Built completely before the uniqueness filter runs and consumed by it.
#[derive(Debug)]
pub struct OccurrenceIndex<'a> {
    k: usize,
    occurrences: AHashMap<&'a str, OccurrenceSet>,
    stats: IndexStats,
}

impl<'a> OccurrenceIndex<'a> {
    fn new(k: usize, hasher_builder: ahash::RandomState) -> Self {
        Self {
            k,
            occurrences: AHashMap::with_hasher(hasher_builder),
            stats: IndexStats::default(),
        }
    }

    /// Record that `kmer` occurs in the sequence at position `owner`
    pub fn record(&mut self, kmer: &'a str, owner: usize) {
        self.occurrences.entry(kmer).or_default().insert(owner);
    }

    /// Occurrence set of a k-mer, if it was observed at all
    pub fn occurrences(&self, kmer: &str) -> Option<&OccurrenceSet> {
        self.occurrences.get(kmer)
    }

    /// Number of distinct k-mers
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Keep only k-mers with a single owner and group them by that owner
    pub fn into_unique(self, collection: &'a SequenceCollection) -> UniqueKmers<'a> {
        let mut stats = self.stats;
        stats.distinct_kmers = self.occurrences.len();

        let mut groups: BTreeMap<usize, BTreeSet<&'a str>> = BTreeMap::new();
        for (kmer, owners) in self.occurrences {
            match owners.sole_owner() {
                Some(owner) => {
                    groups.entry(owner).or_default().insert(kmer);
                    stats.unique_kmers += 1;
                }
                None => stats.shared_kmers += 1,
            }
        }
        stats.owners = groups.len();

        let mut entries = Vec::with_capacity(groups.len());
        let mut id_to_entry = HashMap::with_capacity(groups.len());
        for (owner, kmers) in groups {
            if let Some(sequence) = collection.by_index(owner) {
                id_to_entry.insert(sequence.id(), entries.len());
                entries.push((sequence.id(), kmers));
            }
        }

        UniqueKmers {
            k: self.k,
            entries,
            id_to_entry,
            stats,
        }
    }
}

/// K-mers unique to each sequence
///
/// Sequences without any unique k-mer have no entry. Identifiers iterate in
/// collection order and each k-mer set iterates in lexicographic order.
#[derive(Debug, Clone)]
pub struct UniqueKmers<'a> {
    k: usize,
    entries: Vec<(&'a str, BTreeSet<&'a str>)>,
    id_to_entry: HashMap<&'a str, usize>,
    stats: IndexStats,
}

impl<'a> UniqueKmers<'a> {
    pub fn k(&self) -> usize {
        self.k
    }

    /// Unique k-mers of `id`, `None` when it owns none
    pub fn get(&self, id: &str) -> Option<&BTreeSet<&'a str>> {
        self.id_to_entry.get(id).map(|&index| &self.entries[index].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_entry.contains_key(id)
    }

    /// Number of sequences with at least one unique k-mer
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &BTreeSet<&'a str>)> + '_ {
        self.entries.iter().map(|(id, kmers)| (*id, kmers))
    }

    /// Total number of unique k-mers across all sequences
    pub fn total_kmers(&self) -> usize {
        self.entries.iter().map(|(_, kmers)| kmers.len()).sum()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Owned copy detached from the collection's lifetime
    pub fn to_owned_map(&self) -> HashMap<String, HashSet<String>> {
        self.entries
            .iter()
            .map(|(id, kmers)| {
                let kmers = kmers.iter().map(|kmer| kmer.to_string()).collect();
                (id.to_string(), kmers)
            })
            .collect()
    }
}

/// Uniqueness computation for a fixed window length
#[derive(Debug, Clone)]
pub struct KmerUniquenessIndex {
    k: usize,
    /// Deterministic hasher for consistent results across runs
    hasher_builder: ahash::RandomState,
}

impl KmerUniquenessIndex {
    /// Create an index for windows of length `k`
    ///
    /// # Returns
    /// * `Ok(KmerUniquenessIndex)` - `k` is at least `MIN_K`
    /// * `Err(UnikmerError)` - `k` is 0
    pub fn new(k: usize) -> Result<Self> {
        if k < MIN_K {
            return Err(UnikmerError::invalid_kmer_length(k, MIN_K));
        }

        let hasher_builder = ahash::RandomState::with_seeds(HASH_SEED, HASH_SEED2, 0, 0);
        Ok(Self { k, hasher_builder })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Build the occurrence index sequentially
    pub fn build<'a>(&self, collection: &'a SequenceCollection) -> OccurrenceIndex<'a> {
        let mut index = OccurrenceIndex::new(self.k, self.hasher_builder.clone());
        index.stats.sequences = collection.len();

        for (owner, sequence) in collection.iter().enumerate() {
            let windows = KmerWindows::new(sequence.residues(), self.k);
            if windows.len() == 0 {
                index.stats.short_sequences += 1;
                continue;
            }
            index.stats.windows += windows.len();
            for kmer in windows {
                index.record(kmer, owner);
            }
        }

        index
    }

    /// Build the occurrence index with per-sequence extraction on the rayon pool
    ///
    /// Each sequence's distinct k-mers are collected independently and then
    /// unioned into the index, giving the same index as `build`.
    pub fn build_parallel<'a>(&self, collection: &'a SequenceCollection) -> OccurrenceIndex<'a> {
        let per_sequence: Vec<(usize, AHashSet<&'a str>)> = collection
            .as_slice()
            .par_iter()
            .map(|sequence| self.distinct_kmers(sequence))
            .collect();

        let mut index = OccurrenceIndex::new(self.k, self.hasher_builder.clone());
        index.stats.sequences = collection.len();

        for (owner, (windows, kmers)) in per_sequence.into_iter().enumerate() {
            if windows == 0 {
                index.stats.short_sequences += 1;
                continue;
            }
            index.stats.windows += windows;
            for &kmer in kmers.iter() {
                index.record(kmer, owner);
            }
        }

        index
    }

    fn distinct_kmers<'a>(&self, sequence: &'a Sequence) -> (usize, AHashSet<&'a str>) {
        let windows = KmerWindows::new(sequence.residues(), self.k);
        let num_windows = windows.len();
        let mut kmers = AHashSet::with_hasher(self.hasher_builder.clone());
        for kmer in windows {
            kmers.insert(kmer);
        }
        (num_windows, kmers)
    }

    /// K-mers occurring in exactly one sequence, grouped by that sequence
    pub fn compute<'a>(&self, collection: &'a SequenceCollection) -> UniqueKmers<'a> {
        let unique = self.build(collection).into_unique(collection);
        self.report(&unique);
        unique
    }

    /// Same result as `compute`, extracting k-mers in parallel
    pub fn compute_parallel<'a>(&self, collection: &'a SequenceCollection) -> UniqueKmers<'a> {
        debug!(threads = rayon::current_num_threads(), "Extracting k-mers in parallel");
        let unique = self.build_parallel(collection).into_unique(collection);
        self.report(&unique);
        unique
    }

    fn report(&self, unique: &UniqueKmers<'_>) {
        let stats = unique.stats();
        if stats.sequences > 0 && stats.short_sequences == stats.sequences {
            warn!(k = self.k, "Every sequence is shorter than k, no k-mers extracted");
        }
        info!(
            k = self.k,
            sequences = stats.sequences,
            short_sequences = stats.short_sequences,
            distinct_kmers = stats.distinct_kmers,
            shared_kmers = stats.shared_kmers,
            unique_kmers = stats.unique_kmers,
            "Computed unique k-mers for {} of {} sequences",
            stats.owners,
            stats.sequences
        );
    }
}

/// K-mers of length `k` unique to each sequence of `collection`
pub fn unique_kmers(collection: &SequenceCollection, k: usize) -> Result<UniqueKmers<'_>> {
    Ok(KmerUniquenessIndex::new(k)?.compute(collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(records: &[(&str, &str)]) -> SequenceCollection {
        records.iter().copied().collect()
    }

    fn set(kmers: &[&'static str]) -> BTreeSet<&'static str> {
        kmers.iter().copied().collect()
    }

    fn all_windows(residues: &str, k: usize) -> Vec<String> {
        let chars: Vec<char> = residues.chars().collect();
        if k == 0 || chars.len() < k {
            return Vec::new();
        }
        chars.windows(k).map(|w| w.iter().collect()).collect()
    }

    /// Checks uniqueness, completeness and exclusion against brute force
    fn assert_invariants(seqs: &SequenceCollection, k: usize) {
        let unique = unique_kmers(seqs, k).unwrap();

        for (id, kmers) in unique.iter() {
            let own = seqs.get(id).unwrap();
            for kmer in kmers {
                assert!(own.residues().contains(kmer));
                for other in seqs.iter().filter(|s| s.id() != id) {
                    assert!(!all_windows(other.residues(), k).contains(&kmer.to_string()));
                }
            }
        }

        for sequence in seqs.iter() {
            for kmer in all_windows(sequence.residues(), k) {
                let holders = seqs
                    .iter()
                    .filter(|s| all_windows(s.residues(), k).contains(&kmer))
                    .count();
                let listed = unique
                    .get(sequence.id())
                    .is_some_and(|kmers| kmers.contains(kmer.as_str()));
                assert_eq!(holders == 1, listed, "k-mer {kmer} in {}", sequence.id());
                if holders > 1 {
                    assert!(unique.iter().all(|(_, kmers)| !kmers.contains(kmer.as_str())));
                }
            }
        }
    }

    #[test]
    fn test_windows_ascii() {
        let windows: Vec<&str> = KmerWindows::new("ACGT", 2).collect();
        assert_eq!(windows, vec!["AC", "CG", "GT"]);
        assert_eq!(KmerWindows::new("ACGT", 4).len(), 1);
        assert_eq!(KmerWindows::new("ACGT", 5).len(), 0);
        assert_eq!(KmerWindows::new("ACGT", 0).len(), 0);
        assert_eq!(KmerWindows::new("", 1).len(), 0);
    }

    #[test]
    fn test_windows_respect_char_boundaries() {
        let windows: Vec<&str> = KmerWindows::new("AéGü", 2).collect();
        assert_eq!(windows, vec!["Aé", "éG", "Gü"]);
    }

    #[test]
    fn test_occurrence_set_collapses_repeats() {
        let mut owners = OccurrenceSet::default();
        assert!(owners.insert(3));
        assert!(!owners.insert(3));
        assert_eq!(owners.sole_owner(), Some(3));
        assert!(owners.insert(1));
        assert_eq!(owners.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(owners.sole_owner(), None);
        assert!(owners.contains(1));
        assert!(!owners.contains(2));
    }

    #[test]
    fn test_multibyte_residues() {
        let seqs = collection(&[("x", "AéA"), ("y", "éA")]);
        let unique = unique_kmers(&seqs, 2).unwrap();

        assert_eq!(unique.len(), 1);
        assert_eq!(unique.get("x"), Some(&set(&["Aé"])));
        assert!(!unique.contains("y"));
        assert_eq!(
            unique.to_owned_map(),
            KmerUniquenessIndex::new(2).unwrap().compute_parallel(&seqs).to_owned_map()
        );
    }

    #[test]
    fn test_fixture_scenario() {
        let seqs = collection(&[("s1", "AATA"), ("s2", "ATGA"), ("s3", "ACTAT")]);
        let unique = unique_kmers(&seqs, 2).unwrap();

        assert_eq!(unique.len(), 3);
        assert_eq!(unique.get("s1"), Some(&set(&["AA"])));
        assert_eq!(unique.get("s2"), Some(&set(&["GA", "TG"])));
        assert_eq!(unique.get("s3"), Some(&set(&["AC", "CT"])));
        assert_eq!(unique.total_kmers(), 5);

        let stats = unique.stats();
        assert_eq!(stats.distinct_kmers, 7);
        assert_eq!(stats.shared_kmers, 2);
        assert_eq!(stats.unique_kmers, 5);
    }

    #[test]
    fn test_junction_sharing() {
        let seqs = collection(&[("s1", "AATT"), ("s2", "TTGA"), ("s3", "GACT")]);
        let unique = unique_kmers(&seqs, 2).unwrap();

        assert_eq!(unique.get("s1"), Some(&set(&["AA", "AT"])));
        assert_eq!(unique.get("s2"), Some(&set(&["TG"])));
        assert_eq!(unique.get("s3"), Some(&set(&["AC", "CT"])));
        assert!(unique.iter().all(|(_, kmers)| !kmers.contains("TT") && !kmers.contains("GA")));
    }

    #[test]
    fn test_repeats_within_one_sequence_stay_unique() {
        let seqs = collection(&[("a", "AAAAA"), ("b", "CCCC")]);
        let unique = unique_kmers(&seqs, 3).unwrap();

        assert_eq!(unique.get("a"), Some(&set(&["AAA"])));
        assert_eq!(unique.get("b"), Some(&set(&["CCC"])));
    }

    #[test]
    fn test_sequences_without_unique_kmers_are_absent() {
        let seqs = collection(&[("a", "ACGT"), ("b", "ACGT"), ("c", "TTTT")]);
        let unique = unique_kmers(&seqs, 2).unwrap();

        assert!(!unique.contains("a"));
        assert!(!unique.contains("b"));
        assert_eq!(unique.get("a"), None);
        assert_eq!(unique.get("c"), Some(&set(&["TT"])));
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_short_and_empty_sequences_contribute_nothing() {
        let seqs = collection(&[("empty", ""), ("short", "AC"), ("long", "ACGTA")]);
        let unique = unique_kmers(&seqs, 3).unwrap();

        assert!(!unique.contains("empty"));
        assert!(!unique.contains("short"));
        assert_eq!(unique.get("long"), Some(&set(&["ACG", "CGT", "GTA"])));
        assert_eq!(unique.stats().short_sequences, 2);
    }

    #[test]
    fn test_k_longer_than_every_sequence() {
        let seqs = collection(&[("a", "ACG"), ("b", "TT")]);
        let unique = unique_kmers(&seqs, 10).unwrap();

        assert!(unique.is_empty());
        assert_eq!(unique.stats().windows, 0);
    }

    #[test]
    fn test_zero_k_is_rejected() {
        let seqs = collection(&[("a", "ACG")]);
        let err = unique_kmers(&seqs, 0).unwrap_err();
        assert!(matches!(err, UnikmerError::InvalidKmerLength { k: 0, min: 1 }));
    }

    #[test]
    fn test_case_is_literal() {
        let seqs = collection(&[("upper", "ACGT"), ("lower", "acgt")]);
        let unique = unique_kmers(&seqs, 4).unwrap();

        assert_eq!(unique.get("upper"), Some(&set(&["ACGT"])));
        assert_eq!(unique.get("lower"), Some(&set(&["acgt"])));
    }

    #[test]
    fn test_idempotent() {
        let seqs = collection(&[("x", "ACGTTGCA"), ("y", "TTGCAACG"), ("z", "GGGCCC")]);
        let index = KmerUniquenessIndex::new(3).unwrap();

        let first = index.compute(&seqs).to_owned_map();
        let second = index.compute(&seqs).to_owned_map();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let seqs = collection(&[
            ("x", "ACGTTGCAACGTAGCTAGCTAGGCT"),
            ("y", "TTGCAACGGGATCGATCGTTAGC"),
            ("z", "GGGCCCAAATTTGGGCCC"),
            ("w", ""),
            ("v", "AC"),
        ]);
        let index = KmerUniquenessIndex::new(4).unwrap();

        let sequential = index.compute(&seqs);
        let parallel = index.compute_parallel(&seqs);

        assert_eq!(sequential.to_owned_map(), parallel.to_owned_map());
        assert_eq!(sequential.stats(), parallel.stats());
    }

    #[test]
    fn test_occurrence_index() {
        let seqs = collection(&[("a", "ACGAC"), ("b", "CGT")]);
        let index = KmerUniquenessIndex::new(2).unwrap().build(&seqs);

        assert_eq!(index.k(), 2);
        assert_eq!(index.len(), 4);
        assert_eq!(index.occurrences("AC").unwrap().len(), 1);
        assert_eq!(index.occurrences("CG").unwrap().iter().collect::<Vec<_>>(), vec![0, 1]);
        assert!(index.occurrences("TT").is_none());
    }

    #[test]
    fn test_output_order_follows_collection() {
        let seqs = collection(&[("zeta", "GGGG"), ("alpha", "CCCC"), ("mid", "AAAA")]);
        let unique = unique_kmers(&seqs, 2).unwrap();

        let ids: Vec<&str> = unique.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_invariants_hold() {
        let cases = [
            collection(&[("s1", "AATA"), ("s2", "ATGA"), ("s3", "ACTAT")]),
            collection(&[("a", "ACGTACGTTT"), ("b", "CGTACG"), ("c", "TTTACGA"), ("d", "")]),
            collection(&[("a", "AAAAAAA"), ("b", "AAAT"), ("c", "TAAA")]),
            collection(&[("x", "AéA"), ("y", "éA"), ("z", "üAéü")]),
        ];
        for seqs in &cases {
            for k in 1..=4 {
                assert_invariants(seqs, k);
            }
        }
    }
}
