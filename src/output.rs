//! Output formatting for unique k-mer results
//!
//! TSV is the native format: one line per sequence that owns at least one
//! unique k-mer, `identifier<TAB>kmer1,kmer2,...`. JSON carries the same
//! content plus the window length.

use crate::error::Result;
use crate::kmer::UniqueKmers;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated identifier and comma-joined k-mers
    #[default]
    Tsv,
    /// Single JSON object keyed by identifier
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Tsv => write!(f, "tsv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'r, 'a> {
    k: usize,
    sequences: BTreeMap<&'a str, &'r BTreeSet<&'a str>>,
}

/// Write `unique` to `writer` in the requested format
pub fn write_unique_kmers<W: Write>(
    unique: &UniqueKmers<'_>,
    format: OutputFormat,
    mut writer: W,
) -> Result<()> {
    match format {
        OutputFormat::Tsv => write_tsv(unique, &mut writer)?,
        OutputFormat::Json => write_json(unique, &mut writer)?,
    }
    writer.flush()?;
    Ok(())
}

/// Write `unique` to a file, creating parent directories as needed
pub fn write_to_path<P: AsRef<Path>>(
    unique: &UniqueKmers<'_>,
    format: OutputFormat,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(path)?);
    write_unique_kmers(unique, format, writer)?;

    debug!(path = %path.display(), %format, sequences = unique.len(), "Wrote unique k-mers");
    Ok(())
}

fn write_tsv<W: Write>(unique: &UniqueKmers<'_>, writer: &mut W) -> Result<()> {
    for (id, kmers) in unique.iter() {
        write!(writer, "{}\t", id)?;
        for (i, kmer) in kmers.iter().enumerate() {
            if i > 0 {
                writer.write_all(b",")?;
            }
            writer.write_all(kmer.as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn write_json<W: Write>(unique: &UniqueKmers<'_>, writer: &mut W) -> Result<()> {
    let report = JsonReport {
        k: unique.k(),
        sequences: unique.iter().collect(),
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::SequenceCollection;
    use crate::kmer::unique_kmers;
    use tempfile::TempDir;

    fn fixture() -> SequenceCollection {
        [("s1", "AATA"), ("s2", "ATGA"), ("s3", "ACTAT"), ("s4", "AT")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_tsv_lines() {
        let seqs = fixture();
        let unique = unique_kmers(&seqs, 2).unwrap();

        let mut buffer = Vec::new();
        write_unique_kmers(&unique, OutputFormat::Tsv, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "s1\tAA\ns2\tGA,TG\ns3\tAC,CT\n");
    }

    #[test]
    fn test_json_report() {
        let seqs = fixture();
        let unique = unique_kmers(&seqs, 2).unwrap();

        let mut buffer = Vec::new();
        write_unique_kmers(&unique, OutputFormat::Json, &mut buffer).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["k"], 2);
        assert_eq!(value["sequences"]["s2"], serde_json::json!(["GA", "TG"]));
        assert!(value["sequences"].get("s4").is_none());
    }

    #[test]
    fn test_empty_result_writes_nothing() {
        let seqs: SequenceCollection = [("a", "AC"), ("b", "AC")].into_iter().collect();
        let unique = unique_kmers(&seqs, 2).unwrap();

        let mut buffer = Vec::new();
        write_unique_kmers(&unique, OutputFormat::Tsv, &mut buffer).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_write_to_nested_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.tsv");

        let seqs = fixture();
        let unique = unique_kmers(&seqs, 2).unwrap();
        write_to_path(&unique, OutputFormat::Tsv, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(OutputFormat::Tsv.to_string(), "tsv");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
