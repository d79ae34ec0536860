//! Document enumeration and term streaming.
//!
//! A document is anything that can report how many length-k terms it
//! contains and stream those terms in a deterministic order. The builder
//! only consumes that capability; the concrete parsers here cover
//! FASTA/FASTQ (via needletail, gzip transparent) and plain text files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CobsError, Result};

mod fastx;
mod text;

/// Filter for document enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FileType {
    /// Accept every recognized document type.
    Any,
    /// Plain text files (.txt), one sequence per line.
    Text,
    /// FASTA files (.fa, .fasta, .fna, optionally .gz).
    Fasta,
    /// FASTQ files (.fq, .fastq, optionally .gz).
    Fastq,
}

/// Source of length-k terms.
pub trait DocumentSource {
    /// Display name of the document, stable across runs.
    fn name(&self) -> &str;

    /// Number of length-k terms without materializing them.
    fn num_terms(&self, term_size: usize) -> Result<usize>;

    /// Stream every length-k window to `sink`, in a deterministic order.
    fn process_terms(&self, term_size: usize, sink: &mut dyn FnMut(&[u8])) -> Result<()>;
}

/// A document backed by a file on disk.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    kind: FileType,
}

impl DocumentSource for DocumentEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_terms(&self, term_size: usize) -> Result<usize> {
        match self.kind {
            FileType::Fasta | FileType::Fastq => fastx::num_terms(&self.path, term_size),
            FileType::Text => text::num_terms(&self.path, term_size),
            FileType::Any => Err(CobsError::internal("unresolved document type")),
        }
    }

    fn process_terms(&self, term_size: usize, sink: &mut dyn FnMut(&[u8])) -> Result<()> {
        match self.kind {
            FileType::Fasta | FileType::Fastq => {
                fastx::process_terms(&self.path, term_size, sink)
            }
            FileType::Text => text::process_terms(&self.path, term_size, sink),
            FileType::Any => Err(CobsError::internal("unresolved document type")),
        }
    }
}

/// Ordered list of documents below a directory.
///
/// Paths are sorted, so document indices are reproducible across runs.
#[derive(Debug, Default)]
pub struct DocumentList {
    docs: Vec<DocumentEntry>,
}

impl DocumentList {
    /// Recursively scan `dir` for documents matching `filter`.
    pub fn scan(dir: &Path, filter: FileType) -> Result<Self> {
        let mut docs = Vec::new();
        collect(dir, filter, &mut docs)?;
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(DocumentList { docs })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentEntry> {
        self.docs.iter()
    }

    pub fn as_slice(&self) -> &[DocumentEntry] {
        &self.docs
    }
}

impl std::ops::Index<usize> for DocumentList {
    type Output = DocumentEntry;

    fn index(&self, i: usize) -> &DocumentEntry {
        &self.docs[i]
    }
}

fn collect(dir: &Path, filter: FileType, docs: &mut Vec<DocumentEntry>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| CobsError::io(dir, "read directory", e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CobsError::io(dir, "read directory", e))?;
        let path = entry.path();
        if path.is_dir() {
            collect(&path, filter, docs)?;
            continue;
        }
        let Some(kind) = classify(&path) else {
            continue;
        };
        let accepted = matches!(filter, FileType::Any) || kind == filter;
        if !accepted {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|e| CobsError::io(&path, "stat", e))?
            .len();
        docs.push(DocumentEntry {
            name: document_name(&path),
            path,
            size,
            kind,
        });
    }
    Ok(())
}

/// Determine the document type from the file extension, looking through a
/// trailing `.gz` for the sequence formats.
fn classify(path: &Path) -> Option<FileType> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(".gz").unwrap_or(file_name);
    let ext = Path::new(stem).extension()?.to_str()?;
    match ext.to_ascii_lowercase().as_str() {
        "fa" | "fasta" | "fna" => Some(FileType::Fasta),
        "fq" | "fastq" => Some(FileType::Fastq),
        "txt" => {
            // gzip text is not supported
            if file_name.ends_with(".gz") {
                None
            } else {
                Some(FileType::Text)
            }
        }
        _ => None,
    }
}

/// Document name: file name with `.gz` and the format extension removed.
fn document_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let without_gz = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    Path::new(without_gz)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(file_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Path::new("a/x.fasta")), Some(FileType::Fasta));
        assert_eq!(classify(Path::new("x.fna.gz")), Some(FileType::Fasta));
        assert_eq!(classify(Path::new("x.fq")), Some(FileType::Fastq));
        assert_eq!(classify(Path::new("x.txt")), Some(FileType::Text));
        assert_eq!(classify(Path::new("x.bam")), None);
        assert_eq!(classify(Path::new("x")), None);
    }

    #[test]
    fn test_document_name_strips_extensions() {
        assert_eq!(document_name(Path::new("/d/sample.fasta")), "sample");
        assert_eq!(document_name(Path::new("/d/sample.fasta.gz")), "sample");
        assert_eq!(document_name(Path::new("/d/reads.fq")), "reads");
    }

    #[test]
    fn test_scan_sorts_and_filters() -> Result<()> {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.fasta"), ">s\nACGT\n").unwrap();
        fs::write(dir.path().join("a.fasta"), ">s\nACGT\n").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.txt"), "ACGTACGT\n").unwrap();

        let all = DocumentList::scan(dir.path(), FileType::Any)?;
        let names: Vec<_> = all.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let fasta_only = DocumentList::scan(dir.path(), FileType::Fasta)?;
        assert_eq!(fasta_only.len(), 2);
        Ok(())
    }

    #[test]
    fn test_entry_term_count_and_stream() -> Result<()> {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("d.fasta"), ">s1\nACGTACGTACG\n>s2\nACG\n").unwrap();

        let list = DocumentList::scan(dir.path(), FileType::Any)?;
        let doc = &list[0];
        // 11-base record gives 8 windows of size 4; 3-base record gives none
        assert_eq!(doc.num_terms(4)?, 8);

        let mut terms = Vec::new();
        doc.process_terms(4, &mut |t| terms.push(t.to_vec()))?;
        assert_eq!(terms.len(), 8);
        assert_eq!(terms[0], b"ACGT");
        assert_eq!(terms[7], b"TACG");
        Ok(())
    }
}
