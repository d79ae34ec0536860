//! Shared helpers for the integration tests.

use std::fs;
use std::path::Path;

use cobs::{ClassicIndexParameters, DocumentList, FileType};

/// Write one FASTA document; each sequence becomes its own record so
/// k-mer windows never cross sequence boundaries.
pub fn write_fasta(dir: &Path, name: &str, seqs: &[&str]) {
    let mut content = String::new();
    for (i, seq) in seqs.iter().enumerate() {
        content.push_str(&format!(">{}_{}\n{}\n", name, i, seq));
    }
    fs::write(dir.join(format!("{}.fasta", name)), content).unwrap();
}

pub fn scan(dir: &Path) -> DocumentList {
    DocumentList::scan(dir, FileType::Any).unwrap()
}

/// Construction parameters sized for small test corpora.
pub fn test_params(num_hashes: u64, false_positive_rate: f64) -> ClassicIndexParameters {
    ClassicIndexParameters {
        term_size: 31,
        canonicalize: false,
        num_hashes,
        false_positive_rate,
        mem_bytes: 256 * 1024 * 1024,
        num_threads: 2,
        keep_temporary: false,
        continue_build: false,
    }
}
