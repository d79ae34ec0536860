//! FASTA/FASTQ term streaming backed by needletail.

use std::path::Path;

use needletail::parse_fastx_file;

use crate::core::kmer;
use crate::error::{CobsError, Result};

pub fn num_terms(path: &Path, term_size: usize) -> Result<usize> {
    let mut reader = parse_fastx_file(path)
        .map_err(|e| CobsError::format(path, format!("cannot parse sequence file: {}", e)))?;
    let mut total = 0usize;
    while let Some(record) = reader.next() {
        let record = record
            .map_err(|e| CobsError::format(path, format!("invalid sequence record: {}", e)))?;
        total += kmer::num_windows(record.seq().len(), term_size);
    }
    Ok(total)
}

pub fn process_terms(path: &Path, term_size: usize, sink: &mut dyn FnMut(&[u8])) -> Result<()> {
    let mut reader = parse_fastx_file(path)
        .map_err(|e| CobsError::format(path, format!("cannot parse sequence file: {}", e)))?;
    while let Some(record) = reader.next() {
        let record = record
            .map_err(|e| CobsError::format(path, format!("invalid sequence record: {}", e)))?;
        // windows never cross record boundaries
        kmer::for_each_window(&record.seq(), term_size, sink);
    }
    Ok(())
}
