//! Plain-text term streaming: each line is an independent sequence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::kmer;
use crate::error::{CobsError, Result};

fn each_line(path: &Path, f: &mut dyn FnMut(&[u8])) -> Result<()> {
    let file = File::open(path).map_err(|e| CobsError::io(path, "open", e))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| CobsError::io(path, "read", e))?;
        if n == 0 {
            return Ok(());
        }
        while line.last().is_some_and(|&b| b == b'\n' || b == b'\r') {
            line.pop();
        }
        if !line.is_empty() {
            f(&line);
        }
    }
}

pub fn num_terms(path: &Path, term_size: usize) -> Result<usize> {
    let mut total = 0usize;
    each_line(path, &mut |line| {
        total += kmer::num_windows(line.len(), term_size);
    })?;
    Ok(total)
}

pub fn process_terms(path: &Path, term_size: usize, sink: &mut dyn FnMut(&[u8])) -> Result<()> {
    each_line(path, &mut |line| {
        kmer::for_each_window(line, term_size, sink);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_lines_are_independent_sequences() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "ACGTAC\nGT\nTTTT\r\n").unwrap();

        assert_eq!(num_terms(&path, 4)?, 3 + 0 + 1);

        let mut terms = Vec::new();
        process_terms(&path, 4, &mut |t| terms.push(t.to_vec()))?;
        assert_eq!(terms, vec![b"ACGT".to_vec(), b"CGTA".to_vec(), b"GTAC".to_vec(), b"TTTT".to_vec()]);
        Ok(())
    }
}
