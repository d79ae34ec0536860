//! The search engine.
//!
//! Hashes every k-mer of the query, fetches the addressed rows page by
//! page, ANDs the h rows of each k-mer, and accumulates set bits into
//! 16-bit per-document counters. A document's score is the number of
//! query k-mers that survive the AND against its column.

use crate::core::{hashing, kmer};
use crate::error::{CobsError, Result};
use crate::query::timer::Timer;
use crate::query::IndexReader;

/// Bit-expansion of a row byte into eight 0/1 counter increments.
const EXPAND: [[u16; 8]; 256] = {
    let mut lut = [[0u16; 8]; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut j = 0;
        while j < 8 {
            lut[byte][j] = ((byte >> j) & 1) as u16;
            j += 1;
        }
        byte += 1;
    }
    lut
};

/// Search engine over an opened index.
pub struct ClassicSearch<'a> {
    reader: &'a IndexReader,
    timer: Timer,
}

impl<'a> ClassicSearch<'a> {
    pub fn new(reader: &'a IndexReader) -> Self {
        ClassicSearch {
            reader,
            timer: Timer::new(),
        }
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn reset_timer(&mut self) {
        self.timer.reset();
    }

    /// Score every document against `query` and return up to
    /// `num_results` (score, document name) pairs, best first. Ties keep
    /// document index order.
    pub fn search(&mut self, query: &str, num_results: usize) -> Result<Vec<(u16, String)>> {
        let reader = self.reader;
        let term_size = reader.term_size() as usize;
        let q = query.as_bytes();
        if q.len() < term_size {
            return Err(CobsError::config(format!(
                "query of length {} is shorter than the term size {}",
                q.len(),
                term_size
            )));
        }
        let num_kmers = q.len() - term_size + 1;
        if num_kmers > u16::MAX as usize {
            return Err(CobsError::config(format!(
                "query with {} {}-mers exceeds the 16-bit score range",
                num_kmers, term_size
            )));
        }
        let num_hashes = reader.num_hashes() as usize;

        // One base hash pair per k-mer; the per-page row indices are
        // derived from these below because every page has its own modulus.
        self.timer.start("hashes");
        let mut canonical_buf = vec![0u8; term_size];
        let mut pairs = Vec::with_capacity(num_kmers);
        for window in q.windows(term_size) {
            let term = if reader.canonicalize() {
                kmer::canonicalize(window, &mut canonical_buf)
            } else {
                window
            };
            pairs.push(hashing::hash_pair(term));
        }
        self.timer.stop("hashes");

        let mut results: Vec<(u16, String)> = Vec::with_capacity(reader.num_documents());
        let mut rows = Vec::with_capacity(num_kmers * num_hashes);
        let mut io_buf = Vec::new();

        for (page_index, page) in reader.pages().iter().enumerate() {
            self.timer.start("hashes");
            rows.clear();
            for &pair in &pairs {
                for i in 0..num_hashes {
                    rows.push(hashing::row_index(pair, i as u64, page.signature_size));
                }
            }
            self.timer.stop("hashes");

            self.timer.start("io");
            let fetched = reader.fetch_rows(page_index, &rows, &mut io_buf)?;
            self.timer.stop("io");

            let mut counters = vec![0u16; page.row_size * 8];
            let mut and_row = vec![0u8; page.row_size];
            for kmer_index in 0..num_kmers {
                let kmer_rows = &fetched[kmer_index * num_hashes..(kmer_index + 1) * num_hashes];

                self.timer.start("and rows");
                and_row.copy_from_slice(kmer_rows[0]);
                for row in &kmer_rows[1..] {
                    for (acc, &byte) in and_row.iter_mut().zip(row.iter()) {
                        *acc &= byte;
                    }
                }
                self.timer.stop("and rows");

                self.timer.start("add rows");
                for (byte_index, &byte) in and_row.iter().enumerate() {
                    if byte == 0 {
                        continue;
                    }
                    let expand = &EXPAND[byte as usize];
                    let base = byte_index * 8;
                    for (j, &inc) in expand.iter().enumerate() {
                        counters[base + j] += inc;
                    }
                }
                self.timer.stop("add rows");
            }

            for (d, name) in page.file_names.iter().enumerate() {
                results.push((counters[d], name.clone()));
            }
        }

        self.timer.start("sort results");
        // stable sort: equal scores keep ascending document index
        results.sort_by(|a, b| b.0.cmp(&a.0));
        results.truncate(num_results);
        self.timer.stop("sort results");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_lut() {
        assert_eq!(EXPAND[0], [0u16; 8]);
        assert_eq!(EXPAND[0b0000_0001], [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(EXPAND[0b1000_0000], [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(EXPAND[0b1010_0101], [1, 0, 1, 0, 0, 1, 0, 1]);
        for byte in 0..256usize {
            let ones: u16 = EXPAND[byte].iter().sum();
            assert_eq!(ones, byte.count_ones() as u16);
        }
    }
}
