//! Classic index construction.
//!
//! External-memory batch-then-merge: documents are grouped into batches
//! whose bit-sliced matrix fits the memory budget, each batch is built in
//! RAM and serialized as a small classic index file, and the batch files
//! are merged pairwise until a single index remains. Every temporary is
//! itself a well-formed classic index, which is what makes `--continue`
//! cheap to validate.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::core::{hashing, kmer, sizing};
use crate::doc::DocumentSource;
use crate::error::{CobsError, Result};
use crate::index::header::ClassicIndexHeader;
use crate::index::{row_size_for, CLASSIC_INDEX_NAME};
use crate::memory;

/// Parameters of a classic construction run.
#[derive(Debug, Clone)]
pub struct ClassicIndexParameters {
    pub term_size: u32,
    pub canonicalize: bool,
    pub num_hashes: u64,
    pub false_positive_rate: f64,
    pub mem_bytes: usize,
    pub num_threads: usize,
    pub keep_temporary: bool,
    pub continue_build: bool,
}

impl Default for ClassicIndexParameters {
    fn default() -> Self {
        ClassicIndexParameters {
            term_size: 31,
            canonicalize: false,
            num_hashes: 1,
            false_positive_rate: 0.3,
            mem_bytes: memory::detect_available_memory(),
            num_threads: default_num_threads(),
            keep_temporary: false,
            continue_build: false,
        }
    }
}

pub(crate) fn default_num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn validate(params: &ClassicIndexParameters, num_documents: usize) -> Result<()> {
    if num_documents == 0 {
        return Err(CobsError::config("document list is empty"));
    }
    if params.term_size == 0 || params.term_size > 255 {
        return Err(CobsError::config(format!(
            "term size must be in [1, 255], got {}",
            params.term_size
        )));
    }
    sizing::check_parameters(params.num_hashes, params.false_positive_rate)?;
    if params.mem_bytes == 0 {
        return Err(CobsError::config("memory budget must be > 0"));
    }
    if params.num_threads == 0 {
        return Err(CobsError::config("thread count must be > 0"));
    }
    Ok(())
}

/// Build a classic index over `docs`, writing temporaries and the final
/// `index.cobs` into `out_dir`. Returns the path of the final index.
pub fn classic_construct<D: DocumentSource + Sync>(
    docs: &[D],
    out_dir: &Path,
    params: &ClassicIndexParameters,
) -> Result<PathBuf> {
    validate(params, docs.len())?;
    fs::create_dir_all(out_dir).map_err(|e| CobsError::io(out_dir, "create directory", e))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.num_threads)
        .build()
        .map_err(|e| CobsError::internal(format!("cannot build thread pool: {}", e)))?;

    pool.install(|| construct_in_pool(docs, out_dir, params))
}

fn construct_in_pool<D: DocumentSource + Sync>(
    docs: &[D],
    out_dir: &Path,
    params: &ClassicIndexParameters,
) -> Result<PathBuf> {
    let term_size = params.term_size as usize;

    // Size the signature from the largest document of the whole input so
    // that every batch shares one signature size and merges are trivial.
    let term_counts: Vec<usize> = docs
        .par_iter()
        .map(|d| d.num_terms(term_size))
        .collect::<Result<Vec<_>>>()?;
    let max_terms = *term_counts.iter().max().unwrap() as u64;
    let signature_size = sizing::calc_signature_size(
        max_terms,
        params.num_hashes,
        params.false_positive_rate,
    )?;

    let column_bytes = signature_size.div_ceil(8) as usize;
    if column_bytes > params.mem_bytes {
        return Err(CobsError::resource(
            "a single document column",
            params.mem_bytes,
            column_bytes,
        ));
    }

    let batch_docs = batch_document_count(params.mem_bytes, signature_size, docs.len());
    let batches: Vec<(usize, usize)> = (0..docs.len())
        .step_by(batch_docs)
        .map(|start| (start, batch_docs.min(docs.len() - start)))
        .collect();

    info!(
        "classic construction: {} documents, max {} {}-mers, signature size {}, {} batches of up to {} documents ({} budget)",
        docs.len(),
        max_terms,
        term_size,
        signature_size,
        batches.len(),
        batch_docs,
        memory::format_bytes(params.mem_bytes)
    );

    // Materialize batches; each batch matrix is owned by one thread.
    let mut level_files: Vec<PathBuf> = batches
        .par_iter()
        .enumerate()
        .map(|(i, &(start, len))| {
            let file = out_dir.join(format!("batch_0_{}.cobs", i));
            build_batch(&docs[start..start + len], &file, signature_size, params)?;
            Ok(file)
        })
        .collect::<Result<Vec<_>>>()?;

    // Pairwise merge tree; one level at a time, pairs in parallel.
    let mut level = 0usize;
    while level_files.len() > 1 {
        level += 1;
        let merged: Vec<PathBuf> = level_files
            .par_chunks(2)
            .enumerate()
            .map(|(i, chunk)| match chunk {
                [left, right] => {
                    let out = out_dir.join(format!("batch_{}_{}.cobs", level, i));
                    merge_pair(left, right, &out)?;
                    if !params.keep_temporary {
                        fs::remove_file(left)
                            .map_err(|e| CobsError::io(left, "remove temporary", e))?;
                        fs::remove_file(right)
                            .map_err(|e| CobsError::io(right, "remove temporary", e))?;
                    }
                    Ok(out)
                }
                [odd] => Ok(odd.clone()),
                _ => Err(CobsError::internal("empty merge chunk")),
            })
            .collect::<Result<Vec<_>>>()?;
        level_files = merged;
    }

    let final_path = out_dir.join(CLASSIC_INDEX_NAME);
    fs::rename(&level_files[0], &final_path)
        .map_err(|e| CobsError::io(&final_path, "rename", e))?;
    info!("classic index written to {}", final_path.display());
    Ok(final_path)
}

/// Documents per batch so one bit-sliced batch matrix fits the budget:
/// roughly mem_bytes / (signature_size bits / 8) columns, rounded down to
/// a multiple of 8 so merge concatenation stays byte-aligned.
fn batch_document_count(mem_bytes: usize, signature_size: u64, num_documents: usize) -> usize {
    let fit = ((mem_bytes as u64 * 8) / signature_size) as usize;
    let mut batch = fit.clamp(1, num_documents);
    if batch >= 8 {
        batch -= batch % 8;
    }
    batch
}

fn batch_header<D: DocumentSource>(
    docs: &[D],
    signature_size: u64,
    params: &ClassicIndexParameters,
) -> ClassicIndexHeader {
    ClassicIndexHeader {
        term_size: params.term_size,
        canonicalize: params.canonicalize,
        num_hashes: params.num_hashes,
        signature_size,
        row_size: row_size_for(docs.len()) as u64,
        file_names: docs.iter().map(|d| d.name().to_string()).collect(),
    }
}

fn build_batch<D: DocumentSource>(
    docs: &[D],
    file: &Path,
    signature_size: u64,
    params: &ClassicIndexParameters,
) -> Result<()> {
    let header = batch_header(docs, signature_size, params);

    if file.exists() {
        if params.continue_build {
            validate_existing_batch(file, &header)?;
            info!("reusing existing batch {}", file.display());
            return Ok(());
        }
        return Err(CobsError::config(format!(
            "batch file {} already exists; pass --clobber or --continue",
            file.display()
        )));
    }

    let term_size = params.term_size as usize;
    let row_size = row_size_for(docs.len());
    let mut body = vec![0u8; signature_size as usize * row_size];
    let mut canonical_buf = vec![0u8; term_size];

    for (d, doc) in docs.iter().enumerate() {
        let byte = d / 8;
        let bit = 1u8 << (d % 8);
        doc.process_terms(term_size, &mut |window| {
            let term = if params.canonicalize {
                kmer::canonicalize(window, &mut canonical_buf)
            } else {
                window
            };
            hashing::each_row_index(term, params.num_hashes, signature_size, &mut |row| {
                body[row as usize * row_size + byte] |= bit;
            });
        })?;
    }

    write_index_file(file, &header, &body)
}

/// Write header + body to a temporary name, then rename into place, so a
/// crashed run never leaves a file that parses.
fn write_index_file(file: &Path, header: &ClassicIndexHeader, body: &[u8]) -> Result<()> {
    let tmp = file.with_extension("cobs.tmp");
    {
        let out = File::create(&tmp).map_err(|e| CobsError::io(&tmp, "create", e))?;
        let mut writer = BufWriter::with_capacity(1 << 20, out);
        header
            .write_to(&mut writer)
            .and_then(|_| writer.write_all(body))
            .and_then(|_| writer.flush())
            .map_err(|e| CobsError::io(&tmp, "write", e))?;
    }
    fs::rename(&tmp, file).map_err(|e| CobsError::io(file, "rename", e))
}

/// A pre-existing batch file is reused only if it matches the intended
/// parameters and document set exactly.
fn validate_existing_batch(file: &Path, expected: &ClassicIndexHeader) -> Result<()> {
    let f = File::open(file).map_err(|e| CobsError::io(file, "open", e))?;
    let file_len = f
        .metadata()
        .map_err(|e| CobsError::io(file, "stat", e))?
        .len();
    let mut reader = BufReader::new(f);
    let header = ClassicIndexHeader::read_from(&mut reader, file)?;
    if header != *expected {
        return Err(CobsError::config(format!(
            "existing batch {} does not match the requested parameters",
            file.display()
        )));
    }
    if file_len != header.serialized_len() + header.body_size() {
        return Err(CobsError::format(file, "truncated batch body"));
    }
    Ok(())
}

/// Merge two batch indices into one: row r of the result is the bit
/// concatenation of row r of the left batch and row r of the right batch.
fn merge_pair(left: &Path, right: &Path, out: &Path) -> Result<()> {
    let mut reader_l = BufReader::with_capacity(1 << 20, open(left)?);
    let mut reader_r = BufReader::with_capacity(1 << 20, open(right)?);
    let header_l = ClassicIndexHeader::read_from(&mut reader_l, left)?;
    let header_r = ClassicIndexHeader::read_from(&mut reader_r, right)?;

    if header_l.signature_size != header_r.signature_size
        || header_l.term_size != header_r.term_size
        || header_l.num_hashes != header_r.num_hashes
        || header_l.canonicalize != header_r.canonicalize
    {
        return Err(CobsError::format(
            out,
            format!(
                "cannot merge {} and {}: parameter mismatch",
                left.display(),
                right.display()
            ),
        ));
    }

    let bits_l = header_l.num_documents();
    let bits_r = header_r.num_documents();
    let mut file_names = header_l.file_names.clone();
    file_names.extend_from_slice(&header_r.file_names);
    let header_out = ClassicIndexHeader {
        term_size: header_l.term_size,
        canonicalize: header_l.canonicalize,
        num_hashes: header_l.num_hashes,
        signature_size: header_l.signature_size,
        row_size: row_size_for(bits_l + bits_r) as u64,
        file_names,
    };

    let tmp = out.with_extension("cobs.tmp");
    {
        let f = File::create(&tmp).map_err(|e| CobsError::io(&tmp, "create", e))?;
        let mut writer = BufWriter::with_capacity(1 << 20, f);
        header_out
            .write_to(&mut writer)
            .map_err(|e| CobsError::io(&tmp, "write", e))?;

        let mut row_l = vec![0u8; header_l.row_size as usize];
        let mut row_r = vec![0u8; header_r.row_size as usize];
        let mut row_out = vec![0u8; header_out.row_size as usize];
        for _ in 0..header_out.signature_size {
            reader_l
                .read_exact(&mut row_l)
                .map_err(|e| CobsError::io(left, "read row", e))?;
            reader_r
                .read_exact(&mut row_r)
                .map_err(|e| CobsError::io(right, "read row", e))?;
            concat_rows(&row_l, bits_l, &row_r, &mut row_out);
            writer
                .write_all(&row_out)
                .map_err(|e| CobsError::io(&tmp, "write row", e))?;
        }
        writer.flush().map_err(|e| CobsError::io(&tmp, "write", e))?;
    }
    fs::rename(&tmp, out).map_err(|e| CobsError::io(out, "rename", e))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| CobsError::io(path, "open", e))
}

/// Bit-concatenate row `left` (left_bits wide) and row `right` into `out`.
///
/// The left operand is usually byte-aligned (batch sizes are multiples of
/// 8 except the final batch), but an unaligned left row is handled by
/// shifting the right bytes across the seam. Relies on zero padding bits.
fn concat_rows(left: &[u8], left_bits: usize, right: &[u8], out: &mut [u8]) {
    out.fill(0);
    out[..left.len()].copy_from_slice(left);
    let shift = left_bits % 8;
    if shift == 0 {
        out[left.len()..left.len() + right.len()].copy_from_slice(right);
        return;
    }
    let seam = left_bits / 8;
    for (i, &byte) in right.iter().enumerate() {
        out[seam + i] |= byte << shift;
        let carry = byte >> (8 - shift);
        if carry != 0 {
            out[seam + i + 1] |= carry;
        }
    }
}

/// Build a classic index with random content, bypassing document parsing.
/// Each document inserts `document_size` random 31-mers through the real
/// hashing path, so the bit distribution matches a real build.
pub fn classic_construct_random(
    out_file: &Path,
    signature_size: u64,
    num_documents: usize,
    document_size: usize,
    num_hashes: u64,
    seed: u64,
) -> Result<PathBuf> {
    if signature_size == 0 || num_documents == 0 {
        return Err(CobsError::config(
            "signature size and document count must be > 0",
        ));
    }
    if num_hashes == 0 {
        return Err(CobsError::config("num_hashes must be >= 1"));
    }

    let header = ClassicIndexHeader {
        term_size: 31,
        canonicalize: false,
        num_hashes,
        signature_size,
        row_size: row_size_for(num_documents) as u64,
        file_names: (0..num_documents)
            .map(|i| format!("document_{:05}", i))
            .collect(),
    };

    let row_size = row_size_for(num_documents);
    let mut body = vec![0u8; signature_size as usize * row_size];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut term = [0u8; 31];

    for d in 0..num_documents {
        let byte = d / 8;
        let bit = 1u8 << (d % 8);
        for _ in 0..document_size {
            for base in term.iter_mut() {
                *base = crate::random::BASES[rng.gen_range(0..4)];
            }
            hashing::each_row_index(&term, num_hashes, signature_size, &mut |row| {
                body[row as usize * row_size + byte] |= bit;
            });
        }
    }

    write_index_file(out_file, &header, &body)?;
    info!("random classic index written to {}", out_file.display());
    Ok(out_file.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_document_count() {
        // 1000-bit signature, 1 KB budget: 8192 bits / 1000 = 8 documents
        assert_eq!(batch_document_count(1024, 1000, 100), 8);
        // plenty of budget clamps to the document count
        assert_eq!(batch_document_count(1 << 30, 1000, 100), 100);
        // tiny budget still admits one document
        assert_eq!(batch_document_count(1, 1000, 100), 1);
        // rounding down to a multiple of 8
        assert_eq!(batch_document_count(1024, 650, 100), 8);
    }

    #[test]
    fn test_concat_rows_aligned() {
        let left = [0b1010_0001u8];
        let right = [0b0000_0111u8, 0b0000_0001u8];
        let mut out = [0u8; 3];
        concat_rows(&left, 8, &right, &mut out);
        assert_eq!(out, [0b1010_0001, 0b0000_0111, 0b0000_0001]);
    }

    #[test]
    fn test_concat_rows_unaligned() {
        // left holds 3 bits (0b101), right holds 9 bits
        let left = [0b0000_0101u8];
        let right = [0b1111_1111u8, 0b0000_0001u8];
        let mut out = [0u8; 2];
        concat_rows(&left, 3, &right, &mut out);
        // out bit d is left bit d for d<3, right bit d-3 afterwards
        assert_eq!(out[0], 0b1111_1101);
        assert_eq!(out[1], 0b0000_1111);
    }

    #[test]
    fn test_concat_rows_matches_bit_reference() {
        let left = [0b0110_1001u8, 0b0000_0010u8];
        let right = [0b1100_0011u8, 0b0000_1101u8];
        for left_bits in [9, 10, 12, 16] {
            for right_bits in [9, 12] {
                let out_len = (left_bits + right_bits + 7) / 8;
                let mut out = vec![0u8; out_len];
                // zero the padding the invariant promises
                let mut l = left;
                let mut r = right;
                mask_padding(&mut l, left_bits);
                mask_padding(&mut r, right_bits);
                concat_rows(&l, left_bits, &r, &mut out);
                for d in 0..left_bits + right_bits {
                    let expected = if d < left_bits {
                        get_bit(&l, d)
                    } else {
                        get_bit(&r, d - left_bits)
                    };
                    assert_eq!(
                        get_bit(&out, d),
                        expected,
                        "bit {} for split {}/{}",
                        d,
                        left_bits,
                        right_bits
                    );
                }
            }
        }
    }

    fn mask_padding(row: &mut [u8], bits: usize) {
        for d in bits..row.len() * 8 {
            row[d / 8] &= !(1 << (d % 8));
        }
    }

    fn get_bit(row: &[u8], d: usize) -> bool {
        row[d / 8] & (1 << (d % 8)) != 0
    }
}
