//! Compact index construction.
//!
//! Documents are partitioned into fixed-size pages in input order, each
//! page is built as its own classic sub-index with a signature sized for
//! that page's largest document, and the sub-indices are concatenated
//! into a single compact file. Small-document pages get small signatures
//! instead of inheriting the global maximum.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::doc::DocumentSource;
use crate::error::{CobsError, Result};
use crate::index::header::{
    sniff_index_kind, ClassicIndexHeader, CompactIndexHeader, CompactPage, IndexKind,
};
use crate::index::{classic, ClassicIndexParameters, COMPACT_INDEX_NAME};
use crate::memory;

/// Parameters of a compact construction run.
#[derive(Debug, Clone)]
pub struct CompactIndexParameters {
    pub term_size: u32,
    pub canonicalize: bool,
    pub num_hashes: u64,
    pub false_positive_rate: f64,
    /// Documents per page; `None` selects ceil(sqrt(N)).
    pub page_size: Option<usize>,
    pub mem_bytes: usize,
    pub num_threads: usize,
    pub keep_temporary: bool,
    pub continue_build: bool,
}

impl Default for CompactIndexParameters {
    fn default() -> Self {
        CompactIndexParameters {
            term_size: 31,
            canonicalize: false,
            num_hashes: 1,
            false_positive_rate: 0.3,
            page_size: None,
            mem_bytes: memory::detect_available_memory(),
            num_threads: classic::default_num_threads(),
            keep_temporary: false,
            continue_build: false,
        }
    }
}

/// Default page size: ceil(sqrt(N)).
pub fn default_page_size(num_documents: usize) -> usize {
    ((num_documents as f64).sqrt().ceil() as usize).max(1)
}

/// Build a compact index over `docs` in `out_dir`: one classic sub-index
/// per page (`<page>.cobs`), then the combined `index.com_idx.cobs`.
pub fn compact_construct<D: DocumentSource + Sync>(
    docs: &[D],
    out_dir: &Path,
    params: &CompactIndexParameters,
) -> Result<PathBuf> {
    if docs.is_empty() {
        return Err(CobsError::config("document list is empty"));
    }
    let page_size = match params.page_size {
        Some(0) => return Err(CobsError::config("page size must be > 0")),
        Some(p) => p,
        None => default_page_size(docs.len()),
    };
    fs::create_dir_all(out_dir).map_err(|e| CobsError::io(out_dir, "create directory", e))?;

    let classic_params = ClassicIndexParameters {
        term_size: params.term_size,
        canonicalize: params.canonicalize,
        num_hashes: params.num_hashes,
        false_positive_rate: params.false_positive_rate,
        mem_bytes: params.mem_bytes,
        num_threads: params.num_threads,
        keep_temporary: params.keep_temporary,
        continue_build: params.continue_build,
    };

    let num_pages = docs.len().div_ceil(page_size);
    info!(
        "compact construction: {} documents in {} pages of {}",
        docs.len(),
        num_pages,
        page_size
    );

    for (page, chunk) in docs.chunks(page_size).enumerate() {
        let page_file = out_dir.join(format!("{}.cobs", page));
        if page_file.exists() {
            if params.continue_build {
                validate_existing_page(&page_file, chunk, &classic_params)?;
                info!("reusing existing page {}", page_file.display());
                continue;
            }
            return Err(CobsError::config(format!(
                "page file {} already exists; pass --clobber or --continue",
                page_file.display()
            )));
        }
        let work_dir = out_dir.join(format!("page_{:04}", page));
        let built = classic::classic_construct(chunk, &work_dir, &classic_params)?;
        fs::rename(&built, &page_file).map_err(|e| CobsError::io(&page_file, "rename", e))?;
        if !params.keep_temporary {
            fs::remove_dir_all(&work_dir)
                .map_err(|e| CobsError::io(&work_dir, "remove temporary", e))?;
        }
    }

    compact_combine(out_dir, &out_dir.join(COMPACT_INDEX_NAME), page_size)
}

/// A pre-existing page is reused only if it was built with the intended
/// parameters over the same documents. The signature size is not checked
/// here; it depends on the page's term counts and is validated implicitly
/// by the combine step reading the body it describes.
fn validate_existing_page<D: DocumentSource>(
    page_file: &Path,
    chunk: &[D],
    params: &ClassicIndexParameters,
) -> Result<()> {
    let mut reader = BufReader::new(
        File::open(page_file).map_err(|e| CobsError::io(page_file, "open", e))?,
    );
    let header = ClassicIndexHeader::read_from(&mut reader, page_file)?;
    let names_match = header
        .file_names
        .iter()
        .map(|n| n.as_str())
        .eq(chunk.iter().map(|d| d.name()));
    if header.term_size != params.term_size
        || header.canonicalize != params.canonicalize
        || header.num_hashes != params.num_hashes
        || !names_match
    {
        return Err(CobsError::config(format!(
            "existing page {} does not match the requested parameters",
            page_file.display()
        )));
    }
    Ok(())
}

/// Combine the classic sub-indices in `in_dir` into one compact file.
///
/// Every sub-index must have exactly `page_size` documents except the
/// last, and all must agree on term size, canonicalization, and hash
/// count.
pub fn compact_combine(in_dir: &Path, out_file: &Path, page_size: usize) -> Result<PathBuf> {
    if page_size == 0 {
        return Err(CobsError::config("page size must be > 0"));
    }
    let page_files = collect_page_files(in_dir, out_file)?;
    if page_files.is_empty() {
        return Err(CobsError::config(format!(
            "no classic index files found in {}",
            in_dir.display()
        )));
    }

    let mut page_headers = Vec::with_capacity(page_files.len());
    for file in &page_files {
        let mut reader = BufReader::new(
            File::open(file).map_err(|e| CobsError::io(file, "open", e))?,
        );
        page_headers.push(ClassicIndexHeader::read_from(&mut reader, file)?);
    }

    let first = &page_headers[0];
    for (file, header) in page_files.iter().zip(&page_headers) {
        if header.term_size != first.term_size
            || header.canonicalize != first.canonicalize
            || header.num_hashes != first.num_hashes
        {
            return Err(CobsError::config(format!(
                "page {} disagrees on index parameters",
                file.display()
            )));
        }
    }
    for (i, (file, header)) in page_files.iter().zip(&page_headers).enumerate() {
        let is_last = i + 1 == page_headers.len();
        if header.num_documents() != page_size && !(is_last && header.num_documents() < page_size)
        {
            return Err(CobsError::config(format!(
                "page {} has {} documents, expected {}",
                file.display(),
                header.num_documents(),
                page_size
            )));
        }
    }

    let mut header = CompactIndexHeader {
        term_size: first.term_size,
        canonicalize: first.canonicalize,
        num_hashes: first.num_hashes,
        page_size: page_size as u64,
        pages: page_headers
            .iter()
            .map(|h| CompactPage {
                signature_size: h.signature_size,
                file_names: h.file_names.clone(),
            })
            .collect(),
        body_offsets: Vec::new(),
    };
    header.compute_body_offsets();

    let tmp = out_file.with_extension("cobs.tmp");
    {
        let f = File::create(&tmp).map_err(|e| CobsError::io(&tmp, "create", e))?;
        let mut writer = BufWriter::with_capacity(1 << 20, f);
        header
            .write_to(&mut writer)
            .map_err(|e| CobsError::io(&tmp, "write", e))?;

        for (file, page_header) in page_files.iter().zip(&page_headers) {
            let mut f = File::open(file).map_err(|e| CobsError::io(file, "open", e))?;
            f.seek(SeekFrom::Start(page_header.serialized_len()))
                .map_err(|e| CobsError::io(file, "seek", e))?;
            let mut body = f.take(page_header.body_size());
            let copied = io::copy(&mut body, &mut writer)
                .map_err(|e| CobsError::io(file, "copy body", e))?;
            if copied != page_header.body_size() {
                return Err(CobsError::format(file, "truncated page body"));
            }
        }
        writer.flush().map_err(|e| CobsError::io(&tmp, "write", e))?;
    }
    fs::rename(&tmp, out_file).map_err(|e| CobsError::io(out_file, "rename", e))?;
    info!("compact index written to {}", out_file.display());
    Ok(out_file.to_path_buf())
}

/// Classic `.cobs` files in `in_dir`, ordered numerically by file stem
/// where possible so `10.cobs` sorts after `9.cobs`.
fn collect_page_files(in_dir: &Path, out_file: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(in_dir).map_err(|e| CobsError::io(in_dir, "read directory", e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CobsError::io(in_dir, "read directory", e))?;
        let path = entry.path();
        if !path.is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("cobs")
            || path.file_name() == out_file.file_name()
        {
            continue;
        }
        if sniff_index_kind(&path)? != IndexKind::Classic {
            continue;
        }
        files.push(path);
    }
    files.sort_by_key(|p| {
        let stem = p
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match stem.parse::<u64>() {
            Ok(n) => (0, n, stem),
            Err(_) => (1, 0, stem),
        }
    });
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_page_size() {
        assert_eq!(default_page_size(1), 1);
        assert_eq!(default_page_size(100), 10);
        assert_eq!(default_page_size(101), 11);
        assert_eq!(default_page_size(10_000), 100);
    }
}
