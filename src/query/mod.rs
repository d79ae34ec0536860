//! Read-side index abstraction and the search engine.
//!
//! An opened index exposes one capability set regardless of layout:
//! term size, canonicalization flag, hash count, pages (a classic index
//! is a single page holding every document), and batched row fetch.
//! Variants are classic/mmap, compact/mmap, and compact with batched
//! positioned reads ("aio").

pub mod search;
pub mod timer;

pub use search::ClassicSearch;
pub use timer::Timer;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;

use crate::error::{CobsError, Result};
use crate::index::header::{
    sniff_index_kind, ClassicIndexHeader, CompactIndexHeader, IndexKind,
};

/// Row-fetch backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QueryBackend {
    /// Memory-map the index (classic and compact).
    Mmap,
    /// Batched positioned reads (compact only).
    Aio,
}

/// Geometry and names of one page.
///
/// A classic index is modeled as one page spanning all documents.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub signature_size: u64,
    pub row_size: usize,
    pub file_names: Vec<String>,
    body_offset: u64,
}

impl PageMeta {
    pub fn num_documents(&self) -> usize {
        self.file_names.len()
    }
}

enum RowStorage {
    Mmap(Mmap),
    PositionedReads(File),
}

/// An opened index file.
pub struct IndexReader {
    path: PathBuf,
    kind: IndexKind,
    term_size: u32,
    canonicalize: bool,
    num_hashes: u64,
    page_size: u64,
    pages: Vec<PageMeta>,
    storage: RowStorage,
}

impl IndexReader {
    /// Open with the default mmap backend.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_backend(path, QueryBackend::Mmap)
    }

    pub fn open_with_backend(path: &Path, backend: QueryBackend) -> Result<Self> {
        let kind = sniff_index_kind(path)?;
        if backend == QueryBackend::Aio && kind == IndexKind::Classic {
            return Err(CobsError::config(
                "the aio backend supports compact indices only",
            ));
        }

        let file = File::open(path).map_err(|e| CobsError::io(path, "open", e))?;
        let file_len = file
            .metadata()
            .map_err(|e| CobsError::io(path, "stat", e))?
            .len();
        let mut reader = BufReader::new(&file);

        let (term_size, canonicalize, num_hashes, page_size, pages) = match kind {
            IndexKind::Classic => {
                let header = ClassicIndexHeader::read_from(&mut reader, path)?;
                let page = PageMeta {
                    signature_size: header.signature_size,
                    row_size: header.row_size as usize,
                    body_offset: header.serialized_len(),
                    file_names: header.file_names,
                };
                // classic indices report a page size of one block
                (header.term_size, header.canonicalize, header.num_hashes, 1, vec![page])
            }
            IndexKind::Compact => {
                let header = CompactIndexHeader::read_from(&mut reader, path)?;
                let pages = header
                    .pages
                    .iter()
                    .zip(&header.body_offsets)
                    .map(|(p, &offset)| PageMeta {
                        signature_size: p.signature_size,
                        row_size: p.row_size() as usize,
                        file_names: p.file_names.clone(),
                        body_offset: offset,
                    })
                    .collect();
                (
                    header.term_size,
                    header.canonicalize,
                    header.num_hashes,
                    header.page_size,
                    pages,
                )
            }
        };

        let expected_len = pages
            .last()
            .map(|p| p.body_offset + p.signature_size * p.row_size as u64)
            .unwrap_or(0);
        if file_len != expected_len {
            return Err(CobsError::format(
                path,
                format!("file is {} bytes, layout requires {}", file_len, expected_len),
            ));
        }

        let storage = match backend {
            QueryBackend::Mmap => {
                let mmap =
                    unsafe { Mmap::map(&file) }.map_err(|e| CobsError::io(path, "mmap", e))?;
                #[cfg(unix)]
                let _ = mmap.advise(memmap2::Advice::Random);
                RowStorage::Mmap(mmap)
            }
            QueryBackend::Aio => RowStorage::PositionedReads(file),
        };

        Ok(IndexReader {
            path: path.to_path_buf(),
            kind,
            term_size,
            canonicalize,
            num_hashes,
            page_size,
            pages,
            storage,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn term_size(&self) -> u32 {
        self.term_size
    }

    pub fn canonicalize(&self) -> bool {
        self.canonicalize
    }

    pub fn num_hashes(&self) -> u64 {
        self.num_hashes
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    pub fn num_documents(&self) -> usize {
        self.pages.iter().map(|p| p.num_documents()).sum()
    }

    /// Accumulator slots needed for a whole-index query: one byte-wide
    /// column per document slot including row padding.
    pub fn counts_size(&self) -> usize {
        self.pages.iter().map(|p| p.row_size * 8).sum()
    }

    /// All document names in index order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|p| p.file_names.iter().map(|n| n.as_str()))
    }

    /// Fetch the given rows of one page, in request order.
    ///
    /// With the mmap backend the returned slices borrow the mapping; with
    /// positioned reads they borrow `scratch`, which is resized as needed.
    pub fn fetch_rows<'a>(
        &'a self,
        page_index: usize,
        rows: &[u64],
        scratch: &'a mut Vec<u8>,
    ) -> Result<Vec<&'a [u8]>> {
        let page = self
            .pages
            .get(page_index)
            .ok_or_else(|| CobsError::internal(format!("page {} out of range", page_index)))?;
        for &row in rows {
            if row >= page.signature_size {
                return Err(CobsError::internal(format!(
                    "row {} out of range for signature size {}",
                    row, page.signature_size
                )));
            }
        }
        let row_size = page.row_size;

        match &self.storage {
            RowStorage::Mmap(mmap) => rows
                .iter()
                .map(|&row| {
                    let start = page.body_offset as usize + row as usize * row_size;
                    mmap.get(start..start + row_size)
                        .ok_or_else(|| CobsError::format(&self.path, "truncated body"))
                })
                .collect(),
            RowStorage::PositionedReads(file) => {
                scratch.clear();
                scratch.resize(rows.len() * row_size, 0);
                scratch
                    .par_chunks_mut(row_size)
                    .zip(rows.par_iter())
                    .try_for_each(|(chunk, &row)| {
                        let offset = page.body_offset + row * row_size as u64;
                        read_exact_at(file, chunk, offset)
                            .map_err(|e| CobsError::io(&self.path, "read row", e))
                    })?;
                Ok(scratch.chunks(row_size).collect())
            }
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let n = file.seek_read(buf, offset)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "unexpected end of index file",
            ));
        }
        let rest = buf;
        buf = &mut rest[n..];
        offset += n as u64;
    }
    Ok(())
}
