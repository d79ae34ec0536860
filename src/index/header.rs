//! On-disk headers for the classic and compact index formats.
//!
//! All integers are little-endian and fixed width. Headers are
//! self-describing: they carry everything needed to parse the body.
//!
//! Classic file layout:
//! ```text
//! magic "COBSCLA\0" | version u8
//! term_size u32 | canonicalize u8 | num_hashes u64
//! signature_size u64 | row_size u64 | num_documents u64
//! num_documents x (name_len u64, name bytes)
//! body: signature_size * row_size bytes, row-major
//! ```
//!
//! Compact file layout:
//! ```text
//! magic "COBSCOM\0" | version u8
//! term_size u32 | canonicalize u8 | num_hashes u64
//! page_size u64 | num_pages u64
//! num_pages x (signature_size u64, num_documents u64, names...)
//! num_pages x body_offset u64        (absolute file offsets)
//! page bodies concatenated in page order
//! ```

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{CobsError, Result};

pub const CLASSIC_MAGIC: [u8; 8] = *b"COBSCLA\0";
pub const COMPACT_MAGIC: [u8; 8] = *b"COBSCOM\0";
pub const FORMAT_VERSION: u8 = 1;

/// Upper bound on a stored document name, guards against garbage lengths.
const MAX_NAME_LENGTH: usize = 10_000;

/// Which layout a file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Classic,
    Compact,
}

/// Read the magic bytes of an index file.
pub fn sniff_index_kind(path: &Path) -> Result<IndexKind> {
    let mut file = std::fs::File::open(path).map_err(|e| CobsError::io(path, "open", e))?;
    let mut magic = [0u8; 8];
    file.read_exact(&mut magic)
        .map_err(|e| CobsError::io(path, "read magic", e))?;
    match magic {
        CLASSIC_MAGIC => Ok(IndexKind::Classic),
        COMPACT_MAGIC => Ok(IndexKind::Compact),
        _ => Err(CobsError::format(path, "unrecognized magic bytes")),
    }
}

/// Header of a classic index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicIndexHeader {
    pub term_size: u32,
    pub canonicalize: bool,
    pub num_hashes: u64,
    pub signature_size: u64,
    pub row_size: u64,
    pub file_names: Vec<String>,
}

impl ClassicIndexHeader {
    pub fn num_documents(&self) -> usize {
        self.file_names.len()
    }

    pub fn body_size(&self) -> u64 {
        self.signature_size * self.row_size
    }

    /// Exact byte length of the serialized header.
    pub fn serialized_len(&self) -> u64 {
        let mut len = 8 + 1 + 4 + 1 + 8 + 8 + 8 + 8;
        for name in &self.file_names {
            len += 8 + name.len() as u64;
        }
        len
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&CLASSIC_MAGIC)?;
        w.write_all(&[FORMAT_VERSION])?;
        w.write_all(&self.term_size.to_le_bytes())?;
        w.write_all(&[self.canonicalize as u8])?;
        w.write_all(&self.num_hashes.to_le_bytes())?;
        w.write_all(&self.signature_size.to_le_bytes())?;
        w.write_all(&self.row_size.to_le_bytes())?;
        w.write_all(&(self.file_names.len() as u64).to_le_bytes())?;
        for name in &self.file_names {
            write_name(w, name)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R, path: &Path) -> Result<Self> {
        let magic = read_array::<8, R>(r, path)?;
        if magic != CLASSIC_MAGIC {
            return Err(CobsError::format(path, "not a classic index (bad magic)"));
        }
        read_version(r, path)?;
        let term_size = u32::from_le_bytes(read_array::<4, R>(r, path)?);
        let canonicalize = read_bool(r, path)?;
        let num_hashes = read_u64(r, path)?;
        let signature_size = read_u64(r, path)?;
        let row_size = read_u64(r, path)?;
        let num_documents = read_u64(r, path)? as usize;
        let file_names = read_names(r, path, num_documents)?;

        if row_size != num_documents.div_ceil(8) as u64 {
            return Err(CobsError::format(
                path,
                format!(
                    "row_size {} inconsistent with {} documents",
                    row_size, num_documents
                ),
            ));
        }
        if num_documents == 0 || signature_size == 0 {
            return Err(CobsError::format(path, "empty index"));
        }
        Ok(ClassicIndexHeader {
            term_size,
            canonicalize,
            num_hashes,
            signature_size,
            row_size,
            file_names,
        })
    }
}

/// One page of a compact index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactPage {
    pub signature_size: u64,
    pub file_names: Vec<String>,
}

impl CompactPage {
    pub fn num_documents(&self) -> usize {
        self.file_names.len()
    }

    pub fn row_size(&self) -> u64 {
        self.file_names.len().div_ceil(8) as u64
    }

    pub fn body_size(&self) -> u64 {
        self.signature_size * self.row_size()
    }
}

/// Header of a compact index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactIndexHeader {
    pub term_size: u32,
    pub canonicalize: bool,
    pub num_hashes: u64,
    pub page_size: u64,
    pub pages: Vec<CompactPage>,
    /// Absolute file offset of each page body.
    pub body_offsets: Vec<u64>,
}

impl CompactIndexHeader {
    pub fn num_documents(&self) -> usize {
        self.pages.iter().map(|p| p.num_documents()).sum()
    }

    /// Exact byte length of the serialized header, independent of the
    /// offset values; used to precompute the offsets themselves.
    pub fn serialized_len(&self) -> u64 {
        let mut len = 8 + 1 + 4 + 1 + 8 + 8 + 8;
        for page in &self.pages {
            len += 8 + 8;
            for name in &page.file_names {
                len += 8 + name.len() as u64;
            }
        }
        len + 8 * self.pages.len() as u64
    }

    /// Fill `body_offsets` from the header length and the page body sizes.
    pub fn compute_body_offsets(&mut self) {
        let mut offset = self.serialized_len();
        self.body_offsets = self
            .pages
            .iter()
            .map(|p| {
                let o = offset;
                offset += p.body_size();
                o
            })
            .collect();
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&COMPACT_MAGIC)?;
        w.write_all(&[FORMAT_VERSION])?;
        w.write_all(&self.term_size.to_le_bytes())?;
        w.write_all(&[self.canonicalize as u8])?;
        w.write_all(&self.num_hashes.to_le_bytes())?;
        w.write_all(&self.page_size.to_le_bytes())?;
        w.write_all(&(self.pages.len() as u64).to_le_bytes())?;
        for page in &self.pages {
            w.write_all(&page.signature_size.to_le_bytes())?;
            w.write_all(&(page.file_names.len() as u64).to_le_bytes())?;
            for name in &page.file_names {
                write_name(w, name)?;
            }
        }
        for offset in &self.body_offsets {
            w.write_all(&offset.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R, path: &Path) -> Result<Self> {
        let magic = read_array::<8, R>(r, path)?;
        if magic != COMPACT_MAGIC {
            return Err(CobsError::format(path, "not a compact index (bad magic)"));
        }
        read_version(r, path)?;
        let term_size = u32::from_le_bytes(read_array::<4, R>(r, path)?);
        let canonicalize = read_bool(r, path)?;
        let num_hashes = read_u64(r, path)?;
        let page_size = read_u64(r, path)?;
        let num_pages = read_u64(r, path)? as usize;
        if num_pages == 0 {
            return Err(CobsError::format(path, "compact index with zero pages"));
        }

        let mut pages = Vec::with_capacity(num_pages);
        for _ in 0..num_pages {
            let signature_size = read_u64(r, path)?;
            let num_documents = read_u64(r, path)? as usize;
            let file_names = read_names(r, path, num_documents)?;
            if num_documents == 0 || signature_size == 0 {
                return Err(CobsError::format(path, "empty page"));
            }
            pages.push(CompactPage {
                signature_size,
                file_names,
            });
        }

        let mut body_offsets = Vec::with_capacity(num_pages);
        for _ in 0..num_pages {
            body_offsets.push(read_u64(r, path)?);
        }

        let header = CompactIndexHeader {
            term_size,
            canonicalize,
            num_hashes,
            page_size,
            pages,
            body_offsets,
        };
        // offsets must agree with the page sizes they claim to skip
        let mut expected = header.serialized_len();
        for (page, &offset) in header.pages.iter().zip(&header.body_offsets) {
            if offset != expected {
                return Err(CobsError::format(
                    path,
                    format!("page body offset {} does not match layout", offset),
                ));
            }
            expected += page.body_size();
        }
        Ok(header)
    }
}

fn write_name<W: Write>(w: &mut W, name: &str) -> std::io::Result<()> {
    w.write_all(&(name.len() as u64).to_le_bytes())?;
    w.write_all(name.as_bytes())
}

fn read_version<R: Read>(r: &mut R, path: &Path) -> Result<()> {
    let version = read_array::<1, R>(r, path)?[0];
    if version != FORMAT_VERSION {
        return Err(CobsError::format(
            path,
            format!("unsupported version {} (expected {})", version, FORMAT_VERSION),
        ));
    }
    Ok(())
}

fn read_array<const N: usize, R: Read>(r: &mut R, path: &Path) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)
        .map_err(|e| CobsError::io(path, "read header", e))?;
    Ok(buf)
}

fn read_u64<R: Read>(r: &mut R, path: &Path) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array::<8, R>(r, path)?))
}

fn read_bool<R: Read>(r: &mut R, path: &Path) -> Result<bool> {
    match read_array::<1, R>(r, path)?[0] {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(CobsError::format(path, format!("invalid boolean byte {}", v))),
    }
}

fn read_names<R: Read>(r: &mut R, path: &Path, count: usize) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let len = read_u64(r, path)? as usize;
        if len > MAX_NAME_LENGTH {
            return Err(CobsError::format(
                path,
                format!("document name length {} exceeds maximum {}", len, MAX_NAME_LENGTH),
            ));
        }
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf)
            .map_err(|e| CobsError::io(path, "read header", e))?;
        let name = String::from_utf8(buf)
            .map_err(|_| CobsError::format(path, "document name is not UTF-8"))?;
        names.push(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_classic_header_round_trip() {
        let header = ClassicIndexHeader {
            term_size: 31,
            canonicalize: true,
            num_hashes: 3,
            signature_size: 12345,
            row_size: 1,
            file_names: vec!["doc_a".into(), "doc_b".into(), "doc_c".into()],
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, header.serialized_len());

        let parsed =
            ClassicIndexHeader::read_from(&mut Cursor::new(&buf), Path::new("mem")).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_classic_header_rejects_bad_magic() {
        let mut buf = Vec::new();
        ClassicIndexHeader {
            term_size: 31,
            canonicalize: false,
            num_hashes: 1,
            signature_size: 10,
            row_size: 1,
            file_names: vec!["x".into()],
        }
        .write_to(&mut buf)
        .unwrap();
        buf[0] = b'X';
        assert!(ClassicIndexHeader::read_from(&mut Cursor::new(&buf), Path::new("mem")).is_err());
    }

    #[test]
    fn test_classic_header_rejects_inconsistent_row_size() {
        let mut buf = Vec::new();
        let header = ClassicIndexHeader {
            term_size: 31,
            canonicalize: false,
            num_hashes: 1,
            signature_size: 10,
            row_size: 1,
            file_names: (0..9).map(|i| format!("d{}", i)).collect(),
        };
        // 9 documents need row_size 2
        header.write_to(&mut buf).unwrap();
        assert!(ClassicIndexHeader::read_from(&mut Cursor::new(&buf), Path::new("mem")).is_err());
    }

    #[test]
    fn test_compact_header_round_trip() {
        let mut header = CompactIndexHeader {
            term_size: 21,
            canonicalize: false,
            num_hashes: 2,
            page_size: 2,
            pages: vec![
                CompactPage {
                    signature_size: 100,
                    file_names: vec!["a".into(), "b".into()],
                },
                CompactPage {
                    signature_size: 40,
                    file_names: vec!["c".into()],
                },
            ],
            body_offsets: Vec::new(),
        };
        header.compute_body_offsets();
        assert_eq!(header.body_offsets[0], header.serialized_len());
        assert_eq!(
            header.body_offsets[1],
            header.serialized_len() + header.pages[0].body_size()
        );

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, header.serialized_len());

        let parsed =
            CompactIndexHeader::read_from(&mut Cursor::new(&buf), Path::new("mem")).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_sniff_kind() {
        let dir = tempfile::tempdir().unwrap();
        let classic = dir.path().join("c.cobs");
        let mut buf = Vec::new();
        ClassicIndexHeader {
            term_size: 31,
            canonicalize: false,
            num_hashes: 1,
            signature_size: 8,
            row_size: 1,
            file_names: vec!["x".into()],
        }
        .write_to(&mut buf)
        .unwrap();
        std::fs::write(&classic, &buf).unwrap();
        assert_eq!(sniff_index_kind(&classic).unwrap(), IndexKind::Classic);

        let garbage = dir.path().join("g.cobs");
        std::fs::write(&garbage, b"not an index").unwrap();
        assert!(sniff_index_kind(&garbage).is_err());
    }
}
