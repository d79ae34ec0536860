//! Index construction commands: output directory policy, parameter
//! assembly, and dispatch into the builders.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;

use crate::commands::ConstructArgs;
use crate::doc::DocumentList;
use crate::index::{
    classic_construct, classic_construct_random, compact_combine, compact_construct,
    ClassicIndexParameters, CompactIndexParameters,
};
use crate::memory;

/// Clobber/continue policy for construction output directories: an
/// existing non-empty directory is fatal unless one of the flags is set.
fn prepare_out_dir(out_dir: &Path, clobber: bool, continue_build: bool) -> Result<()> {
    if !out_dir.exists() {
        return Ok(());
    }
    if clobber {
        fs::remove_dir_all(out_dir)
            .with_context(|| format!("cannot clobber {}", out_dir.display()))?;
        return Ok(());
    }
    if continue_build {
        return Ok(());
    }
    let empty = out_dir
        .read_dir()
        .with_context(|| format!("cannot read {}", out_dir.display()))?
        .next()
        .is_none();
    if !empty {
        bail!(
            "output directory {} exists, will not overwrite without --clobber",
            out_dir.display()
        );
    }
    Ok(())
}

fn scan_documents(args: &ConstructArgs) -> Result<DocumentList> {
    let list = DocumentList::scan(&args.in_dir, args.file_type)
        .context("cannot enumerate input documents")?;
    if list.is_empty() {
        bail!("no documents found in {}", args.in_dir.display());
    }
    info!("found {} documents in {}", list.len(), args.in_dir.display());
    Ok(list)
}

fn resolve_mem_bytes(arg: &str) -> Result<usize> {
    let parsed = memory::parse_byte_suffix(arg)?;
    let mem_bytes = parsed.unwrap_or_else(memory::detect_available_memory);
    info!("memory budget: {}", memory::format_bytes(mem_bytes));
    Ok(mem_bytes)
}

pub fn classic(args: ConstructArgs) -> Result<()> {
    prepare_out_dir(&args.out_dir, args.clobber, args.continue_build)?;
    let list = scan_documents(&args)?;

    let params = ClassicIndexParameters {
        term_size: args.term_size,
        canonicalize: args.canonicalize,
        num_hashes: args.num_hashes,
        false_positive_rate: args.false_positive_rate,
        mem_bytes: resolve_mem_bytes(&args.mem_bytes)?,
        num_threads: args.threads.unwrap_or_else(|| {
            ClassicIndexParameters::default().num_threads
        }),
        keep_temporary: args.keep_temporary,
        continue_build: args.continue_build,
    };
    classic_construct(list.as_slice(), &args.out_dir, &params)?;
    Ok(())
}

pub fn compact(args: ConstructArgs, page_size: Option<usize>) -> Result<()> {
    prepare_out_dir(&args.out_dir, args.clobber, args.continue_build)?;
    let list = scan_documents(&args)?;

    let params = CompactIndexParameters {
        term_size: args.term_size,
        canonicalize: args.canonicalize,
        num_hashes: args.num_hashes,
        false_positive_rate: args.false_positive_rate,
        page_size,
        mem_bytes: resolve_mem_bytes(&args.mem_bytes)?,
        num_threads: args.threads.unwrap_or_else(|| {
            CompactIndexParameters::default().num_threads
        }),
        keep_temporary: args.keep_temporary,
        continue_build: args.continue_build,
    };
    compact_construct(list.as_slice(), &args.out_dir, &params)?;
    Ok(())
}

pub fn compact_combine_cmd(in_dir: &Path, out_file: &Path, page_size: usize) -> Result<()> {
    compact_combine(in_dir, out_file, page_size)?;
    Ok(())
}

pub fn classic_random(
    out_file: &Path,
    signature_size: u64,
    num_documents: usize,
    document_size: usize,
    num_hashes: u64,
    seed: u64,
) -> Result<()> {
    info!(
        "constructing random index: {} documents, signature size {}, {} per document",
        num_documents, signature_size, document_size
    );
    classic_construct_random(
        out_file,
        signature_size,
        num_documents,
        document_size,
        num_hashes,
        seed,
    )?;
    Ok(())
}
