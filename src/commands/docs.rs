//! Document list and dump commands.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::doc::{DocumentList, DocumentSource, FileType};

/// Enumerate the documents below `path` and print their term counts.
pub fn doc_list(path: &Path, file_type: FileType, term_size: u32) -> Result<()> {
    let list = DocumentList::scan(path, file_type).context("cannot enumerate documents")?;
    let k = term_size as usize;

    println!("--- document list ({} entries) ---", list.len());
    let mut max_terms = 0usize;
    let mut total_terms = 0usize;
    for (i, doc) in list.iter().enumerate() {
        let num_terms = doc.num_terms(k)?;
        println!(
            "document[{}] size {} {}-mers {} : {} : {}",
            i,
            doc.size,
            k,
            num_terms,
            doc.path.display(),
            doc.name
        );
        max_terms = max_terms.max(num_terms);
        total_terms += num_terms;
    }
    println!("--- end of document list ({} entries) ---", list.len());

    println!("documents: {}", list.len());
    println!("maximum {}-mers: {}", k, max_terms);
    if !list.is_empty() {
        println!("average {}-mers: {}", k, total_terms / list.len());
    }
    println!("total {}-mers: {}", k, total_terms);
    Ok(())
}

/// Print every term of every document below `path`.
pub fn doc_dump(path: &Path, file_type: FileType, term_size: u32) -> Result<()> {
    let list = DocumentList::scan(path, file_type).context("cannot enumerate documents")?;
    eprintln!("Found {} documents.", list.len());

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for (i, doc) in list.iter().enumerate() {
        eprintln!("document[{}] : {} : {}", i, doc.path.display(), doc.name);
        let mut count = 0usize;
        let mut write_error = None;
        doc.process_terms(term_size as usize, &mut |term| {
            count += 1;
            if write_error.is_none() {
                let result = out.write_all(term).and_then(|_| out.write_all(b"\n"));
                if let Err(e) = result {
                    write_error = Some(e);
                }
            }
        })?;
        if let Some(e) = write_error {
            return Err(e).context("cannot write terms");
        }
        eprintln!("document[{}] : {} terms.", i, count);
    }
    out.flush().context("cannot flush output")?;
    Ok(())
}
