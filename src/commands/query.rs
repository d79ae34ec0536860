//! Query command: open an index, search, print scores and timings.

use std::path::Path;

use anyhow::Result;

use crate::query::{ClassicSearch, IndexReader, QueryBackend};

pub fn run(in_file: &Path, query: &str, num_results: usize, backend: QueryBackend) -> Result<()> {
    let reader = IndexReader::open_with_backend(in_file, backend)?;
    let mut search = ClassicSearch::new(&reader);
    let results = search.search(query, num_results)?;

    for (score, name) in &results {
        println!("{} - {}", name, score);
    }
    print!("{}", search.timer());
    Ok(())
}
