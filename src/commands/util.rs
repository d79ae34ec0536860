//! Auxiliary commands: parameter calculation, k-mer printing, the
//! basepair map, the false positive benchmark, and query generation.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::core::{kmer, sizing};
use crate::doc::{DocumentList, DocumentSource, FileType};
use crate::memory;
use crate::query::{ClassicSearch, IndexReader};
use crate::random::random_sequence_rng;

pub fn print_parameters(
    num_hashes: u64,
    false_positive_rate: f64,
    num_elements: Option<u64>,
) -> Result<()> {
    sizing::check_parameters(num_hashes, false_positive_rate)?;
    match num_elements {
        None => {
            println!(
                "{}",
                sizing::calc_signature_size_ratio(num_hashes, false_positive_rate)
            );
        }
        Some(n) => {
            let signature_size =
                sizing::calc_signature_size(n, num_hashes, false_positive_rate)?;
            println!("signature_size = {}", signature_size);
            println!(
                "signature_bytes = {} = {}",
                signature_size / 8,
                memory::format_bytes((signature_size / 8) as usize)
            );
        }
    }
    Ok(())
}

pub fn print_kmers(query: &str, term_size: u32) -> Result<()> {
    let k = term_size as usize;
    if query.len() < k {
        bail!("query of length {} is shorter than the term size {}", query.len(), k);
    }
    let mut buffer = vec![0u8; k];
    for window in query.as_bytes().windows(k) {
        let canonical = kmer::canonicalize(window, &mut buffer);
        println!("{}", String::from_utf8_lossy(canonical));
    }
    Ok(())
}

pub fn print_basepair_map() -> Result<()> {
    // diagnostic table: only the four bases pair, everything else is 0
    // (unlike the canonicalization map, which leaves other bytes as-is)
    let mut map = [0u8; 256];
    map[b'A' as usize] = b'T';
    map[b'C' as usize] = b'G';
    map[b'G' as usize] = b'C';
    map[b'T' as usize] = b'A';
    for (i, &mapped) in map.iter().enumerate() {
        print!("{},", mapped);
        if i % 16 == 15 {
            println!();
        }
    }
    Ok(())
}

pub fn benchmark_fpr(
    in_file: &Path,
    num_kmers: usize,
    num_queries: usize,
    num_warmup: usize,
    dist: bool,
    seed: u64,
) -> Result<()> {
    let reader = IndexReader::open(in_file)?;
    let term_size = reader.term_size() as usize;
    let query_len = num_kmers + term_size - 1;

    let mut rng = StdRng::seed_from_u64(seed);
    let warmup_queries: Vec<String> = (0..num_warmup)
        .map(|_| random_sequence_rng(query_len, &mut rng))
        .collect();
    let queries: Vec<String> = (0..num_queries)
        .map(|_| random_sequence_rng(query_len, &mut rng))
        .collect();

    let mut search = ClassicSearch::new(&reader);
    let mut num_results = 0usize;
    for query in &warmup_queries {
        num_results = search.search(query, 100)?.len();
    }
    search.reset_timer();

    let mut counts: HashMap<u16, u64> = HashMap::new();
    for query in &queries {
        let results = search.search(query, 100)?;
        num_results = results.len();
        if dist {
            for (score, _) in &results {
                *counts.entry(*score).or_insert(0) += 1;
            }
        }
    }

    let timer = search.timer();
    println!(
        "RESULT name=benchmark index={} kmer_queries={} queries={} warmup={} results={} \
         t_hashes={} t_io={} t_and={} t_add={} t_sort={}",
        in_file.display(),
        num_kmers,
        queries.len(),
        warmup_queries.len(),
        num_results,
        timer.seconds("hashes"),
        timer.seconds("io"),
        timer.seconds("and rows"),
        timer.seconds("add rows"),
        timer.seconds("sort results"),
    );

    if dist {
        let mut scores: Vec<_> = counts.into_iter().collect();
        scores.sort_unstable();
        for (score, count) in scores {
            println!("RESULT name=benchmark_fpr fpr={} dist={}", score, count);
        }
    }
    Ok(())
}

struct GeneratedQuery {
    term: String,
    doc_index: Option<usize>,
    term_index: usize,
}

/// Sample positive query terms from the documents and construct random
/// negative queries, then write both in FASTA form in shuffled order.
#[allow(clippy::too_many_arguments)]
pub fn generate_queries(
    path: &Path,
    file_type: FileType,
    term_size: u32,
    num_positive: usize,
    num_negative: usize,
    true_negatives: bool,
    fixed_size: usize,
    seed: u64,
    out_file: Option<&PathBuf>,
) -> Result<()> {
    let list = DocumentList::scan(path, file_type).context("cannot enumerate documents")?;
    let k = term_size as usize;
    let fixed_size = fixed_size.max(k);
    let mut rng = StdRng::seed_from_u64(seed);

    let term_counts: Vec<usize> = list
        .iter()
        .map(|d| d.num_terms(k))
        .collect::<crate::error::Result<_>>()?;
    let total_terms: usize = term_counts.iter().sum();
    info!(
        "given {} documents containing {} {}-gram terms",
        list.len(),
        total_terms,
        k
    );
    if num_positive > total_terms {
        bail!(
            "cannot pick {} positive terms from {} total",
            num_positive,
            total_terms
        );
    }

    // global indices of the positive terms, ascending
    let mut positive_set = HashSet::new();
    while positive_set.len() < num_positive {
        positive_set.insert(rng.gen_range(0..total_terms));
    }
    let mut positive_indices: Vec<usize> = positive_set.into_iter().collect();
    positive_indices.sort_unstable();

    // random negative candidates, oversampled so the true-negative check
    // can drop collisions
    let candidates = num_negative + num_negative / 2;
    let mut negatives: Vec<String> = (0..candidates)
        .map(|_| random_sequence_rng(fixed_size, &mut rng))
        .collect();
    let mut negative_terms: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();
    if true_negatives {
        for (i, negative) in negatives.iter().enumerate() {
            for window in negative.as_bytes().windows(k) {
                negative_terms.entry(window.to_vec()).or_default().push(i);
            }
        }
    }

    // single pass over all terms: pick positives, clear hit negatives
    let mut positives: Vec<GeneratedQuery> = Vec::with_capacity(num_positive);
    let mut next_positive = 0usize;
    let mut global_index = 0usize;
    for (doc_index, doc) in list.iter().enumerate() {
        let doc_start = global_index;
        doc.process_terms(k, &mut |term| {
            if next_positive < positive_indices.len()
                && global_index == positive_indices[next_positive]
            {
                positives.push(GeneratedQuery {
                    term: String::from_utf8_lossy(term).into_owned(),
                    doc_index: Some(doc_index),
                    term_index: global_index - doc_start,
                });
                next_positive += 1;
            }
            if true_negatives {
                if let Some(hits) = negative_terms.remove(term) {
                    for i in hits {
                        negatives[i].clear();
                    }
                }
            }
            global_index += 1;
        })?;
    }

    // extend positive terms with random flanks up to the fixed size
    for query in &mut positives {
        let padding = fixed_size - query.term.len();
        if padding > 0 {
            let front = rng.gen_range(0..padding);
            let back = padding - front;
            query.term = format!(
                "{}{}{}",
                random_sequence_rng(front, &mut rng),
                query.term,
                random_sequence_rng(back, &mut rng)
            );
        }
    }

    let surviving = negatives.iter().filter(|n| !n.is_empty()).count();
    if surviving < num_negative {
        bail!("not enough true negatives left, you were unlucky, try again");
    }

    let mut queries = positives;
    queries.extend(
        negatives
            .into_iter()
            .filter(|n| !n.is_empty())
            .take(num_negative)
            .map(|term| GeneratedQuery {
                term,
                doc_index: None,
                term_index: 0,
            }),
    );
    queries.shuffle(&mut rng);

    let mut out: Box<dyn Write> = match out_file {
        Some(path) => Box::new(std::fs::File::create(path).context("cannot create output")?),
        None => Box::new(std::io::stdout()),
    };
    for query in &queries {
        match query.doc_index {
            Some(d) => writeln!(
                out,
                ">doc:{}:term:{}:{}",
                d, query.term_index, list[d].name
            )?,
            None => writeln!(out, ">negative")?,
        }
        writeln!(out, "{}", query.term)?;
    }
    out.flush()?;
    Ok(())
}
