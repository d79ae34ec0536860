//! Compact index end-to-end: paged construction, query parity with the
//! classic layout, and backend parity.

mod common;

use cobs::{
    classic_construct, compact_construct, random_sequence, ClassicSearch,
    CompactIndexParameters, IndexReader, QueryBackend,
};
use tempfile::tempdir;

use common::{scan, test_params, write_fasta};

const K: usize = 31;

fn compact_params(num_hashes: u64, false_positive_rate: f64, page_size: usize) -> CompactIndexParameters {
    let base = test_params(num_hashes, false_positive_rate);
    CompactIndexParameters {
        term_size: base.term_size,
        canonicalize: base.canonicalize,
        num_hashes: base.num_hashes,
        false_positive_rate: base.false_positive_rate,
        page_size: Some(page_size),
        mem_bytes: base.mem_bytes,
        num_threads: base.num_threads,
        keep_temporary: false,
        continue_build: false,
    }
}

#[test]
fn all_included() {
    let input = tempdir().unwrap();
    let index_dir = tempdir().unwrap();

    let query = random_sequence(21_000, 1);
    for i in 0..8 {
        let filler = random_sequence(100 * (i as usize + 1), 100 + i);
        write_fasta(input.path(), &format!("document_{}", i), &[&query, &filler]);
    }

    let docs = scan(input.path());
    let index_file =
        compact_construct(docs.as_slice(), index_dir.path(), &compact_params(3, 0.1, 3)).unwrap();

    // pages of three documents, last page short
    for page in ["0.cobs", "1.cobs", "2.cobs"] {
        assert!(index_dir.path().join(page).exists(), "missing page {}", page);
    }

    let reader = IndexReader::open(&index_file).unwrap();
    assert_eq!(reader.page_size(), 3);
    assert_eq!(reader.pages().len(), 3);
    assert_eq!(reader.num_documents(), 8);

    let mut search = ClassicSearch::new(&reader);
    let results = search.search(&query, 100).unwrap();
    let expected_score = (query.len() - K + 1) as u16;
    assert_eq!(results.len(), 8);
    for (score, name) in &results {
        assert_eq!(*score, expected_score, "document {}", name);
    }
}

/// With equal-size documents every page derives the same signature size
/// as the classic index, so scores and ordering match exactly.
#[test]
fn compact_matches_classic() {
    let input = tempdir().unwrap();
    let classic_dir = tempdir().unwrap();
    let compact_dir = tempdir().unwrap();

    for i in 0..20 {
        let seq = random_sequence(300, 500 + i as u64);
        write_fasta(input.path(), &format!("document_{:02}", i), &[&seq]);
    }
    let docs = scan(input.path());

    let classic_file =
        classic_construct(docs.as_slice(), classic_dir.path(), &test_params(3, 0.1)).unwrap();
    let compact_file =
        compact_construct(docs.as_slice(), compact_dir.path(), &compact_params(3, 0.1, 5))
            .unwrap();

    let classic_reader = IndexReader::open(&classic_file).unwrap();
    let compact_reader = IndexReader::open(&compact_file).unwrap();
    assert_eq!(classic_reader.num_documents(), compact_reader.num_documents());

    // every page shares the classic signature size (equal-size documents)
    let classic_m = classic_reader.pages()[0].signature_size;
    for page in compact_reader.pages() {
        assert_eq!(page.signature_size, classic_m);
    }

    // a single page spanning all documents is the degenerate compact case
    let single_page_dir = tempdir().unwrap();
    let single_page_file = compact_construct(
        docs.as_slice(),
        single_page_dir.path(),
        &compact_params(3, 0.1, 20),
    )
    .unwrap();
    let single_page_reader = IndexReader::open(&single_page_file).unwrap();
    assert_eq!(single_page_reader.pages().len(), 1);

    let mut classic_search = ClassicSearch::new(&classic_reader);
    let mut compact_search = ClassicSearch::new(&compact_reader);
    let mut single_page_search = ClassicSearch::new(&single_page_reader);
    for seed in 0..20u64 {
        let query = random_sequence(120, 9000 + seed);
        let classic_results = classic_search.search(&query, 100).unwrap();
        let compact_results = compact_search.search(&query, 100).unwrap();
        assert_eq!(classic_results, compact_results, "query seed {}", seed);
        assert_eq!(
            classic_results,
            single_page_search.search(&query, 100).unwrap(),
            "query seed {}",
            seed
        );
    }
}

/// The positioned-read backend returns the same rows as mmap.
#[test]
fn aio_backend_matches_mmap() {
    let input = tempdir().unwrap();
    let index_dir = tempdir().unwrap();

    for i in 0..9 {
        let seq = random_sequence(400, 700 + i as u64);
        write_fasta(input.path(), &format!("document_{}", i), &[&seq]);
    }
    let docs = scan(input.path());
    let index_file =
        compact_construct(docs.as_slice(), index_dir.path(), &compact_params(2, 0.05, 4)).unwrap();

    let mmap_reader = IndexReader::open_with_backend(&index_file, QueryBackend::Mmap).unwrap();
    let aio_reader = IndexReader::open_with_backend(&index_file, QueryBackend::Aio).unwrap();

    let mut mmap_search = ClassicSearch::new(&mmap_reader);
    let mut aio_search = ClassicSearch::new(&aio_reader);
    for seed in 0..10u64 {
        let query = random_sequence(90, 333 + seed);
        assert_eq!(
            mmap_search.search(&query, 100).unwrap(),
            aio_search.search(&query, 100).unwrap(),
            "query seed {}",
            seed
        );
    }
}

/// The aio backend refuses classic indices.
#[test]
fn aio_backend_rejects_classic() {
    let input = tempdir().unwrap();
    let index_dir = tempdir().unwrap();
    write_fasta(input.path(), "doc", &[&random_sequence(100, 3)]);

    let docs = scan(input.path());
    let index_file =
        classic_construct(docs.as_slice(), index_dir.path(), &test_params(1, 0.3)).unwrap();
    assert!(IndexReader::open_with_backend(&index_file, QueryBackend::Aio).is_err());
}
