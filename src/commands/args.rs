//! Command-line interface definitions for the cobs CLI.
//!
//! Several subcommands take `-h` for a parameter (hash count or result
//! count), so those disable the short help flag; `--help` always works.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::doc::FileType;
use crate::query::QueryBackend;

#[derive(Parser)]
#[command(name = "cobs")]
#[command(about = "Compact bit-sliced signature index for genome search", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Print progress information to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Construction flags shared by classic and compact construction.
#[derive(Args, Debug)]
pub struct ConstructArgs {
    /// Path to the input document directory
    pub in_dir: PathBuf,

    /// Path to the output directory
    pub out_dir: PathBuf,

    /// Filter input documents by file type
    #[arg(short = 't', long, value_enum, default_value_t = FileType::Any)]
    pub file_type: FileType,

    /// Memory in bytes to use (supports suffixes, e.g. 4G), or "auto"
    #[arg(short = 'm', long, default_value = "auto")]
    pub mem_bytes: String,

    /// Number of hash functions
    #[arg(short = 'h', long, default_value_t = 1)]
    pub num_hashes: u64,

    /// Target false positive rate
    #[arg(short = 'f', long, default_value_t = 0.3)]
    pub false_positive_rate: f64,

    /// Term size (k-mer size)
    #[arg(short = 'k', long, default_value_t = 31)]
    pub term_size: u32,

    /// Canonicalize DNA k-mers
    #[arg(short = 'c', long)]
    pub canonicalize: bool,

    /// Erase the output directory if it exists
    #[arg(short = 'C', long)]
    pub clobber: bool,

    /// Continue in an existing output directory
    #[arg(long = "continue")]
    pub continue_build: bool,

    /// Number of threads to use, default: all cores
    #[arg(short = 'T', long)]
    pub threads: Option<usize>,

    /// Keep temporary files during construction
    #[arg(long)]
    pub keep_temporary: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a list of documents and print the list
    DocList {
        /// Path to the documents
        path: PathBuf,

        /// Filter documents by file type
        #[arg(short = 'T', long, value_enum, default_value_t = FileType::Any)]
        file_type: FileType,

        /// Term size (k-mer size)
        #[arg(short = 'k', long, default_value_t = 31)]
        term_size: u32,
    },

    /// Read a list of documents and dump every term
    DocDump {
        /// Path to the documents
        path: PathBuf,

        /// Filter documents by file type
        #[arg(short = 'T', long, value_enum, default_value_t = FileType::Any)]
        file_type: FileType,

        /// Term size (k-mer size)
        #[arg(short = 'k', long, default_value_t = 31)]
        term_size: u32,
    },

    /// Construct a classic index from the documents in <IN_DIR>
    #[command(disable_help_flag = true)]
    ClassicConstruct {
        #[command(flatten)]
        args: ConstructArgs,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Construct a classic index with random content
    #[command(disable_help_flag = true)]
    ClassicConstructRandom {
        /// Path to the output file
        out_file: PathBuf,

        /// Number of signature bits (vertical size)
        #[arg(short = 's', long, default_value_t = 2 * 1024 * 1024)]
        signature_size: u64,

        /// Number of random documents in the index
        #[arg(short = 'n', long, default_value_t = 10_000)]
        num_documents: usize,

        /// Number of random 31-mers per document
        #[arg(short = 'm', long, default_value_t = 1_000_000)]
        document_size: usize,

        /// Number of hash functions
        #[arg(short = 'h', long, default_value_t = 1)]
        num_hashes: u64,

        /// Random seed
        #[arg(long, default_value_t = 34)]
        seed: u64,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Construct a compact index from the documents in <IN_DIR>
    #[command(disable_help_flag = true)]
    CompactConstruct {
        #[command(flatten)]
        args: ConstructArgs,

        /// Documents per page, default: ceil(sqrt(#documents))
        #[arg(short = 'p', long)]
        page_size: Option<usize>,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Combine the classic indices in <IN_DIR> into a compact index
    CompactConstructCombine {
        /// Path to the input directory
        in_dir: PathBuf,

        /// Path to the output file
        out_file: PathBuf,

        /// Documents per page
        #[arg(short = 'p', long, default_value_t = 8192)]
        page_size: usize,
    },

    /// Query an index
    #[command(disable_help_flag = true)]
    Query {
        /// Path to the index file
        in_file: PathBuf,

        /// The DNA sequence to search for
        query: String,

        /// Number of results to return
        #[arg(short = 'h', long, default_value_t = 100)]
        num_results: usize,

        /// Row fetch backend
        #[arg(long, value_enum, default_value_t = QueryBackend::Mmap)]
        backend: QueryBackend,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Calculate index parameters
    #[command(disable_help_flag = true)]
    PrintParameters {
        /// Number of hash functions
        #[arg(short = 'h', long, default_value_t = 1)]
        num_hashes: u64,

        /// Target false positive rate
        #[arg(short = 'f', long, default_value_t = 0.3)]
        false_positive_rate: f64,

        /// Number of elements to be inserted into the index
        #[arg(short = 'n', long)]
        num_elements: Option<u64>,

        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },

    /// Print all canonical k-mers of <QUERY>
    PrintKmers {
        /// The DNA sequence
        query: String,

        /// Term size (k-mer size)
        #[arg(short = 'k', long, default_value_t = 31)]
        term_size: u32,
    },

    /// Print the canonical basepair character mapping
    PrintBasepairMap,

    /// Run a random-query benchmark and false positive measurement
    BenchmarkFpr {
        /// Path to the index file
        in_file: PathBuf,

        /// Number of k-mers per query
        #[arg(short = 'k', long, default_value_t = 1000)]
        num_kmers: usize,

        /// Number of random queries to run
        #[arg(short = 'q', long, default_value_t = 10_000)]
        queries: usize,

        /// Number of random warmup queries to run
        #[arg(short = 'w', long, default_value_t = 100)]
        warmup: usize,

        /// Also print the false positive score distribution
        #[arg(short = 'd', long)]
        dist: bool,

        /// Random seed
        #[arg(long, default_value_t = 34)]
        seed: u64,
    },

    /// Select queries randomly from documents
    GenerateQueries {
        /// Path to the base documents
        path: PathBuf,

        /// Filter documents by file type
        #[arg(short = 't', long, value_enum, default_value_t = FileType::Any)]
        file_type: FileType,

        /// Term size (k-mer size)
        #[arg(short = 'k', long, default_value_t = 31)]
        term_size: u32,

        /// Number of existing positive queries to pick
        #[arg(short = 'p', long, default_value_t = 0)]
        positive: usize,

        /// Number of random non-existing negative queries to construct
        #[arg(short = 'n', long, default_value_t = 0)]
        negative: usize,

        /// Check that negative queries truly miss the documents (slow)
        #[arg(short = 'N', long)]
        true_negatives: bool,

        /// Extend positive terms with random bases to this size
        #[arg(short = 's', long, default_value_t = 0)]
        size: usize,

        /// Random seed
        #[arg(short = 'S', long, default_value_t = 34)]
        seed: u64,

        /// Output file path, default: stdout
        #[arg(short = 'o', long)]
        out_file: Option<PathBuf>,
    },
}
