use anyhow::Result;
use clap::Parser;

use cobs::commands::{construct, docs, query, util, Cli, Commands};
use cobs::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    match cli.command {
        Commands::DocList {
            path,
            file_type,
            term_size,
        } => docs::doc_list(&path, file_type, term_size),

        Commands::DocDump {
            path,
            file_type,
            term_size,
        } => docs::doc_dump(&path, file_type, term_size),

        Commands::ClassicConstruct { args, .. } => construct::classic(args),

        Commands::ClassicConstructRandom {
            out_file,
            signature_size,
            num_documents,
            document_size,
            num_hashes,
            seed,
            ..
        } => construct::classic_random(
            &out_file,
            signature_size,
            num_documents,
            document_size,
            num_hashes,
            seed,
        ),

        Commands::CompactConstruct {
            args, page_size, ..
        } => construct::compact(args, page_size),

        Commands::CompactConstructCombine {
            in_dir,
            out_file,
            page_size,
        } => construct::compact_combine_cmd(&in_dir, &out_file, page_size),

        Commands::Query {
            in_file,
            query: sequence,
            num_results,
            backend,
            ..
        } => query::run(&in_file, &sequence, num_results, backend),

        Commands::PrintParameters {
            num_hashes,
            false_positive_rate,
            num_elements,
            ..
        } => util::print_parameters(num_hashes, false_positive_rate, num_elements),

        Commands::PrintKmers { query, term_size } => util::print_kmers(&query, term_size),

        Commands::PrintBasepairMap => util::print_basepair_map(),

        Commands::BenchmarkFpr {
            in_file,
            num_kmers,
            queries,
            warmup,
            dist,
            seed,
            ..
        } => util::benchmark_fpr(&in_file, num_kmers, queries, warmup, dist, seed),

        Commands::GenerateQueries {
            path,
            file_type,
            term_size,
            positive,
            negative,
            true_negatives,
            size,
            seed,
            out_file,
        } => util::generate_queries(
            &path,
            file_type,
            term_size,
            positive,
            negative,
            true_negatives,
            size,
            seed,
            out_file.as_ref(),
        ),
    }
}
