mod cli;
mod logging;

// Needed to write partial lines to the console
use std::io::{self, Write};
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use knn_mnist::bench::run_passes;
use knn_mnist::{load_mnist, Classifier, KnnConfig, LabeledExample, VectorStore};

use crate::cli::{Cli, Command, RunArgs};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Classify(args) => classify(&args),
        Command::Bench { run, passes } => bench(&run, passes),
    }
}

fn classify(args: &RunArgs) -> Result<()> {
    let config = args.config();
    config.validate()?;
    let (store, queries) = load(args, &config)?;

    let context = config.execution_context()?;
    let classifier = Classifier::new(&store, context.as_ref(), &config)?;

    print!("Classifying on {}... ", context.name());
    let _ = io::stdout().flush();
    let evaluation = if args.parallel_queries {
        classifier.par_evaluate(&queries)?
    } else {
        classifier.evaluate(&queries)?
    };
    println!(
        "Done [{}ms, {:.4} ms/query]",
        evaluation.elapsed().as_millis(),
        evaluation.ms_per_query()
    );

    println!(
        "Result : {}% ({}/{})",
        evaluation.accuracy() * 100.0,
        evaluation.correct(),
        evaluation.total()
    );
    if evaluation.skipped() > 0 {
        println!("Skipped {} failing queries", evaluation.skipped());
    }
    Ok(())
}

fn bench(args: &RunArgs, passes: usize) -> Result<()> {
    let config = args.config();
    config.validate()?;
    let (store, queries) = load(args, &config)?;

    let context = config.execution_context()?;
    let classifier = Classifier::new(&store, context.as_ref(), &config)?;
    println!("=== Benchmarking on {} ({} passes) ===", context.name(), passes);

    let report = run_passes(
        &classifier,
        &queries,
        passes,
        args.parallel_queries,
        |pass, stats| {
            println!(
                "[Pass {}/{}] Duration : {:.4} ms/query | Average : {:.4} | Result {}% ({}/{})",
                pass,
                passes,
                stats.ms_per_query,
                stats.running_average_ms,
                stats.accuracy * 100.0,
                stats.correct,
                stats.total
            );
        },
    )?;
    println!("=== Final average: {:.4} ms/query ===", report.average_ms_per_query());
    Ok(())
}

// Load the training corpus into a sealed store, and the queries as plain examples
fn load(args: &RunArgs, config: &KnnConfig) -> Result<(VectorStore, Vec<LabeledExample>)> {
    let options = config.load_options();

    print!("Loading training data... ");
    let _ = io::stdout().flush();
    let now = Instant::now();
    let train = load_mnist(&args.train, &options)
        .with_context(|| format!("failed to load {}", args.train.display()))?;
    let store = match config.training_size() {
        Some(n) => VectorStore::from_examples_exact(&train, n, config.dimensionality()),
        None => VectorStore::from_examples(&train, config.dimensionality()),
    }
    .context("invalid training corpus")?;
    println!(
        "Loaded {} examples from {} [{}ms]",
        store.len(),
        args.train.display(),
        now.elapsed().as_millis()
    );

    print!("Loading test data... ");
    let _ = io::stdout().flush();
    let now = Instant::now();
    let queries = load_mnist(&args.test, &options)
        .with_context(|| format!("failed to load {}", args.test.display()))?;
    println!(
        "Loaded {} examples from {} [{}ms]",
        queries.len(),
        args.test.display(),
        now.elapsed().as_millis()
    );

    Ok((store, queries))
}
