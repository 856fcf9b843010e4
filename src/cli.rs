use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use knn_mnist::{FailurePolicy, Kernel, KnnConfig, MNIST_DIMENSIONALITY, MNIST_TRAINING_SIZE};

/// Exact 1-nearest-neighbor classifier for MNIST digits.
#[derive(Parser)]
#[command(name = "knn_mnist", version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Classify the test set once and report accuracy.
    Classify(RunArgs),
    /// Classify the test set repeatedly and report timing per pass.
    Bench {
        #[command(flatten)]
        run: RunArgs,

        /// Number of passes over the test set.
        #[arg(long, default_value_t = 10)]
        passes: usize,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Training csv file.
    #[arg(long, default_value = "data/trainingsample.csv")]
    pub train: PathBuf,

    /// Test csv file.
    #[arg(long, default_value = "data/validationsample.csv")]
    pub test: PathBuf,

    /// Exact number of training examples required.
    #[arg(long, default_value_t = MNIST_TRAINING_SIZE)]
    pub training_size: usize,

    /// Pixels per image.
    #[arg(long, default_value_t = MNIST_DIMENSIONALITY)]
    pub dimensionality: usize,

    /// The csv files have no header row.
    #[arg(long)]
    pub no_headers: bool,

    /// Worker threads for the distance phase (default: all cores).
    #[arg(long, conflicts_with = "sequential")]
    pub threads: Option<usize>,

    /// Compute distances on the main thread.
    #[arg(long)]
    pub sequential: bool,

    /// Classify queries concurrently as well.
    #[arg(long)]
    pub parallel_queries: bool,

    /// Distance kernel.
    #[arg(long, value_enum, default_value_t = KernelArg::Auto)]
    pub kernel: KernelArg,

    /// Count failing queries as incorrect instead of aborting.
    #[arg(long)]
    pub skip_failures: bool,

    /// Times a failed dispatch is retried.
    #[arg(long, default_value_t = 1)]
    pub retries: u32,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KernelArg {
    Auto,
    Scalar,
}

impl RunArgs {
    pub fn config(&self) -> KnnConfig {
        let kernel = match self.kernel {
            KernelArg::Auto => Kernel::Auto,
            KernelArg::Scalar => Kernel::Scalar,
        };
        let failure_policy = if self.skip_failures {
            FailurePolicy::SkipAsIncorrect
        } else {
            FailurePolicy::Abort
        };
        let mut config = KnnConfig::new()
            .with_dimensionality(self.dimensionality)
            .with_training_size(self.training_size)
            .with_headers(!self.no_headers)
            .with_sequential(self.sequential)
            .with_kernel(kernel)
            .with_failure_policy(failure_policy)
            .with_max_dispatch_retries(self.retries);
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}
