use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use charcls::{
    train_architectures, Architecture, Corpus, LossComparison, OptimizerConfig, TrainedClassifier, TrainingConfig,
    DEFAULT_MAX_LEN,
};

const DEFAULT_TEXTS: [&str; 2] = ["帮我导航到北京", "查询明天北京的天气"];

#[derive(Parser)]
#[command(author, version, about = "Character-level text classifier", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train one classifier and classify sample texts
    Train(TrainArgs),
    /// Train the comparison suite, print the loss of every pass and classify sample texts with each
    Compare(CompareArgs),
}

#[derive(Args)]
struct DataArgs {
    /// Tab-separated corpus, one `text<TAB>label` record per line
    #[arg(long)]
    corpus: PathBuf,

    /// Characters kept from each text
    #[arg(long, default_value_t = DEFAULT_MAX_LEN)]
    max_len: usize,

    #[arg(long, default_value_t = 10)]
    epochs: usize,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Seed for initialization and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Texts to classify after training
    #[arg(long = "text")]
    texts: Vec<String>,
}

impl DataArgs {
    fn training_config(&self) -> TrainingConfig {
        let config = TrainingConfig::default()
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    fn texts(&self) -> Vec<String> {
        if self.texts.is_empty() {
            DEFAULT_TEXTS.iter().map(|t| t.to_string()).collect()
        } else {
            self.texts.clone()
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ArchKind {
    FeedForward,
    Gru,
}

#[derive(Clone, Copy, ValueEnum)]
enum OptimizerKind {
    Sgd,
    Adam,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    data: DataArgs,

    #[arg(long, value_enum, default_value = "feed-forward")]
    arch: ArchKind,

    /// Hidden layer widths of the feed-forward classifier
    #[arg(long, value_delimiter = ',', default_value = "128")]
    hidden: Vec<usize>,

    #[arg(long, default_value_t = 64)]
    embedding_dim: usize,

    #[arg(long, default_value_t = 128)]
    hidden_dim: usize,

    /// Defaults to SGD for feed-forward and Adam for GRU
    #[arg(long, value_enum)]
    optimizer: Option<OptimizerKind>,

    #[arg(long)]
    learning_rate: Option<f32>,
}

impl TrainArgs {
    fn architecture(&self) -> Architecture {
        match self.arch {
            ArchKind::FeedForward => Architecture::feed_forward(self.hidden.clone()),
            ArchKind::Gru => Architecture::gru(self.embedding_dim, self.hidden_dim),
        }
    }

    fn optimizer(&self, architecture: &Architecture) -> OptimizerConfig {
        let base = match self.optimizer {
            Some(OptimizerKind::Sgd) => OptimizerConfig::sgd(0.01),
            Some(OptimizerKind::Adam) => OptimizerConfig::adam(0.001),
            None => OptimizerConfig::default_for(architecture),
        };
        match self.learning_rate {
            Some(lr) => base.with_learning_rate(lr),
            None => base,
        }
    }
}

#[derive(Args)]
struct CompareArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Also write the comparison as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Train(args) => train(args),
        Command::Compare(args) => compare(args),
    }
}

fn load_corpus(path: &Path) -> Result<Corpus> {
    Corpus::from_path(path).with_context(|| format!("Failed to read corpus {}", path.display()))
}

fn train(args: TrainArgs) -> Result<()> {
    let corpus = load_corpus(&args.data.corpus)?;
    let architecture = args.architecture();
    let optimizer = args.optimizer(&architecture);

    let start_time = Instant::now();
    info!("=== Training {} ===", architecture);
    let classifier = TrainedClassifier::builder()
        .with_architecture(architecture)
        .with_max_len(args.data.max_len)
        .with_training_config(args.data.training_config())
        .with_optimizer(optimizer)
        .build(&corpus)?;
    info!("=== Training finished (took {:.2?}) ===", start_time.elapsed());

    println!("{}", serde_json::to_string_pretty(&classifier.info())?);
    for (epoch, loss) in classifier.history().losses.iter().enumerate() {
        println!("epoch {:>3}: loss {:.4}", epoch + 1, loss);
    }
    for text in args.data.texts() {
        process_input(&classifier, &text)?;
    }
    Ok(())
}

fn compare(args: CompareArgs) -> Result<()> {
    let corpus = load_corpus(&args.data.corpus)?;
    let suite = Architecture::comparison_suite();
    info!("=== Comparing {} classifiers ===", suite.len());

    let training = args.data.training_config();
    let classifiers = train_architectures(&corpus, &suite, args.data.max_len, &training, None)?;
    let comparison = LossComparison::from_classifiers(args.data.max_len, &training, &classifiers);
    print!("{}", comparison);
    if let Some(best) = comparison.best() {
        println!("\nLowest final loss: {}", best.label);
    }

    let texts = args.data.texts();
    for classifier in &classifiers {
        println!("\n=== {} ===", classifier.history().label);
        for text in &texts {
            process_input(classifier, text)?;
        }
    }

    if let Some(path) = &args.json {
        fs::write(path, serde_json::to_string_pretty(&comparison)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote comparison to {}", path.display());
    }
    Ok(())
}

fn process_input(classifier: &TrainedClassifier, text: &str) -> Result<()> {
    let class = classifier.predict(text)?;
    let mut probs: Vec<_> = classifier.probabilities(text)?.into_iter().collect();
    probs.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("\nInput: {}", text);
    println!("  Predicted class: {}", class);
    for (label, p) in probs.iter().take(5) {
        println!("    {}: {:.1}%", label, p * 100.0);
    }
    Ok(())
}
