use clap::{Parser, ValueEnum};
use diff_moves::{MoverOptions, Tokenizer, annotate_reader};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diff-moves")]
#[command(about = "Annotate unified diffs with inline cross-references for moved lines")]
struct Cli {
    /// Diff file to annotate (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Similarity threshold in [0, 1]; overrides the T environment variable
    #[arg(long)]
    threshold: Option<f64>,

    /// Tokenizer used when comparing removed and added lines
    #[arg(long, value_enum, default_value = "delimiters")]
    tokenizer: TokenizerChoice,
}

#[derive(Clone, Copy, ValueEnum)]
enum TokenizerChoice {
    Chars,
    Words,
    WordOperators,
    Delimiters,
}

impl From<TokenizerChoice> for Tokenizer {
    fn from(choice: TokenizerChoice) -> Self {
        match choice {
            TokenizerChoice::Chars => Tokenizer::Chars,
            TokenizerChoice::Words => Tokenizer::Words,
            TokenizerChoice::WordOperators => Tokenizer::WordOperators,
            TokenizerChoice::Delimiters => Tokenizer::Delimiters,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut options = MoverOptions::from_env();
    if let Some(threshold) = cli.threshold {
        options.threshold = threshold.clamp(0.0, 1.0);
    }
    options.tokenizer = cli.tokenizer.into();

    let reader: Box<dyn BufRead> = match &cli.file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|e| format!("failed to open {}: {}", path.display(), e))?,
        )),
        None => Box::new(BufReader::new(io::stdin().lock())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for group in annotate_reader(reader, options) {
        for item in &group?.items {
            writeln!(out, "{}", item.text)?;
        }
    }

    Ok(())
}
