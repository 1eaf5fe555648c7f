use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use babble_core::model::error::ModelError;
use babble_core::model::store::TrigramStore;

/// One-shot front-end for the trigram model: print generated
/// pseudo-sentences, or fold ad-hoc sentences into the model.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Path to the model database file.
    #[arg(long, default_value = "babble.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print freshly generated pseudo-sentences (the default).
    Generate {
        /// How many sentences to generate.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Fold the given sentences into the model.
    Learn {
        /// Sentences to learn, one per argument (quote each one).
        #[arg(required = true)]
        sentences: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = TrigramStore::open(&args.db)
        .with_context(|| format!("cannot open model database {}", args.db.display()))?;

    match args.command.unwrap_or(Command::Generate { count: 1 }) {
        Command::Generate { count } => {
            for _ in 0..count {
                match store.generate() {
                    Ok(sentence) => println!("> {sentence}"),
                    Err(ModelError::EmptyModel) => {
                        eprintln!("the model is empty; import or learn some sentences first");
                        std::process::exit(1);
                    }
                    Err(err) => return Err(err).context("cannot generate a sentence"),
                }
            }
        }
        Command::Learn { sentences } => {
            store
                .learn_batch(&sentences)
                .context("cannot learn sentences")?;
        }
    }

    Ok(())
}
