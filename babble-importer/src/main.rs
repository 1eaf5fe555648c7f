use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use babble_core::model::store::TrigramStore;

/// Bulk-imports sentences into the trigram model, one sentence per line on
/// stdin.
///
/// Lines from chat logs often open with a speaker label ("alice: hi there");
/// a leading token ending in ':' is stripped before the line is handed to
/// the model. Sentences are folded in blocks, one write transaction per
/// block; a failed block is logged and dropped so a long import survives
/// transient faults.
#[derive(Parser)]
#[command(version)]
struct Args {
	/// Path to the model database file.
	#[arg(long, default_value = "babble.redb")]
	db: PathBuf,

	/// Number of sentences folded into a single transaction.
	#[arg(long, default_value_t = 10_000)]
	batch_size: usize,
}

fn main() -> anyhow::Result<()> {
	env_logger::init();
	let args = Args::parse();

	let store = TrigramStore::open(&args.db)
		.with_context(|| format!("cannot open model database {}", args.db.display()))?;

	let mut imported = 0usize;
	let mut block: Vec<String> = Vec::with_capacity(args.batch_size);
	for line in io::stdin().lock().lines() {
		let line = line.context("cannot read from stdin")?;
		block.push(strip_speaker_label(&line));
		if block.len() == args.batch_size {
			imported += flush(&store, &mut block);
		}
	}
	if !block.is_empty() {
		imported += flush(&store, &mut block);
	}

	info!("imported {imported} sentences into {}", args.db.display());
	Ok(())
}

/// Hands one block of sentences to the store.
///
/// Returns the number of sentences applied; a failed block counts as zero
/// and the import continues with the next one.
fn flush(store: &TrigramStore, block: &mut Vec<String>) -> usize {
	let count = block.len();
	let applied = match store.learn_batch(block.iter()) {
		Ok(()) => count,
		Err(err) => {
			error!("error while adding sentences: {err}");
			0
		}
	};
	block.clear();
	applied
}

/// Drops a leading chat speaker label (a first token ending in ':') and
/// re-joins the remaining tokens with single spaces.
fn strip_speaker_label(line: &str) -> String {
	let mut words: Vec<&str> = line.split_whitespace().collect();
	if words.first().is_some_and(|word| word.ends_with(':')) {
		words.remove(0);
	}
	words.join(" ")
}
