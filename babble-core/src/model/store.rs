use std::path::Path;

use log::{debug, warn};
use rand::Rng;
use redb::{Database, ReadableTable, Table, TableDefinition};

use super::error::{ModelError, Result};
use super::postings::PostingList;
use super::prefix::{Prefix, TERMINATOR};
use super::sampling::reservoir_choose;

/// Successor postings: two-token prefix key, encoded posting list.
const POSTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("postings");

/// Start pairs: two-token prefix key, presence only.
const STARTS: TableDefinition<&str, ()> = TableDefinition::new("starts");

/// Persistent word-trigram model layered on a transactional KV engine.
///
/// The store keeps two keyed collections: for every pair of consecutive
/// tokens, the ordered list of tokens seen immediately after that pair, and
/// the set of pairs that opened at least one sentence. Learning folds a
/// sentence into both; generation random-walks the postings from a uniformly
/// chosen start pair.
///
/// # Responsibilities
/// - Tokenize sentences and record their trigram statistics atomically
/// - Sample a start pair in a single pass without counting the set first
/// - Walk the postings, weighted by entry frequency, until a sentence ends
///
/// # Invariants
/// - A sentence of n >= 3 tokens contributes one start pair and n-1 postings
///   (the last one being the terminator); shorter sentences contribute
///   nothing
/// - Entries are only ever appended, the store never deletes or compacts
/// - No state is cached between calls; every operation re-reads the engine
///   inside its own transaction
pub struct TrigramStore {
	db: Database,
}

impl TrigramStore {
	/// Opens (or creates) the model database at the given path.
	///
	/// Both tables are created up front, so later read transactions always
	/// find them. The store is meant to be opened once per process; dropping
	/// it closes the database.
	///
	/// # Errors
	/// Fails if the engine cannot open or initialize the file.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let db = Database::create(path)?;

		let txn = db.begin_write()?;
		let _ = txn.open_table(POSTINGS)?;
		let _ = txn.open_table(STARTS)?;
		txn.commit()?;

		Ok(Self { db })
	}

	/// Folds one sentence into the model.
	///
	/// # Behavior
	/// - Tokenizes on whitespace (repeated whitespace collapses).
	/// - Fewer than 3 tokens: logged no-op, too short to form a trigram.
	/// - Records one posting per consecutive token pair, a terminator
	///   posting for the final pair, and the first pair as a start.
	///
	/// All of the sentence's contributions are applied in a single write
	/// transaction: either every posting and the start entry become visible
	/// together, or none of them do.
	///
	/// # Errors
	/// Engine faults surface as-is and the sentence contributes nothing.
	pub fn learn(&self, sentence: &str) -> Result<()> {
		let txn = self.db.begin_write()?;
		{
			let mut postings = txn.open_table(POSTINGS)?;
			let mut starts = txn.open_table(STARTS)?;
			Self::fold_sentence(&mut postings, &mut starts, sentence)?;
		}
		txn.commit()?;
		Ok(())
	}

	/// Folds a whole batch of sentences into a single write transaction.
	///
	/// Same per-sentence logic as [`learn`](Self::learn), but one commit for
	/// the entire block, which is much faster when importing a bulk corpus.
	///
	/// # Errors
	/// A fault aborts the whole batch; no sentence of a failed batch is
	/// applied.
	pub fn learn_batch<I, S>(&self, sentences: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let txn = self.db.begin_write()?;
		{
			let mut postings = txn.open_table(POSTINGS)?;
			let mut starts = txn.open_table(STARTS)?;
			for sentence in sentences {
				Self::fold_sentence(&mut postings, &mut starts, sentence.as_ref())?;
			}
		}
		txn.commit()?;
		Ok(())
	}

	/// Records one sentence's postings and start pair into open tables.
	fn fold_sentence(
		postings: &mut Table<'_, &'static str, &'static [u8]>,
		starts: &mut Table<'_, &'static str, ()>,
		sentence: &str,
	) -> Result<()> {
		let words: Vec<&str> = sentence.split_whitespace().collect();

		if words.len() < 3 {
			debug!("ignoring short sentence: {sentence:?}");
			return Ok(());
		}

		for i in 2..words.len() {
			Self::append_posting(postings, words[i - 2], words[i - 1], words[i])?;
		}
		Self::append_posting(
			postings,
			words[words.len() - 2],
			words[words.len() - 1],
			TERMINATOR,
		)?;

		starts.insert(Prefix::new(words[0], words[1]).key().as_str(), ())?;

		Ok(())
	}

	/// Appends `next` to the posting list of the pair `(word1, word2)`.
	///
	/// An existing value that fails to decode is discarded: the new list
	/// then contains only `next`. See [`PostingList::decode`].
	fn append_posting(
		postings: &mut Table<'_, &'static str, &'static [u8]>,
		word1: &str,
		word2: &str,
		next: &str,
	) -> Result<()> {
		let key = Prefix::new(word1, word2).key();

		let mut list = match postings.get(key.as_str())? {
			Some(raw) => PostingList::decode(&key, raw.value()),
			None => PostingList::new(),
		};
		list.push(next);

		let raw = list.encode()?;
		postings.insert(key.as_str(), raw.as_slice())?;
		Ok(())
	}

	/// Generates one pseudo-sentence using the process-wide RNG.
	///
	/// See [`generate_with`](Self::generate_with).
	pub fn generate(&self) -> Result<String> {
		self.generate_with(&mut rand::rng())
	}

	/// Generates one pseudo-sentence using the given random source.
	///
	/// # Behavior
	/// - Chooses a start pair uniformly over the start set in a single pass
	///   (no prior size count, O(1) extra memory).
	/// - Walks the postings from that pair: each step picks one entry
	///   uniformly by index over the pair's full list, so repeated entries
	///   weight the choice.
	/// - Stops on an explicit terminator entry, on a pair with no posting
	///   list, or on a list recovered empty from a corrupt value; all three
	///   end the sentence the same way.
	///
	/// The whole walk runs inside one read transaction and therefore
	/// observes a consistent snapshot, unaffected by concurrent writers.
	///
	/// # Parameters
	/// - `rng`: Random source for both sampling stages. Passing a seeded
	///   generator makes the output reproducible.
	///
	/// # Errors
	/// - `ModelError::EmptyModel` if no sentence was ever learned.
	/// - Engine faults surface as-is.
	pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
		let txn = self.db.begin_read()?;
		let starts = txn.open_table(STARTS)?;
		let postings = txn.open_table(POSTINGS)?;

		let chosen = reservoir_choose(
			starts.iter()?.filter_map(|entry| match entry {
				Ok((key, _)) => {
					let key = key.value();
					match Prefix::parse(key) {
						Some(prefix) => Some(Ok(prefix)),
						None => {
							warn!("skipping malformed start key {key:?}");
							None
						}
					}
				}
				Err(err) => Some(Err(err)),
			}),
			rng,
		)?;
		let mut prefix = match chosen {
			Some(prefix) => prefix,
			None => return Err(ModelError::EmptyModel),
		};

		let mut words = vec![prefix.first().to_owned(), prefix.second().to_owned()];
		loop {
			let key = prefix.key();
			let list = match postings.get(key.as_str())? {
				Some(raw) => PostingList::decode(&key, raw.value()),
				None => break,
			};

			match list.pick(rng) {
				Some(next) if next != TERMINATOR => {
					let next = next.to_owned();
					words.push(next.clone());
					prefix.shift(next);
				}
				// Terminator entry, or a list recovered empty from a
				// corrupt value.
				_ => break,
			}
		}

		Ok(words.join(" "))
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use tempfile::TempDir;

	use super::*;

	fn open_store() -> (TempDir, TrigramStore) {
		let dir = tempfile::tempdir().unwrap();
		let store = TrigramStore::open(dir.path().join("model.redb")).unwrap();
		(dir, store)
	}

	/// All posting entries, decoded, keyed by prefix.
	fn posting_entries(store: &TrigramStore) -> Vec<(String, PostingList)> {
		let txn = store.db.begin_read().unwrap();
		let table = txn.open_table(POSTINGS).unwrap();
		table
			.iter()
			.unwrap()
			.map(|entry| {
				let (key, value) = entry.unwrap();
				let key = key.value().to_owned();
				let list = PostingList::decode(&key, value.value());
				(key, list)
			})
			.collect()
	}

	fn start_keys(store: &TrigramStore) -> Vec<String> {
		let txn = store.db.begin_read().unwrap();
		let table = txn.open_table(STARTS).unwrap();
		table
			.iter()
			.unwrap()
			.map(|entry| entry.unwrap().0.value().to_owned())
			.collect()
	}

	fn decoded(store: &TrigramStore, key: &str) -> PostingList {
		let txn = store.db.begin_read().unwrap();
		let table = txn.open_table(POSTINGS).unwrap();
		let raw = table.get(key).unwrap().unwrap();
		PostingList::decode(key, raw.value())
	}

	fn overwrite_posting(store: &TrigramStore, key: &str, raw: &[u8]) {
		let txn = store.db.begin_write().unwrap();
		{
			let mut table = txn.open_table(POSTINGS).unwrap();
			table.insert(key, raw).unwrap();
		}
		txn.commit().unwrap();
	}

	#[test]
	fn learn_records_one_start_and_n_minus_one_postings() {
		let (_dir, store) = open_store();
		store.learn("de kat krabt de krullen").unwrap();

		assert_eq!(start_keys(&store), vec!["de kat".to_owned()]);

		let entries = posting_entries(&store);
		let total: usize = entries.iter().map(|(_, list)| list.len()).sum();
		assert_eq!(total, 4);

		let mut keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
		keys.sort_unstable();
		assert_eq!(keys, vec!["de kat", "de krullen", "kat krabt", "krabt de"]);
	}

	#[test]
	fn short_sentences_leave_the_store_unchanged() {
		let (_dir, store) = open_store();
		store.learn("de kat").unwrap();
		store.learn("de").unwrap();
		store.learn("").unwrap();

		assert!(start_keys(&store).is_empty());
		assert!(posting_entries(&store).is_empty());
	}

	#[test]
	fn repeated_whitespace_collapses() {
		let (_dir, store) = open_store();
		store.learn("  de \t kat   krabt ").unwrap();

		assert_eq!(start_keys(&store), vec!["de kat".to_owned()]);
		let mut list = PostingList::new();
		list.push("krabt");
		assert_eq!(decoded(&store, "de kat"), list);
	}

	#[test]
	fn duplicates_weight_generation() {
		let (_dir, store) = open_store();
		store.learn("a b c").unwrap();
		store.learn("a b c").unwrap();
		store.learn("a b d").unwrap();

		let mut expected = PostingList::new();
		for token in ["c", "c", "d"] {
			expected.push(token);
		}
		assert_eq!(decoded(&store, "a b"), expected);

		let mut rng = StdRng::seed_from_u64(21);
		let draws = 3000;
		let mut hits = 0;
		for _ in 0..draws {
			if store.generate_with(&mut rng).unwrap() == "a b c" {
				hits += 1;
			}
		}

		// "c" was seen twice, "d" once; expected fraction is 2/3.
		let fraction = hits as f64 / draws as f64;
		assert!(fraction > 0.60 && fraction < 0.73, "got {fraction}");
	}

	#[test]
	fn walk_stops_at_the_terminator() {
		let (_dir, store) = open_store();
		store.learn("a b c").unwrap();

		let mut rng = StdRng::seed_from_u64(5);
		for _ in 0..25 {
			assert_eq!(store.generate_with(&mut rng).unwrap(), "a b c");
		}
	}

	#[test]
	fn start_selection_is_uniform_over_distinct_pairs() {
		let (_dir, store) = open_store();
		// "a b" opens five sentences but is still a single member of the
		// start set; membership is what counts, not sentence frequency.
		for _ in 0..5 {
			store.learn("a b one").unwrap();
		}
		store.learn("c d two").unwrap();
		store.learn("e f three").unwrap();

		let mut rng = StdRng::seed_from_u64(13);
		let draws = 3000;
		let mut counts = [0u32; 3];
		for _ in 0..draws {
			let sentence = store.generate_with(&mut rng).unwrap();
			match sentence.split_whitespace().next().unwrap() {
				"a" => counts[0] += 1,
				"c" => counts[1] += 1,
				"e" => counts[2] += 1,
				other => panic!("unexpected start {other}"),
			}
		}

		// Expected 1000 each; a wide band around that is stable for any
		// seed.
		for count in counts {
			assert!((840..=1160).contains(&count), "counts: {counts:?}");
		}
	}

	#[test]
	fn corrupt_posting_value_does_not_fail_generation() {
		let (_dir, store) = open_store();
		store.learn("a b c").unwrap();
		overwrite_posting(&store, "a b", &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

		// The walk treats the corrupt list as "no postings for this key"
		// and ends the sentence right after the start pair.
		let mut rng = StdRng::seed_from_u64(3);
		assert_eq!(store.generate_with(&mut rng).unwrap(), "a b");
	}

	#[test]
	fn learning_over_a_corrupt_value_restarts_the_list() {
		let (_dir, store) = open_store();
		store.learn("a b c").unwrap();
		overwrite_posting(&store, "a b", &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

		store.learn("a b x").unwrap();

		let mut expected = PostingList::new();
		expected.push("x");
		assert_eq!(decoded(&store, "a b"), expected);
	}

	#[test]
	fn malformed_start_keys_are_skipped() {
		let (_dir, store) = open_store();
		store.learn("a b c").unwrap();

		let txn = store.db.begin_write().unwrap();
		{
			let mut table = txn.open_table(STARTS).unwrap();
			table.insert("justoneword", ()).unwrap();
		}
		txn.commit().unwrap();

		let mut rng = StdRng::seed_from_u64(11);
		for _ in 0..25 {
			assert_eq!(store.generate_with(&mut rng).unwrap(), "a b c");
		}
	}

	#[test]
	fn generating_from_an_empty_model_fails() {
		let (_dir, store) = open_store();

		let mut rng = StdRng::seed_from_u64(1);
		assert!(matches!(
			store.generate_with(&mut rng),
			Err(ModelError::EmptyModel)
		));
	}

	#[test]
	fn batch_learning_matches_repeated_single_learning() {
		let (_dir, batched) = open_store();
		batched
			.learn_batch(["de kat krabt", "ik zie hem", "de kat"])
			.unwrap();

		let (_dir2, single) = open_store();
		for sentence in ["de kat krabt", "ik zie hem", "de kat"] {
			single.learn(sentence).unwrap();
		}

		let mut batched_starts = start_keys(&batched);
		let mut single_starts = start_keys(&single);
		batched_starts.sort_unstable();
		single_starts.sort_unstable();
		assert_eq!(batched_starts, single_starts);

		let mut batched_postings = posting_entries(&batched);
		let mut single_postings = posting_entries(&single);
		batched_postings.sort_by(|a, b| a.0.cmp(&b.0));
		single_postings.sort_by(|a, b| a.0.cmp(&b.0));
		assert_eq!(batched_postings, single_postings);
	}

	#[test]
	fn terminator_does_not_close_a_key_for_later_sentences() {
		let (_dir, store) = open_store();
		store.learn("a b c").unwrap();
		// "b c" now holds a terminator; a later sentence sharing that pair
		// must still append to it.
		store.learn("a b c d").unwrap();

		let mut expected = PostingList::new();
		expected.push(TERMINATOR);
		expected.push("d");
		assert_eq!(decoded(&store, "b c"), expected);
	}

	#[test]
	fn reopening_keeps_the_model() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("model.redb");

		{
			let store = TrigramStore::open(&path).unwrap();
			store.learn("a b c").unwrap();
		}

		let store = TrigramStore::open(&path).unwrap();
		let mut rng = StdRng::seed_from_u64(17);
		assert_eq!(store.generate_with(&mut rng).unwrap(), "a b c");
	}
}
