use rand::Rng;

/// Chooses one element uniformly at random from a sequence of unknown
/// length in a single pass.
///
/// For the k-th element visited, the held candidate is replaced with
/// probability `1/k`. Every element ends up selected with probability `1/n`
/// while only one candidate and a running count are kept in memory, so the
/// scan never materializes the sequence regardless of its size.
///
/// The iterator yields `Result` items so a storage fault encountered
/// mid-scan aborts the selection instead of biasing it.
///
/// # Returns
/// - `Ok(Some(element))` for a non-empty sequence
/// - `Ok(None)` if the iterator yields nothing
/// - `Err(...)` on the first failed item
pub fn reservoir_choose<T, E, I, R>(items: I, rng: &mut R) -> Result<Option<T>, E>
where
	I: Iterator<Item = Result<T, E>>,
	R: Rng + ?Sized,
{
	let mut chosen = None;
	let mut seen: usize = 0;
	for item in items {
		let item = item?;
		seen += 1;
		if rng.random_range(0..seen) == 0 {
			chosen = Some(item);
		}
	}
	Ok(chosen)
}
