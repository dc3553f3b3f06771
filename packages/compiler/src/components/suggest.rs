use strsim::levenshtein;

/// Candidates further away than this are never suggested
pub const MAX_SUGGESTION_DISTANCE: usize = 3;

/// The candidate closest to `target` by edit distance, ties broken lexically
pub fn closest_match<'a, I>(target: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (levenshtein(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, candidate)| candidate)
}
