//! "Did you mean" suggestions for mistyped names

use strsim::levenshtein;

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Candidates closest to `input`, best first
pub fn find_closest_matches<'a>(
    input: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_results: usize,
) -> Vec<&'a str> {
    let input = input.to_lowercase();
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = levenshtein(&input, &candidate.to_lowercase());
            (distance <= MAX_SUGGESTION_DISTANCE).then_some((distance, candidate))
        })
        .collect();

    scored.sort_by_key(|(distance, _)| *distance);
    scored.truncate(max_results);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Help line for an unknown name: a suggestion when one is close, else the full list
pub fn suggestion_help(kind: &str, input: &str, candidates: &[String]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let closest = find_closest_matches(input, candidates.iter().map(String::as_str), 1);
    Some(match closest.first() {
        Some(best) => format!("Did you mean '{}'?", best),
        None => format!("Available {}: {}", kind, candidates.join(", ")),
    })
}
