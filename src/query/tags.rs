use super::matcher::{normalize, Matcher};

const AND: &str = "AND";
const AMPERSAND: &str = "&";
const NOT: &str = "NOT";
const OR: &str = "OR";

/// Exact tag membership, compared in normalized form
pub fn contains_tag<S: AsRef<str>>(tags: &[S], tag: &str) -> bool {
    let wanted = normalize(tag);
    tags.iter().any(|t| normalize(t.as_ref()) == wanted)
}

/// Evaluate a tag query against a tag set.
///
/// Operators are case sensitive and split the raw text wherever they occur.
/// `AND` (or `&`) is split first into a conjunction. Within each operand,
/// `NOT` separates the required part (before the first `NOT`; vacuously true
/// when blank) from exclusions, each of which must not match. What is left is
/// split on `OR` into a disjunction, and every remaining operand is a
/// wildcard pattern that must match at least one tag.
pub fn contains_tag_pattern<S: AsRef<str>>(tags: &[S], pattern: &str) -> bool {
    if pattern.contains(AND) || pattern.contains(AMPERSAND) {
        return pattern
            .split(AND)
            .flat_map(|part| part.split(AMPERSAND))
            .all(|part| contains_tag_pattern(tags, part));
    }
    if let Some((required, excluded)) = pattern.split_once(NOT) {
        let required_ok = required.trim().is_empty() || contains_tag_pattern(tags, required);
        return required_ok
            && excluded
                .split(NOT)
                .all(|part| !contains_tag_pattern(tags, part));
    }
    if pattern.contains(OR) {
        return pattern.split(OR).any(|part| contains_tag_pattern(tags, part));
    }
    Matcher::new(pattern).matches_any(tags)
}
