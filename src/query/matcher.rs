use regex::Regex;
use tracing::warn;

/// Canonical form for comparisons: lowercase, without whitespace or underscores
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case, space and underscore insensitive wildcard matcher.
///
/// `*` matches any run of characters (newlines included) and `?` any single
/// character; everything else is literal. The whole text must match.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Option<Regex>,
}

impl Matcher {
    pub fn new(pattern: &str) -> Self {
        let mut source = String::from("(?s)^");
        for c in normalize(pattern).chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');
        let regex = match Regex::new(&source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern, error = %e, "pattern cannot be compiled; it matches nothing");
                None
            }
        };
        Self { regex }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(&normalize(text)))
    }

    pub fn matches_any<I, S>(&self, texts: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        texts.into_iter().any(|text| self.matches(text.as_ref()))
    }
}
