use regex::{Match, Regex};
use serde::{Deserialize, Serialize};

/// One recognition rule as written in the lexicon file.
///
/// Either a bare regex, or a regex with guards standing in for negative
/// look-behind / look-ahead, which the `regex` engine does not support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Plain(String),
    Guarded {
        re: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_preceded_by: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_followed_by: Option<String>,
    },
}

impl PatternSpec {
    /// `re` guarded against ASCII letters on both sides: a whole-token match.
    pub fn token(re: &str) -> Self {
        PatternSpec::Guarded {
            re: re.to_string(),
            not_preceded_by: Some("[a-z]".into()),
            not_followed_by: Some("[a-z]".into()),
        }
    }

    pub fn compile(&self) -> Result<Pattern, regex::Error> {
        match self {
            PatternSpec::Plain(re) => Ok(Pattern {
                re: Regex::new(re)?,
                not_preceded_by: None,
                not_followed_by: None,
            }),
            PatternSpec::Guarded {
                re,
                not_preceded_by,
                not_followed_by,
            } => Ok(Pattern {
                re: Regex::new(re)?,
                not_preceded_by: not_preceded_by
                    .as_deref()
                    .map(|g| Regex::new(&format!("(?:{})$", g)))
                    .transpose()?,
                not_followed_by: not_followed_by
                    .as_deref()
                    .map(|g| Regex::new(&format!("^(?:{})", g)))
                    .transpose()?,
            }),
        }
    }
}

/// Compiled recognition rule.
#[derive(Debug, Clone)]
pub struct Pattern {
    re: Regex,
    not_preceded_by: Option<Regex>,
    not_followed_by: Option<Regex>,
}

impl Pattern {
    /// First match whose surroundings satisfy the guards.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        let mut start = 0;
        while start <= text.len() {
            let m = self.re.find_at(text, start)?;
            if self.guards_pass(text, &m) {
                return Some(m);
            }
            if m.start() >= text.len() {
                break;
            }
            let step = text[m.start()..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            start = m.start() + step;
        }
        None
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// Character length of the accepted match; the specificity signal.
    pub fn match_len(&self, text: &str) -> Option<usize> {
        self.find(text).map(|m| m.as_str().chars().count())
    }

    fn guards_pass(&self, text: &str, m: &Match<'_>) -> bool {
        if let Some(before) = &self.not_preceded_by {
            if before.is_match(&text[..m.start()]) {
                return false;
            }
        }
        if let Some(after) = &self.not_followed_by {
            if after.is_match(&text[m.end()..]) {
                return false;
            }
        }
        true
    }
}

/// Ordered list of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn compile(specs: &[PatternSpec]) -> Result<Self, regex::Error> {
        let patterns = specs
            .iter()
            .map(PatternSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_match(&self, text: &str) -> bool {
        !text.is_empty() && self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Longest accepted match across all rules.
    pub fn best_match_len(&self, text: &str) -> Option<usize> {
        if text.is_empty() {
            return None;
        }
        self.patterns.iter().filter_map(|p| p.match_len(text)).max()
    }
}

/// Plain substring vocabulary (already normalized).
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    tokens: Vec<String>,
}

impl TokenList {
    pub fn new(tokens: &[String]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| crate::text::normalize(t))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn any_in(&self, text: &str) -> bool {
        self.tokens.iter().any(|t| text.contains(t.as_str()))
    }

    /// Like [`any_in`](Self::any_in), but a Latin token only counts when it
    /// stands as a whole word: `no` does not hit "know", `ok` not "facebook".
    pub fn any_word(&self, text: &str) -> bool {
        self.tokens.iter().any(|t| contains_word(text, t))
    }

    pub fn exact(&self, text: &str) -> bool {
        self.tokens.iter().any(|t| t == text)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn contains_word(text: &str, token: &str) -> bool {
    let bounded_start = token.chars().next().is_some_and(is_word_char);
    let bounded_end = token.chars().last().is_some_and(is_word_char);
    text.match_indices(token).any(|(at, _)| {
        let before_ok = !bounded_start || !text[..at].chars().next_back().is_some_and(is_word_char);
        let after_ok = !bounded_end || !text[at + token.len()..].chars().next().is_some_and(is_word_char);
        before_ok && after_ok
    })
}
