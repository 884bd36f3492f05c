//! Parsing one line of operator input into exactly one intent.

use serde::{Deserialize, Serialize};

/// Phrases recognised as a status query, compared case-insensitively.
const STATUS_PHRASES: [&str; 4] = ["status?", "status", "hoe gaat het?", "voortgang?"];

/// Leading tokens recognised as an approval.
const APPROVE_TOKENS: [&str; 2] = ["akkoord", "ja"];

/// Leading tokens recognised as a rejection.
const REJECT_TOKENS: [&str; 2] = ["afwijzen", "nee"];

/// The single intent a line of input resolves to.
///
/// Patterns are tested in a fixed order: directive, status query, approve,
/// reject. Anything else is [`Intent::Unknown`], which never has a side
/// effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// `@<name>: <text>` — a work order for the named entity.
    Directive {
        /// Target name, stripped of the leading `@`.
        target: String,
        /// The directive text after the first colon.
        text: String,
    },
    /// One of the fixed status phrases.
    StatusQuery,
    /// `akkoord`/`ja`, optionally followed by `#<id>`.
    Approve {
        /// Explicit request id (or prefix), when given.
        id: Option<String>,
    },
    /// `afwijzen`/`nee`, optionally followed by `#<id>`.
    Reject {
        /// Explicit request id (or prefix), when given.
        id: Option<String>,
    },
    /// Anything that matched no pattern.
    Unknown,
}

impl Intent {
    /// Parses a line of input. Never fails; unmatched input is `Unknown`.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let line = input.trim();

        if let Some(intent) = parse_directive(line) {
            return intent;
        }
        if STATUS_PHRASES
            .iter()
            .any(|phrase| line.eq_ignore_ascii_case(phrase))
        {
            return Self::StatusQuery;
        }
        if let Some(id) = parse_decision(line, &APPROVE_TOKENS) {
            return Self::Approve { id };
        }
        if let Some(id) = parse_decision(line, &REJECT_TOKENS) {
            return Self::Reject { id };
        }
        Self::Unknown
    }

    /// Returns a short label identifying the intent variant.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Directive { .. } => "directive",
            Self::StatusQuery => "status_query",
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::Unknown => "unknown",
        }
    }
}

/// `@<name>: <text>` with a non-empty name and non-empty text.
fn parse_directive(line: &str) -> Option<Intent> {
    let rest = line.strip_prefix('@')?;
    let (name, text) = rest.split_once(':')?;
    let name = name.trim();
    let text = text.trim();
    if name.is_empty() || name.contains(char::is_whitespace) || text.is_empty() {
        return None;
    }
    Some(Intent::Directive {
        target: name.to_owned(),
        text: text.to_owned(),
    })
}

/// A decision token as the entire leading token, optionally followed by
/// whitespace and `#<id>`. Returns `Some(explicit id)` on a match.
fn parse_decision(line: &str, tokens: &[&str]) -> Option<Option<String>> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    if !tokens.iter().any(|token| first.eq_ignore_ascii_case(token)) {
        return None;
    }

    match words.next() {
        None => Some(None),
        Some(reference) => {
            // Only a `#id` tail is part of the grammar.
            let id = reference.strip_prefix('#')?;
            if id.is_empty() || words.next().is_some() {
                return None;
            }
            Some(Some(id.to_owned()))
        }
    }
}
