//! Entity extraction from a free-text goal.

use fieldnote_core::context::EntityKind;
use regex_lite::Regex;
use std::sync::LazyLock;

static CITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin ([A-Za-z ]+?)(?:,| and |$)").expect("static regex")
});
static BOOK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bbooks? on ([A-Za-z ]+?)(?:,| and |$)").expect("static regex")
});
static PLACE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:in|for|at)\s+([A-Za-z ]+)").expect("static regex"));
static TOPIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:about|regarding)\s+([A-Za-z ]+)").expect("static regex"));

/// Words that follow `in`/`for`/`at` without naming a place.
const NOT_A_PLACE: [&str; 24] = [
    "a", "an", "the", "this", "that", "these", "those", "my", "our", "your", "their", "its",
    "some", "any", "all", "each", "every", "next", "last", "now", "today", "tonight", "tomorrow",
    "yesterday",
];

/// Entities found in a goal, and what they denote.
///
/// When no `in`/`books on` phrase matches, `entities` stays empty and the
/// goal may still yield a `city` or `topic` hint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub entities: Vec<String>,
    pub kind: EntityKind,
    pub city: Option<String>,
    pub topic: Option<String>,
}

/// Extract entities from `goal`.
///
/// `in <place>` phrases win and yield cities; then `book(s) on <subject>`
/// phrases. Otherwise the single word after `in`/`for`/`at` becomes a city
/// hint, and the phrase after `about`/`regarding` a topic hint.
pub fn extract_entities(goal: &str) -> Entities {
    let cities = all_captures(&CITY, goal);
    if !cities.is_empty() {
        return Entities {
            entities: cities,
            kind: EntityKind::City,
            ..Entities::default()
        };
    }

    let books = all_captures(&BOOK, goal);
    if !books.is_empty() {
        return Entities {
            entities: books,
            kind: EntityKind::Book,
            ..Entities::default()
        };
    }

    let city = PLACE_WORD
        .captures(goal)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().split_whitespace().next())
        .filter(|w| !NOT_A_PLACE.contains(&w.to_lowercase().as_str()))
        .map(str::to_string);
    let topic = TOPIC
        .captures(goal)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    Entities {
        entities: Vec::new(),
        kind: EntityKind::General,
        city,
        topic,
    }
}

fn all_captures(re: &Regex, goal: &str) -> Vec<String> {
    re.captures_iter(goal)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
