use std::sync::OnceLock;

use regex::Regex;

use crate::catalog::{Catalog, FALLBACK_GENRE};

const PASSAGE_WINDOW_CHARS: usize = 500;
const CHARACTER_ACTION_WINDOW_CHARS: usize = 300;
const QUOTE_WINDOW_CHARS: usize = 200;

/// Keyword table in tie-break priority order: on equal scores the earlier
/// genre wins.
const GENRE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Argumentative",
        &[
            "should",
            "must",
            "argue",
            "debate",
            "opinion",
            "agree",
            "disagree",
            "pros and cons",
            "benefits and concerns",
            "worth",
            "banned",
            "deserve",
            "fair",
            "justice",
            "protest",
        ],
    ),
    (
        "Procedural",
        &[
            "how to",
            "steps",
            "first, second",
            "instructions",
            "guide",
            "recipe",
            "method",
            "process",
            "prepare",
        ],
    ),
    (
        "Narrative",
        &[
            "one day",
            "once upon",
            "she said",
            "he said",
            "story",
            "remember",
            "happened",
            "told",
            "asked",
            "smiled",
            "laughed",
            "walked",
            "looked",
            "felt",
            "realized",
            "murmured",
            "sighed",
        ],
    ),
    (
        "Literary",
        &[
            "poem",
            "beauty",
            "soul",
            "heart",
            "metaphor",
            "literary",
            "aesthetic",
            "modernism",
            "art and meaning",
        ],
    ),
    (
        "Informational",
        &[
            "report",
            "statistics",
            "according to",
            "data shows",
            "study",
            "research",
            "survey",
            "percent",
            "government",
            "country",
            "countries",
            "global",
            "billion",
            "million",
        ],
    ),
    (
        "Expository",
        &[
            "explain",
            "definition",
            "means",
            "refers to",
            "process",
            "because",
            "causes",
            "effects",
            "science",
            "how does",
            "what is",
            "understand",
            "concept",
            "theory",
        ],
    ),
];

const OPINION_TITLE_MARKERS: &[&str] = &["should", "banned", "worth", "deserve", "fair"];
const HOW_TO_TITLE_MARKERS: &[&str] = &["how to", "steps", "guide"];
const QUESTION_TITLE_MARKERS: &[&str] = &[
    "what is", "how does", "how do", "how can", "why do", "why is", "why are",
];

#[derive(Debug, Clone)]
pub struct GenreKeywords {
    pub genre: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreScore {
    pub genre: String,
    pub score: u32,
}

/// Deterministic keyword scorer assigning a genre label to a passage.
#[derive(Debug, Clone)]
pub struct GenreClassifier {
    table: Vec<GenreKeywords>,
}

impl Default for GenreClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl GenreClassifier {
    pub fn standard() -> Self {
        Self::with_table(
            GENRE_KEYWORDS
                .iter()
                .map(|(genre, keywords)| GenreKeywords {
                    genre: genre.to_string(),
                    keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
                })
                .collect(),
        )
    }

    /// Built-in table restricted to the catalog's genres, keeping priority
    /// order. Catalog keywords extend a built-in entry; genres the built-in
    /// table does not know follow it, scored by their catalog keywords alone.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let mut table = Self::standard()
            .table
            .into_iter()
            .filter_map(|mut entry| {
                let spec = catalog.genre(&entry.genre)?;
                entry.keywords.extend(spec.keywords.iter().cloned());
                Some(entry)
            })
            .collect::<Vec<GenreKeywords>>();

        for spec in &catalog.genres {
            if !table.iter().any(|entry| entry.genre == spec.name) {
                table.push(GenreKeywords {
                    genre: spec.name.clone(),
                    keywords: spec.keywords.clone(),
                });
            }
        }

        Self::with_table(table)
    }

    pub fn with_table(table: Vec<GenreKeywords>) -> Self {
        Self { table }
    }

    pub fn classify(&self, title: &str, passage: &str) -> String {
        let scores = self.score(title, passage);

        // Strictly-greater keeps the first maximum in table order.
        let mut best: Option<&GenreScore> = None;
        for candidate in &scores {
            if best.is_none_or(|current| candidate.score > current.score) {
                best = Some(candidate);
            }
        }

        match best {
            Some(best) if best.score > 0 => best.genre.clone(),
            _ => FALLBACK_GENRE.to_string(),
        }
    }

    pub fn score(&self, title: &str, passage: &str) -> Vec<GenreScore> {
        let title_lower = title.to_lowercase();
        let passage_lower = passage.to_lowercase();
        let combined = format!(
            "{title_lower} {}",
            prefix_chars(&passage_lower, PASSAGE_WINDOW_CHARS)
        );

        let mut scores = self
            .table
            .iter()
            .map(|entry| GenreScore {
                genre: entry.genre.clone(),
                score: entry
                    .keywords
                    .iter()
                    .filter(|keyword| combined.contains(keyword.as_str()))
                    .count() as u32,
            })
            .collect::<Vec<GenreScore>>();

        if contains_any(&title_lower, OPINION_TITLE_MARKERS) {
            add_bonus(&mut scores, "Argumentative", 3);
        }
        if contains_any(&title_lower, HOW_TO_TITLE_MARKERS) {
            add_bonus(&mut scores, "Procedural", 3);
        }
        if contains_any(&title_lower, QUESTION_TITLE_MARKERS) {
            add_bonus(&mut scores, "Expository", 2);
        }

        if character_action_pattern()
            .is_match(prefix_chars(passage, CHARACTER_ACTION_WINDOW_CHARS))
        {
            add_bonus(&mut scores, "Narrative", 3);
        }
        if prefix_chars(passage, QUOTE_WINDOW_CHARS).contains('"') {
            add_bonus(&mut scores, "Narrative", 1);
        }

        scores
    }
}

fn character_action_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Z][a-z]+\s(said|asked|smiled|looked|felt|walked)")
            .expect("character action pattern is a valid regex")
    })
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn add_bonus(scores: &mut [GenreScore], genre: &str, bonus: u32) {
    if let Some(entry) = scores.iter_mut().find(|entry| entry.genre == genre) {
        entry.score += bonus;
    }
}

/// Leading `max_chars` characters of `text`, never splitting a code point.
pub(crate) fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
