use std::borrow::Borrow;

use serde::Deserialize;

use crate::config::ThemeSpec;
use crate::data::model::{CellValue, Row};

/// Word stems that count towards a positive comment.
const POSITIVE_STEMS: [&str; 12] = [
    "great",
    "excellent",
    "fantastic",
    "loved",
    "appreciate",
    "helpful",
    "valuable",
    "enjoyed",
    "wonderful",
    "amazing",
    "best",
    "insightful",
];

/// Word stems that count towards a negative comment.
const NEGATIVE_STEMS: [&str; 12] = [
    "disappointed",
    "poor",
    "rushed",
    "boring",
    "irrelevant",
    "waste",
    "frustrat",
    "annoying",
    "confusing",
    "disjointed",
    "ignored",
    "refused",
];

/// Words that flip the polarity of the next few words.
const NEGATIONS: [&str; 10] = [
    "not", "no", "never", "nothing", "neither", "nobody", "nowhere", "barely", "hardly", "scarcely",
];

/// How many words after a negation are flipped.
const NEGATION_REACH: usize = 3;

/// Theme assigned to an answered comment that matches no keyword.
pub const OTHER_THEME: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Display order of every chart and table.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn name(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

/// Number of comments per sentiment. Also the shape of a
/// `sentiment_distribution` section in a JSON source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SentimentTally {
    #[serde(default)]
    pub positive: usize,
    #[serde(default)]
    pub neutral: usize,
    #[serde(default)]
    pub negative: usize,
}

impl SentimentTally {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// One slice per sentiment; empty when nothing was counted.
    pub fn shares(&self) -> Vec<Share> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        Sentiment::ALL
            .iter()
            .map(|&s| Share {
                label: s.name().to_string(),
                count: self.count(s),
                pct: 100.0 * self.count(s) as f64 / total as f64,
            })
            .collect()
    }
}

/// One slice of a part-of-whole chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Share {
    pub label: String,
    pub count: usize,
    pub pct: f64,
}

/// How often a theme comes up among answered comments, split by the
/// sentiment of the comments that mention it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSummary {
    pub theme: String,
    pub mentions: usize,
    /// Mentions as a share (0–100) of answered comments.
    pub prevalence_pct: f64,
    pub sentiment: SentimentTally,
}

impl ThemeSummary {
    /// The part of `prevalence_pct` contributed by comments of `sentiment`.
    pub fn segment_pct(&self, sentiment: Sentiment) -> f64 {
        if self.mentions == 0 {
            return 0.0;
        }
        self.prevalence_pct * self.sentiment.count(sentiment) as f64 / self.mentions as f64
    }
}

// ---------------------------------------------------------------------------
// Single comments
// ---------------------------------------------------------------------------

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

/// Lexicon-based polarity of one comment. A stem within three words after a
/// negation counts for the opposite side; a tie is neutral.
pub fn detect_sentiment(text: &str) -> Sentiment {
    let words = words(text);
    let mut negated_until = 0;
    let (mut positive, mut negative) = (0usize, 0usize);

    for (i, word) in words.iter().enumerate() {
        let negated = i < negated_until;
        if is_negation(word) {
            negated_until = i + 1 + NEGATION_REACH;
        }
        let pos_hit = POSITIVE_STEMS.iter().any(|s| word.starts_with(s));
        let neg_hit = NEGATIVE_STEMS.iter().any(|s| word.starts_with(s));
        for hit_positive in [pos_hit.then_some(true), neg_hit.then_some(false)].into_iter().flatten() {
            if hit_positive != negated {
                positive += 1;
            } else {
                negative += 1;
            }
        }
    }

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// Themes whose keywords start a word (or phrase) of `text`, in `themes`
/// order. An answered comment with no match gets [`OTHER_THEME`]; a blank
/// one gets nothing.
pub fn extract_themes<'a>(text: &str, themes: &'a [ThemeSpec]) -> Vec<&'a str> {
    let words = words(text);
    if words.is_empty() {
        return Vec::new();
    }
    let padded = format!(" {} ", words.join(" "));
    let mut found: Vec<&str> = themes
        .iter()
        .filter(|t| {
            t.keywords
                .iter()
                .any(|k| !k.trim().is_empty() && padded.contains(&format!(" {}", k.trim().to_lowercase())))
        })
        .map(|t| t.name.as_str())
        .collect();
    if found.is_empty() {
        found.push(OTHER_THEME);
    }
    found
}

// ---------------------------------------------------------------------------
// Over a subset
// ---------------------------------------------------------------------------

/// Non-blank answers to `field`, in row order.
pub fn comments<'a, R: Borrow<Row>>(rows: &'a [R], field: &'a str) -> impl Iterator<Item = String> + 'a {
    rows.iter().filter_map(move |r| match <R as Borrow<Row>>::borrow(r).value(field) {
        CellValue::Null => None,
        value => {
            let text = value.to_field();
            (!text.trim().is_empty()).then_some(text)
        }
    })
}

pub fn sentiment_distribution<R: Borrow<Row>>(rows: &[R], field: &str) -> SentimentTally {
    let mut tally = SentimentTally::default();
    for text in comments(rows, field) {
        tally.add(detect_sentiment(&text));
    }
    tally
}

/// Prevalence of every theme mentioned at least once, most mentioned first.
/// Ties keep the configured theme order, with [`OTHER_THEME`] last.
pub fn theme_prevalence<R: Borrow<Row>>(rows: &[R], field: &str, themes: &[ThemeSpec]) -> Vec<ThemeSummary> {
    let mut order: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
    order.push(OTHER_THEME);
    let mut tallies: Vec<(usize, SentimentTally)> = vec![(0, SentimentTally::default()); order.len()];

    let mut answered = 0usize;
    for text in comments(rows, field) {
        answered += 1;
        let sentiment = detect_sentiment(&text);
        for theme in extract_themes(&text, themes) {
            if let Some(k) = order.iter().position(|t| *t == theme) {
                tallies[k].0 += 1;
                tallies[k].1.add(sentiment);
            }
        }
    }
    if answered == 0 {
        return Vec::new();
    }

    let mut summaries: Vec<ThemeSummary> = order
        .into_iter()
        .zip(tallies)
        .filter(|(_, (mentions, _))| *mentions > 0)
        .map(|(theme, (mentions, sentiment))| ThemeSummary {
            theme: theme.to_string(),
            mentions,
            prevalence_pct: 100.0 * mentions as f64 / answered as f64,
            sentiment,
        })
        .collect();
    summaries.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    summaries
}
