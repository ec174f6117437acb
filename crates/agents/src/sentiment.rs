//! Sentiment agent: lexicon polarity over gathered headlines.
//!
//! Scores each headline word against small positive/negative word lists.
//! Polarity is `(pos - neg) / (pos + neg)` over the whole batch, in
//! `[-1, 1]`; above 0.1 is Positive, below -0.1 Negative.

use async_trait::async_trait;
use fieldnote_core::agent::{Agent, AgentOutput};
use fieldnote_core::context::Context;
use fieldnote_core::error::AgentError;
use serde_json::{Map, Value, json};

const POSITIVE: &[&str] = &[
    "gain", "gains", "growth", "grow", "grows", "rise", "rises", "rising", "surge", "surges",
    "record", "win", "wins", "success", "successful", "boost", "boosts", "improve", "improves",
    "improved", "strong", "stronger", "recovery", "recovers", "good", "great", "best", "positive",
    "up", "launch", "launches", "breakthrough", "celebrate", "celebrates", "safe", "sunny",
    "clear", "calm", "agreement", "deal", "approve", "approved", "innovative", "optimism",
];

const NEGATIVE: &[&str] = &[
    "loss", "losses", "fall", "falls", "falling", "drop", "drops", "decline", "declines",
    "crash", "crashes", "crisis", "war", "attack", "attacks", "dead", "death", "deaths", "kill",
    "killed", "storm", "storms", "flood", "floods", "fire", "fires", "warning", "warnings",
    "weak", "weaker", "bad", "worst", "negative", "down", "fail", "fails", "failure", "delay",
    "delayed", "scrubbed", "protest", "protests", "strike", "strikes", "fear", "fears", "risk",
    "threat", "recession", "layoffs", "outbreak", "pollution", "smog",
];

const THRESHOLD: f64 = 0.1;

pub struct SentimentAgent;

/// Lexicon counts for one piece of text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub positive: usize,
    pub negative: usize,
}

impl Tally {
    pub fn of(text: &str) -> Self {
        let mut tally = Self::default();
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            if POSITIVE.contains(&word.as_str()) {
                tally.positive += 1;
            } else if NEGATIVE.contains(&word.as_str()) {
                tally.negative += 1;
            }
        }
        tally
    }

    fn add(&mut self, other: Tally) {
        self.positive += other.positive;
        self.negative += other.negative;
    }

    /// Polarity in `[-1, 1]`; zero when no lexicon words matched.
    pub fn polarity(&self) -> f64 {
        let total = self.positive + self.negative;
        if total == 0 {
            0.0
        } else {
            (self.positive as f64 - self.negative as f64) / total as f64
        }
    }
}

pub fn label(polarity: f64) -> &'static str {
    if polarity > THRESHOLD {
        "Positive"
    } else if polarity < -THRESHOLD {
        "Negative"
    } else {
        "Neutral"
    }
}

/// `(entity, joined headline text)` for each gathered news record.
fn headline_batches(context: &Context) -> Vec<(String, String)> {
    context
        .get("news")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .map(|record| {
                    let entity = record
                        .get("entity")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let text = record
                        .get("news")
                        .and_then(Value::as_array)
                        .map(|titles| {
                            titles
                                .iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .unwrap_or_default();
                    (entity, text)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Score the gathered headlines.
pub fn analyze(context: &Context) -> Map<String, Value> {
    let batches = headline_batches(context);
    let mut overall = Tally::default();
    let mut per_entity = Vec::with_capacity(batches.len());

    for (entity, text) in &batches {
        if text.is_empty() {
            per_entity.push(json!({"entity": entity, "sentiment": "No text"}));
            continue;
        }
        let tally = Tally::of(text);
        overall.add(tally);
        per_entity.push(json!({
            "entity": entity,
            "sentiment": label(tally.polarity()),
            "score": round2(tally.polarity()),
        }));
    }

    let score = round2(overall.polarity());
    let reasoning = if batches.is_empty() {
        "No headlines gathered yet; sentiment defaults to neutral.".to_string()
    } else {
        format!(
            "{} positive and {} negative terms across {} headline batch(es).",
            overall.positive,
            overall.negative,
            batches.len()
        )
    };

    let mut out = Map::new();
    out.insert("score".into(), json!(score));
    out.insert("label".into(), json!(label(score)));
    out.insert("reasoning".into(), json!(reasoning));
    out.insert("entities".into(), Value::Array(per_entity));
    out
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[async_trait]
impl Agent for SentimentAgent {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn description(&self) -> &str {
        "Overall tone of the gathered news headlines"
    }

    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        Ok(AgentOutput::Mapping(analyze(context)))
    }
}
