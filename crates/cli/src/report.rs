//! Plain-text research report.
//!
//! The same text is printed to the terminal and saved under the reports
//! directory, so it carries no terminal escapes.

use chrono::{DateTime, Local};
use fieldnote_core::context::Context;
use fieldnote_engine::{RunReport, RunStatus};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const SUMMARY_PREFIX: &str = "In-depth Analytical Summary";
const NO_SUMMARY: &str = "No summary was generated, but all available data is presented below.";
const NO_ANOMALIES: &str = "Analysis shows no critical anomalies requiring immediate attention.";

/// Headlines listed per entity.
const ENTITY_HEADLINES: usize = 5;
/// Summary characters turned into conclusion points.
const CONCLUSION_CHARS: usize = 500;
/// `sentiment_score` beyond which recommendations lean one way.
const SENTIMENT_THRESHOLD: f64 = 0.3;

/// Keys rendered in their own sections rather than under gathered data.
const SECTION_KEYS: [&str; 4] = ["summary", "sentiment", "sentiment_score", "sentiment_reasoning"];

/// How much analysis the summary carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisDepth {
    Comprehensive,
    Detailed,
    Basic,
    Insufficient,
}

impl AnalysisDepth {
    fn label(self) -> &'static str {
        match self {
            Self::Comprehensive => "Comprehensive",
            Self::Detailed => "Detailed",
            Self::Basic => "Basic",
            Self::Insufficient => "Insufficient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub depth: AnalysisDepth,
    pub summary_words: usize,
    pub entity_count: usize,
    /// `min(100, entities * 15 + 40 when a summary exists)`.
    pub coverage_index: usize,
}

impl Metrics {
    pub fn of(context: &Context) -> Self {
        let summary_words = context.get_str("summary").map(|s| s.split_whitespace().count());
        let depth = match summary_words {
            Some(n) if n > 200 => AnalysisDepth::Comprehensive,
            Some(n) if n > 100 => AnalysisDepth::Detailed,
            Some(_) => AnalysisDepth::Basic,
            None => AnalysisDepth::Insufficient,
        };
        let entity_count = context.entities().len();
        let bonus = if summary_words.is_some() { 40 } else { 0 };
        Self {
            depth,
            summary_words: summary_words.unwrap_or(0),
            entity_count,
            coverage_index: (entity_count * 15 + bonus).min(100),
        }
    }
}

/// Render the full report for a finished run.
pub fn render(run: &RunReport, generated_at: DateTime<Local>, width: usize) -> String {
    let context = &run.context;
    let mut out = String::new();

    section(&mut out, "AI RESEARCH REPORT", width);
    let _ = writeln!(out, "Research Goal: {}", context.goal());
    let _ = writeln!(out, "Date of Analysis: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Processing Metrics: Completed in {:.2} seconds",
        context.processing_time().as_secs_f64()
    );
    let _ = writeln!(out, "Agent Workflow: {}", context.initial_chain().join(", "));
    if context.agent_chain() != context.initial_chain() {
        let _ = writeln!(out, "Final Agent Chain: {}", context.agent_chain().join(", "));
    }
    let outcome = match run.status {
        RunStatus::Satisfied => "Goal satisfied",
        RunStatus::Exhausted => "Goal not satisfied",
    };
    let _ = writeln!(
        out,
        "Outcome: {outcome} after {} iteration(s). {}",
        run.iterations, run.evaluation.feedback
    );

    section(&mut out, "EXECUTIVE OVERVIEW", width);
    paragraph(&mut out, &executive_overview(context), width);

    let thematic = thematic_analysis(context);
    if !thematic.is_empty() {
        section(&mut out, "THEMATIC ANALYSIS", width);
        for text in thematic {
            paragraph(&mut out, &text, width);
        }
    }

    for (entity, text) in entity_analysis(context) {
        section(&mut out, &format!("ENTITY ANALYSIS: {}", entity.to_uppercase()), width);
        paragraph(&mut out, &text, width);
    }

    let insights = critical_insights(context);
    section(&mut out, "CRITICAL INSIGHTS", width);
    let bullets: Vec<String> = insights.iter().map(|i| format!("- {i}")).collect();
    paragraph(&mut out, &bullets.join("\n"), width);

    section(&mut out, "GATHERED DATA", width);
    let gathered: Vec<_> = context
        .data()
        .iter()
        .filter(|(k, _)| !SECTION_KEYS.contains(&k.as_str()))
        .collect();
    if gathered.is_empty() {
        let _ = writeln!(out, "  No data was gathered.");
    }
    for (key, value) in gathered {
        let _ = writeln!(out, "  {key}: {}", truncate(&plain(value), width.saturating_sub(4).max(40)));
    }

    section(&mut out, "AGENT TRAJECTORY & DATA ENRICHMENT", width);
    for step in run.trajectory.steps() {
        let added = step.added_keys();
        let added = if added.is_empty() {
            "None".to_string()
        } else {
            added.join(", ")
        };
        let _ = writeln!(out, "  [{}] {}: Added keys: {added}", step.iteration, step.agent);
        if let Some(error) = &step.error {
            let _ = writeln!(out, "      Error: {error}");
        }
    }

    section(&mut out, "METHODOLOGY & LIMITATIONS", width);
    paragraph(&mut out, &limitations(context), width);

    section(&mut out, "CONCLUSIONS & RECOMMENDATIONS", width);
    paragraph(&mut out, &conclusions(context), width);

    section(&mut out, "TOTAL SUMMARY", width);
    paragraph(
        &mut out,
        "This section provides a concise synthesis of all key findings, insights, and \
         recommendations from the analysis above. Use this as a quick reference for \
         decision-making.",
        width,
    );
    let overview = executive_overview(context);
    let _ = writeln!(
        out,
        "Executive Overview Word Count: {}\n",
        overview.split_whitespace().count()
    );
    let _ = writeln!(out, "Critical Insights:");
    for insight in &insights {
        for line in wrap(insight, width.saturating_sub(6)) {
            let _ = writeln!(out, "    • {line}");
        }
    }
    if let Some(recommendation) = recommendation(context) {
        let _ = writeln!(out, "\nRecommendation:");
        paragraph(&mut out, recommendation, width);
    }

    section(&mut out, "SYSTEM PERFORMANCE METRICS", width);
    let _ = writeln!(
        out,
        "Total Processing Time: {:.2} seconds",
        context.processing_time().as_secs_f64()
    );
    let errors = context.errors();
    if errors.is_empty() {
        let _ = writeln!(out, "Operational Status: All agents executed successfully");
    } else {
        let _ = writeln!(out, "Operational Issues: {} errors encountered", errors.len());
        for error in errors.iter().take(3) {
            let _ = writeln!(out, "  - {error}");
        }
    }
    let metrics = Metrics::of(context);
    let _ = writeln!(out, "\nData Quality Assessment:");
    match metrics.depth {
        AnalysisDepth::Insufficient => {
            let _ = writeln!(out, "  • Analysis Depth: Insufficient");
        }
        depth => {
            let _ = writeln!(
                out,
                "  • Analysis Depth: {} ({} words)",
                depth.label(),
                metrics.summary_words
            );
        }
    }
    let _ = writeln!(out, "  • Entity Coverage: {} key entities analyzed", metrics.entity_count);
    let _ = writeln!(out, "  • Comprehensive Coverage Index: {}/100", metrics.coverage_index);

    section(&mut out, "END OF REPORT", width);
    out
}

fn executive_overview(context: &Context) -> String {
    match context.get_str("summary") {
        Some(summary) if !summary.trim().is_empty() => strip_summary_prefix(summary).to_string(),
        _ => NO_SUMMARY.to_string(),
    }
}

/// Drop the `In-depth Analytical Summary (provider):` heading line.
fn strip_summary_prefix(summary: &str) -> &str {
    match summary.split_once('\n') {
        Some((first, rest)) if first.starts_with(SUMMARY_PREFIX) => rest.trim(),
        _ => summary.trim(),
    }
}

fn thematic_analysis(context: &Context) -> Vec<String> {
    let mut parts = Vec::new();

    if let Some(main) = context.get("main").and_then(Value::as_object) {
        let description = context
            .get("weather")
            .and_then(Value::as_array)
            .and_then(|w| w.first())
            .and_then(|w| w.get("description"))
            .and_then(Value::as_str)
            .map(capitalize)
            .unwrap_or_default();
        let temp = main.get("temp").and_then(Value::as_f64).map(temperature);
        let feels = main.get("feels_like").and_then(Value::as_f64).map(temperature);
        let humidity = main.get("humidity").map(plain).unwrap_or_else(|| "N/A".into());
        let wind = context
            .get("wind")
            .and_then(|w| w.get("speed"))
            .map(plain)
            .unwrap_or_else(|| "N/A".into());

        let mut text = String::from("Environmental Context: ");
        if !description.is_empty() {
            let _ = write!(text, "{description}. ");
        }
        if let Some(temp) = temp {
            let _ = write!(text, "Temperature: {temp}");
            if let Some(feels) = feels {
                let _ = write!(text, " (feels like {feels})");
            }
            text.push_str(". ");
        }
        let _ = write!(text, "Humidity: {humidity}%. Wind: {wind} m/s.");
        parts.push(text);
    }

    if let Some(location) = context.get_str("launch_location") {
        let name = context.get_str("launch_name").unwrap_or("The next launch");
        parts.push(format!("Launch Context: {name} departs from {location}."));
    }

    if let Some(label) = context.get_str("sentiment") {
        let mut text = format!("Sentiment Analysis: Overall sentiment is assessed as {label}.");
        if let Some(reasoning) = context.get_str("sentiment_reasoning").filter(|r| !r.is_empty()) {
            let _ = write!(text, " This assessment is based on: {reasoning}");
        }
        parts.push(text);
    }

    parts
}

/// Verified headlines for each goal entity, from the `news` records.
fn entity_analysis(context: &Context) -> Vec<(String, String)> {
    let records = context.get("news").and_then(Value::as_array);
    let Some(records) = records else {
        return Vec::new();
    };

    let mut sections = Vec::new();
    for entity in context.entities() {
        let headlines: Vec<&str> = records
            .iter()
            .filter(|r| r.get("validated").and_then(Value::as_bool) == Some(true))
            .filter(|r| {
                r.get("entity")
                    .and_then(Value::as_str)
                    .is_some_and(|e| e.eq_ignore_ascii_case(entity))
            })
            .filter_map(|r| r.get("news").and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str)
            .take(ENTITY_HEADLINES)
            .collect();
        if headlines.is_empty() {
            continue;
        }
        let mut text = String::from("Recent Developments:");
        for headline in headlines {
            let _ = write!(text, "\n- {headline}");
        }
        sections.push((entity.clone(), text));
    }
    sections
}

fn sentiment_score(context: &Context) -> Option<f64> {
    context.get("sentiment_score").and_then(Value::as_f64)
}

fn critical_insights(context: &Context) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(records) = context.get("news").and_then(Value::as_array) {
        let unverified = records
            .iter()
            .filter(|r| r.get("validated").and_then(Value::as_bool) != Some(true))
            .count();
        if unverified > 0 {
            insights.push(format!(
                "Headline coverage is incomplete: {unverified} of {} news searches returned no \
                 verified articles.",
                records.len()
            ));
        }
    }

    if let Some(score) = sentiment_score(context).filter(|s| *s < -SENTIMENT_THRESHOLD) {
        insights.push(format!(
            "Caution advised: headline sentiment is markedly negative (score {score:.2})."
        ));
    }

    if context.get_str("summary").is_none() && !context.errors().is_empty() {
        insights.push(
            "No summary was produced; findings rest on raw agent data only.".to_string(),
        );
    }

    if insights.is_empty() {
        insights.push(NO_ANOMALIES.to_string());
    }
    insights
}

fn recommendation(context: &Context) -> Option<&'static str> {
    let score = sentiment_score(context)?;
    Some(if score > SENTIMENT_THRESHOLD {
        "Positive indicators suggest opportunities for growth-oriented strategies."
    } else if score < -SENTIMENT_THRESHOLD {
        "Challenging conditions recommend cautious approaches and risk mitigation."
    } else {
        "Neutral assessment suggests maintaining current strategies with careful monitoring."
    })
}

fn conclusions(context: &Context) -> String {
    let mut text = String::from(
        "Synthesis of Findings:\nBased on comprehensive analysis, key conclusions:\n",
    );
    if let Some(summary) = context.get_str("summary").filter(|s| !s.trim().is_empty()) {
        let points = truncate(strip_summary_prefix(summary), CONCLUSION_CHARS);
        let _ = writeln!(text, "- {}", points.replace(". ", ".\n- "));
    }
    text.push_str("\nStrategic Recommendations:\n");
    text.push_str(recommendation(context).unwrap_or("No sentiment data was available to weigh."));
    text
}

fn limitations(context: &Context) -> String {
    let errors = context.errors();
    if errors.is_empty() {
        return "All data sources validated successfully. Findings represent a comprehensive \
                assessment based on available information."
            .to_string();
    }
    let key: Vec<&str> = errors.iter().take(3).map(String::as_str).collect();
    format!(
        "Analysis encountered {} operational issues. Key limitations: {}. Consider these \
         constraints when interpreting findings.",
        errors.len(),
        key.join(", ")
    )
}

/// `291.5` → `291.5K / 18.35°C / 65.03°F`.
fn temperature(kelvin: f64) -> String {
    let celsius = kelvin - 273.15;
    let fahrenheit = celsius * 9.0 / 5.0 + 32.0;
    format!("{kelvin}K / {celsius:.2}°C / {fahrenheit:.2}°F")
}

fn section(out: &mut String, title: &str, width: usize) {
    let title = format!(" {title} ");
    let _ = writeln!(out, "\n{title:=^width$}");
}

fn paragraph(out: &mut String, text: &str, width: usize) {
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        for wrapped in wrap(line, width.saturating_sub(2)) {
            let _ = writeln!(out, "  {wrapped}");
        }
    }
    out.push('\n');
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `<first 20 chars of goal, spaces and separators → _>_<YYYYmmdd_HHMMSS>.txt`
pub fn report_filename(goal: &str, at: DateTime<Local>) -> String {
    let stem: String = goal
        .chars()
        .take(20)
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("{stem}_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Write `text` into `dir`, creating it if needed.
pub fn save(dir: &Path, goal: &str, text: &str, at: DateTime<Local>) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_filename(goal, at));
    std::fs::write(&path, text)?;
    Ok(path)
}
