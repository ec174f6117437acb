//! Keyword-driven choice of the first iteration's agent chain.

const BASE_CHAIN: [&str; 4] = ["news", "wikipedia_summary", "sentiment", "summarizer"];

const SUMMARIZER: &str = "summarizer";

/// Pick the initial chain for `goal` from keywords in it.
///
/// Only names in `available` are scheduled, except the summarizer: the
/// result never repeats a name and always ends with it.
pub fn select_initial_chain(goal: &str, available: &[String]) -> Vec<String> {
    let goal = goal.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| goal.contains(w));
    let mut chain: Vec<String> = BASE_CHAIN.iter().map(|s| s.to_string()).collect();

    if mentions(&["finance", "stock", "market", "investment"]) {
        insert_at(&mut chain, 0, "finance");
        insert_at(&mut chain, 3, "fact_check");
    }

    if mentions(&["weather", "temperature", "forecast", "climate"]) {
        insert_at(&mut chain, 0, "weather");
        insert_at(&mut chain, 1, "temperature");
        insert_at(&mut chain, 2, "air_quality");
        insert_at(&mut chain, 3, "weather_alerts");
    }

    if mentions(&["health", "medical", "disease", "hospital"]) {
        insert_at(&mut chain, 0, "health");
        if goal.contains("covid") {
            insert_at(&mut chain, 0, "covid");
        }
    }

    if mentions(&["spacex", "launch"]) {
        insert_at(&mut chain, 0, "spacex_next");
        insert_at(&mut chain, 1, "weather");
        insert_at(&mut chain, 2, "air_quality");
    }

    if mentions(&["analyze", "impact", "effect", "trend"]) {
        if !chain.iter().any(|a| a == "fact_check") {
            insert_at(&mut chain, 2, "fact_check");
        }
        insert_at(&mut chain, 3, "sentiment");
    }

    let mut seen = std::collections::HashSet::new();
    chain.retain(|name| seen.insert(name.clone()));
    chain.retain(|name| name != SUMMARIZER && available.contains(name));
    chain.push(SUMMARIZER.to_string());
    chain
}

/// `Vec::insert` with the index clamped to the length.
fn insert_at(chain: &mut Vec<String>, index: usize, name: &str) {
    let index = index.min(chain.len());
    chain.insert(index, name.to_string());
}
