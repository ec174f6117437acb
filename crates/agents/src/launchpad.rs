//! Launchpad side fetch: resolves a launch's `launchpad` id into a location.

use async_trait::async_trait;
use fieldnote_core::agent::SideFetch;
use fieldnote_core::error::AgentError;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::http;

pub struct LaunchpadLookup {
    base_url: String,
    client: reqwest::Client,
}

impl LaunchpadLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client: http::build_client(timeout),
        }
    }
}

/// Derive the injected fields from a launchpad document.
///
/// `locality` becomes `launch_location`; `lat`/`lon` are only set when both
/// coordinates are present.
pub fn launchpad_fields(pad: &Value) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(locality) = pad.get("locality").filter(|v| is_present(v)) {
        fields.insert("launch_location".into(), locality.clone());
    }
    let lat = pad.get("latitude").filter(|v| is_present(v));
    let lon = pad.get("longitude").filter(|v| is_present(v));
    if let (Some(lat), Some(lon)) = (lat, lon) {
        fields.insert("lat".into(), lat.clone());
        fields.insert("lon".into(), lon.clone());
    }
    fields
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[async_trait]
impl SideFetch for LaunchpadLookup {
    fn name(&self) -> &str {
        "launchpad"
    }

    async fn fetch(&self, id: &Value) -> Result<Map<String, Value>, AgentError> {
        let id = id
            .as_str()
            .ok_or_else(|| AgentError::InvalidResponse(format!("launchpad id is not a string: {id}")))?;
        let url = http::with_segment(&self.base_url, id)?;
        let pad = http::get_json(&self.client, "launchpad", url, &[]).await?;
        Ok(launchpad_fields(&pad))
    }
}
