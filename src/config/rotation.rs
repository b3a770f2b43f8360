//! Status rotation from `status_selection.json`.
//!
//! Two shapes are in the wild: numeric-keyed (`{"1": "burn", "2": "poise"}`)
//! and listed (`{"selected_statuses": ["burn", "poise"]}`). Both normalize to
//! one ordered list, which is then repeated to cover every run of a session.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::status::Status;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Shape {
    Listed { selected_statuses: Vec<String> },
    Bare(Vec<String>),
    Keyed(#[serde(with = "numeric_keys")] BTreeMap<u32, String>),
}

// JSON object keys are strings; keep only the ones that are numbers, in numeric order.
mod numeric_keys {
    use serde::{Deserialize, Deserializer};
    use std::collections::{BTreeMap, HashMap};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u32, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string_map: HashMap<String, serde_json::Value> = HashMap::deserialize(deserializer)?;
        let mut result = BTreeMap::new();
        for (k, v) in string_map {
            if let (Ok(num), Some(s)) = (k.trim().parse::<u32>(), v.as_str()) {
                result.insert(num, s.to_string());
            }
        }
        Ok(result)
    }
}

/// Ordered, lowercased statuses. Unknown names are skipped with a warning;
/// an unreadable or empty document yields `[poise]`.
pub fn normalize(doc: &serde_json::Value) -> Vec<Status> {
    let names = match Shape::deserialize(doc) {
        Ok(Shape::Listed { selected_statuses }) => selected_statuses,
        Ok(Shape::Bare(list)) => list,
        Ok(Shape::Keyed(map)) => map.into_values().collect(),
        Err(e) => {
            warn!(error = %e, "unreadable status rotation, using poise");
            Vec::new()
        }
    };

    let statuses: Vec<Status> = names
        .iter()
        .filter_map(|name| match name.parse::<Status>() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("{}; skipped in rotation", e);
                None
            }
        })
        .collect();

    if statuses.is_empty() {
        vec![Status::Poise]
    } else {
        statuses
    }
}

/// Repeat `rotation` to exactly `runs` entries: run `i` uses `rotation[i mod len]`.
pub fn expand(rotation: &[Status], runs: usize) -> Vec<Status> {
    if rotation.is_empty() {
        return vec![Status::Poise; runs];
    }
    (0..runs).map(|i| rotation[i % rotation.len()]).collect()
}
