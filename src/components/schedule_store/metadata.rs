use serde_json::{Map, Value};

/// Key under which the completion flag is kept in event metadata
pub const COMPLETED_KEY: &str = "completed";

/// Outcome of merging incoming metadata into an event
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataMerge {
    /// Nothing was provided; keep whatever the event has
    Unchanged,
    /// New metadata; `None` when the merge left the map empty
    Merged(Option<Map<String, Value>>),
}

impl MetadataMerge {
    /// Resolve against the current value
    pub fn resolve(self, existing: Option<Map<String, Value>>) -> Option<Map<String, Value>> {
        match self {
            MetadataMerge::Unchanged => existing,
            MetadataMerge::Merged(merged) => merged,
        }
    }
}

/// Shallow key-wise merge; incoming keys win on conflict
pub fn merge_metadata(
    existing: Option<&Map<String, Value>>,
    incoming: Option<&Map<String, Value>>,
    completed: Option<bool>,
) -> MetadataMerge {
    if incoming.is_none() && completed.is_none() {
        return MetadataMerge::Unchanged;
    }

    let mut next = existing.cloned().unwrap_or_default();
    if let Some(incoming) = incoming {
        for (key, value) in incoming {
            next.insert(key.clone(), value.clone());
        }
    }
    if let Some(completed) = completed {
        next.insert(COMPLETED_KEY.to_string(), Value::Bool(completed));
    }

    if next.is_empty() {
        MetadataMerge::Merged(None)
    } else {
        MetadataMerge::Merged(Some(next))
    }
}
