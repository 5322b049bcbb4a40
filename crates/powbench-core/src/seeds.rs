//! Work item generation: synthesized or user-supplied seeds.

use serde::{Deserialize, Serialize};

/// Where a batch's seeds come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum SeedSource {
    /// Synthesize `count` unique seeds.
    Auto { count: usize },
    /// Use the given seeds verbatim after trimming; blanks are dropped.
    Manual { seeds: Vec<String> },
}

impl SeedSource {
    /// Produce the ordered seed list for a batch.
    pub fn generate(&self) -> Vec<String> {
        match self {
            SeedSource::Auto { count } => {
                let timestamp = chrono::Utc::now().timestamp_millis();
                (0..*count)
                    .map(|index| {
                        let random = uuid::Uuid::new_v4().simple().to_string();
                        format!("seed-{}-{}-{}", timestamp, index, &random[..7])
                    })
                    .collect()
            }
            SeedSource::Manual { seeds } => seeds
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}
