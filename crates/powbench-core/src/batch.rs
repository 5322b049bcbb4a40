//! Batch request types shared by the engine and the gateway.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hash iterations the processor performs per difficulty cycle.
pub const ITERATIONS_PER_CYCLE: u64 = 50_000;

/// Hash algorithm the remote processor should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    #[serde(rename = "sha3_256")]
    Sha3_256,
    #[serde(rename = "sha3_512")]
    Sha3_512,
    Blake2b,
}

impl HashAlgorithm {
    pub fn all() -> &'static [HashAlgorithm] {
        &[
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha512,
            HashAlgorithm::Sha3_256,
            HashAlgorithm::Sha3_512,
            HashAlgorithm::Blake2b,
        ]
    }

    /// Wire name, as the backend expects it.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha3_256 => "sha3_256",
            HashAlgorithm::Sha3_512 => "sha3_512",
            HashAlgorithm::Blake2b => "blake2b",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha512 => "SHA-512",
            HashAlgorithm::Sha3_256 => "SHA3-256",
            HashAlgorithm::Sha3_512 => "SHA3-512",
            HashAlgorithm::Blake2b => "BLAKE2b",
        }
    }

    /// Resolve a name, falling back to the default for anything unknown.
    pub fn normalize(name: &str) -> Self {
        let name = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Clamp a user-supplied difficulty to the minimum of one cycle.
pub fn normalize_difficulty(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}

/// One unit of work: its 1-based position in the batch and its seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub cycle: u32,
    pub seed: String,
}

/// Payload shared by the sequential and async submit operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub seeds: Vec<String>,
    pub difficulty: u32,
    pub algorithm: HashAlgorithm,
}

impl BatchRequest {
    pub fn new(seeds: Vec<String>, difficulty: i64, algorithm: HashAlgorithm) -> Result<Self> {
        if seeds.is_empty() {
            return Err(Error::InvalidBatch("batch contains no seeds".into()));
        }
        Ok(Self {
            seeds,
            difficulty: normalize_difficulty(difficulty),
            algorithm,
        })
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Work items numbered 1..=N in submission order.
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.seeds
            .iter()
            .enumerate()
            .map(|(i, seed)| WorkItem {
                cycle: i as u32 + 1,
                seed: seed.clone(),
            })
            .collect()
    }

    /// Total hash iterations each item costs the processor.
    pub fn total_iterations(&self) -> u64 {
        self.difficulty as u64 * ITERATIONS_PER_CYCLE
    }
}
