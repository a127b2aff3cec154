use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::models::normalize_field;
use crate::error::{PriceError, Result};

/// Static district -> state reference table
#[derive(Debug, Default, Clone)]
pub struct DistrictRegistry {
    district_to_state: HashMap<String, String>,
}

impl DistrictRegistry {
    /// Load `{"pune": "maharashtra", ...}`. A missing file leaves the registry empty,
    /// which also leaves the refresh scheduler with nothing to do.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("District map '{}' not found, state inference disabled", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| PriceError::Dataset(format!("Failed to read '{}': {}", path.display(), e)))?;
        let map: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| PriceError::Dataset(format!("Failed to parse '{}': {}", path.display(), e)))?;

        let registry = Self::from_pairs(map);
        tracing::info!("Loaded {} districts across {} states", registry.len(), registry.states().len());
        Ok(registry)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            district_to_state: pairs
                .into_iter()
                .map(|(district, state)| (normalize_field(district.as_ref()), normalize_field(state.as_ref())))
                .collect(),
        }
    }

    pub fn find_state(&self, district: &str) -> Option<&str> {
        let state = self.district_to_state.get(&normalize_field(district)).map(String::as_str);
        match state {
            Some(state) => tracing::debug!("Found state '{}' for district '{}'", state, district),
            None => tracing::warn!("Could not find a state for district '{}'", district),
        }
        state
    }

    /// Every known state, sorted and unique
    pub fn states(&self) -> Vec<String> {
        self.district_to_state
            .values()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.district_to_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.district_to_state.is_empty()
    }
}
