//! Disease profiles and the random patient selection.
//!
//! A [`DiseaseContext`] grounds every reply the simulated patient gives. The
//! [`ProfileSelector`] draws one context uniformly from a catalog at session
//! start; the catalog itself comes either from [`default_catalog`] or from a
//! JSON file loaded with [`load_catalog`].

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SimError;

/// Descriptive record for one simulated condition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiseaseContext {
    pub disease: String,
    pub symptoms: Vec<String>,
    pub background_info: String,
}

impl DiseaseContext {
    pub fn new(
        disease: impl Into<String>,
        symptoms: impl IntoIterator<Item = impl Into<String>>,
        background_info: impl Into<String>,
    ) -> Self {
        Self {
            disease: disease.into(),
            symptoms: symptoms.into_iter().map(Into::into).collect(),
            background_info: background_info.into(),
        }
    }

    /// Symptoms joined the way they appear in prompts.
    pub fn symptom_list(&self) -> String {
        self.symptoms.join(", ")
    }
}

/// The catalog shipped with the binary.
pub fn default_catalog() -> Vec<DiseaseContext> {
    vec![
        DiseaseContext::new(
            "Migraine",
            ["headache", "nausea", "sensitivity to light"],
            "Patient has a history of migraines occurring at least once a month.",
        ),
        DiseaseContext::new(
            "Type 2 Diabetes",
            ["frequent urination", "increased thirst", "fatigue"],
            "Patient was diagnosed with diabetes 3 years ago and is on medication.",
        ),
    ]
}

/// Load a catalog from a JSON array of disease contexts.
///
/// The catalog is validated before it is returned: it must be non-empty and
/// every entry needs a non-blank disease name.
pub fn load_catalog(path: &Path) -> Result<Vec<DiseaseContext>, SimError> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        SimError::configuration(format!(
            "failed to read disease catalog '{}': {e}",
            path.display()
        ))
    })?;
    let catalog: Vec<DiseaseContext> = serde_json::from_str(&data).map_err(|e| {
        SimError::configuration(format!(
            "failed to parse disease catalog '{}': {e}",
            path.display()
        ))
    })?;
    validate_catalog(&catalog)?;
    debug!(
        "Loaded {} disease context(s) from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

/// Reject catalogs a session could not start from.
pub fn validate_catalog(catalog: &[DiseaseContext]) -> Result<(), SimError> {
    if catalog.is_empty() {
        return Err(SimError::configuration("disease catalog is empty"));
    }
    if let Some(idx) = catalog.iter().position(|c| c.disease.trim().is_empty()) {
        return Err(SimError::configuration(format!(
            "disease catalog entry {idx} has no disease name"
        )));
    }
    Ok(())
}

/// Draws the patient's condition for a session.
pub struct ProfileSelector {
    catalog: Vec<DiseaseContext>,
    rng: StdRng,
}

impl ProfileSelector {
    /// Selector seeded from the OS entropy source.
    pub fn new(catalog: Vec<DiseaseContext>) -> Self {
        Self {
            catalog,
            rng: StdRng::from_entropy(),
        }
    }

    /// Selector with a fixed seed, for reproducible sessions.
    pub fn with_seed(catalog: Vec<DiseaseContext>, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick one context uniformly at random.
    pub fn select(&mut self) -> Result<DiseaseContext, SimError> {
        let profile = self
            .catalog
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| SimError::configuration("disease catalog is empty"))?;
        info!("Patient profile initialized: {}", profile.disease);
        Ok(profile)
    }
}
