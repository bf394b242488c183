use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geocode;
use crate::model::Criterion;

/// Names of the key columns in the provider's export schema. Defaults match
/// the provider's standard column captions; overridable per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyColumns {
    pub id: String,
    pub city: String,
    pub country: String,
}

impl Default for KeyColumns {
    fn default() -> Self {
        Self {
            id: "BvD ID number".into(),
            city: "City".into(),
            country: "Country".into(),
        }
    }
}

/// A reference office before geocoding: the static (name, address) pair from
/// the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeConfig {
    pub name: String,
    pub address: String,
}

/// How the per-office filter expressions are written into the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaMode {
    /// Emit true dynamic-array formulas (the writer supports them natively).
    #[default]
    Live,
    /// Emit the expression as literal text; the analyst prepends `=` to
    /// activate it. Kept for compatibility with the historical round-trip
    /// where the writing library could not emit array formulas.
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Forward-geocoding endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable consulted for the API key when no --api-key flag
    /// is given. The credential itself never lives in the configuration file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    geocode::DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "GEOCODE_API_KEY".to_string()
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_data_sheet() -> String {
    "Data".to_string()
}

fn default_criteria_sheet() -> String {
    "Criteria".to_string()
}

/// Run configuration: offices, criteria, schema columns, and output options.
/// Loaded from a JSON file supplied on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub offices: Vec<OfficeConfig>,
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub columns: KeyColumns,
    /// Number of provider-added noise rows before the header row in each
    /// input file.
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default = "default_data_sheet")]
    pub data_sheet: String,
    #[serde(default = "default_criteria_sheet")]
    pub criteria_sheet: String,
    #[serde(default)]
    pub formula_mode: FormulaMode,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&source)?)
    }
}
