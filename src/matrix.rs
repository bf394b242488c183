use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, instrument, warn};

use crate::config::KeyColumns;
use crate::distance::distance_km;
use crate::error::{ReachError, Result};
use crate::geocode::Geocoder;
use crate::model::{CellValue, Dataset, Office};

/// Sentinel the provider export uses for rows without a usable city.
pub const MISSING_MARKER: &str = "missing";

/// Combined lookup key for a city. City names repeat across countries, so
/// uniqueness is on the "city, country" pair, never the city alone.
pub fn location_key(city: &str, country: &str) -> String {
    if country.is_empty() {
        city.to_string()
    } else {
        format!("{city}, {country}")
    }
}

/// Per-city, per-office distance table. Built once per run and discarded
/// after the distances are joined back onto the dataset.
#[derive(Debug, Default, PartialEq)]
pub struct DistanceMatrix {
    entries: BTreeMap<String, BTreeMap<String, u32>>,
}

impl DistanceMatrix {
    pub fn distance(&self, key: &str, office: &str) -> Option<u32> {
        self.entries.get(key).and_then(|per_office| per_office.get(office)).copied()
    }

    /// Number of successfully resolved location keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn row_key(dataset: &Dataset, row: usize, city_idx: usize, country_idx: usize) -> Option<String> {
    let city = dataset.text_at(row, city_idx);
    if city.is_empty() || city.eq_ignore_ascii_case(MISSING_MARKER) {
        return None;
    }
    Some(location_key(&city, &dataset.text_at(row, country_idx)))
}

/// Resolves every distinct (city, country) pair in the dataset and computes
/// its distance to each office.
///
/// A lookup failure (no match, transport error) is logged and skipped; the
/// affected key simply stays out of the matrix and its rows later receive no
/// distance values. Anything else aborts the run.
#[instrument(level = "info", skip_all, fields(offices = offices.len()))]
pub fn build_matrix(
    dataset: &Dataset,
    columns: &KeyColumns,
    offices: &[Office],
    geocoder: &mut dyn Geocoder,
) -> Result<DistanceMatrix> {
    let city_idx = dataset.require_column(&columns.city)?;
    let country_idx = dataset.require_column(&columns.country)?;

    let mut keys = BTreeSet::new();
    for row in 0..dataset.rows.len() {
        if let Some(key) = row_key(dataset, row, city_idx, country_idx) {
            keys.insert(key);
        }
    }
    let requested = keys.len();

    let mut matrix = DistanceMatrix::default();
    for key in keys {
        let location = match geocoder.resolve(&key) {
            Ok(location) => location,
            Err(ReachError::LocationNotFound(place)) => {
                warn!(location = %place, "geocoder returned no match; rows keep empty distances");
                continue;
            }
            Err(ReachError::Http(error)) => {
                warn!(location = %key, %error, "geocoding call failed; rows keep empty distances");
                continue;
            }
            Err(other) => return Err(other),
        };

        let mut per_office = BTreeMap::new();
        for office in offices {
            per_office.insert(office.name.clone(), distance_km(location, office.location)?);
        }
        matrix.entries.insert(key, per_office);
    }

    info!(requested, resolved = matrix.len(), "distance matrix built");
    Ok(matrix)
}

/// Joins the matrix back onto the dataset: one `distance to <office>` column
/// per office, each row carrying its own copy of its city's values. Rows with
/// a missing city or a failed lookup get empty cells.
pub fn attach_distances(
    dataset: &mut Dataset,
    columns: &KeyColumns,
    offices: &[Office],
    matrix: &DistanceMatrix,
) -> Result<()> {
    let city_idx = dataset.require_column(&columns.city)?;
    let country_idx = dataset.require_column(&columns.country)?;

    for office in offices {
        let values: Vec<CellValue> = (0..dataset.rows.len())
            .map(|row| {
                row_key(dataset, row, city_idx, country_idx)
                    .and_then(|key| matrix.distance(&key, &office.name))
                    .map(|km| CellValue::Number(km as f64))
                    .unwrap_or(CellValue::Empty)
            })
            .collect();
        dataset.push_column(format!("distance to {}", office.name), values);
    }

    Ok(())
}
