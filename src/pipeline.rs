use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument};

use crate::config::{OfficeConfig, RunConfig};
use crate::error::{ReachError, Result};
use crate::formula::{self, FormulaContext};
use crate::geocode::Geocoder;
use crate::io::excel_read;
use crate::io::excel_write::{self, OfficeSheet};
use crate::matrix;
use crate::model::{Dataset, Office};

/// Runs the whole generation pipeline: merge the provider exports, geocode,
/// compute distances, synthesize the per-office filter formulas, and write
/// the output workbook.
///
/// Geocoding failures for individual cities are tolerated (those rows keep
/// empty distances); everything else — unreadable inputs, divergent schemas,
/// unresolvable office addresses, absent bound columns — aborts the run
/// before any output is written.
#[instrument(level = "info", skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub fn generate(
    inputs: &[impl AsRef<Path>],
    output: &Path,
    config: &RunConfig,
    geocoder: &mut dyn Geocoder,
) -> Result<()> {
    let mut dataset = load_inputs(inputs, config)?;
    info!(
        rows = dataset.rows.len(),
        columns = dataset.columns.len(),
        "merged provider exports"
    );

    // Validate the rule shape before any network traffic.
    let rule = formula::default_rule(&config.criteria)?;

    let offices = resolve_offices(&config.offices, geocoder)?;
    let distance_matrix = matrix::build_matrix(&dataset, &config.columns, &offices, geocoder)?;
    matrix::attach_distances(&mut dataset, &config.columns, &offices, &distance_matrix)?;

    let ctx = FormulaContext {
        columns: &dataset.columns,
        row_count: dataset.rows.len(),
        data_sheet: &config.data_sheet,
        criteria_sheet: &config.criteria_sheet,
    };
    let office_sheets: Vec<OfficeSheet> = offices
        .iter()
        .map(|office| {
            Ok(OfficeSheet {
                name: office.name.clone(),
                header_reference: formula::header_reference(&ctx),
                filter_formula: formula::synthesize_filter(office, &config.criteria, &rule, &ctx)?,
            })
        })
        .collect::<Result<_>>()?;

    excel_write::write_workbook(output, &dataset, &config.criteria, &office_sheets, config)?;
    info!(offices = offices.len(), "workbook generated");
    Ok(())
}

fn load_inputs(inputs: &[impl AsRef<Path>], config: &RunConfig) -> Result<Dataset> {
    let parts = inputs
        .iter()
        .map(|input| excel_read::read_dataset(input.as_ref(), config.skip_rows))
        .collect::<Result<Vec<_>>>()?;
    let dataset = excel_read::merge_datasets(parts)?;
    validate_identifiers(&dataset, &config.columns.id)?;
    Ok(dataset)
}

/// The company identifier must be unique across the merged dataset; a
/// duplicate means overlapping exports and would double-count rows in every
/// office view.
fn validate_identifiers(dataset: &Dataset, id_column: &str) -> Result<()> {
    let id_idx = dataset.require_column(id_column)?;
    let mut seen = HashSet::new();
    for row in 0..dataset.rows.len() {
        let id = dataset.text_at(row, id_idx);
        if !id.is_empty() && !seen.insert(id.clone()) {
            return Err(ReachError::InvalidWorkbook(format!(
                "duplicate company identifier '{id}' in merged dataset"
            )));
        }
    }
    Ok(())
}

/// Geocodes the configured office addresses. Offices are the fixed reference
/// points of every distance column and formula, so an unresolvable office
/// address is fatal, unlike a company city.
#[instrument(level = "info", skip_all, fields(offices = configs.len()))]
fn resolve_offices(configs: &[OfficeConfig], geocoder: &mut dyn Geocoder) -> Result<Vec<Office>> {
    if configs.is_empty() {
        return Err(ReachError::InvalidConfig("no offices configured".into()));
    }
    configs
        .iter()
        .map(|config| {
            let location = geocoder.resolve(&config.address)?;
            Ok(Office {
                name: config.name.clone(),
                address: config.address.clone(),
                location,
            })
        })
        .collect()
}
