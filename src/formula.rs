use crate::columns::{column_letters, column_reference};
use crate::error::{ReachError, Result};
use crate::model::{Criterion, CriterionKind, Office};

/// Everything the synthesizer needs to know about the generated raw-data
/// sheet: its column ordering, how many data rows it holds, and the sheet
/// names formulas must reference.
pub struct FormulaContext<'a> {
    pub columns: &'a [String],
    pub row_count: usize,
    pub data_sheet: &'a str,
    pub criteria_sheet: &'a str,
}

/// Boolean qualification rule over criteria, held as data rather than code so
/// a different criteria shape means supplying a different tree, not rewriting
/// the synthesizer. Leaves index into the criteria list.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    And(Box<Rule>, Box<Rule>),
    Or(Box<Rule>, Box<Rule>),
    Criterion(usize),
}

impl Rule {
    fn and(lhs: Rule, rhs: Rule) -> Rule {
        Rule::And(Box::new(lhs), Box::new(rhs))
    }

    fn or(lhs: Rule, rhs: Rule) -> Rule {
        Rule::Or(Box::new(lhs), Box::new(rhs))
    }

    /// "At least 2 of 3": with criteria a, b, c in source order this is
    /// `(a AND (b OR c)) OR (b AND c)`.
    pub fn two_of_three(a: usize, b: usize, c: usize) -> Rule {
        Rule::or(
            Rule::and(Rule::Criterion(a), Rule::or(Rule::Criterion(b), Rule::Criterion(c))),
            Rule::and(Rule::Criterion(b), Rule::Criterion(c)),
        )
    }
}

/// Builds the shipped qualification rule: at least 2 of the 3 threshold
/// criteria, in their source order. The rule deliberately requires exactly
/// three threshold criteria plus one distance criterion; a different shape is
/// a configuration change that must come with its own rule tree, so anything
/// else is rejected here rather than silently generalized.
pub fn default_rule(criteria: &[Criterion]) -> Result<Rule> {
    let thresholds: Vec<usize> = criteria
        .iter()
        .enumerate()
        .filter(|(_, criterion)| !criterion.is_distance())
        .map(|(index, _)| index)
        .collect();
    let distances = criteria.iter().filter(|criterion| criterion.is_distance()).count();

    if thresholds.len() != 3 || distances != 1 {
        return Err(ReachError::InvalidConfig(format!(
            "the default qualification rule needs exactly 3 threshold criteria and 1 distance \
             criterion, found {} and {}",
            thresholds.len(),
            distances
        )));
    }

    Ok(Rule::two_of_three(thresholds[0], thresholds[1], thresholds[2]))
}

fn sheet_ref(name: &str) -> String {
    let plain = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Cell holding the criterion's editable threshold: column B of the criteria
/// sheet, row = the criterion's 1-based position in the criteria list.
fn threshold_cell(ctx: &FormulaContext<'_>, criterion_index: usize) -> String {
    format!("{}!$B${}", sheet_ref(ctx.criteria_sheet), criterion_index + 1)
}

/// Column range covering the data rows (rows 2..row_count+1; row 1 holds
/// headers) of the named dataset column.
fn data_range(ctx: &FormulaContext<'_>, column: &str) -> Result<String> {
    let letters = column_reference(column, ctx.columns)?;
    Ok(format!(
        "{sheet}!{letters}2:{letters}{last}",
        sheet = sheet_ref(ctx.data_sheet),
        last = ctx.row_count + 1,
    ))
}

fn render_threshold_leaf(
    ctx: &FormulaContext<'_>,
    criteria: &[Criterion],
    index: usize,
) -> Result<String> {
    let criterion = criteria.get(index).ok_or_else(|| {
        ReachError::InvalidConfig(format!("qualification rule references criterion {index}"))
    })?;
    let CriterionKind::Threshold { column } = &criterion.kind else {
        return Err(ReachError::InvalidConfig(format!(
            "qualification rule leaf '{}' is not a threshold criterion",
            criterion.name
        )));
    };
    Ok(format!("({}>={})", data_range(ctx, column)?, threshold_cell(ctx, index)))
}

/// Renders the rule as array arithmetic: `*` stands in for AND and `+` for
/// OR, so the result is a boolean column vector usable inside an array
/// filter rather than a scalar.
fn render_rule(rule: &Rule, ctx: &FormulaContext<'_>, criteria: &[Criterion]) -> Result<String> {
    Ok(match rule {
        Rule::And(lhs, rhs) => format!(
            "({}*{})",
            render_rule(lhs, ctx, criteria)?,
            render_rule(rhs, ctx, criteria)?
        ),
        Rule::Or(lhs, rhs) => format!(
            "({}+{})",
            render_rule(lhs, ctx, criteria)?,
            render_rule(rhs, ctx, criteria)?
        ),
        Rule::Criterion(index) => render_threshold_leaf(ctx, criteria, *index)?,
    })
}

/// Distance gate for one office: below the distance threshold AND above
/// zero. The `>0` clause is load-bearing — spreadsheets compare empty cells
/// as below zero, so without it a row with no distance data would pass a
/// naive "< threshold" test.
fn render_distance_gate(
    ctx: &FormulaContext<'_>,
    criteria: &[Criterion],
    office: &Office,
) -> Result<String> {
    let index = criteria
        .iter()
        .position(Criterion::is_distance)
        .ok_or_else(|| ReachError::InvalidConfig("no distance criterion configured".into()))?;
    let range = data_range(ctx, &format!("distance to {}", office.name))?;
    Ok(format!(
        "(({range}<{cell})*({range}>0))",
        cell = threshold_cell(ctx, index),
    ))
}

/// Synthesizes the array-filter expression for one office sheet: the
/// full-width data range filtered by the qualification rule AND the office's
/// distance gate. A criterion bound to a column absent from the dataset
/// aborts generation here rather than emitting a silently wrong formula.
pub fn synthesize_filter(
    office: &Office,
    criteria: &[Criterion],
    rule: &Rule,
    ctx: &FormulaContext<'_>,
) -> Result<String> {
    let selector = format!(
        "({}*{})",
        render_rule(rule, ctx, criteria)?,
        render_distance_gate(ctx, criteria, office)?
    );
    let last_column = column_letters(ctx.columns.len());
    Ok(format!(
        "FILTER({sheet}!A2:{last_column}{last_row},{selector})",
        sheet = sheet_ref(ctx.data_sheet),
        last_row = ctx.row_count + 1,
    ))
}

/// Reference to the raw-data sheet's header row, placed in A1 of each office
/// sheet so the filtered view keeps its column captions.
pub fn header_reference(ctx: &FormulaContext<'_>) -> String {
    format!(
        "{sheet}!A1:{last_column}1",
        sheet = sheet_ref(ctx.data_sheet),
        last_column = column_letters(ctx.columns.len()),
    )
}
