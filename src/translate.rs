//! Translation of label selectors into NRQL `WHERE` fragments.

use crate::error::{AdapterError, AdapterResult};
use crate::selector::{Operator, Requirement, Selector};

/// Renders `selector` as a conjunction of NRQL conditions.
///
/// An absent or empty selector yields an empty string: no `where` keyword and
/// no clauses. The fragment never carries the `where` keyword itself.
pub fn to_where_fragment(selector: Option<&Selector>) -> AdapterResult<String> {
    let Some(selector) = selector else {
        return Ok(String::new());
    };

    let clauses = selector
        .iter()
        .map(render_requirement)
        .collect::<AdapterResult<Vec<_>>>()?;

    Ok(clauses.join(" and "))
}

fn render_requirement(requirement: &Requirement) -> AdapterResult<String> {
    let key = requirement.key();

    let clause = match requirement.operator() {
        Operator::Equals => format!("{key} = {}", single_value(requirement)?),
        Operator::NotEquals => format!("{key} != {}", single_value(requirement)?),
        Operator::GreaterThan => format!("{key} > {}", single_value(requirement)?),
        Operator::LessThan => format!("{key} < {}", single_value(requirement)?),
        Operator::Exists => format!("{key} IS NOT NULL"),
        Operator::DoesNotExist => format!("{key} IS NULL"),
        Operator::In => format!("{key} IN ({})", value_list(requirement)?),
        Operator::NotIn => format!("{key} NOT IN ({})", value_list(requirement)?),
    };

    Ok(clause)
}

fn single_value(requirement: &Requirement) -> AdapterResult<String> {
    match requirement.values() {
        [value] => Ok(render_literal(value)),
        values => Err(AdapterError::SelectorTranslation(format!(
            "operator {} on {:?} needs exactly one value, got {}",
            requirement.operator(),
            requirement.key(),
            values.len()
        ))),
    }
}

// Sorted by the raw literal text, not by numeric value.
fn value_list(requirement: &Requirement) -> AdapterResult<String> {
    if requirement.values().is_empty() {
        return Err(AdapterError::SelectorTranslation(format!(
            "operator {} on {:?} needs at least one value",
            requirement.operator(),
            requirement.key()
        )));
    }

    let mut values: Vec<&str> = requirement.values().iter().map(String::as_str).collect();
    values.sort_unstable();

    Ok(values
        .into_iter()
        .map(render_literal)
        .collect::<Vec<_>>()
        .join(", "))
}

/// Renders a value literal: numbers go out verbatim, everything else is
/// wrapped in single quotes.
pub fn render_literal(value: &str) -> String {
    if is_numeric_literal(value) {
        value.to_string()
    } else {
        format!("'{}'", escape_quoted(value))
    }
}

/// Whether `value` reads as a finite decimal integer or float.
///
/// `inf`, `NaN` and comma decimal separators are not numbers here.
pub fn is_numeric_literal(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
