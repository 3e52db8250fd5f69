//! Label selectors as handed over by the metrics API layer.
//!
//! A [`Selector`] is a flat conjunction of [`Requirement`]s. Requirements are
//! kept ordered by key so that iteration, and every query rendered from it,
//! is reproducible regardless of the order they were added in.

use crate::error::{AdapterError, AdapterResult};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
    GreaterThan,
    LessThan,
}

impl Operator {
    /// Wire token used by the Kubernetes selector representation.
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Exists => "exists",
            Operator::DoesNotExist => "!",
            Operator::GreaterThan => "gt",
            Operator::LessThan => "lt",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = AdapterError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "=" | "==" => Ok(Operator::Equals),
            "!=" => Ok(Operator::NotEquals),
            "in" => Ok(Operator::In),
            "notin" => Ok(Operator::NotIn),
            "exists" => Ok(Operator::Exists),
            "!" => Ok(Operator::DoesNotExist),
            "gt" => Ok(Operator::GreaterThan),
            "lt" => Ok(Operator::LessThan),
            other => Err(AdapterError::SelectorTranslation(format!(
                "unsupported operator {other:?}"
            ))),
        }
    }
}

/// A single `key <operator> values` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    /// Builds a requirement, checking that the number of values fits the operator.
    pub fn new<K, V>(key: K, operator: Operator, values: V) -> AdapterResult<Self>
    where
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let key = key.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        if !is_valid_key(&key) {
            return Err(AdapterError::SelectorTranslation(format!(
                "invalid label key {key:?}"
            )));
        }

        let arity_ok = match operator {
            Operator::Exists | Operator::DoesNotExist => values.is_empty(),
            Operator::Equals
            | Operator::NotEquals
            | Operator::GreaterThan
            | Operator::LessThan => values.len() == 1,
            Operator::In | Operator::NotIn => !values.is_empty(),
        };
        if !arity_ok {
            return Err(AdapterError::SelectorTranslation(format!(
                "operator {operator} on {key:?} does not accept {} value(s)",
                values.len()
            )));
        }

        Ok(Self { key, operator, values })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

// Label keys end up unquoted in the query text.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a requirement, keeping the collection ordered by key.
    ///
    /// Requirements sharing a key stay in insertion order.
    pub fn add(mut self, requirement: Requirement) -> Self {
        let pos = self
            .requirements
            .partition_point(|r| r.key.as_str() <= requirement.key.as_str());
        self.requirements.insert(pos, requirement);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter()
    }

    /// Key/value pairs pinned down by equality requirements.
    pub fn equality_labels(&self) -> BTreeMap<String, String> {
        self.requirements
            .iter()
            .filter(|r| r.operator == Operator::Equals)
            .filter_map(|r| r.values.first().map(|v| (r.key.clone(), v.clone())))
            .collect()
    }
}

impl FromIterator<Requirement> for Selector {
    fn from_iter<T: IntoIterator<Item = Requirement>>(iter: T) -> Self {
        iter.into_iter().fold(Selector::new(), Selector::add)
    }
}

/// Parses the textual Kubernetes label-selector syntax,
/// e.g. `app=web,tier in (a, b),!canary`.
impl FromStr for Selector {
    type Err = AdapterError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        split_top_level(text)?
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_requirement)
            .collect()
    }
}

fn invalid(text: &str, reason: &str) -> AdapterError {
    AdapterError::SelectorTranslation(format!("cannot parse requirement {text:?}: {reason}"))
}

// Splits on commas that are not inside a parenthesised value list.
fn split_top_level(text: &str) -> AdapterResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid(text, "unbalanced parentheses"))?;
            }
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid(text, "unbalanced parentheses"));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn parse_requirement(text: &str) -> AdapterResult<Requirement> {
    if let Some(open) = text.find('(') {
        let close = text
            .rfind(')')
            .filter(|&close| close > open && text[close + 1..].trim().is_empty())
            .ok_or_else(|| invalid(text, "value list must end the requirement"))?;

        let mut head = text[..open].split_whitespace();
        let (key, operator) = match (head.next(), head.next(), head.next()) {
            (Some(key), Some(op), None) => (key, op.parse::<Operator>()?),
            _ => return Err(invalid(text, "expected `<key> in (...)` or `<key> notin (...)`")),
        };
        if !matches!(operator, Operator::In | Operator::NotIn) {
            return Err(invalid(text, "only `in` and `notin` take a value list"));
        }

        let values = text[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty());
        return Requirement::new(key, operator, values);
    }

    for (token, operator) in [
        ("!=", Operator::NotEquals),
        ("==", Operator::Equals),
        ("=", Operator::Equals),
        (">", Operator::GreaterThan),
        ("<", Operator::LessThan),
    ] {
        if let Some((key, value)) = text.split_once(token) {
            return Requirement::new(key.trim(), operator, [value.trim()]);
        }
    }

    match text.strip_prefix('!') {
        Some(key) => Requirement::new(key.trim(), Operator::DoesNotExist, Vec::<String>::new()),
        None => Requirement::new(text, Operator::Exists, Vec::<String>::new()),
    }
}
