//! ZOQL query text generation
//!
//! ZOQL is the SQL-flavored query language accepted by `query` and by export
//! jobs: `SELECT {select_list} FROM {object} WHERE {search_conditions}`.

use crate::types::ObjectType;

/// Boolean operator joining search conditions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogicalOperator {
    /// `AND`
    And,
    /// `OR` (default)
    #[default]
    Or,
}

impl LogicalOperator {
    /// ZOQL keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a select list from field names, always including `Id` exactly once
///
/// `Id` comes first, followed by the remaining fields in input order with
/// duplicates and blank names removed.
///
/// ```
/// use zuora_toolkit::query::generate_select_list;
///
/// assert_eq!(generate_select_list(&["Name", "Batch", "Name"]), "Id, Name, Batch");
/// ```
pub fn generate_select_list<S: AsRef<str>>(fields: &[S]) -> String {
    let mut selected: Vec<&str> = vec!["Id"];
    for field in fields {
        let field = field.as_ref().trim();
        if field.is_empty() || selected.iter().any(|s| s.eq_ignore_ascii_case(field)) {
            continue;
        }
        selected.push(field);
    }
    selected.join(", ")
}

/// Escape a value for use inside a single-quoted ZOQL literal
pub fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Search condition builder for a single field compared against many values
///
/// More complex conditions (several fields or mixed operators) should be
/// written by hand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConditions {
    /// Field compared against each value (default: "Id")
    pub field_name: String,
    /// Quote values as string literals (default: true)
    pub field_is_string: bool,
    /// Operator joining the comparisons (default: OR)
    pub operator: LogicalOperator,
}

impl Default for SearchConditions {
    fn default() -> Self {
        Self {
            field_name: "Id".to_string(),
            field_is_string: true,
            operator: LogicalOperator::Or,
        }
    }
}

impl SearchConditions {
    /// Conditions on a named field
    pub fn on(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    /// Compare values unquoted (numeric or boolean fields)
    pub fn unquoted(mut self) -> Self {
        self.field_is_string = false;
        self
    }

    /// Use a different joining operator
    pub fn operator(mut self, operator: LogicalOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Render `field='v1' OP field='v2' ...`; empty input renders an empty string
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        let separator = format!(" {} ", self.operator);
        values
            .iter()
            .map(|value| {
                let value = value.as_ref();
                if self.field_is_string {
                    format!("{}='{}'", self.field_name, escape_value(value))
                } else {
                    format!("{}={}", self.field_name, value)
                }
            })
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

/// `Id='a' OP Id='b' ...` for the given values
///
/// ```
/// use zuora_toolkit::query::{generate_search_conditions, LogicalOperator};
///
/// assert_eq!(
///     generate_search_conditions(&["a", "b"], LogicalOperator::Or),
///     "Id='a' OR Id='b'"
/// );
/// ```
pub fn generate_search_conditions<S: AsRef<str>>(values: &[S], operator: LogicalOperator) -> String {
    SearchConditions::default().operator(operator).render(values)
}

/// `SELECT {select_list} FROM {object}[ WHERE {conditions}]`
///
/// A blank `conditions` string selects every record.
pub fn select_statement(select_list: &str, object: &ObjectType, conditions: &str) -> String {
    let conditions = conditions.trim();
    if conditions.is_empty() {
        format!("SELECT {select_list} FROM {object}")
    } else {
        format!("SELECT {select_list} FROM {object} WHERE {conditions}")
    }
}
