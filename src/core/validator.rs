//! Row validation against a [`Schema`]. Produces a [`ValidationReport`] with
//! per-field error groups and exemplar rows; any error across any row marks
//! the whole file invalid.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::core::schema::{Conditional, FieldKind, Schema};
use crate::domain::model::RawRecord;

const EXAMPLE_ROWS_PER_GROUP: usize = 5;
const SUGGESTION_MAX_DISTANCE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingRequired,
    TypeMismatch,
    PatternMismatch,
    ConditionalRequired,
    UnknownField,
    LengthOutOfRange,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingRequired => "missing_required",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::PatternMismatch => "pattern_mismatch",
            ErrorKind::ConditionalRequired => "conditional_required",
            ErrorKind::UnknownField => "unknown_field",
            ErrorKind::LengthOutOfRange => "length_out_of_range",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding for one field on one row.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// One finding from a value-level check, before row/field context is known.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl CheckFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Value-level checking capability shared by every field kind.
pub trait ValueCheck {
    /// Checks one non-empty raw value. `description` makes pattern failures
    /// self-explanatory when the rule carries one.
    fn check(&self, raw: &str, description: Option<&str>) -> Vec<CheckFailure>;
}

impl ValueCheck for FieldKind {
    fn check(&self, raw: &str, description: Option<&str>) -> Vec<CheckFailure> {
        let mut failures = Vec::new();
        match self {
            FieldKind::String {
                pattern,
                min_length,
                max_length,
            } => {
                let length = raw.chars().count();
                if let Some(min) = min_length {
                    if length < *min {
                        failures.push(CheckFailure::new(
                            ErrorKind::LengthOutOfRange,
                            format!("minimum length is {min} characters"),
                        ));
                    }
                }
                if let Some(max) = max_length {
                    if length > *max {
                        failures.push(CheckFailure::new(
                            ErrorKind::LengthOutOfRange,
                            format!("maximum length is {max} characters"),
                        ));
                    }
                }
                if let Some(pattern) = pattern {
                    if !pattern.is_match(raw) {
                        failures.push(CheckFailure::new(
                            ErrorKind::PatternMismatch,
                            description.unwrap_or("invalid format"),
                        ));
                    }
                }
            }
            FieldKind::Integer { min, max } => match raw.parse::<i64>() {
                Err(_) => failures.push(CheckFailure::new(
                    ErrorKind::TypeMismatch,
                    "must be a valid integer",
                )),
                Ok(value) => {
                    if let Some(min) = min {
                        if value < *min {
                            failures.push(CheckFailure::new(
                                ErrorKind::LengthOutOfRange,
                                format!("minimum value is {min}"),
                            ));
                        }
                    }
                    if let Some(max) = max {
                        if value > *max {
                            failures.push(CheckFailure::new(
                                ErrorKind::LengthOutOfRange,
                                format!("maximum value is {max}"),
                            ));
                        }
                    }
                }
            },
            FieldKind::Boolean => {
                let token = raw.to_ascii_lowercase();
                if !matches!(token.as_str(), "true" | "false" | "yes" | "no") {
                    failures.push(CheckFailure::new(
                        ErrorKind::TypeMismatch,
                        "must be one of: true, false, yes, no",
                    ));
                }
            }
            FieldKind::Enum { values } => {
                if !values.iter().any(|v| v == raw) {
                    failures.push(CheckFailure::new(
                        ErrorKind::TypeMismatch,
                        format!("must be one of: {}", values.join(", ")),
                    ));
                }
            }
            FieldKind::Array {
                delimiter,
                item_pattern,
                allowed,
            } => {
                for item in delimiter.split(raw) {
                    if let Some(pattern) = item_pattern {
                        if !pattern.is_match(&item) {
                            failures.push(CheckFailure::new(
                                ErrorKind::PatternMismatch,
                                format!(
                                    "item '{item}': {}",
                                    description.unwrap_or("invalid format")
                                ),
                            ));
                        }
                    }
                    if let Some(allowed) = allowed {
                        if !allowed.iter().any(|v| *v == item) {
                            failures.push(CheckFailure::new(
                                ErrorKind::TypeMismatch,
                                format!("item '{item}' must be one of: {}", allowed.join(", ")),
                            ));
                        }
                    }
                }
            }
        }
        failures
    }
}

/// Errors grouped by (field, message) with occurrence count and up to five
/// example rows, for the exemplar-bearing report.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorGroup {
    pub field: String,
    pub message: String,
    pub count: usize,
    pub rows: Vec<usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub total_rows: usize,
    pub invalid_rows: usize,
}

impl ValidationReport {
    /// File-level gate: any error anywhere makes the whole file invalid.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn valid_rows(&self) -> usize {
        self.total_rows - self.invalid_rows
    }

    pub fn groups(&self) -> Vec<ErrorGroup> {
        let mut groups: Vec<ErrorGroup> = Vec::new();
        for error in &self.errors {
            match groups
                .iter_mut()
                .find(|g| g.field == error.field && g.message == error.message)
            {
                Some(group) => {
                    group.count += 1;
                    if group.rows.len() < EXAMPLE_ROWS_PER_GROUP && !group.rows.contains(&error.row)
                    {
                        group.rows.push(error.row);
                    }
                }
                None => groups.push(ErrorGroup {
                    field: error.field.clone(),
                    message: error.message.clone(),
                    count: 1,
                    rows: vec![error.row],
                }),
            }
        }
        groups
    }

    pub fn render(&self) -> String {
        let bar = "=".repeat(80);
        let mut out = String::new();
        out.push_str(&bar);
        out.push('\n');
        if self.is_valid() {
            out.push_str("✅ VALIDATION PASSED\n");
            out.push_str(&format!("Total rows: {}\n", self.total_rows));
            out.push_str(&format!("Valid rows: {}\n", self.valid_rows()));
        } else {
            out.push_str("❌ VALIDATION FAILED\n");
            out.push_str(&format!("Total rows:   {}\n", self.total_rows));
            out.push_str(&format!("Valid rows:   {}\n", self.valid_rows()));
            out.push_str(&format!("Invalid rows: {}\n", self.invalid_rows));
            out.push_str("\nError summary:\n");
            for group in self.groups() {
                let rows: Vec<String> = group.rows.iter().map(usize::to_string).collect();
                let suffix = if group.count > group.rows.len() {
                    ", ..."
                } else {
                    ""
                };
                out.push_str(&format!(
                    "  • {} × {}: {} (rows {}{})\n",
                    group.count,
                    group.field,
                    group.message,
                    rows.join(", "),
                    suffix
                ));
            }
            out.push_str("\nFix all errors before conversion can proceed.\n");
        }
        out.push_str(&bar);
        out
    }
}

/// Stateless, reentrant row validator over a schema reference.
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn validate(&self, records: &[RawRecord]) -> ValidationReport {
        let mut errors = Vec::new();
        let mut invalid_rows = HashSet::new();
        let mut reported_headers: HashSet<String> = HashSet::new();

        for record in records {
            let before = errors.len();
            self.check_headers(record, &mut reported_headers, &mut errors);
            self.check_row(record, &mut errors);
            if errors.len() > before {
                invalid_rows.insert(record.row());
            }
        }

        ValidationReport {
            errors,
            total_rows: records.len(),
            invalid_rows: invalid_rows.len(),
        }
    }

    /// Unknown headers are reported once per file, at their first occurrence,
    /// with a closest-match suggestion when one exists.
    fn check_headers(
        &self,
        record: &RawRecord,
        reported: &mut HashSet<String>,
        errors: &mut Vec<ValidationError>,
    ) {
        for header in record.headers() {
            if header.is_empty() || self.schema.contains(header) || reported.contains(header) {
                continue;
            }
            reported.insert(header.to_string());
            let message = match self.suggest(header) {
                Some(candidate) => {
                    format!("unknown header (did you mean '{candidate}'?)")
                }
                None => "unknown header".to_string(),
            };
            errors.push(ValidationError {
                row: record.row(),
                field: header.to_string(),
                kind: ErrorKind::UnknownField,
                message,
            });
        }
    }

    fn check_row(&self, record: &RawRecord, errors: &mut Vec<ValidationError>) {
        for rule in self.schema.rules() {
            let value = record.get(&rule.path).unwrap_or("").trim();

            // A triggered conditional on an empty field suppresses the
            // remaining checks for this field on this row.
            if value.is_empty() {
                if let Some(conditional) = &rule.conditional {
                    if let Some(message) = self.conditional_demand(conditional, record) {
                        errors.push(ValidationError {
                            row: record.row(),
                            field: rule.path.clone(),
                            kind: ErrorKind::ConditionalRequired,
                            message,
                        });
                        continue;
                    }
                }
                if rule.required {
                    errors.push(ValidationError {
                        row: record.row(),
                        field: rule.path.clone(),
                        kind: ErrorKind::MissingRequired,
                        message: "field is required".to_string(),
                    });
                }
                continue;
            }

            for failure in rule.kind.check(value, rule.description.as_deref()) {
                errors.push(ValidationError {
                    row: record.row(),
                    field: rule.path.clone(),
                    kind: failure.kind,
                    message: failure.message,
                });
            }
        }
    }

    /// Returns the error message when the conditional demands a value for
    /// the current row, None otherwise.
    fn conditional_demand(&self, conditional: &Conditional, record: &RawRecord) -> Option<String> {
        match conditional {
            Conditional::WhenNotIn {
                depends_on,
                when_not_in,
                message,
            } => {
                let dependency = record.get(depends_on).unwrap_or("").trim();
                if when_not_in.iter().any(|v| v == dependency) {
                    return None;
                }
                Some(match message {
                    Some(template) => template.replace("{value}", dependency),
                    None => format!("required when {depends_on} is '{dependency}'"),
                })
            }
            Conditional::WhenAnyPresent {
                depends_on,
                message,
            } => {
                let any_present = depends_on
                    .iter()
                    .any(|path| !record.get(path).unwrap_or("").trim().is_empty());
                if !any_present {
                    return None;
                }
                Some(
                    message
                        .clone()
                        .unwrap_or_else(|| "required based on other fields".to_string()),
                )
            }
        }
    }

    fn suggest(&self, header: &str) -> Option<&'a str> {
        let header_lower = header.to_lowercase();
        self.schema
            .paths()
            .map(|path| (path, levenshtein(&header_lower, &path.to_lowercase())))
            .filter(|(_, distance)| *distance <= SUGGESTION_MAX_DISTANCE)
            .min_by_key(|(_, distance)| *distance)
            .map(|(path, _)| path)
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
