//! Field rule schema: loads a JSON rule set, compiles each rule into a
//! typed [`FieldRule`], and rejects malformed rule sets at startup.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::utils::error::SchemaError;

/// Delimiter for array-typed fields. `Auto` splits on `|` when present,
/// otherwise on `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDelimiter {
    Pipe,
    Comma,
    Auto,
}

impl ArrayDelimiter {
    /// Splits a raw cell into trimmed, non-empty elements in input order.
    pub fn split(self, raw: &str) -> Vec<String> {
        let separator = match self {
            ArrayDelimiter::Pipe => '|',
            ArrayDelimiter::Comma => ',',
            ArrayDelimiter::Auto => {
                if raw.contains('|') {
                    '|'
                } else {
                    ','
                }
            }
        };
        raw.split(separator)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Conditional requirement attached to a rule. The field becomes mandatory
/// when the condition triggers against the current row.
#[derive(Debug, Clone)]
pub enum Conditional {
    /// Mandatory when the dependency's value is NOT in `when_not_in`.
    WhenNotIn {
        depends_on: String,
        when_not_in: Vec<String>,
        message: Option<String>,
    },
    /// Mandatory when any of the dependencies has a non-empty value.
    WhenAnyPresent {
        depends_on: Vec<String>,
        message: Option<String>,
    },
}

impl Conditional {
    pub fn dependencies(&self) -> &[String] {
        match self {
            Conditional::WhenNotIn { depends_on, .. } => std::slice::from_ref(depends_on),
            Conditional::WhenAnyPresent { depends_on, .. } => depends_on,
        }
    }
}

/// Per-type constraints, one variant per field type. Dispatch over kinds is
/// an exhaustive match; there is no runtime type-tag branching.
#[derive(Debug, Clone)]
pub enum FieldKind {
    String {
        pattern: Option<Regex>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Boolean,
    Enum {
        values: Vec<String>,
    },
    Array {
        delimiter: ArrayDelimiter,
        item_pattern: Option<Regex>,
        allowed: Option<Vec<String>>,
    },
}

/// One compiled field rule, keyed by its dot-notation path.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub path: String,
    pub required: bool,
    pub description: Option<String>,
    pub conditional: Option<Conditional>,
    pub kind: FieldKind,
}

/// Immutable, validated rule set. Loaded once per run; iteration order is
/// deterministic (lexicographic by path).
#[derive(Debug, Clone)]
pub struct Schema {
    rules: BTreeMap<String, FieldRule>,
}

impl Schema {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let raw: BTreeMap<String, RawRule> = serde_json::from_str(text)?;
        let mut rules = BTreeMap::new();
        for (path, rule) in raw {
            let compiled = compile_rule(&path, rule)?;
            rules.insert(path, compiled);
        }
        let schema = Self { rules };
        schema.check_dependencies()?;
        schema.check_path_conflicts()?;
        Ok(schema)
    }

    pub fn rule(&self, path: &str) -> Option<&FieldRule> {
        self.rules.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.rules.contains_key(path)
    }

    pub fn rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every conditional dependency must name a declared field.
    fn check_dependencies(&self) -> Result<(), SchemaError> {
        for rule in self.rules.values() {
            let Some(conditional) = &rule.conditional else {
                continue;
            };
            for dependency in conditional.dependencies() {
                if !self.rules.contains_key(dependency) {
                    return Err(SchemaError::UnresolvedDependency {
                        path: rule.path.clone(),
                        depends_on: dependency.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// A path that is a strict dot-prefix of another path would make the
    /// transformer emit both a scalar and an object at the same key.
    fn check_path_conflicts(&self) -> Result<(), SchemaError> {
        for path in self.rules.keys() {
            let mut prefix = String::new();
            for part in path.split('.') {
                if !prefix.is_empty() {
                    if self.rules.contains_key(&prefix) {
                        return Err(SchemaError::PathConflict {
                            path: prefix,
                            other: path.clone(),
                        });
                    }
                    prefix.push('.');
                }
                prefix.push_str(part);
            }
        }
        Ok(())
    }
}

// ============================================================================
// On-disk rule representation
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRule {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    required: bool,
    description: Option<String>,
    pattern: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min: Option<i64>,
    max: Option<i64>,
    values: Option<Vec<String>>,
    enum_values: Option<Vec<String>>,
    item_pattern: Option<String>,
    array_delimiter: Option<String>,
    conditional_required: Option<RawConditional>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConditional {
    depends_on: DependsOn,
    when_not_in: Option<Vec<String>>,
    when_any_present: Option<bool>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependsOn {
    One(String),
    Many(Vec<String>),
}

fn compile_rule(path: &str, raw: RawRule) -> Result<FieldRule, SchemaError> {
    let kind = match raw.kind.as_deref().unwrap_or("string") {
        "string" => {
            if let (Some(min), Some(max)) = (raw.min_length, raw.max_length) {
                if min > max {
                    return Err(SchemaError::InvertedLength {
                        path: path.to_string(),
                        min,
                        max,
                    });
                }
            }
            FieldKind::String {
                pattern: compile_pattern(path, raw.pattern.as_deref())?,
                min_length: raw.min_length,
                max_length: raw.max_length,
            }
        }
        "integer" => {
            if let (Some(min), Some(max)) = (raw.min, raw.max) {
                if min > max {
                    return Err(SchemaError::InvertedRange {
                        path: path.to_string(),
                        min,
                        max,
                    });
                }
            }
            FieldKind::Integer {
                min: raw.min,
                max: raw.max,
            }
        }
        "boolean" => FieldKind::Boolean,
        "enum" => {
            let values = raw.values.unwrap_or_default();
            if values.is_empty() {
                return Err(SchemaError::EmptyEnum {
                    path: path.to_string(),
                });
            }
            FieldKind::Enum { values }
        }
        "array" => FieldKind::Array {
            delimiter: compile_delimiter(path, raw.array_delimiter.as_deref())?,
            item_pattern: compile_pattern(path, raw.item_pattern.as_deref())?,
            allowed: raw.enum_values,
        },
        other => {
            return Err(SchemaError::UnknownType {
                path: path.to_string(),
                kind: other.to_string(),
            })
        }
    };

    let conditional = raw
        .conditional_required
        .map(|cond| compile_conditional(path, cond))
        .transpose()?;

    Ok(FieldRule {
        path: path.to_string(),
        required: raw.required,
        description: raw.description,
        conditional,
        kind,
    })
}

fn compile_pattern(path: &str, pattern: Option<&str>) -> Result<Option<Regex>, SchemaError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|source| SchemaError::BadPattern {
                path: path.to_string(),
                source,
            })
        })
        .transpose()
}

fn compile_delimiter(path: &str, delimiter: Option<&str>) -> Result<ArrayDelimiter, SchemaError> {
    match delimiter {
        None => Ok(ArrayDelimiter::Auto),
        Some("|") => Ok(ArrayDelimiter::Pipe),
        Some(",") => Ok(ArrayDelimiter::Comma),
        Some(other) => Err(SchemaError::BadDelimiter {
            path: path.to_string(),
            delimiter: other.to_string(),
        }),
    }
}

fn compile_conditional(path: &str, raw: RawConditional) -> Result<Conditional, SchemaError> {
    match raw.depends_on {
        DependsOn::One(depends_on) => Ok(Conditional::WhenNotIn {
            depends_on,
            when_not_in: raw.when_not_in.unwrap_or_default(),
            message: raw.message,
        }),
        DependsOn::Many(depends_on) => {
            if depends_on.is_empty() {
                return Err(SchemaError::EmptyDependencyList {
                    path: path.to_string(),
                });
            }
            if raw.when_any_present != Some(true) {
                return Err(SchemaError::DisabledConditional {
                    path: path.to_string(),
                });
            }
            Ok(Conditional::WhenAnyPresent {
                depends_on,
                message: raw.message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(text: &str) -> Result<Schema, SchemaError> {
        Schema::from_json(text)
    }

    #[test]
    fn test_loads_and_orders_rules() {
        let loaded = schema(
            r#"{
                "business.name": {"type": "string", "required": true},
                "business.employeeCount": {"type": "integer", "min": 0},
                "config.kybLevel": {"type": "enum", "values": ["disable", "standard"]}
            }"#,
        )
        .unwrap();

        assert_eq!(loaded.len(), 3);
        let paths: Vec<&str> = loaded.paths().collect();
        assert_eq!(
            paths,
            vec!["business.employeeCount", "business.name", "config.kybLevel"]
        );
        assert!(loaded.rule("business.name").unwrap().required);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = schema(r#"{"a": {"type": "decimal"}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { kind, .. } if kind == "decimal"));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let err = schema(r#"{"a": {"type": "string", "pattern": "["}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::BadPattern { .. }));
    }

    #[test]
    fn test_enum_without_values_is_rejected() {
        let err = schema(r#"{"a": {"type": "enum"}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyEnum { .. }));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let err =
            schema(r#"{"a": {"type": "string", "minLength": 5, "maxLength": 2}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvertedLength { .. }));

        let err = schema(r#"{"a": {"type": "integer", "min": 10, "max": 1}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvertedRange { .. }));
    }

    #[test]
    fn test_unresolved_dependency_is_rejected() {
        let err = schema(
            r#"{
                "a": {
                    "type": "string",
                    "conditionalRequired": {"dependsOn": "missing.field", "whenNotIn": ["x"]}
                }
            }"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, SchemaError::UnresolvedDependency { depends_on, .. } if depends_on == "missing.field")
        );
    }

    #[test]
    fn test_prefix_conflict_is_rejected() {
        let err = schema(
            r#"{
                "business": {"type": "string"},
                "business.name": {"type": "string"}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::PathConflict { path, .. } if path == "business"));
    }

    #[test]
    fn test_bad_delimiter_is_rejected() {
        let err = schema(r#"{"a": {"type": "array", "arrayDelimiter": ";"}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::BadDelimiter { delimiter, .. } if delimiter == ";"));
    }

    #[test]
    fn test_auto_delimiter_prefers_pipe() {
        assert_eq!(
            ArrayDelimiter::Auto.split("+1234|+5678"),
            vec!["+1234", "+5678"]
        );
        assert_eq!(
            ArrayDelimiter::Auto.split("+1234, +5678"),
            vec!["+1234", "+5678"]
        );
        assert_eq!(ArrayDelimiter::Auto.split("+1234"), vec!["+1234"]);
        assert!(ArrayDelimiter::Auto.split("  ").is_empty());
    }

    #[test]
    fn test_configured_delimiter_does_not_autodetect() {
        assert_eq!(ArrayDelimiter::Pipe.split("a,b|c"), vec!["a,b", "c"]);
    }
}
