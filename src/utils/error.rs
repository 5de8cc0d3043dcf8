use thiserror::Error;

// ============================================================================
// Schema loading
// ============================================================================

/// Malformed rule set. Always fatal at startup, before any record is read.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("cannot read rules file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rules file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule '{path}': unknown field type '{kind}'")]
    UnknownType { path: String, kind: String },

    #[error("rule '{path}': invalid pattern: {source}")]
    BadPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{path}': enum rule declares no values")]
    EmptyEnum { path: String },

    #[error("rule '{path}': unsupported array delimiter '{delimiter}' (expected '|' or ',')")]
    BadDelimiter { path: String, delimiter: String },

    #[error("rule '{path}': minLength {min} is greater than maxLength {max}")]
    InvertedLength { path: String, min: usize, max: usize },

    #[error("rule '{path}': min {min} is greater than max {max}")]
    InvertedRange { path: String, min: i64, max: i64 },

    #[error("rule '{path}': conditional dependency '{depends_on}' is not a declared field")]
    UnresolvedDependency { path: String, depends_on: String },

    #[error("rule '{path}': conditional requirement declares no dependencies")]
    EmptyDependencyList { path: String },

    #[error("rule '{path}': whenAnyPresent must be true when set")]
    DisabledConditional { path: String },

    #[error("rule '{path}' conflicts with rule '{other}': a field cannot be both a value and an object")]
    PathConflict { path: String, other: String },
}

// ============================================================================
// CSV ingestion
// ============================================================================

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open input file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

// ============================================================================
// Transformation
// ============================================================================

/// A coercion failure on a field that already passed validation. Signals an
/// inconsistency between the validator and the transformer, so it is fatal
/// for the run rather than recorded per record.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("row {row}: no rule for field '{path}'")]
    MissingRule { row: usize, path: String },

    #[error("row {row}: field '{path}': cannot convert '{value}' to {kind}")]
    Coercion {
        row: usize,
        path: String,
        value: String,
        kind: &'static str,
    },

    #[error("row {row}: field '{path}' collides with a non-object value")]
    PathCollision { row: usize, path: String },
}

// ============================================================================
// Submission transport
// ============================================================================

/// Transport-level failure for a single request. HTTP responses with
/// non-2xx statuses are not errors at this level; the submitter interprets
/// status codes itself.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("request timeout ({0}s)")]
    Timeout(u64),

    #[error("connection error - unable to reach API: {0}")]
    Connection(String),

    #[error("request error: {0}")]
    Transport(String),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot load env file '{path}': {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}

// ============================================================================
// Artifact storage
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read outcome file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
