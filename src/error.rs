use thiserror::Error;

/// Failure while turning one selection set into a field tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("custom scalar `{scalar}` has no entry in the scalar table")]
    UnmappedScalar { scalar: String },
}

/// Aborts a whole generation run; nothing is emitted.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid schema:\n{0}")]
    Schema(String),
    #[error("invalid query document:\n{0}")]
    Document(String),
    #[error("anonymous operations cannot be generated; give every operation a name")]
    AnonymousOperation,
    #[error("operation `{name}`: {source}")]
    Operation {
        name: String,
        #[source]
        source: BuildError,
    },
    #[error("fragment `{name}`: {source}")]
    Fragment {
        name: String,
        #[source]
        source: BuildError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("invalid scalar mapping `{0}`, expected `GraphQLName=TargetType`")]
    ScalarMapping(String),
}
