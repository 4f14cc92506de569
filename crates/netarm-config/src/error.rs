use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("conversion error in {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("{0} is declared more than once")]
    DuplicateAddress(String),

    #[error("a provider block is declared in both {first} and {second}")]
    DuplicateProvider { first: String, second: String },

    #[error("{address}: invalid reference {reference:?}: {message}")]
    Reference { address: String, reference: String, message: String },

    #[error("reference ${{{0}}} has no value yet")]
    Unresolved(String),
}
