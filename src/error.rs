use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no target URL: pass --url or set {0} in the config file")]
    MissingTarget(&'static str),

    #[error("unknown bot type: {0}")]
    UnknownBotType(String),

    #[error("unknown mode: {0} (expected botnet, human, mixed or flood)")]
    UnknownMode(String),

    #[error("unknown injection type: {0} (expected sql, nosql or cmd)")]
    UnknownInjectionKind(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("table operation failed: {0}")]
    Table(String),

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}
