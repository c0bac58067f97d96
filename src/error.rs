//
//  error.rs
//  RouteLens
//

use std::path::PathBuf;

/// Errors surfaced by the route discovery engine.
///
/// Most scan-time problems never reach the caller: a file that fails to
/// parse or a strategy that fails is logged and contributes nothing. These
/// variants exist for the places where a caller asked for something
/// specific (a named strategy, a config file) or for a strategy to report
/// why it could not run.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("no grammar for {0} sources")]
    UnsupportedLanguage(&'static str),

    #[error("failed to initialise {0} parser: {1}")]
    ParserInitError(&'static str, String),

    #[error("tree-sitter failed to parse {0}")]
    TreeSitterParseFailed(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RouteError>;
