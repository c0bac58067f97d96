//! Access to the project being scanned: file discovery, language
//! detection and build-manifest lookup.

mod language;
mod tree;

pub use language::SupportedLanguage;
pub use tree::SourceTree;
