//
//  language.rs
//  RouteLens
//

use std::path::Path;

use tree_sitter::{Language, Parser};

use crate::error::{Result, RouteError};

/// Source languages the scanners know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedLanguage {
    Java,
    Kotlin,
    Python,
}

impl SupportedLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "java" => Some(Self::Java),
            "kt" | "kts" => Some(Self::Kotlin),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// Tree-sitter grammar for languages with a semantic model.
    /// Kotlin and Python are scanned textually.
    pub fn tree_sitter_language(self) -> Option<Language> {
        match self {
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            Self::Kotlin | Self::Python => None,
        }
    }

    /// A tree-sitter parser set up for this language.
    pub fn parser(self) -> Result<Parser> {
        let language = self
            .tree_sitter_language()
            .ok_or(RouteError::UnsupportedLanguage(self.name()))?;
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| RouteError::ParserInitError(self.name(), e.to_string()))?;
        Ok(parser)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Python => "python",
        }
    }
}
