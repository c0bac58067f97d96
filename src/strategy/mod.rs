//
//  mod.rs
//  RouteLens
//

//! Framework scan strategies and the registry that orchestrates them.

mod fastapi;
mod jaxrs;
mod registry;
mod spring;
mod spring_text;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::model::{Endpoint, FrameworkTag};
use crate::source::{SourceTree, SupportedLanguage};

pub use fastapi::FastApiStrategy;
pub use jaxrs::JaxRsStrategy;
pub use registry::StrategyRegistry;
pub use spring::SpringStrategy;

/// One framework-specific way of finding endpoints.
///
/// Lower priority numbers win when several strategies apply.
pub trait ScanStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> u8;

    fn framework(&self) -> FrameworkTag;

    /// Lower-case framework names this strategy answers to.
    fn framework_names(&self) -> &'static [&'static str];

    fn supports_framework(&self, name: &str) -> bool {
        let name = name.trim();
        self.name().eq_ignore_ascii_case(name)
            || self
                .framework_names()
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name))
    }

    fn is_applicable(&self, tree: &SourceTree) -> Result<bool>;

    fn scan(&self, tree: &SourceTree, cancel: &CancelToken) -> Result<Vec<Endpoint>>;
}

/// Snapshot of a strategy for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub priority: u8,
    pub applicable: bool,
    pub frameworks: Vec<String>,
}

/// True when any file of the given languages contains any needle.
/// Unreadable files are skipped.
fn any_file_contains(tree: &SourceTree, languages: &[SupportedLanguage], needles: &[&str]) -> bool {
    tree.files()
        .into_iter()
        .filter(|p| SupportedLanguage::from_path(p).is_some_and(|l| languages.contains(&l)))
        .any(|path| match tree.read(&path) {
            Ok(text) => needles.iter().any(|n| text.contains(n)),
            Err(e) => {
                trace!(error = %e, "skipping unreadable file during detection");
                false
            }
        })
}

/// Keep the first endpoint for each dedup key, in input order.
fn merge_first_wins(into: &mut Vec<Endpoint>, more: Vec<Endpoint>) {
    let mut seen: HashSet<String> = into.iter().map(Endpoint::dedup_key).collect();
    for endpoint in more {
        if seen.insert(endpoint.dedup_key()) {
            into.push(endpoint);
        }
    }
}
