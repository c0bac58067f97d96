//
//  jaxrs.rs
//  RouteLens
//

use tracing::debug;

use super::{any_file_contains, ScanStrategy};
use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::extract::{extract_routes, RouteRules};
use crate::model::{Endpoint, FrameworkTag, HttpMethod};
use crate::parser::JavaModel;
use crate::source::{SourceTree, SupportedLanguage};

const PACKAGES: &[&str] = &["javax.ws.rs", "jakarta.ws.rs"];

const RULES: RouteRules = RouteRules {
    container_markers: &["Path"],
    base_markers: &["Path"],
    verb_markers: &[
        ("GET", Some(HttpMethod::Get)),
        ("POST", Some(HttpMethod::Post)),
        ("PUT", Some(HttpMethod::Put)),
        ("DELETE", Some(HttpMethod::Delete)),
        ("PATCH", Some(HttpMethod::Patch)),
        ("HEAD", Some(HttpMethod::Head)),
        ("OPTIONS", Some(HttpMethod::Options)),
    ],
    path_markers: &["Path"],
    packages: PACKAGES,
    root_when_empty: true,
};

/// JAX-RS resources (`javax.ws.rs` and `jakarta.ws.rs`). Every resource
/// method needs an explicit verb annotation.
pub struct JaxRsStrategy {
    max_depth: usize,
}

impl JaxRsStrategy {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            max_depth: config.max_resolution_depth,
        }
    }
}

impl ScanStrategy for JaxRsStrategy {
    fn name(&self) -> &'static str {
        "JAX-RS"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn framework(&self) -> FrameworkTag {
        FrameworkTag::JaxRs
    }

    fn framework_names(&self) -> &'static [&'static str] {
        &["jax-rs", "jaxrs", "jersey", "resteasy"]
    }

    fn is_applicable(&self, tree: &SourceTree) -> Result<bool> {
        Ok(any_file_contains(tree, &[SupportedLanguage::Java], PACKAGES))
    }

    fn scan(&self, tree: &SourceTree, cancel: &CancelToken) -> Result<Vec<Endpoint>> {
        let model = JavaModel::build(tree, cancel)?;
        let endpoints = extract_routes(&model, &RULES, FrameworkTag::JaxRs, self.max_depth, cancel);
        debug!(found = endpoints.len(), "jax-rs scan");
        Ok(endpoints)
    }
}
