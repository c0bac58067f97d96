//
//  spring.rs
//  RouteLens
//

use tracing::{debug, info};

use super::{any_file_contains, merge_first_wins, spring_text, ScanStrategy};
use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::extract::{extract_routes, RouteRules};
use crate::model::{Endpoint, FrameworkTag, HttpMethod};
use crate::parser::JavaModel;
use crate::source::{SourceTree, SupportedLanguage};

pub(super) const MAPPINGS: &[(&str, Option<HttpMethod>)] = &[
    ("RequestMapping", None),
    ("GetMapping", Some(HttpMethod::Get)),
    ("PostMapping", Some(HttpMethod::Post)),
    ("PutMapping", Some(HttpMethod::Put)),
    ("DeleteMapping", Some(HttpMethod::Delete)),
    ("PatchMapping", Some(HttpMethod::Patch)),
];

pub(super) const CONTROLLERS: &[&str] = &["RestController", "Controller", "RequestMapping"];

const RULES: RouteRules = RouteRules {
    container_markers: CONTROLLERS,
    base_markers: &["RequestMapping"],
    verb_markers: MAPPINGS,
    path_markers: &[],
    packages: &[],
    root_when_empty: false,
};

const MANIFESTS: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];

/// Annotation-driven Spring MVC controllers.
///
/// Java sources go through the semantic model; Kotlin sources, which have
/// no grammar here, always go through the line-based pass. When the
/// semantic model yields fewer results than `semantic_min_results`, the
/// line-based pass also runs over Java sources to fill the gaps.
pub struct SpringStrategy {
    semantic_min_results: usize,
    max_depth: usize,
}

impl SpringStrategy {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            semantic_min_results: config.semantic_min_results,
            max_depth: config.max_resolution_depth,
        }
    }
}

impl ScanStrategy for SpringStrategy {
    fn name(&self) -> &'static str {
        "Spring"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn framework(&self) -> FrameworkTag {
        FrameworkTag::Spring
    }

    fn framework_names(&self) -> &'static [&'static str] {
        &["spring", "spring-boot", "spring-mvc"]
    }

    fn is_applicable(&self, tree: &SourceTree) -> Result<bool> {
        Ok(tree.manifests_mention(MANIFESTS, &["spring"])
            || any_file_contains(
                tree,
                &[SupportedLanguage::Java, SupportedLanguage::Kotlin],
                &["@RestController", "@Controller", "@RequestMapping"],
            ))
    }

    fn scan(&self, tree: &SourceTree, cancel: &CancelToken) -> Result<Vec<Endpoint>> {
        let model = JavaModel::build(tree, cancel)?;
        let mut endpoints =
            extract_routes(&model, &RULES, FrameworkTag::Spring, self.max_depth, cancel);
        debug!(found = endpoints.len(), "spring semantic pass");

        let semantic = endpoints.len();
        if semantic < self.semantic_min_results && !cancel.is_cancelled() {
            let textual = spring_text::scan(tree, SupportedLanguage::Java, cancel);
            info!(
                semantic,
                textual = textual.len(),
                "spring semantic pass found few endpoints, merged textual pass"
            );
            merge_first_wins(&mut endpoints, textual);
        }

        if !cancel.is_cancelled() {
            let kotlin = spring_text::scan(tree, SupportedLanguage::Kotlin, cancel);
            debug!(found = kotlin.len(), "spring kotlin pass");
            merge_first_wins(&mut endpoints, kotlin);
        }
        Ok(endpoints)
    }
}
