//
//  registry.rs
//  RouteLens
//

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{FastApiStrategy, JaxRsStrategy, ScanStrategy, SpringStrategy, StrategyInfo};
use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::error::{Result, RouteError};
use crate::model::Endpoint;
use crate::source::SourceTree;

/// Ordered set of strategies, fixed at construction.
///
/// Strategies are kept sorted by ascending priority. Every scan method
/// isolates failures: a strategy that errors is logged and contributes
/// nothing.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn ScanStrategy>>,
    escalation_threshold: usize,
}

impl StrategyRegistry {
    /// The built-in strategies: Spring, FastAPI, JAX-RS.
    pub fn new(config: &ScanConfig) -> Self {
        Self::with_strategies(
            vec![
                Box::new(SpringStrategy::new(config)),
                Box::new(FastApiStrategy::new(config)),
                Box::new(JaxRsStrategy::new(config)),
            ],
            config.escalation_threshold,
        )
    }

    pub fn with_strategies(
        mut strategies: Vec<Box<dyn ScanStrategy>>,
        escalation_threshold: usize,
    ) -> Self {
        strategies.sort_by_key(|s| s.priority());
        Self {
            strategies,
            escalation_threshold,
        }
    }

    pub fn strategies(&self) -> impl Iterator<Item = &dyn ScanStrategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }

    /// Strategy by name or framework alias, case-insensitive.
    pub fn find(&self, name: &str) -> Option<&dyn ScanStrategy> {
        self.strategies().find(|s| s.supports_framework(name))
    }

    pub fn strategies_by_framework(&self, framework: &str) -> Vec<&dyn ScanStrategy> {
        self.strategies()
            .filter(|s| s.supports_framework(framework))
            .collect()
    }

    /// Strategies applicable to `tree`, in priority order.
    pub fn applicable(&self, tree: &SourceTree) -> Vec<&dyn ScanStrategy> {
        self.strategies()
            .filter(|s| match s.is_applicable(tree) {
                Ok(applicable) => applicable,
                Err(e) => {
                    warn!(strategy = s.name(), error = %e, "applicability check failed");
                    false
                }
            })
            .collect()
    }

    pub fn strategy_info(&self, tree: &SourceTree) -> Vec<StrategyInfo> {
        let applicable: HashSet<&str> = self.applicable(tree).iter().map(|s| s.name()).collect();
        self.strategies()
            .map(|s| StrategyInfo {
                name: s.name().to_string(),
                priority: s.priority(),
                applicable: applicable.contains(s.name()),
                frameworks: s.framework_names().iter().map(|n| n.to_string()).collect(),
            })
            .collect()
    }

    /// Run the highest-priority applicable strategy, widening to more
    /// strategies when it under-reports or fails.
    pub fn scan_with_best_strategy(
        &self,
        tree: &SourceTree,
        cancel: &CancelToken,
    ) -> Vec<Endpoint> {
        let applicable = self.applicable(tree);
        let Some(best) = applicable.first() else {
            info!("no applicable strategy, running all");
            return self.scan_with_all_strategies(tree, cancel);
        };

        let endpoints = match best.scan(tree, cancel) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!(strategy = best.name(), error = %e, "best strategy failed, running all");
                return self.scan_with_all_strategies(tree, cancel);
            }
        };
        debug!(strategy = best.name(), found = endpoints.len(), "best strategy finished");

        if cancel.is_cancelled() {
            return deduplicate(endpoints);
        }
        if endpoints.len() < self.escalation_threshold && applicable.len() > 1 {
            info!(
                strategy = best.name(),
                found = endpoints.len(),
                applicable = applicable.len(),
                "few endpoints, merging all applicable strategies"
            );
            return self.scan_with_multiple(&applicable, tree, cancel);
        }
        deduplicate(endpoints)
    }

    /// Run every registered strategy, applicable or not, and merge.
    pub fn scan_with_all_strategies(
        &self,
        tree: &SourceTree,
        cancel: &CancelToken,
    ) -> Vec<Endpoint> {
        let all: Vec<&dyn ScanStrategy> = self.strategies().collect();
        self.scan_with_multiple(&all, tree, cancel)
    }

    /// Run the named strategy alone.
    pub fn scan_with_strategy(
        &self,
        name: &str,
        tree: &SourceTree,
        cancel: &CancelToken,
    ) -> Result<Vec<Endpoint>> {
        let strategy = self
            .find(name)
            .ok_or_else(|| RouteError::UnknownStrategy(name.to_string()))?;
        Ok(self.scan_with_multiple(&[strategy], tree, cancel))
    }

    /// Run the given strategies in order and merge; earlier strategies win
    /// on duplicate keys.
    pub fn scan_with_multiple(
        &self,
        strategies: &[&dyn ScanStrategy],
        tree: &SourceTree,
        cancel: &CancelToken,
    ) -> Vec<Endpoint> {
        let mut merged = Vec::new();
        for strategy in strategies {
            if cancel.is_cancelled() {
                debug!(found = merged.len(), "multi-strategy scan cancelled");
                break;
            }
            match strategy.scan(tree, cancel) {
                Ok(endpoints) => {
                    debug!(strategy = strategy.name(), found = endpoints.len(), "strategy finished");
                    merged.extend(endpoints);
                }
                Err(e) => warn!(strategy = strategy.name(), error = %e, "strategy failed"),
            }
        }
        deduplicate(merged)
    }
}

/// First endpoint per `METHOD:path:Type.member` wins; the result is sorted
/// by display name, equal names keeping their order.
fn deduplicate(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Endpoint> = endpoints
        .into_iter()
        .filter(|e| seen.insert(e.dedup_key()))
        .collect();
    unique.sort_by_cached_key(Endpoint::name);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FrameworkTag, HttpMethod, NavigationHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Mock {
        name: &'static str,
        priority: u8,
        applicable: Result<bool>,
        found: std::result::Result<Vec<(&'static str, &'static str)>, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl Mock {
        fn new(name: &'static str, priority: u8, found: &[(&'static str, &'static str)]) -> Self {
            Self {
                name,
                priority,
                applicable: Ok(true),
                found: Ok(found.to_vec()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn inapplicable(mut self) -> Self {
            self.applicable = Ok(false);
            self
        }

        fn failing(mut self) -> Self {
            self.found = Err("boom");
            self
        }
    }

    impl ScanStrategy for Mock {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn framework(&self) -> FrameworkTag {
            FrameworkTag::Spring
        }

        fn framework_names(&self) -> &'static [&'static str] {
            &[]
        }

        fn is_applicable(&self, _tree: &SourceTree) -> Result<bool> {
            match &self.applicable {
                Ok(a) => Ok(*a),
                Err(_) => Err(RouteError::InvalidConfig("mock".into())),
            }
        }

        fn scan(&self, _tree: &SourceTree, _cancel: &CancelToken) -> Result<Vec<Endpoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.found {
                Ok(found) => Ok(found
                    .iter()
                    .map(|(path, member)| {
                        Endpoint::new(
                            HttpMethod::Get,
                            path,
                            "Api",
                            *member,
                            NavigationHandle::new(self.name, 1),
                            FrameworkTag::Spring,
                        )
                    })
                    .collect()),
                Err(reason) => Err(RouteError::InvalidConfig(reason.to_string())),
            }
        }
    }

    fn tree() -> SourceTree {
        SourceTree::in_memory(Vec::<(&str, &str)>::new())
    }

    fn display(endpoints: &[Endpoint]) -> Vec<String> {
        endpoints
            .iter()
            .map(|e| format!("{} @{}", e.name(), e.location().file().display()))
            .collect()
    }

    #[test]
    fn test_sorted_by_priority() {
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(Mock::new("c", 3, &[])),
                Box::new(Mock::new("a", 1, &[])),
                Box::new(Mock::new("b", 2, &[])),
            ],
            3,
        );
        let names: Vec<&str> = registry.strategies().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_best_strategy_alone_when_enough_results() {
        let second = Mock::new("second", 2, &[("/z", "z")]);
        let second_calls = second.calls.clone();
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(Mock::new("first", 1, &[("/c", "c"), ("/a", "a"), ("/b", "b")])),
                Box::new(second),
            ],
            3,
        );
        let found = registry.scan_with_best_strategy(&tree(), &CancelToken::new());
        assert_eq!(
            display(&found),
            vec!["GET /a @first", "GET /b @first", "GET /c @first"]
        );
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_escalation_merges_and_higher_priority_wins() {
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(Mock::new("low", 2, &[("/shared", "s"), ("/extra", "e")])),
                Box::new(Mock::new("high", 1, &[("/shared", "s")])),
                Box::new(Mock::new("skip", 3, &[("/never", "n")]).inapplicable()),
            ],
            3,
        );
        let found = registry.scan_with_best_strategy(&tree(), &CancelToken::new());
        assert_eq!(
            display(&found),
            vec!["GET /extra @low", "GET /shared @high"]
        );
    }

    #[test]
    fn test_no_escalation_with_single_applicable() {
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(Mock::new("only", 1, &[("/a", "a")])),
                Box::new(Mock::new("other", 2, &[("/b", "b")]).inapplicable()),
            ],
            3,
        );
        let found = registry.scan_with_best_strategy(&tree(), &CancelToken::new());
        assert_eq!(display(&found), vec!["GET /a @only"]);
    }

    #[test]
    fn test_none_applicable_runs_all() {
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(Mock::new("a", 1, &[("/a", "a")]).inapplicable()),
                Box::new(Mock::new("b", 2, &[("/b", "b")]).inapplicable()),
            ],
            3,
        );
        let found = registry.scan_with_best_strategy(&tree(), &CancelToken::new());
        assert_eq!(display(&found), vec!["GET /a @a", "GET /b @b"]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut broken_check = Mock::new("check", 1, &[("/c", "c")]);
        broken_check.applicable = Err(RouteError::InvalidConfig("x".into()));
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(broken_check),
                Box::new(Mock::new("fails", 2, &[]).failing()),
                Box::new(Mock::new("works", 3, &[("/ok", "ok")])),
            ],
            3,
        );
        // Best applicable strategy fails, so every strategy runs.
        let found = registry.scan_with_best_strategy(&tree(), &CancelToken::new());
        assert_eq!(display(&found), vec!["GET /c @check", "GET /ok @works"]);
        assert_eq!(registry.applicable(&tree()).len(), 2);
    }

    #[test]
    fn test_scan_with_named_strategy() {
        let registry = StrategyRegistry::with_strategies(
            vec![
                Box::new(Mock::new("Alpha", 1, &[("/a", "a")])),
                Box::new(Mock::new("Beta", 2, &[("/b", "b")])),
            ],
            3,
        );
        let found = registry
            .scan_with_strategy("beta", &tree(), &CancelToken::new())
            .unwrap();
        assert_eq!(display(&found), vec!["GET /b @Beta"]);
        let err = registry
            .scan_with_strategy("gamma", &tree(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RouteError::UnknownStrategy(name) if name == "gamma"));
    }

    #[test]
    fn test_cancelled_scan_returns_without_error() {
        let registry = StrategyRegistry::with_strategies(
            vec![Box::new(Mock::new("a", 1, &[("/a", "a")]))],
            3,
        );
        let found = registry.scan_with_all_strategies(&tree(), &CancelToken::cancelled());
        assert!(found.is_empty());
    }

    #[test]
    fn test_builtin_registry_info() {
        let registry = StrategyRegistry::new(&ScanConfig::default());
        let tree = SourceTree::in_memory([("main.py", "from fastapi import FastAPI\n")]);
        let info = registry.strategy_info(&tree);
        let summary: Vec<(&str, u8, bool)> = info
            .iter()
            .map(|i| (i.name.as_str(), i.priority, i.applicable))
            .collect();
        assert_eq!(
            summary,
            vec![("Spring", 1, false), ("FastAPI", 2, true), ("JAX-RS", 3, false)]
        );
        assert_eq!(registry.strategies_by_framework("spring-boot").len(), 1);
        assert!(registry.find("resteasy").is_some());
    }
}
