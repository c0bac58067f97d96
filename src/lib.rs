//! # RouteLens
//!
//! Discovers HTTP route declarations across a multi-language source tree,
//! resolves each declared path to a literal string, and ranks the results
//! for interactive fuzzy lookup.
//!
//! ## Key Features
//!
//! - **Framework strategies**: Spring MVC, FastAPI/Flask and JAX-RS, chosen
//!   by priority and merged when one under-reports
//! - **Constant resolution**: `API.V1 + "/users"` resolves through
//!   `static final` constants, across files, without looping on cycles
//! - **Fail-soft**: an unparseable file or a failing strategy costs its own
//!   results and nothing else
//! - **Fuzzy search**: additive scoring tuned for `"GET /api/users"` names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routelens::RouteLens;
//!
//! let lens = RouteLens::open(".");
//!
//! for endpoint in lens.find_all_endpoints() {
//!     println!("{endpoint}  {}", endpoint.location());
//! }
//!
//! let hits = lens.search("get users");
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod resolve;
pub mod search;
pub mod source;
pub mod strategy;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use config::{RouteConfig, ScanConfig, SearchConfig};
pub use error::{Result, RouteError};
pub use model::{Endpoint, FrameworkTag, HttpMethod, NavigationHandle};
pub use source::SourceTree;
pub use strategy::{ScanStrategy, StrategyInfo, StrategyRegistry};

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

/// Config file looked up at the project root by [`RouteLens::open`].
pub const CONFIG_FILE: &str = "routelens.toml";

/// The main RouteLens instance.
///
/// Every query re-walks the source tree; nothing is cached between calls.
pub struct RouteLens {
    tree: SourceTree,
    config: RouteConfig,
    registry: StrategyRegistry,
    cancel: CancelToken,
}

impl RouteLens {
    pub fn new(tree: SourceTree, config: RouteConfig) -> Self {
        let registry = StrategyRegistry::new(&config.scan);
        Self {
            tree,
            config,
            registry,
            cancel: CancelToken::new(),
        }
    }

    /// Open a project directory, reading `routelens.toml` from it when
    /// present.
    pub fn open<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let config = RouteConfig::load(&root.join(CONFIG_FILE));
        let tree = SourceTree::open(&root, &config.scan);
        Self::new(tree, config)
    }

    /// Use `token` to cancel scans started from this instance.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn tree(&self) -> &SourceTree {
        &self.tree
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Best-strategy scan, deduplicated and sorted by display name.
    pub fn find_all_endpoints(&self) -> Vec<Endpoint> {
        self.registry
            .scan_with_best_strategy(&self.tree, &self.cancel)
    }

    /// Scan with one strategy, by name or framework alias.
    pub fn scan_with_strategy(&self, name: &str) -> Result<Vec<Endpoint>> {
        self.registry
            .scan_with_strategy(name, &self.tree, &self.cancel)
    }

    pub fn scan_with_all_strategies(&self) -> Vec<Endpoint> {
        self.registry
            .scan_with_all_strategies(&self.tree, &self.cancel)
    }

    pub fn strategy_info(&self) -> Vec<StrategyInfo> {
        self.registry.strategy_info(&self.tree)
    }

    /// Rank display names against `query`, honouring the configured limit.
    pub fn rank(&self, names: &[String], query: &str) -> Vec<String> {
        let mut ranked = search::rank(names, query);
        if let Some(limit) = self.config.search.limit {
            ranked.truncate(limit);
        }
        ranked
    }

    /// Display names (`"<METHOD> <path>"`), one per endpoint in scan order.
    /// Two handlers for the same route give the same name twice.
    pub fn get_names(&self) -> Vec<String> {
        self.find_all_endpoints()
            .iter()
            .map(Endpoint::name)
            .collect()
    }

    /// Every endpoint whose display name is `name`.
    pub fn get_items_by_name(&self, name: &str) -> Vec<Endpoint> {
        self.find_all_endpoints()
            .into_iter()
            .filter(|e| e.name() == name)
            .collect()
    }

    /// Scan once, rank the display names against `query` and return the
    /// matching endpoints in rank order.
    pub fn search(&self, query: &str) -> Vec<Endpoint> {
        let endpoints = self.find_all_endpoints();
        let mut by_name: HashMap<String, Vec<Endpoint>> = HashMap::new();
        let mut names = Vec::new();
        for endpoint in endpoints {
            let name = endpoint.name();
            if !by_name.contains_key(&name) {
                names.push(name.clone());
            }
            by_name.entry(name).or_default().push(endpoint);
        }

        let ranked = self.rank(&names, query);
        debug!(query, candidates = names.len(), matched = ranked.len(), "search");
        ranked
            .iter()
            .filter_map(|name| by_name.remove(name))
            .flatten()
            .collect()
    }
}
