//
//  fastapi.rs
//  RouteLens
//
//  Decorator-driven Python routes: FastAPI apps and routers, plus the
//  Flask app/Blueprint equivalents.
//

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, trace};

use super::{any_file_contains, ScanStrategy};
use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::extract::combine;
use crate::model::{Endpoint, FrameworkTag, HttpMethod, NavigationHandle};
use crate::source::{SourceTree, SupportedLanguage};

// ── Patterns ─────────────────────────────────────────────────────────────────

/// `@router.get("/path", ...)`
static ROUTE_PRIMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"@(\w+)\.(get|post|put|delete|patch|head|options)\s*\(\s*["']([^"']*)["']([^)]*)\)"#,
    )
    .expect("primary route regex")
});

/// Catch-all: dotted receivers, `route`/`api_route`, `path=` keyword.
static ROUTE_SECONDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"@([\w.]+)\.(route|api_route|get|post|put|delete|patch|head|options)\s*\(\s*(?:(?:path|rule)\s*=\s*)?["']([^"']*)["']([^)]*)\)"#,
    )
    .expect("secondary route regex")
});

static METHODS_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"methods\s*=\s*[\[(]([^\])]*)[\])]").expect("methods regex")
});

static QUOTED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["'](\w+)["']"#).expect("quoted word regex"));

/// `router = APIRouter(prefix="/x")`, `app = FastAPI()`, `bp = Blueprint(...)`
static ROUTER_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(\w+)\s*(?::\s*[\w.]+\s*)?=\s*(?:[\w.]+\.)?(APIRouter|FastAPI|Flask|Blueprint)\s*\(([^)]*)\)",
    )
    .expect("router regex")
});

static PREFIX_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:prefix|url_prefix)\s*=\s*["']([^"']*)["']"#).expect("prefix regex")
});

/// `app.include_router(users.router, prefix="/users")`,
/// `app.register_blueprint(bp, url_prefix="/bp")`
static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\.(?:include_router|register_blueprint)\s*\(\s*([\w.]+)([^)]*)\)")
        .expect("include regex")
});

static ROUTINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:async\s+)?def\s+(\w+)\s*\(").expect("routine regex")
});

const UNKNOWN_ROUTINE: &str = "unknown_function";

const MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml", "Pipfile", "setup.py"];

const IMPORT_MARKERS: &[&str] = &[
    "from fastapi",
    "import fastapi",
    "FastAPI(",
    "APIRouter(",
    "from flask",
    "import flask",
    "Blueprint(",
];

// ── Per-file facts ───────────────────────────────────────────────────────────

/// A router is identified by the module (file stem) that declares it and
/// its variable name.
type RouterKey = (String, String);

#[derive(Debug)]
struct Router {
    prefix: String,
}

#[derive(Debug)]
struct Mount {
    parent: RouterKey,
    child_module: Option<String>,
    child_name: String,
    prefix: String,
}

#[derive(Debug)]
struct Route {
    receiver: RouterKey,
    methods: Vec<HttpMethod>,
    path: String,
    routine: String,
    file: PathBuf,
    line: usize,
}

#[derive(Debug, Default)]
struct Facts {
    routers: HashMap<RouterKey, Router>,
    /// Declaration order, for deterministic output.
    order: Vec<RouterKey>,
    mounts: Vec<Mount>,
    routes: Vec<Route>,
}

fn module_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Largest char boundary at or below `idx`.
fn floor_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn declared_methods(verb: &str, args: &str) -> Vec<HttpMethod> {
    if let Some(m) = HttpMethod::parse(verb) {
        return vec![m];
    }
    let mut methods = Vec::new();
    if let Some(list) = METHODS_ARG.captures(args) {
        for caps in QUOTED_WORD.captures_iter(&list[1]) {
            if let Some(m) = HttpMethod::parse(&caps[1]) {
                if !methods.contains(&m) {
                    methods.push(m);
                }
            }
        }
    }
    if methods.is_empty() {
        methods.push(HttpMethod::Get);
    }
    methods
}

impl Facts {
    fn collect(&mut self, path: &Path, source: &str, lookahead: usize) {
        let module = module_of(path);

        for caps in ROUTER_DECL.captures_iter(source) {
            let key = (module.clone(), caps[1].to_string());
            let prefix = PREFIX_ARG
                .captures(&caps[3])
                .map(|p| p[1].to_string())
                .unwrap_or_default();
            if self.routers.insert(key.clone(), Router { prefix }).is_none() {
                self.order.push(key);
            }
        }

        for caps in INCLUDE.captures_iter(source) {
            let child = &caps[2];
            let (child_module, child_name) = match child.rsplit_once('.') {
                Some((qualifier, name)) => (
                    Some(qualifier.rsplit('.').next().unwrap_or(qualifier).to_string()),
                    name.to_string(),
                ),
                None => (None, child.to_string()),
            };
            self.mounts.push(Mount {
                parent: (module.clone(), caps[1].to_string()),
                child_module,
                child_name,
                prefix: PREFIX_ARG
                    .captures(&caps[3])
                    .map(|p| p[1].to_string())
                    .unwrap_or_default(),
            });
        }

        let mut seen: HashSet<(String, String, Vec<HttpMethod>, String)> = HashSet::new();
        for pattern in [&*ROUTE_PRIMARY, &*ROUTE_SECONDARY] {
            for caps in pattern.captures_iter(source) {
                let Some(route) = self.route(path, &module, source, &caps, lookahead) else {
                    continue;
                };
                let key = (
                    route.receiver.1.clone(),
                    route.path.clone(),
                    route.methods.clone(),
                    route.routine.clone(),
                );
                if seen.insert(key) {
                    self.routes.push(route);
                }
            }
        }
    }

    fn route(
        &self,
        path: &Path,
        module: &str,
        source: &str,
        caps: &Captures,
        lookahead: usize,
    ) -> Option<Route> {
        let whole = caps.get(0)?;
        let receiver = caps[1].rsplit('.').next().unwrap_or(&caps[1]).to_string();
        let methods = declared_methods(&caps[2], &caps[4]);

        let window_end = floor_boundary(source, whole.end() + lookahead);
        let window = &source[whole.end()..window_end];
        let (routine, line) = match ROUTINE.captures(window) {
            Some(def) => {
                let offset = whole.end() + def.get(0).map_or(0, |m| m.start());
                (def[1].to_string(), line_at(source, offset))
            }
            None => {
                trace!(receiver = %receiver, "no routine after decorator");
                (UNKNOWN_ROUTINE.to_string(), line_at(source, whole.start()))
            }
        };

        Some(Route {
            receiver: (module.to_string(), receiver),
            methods,
            path: caps[3].to_string(),
            routine,
            file: path.to_path_buf(),
            line,
        })
    }

    fn resolve_child(&self, mount: &Mount) -> Option<RouterKey> {
        if let Some(module) = &mount.child_module {
            let key = (module.clone(), mount.child_name.clone());
            if self.routers.contains_key(&key) {
                return Some(key);
            }
        }
        let local = (mount.parent.0.clone(), mount.child_name.clone());
        if self.routers.contains_key(&local) {
            return Some(local);
        }
        self.order
            .iter()
            .find(|(_, name)| *name == mount.child_name)
            .cloned()
    }

    /// Walk the mount graph from every root router and emit routes with
    /// their composed prefixes.
    fn endpoints(&self, cancel: &CancelToken) -> Vec<Endpoint> {
        let mut children: HashMap<&RouterKey, Vec<(RouterKey, &str)>> = HashMap::new();
        let mut included: HashSet<RouterKey> = HashSet::new();
        for mount in &self.mounts {
            let Some(child) = self.resolve_child(mount) else {
                trace!(child = %mount.child_name, "mounted router not found");
                continue;
            };
            included.insert(child.clone());
            children
                .entry(&mount.parent)
                .or_default()
                .push((child, mount.prefix.as_str()));
        }

        // Receivers with no declaration act as roots without a prefix.
        let mut roots: Vec<RouterKey> = self
            .order
            .iter()
            .filter(|k| !included.contains(*k))
            .cloned()
            .collect();
        for route in &self.routes {
            if !self.routers.contains_key(&route.receiver) && !roots.contains(&route.receiver) {
                roots.push(route.receiver.clone());
            }
        }

        let mut out = Vec::new();
        for root in &roots {
            if cancel.is_cancelled() {
                break;
            }
            let mut visiting = HashSet::new();
            self.emit(root, "", &children, &mut visiting, &mut out);
        }
        out
    }

    fn emit(
        &self,
        key: &RouterKey,
        mounted_at: &str,
        children: &HashMap<&RouterKey, Vec<(RouterKey, &str)>>,
        visiting: &mut HashSet<RouterKey>,
        out: &mut Vec<Endpoint>,
    ) {
        if !visiting.insert(key.clone()) {
            debug!(router = %key.1, "router include cycle");
            return;
        }
        let own = self.routers.get(key).map_or("", |r| r.prefix.as_str());
        let base = combine(mounted_at, own);

        for route in self.routes.iter().filter(|r| &r.receiver == key) {
            let full = combine(&base, &route.path);
            for method in &route.methods {
                out.push(Endpoint::new(
                    *method,
                    &full,
                    key.1.as_str(),
                    route.routine.as_str(),
                    NavigationHandle::new(&route.file, route.line),
                    FrameworkTag::FastApi,
                ));
            }
        }

        if let Some(mounted) = children.get(key) {
            for (child, prefix) in mounted {
                self.emit(child, &combine(&base, prefix), children, visiting, out);
            }
        }
        visiting.remove(key);
    }
}

// ── Strategy ─────────────────────────────────────────────────────────────────

/// Python decorator routes.
pub struct FastApiStrategy {
    lookahead: usize,
}

impl FastApiStrategy {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            lookahead: config.decorator_lookahead,
        }
    }
}

impl ScanStrategy for FastApiStrategy {
    fn name(&self) -> &'static str {
        "FastAPI"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn framework(&self) -> FrameworkTag {
        FrameworkTag::FastApi
    }

    fn framework_names(&self) -> &'static [&'static str] {
        &["fastapi", "fast-api", "flask"]
    }

    fn is_applicable(&self, tree: &SourceTree) -> Result<bool> {
        Ok(tree.manifests_mention(MANIFESTS, &["fastapi", "flask"])
            || any_file_contains(tree, &[SupportedLanguage::Python], IMPORT_MARKERS))
    }

    fn scan(&self, tree: &SourceTree, cancel: &CancelToken) -> Result<Vec<Endpoint>> {
        let mut facts = Facts::default();
        for path in tree.files_of(SupportedLanguage::Python) {
            if cancel.is_cancelled() {
                debug!("python route scan cancelled");
                break;
            }
            match tree.read(&path) {
                Ok(source) => facts.collect(&path, &source, self.lookahead),
                Err(e) => trace!(error = %e, "skipping unreadable python file"),
            }
        }
        let endpoints = facts.endpoints(cancel);
        debug!(
            routers = facts.routers.len(),
            routes = facts.routes.len(),
            found = endpoints.len(),
            "python route scan finished"
        );
        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(files: &[(&str, &str)]) -> Vec<String> {
        let tree = SourceTree::in_memory(files.iter().map(|(p, s)| (*p, *s)));
        FastApiStrategy::new(&ScanConfig::default())
            .scan(&tree, &CancelToken::new())
            .unwrap()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_app_routes() {
        let routes = scan(&[(
            "main.py",
            r#"
from fastapi import FastAPI

app = FastAPI(title="demo")

@app.get("/items/{item_id}")
async def read_item(item_id: int):
    return {"id": item_id}

@app.post('/items', status_code=201)
def create_item(item: Item):
    return item
"#,
        )]);
        assert_eq!(
            routes,
            vec![
                "GET /items/{item_id} (app.read_item)",
                "POST /items (app.create_item)",
            ]
        );
    }

    #[test]
    fn test_router_prefixes_compose_through_includes() {
        let routes = scan(&[
            (
                "app/main.py",
                r#"
from fastapi import FastAPI
from app.routers import users

app = FastAPI()
app.include_router(users.router, prefix="/api")

@app.get("/health")
def health():
    return "ok"
"#,
            ),
            (
                "app/routers/users.py",
                r#"
from fastapi import APIRouter

router = APIRouter(prefix="/users", tags=["users"])

@router.get("/")
async def list_users():
    return []

@router.delete("/{user_id}")
async def delete_user(user_id: int):
    return None
"#,
            ),
        ]);
        assert_eq!(
            routes,
            vec![
                "GET /health (app.health)",
                "GET /api/users/ (router.list_users)",
                "DELETE /api/users/{user_id} (router.delete_user)",
            ]
        );
    }

    #[test]
    fn test_flask_routes_and_blueprints() {
        let routes = scan(&[(
            "flask_example.py",
            r#"
from flask import Flask, Blueprint

app = Flask(__name__)
admin = Blueprint("admin", __name__, url_prefix="/admin")

@app.route('/users', methods=['GET', 'POST'])
def users():
    pass

@admin.route("/stats")
def stats():
    pass

app.register_blueprint(admin)
"#,
        )]);
        assert_eq!(
            routes,
            vec![
                "GET /users (app.users)",
                "POST /users (app.users)",
                "GET /admin/stats (admin.stats)",
            ]
        );
    }

    #[test]
    fn test_missing_routine_and_cycles() {
        let routes = scan(&[(
            "weird.py",
            r#"
a = APIRouter(prefix="/a")
b = APIRouter(prefix="/b")
a.include_router(b)
b.include_router(a)

@a.get("/x")
"#,
        )]);
        // Both routers are included, so neither is a root.
        assert!(routes.is_empty());

        let routes = scan(&[("lonely.py", "@api.get(\"/orphan\")\n")]);
        assert_eq!(routes, vec!["GET /orphan (api.unknown_function)"]);
    }

    #[test]
    fn test_applicability() {
        let s = FastApiStrategy::new(&ScanConfig::default());
        let manifest = SourceTree::in_memory([("requirements.txt", "fastapi>=0.100\n")]);
        assert!(s.is_applicable(&manifest).unwrap());
        let imports = SourceTree::in_memory([("svc/api.py", "from fastapi import APIRouter\n")]);
        assert!(s.is_applicable(&imports).unwrap());
        let java = SourceTree::in_memory([("A.java", "class A {}")]);
        assert!(!s.is_applicable(&java).unwrap());
    }
}
