//
//  mod.rs
//  RouteLens
//

//! Route extraction over a [`LanguageAdapter`].
//!
//! A type is a route container when it carries one of the configured
//! container markers. Its base path comes from the base marker, each
//! member's path from its verb (or path) marker. Both are resolved through
//! [`PathResolver`]; any unresolved path drops the declaration.

use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::model::{Endpoint, FrameworkTag, HttpMethod, NavigationHandle};
use crate::parser::{LanguageAdapter, Marker, MemberDecl, TypeDecl};
use crate::resolve::PathResolver;

/// Marker vocabulary of one annotation-driven framework.
#[derive(Debug, Clone, Copy)]
pub struct RouteRules {
    /// Type markers that make a type a route container.
    pub container_markers: &'static [&'static str],
    /// Type markers whose argument is the base path.
    pub base_markers: &'static [&'static str],
    /// Member markers that declare a route. `None` marks a generic marker
    /// whose verbs come from its method attribute, defaulting to GET.
    pub verb_markers: &'static [(&'static str, Option<HttpMethod>)],
    /// Member markers carrying the member path. When empty the verb marker
    /// carries it.
    pub path_markers: &'static [&'static str],
    /// Packages the markers must belong to. Empty accepts any.
    pub packages: &'static [&'static str],
    /// Emit `/` when neither base nor member declares a path. Otherwise
    /// such members are skipped.
    pub root_when_empty: bool,
}

impl RouteRules {
    fn find<'m>(&self, markers: &'m [Marker], names: &[&str]) -> Option<&'m Marker> {
        markers
            .iter()
            .find(|m| names.contains(&m.name.as_str()) && m.is_from(self.packages))
    }

    fn is_container(&self, decl: &TypeDecl) -> bool {
        self.find(&decl.markers, self.container_markers).is_some()
    }

    fn verb_marker<'m>(&self, member: &'m MemberDecl) -> Option<(&'m Marker, Vec<HttpMethod>)> {
        member.markers.iter().find_map(|m| {
            if !m.is_from(self.packages) {
                return None;
            }
            let (_, fixed) = self.verb_markers.iter().find(|(n, _)| *n == m.name)?;
            let methods = match fixed {
                Some(verb) => vec![*verb],
                None if m.methods.is_empty() => vec![HttpMethod::Get],
                None => m.methods.clone(),
            };
            Some((m, methods))
        })
    }
}

/// Walk every container type of `adapter` and build its endpoints.
pub fn extract_routes<A>(
    adapter: &A,
    rules: &RouteRules,
    framework: FrameworkTag,
    max_depth: usize,
    cancel: &CancelToken,
) -> Vec<Endpoint>
where
    A: LanguageAdapter + ?Sized,
{
    let resolver = PathResolver::new(adapter, max_depth);
    let mut endpoints = Vec::new();

    for decl in adapter.types() {
        if cancel.is_cancelled() {
            debug!(%framework, found = endpoints.len(), "route extraction cancelled");
            break;
        }
        if !rules.is_container(decl) {
            continue;
        }

        let base = match rules
            .find(&decl.markers, rules.base_markers)
            .and_then(|m| m.path.as_ref())
        {
            Some(expr) => match resolver.resolve(expr, &decl.scope) {
                Some(base) => base,
                None => {
                    debug!(type_name = %decl.name, "unresolved base path, skipping type");
                    continue;
                }
            },
            None => String::new(),
        };

        let file = adapter.file_path(decl.scope.file);
        for member in &decl.members {
            let Some((verb_marker, methods)) = rules.verb_marker(member) else {
                continue;
            };
            let path_expr = if rules.path_markers.is_empty() {
                verb_marker.path.as_ref()
            } else {
                rules
                    .find(&member.markers, rules.path_markers)
                    .and_then(|m| m.path.as_ref())
            };
            let member_path = match path_expr {
                Some(expr) => match resolver.resolve(expr, &decl.scope) {
                    Some(path) => path,
                    None => {
                        trace!(type_name = %decl.name, member = %member.name, "unresolved member path");
                        continue;
                    }
                },
                None => String::new(),
            };

            let mut full = combine(&base, &member_path);
            if full.is_empty() {
                if !rules.root_when_empty {
                    continue;
                }
                full = "/".to_string();
            }

            for method in methods {
                endpoints.push(Endpoint::new(
                    method,
                    &full,
                    decl.name.as_str(),
                    member.name.as_str(),
                    NavigationHandle::new(file, member.line),
                    framework,
                ));
            }
        }
    }

    debug!(
        %framework,
        language = adapter.language().name(),
        found = endpoints.len(),
        "route extraction finished"
    );
    endpoints
}

/// Join a base path and a member path.
///
/// An empty side yields the other unchanged. Otherwise both sides get a
/// leading `/`, the base loses one trailing `/`, and runs of `/` collapse.
pub fn combine(base: &str, member: &str) -> String {
    if base.is_empty() {
        return member.to_string();
    }
    if member.is_empty() {
        return base.to_string();
    }
    let base = with_leading_slash(base);
    let member = with_leading_slash(member);
    let base = base.strip_suffix('/').unwrap_or(&base);
    collapse_slashes(&format!("{base}{member}"))
}

/// Leading `/`, no `//`. The empty path is `/`.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    collapse_slashes(&with_leading_slash(path))
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JavaModel;
    use crate::source::SourceTree;

    const RULES: RouteRules = RouteRules {
        container_markers: &["RestController"],
        base_markers: &["RequestMapping"],
        verb_markers: &[
            ("RequestMapping", None),
            ("GetMapping", Some(HttpMethod::Get)),
            ("PostMapping", Some(HttpMethod::Post)),
        ],
        path_markers: &[],
        packages: &[],
        root_when_empty: false,
    };

    fn extract(source: &str, rules: &RouteRules) -> Vec<String> {
        let tree = SourceTree::in_memory([("src/Api.java", source)]);
        let model = JavaModel::build(&tree, &CancelToken::new()).unwrap();
        extract_routes(&model, rules, FrameworkTag::Spring, 32, &CancelToken::new())
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine("/api", "/users"), "/api/users");
        assert_eq!(combine("", "/x"), "/x");
        assert_eq!(combine("/a/", "/b"), "/a/b");
        assert_eq!(combine("/a//", "//b"), "/a/b");
        assert_eq!(combine("api", "users"), "/api/users");
        assert_eq!(combine("/a", ""), "/a");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("users//{id}"), "/users/{id}");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_base_and_member_paths() {
        let routes = extract(
            r#"
@RestController
@RequestMapping("/api/users")
public class Users {
    @GetMapping
    public void list() {}

    @PostMapping("/{id}/avatar")
    public void upload() {}

    public void helper() {}
}
"#,
            &RULES,
        );
        assert_eq!(
            routes,
            vec![
                "GET /api/users (Users.list)",
                "POST /api/users/{id}/avatar (Users.upload)",
            ]
        );
    }

    #[test]
    fn test_generic_marker_emits_one_endpoint_per_verb() {
        let routes = extract(
            r#"
@RestController
public class Forms {
    @RequestMapping(value = "/form", method = {RequestMethod.GET, RequestMethod.POST})
    public void form() {}

    @RequestMapping("/plain")
    public void plain() {}
}
"#,
            &RULES,
        );
        assert_eq!(
            routes,
            vec![
                "GET /form (Forms.form)",
                "POST /form (Forms.form)",
                "GET /plain (Forms.plain)",
            ]
        );
    }

    #[test]
    fn test_unresolved_paths_drop_declarations() {
        let routes = extract(
            r#"
@RestController
public class Dynamic {
    static String prefix = "/p";

    @GetMapping(prefix + "/x")
    public void dynamic() {}

    @GetMapping(Paths.build("/y"))
    public void computed() {}

    @GetMapping("/ok")
    public void ok() {}
}

@RestController
@RequestMapping(Unknown.BASE)
class Orphan {
    @GetMapping("/never")
    public void never() {}
}
"#,
            &RULES,
        );
        assert_eq!(routes, vec!["GET /ok (Dynamic.ok)"]);
    }

    #[test]
    fn test_empty_path_root_policy() {
        let source = "@RestController\nclass Root {\n  @GetMapping\n  void index() {}\n}\n";
        assert!(extract(source, &RULES).is_empty());
        let rooted = RouteRules {
            root_when_empty: true,
            ..RULES
        };
        assert_eq!(extract(source, &rooted), vec!["GET / (Root.index)"]);
    }

    #[test]
    fn test_non_container_types_are_ignored() {
        let routes = extract(
            "class Plain {\n  @GetMapping(\"/x\")\n  void x() {}\n}\n",
            &RULES,
        );
        assert!(routes.is_empty());
    }
}
