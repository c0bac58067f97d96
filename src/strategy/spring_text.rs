//
//  spring_text.rs
//  RouteLens
//
//  Line-based Spring controller scan for sources the semantic model
//  does not cover (Kotlin) or did not index.
//

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::spring::{CONTROLLERS, MAPPINGS};
use crate::cancel::CancelToken;
use crate::extract::combine;
use crate::model::{Endpoint, FrameworkTag, HttpMethod, NavigationHandle};
use crate::source::{SourceTree, SupportedLanguage};

// ── Patterns ─────────────────────────────────────────────────────────────────

/// One annotation at the start of the remaining line, with an optional
/// single-line argument list (quoted parentheses allowed).
static LEADING_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*@([\w.]+)(?:\s*\(((?:[^()"]|"[^"]*")*)\))?"#).expect("annotation regex")
});

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|interface|object)\s+(\w+)").expect("class regex")
});

static KOTLIN_FUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfun\s+(?:<[^>]*>\s*)?(?:[\w.]+\.)?(\w+)\s*\(").expect("fun regex")
});

static JAVA_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\(").expect("method regex"));

/// `name = value` inside an annotation argument list.
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(\w+)\s*=\s*(.*)$").expect("attribute regex"));

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"]*)"$"#).expect("string regex"));

static REQUEST_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RequestMethod\.(\w+)").expect("request method regex"));

// ── Line model ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct TextAnnotation {
    name: String,
    args: Option<String>,
}

/// Path written in an annotation argument list. `Some("")` when no path
/// is given, `None` when one is given but is not a single literal.
///
/// Only `value`, `path` or a leading positional argument carry the path;
/// strings in any other attribute (`produces`, `consumes`, ...) are never
/// read as one.
fn literal_path(args: Option<&str>) -> Option<String> {
    let Some(args) = args.map(str::trim).filter(|a| !a.is_empty()) else {
        return Some(String::new());
    };
    let items = split_top_level(args);
    let named = items.iter().find_map(|item| {
        let caps = ATTRIBUTE.captures(item)?;
        matches!(&caps[1], "value" | "path").then(|| caps.get(2).map_or("", |m| m.as_str()))
    });
    match named {
        Some(value) => literal_value(value),
        None => match items.first() {
            Some(first) if !ATTRIBUTE.is_match(first) => literal_value(first),
            _ => Some(String::new()),
        },
    }
}

/// A single string literal, or the first element of a `{...}`/`[...]`
/// array of them. An empty array is the empty path.
fn literal_value(value: &str) -> Option<String> {
    let value = value.trim();
    let array = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .or_else(|| value.strip_prefix('[').and_then(|v| v.strip_suffix(']')));
    if let Some(inner) = array {
        return match split_top_level(inner).first() {
            Some(first) => literal_value(first),
            None => Some(String::new()),
        };
    }
    STRING_LITERAL.captures(value).map(|caps| caps[1].to_string())
}

/// Split on commas that are outside strings and brackets. Blank items are
/// dropped.
fn split_top_level(args: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(args[start..].trim());
    items.retain(|item| !item.is_empty());
    items
}

fn verbs(annotation: &TextAnnotation) -> Option<Vec<HttpMethod>> {
    let (_, fixed) = MAPPINGS.iter().find(|(n, _)| *n == annotation.name)?;
    if let Some(verb) = fixed {
        return Some(vec![*verb]);
    }
    let mut methods: Vec<HttpMethod> = Vec::new();
    for caps in REQUEST_METHOD.captures_iter(annotation.args.as_deref().unwrap_or("")) {
        if let Some(m) = HttpMethod::parse(&caps[1]) {
            if !methods.contains(&m) {
                methods.push(m);
            }
        }
    }
    if methods.is_empty() {
        methods.push(HttpMethod::Get);
    }
    Some(methods)
}

/// Split leading annotations off a line.
fn take_annotations<'a>(mut rest: &'a str, into: &mut Vec<TextAnnotation>) -> &'a str {
    while let Some(caps) = LEADING_ANNOTATION.captures(rest) {
        let written = &caps[1];
        into.push(TextAnnotation {
            name: written.rsplit('.').next().unwrap_or(written).to_string(),
            args: caps.get(2).map(|a| a.as_str().to_string()),
        });
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }
    rest.trim()
}

// ── Scan ─────────────────────────────────────────────────────────────────────

struct ClassState {
    name: String,
    /// `None` when the base path could not be read as a literal.
    base: Option<String>,
}

/// Scan files of `language` line by line.
pub(super) fn scan(
    tree: &SourceTree,
    language: SupportedLanguage,
    cancel: &CancelToken,
) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();
    for path in tree.files_of(language) {
        if cancel.is_cancelled() {
            debug!(
                language = language.name(),
                found = endpoints.len(),
                "spring textual pass cancelled"
            );
            break;
        }
        match tree.read(&path) {
            Ok(source) => scan_file(&path, &source, &mut endpoints),
            Err(e) => trace!(error = %e, "skipping unreadable file"),
        }
    }
    endpoints
}

fn scan_file(path: &Path, source: &str, out: &mut Vec<Endpoint>) {
    let mut pending: Vec<TextAnnotation> = Vec::new();
    let mut class: Option<ClassState> = None;

    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with("//")
            || trimmed.starts_with("/*")
            || trimmed.starts_with('*')
        {
            continue;
        }
        let rest = take_annotations(trimmed, &mut pending);
        if rest.is_empty() {
            continue;
        }

        if let Some(caps) = CLASS_DECL.captures(rest) {
            let is_controller = pending.iter().any(|a| CONTROLLERS.contains(&a.name.as_str()));
            class = is_controller.then(|| ClassState {
                name: caps[1].to_string(),
                base: match pending.iter().find(|a| a.name == "RequestMapping") {
                    Some(a) => literal_path(a.args.as_deref()),
                    None => Some(String::new()),
                },
            });
            pending.clear();
            continue;
        }

        let mapping = pending.iter().find_map(|a| verbs(a).map(|v| (a, v)));
        if let (Some((annotation, methods)), Some(state)) = (mapping, class.as_ref()) {
            let routine = KOTLIN_FUN
                .captures(rest)
                .or_else(|| JAVA_METHOD.captures(rest))
                .map(|c| c[1].to_string());
            if let (Some(routine), Some(base)) = (routine, state.base.as_deref()) {
                match literal_path(annotation.args.as_deref()) {
                    Some(member) => {
                        let full = combine(base, &member);
                        if !full.is_empty() {
                            for method in methods {
                                out.push(Endpoint::new(
                                    method,
                                    &full,
                                    state.name.as_str(),
                                    routine.as_str(),
                                    NavigationHandle::new(path, idx + 1),
                                    FrameworkTag::Spring,
                                ));
                            }
                        }
                    }
                    None => trace!(routine = %routine, "non-literal mapping path"),
                }
            }
        }
        pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_source(path: &str, source: &str) -> Vec<String> {
        let mut out = Vec::new();
        scan_file(Path::new(path), source, &mut out);
        out.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_literal_path() {
        assert_eq!(literal_path(None).as_deref(), Some(""));
        assert_eq!(literal_path(Some("\"/x\"")).as_deref(), Some("/x"));
        assert_eq!(
            literal_path(Some("value = \"/v\", produces = \"application/json\"")).as_deref(),
            Some("/v")
        );
        assert_eq!(
            literal_path(Some("produces = \"text/plain\", path = {\"/p\"}")).as_deref(),
            Some("/p")
        );
        assert_eq!(
            literal_path(Some("method = RequestMethod.POST")).as_deref(),
            Some("")
        );
        assert_eq!(literal_path(Some("Api.PREFIX + \"/x\"")), None);
        assert_eq!(literal_path(Some("Api.PREFIX")), None);
        assert_eq!(literal_path(Some("{\"/a\", \"/b\"}")).as_deref(), Some("/a"));
        assert_eq!(literal_path(Some("value = []")).as_deref(), Some(""));
    }

    #[test]
    fn test_path_never_taken_from_other_attributes() {
        assert_eq!(
            literal_path(Some("value = PREFIX, produces = \"application/json\"")),
            None
        );
        assert_eq!(
            literal_path(Some("path = [Paths.ROOT], consumes = [\"text/plain\"]")),
            None
        );
        assert_eq!(
            literal_path(Some("produces = \"application/json\"")).as_deref(),
            Some("")
        );
        assert_eq!(
            literal_path(Some("consumes = \"a,b\", value = \"/v\"")).as_deref(),
            Some("/v")
        );

        let routes = scan_source(
            "Api.java",
            r#"
@RestController
public class Api {
    @GetMapping(value = PREFIX, produces = "application/json")
    public String dynamic() { return ""; }

    @GetMapping(produces = "application/json")
    public String root() { return ""; }
}
"#,
        );
        assert!(routes.is_empty());
    }

    #[test]
    fn test_kotlin_controller() {
        let routes = scan_source(
            "OrderController.kt",
            r#"
@RestController
@RequestMapping("/orders")
class OrderController {
    // @GetMapping("/commented")
    @GetMapping
    fun list(): List<Order> = emptyList()

    @RequestMapping(value = "/{id}", method = [RequestMethod.PUT, RequestMethod.PATCH])
    fun update(@PathVariable id: Long) {}

    @GetMapping(Paths.DYNAMIC + "/x")
    fun dynamic() {}
}
"#,
        );
        assert_eq!(
            routes,
            vec![
                "GET /orders (OrderController.list)",
                "PUT /orders/{id} (OrderController.update)",
                "PATCH /orders/{id} (OrderController.update)",
            ]
        );
    }

    #[test]
    fn test_non_controller_and_inline_annotations() {
        let routes = scan_source(
            "Mixed.java",
            r#"
public class NotAController {
    @GetMapping("/ignored")
    public void ignored() {}
}

@Controller
public class Pages {
    @GetMapping("/home") public String home() { return "home"; }
}
"#,
        );
        assert_eq!(routes, vec!["GET /home (Pages.home)"]);
    }

    #[test]
    fn test_unresolvable_base_skips_class() {
        let routes = scan_source(
            "Api.kt",
            "@RestController\n@RequestMapping(ApiPaths.ROOT)\nclass Api {\n  @GetMapping(\"/x\")\n  fun x() {}\n}\n",
        );
        assert!(routes.is_empty());
    }
}
