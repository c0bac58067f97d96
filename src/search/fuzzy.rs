//
//  fuzzy.rs
//  RouteLens
//

use std::collections::HashSet;

const EXACT: f64 = 1000.0;
const PREFIX: f64 = 500.0;
const SUBSTRING: f64 = 300.0;
const CONSECUTIVE: f64 = 50.0;
const SEQUENTIAL: f64 = 20.0;
const CHARACTERS: f64 = 5.0;
const PATH_SEGMENT: f64 = 30.0;
const HTTP_VERB: f64 = 100.0;
const LENGTH_PENALTY: f64 = 0.1;

const VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options"];

/// Filter and order `items` by relevance to `query`.
///
/// A blank query returns the items unchanged. Otherwise items scoring
/// zero are dropped and the rest are sorted by descending score; equal
/// scores keep their input order. Exact matches always come first, ahead
/// of any accumulated score.
pub fn rank<T>(items: &[T], query: &str) -> Vec<T>
where
    T: AsRef<str> + Clone,
{
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return items.to_vec();
    }

    let mut scored: Vec<(bool, f64, &T)> = items
        .iter()
        .map(|item| {
            let text = item.as_ref();
            let exact = text.to_lowercase() == query;
            (exact, score_normalized(text, &query), item)
        })
        .filter(|(_, score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.total_cmp(&a.1)));
    scored.into_iter().map(|(_, _, item)| item.clone()).collect()
}

/// Relevance of one item. Zero means no match.
pub fn score(item: &str, query: &str) -> f64 {
    score_normalized(item, &query.trim().to_lowercase())
}

fn score_normalized(item: &str, query: &str) -> f64 {
    if item.is_empty() || query.is_empty() {
        return 0.0;
    }
    let item = item.to_lowercase();
    if item == query {
        return EXACT;
    }

    let item_chars: Vec<char> = item.chars().collect();
    let query_chars: Vec<char> = query.chars().collect();

    let mut score = 0.0;
    if item.starts_with(query) {
        score += PREFIX;
    }
    if item.contains(query) {
        score += SUBSTRING;
    }
    score += consecutive_ratio(&item_chars, &query_chars) * CONSECUTIVE;
    score += sequential_ratio(&item_chars, &query_chars) * SEQUENTIAL;
    score += character_ratio(&item_chars, &query_chars) * CHARACTERS;
    score += path_segment_ratio(&item, query) * PATH_SEGMENT;
    if verb_matches(&item, query) {
        score += HTTP_VERB;
    }

    if score > 0.0 {
        let excess = item_chars.len().saturating_sub(query_chars.len()) as f64;
        score = (score - excess * LENGTH_PENALTY).max(1.0);
    }
    score
}

/// Longest run of query characters matched back to back while walking the
/// item. The query position advances only on a match and is not rewound
/// when a run breaks.
fn consecutive_ratio(item: &[char], query: &[char]) -> f64 {
    let mut qi = 0;
    let mut run = 0usize;
    let mut best = 0usize;
    for &c in item {
        if qi >= query.len() {
            break;
        }
        if c == query[qi] {
            run += 1;
            qi += 1;
        } else {
            best = best.max(run);
            run = 0;
        }
    }
    best.max(run) as f64 / query.len() as f64
}

/// Fraction of the query found in order as a subsequence.
fn sequential_ratio(item: &[char], query: &[char]) -> f64 {
    let mut qi = 0;
    for &c in item {
        if qi < query.len() && c == query[qi] {
            qi += 1;
        }
    }
    qi as f64 / query.len() as f64
}

/// Fraction of distinct query characters present anywhere in the item.
fn character_ratio(item: &[char], query: &[char]) -> f64 {
    let present: HashSet<char> = item.iter().copied().collect();
    let wanted: HashSet<char> = query.iter().copied().collect();
    let hits = wanted.iter().filter(|c| present.contains(*c)).count();
    hits as f64 / wanted.len() as f64
}

/// Best `query / segment` length ratio over path segments containing the
/// query.
fn path_segment_ratio(item: &str, query: &str) -> f64 {
    let Some(path) = display_path(item) else {
        return 0.0;
    };
    let qlen = query.chars().count() as f64;
    path.split('/')
        .filter(|seg| !seg.is_empty() && seg.contains(query))
        .map(|seg| qlen / seg.chars().count() as f64)
        .fold(0.0, f64::max)
}

/// The path part of `"GET /api/users (UserController.list)"` or
/// `"GET /api/users"`.
fn display_path(item: &str) -> Option<&str> {
    let space = item.find(' ').filter(|&i| i > 0)?;
    let rest = &item[space + 1..];
    let path = match rest.find('(') {
        Some(paren) => &rest[..paren],
        None => rest,
    };
    let path = path.trim();
    (!path.is_empty()).then_some(path)
}

/// The query abbreviates some verb that the item contains.
fn verb_matches(item: &str, query: &str) -> bool {
    VERBS
        .iter()
        .any(|verb| verb.starts_with(query) && item.contains(verb))
}

/// Wrap the characters of `text` that match `query` as an in-order
/// subsequence (case-insensitive) in `open`/`close`.
pub fn highlight(text: &str, query: &str, open: &str, close: &str) -> String {
    let query: Vec<char> = query.trim().to_lowercase().chars().collect();
    if query.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + query.len() * (open.len() + close.len()));
    let mut qi = 0;
    for c in text.chars() {
        let matches = qi < query.len() && c.to_lowercase().eq(std::iter::once(query[qi]));
        if matches {
            out.push_str(open);
            out.push(c);
            out.push_str(close);
            qi += 1;
        } else {
            out.push(c);
        }
    }
    out
}
