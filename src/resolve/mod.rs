//! Path expression resolution.
//!
//! Route markers carry their path as an expression: a literal, a `+`
//! concatenation, or a reference to a named constant. [`PathResolver`]
//! reduces such an expression to a literal string, or reports it as
//! unresolved. Evaluation is pure and never fails; self-referential or
//! mutually-referential constants terminate as unresolved.

use std::collections::HashSet;

use tracing::trace;

/// A route-path argument in the shape the resolver understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    Literal(String),
    /// `left + right`
    Concat(Box<PathExpr>, Box<PathExpr>),
    Reference(SymbolRef),
    /// Anything else (method calls, ternaries, ...). Carries the source text
    /// for diagnostics.
    Unsupported(String),
}

impl PathExpr {
    pub fn literal(value: impl Into<String>) -> Self {
        PathExpr::Literal(value.into())
    }

    pub fn concat(left: PathExpr, right: PathExpr) -> Self {
        PathExpr::Concat(Box::new(left), Box::new(right))
    }

    pub fn reference(qualifier: Option<&str>, name: &str) -> Self {
        PathExpr::Reference(SymbolRef {
            qualifier: qualifier.map(str::to_string),
            name: name.to_string(),
        })
    }
}

/// A possibly qualified name: `PREFIX`, `Api.PREFIX`, `com.acme.Api.PREFIX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    pub qualifier: Option<String>,
    pub name: String,
}

/// Where an expression appears: which file, inside which types
/// (outermost first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub file: usize,
    pub enclosing: Vec<String>,
}

/// Stable identity of a declaration inside one source model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub usize);

/// What the resolver needs to know about a referenced declaration.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    pub id: DeclId,
    /// Immutable and known at compile time (`static final` and friends).
    pub constant: bool,
    pub initializer: Option<&'a PathExpr>,
    /// Scope the initializer must be evaluated in.
    pub scope: &'a Scope,
}

/// Symbol resolution capability of a source model.
pub trait SymbolLookup {
    fn lookup(&self, symbol: &SymbolRef, scope: &Scope) -> Option<Declaration<'_>>;
}

/// Reduces [`PathExpr`] values to literal strings.
pub struct PathResolver<'a, L: SymbolLookup + ?Sized> {
    symbols: &'a L,
    max_depth: usize,
}

impl<'a, L: SymbolLookup + ?Sized> PathResolver<'a, L> {
    pub fn new(symbols: &'a L, max_depth: usize) -> Self {
        Self { symbols, max_depth }
    }

    /// Returns the literal value, or `None` when the expression is
    /// unresolved.
    pub fn resolve(&self, expr: &PathExpr, scope: &Scope) -> Option<String> {
        let mut visiting = HashSet::new();
        self.eval(expr, scope, &mut visiting, 0)
    }

    fn eval(
        &self,
        expr: &PathExpr,
        scope: &Scope,
        visiting: &mut HashSet<DeclId>,
        depth: usize,
    ) -> Option<String> {
        if depth > self.max_depth {
            trace!(depth, "path expression exceeds resolution depth");
            return None;
        }

        match expr {
            PathExpr::Literal(value) => Some(value.clone()),
            PathExpr::Concat(left, right) => {
                let mut out = self.eval(left, scope, visiting, depth + 1)?;
                out.push_str(&self.eval(right, scope, visiting, depth + 1)?);
                Some(out)
            }
            PathExpr::Reference(symbol) => {
                let decl = self.symbols.lookup(symbol, scope)?;
                if !decl.constant {
                    trace!(name = %symbol.name, "reference to non-constant declaration");
                    return None;
                }
                let init = decl.initializer?;
                if !visiting.insert(decl.id) {
                    trace!(name = %symbol.name, "constant cycle");
                    return None;
                }
                let value = self.eval(init, decl.scope, visiting, depth + 1);
                visiting.remove(&decl.id);
                value
            }
            PathExpr::Unsupported(text) => {
                trace!(expr = %text, "unsupported path expression");
                None
            }
        }
    }
}
