//
//  endpoint.rs
//  RouteLens
//

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::extract::normalize_path;

/// HTTP verbs an endpoint can be declared with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Case-insensitive parse of a verb name ("get", "POST", ...).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which strategy produced an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameworkTag {
    Spring,
    FastApi,
    JaxRs,
}

impl FrameworkTag {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameworkTag::Spring => "Spring",
            FrameworkTag::FastApi => "FastAPI",
            FrameworkTag::JaxRs => "JAX-RS",
        }
    }
}

impl fmt::Display for FrameworkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where a declaration lives. Handed to whoever renders results so it can
/// jump to source; the engine itself never opens it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavigationHandle {
    file: PathBuf,
    line: usize,
}

impl NavigationHandle {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// 1-based line of the declaration.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for NavigationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One discovered route. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    method: HttpMethod,
    path: String,
    declaring_type: String,
    member_name: String,
    location: NavigationHandle,
    framework: FrameworkTag,
}

impl Endpoint {
    /// Build an endpoint. The path is normalized: it always starts with
    /// `/` and never contains `//`.
    pub fn new(
        method: HttpMethod,
        path: &str,
        declaring_type: impl Into<String>,
        member_name: impl Into<String>,
        location: NavigationHandle,
        framework: FrameworkTag,
    ) -> Self {
        Self {
            method,
            path: normalize_path(path),
            declaring_type: declaring_type.into(),
            member_name: member_name.into(),
            location,
            framework,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    pub fn location(&self) -> &NavigationHandle {
        &self.location
    }

    pub fn framework(&self) -> FrameworkTag {
        self.framework
    }

    /// Display name used for lookup and ranking: `"<METHOD> <path>"`.
    pub fn name(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Identity used when merging results from several strategies.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}.{}",
            self.method, self.path, self.declaring_type, self.member_name
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}.{})",
            self.method, self.path, self.declaring_type, self.member_name
        )
    }
}
