//! The Span node and its derived SpanPath, per the data model.

use std::fmt;

/// A Span node as stored in the graph. `name`, `timestamp_us`, and
/// `duration_us` are `None` for a placeholder created only because a child
/// referenced this id as its parent before the parent's own document arrived
/// (see [`crate::ingest`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub id: String,
    pub trace_id: Option<String>,
    pub name: Option<String>,
    pub timestamp_us: Option<i64>,
    pub duration_us: Option<i64>,
}

impl Span {
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trace_id: None,
            name: None,
            timestamp_us: None,
            duration_us: None,
        }
    }
}

/// An ordered sequence of operation names identifying a chain of
/// parent -> child spans by name. Different concrete span chains sharing the
/// same name sequence are aggregated by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanPath(pub Vec<String>);

impl SpanPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SpanPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" > "))
    }
}
