//! Search request options and wire bodies.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::query::{object_type_query, Query, SortSpec};

/// Search endpoint, relative to the API root.
pub const SEARCH_ENDPOINT: &str = "data/search/";

/// Largest page size the search endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Object type searched when none is given.
pub const DEFAULT_OBJECT_TYPE: &str = "lead";

/// Options for [`crate::CloseClient::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Object type the query is restricted to.
    pub object_type: String,
    /// Sort keys, applied server-side.
    pub sort: Vec<SortSpec>,
    /// Server-side cap on the total number of matches. Not a page size.
    pub results_limit: Option<u32>,
    /// Fields returned for each record.
    pub fields: Option<Vec<String>>,
    /// Page size, clamped to [`MAX_PAGE_SIZE`].
    pub limit: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            object_type: DEFAULT_OBJECT_TYPE.to_string(),
            sort: Vec::new(),
            results_limit: None,
            fields: None,
            limit: None,
        }
    }
}

impl SearchOptions {
    /// Search objects of `object_type`.
    pub fn for_object(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_results_limit(mut self, results_limit: u32) -> Self {
        self.results_limit = Some(results_limit);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn page_size(&self) -> Option<u32> {
        self.limit.map(|limit| limit.min(MAX_PAGE_SIZE))
    }
}

/// `and[object_type, query]`.
pub(crate) fn scoped(object_type: &str, query: &Query) -> Query {
    Query::And {
        queries: vec![object_type_query(object_type), query.clone()],
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchBody<'a> {
    pub query: Query,
    pub sort: &'a [SortSpec],
    pub results_limit: Option<u32>,
    #[serde(rename = "_fields")]
    pub fields: Option<Map<String, Value>>,
    #[serde(rename = "_limit")]
    pub limit: Option<u32>,
    pub cursor: Option<Value>,
}

impl<'a> SearchBody<'a> {
    pub(crate) fn new(query: &Query, options: &'a SearchOptions) -> Self {
        let fields = options.fields.as_ref().map(|fields| {
            let mut by_type = Map::new();
            by_type.insert(
                options.object_type.clone(),
                Value::Array(fields.iter().cloned().map(Value::String).collect()),
            );
            by_type
        });

        Self {
            query: scoped(&options.object_type, query),
            sort: &options.sort,
            results_limit: options.results_limit,
            fields,
            limit: options.page_size(),
            cursor: None,
        }
    }
}

/// A cursor continues the search unless it is absent, null, `""` or
/// `false`. Anything else is echoed back untouched.
pub(crate) fn continuation(cursor: Option<&Value>) -> Option<&Value> {
    match cursor? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CountBody {
    pub query: Query,
    pub include_counts: bool,
    pub results_limit: u32,
}

impl CountBody {
    pub(crate) fn new(query: &Query, object_type: &str) -> Self {
        Self {
            query: scoped(object_type, query),
            include_counts: true,
            results_limit: 0,
        }
    }
}
