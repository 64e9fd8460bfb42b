use serde_json::Value;

/// View index staleness tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleMode {
    /// Serve from the current index without updating it.
    Ok,
    /// Serve from the current index, then update it in the background.
    UpdateAfter,
}

impl StaleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaleMode::Ok => "ok",
            StaleMode::UpdateAfter => "update_after",
        }
    }
}

/// Options for one view or all-docs query.
///
/// All options except `include_missing_keys` are forwarded verbatim to the
/// server's query string. `include_missing_keys` is client-local: it asks
/// the client to synthesize placeholder rows for requested keys the server
/// returned no match for, and is never sent over the wire.
///
/// The server rejects multi-key queries against a reduce view unless exact
/// grouping (`group(true)`) is requested; the client forwards that rejection
/// rather than pre-validating it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub group: Option<bool>,
    pub group_level: Option<u32>,
    pub reduce: Option<bool>,
    pub include_docs: Option<bool>,
    pub descending: Option<bool>,
    pub inclusive_end: Option<bool>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub stale: Option<StaleMode>,
    pub key: Option<Value>,
    pub start_key: Option<Value>,
    pub end_key: Option<Value>,
    pub include_missing_keys: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group reduce output by exact key.
    pub fn group(mut self, group: bool) -> Self {
        self.group = Some(group);
        self
    }

    /// Group reduce output on the first `level` elements of array keys.
    pub fn group_level(mut self, level: u32) -> Self {
        self.group_level = Some(level);
        self
    }

    /// Run (or skip) the view's reduce function.
    pub fn reduce(mut self, reduce: bool) -> Self {
        self.reduce = Some(reduce);
        self
    }

    /// Embed the full source document in each row.
    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = Some(include);
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    pub fn inclusive_end(mut self, inclusive: bool) -> Self {
        self.inclusive_end = Some(inclusive);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn stale(mut self, mode: StaleMode) -> Self {
        self.stale = Some(mode);
        self
    }

    /// Restrict the query to a single key.
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn start_key(mut self, key: impl Into<Value>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn end_key(mut self, key: impl Into<Value>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    /// Synthesize placeholder rows for requested keys missing from the
    /// response. Client-local; never forwarded to the server.
    pub fn include_missing_keys(mut self, include: bool) -> Self {
        self.include_missing_keys = include;
        self
    }

    /// Flatten into query-string pairs. JSON-typed values (`key`,
    /// `start_key`, `end_key`) are JSON-encoded as the server expects.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut pairs = Vec::new();

        if let Some(group) = self.group {
            pairs.push(("group".to_string(), group.to_string()));
        }
        if let Some(level) = self.group_level {
            pairs.push(("group_level".to_string(), level.to_string()));
        }
        if let Some(reduce) = self.reduce {
            pairs.push(("reduce".to_string(), reduce.to_string()));
        }
        if let Some(include_docs) = self.include_docs {
            pairs.push(("include_docs".to_string(), include_docs.to_string()));
        }
        if let Some(descending) = self.descending {
            pairs.push(("descending".to_string(), descending.to_string()));
        }
        if let Some(inclusive) = self.inclusive_end {
            pairs.push(("inclusive_end".to_string(), inclusive.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip".to_string(), skip.to_string()));
        }
        if let Some(stale) = self.stale {
            pairs.push(("stale".to_string(), stale.as_str().to_string()));
        }
        if let Some(key) = &self.key {
            pairs.push(("key".to_string(), serde_json::to_string(key)?));
        }
        if let Some(key) = &self.start_key {
            pairs.push(("startkey".to_string(), serde_json::to_string(key)?));
        }
        if let Some(key) = &self.end_key {
            pairs.push(("endkey".to_string(), serde_json::to_string(key)?));
        }

        Ok(pairs)
    }
}
