use serde_json::{json, Value};
use std::sync::Arc;

use cove_core::result::{reconcile_missing_keys, ViewResponse};
use cove_core::{Document, InvalidArgument, QueryOptions, QueryResult};

use crate::transport::{HttpTransport, Method, Request, Response, Transport};
use crate::{ClientConfig, ClientError, DesignDocument, Result};

/// CoveDb REST API client.
///
/// One logical query is one request/response round trip; reconciliation of
/// sparse view responses runs in-process afterwards. Failed queries surface
/// immediately, never retried here.
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client from caller-owned configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new(config)?),
        })
    }

    /// Create a client over an existing transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Query a view stored in a design document.
    ///
    /// Without keys this is a plain GET with `options` in the query string.
    /// With keys the request switches to POST carrying `{"keys": [...]}` —
    /// key lists can exceed URL length limits — while remaining a logical
    /// read; `options` still travel in the query string.
    ///
    /// When `options.include_missing_keys` is set and keys were supplied,
    /// the returned result has exactly one row per requested key, in request
    /// order, with placeholder rows for keys the server did not match.
    pub async fn query_view(
        &self,
        db: &str,
        design: &str,
        view: &str,
        keys: Option<&[Value]>,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        require_name(db, "database name")?;
        require_name(design, "design document name")?;
        require_name(view, "view name")?;

        let path = format!("/{db}/_design/{design}/_view/{view}");
        self.run_view_query(&path, keys, options).await
    }

    /// Query the built-in all-documents view. Same contract as
    /// [`query_view`](Self::query_view).
    pub async fn query_all_docs(
        &self,
        db: &str,
        keys: Option<&[Value]>,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        require_name(db, "database name")?;
        self.run_view_query(&format!("/{db}/_all_docs"), keys, options)
            .await
    }

    /// Query an ad-hoc view whose map/reduce source is sent inline instead
    /// of referencing a stored design document. The server only accepts this
    /// from admin users; that is not enforced client-side.
    pub async fn query_temp_view(
        &self,
        db: &str,
        map: &str,
        reduce: Option<&str>,
        language: Option<&str>,
        keys: Option<&[Value]>,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        require_name(db, "database name")?;
        require_name(map, "map function")?;

        let mut body = serde_json::Map::new();
        body.insert("map".to_string(), json!(map));
        if let Some(reduce) = reduce {
            body.insert("reduce".to_string(), json!(reduce));
        }
        if let Some(language) = language {
            body.insert("language".to_string(), json!(language));
        }
        if let Some(keys) = keys.filter(|k| !k.is_empty()) {
            body.insert("keys".to_string(), json!(keys));
        }

        let request = Request::new(Method::Post, format!("/{db}/_temp_view"))
            .with_query(options.query_pairs()?)
            .with_body(Value::Object(body));
        self.finish_view_query(request, keys, options).await
    }

    async fn run_view_query(
        &self,
        path: &str,
        keys: Option<&[Value]>,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        let keys = keys.filter(|k| !k.is_empty());
        let query = options.query_pairs()?;

        let request = match keys {
            // Key lists ride in the body; the query is still a logical read
            Some(keys) => Request::new(Method::Post, path)
                .with_query(query)
                .with_body(json!({ "keys": keys })),
            None => Request::new(Method::Get, path).with_query(query),
        };
        self.finish_view_query(request, keys, options).await
    }

    async fn finish_view_query(
        &self,
        request: Request,
        keys: Option<&[Value]>,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(remote_error(response));
        }

        let mut decoded: ViewResponse = serde_json::from_value(response.body)?;
        if options.include_missing_keys {
            if let Some(keys) = keys {
                decoded.rows = reconcile_missing_keys(keys, decoded.rows);
            }
        }
        Ok(QueryResult::from(decoded))
    }

    /// Store a design document, returning the new revision. Pass the current
    /// `_rev` on the document when updating.
    pub async fn put_design_document(&self, db: &str, doc: &DesignDocument) -> Result<String> {
        require_name(db, "database name")?;

        let request = Request::new(Method::Put, format!("/{db}/{}", doc.id))
            .with_body(serde_json::to_value(doc)?);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(remote_error(response));
        }

        let rev = response
            .body
            .get("rev")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        tracing::debug!(id = %doc.id, %rev, "stored design document");
        Ok(rev)
    }

    /// Fetch a design document by name; `None` when it does not exist.
    pub async fn get_design_document(&self, db: &str, name: &str) -> Result<Option<DesignDocument>> {
        require_name(db, "database name")?;
        require_name(name, "design document name")?;

        let request = Request::new(Method::Get, format!("/{db}/_design/{name}"));
        let response = self.transport.send(request).await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(remote_error(response));
        }
        Ok(Some(serde_json::from_value(response.body)?))
    }

    /// Fetch a document by id; `None` when it does not exist.
    pub async fn get_document(&self, db: &str, id: &str) -> Result<Option<Document>> {
        require_name(db, "database name")?;
        require_name(id, "document id")?;

        let request = Request::new(Method::Get, format!("/{db}/{id}"));
        let response = self.transport.send(request).await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(remote_error(response));
        }
        Ok(Some(Document::from_value(response.body)?))
    }

    /// Store a document under the given id, returning the new revision.
    pub async fn save_document(&self, db: &str, id: &str, body: &Value) -> Result<String> {
        require_name(db, "database name")?;
        require_name(id, "document id")?;

        let request = Request::new(Method::Put, format!("/{db}/{id}")).with_body(body.clone());
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(remote_error(response));
        }
        Ok(response
            .body
            .get("rev")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Delete a document at the given revision.
    pub async fn delete_document(&self, db: &str, id: &str, rev: &str) -> Result<()> {
        require_name(db, "database name")?;
        require_name(id, "document id")?;
        require_name(rev, "document revision")?;

        let request = Request::new(Method::Delete, format!("/{db}/{id}"))
            .with_query(vec![("rev".to_string(), rev.to_string())]);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(remote_error(response));
        }
        Ok(())
    }
}

fn require_name(value: &str, what: &str) -> std::result::Result<(), InvalidArgument> {
    if value.is_empty() {
        Err(InvalidArgument(format!("{what} cannot be empty")))
    } else {
        Ok(())
    }
}

/// Convert a non-success response into [`ClientError::Remote`], carrying the
/// server's error code and reason unmodified.
fn remote_error(response: Response) -> ClientError {
    let error = response
        .body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let reason = response
        .body
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    ClientError::Remote {
        status: response.status,
        error,
        reason,
    }
}
