use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::{FunctionKind, InvalidArgument, ValidationError};
use crate::script::{strip_escapes, Script, EMBEDDED_DIALECT};

/// Server-provided reduce implementations, referenced by marker instead of
/// source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltInReduce {
    Count,
    Sum,
    Stats,
}

impl BuiltInReduce {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltInReduce::Count => "_count",
            BuiltInReduce::Sum => "_sum",
            BuiltInReduce::Stats => "_stats",
        }
    }
}

/// A view's reduce slot: user source text or a built-in aggregate marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduce {
    Source(String),
    BuiltIn(BuiltInReduce),
}

impl Reduce {
    /// Text form stored in the design document.
    pub fn as_str(&self) -> &str {
        match self {
            Reduce::Source(source) => source,
            Reduce::BuiltIn(builtin) => builtin.as_str(),
        }
    }
}

/// In-memory definition of one view: map function, optional reduce, and
/// per-view options, as stored inside a design document's `views` member.
///
/// A definition is usable ("consistent") once it has a non-empty name and a
/// map function. A reduce function alone never makes a valid view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    name: String,
    /// None means the view inherits the containing document's language.
    language: Option<String>,
    map: Option<String>,
    reduce: Option<Reduce>,
    options: BTreeMap<String, Value>,
}

impl ViewDefinition {
    /// Create a definition inheriting the design document's language.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidArgument> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidArgument("view name cannot be empty".to_string()));
        }
        Ok(Self {
            name,
            language: None,
            map: None,
            reduce: None,
            options: BTreeMap::new(),
        })
    }

    /// Create a definition with an explicit per-view language.
    pub fn with_language(
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, InvalidArgument> {
        let mut view = Self::new(name)?;
        view.language = Some(language.into());
        Ok(view)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit per-view language, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn map_function(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn reduce_function(&self) -> Option<&Reduce> {
        self.reduce.as_ref()
    }

    /// Language the view functions are validated as. An inherited language
    /// resolves to the embedded dialect, the server's default.
    fn effective_language(&self) -> &str {
        self.language.as_deref().unwrap_or(EMBEDDED_DIALECT)
    }

    /// Set the map function from source text.
    ///
    /// The input is un-escaped, then validated when the view's language has
    /// a client-side validator. On failure the previous map function is left
    /// unchanged.
    pub fn set_map_function(&mut self, source: &str) -> Result<(), ValidationError> {
        let source = strip_escapes(source);
        Script::new(self.effective_language(), source.as_str()).check(FunctionKind::Map)?;
        self.map = Some(source);
        Ok(())
    }

    /// Set the reduce function from source text. Same contract as
    /// [`set_map_function`](Self::set_map_function).
    pub fn set_reduce_function(&mut self, source: &str) -> Result<(), ValidationError> {
        let source = strip_escapes(source);
        Script::new(self.effective_language(), source.as_str()).check(FunctionKind::Reduce)?;
        self.reduce = Some(Reduce::Source(source));
        Ok(())
    }

    /// Use the server's built-in row-count aggregate as the reduce function.
    pub fn use_built_in_count(&mut self) {
        self.reduce = Some(Reduce::BuiltIn(BuiltInReduce::Count));
    }

    /// Use the server's built-in numeric sum aggregate as the reduce function.
    pub fn use_built_in_sum(&mut self) {
        self.reduce = Some(Reduce::BuiltIn(BuiltInReduce::Sum));
    }

    /// Use the server's built-in statistics aggregate (sum/count/min/max/sumsqr).
    pub fn use_built_in_stats(&mut self) {
        self.reduce = Some(Reduce::BuiltIn(BuiltInReduce::Stats));
    }

    /// Set a per-view server option, e.g. `local_seq` or `include_design`.
    pub fn set_option(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), InvalidArgument> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidArgument("option name cannot be empty".to_string()));
        }
        self.options.insert(name, value.into());
        Ok(())
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Whether this definition can be persisted: non-empty name and a map
    /// function present.
    pub fn is_consistent(&self) -> bool {
        !self.name.is_empty() && self.map.as_deref().is_some_and(|m| !m.is_empty())
    }

    /// Clear map, reduce, and options back to empty, keeping name and
    /// language. Used when re-populating a definition loaded from storage so
    /// stale handlers do not accumulate across runs.
    pub fn reset(&mut self) {
        self.map = None;
        self.reduce = None;
        self.options.clear();
    }

    /// Serialize to the `views.<name>` fragment of a design document:
    /// `{map, language?, reduce?, options?}`. Absence of `reduce`
    /// distinguishes a map-only view from a map-reduce view, so empty fields
    /// are omitted rather than serialized as null.
    pub fn to_fragment(&self) -> Result<Value, InvalidArgument> {
        let map = self.map.as_deref().filter(|m| !m.is_empty()).ok_or_else(|| {
            InvalidArgument(format!("view '{}' has no map function", self.name))
        })?;

        let mut fragment = serde_json::Map::new();
        fragment.insert("map".to_string(), json!(map));
        if let Some(language) = &self.language {
            fragment.insert("language".to_string(), json!(language));
        }
        if let Some(reduce) = &self.reduce {
            fragment.insert("reduce".to_string(), json!(reduce.as_str()));
        }
        if !self.options.is_empty() {
            fragment.insert("options".to_string(), json!(self.options));
        }
        Ok(Value::Object(fragment))
    }
}

/// A design document: the container persisted to the server holding named
/// views and the default language for their functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub language: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub views: serde_json::Map<String, Value>,
}

impl DesignDocument {
    /// Create an empty design document `_design/<name>` in the embedded
    /// dialect.
    pub fn new(name: impl AsRef<str>) -> Result<Self, InvalidArgument> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(InvalidArgument(
                "design document name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: format!("_design/{name}"),
            rev: None,
            language: EMBEDDED_DIALECT.to_string(),
            views: serde_json::Map::new(),
        })
    }

    /// Insert or replace a view. Inconsistent definitions are rejected
    /// rather than persisted as unusable views.
    pub fn insert_view(&mut self, view: &ViewDefinition) -> Result<(), InvalidArgument> {
        let fragment = view.to_fragment()?;
        self.views.insert(view.name().to_string(), fragment);
        Ok(())
    }

    /// Remove a view by name, returning whether it was present.
    pub fn remove_view(&mut self, name: &str) -> bool {
        self.views.remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = "function(doc) capturing (emit) { emit(doc.kind, 1); }";
    const REDUCE: &str = "function(keys, values, rereduce) { return sum(values); }";

    #[test]
    fn test_empty_name_rejected() {
        assert!(ViewDefinition::new("").is_err());
        assert!(DesignDocument::new("").is_err());
    }

    #[test]
    fn test_consistency_predicate() {
        let mut view = ViewDefinition::new("by_kind").unwrap();
        assert!(!view.is_consistent());

        // A reduce alone never makes the view usable
        view.use_built_in_count();
        assert!(!view.is_consistent());

        view.set_map_function(MAP).unwrap();
        assert!(view.is_consistent());

        view.reset();
        assert!(!view.is_consistent());
    }

    #[test]
    fn test_validation_gating_preserves_previous_value() {
        let mut view = ViewDefinition::new("by_kind").unwrap();
        view.set_map_function(MAP).unwrap();

        let err = view.set_map_function("function($x){ $emit($x); }");
        assert!(matches!(err, Err(ValidationError::Shape { .. })));
        assert_eq!(view.map_function(), Some(MAP));

        // Broken syntax fails before shape is considered
        let err = view.set_map_function("function(doc) capturing (emit) { emit(1); ");
        assert!(matches!(err, Err(ValidationError::Syntax { .. })));
        assert_eq!(view.map_function(), Some(MAP));
    }

    #[test]
    fn test_non_dialect_language_skips_validation() {
        let mut view = ViewDefinition::with_language("by_kind", "javascript").unwrap();
        view.set_map_function("function(doc) { emit(doc._id, null); }")
            .unwrap();
        assert!(view.is_consistent());
    }

    #[test]
    fn test_escaped_input_is_unescaped_before_storage() {
        let mut view = ViewDefinition::new("by_kind").unwrap();
        view.set_map_function(
            r#"function(doc) capturing (emit) { emit(\"post\", 1); }"#,
        )
        .unwrap();
        assert_eq!(
            view.map_function(),
            Some(r#"function(doc) capturing (emit) { emit("post", 1); }"#)
        );
    }

    #[test]
    fn test_built_ins_bypass_validation() {
        let mut view = ViewDefinition::new("totals").unwrap();
        view.set_map_function(MAP).unwrap();
        view.use_built_in_stats();
        assert_eq!(
            view.reduce_function().map(Reduce::as_str),
            Some("_stats")
        );
    }

    #[test]
    fn test_fragment_field_presence() {
        let mut view = ViewDefinition::new("by_kind").unwrap();
        view.set_map_function(MAP).unwrap();

        // Map-only view: no reduce, language, or options members at all
        let fragment = view.to_fragment().unwrap();
        assert_eq!(fragment, serde_json::json!({ "map": MAP }));

        view.set_reduce_function(REDUCE).unwrap();
        view.set_option("local_seq", true).unwrap();
        let fragment = view.to_fragment().unwrap();
        assert_eq!(
            fragment,
            serde_json::json!({
                "map": MAP,
                "reduce": REDUCE,
                "options": { "local_seq": true },
            })
        );

        // Explicit language is carried into the fragment
        let mut view = ViewDefinition::with_language("js_view", "javascript").unwrap();
        view.set_map_function("function(doc) { emit(null, null); }")
            .unwrap();
        let fragment = view.to_fragment().unwrap();
        assert_eq!(fragment["language"], "javascript");
    }

    #[test]
    fn test_fragment_requires_consistency() {
        let mut view = ViewDefinition::new("broken").unwrap();
        view.use_built_in_sum();
        assert!(view.to_fragment().is_err());

        let mut doc = DesignDocument::new("blog").unwrap();
        assert!(doc.insert_view(&view).is_err());
        assert!(doc.views.is_empty());
    }

    #[test]
    fn test_design_document_round_trip() {
        let mut view = ViewDefinition::new("by_kind").unwrap();
        view.set_map_function(MAP).unwrap();
        view.use_built_in_count();

        let mut doc = DesignDocument::new("blog").unwrap();
        doc.insert_view(&view).unwrap();

        let body = serde_json::to_value(&doc).unwrap();
        assert_eq!(body["_id"], "_design/blog");
        assert_eq!(body["language"], EMBEDDED_DIALECT);
        assert_eq!(body["views"]["by_kind"]["reduce"], "_count");
        assert!(body.get("_rev").is_none());

        let parsed: DesignDocument = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.views.len(), 1);
        assert!(doc.remove_view("by_kind"));
        assert!(!doc.remove_view("by_kind"));
    }
}
