//! View Query Example
//!
//! Defines a map/reduce view, stores it, and queries it with a key list,
//! letting the client synthesize rows for keys the server has no data for.
//!
//! Run with: cargo run --example view_queries

use cove_rs::{Client, ClientConfig, DesignDocument, QueryOptions, ViewDefinition};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::new(&ClientConfig::new("http://localhost:5984"))?;

    // Define a view counting posts per kind
    let mut view = ViewDefinition::new("by_kind")?;
    view.set_map_function("function(doc) capturing (emit) { emit(doc.kind, 1); }")?;
    view.use_built_in_count();

    let mut design = DesignDocument::new("blog")?;
    design.insert_view(&view)?;

    let rev = client.put_design_document("blog", &design).await?;
    println!("stored _design/blog at revision {rev}");

    // Query three kinds; kinds with no posts come back as placeholder rows
    let keys = vec![json!("post"), json!("draft"), json!("page")];
    let result = client
        .query_view(
            "blog",
            "blog",
            "by_kind",
            Some(&keys),
            &QueryOptions::new().group(true).include_missing_keys(true),
        )
        .await?;

    for row in &result {
        if row.value.is_null() {
            println!("{}: no rows", row.key);
        } else {
            println!("{}: {}", row.key, row.value);
        }
    }

    Ok(())
}
