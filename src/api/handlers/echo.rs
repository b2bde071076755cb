use crate::utils::form_values;
use axum::{http::Uri, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct Echo {
    url: String,
    query_keys: Vec<String>,
    values: BTreeMap<String, Vec<String>>,
}

/// Debug route: reflect the request URL and its query values.
pub async fn echo(uri: Uri) -> Json<Echo> {
    debug!("echo {uri}");
    let values = form_values(uri.query().unwrap_or_default());
    Json(Echo {
        url: uri.to_string(),
        query_keys: values.keys().cloned().collect(),
        values,
    })
}
