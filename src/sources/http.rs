// src/sources/http.rs
//! Reqwest-backed upstream client. One base URL serves all domains:
//! `GET {base}/{domain}?lat&lng&radius` returning a JSON array of documents
//! (or an object with a `data` array).

use anyhow::{anyhow, Context, Result};

use crate::sources::DataSource;
use crate::types::{ContentDomain, Location};

pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn unwrap_documents(body: serde_json::Value) -> Result<Vec<serde_json::Value>> {
        match body {
            serde_json::Value::Array(docs) => Ok(docs),
            serde_json::Value::Object(mut obj) => match obj.remove("data") {
                Some(serde_json::Value::Array(docs)) => Ok(docs),
                _ => Err(anyhow!("upstream response object has no `data` array")),
            },
            _ => Err(anyhow!("upstream response is neither array nor object")),
        }
    }
}

#[async_trait::async_trait]
impl DataSource for HttpSource {
    async fn fetch(
        &self,
        domain: ContentDomain,
        origin: &Location,
        radius_km: f64,
    ) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/{}", self.base_url, domain);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", origin.latitude.to_string()),
                ("lng", origin.longitude.to_string()),
                ("radius", radius_km.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let resp = resp
            .error_for_status()
            .with_context(|| format!("upstream status for {url}"))?;

        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("decoding upstream body from {url}"))?;
        Self::unwrap_documents(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_bare_arrays_and_data_envelopes() {
        let bare = serde_json::json!([{"id": "a"}]);
        assert_eq!(HttpSource::unwrap_documents(bare).unwrap().len(), 1);

        let envelope = serde_json::json!({"data": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(HttpSource::unwrap_documents(envelope).unwrap().len(), 2);

        let bogus = serde_json::json!("nope");
        assert!(HttpSource::unwrap_documents(bogus).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let src = HttpSource::new("http://upstream.local/");
        assert_eq!(src.base_url, "http://upstream.local");
    }
}
