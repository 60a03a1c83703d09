use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ScrapeError;

/// Shared HTTP access to one Typesense node's introspection endpoints.
///
/// The credential header and request timeout are installed on the underlying
/// `reqwest::Client` by the caller; this type only addresses endpoints and
/// classifies failures.
#[derive(Clone)]
pub struct TypesenseClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TypesenseClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Upstream identity used as the `cluster` label value.
    pub fn cluster(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn endpoint_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    /// One GET against `{base}{path}`, decoded as JSON.
    ///
    /// Send failures map to `Transport`, non-2xx responses to `Status`, and
    /// body-read or decode failures to `Parse`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScrapeError> {
        let url = self.endpoint_url(path);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ScrapeError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|err| ScrapeError::Parse {
            url: url.to_string(),
            reason: format!("failed to read body: {err}"),
        })?;

        serde_json::from_slice(&body).map_err(|err| ScrapeError::Parse {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}
