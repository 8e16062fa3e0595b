use reqwest::{Client, Request};
use serde::de::DeserializeOwned;

use crate::services::fetch::{FetchError, FetchSpec};

/// Build the GET for a spec, applying its mutator
pub(crate) fn prepare(client: &Client, spec: &FetchSpec) -> Result<Request, FetchError> {
    let mut builder = client.get(&spec.url);
    if let Some(mutator) = &spec.mutator {
        builder = mutator(builder);
    }

    builder.build().map_err(|source| FetchError::RequestBuild {
        url: spec.url.clone(),
        source,
    })
}

/// Fetch a single URL and decode its JSON body into `T`.
///
/// No retries happen here. The response is owned by this call and is
/// dropped on every return path.
pub async fn fetch<T: DeserializeOwned>(client: &Client, spec: &FetchSpec) -> Result<T, FetchError> {
    let request = prepare(client, spec)?;

    tracing::debug!("GET {}", spec.url);
    let response = client
        .execute(request)
        .await
        .map_err(|source| FetchError::Transport {
            url: spec.url.clone(),
            source,
        })?;

    let status = response.status();
    if let Some(expected) = spec.status_mismatch(status) {
        return Err(FetchError::StatusMismatch {
            url: spec.url.clone(),
            status,
            expected,
        });
    }

    let body = response.bytes().await.map_err(|source| FetchError::Transport {
        url: spec.url.clone(),
        source,
    })?;

    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
        url: spec.url.clone(),
        source,
    })
}
