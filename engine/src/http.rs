//! HTTP transport for the collaboration endpoint.
//!
//! Updates are posted as JSON to
//! `{base_url}/api/workspace/{workspace_id}/collab/{object_id}/web-update`.

use crate::config::HttpConfig;
use crate::context::CollabType;
use crate::error::{Error, Result};
use crate::transport::{CollabContext, CollabTransport, UpdateCollabRequest};
use serde::{Deserialize, Serialize};

/// JSON body of an update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCollabBody {
    pub collab_type: CollabType,
    pub doc_state: Vec<u8>,
    pub context: CollabContext,
}

/// Path of the update endpoint for one object.
pub fn update_path(workspace_id: &str, object_id: &str) -> String {
    format!("/api/workspace/{workspace_id}/collab/{object_id}/web-update")
}

/// Posts updates with `reqwest`.
///
/// No client-side timeout is configured: a hung call stays in flight until
/// the connection fails.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Use a preconfigured client (proxies, TLS roots, ...).
    pub fn with_client(client: reqwest::Client, config: HttpConfig) -> Self {
        Self { client, config }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

impl CollabTransport for HttpTransport {
    async fn update_collab(&self, request: UpdateCollabRequest) -> Result<Option<CollabContext>> {
        let url = format!(
            "{}{}",
            self.config.base_url,
            update_path(&request.workspace_id, &request.object_id)
        );

        let body = UpdateCollabBody {
            collab_type: request.collab_type,
            doc_state: request.doc_state,
            context: request.context,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        tracing::trace!(%url, status = status.as_u16(), len = bytes.len(), "Update response");

        // An empty or null body is an absent response.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let context: Option<CollabContext> = serde_json::from_slice(&bytes)?;
        Ok(context)
    }
}
