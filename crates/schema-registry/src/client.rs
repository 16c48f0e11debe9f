//! Schema registry client.
//!
//! Only the two calls the dumper needs are implemented: fetching a schema
//! definition by its global id, and listing the schema types the registry
//! supports (used as a connectivity check at startup).

use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Error code returned by Confluent-compatible registries for unknown ids.
const SCHEMA_NOT_FOUND: i64 = 40403;

/// Resolves schema ids to schema definitions.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Fetch the schema definition text registered under `id`.
    async fn schema_by_id(&self, id: u32) -> Result<String>;
}

/// TLS material for talking to the registry over HTTPS.
#[derive(Debug, Clone, Default)]
pub struct RegistryTls {
    /// Client certificate followed by its private key, PEM encoded
    pub identity_pem: Option<Vec<u8>>,
    /// Additional trusted root certificate, PEM encoded
    pub ca_pem: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaResponse {
    schema: String,
    /// Absent for Avro schemas
    #[serde(default)]
    schema_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_code: i64,
    message: String,
}

/// HTTP client for a Confluent-compatible schema registry.
#[derive(Debug, Clone)]
pub struct HttpSchemaRegistry {
    client: Client,
    base_url: Url,
}

impl HttpSchemaRegistry {
    pub fn new(base_url: &str, tls: Option<&RegistryTls>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| RegistryError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if let Some(tls) = tls {
            if let Some(pem) = &tls.identity_pem {
                let identity = reqwest::Identity::from_pem(pem)
                    .map_err(|e| RegistryError::Tls(format!("client identity: {e}")))?;
                builder = builder.identity(identity);
            }
            if let Some(pem) = &tls.ca_pem {
                let cert = reqwest::Certificate::from_pem(pem)
                    .map_err(|e| RegistryError::Tls(format!("CA certificate: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List the schema types supported by the registry (e.g. `AVRO`, `JSON`, `PROTOBUF`).
    pub async fn supported_types(&self) -> Result<Vec<String>> {
        let url = self.endpoint("schemas/types");
        tracing::debug!("Fetching supported schema types from {url}");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE)
            .send()
            .await?;
        let response = check_status(response, None).await?;
        Ok(response.json().await?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
    async fn schema_by_id(&self, id: u32) -> Result<String> {
        let url = self.endpoint(&format!("schemas/ids/{id}"));
        tracing::debug!("Fetching schema {id} from {url}");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE)
            .send()
            .await?;
        let response = check_status(response, Some(id)).await?;
        let body: SchemaResponse = response.json().await?;

        match body.schema_type.as_deref() {
            None | Some("AVRO") => Ok(body.schema),
            Some(other) => Err(RegistryError::UnsupportedSchemaType(other.to_string())),
        }
    }
}

async fn check_status(
    response: reqwest::Response,
    schema_id: Option<u32>,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorResponse>(&text).ok();

    if let (Some(id), Some(err)) = (schema_id, &parsed) {
        if status == StatusCode::NOT_FOUND && err.error_code == SCHEMA_NOT_FOUND {
            return Err(RegistryError::NotFound(id));
        }
    }

    Err(RegistryError::Status {
        status: status.as_u16(),
        message: parsed.map(|e| e.message).unwrap_or(text),
    })
}
