//! Firestore REST client.
//!
//! Endpoints, relative to
//! `{endpoint}/projects/{project}/databases/(default)/documents`:
//!
//! | operation | request                                                         |
//! |-----------|-----------------------------------------------------------------|
//! | create    | `POST {collection}`                                             |
//! | get       | `GET {collection}/{id}`                                         |
//! | update    | `PATCH {collection}/{id}?currentDocument.exists=true&updateMask.fieldPaths=..` |
//! | delete    | `DELETE {collection}/{id}`                                      |
//! | list      | `GET {collection}?pageSize=..&pageToken=..`                     |
//!
//! `createTime`/`updateTime` on the returned document are the server clock.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use super::value::{decode_fields, encode_fields};
use super::{ClientError, DocumentClient, Fields, StoredDocument};
use crate::config::StorageConfig;
use crate::error::{AssayError, Result};
use crate::model::report::timestamp;

const PAGE_SIZE: &str = "300";

/// Env var holding a bearer token when the descriptor has none.
pub const ACCESS_TOKEN_ENV: &str = "ASSAY_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
struct ServiceAccountDescriptor {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Resolved remote credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub project_id: String,
    pub principal: Option<String>,
    access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("principal", &self.principal)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a service-account descriptor (JSON) and an
    /// optional token override.
    ///
    /// # Errors
    ///
    /// [`AssayError::ConfigurationFault`] if the descriptor is malformed,
    /// lacks `project_id`, or no access token is available.
    pub fn from_descriptor(descriptor: &str, token_override: Option<String>) -> Result<Self> {
        let parsed: ServiceAccountDescriptor = serde_json::from_str(descriptor).map_err(|e| {
            AssayError::configuration(format!("service-account descriptor is not valid JSON: {e}"))
        })?;

        let project_id = parsed
            .project_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                AssayError::configuration("service-account descriptor has no project_id")
            })?;

        let access_token = token_override
            .or(parsed.access_token)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AssayError::configuration(format!(
                    "no access token: set {ACCESS_TOKEN_ENV} or add access_token to the descriptor"
                ))
            })?;

        Ok(Self {
            project_id,
            principal: parsed.client_email,
            access_token,
        })
    }

    /// Read the descriptor file at `path`.
    ///
    /// # Errors
    ///
    /// [`AssayError::ConfigurationFault`] when the file is missing or invalid.
    pub fn load(path: &Path, token_override: Option<String>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AssayError::configuration(format!(
                "cannot read service-account descriptor {}: {e}",
                path.display()
            ))
        })?;
        Self::from_descriptor(&content, token_override)
    }
}

/// Blocking Firestore REST client.
pub struct FirestoreClient {
    agent: ureq::Agent,
    documents_url: String,
    credentials: Credentials,
}

impl FirestoreClient {
    #[must_use]
    pub fn new(endpoint: &str, credentials: Credentials, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let documents_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            endpoint.trim_end_matches('/'),
            encode_segment(&credentials.project_id)
        );
        Self {
            agent,
            documents_url,
            credentials,
        }
    }

    /// Build a client from storage settings.
    ///
    /// # Errors
    ///
    /// [`AssayError::ConfigurationFault`] when no credentials are configured
    /// or they are unusable.
    pub fn connect(settings: &StorageConfig) -> Result<Self> {
        let path = settings.credentials.as_deref().ok_or_else(|| {
            AssayError::configuration("remote mode is on but no service-account descriptor is set")
        })?;
        let token = std::env::var(ACCESS_TOKEN_ENV).ok();
        let credentials = Credentials::load(path, token)?;
        tracing::debug!(
            project = %credentials.project_id,
            endpoint = %settings.endpoint,
            "connecting to Firestore"
        );
        Ok(Self::new(
            &settings.endpoint,
            credentials,
            Duration::from_secs(settings.timeout_secs),
        ))
    }

    fn collection_url(&self, collection: &str) -> String {
        let path: Vec<String> = collection.split('/').map(encode_segment).collect();
        format!("{}/{}", self.documents_url, path.join("/"))
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), encode_segment(id))
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.credentials.access_token))
            .set("Accept", "application/json")
            .set("User-Agent", "assay")
    }

    fn send(
        &self,
        request: ureq::Request,
        body: Option<&Value>,
        path: &str,
    ) -> Result<Value, ClientError> {
        let response = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match response {
            Ok(resp) => resp
                .into_json::<Value>()
                .map_err(|e| ClientError::Decode(format!("invalid JSON from {path}: {e}"))),
            Err(ureq::Error::Status(status, resp)) => {
                let message = error_message(resp);
                Err(match status {
                    404 => ClientError::NotFound {
                        path: path.to_string(),
                    },
                    401 | 403 => ClientError::Unauthorized { status, message },
                    _ => ClientError::Status { status, message },
                })
            }
            Err(ureq::Error::Transport(t)) => Err(ClientError::Transport(t.to_string())),
        }
    }
}

fn error_message(resp: ureq::Response) -> String {
    let status_text = resp.status_text().to_string();
    resp.into_json::<Value>()
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(status_text)
}

/// Percent-encode one URL path segment (RFC 3986 unreserved chars pass).
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

fn parse_document(raw: &Value) -> Result<StoredDocument, ClientError> {
    let name = raw["name"]
        .as_str()
        .ok_or_else(|| ClientError::Decode("document has no name".into()))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();

    let time = |key: &str| {
        raw[key]
            .as_str()
            .and_then(timestamp::parse)
            .ok_or_else(|| ClientError::Decode(format!("document {id} has no valid {key}")))
    };

    Ok(StoredDocument {
        fields: decode_fields(raw.get("fields"))?,
        create_time: time("createTime")?,
        update_time: time("updateTime")?,
        id,
    })
}

impl DocumentClient for FirestoreClient {
    fn create(&self, collection: &str, fields: &Fields) -> Result<StoredDocument, ClientError> {
        let url = self.collection_url(collection);
        let body = json!({ "fields": encode_fields(fields) });
        let raw = self.send(self.request("POST", &url), Some(&body), collection)?;
        parse_document(&raw)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, ClientError> {
        let url = self.document_url(collection, id);
        match self.send(self.request("GET", &url), None, &format!("{collection}/{id}")) {
            Ok(raw) => parse_document(&raw).map(Some),
            Err(ClientError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<StoredDocument, ClientError> {
        let url = self.document_url(collection, id);
        let mut request = self
            .request("PATCH", &url)
            .query("currentDocument.exists", "true");
        for key in fields.keys() {
            request = request.query("updateMask.fieldPaths", key);
        }
        let body = json!({ "fields": encode_fields(fields) });
        let raw = self.send(request, Some(&body), &format!("{collection}/{id}"))?;
        parse_document(&raw)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        let url = self.document_url(collection, id);
        self.send(self.request("DELETE", &url), None, &format!("{collection}/{id}"))?;
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, ClientError> {
        let url = self.collection_url(collection);
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.request("GET", &url).query("pageSize", PAGE_SIZE);
            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }
            let raw = match self.send(request, None, collection) {
                Ok(raw) => raw,
                // A collection with no documents does not exist yet.
                Err(ClientError::NotFound { .. }) => break,
                Err(e) => return Err(e),
            };

            if let Some(batch) = raw["documents"].as_array() {
                for doc in batch {
                    docs.push(parse_document(doc)?);
                }
            }

            match raw["nextPageToken"].as_str() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!(collection, count = docs.len(), "listed remote documents");
        Ok(docs)
    }

    fn describe(&self) -> String {
        format!("Firestore project {}", self.credentials.project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::from_descriptor(r#"{"project_id":"lab-proj"}"#, Some("tok".into()))
            .expect("credentials")
    }

    #[test]
    fn descriptor_requires_project_and_token() {
        assert!(matches!(
            Credentials::from_descriptor("{}", Some("tok".into())),
            Err(AssayError::ConfigurationFault(_))
        ));
        assert!(matches!(
            Credentials::from_descriptor(r#"{"project_id":"p"}"#, None),
            Err(AssayError::ConfigurationFault(_))
        ));
        assert!(matches!(
            Credentials::from_descriptor("not json", Some("tok".into())),
            Err(AssayError::ConfigurationFault(_))
        ));

        let c = Credentials::from_descriptor(
            r#"{"project_id":" p ","client_email":"svc@p.iam","access_token":"abc"}"#,
            None,
        )
        .expect("valid");
        assert_eq!(c.project_id, "p");
        assert_eq!(c.principal.as_deref(), Some("svc@p.iam"));
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", creds());
        assert!(rendered.contains("lab-proj"));
        assert!(!rendered.contains("tok\""));
    }

    #[test]
    fn missing_descriptor_file_is_configuration_fault() {
        let err = Credentials::load(Path::new("/nonexistent/sa.json"), Some("t".into()))
            .unwrap_err();
        assert!(matches!(err, AssayError::ConfigurationFault(_)));
    }

    #[test]
    fn connect_without_credentials_path_fails() {
        let settings = StorageConfig::default();
        assert!(matches!(
            FirestoreClient::connect(&settings),
            Err(AssayError::ConfigurationFault(_))
        ));
    }

    #[test]
    fn urls_encode_user_supplied_segments() {
        let client = FirestoreClient::new(
            "http://localhost:8080/v1/",
            creds(),
            Duration::from_secs(1),
        );
        assert_eq!(
            client.document_url("artifacts/my app/users/u1/reports", "abc"),
            "http://localhost:8080/v1/projects/lab-proj/databases/(default)/documents/artifacts/my%20app/users/u1/reports/abc"
        );
    }

    #[test]
    fn parses_rest_document() {
        let raw = json!({
            "name": "projects/p/databases/(default)/documents/artifacts/a/users/u/product_analysis_reports_v3/Xy12",
            "fields": {
                "productCode": {"stringValue": "BGL-200"},
                "analysisItems": {"arrayValue": {"values": []}}
            },
            "createTime": "2025-03-04T05:06:07.123456Z",
            "updateTime": "2025-03-04T05:06:08.000001Z"
        });
        let doc = parse_document(&raw).expect("document");
        assert_eq!(doc.id, "Xy12");
        assert_eq!(doc.fields["productCode"], json!("BGL-200"));
        assert!(doc.update_time > doc.create_time);
    }

    #[test]
    fn document_without_times_is_rejected() {
        let raw = json!({"name": "projects/p/databases/(default)/documents/c/x"});
        assert!(matches!(parse_document(&raw), Err(ClientError::Decode(_))));
    }
}
