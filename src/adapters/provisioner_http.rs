//! Provisioning engine client using reqwest.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use url::Url;

use crate::domain::{AppError, Attributes, LogicalName, ProviderConfig, ResourceKind};
use crate::ports::{Provisioner, ResourceRequest};

/// Bearer token presented to the engine, if set.
pub const ENGINE_TOKEN_ENV: &str = "BROKER_STACK_ENGINE_TOKEN";

const DEFAULT_STATUS_MESSAGE: &str = "Provisioning request failed";

/// HTTP transport for a remote provisioning engine.
///
/// Performs a single request per call.
#[derive(Clone)]
pub struct HttpProvisioner {
    endpoint: Url,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for HttpProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvisioner")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl HttpProvisioner {
    pub fn new(endpoint: &Url, token: Option<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let client =
            Client::builder().timeout(Duration::from_secs(timeout_secs)).build().map_err(|e| {
                AppError::provisioning(
                    "connect",
                    endpoint.as_str(),
                    format!("Failed to create HTTP client: {}", e),
                    None,
                )
            })?;

        let mut endpoint = endpoint.clone();
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self { endpoint, token, client })
    }

    /// Build from provider configuration, reading the token from the environment.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AppError> {
        let endpoint = config.endpoint.as_ref().ok_or_else(|| {
            AppError::config_error("provider.endpoint is required for the http engine")
        })?;
        let token = std::env::var(ENGINE_TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
        Self::new(endpoint, token, config.timeout_secs)
    }

    fn url(&self, operation: &str, name: Option<&LogicalName>) -> Result<Url, AppError> {
        let path = match name {
            Some(name) => format!("resources/{}", name),
            None => "resources".to_string(),
        };
        self.endpoint.join(&path).map_err(|e| {
            AppError::provisioning(operation, name.map(|n| n.as_str()).unwrap_or("-"), e.to_string(), None)
        })
    }

    fn send(
        &self,
        operation: &str,
        method: Method,
        name: &LogicalName,
        url: Url,
        body: &EngineRequest<'_>,
    ) -> Result<Option<Attributes>, AppError> {
        let mut request = self.client.request(method, url).header(CONTENT_TYPE, "application/json").json(body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().map_err(|e| {
            AppError::provisioning(operation, name.as_str(), format!("HTTP request failed: {}", e), None)
        })?;

        let status = response.status();
        let body_text = response.text().unwrap_or_default();

        if status.is_success() {
            if body_text.trim().is_empty() {
                return Ok(None);
            }
            let parsed: EngineResponse = serde_json::from_str(&body_text).map_err(|e| {
                AppError::provisioning(
                    operation,
                    name.as_str(),
                    format!("Failed to parse response: {}", e),
                    Some(status.as_u16()),
                )
            })?;
            return Ok(parsed.outputs);
        }

        let message = extract_error_message(&body_text).unwrap_or_else(|| {
            if !body_text.trim().is_empty() {
                body_text.clone()
            } else if status.is_server_error() {
                "Server error".to_string()
            } else {
                DEFAULT_STATUS_MESSAGE.to_string()
            }
        });

        Err(AppError::provisioning(operation, name.as_str(), message, Some(status.as_u16())))
    }

    fn require_outputs(
        operation: &str,
        name: &LogicalName,
        outputs: Option<Attributes>,
    ) -> Result<Attributes, AppError> {
        outputs.ok_or_else(|| AppError::provisioning(operation, name.as_str(), "No outputs in response", None))
    }
}

#[derive(Debug, Serialize)]
struct EngineRequest<'a> {
    name: &'a LogicalName,
    #[serde(rename = "type")]
    type_token: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    inputs: Option<&'a BTreeMap<String, Json>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<&'a Attributes>,
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    outputs: Option<Attributes>,
}

fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<Json>(body).ok()?;

    if let Some(msg) = parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
    {
        return Some(msg.to_string());
    }

    parsed.get("message").and_then(|message| message.as_str()).map(ToOwned::to_owned)
}

impl Provisioner for HttpProvisioner {
    fn create(&self, request: &ResourceRequest) -> Result<Attributes, AppError> {
        let body = EngineRequest {
            name: &request.name,
            type_token: request.kind.type_token(),
            inputs: Some(&request.inputs),
            current: None,
        };
        let url = self.url("create", None)?;
        let outputs = self.send("create", Method::POST, &request.name, url, &body)?;
        Self::require_outputs("create", &request.name, outputs)
    }

    fn update(
        &self,
        request: &ResourceRequest,
        current: &Attributes,
    ) -> Result<Attributes, AppError> {
        let body = EngineRequest {
            name: &request.name,
            type_token: request.kind.type_token(),
            inputs: Some(&request.inputs),
            current: Some(current),
        };
        let url = self.url("update", Some(&request.name))?;
        let outputs = self.send("update", Method::PUT, &request.name, url, &body)?;
        Ok(outputs.unwrap_or_else(|| current.clone()))
    }

    fn delete(
        &self,
        name: &LogicalName,
        kind: ResourceKind,
        current: &Attributes,
    ) -> Result<(), AppError> {
        let body =
            EngineRequest { name, type_token: kind.type_token(), inputs: None, current: Some(current) };
        let url = self.url("delete", Some(name))?;
        self.send("delete", Method::DELETE, name, url, &body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client(server: &mockito::Server, token: Option<&str>) -> HttpProvisioner {
        let url = Url::parse(&server.url()).unwrap();
        HttpProvisioner::new(&url, token.map(str::to_string), 1).unwrap()
    }

    fn table_request() -> ResourceRequest {
        ResourceRequest {
            name: LogicalName::new("brokerDataTable").unwrap(),
            kind: ResourceKind::Table,
            inputs: BTreeMap::from([("hash_key".to_string(), json!("id"))]),
        }
    }

    #[test]
    fn create_posts_inputs_and_returns_outputs() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/resources")
            .match_header("authorization", "Bearer engine-token")
            .match_body(Matcher::PartialJson(json!({
                "name": "brokerDataTable",
                "type": "aws:dynamodb/table:Table",
                "inputs": {"hash_key": "id"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"outputs": {"id": "broker-data", "name": "broker-data", "arn": "arn:aws:dynamodb:ap-southeast-1:123456789012:table/broker-data"}}"#)
            .expect(1)
            .create();

        let outputs = client(&server, Some("engine-token")).create(&table_request()).unwrap();
        assert_eq!(outputs["name"], "broker-data");
        mock.assert();
    }

    #[test]
    fn update_puts_to_resource_path() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/resources/brokerDataTable")
            .with_status(200)
            .with_body(r#"{"outputs": {"id": "broker-data"}}"#)
            .expect(1)
            .create();

        let current = Attributes::from([("id".to_string(), "old".to_string())]);
        let outputs = client(&server, None).update(&table_request(), &current).unwrap();
        assert_eq!(outputs["id"], "broker-data");
        mock.assert();
    }

    #[test]
    fn delete_accepts_empty_body() {
        let mut server = mockito::Server::new();
        let mock = server.mock("DELETE", "/resources/brokerDataTable").with_status(204).expect(1).create();

        let name = LogicalName::new("brokerDataTable").unwrap();
        client(&server, None).delete(&name, ResourceKind::Table, &Attributes::new()).unwrap();
        mock.assert();
    }

    #[test]
    fn failure_is_reported_once_without_retry() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/resources")
            .with_status(500)
            .with_body(r#"{"error":{"message":"table limit exceeded"}}"#)
            .expect(1)
            .create();

        let err = client(&server, None).create(&table_request()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "create of 'brokerDataTable' failed (HTTP 500): table limit exceeded"
        );
        mock.assert();
    }

    #[test]
    fn plain_text_error_body_is_kept() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/resources").with_status(400).with_body("Bad Request").create();

        let err = client(&server, None).create(&table_request()).unwrap_err();
        assert!(matches!(err, AppError::Provisioning { status: Some(400), ref message, .. } if message == "Bad Request"));
    }

    #[test]
    fn create_without_outputs_fails() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/resources").with_status(200).with_body("{}").create();

        let err = client(&server, None).create(&table_request()).unwrap_err();
        assert!(err.to_string().contains("No outputs in response"));
    }

    #[test]
    fn endpoint_with_base_path_is_preserved() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/engine/v1/resources")
            .with_status(200)
            .with_body(r#"{"outputs": {"id": "x"}}"#)
            .create();

        let url = Url::parse(&format!("{}/engine/v1", server.url())).unwrap();
        let provisioner = HttpProvisioner::new(&url, None, 1).unwrap();
        provisioner.create(&table_request()).unwrap();
        mock.assert();
    }

    #[test]
    fn debug_redacts_token() {
        let server = mockito::Server::new();
        let rendered = format!("{:?}", client(&server, Some("engine-token")));
        assert!(!rendered.contains("engine-token"));
    }
}
