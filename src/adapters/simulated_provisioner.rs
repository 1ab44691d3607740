//! Deterministic in-process provisioning engine.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::domain::{AppError, Attributes, LogicalName, ResourceKind};
use crate::ports::{Provisioner, ResourceRequest};

/// Fabricates provider identifiers without any network access.
///
/// Identifiers are derived from the resource's name, kind and inputs, so the
/// same request always yields the same attributes and a replaced resource
/// receives a fresh identity.
#[derive(Debug)]
pub struct SimulatedProvisioner {
    region: String,
    account_id: String,
    live: Mutex<BTreeMap<LogicalName, Attributes>>,
    failures: Mutex<BTreeMap<LogicalName, String>>,
}

impl SimulatedProvisioner {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            live: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(BTreeMap::new()),
        }
    }

    /// Reject every operation on `name` with `message`.
    pub fn with_failure(self, name: &LogicalName, message: impl Into<String>) -> Self {
        self.fail(name, message);
        self
    }

    pub fn fail(&self, name: &LogicalName, message: impl Into<String>) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).insert(name.clone(), message.into());
    }

    /// Resources created and not yet deleted by this engine.
    pub fn live(&self) -> BTreeMap<LogicalName, Attributes> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Stop rejecting operations on `name`.
    pub fn recover(&self, name: &LogicalName) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).remove(name);
    }

    fn check(&self, operation: &str, name: &LogicalName) -> Result<(), AppError> {
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.get(name) {
            Some(message) => Err(AppError::provisioning(operation, name.as_str(), message.clone(), None)),
            None => Ok(()),
        }
    }

    fn attributes(&self, request: &ResourceRequest) -> Result<Attributes, AppError> {
        let seed = fingerprint(request)?;
        let hex = |len: usize| seed[..len].to_string();
        let physical_name = |field: &str| {
            request.text(field).map(str::to_string).unwrap_or_else(|| format!("{}-{}", request.name, hex(7)))
        };
        let region = &self.region;
        let account = &self.account_id;

        let mut attrs = Attributes::new();
        let mut set = |key: &str, value: String| {
            attrs.insert(key.to_string(), value);
        };

        match request.kind {
            ResourceKind::Role => {
                let name = physical_name("name");
                set("arn", format!("arn:aws:iam::{}:role/{}", account, name));
                set("id", name.clone());
                set("name", name);
            }
            ResourceKind::Policy => {
                let name = physical_name("name");
                let arn = format!("arn:aws:iam::{}:policy/{}", account, name);
                set("id", arn.clone());
                set("arn", arn);
                set("name", name);
            }
            ResourceKind::RolePolicyAttachment => {
                let role = request.text("role").unwrap_or_default();
                set("id", format!("{}-{}", role, hex(12)));
            }
            ResourceKind::Table => {
                let name = physical_name("name");
                set("arn", format!("arn:aws:dynamodb:{}:{}:table/{}", region, account, name));
                set("id", name.clone());
                set("name", name);
            }
            ResourceKind::Function => {
                let name = physical_name("name");
                let arn = format!("arn:aws:lambda:{}:{}:function:{}", region, account, name);
                set(
                    "invoke_arn",
                    format!(
                        "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
                        region, arn
                    ),
                );
                set("arn", arn);
                set("id", name.clone());
                set("name", name);
            }
            ResourceKind::Permission => {
                set("id", format!("{}-{}", request.name, hex(12)));
            }
            ResourceKind::UserPool => {
                let id = format!("{}_{}", region, hex(9));
                set("arn", format!("arn:aws:cognito-idp:{}:{}:userpool/{}", region, account, id));
                set("endpoint", format!("cognito-idp.{}.amazonaws.com/{}", region, id));
                set("id", id);
            }
            ResourceKind::UserPoolClient => {
                set("id", hex(26));
            }
            ResourceKind::Api => {
                let id = hex(10);
                set("api_endpoint", format!("https://{}.execute-api.{}.amazonaws.com", id, region));
                set("id", id);
            }
            ResourceKind::DomainName => {
                let domain = physical_name("domain_name");
                set("regional_domain_name", format!("d-{}.execute-api.{}.amazonaws.com", hex(10), region));
                set("regional_hosted_zone_id", format!("Z{}", hex(13).to_uppercase()));
                set("id", domain.clone());
                set("domain_name", domain);
            }
            ResourceKind::ApiMapping => {
                let mapping_id = hex(6);
                let domain = request.text("domain_name").unwrap_or_default();
                set("id", format!("{}|{}", mapping_id, domain));
                set("api_mapping_id", mapping_id);
            }
            ResourceKind::Authorizer => {
                let authorizer_id = hex(6);
                set("id", composite(request, &authorizer_id));
                set("authorizer_id", authorizer_id);
            }
            ResourceKind::Integration => {
                let integration_id = hex(7);
                set("id", composite(request, &integration_id));
                set("integration_id", integration_id);
            }
            ResourceKind::Route => {
                let route_id = hex(7);
                set("id", composite(request, &route_id));
                set("route_id", route_id);
            }
        }
        Ok(attrs)
    }
}

impl Provisioner for SimulatedProvisioner {
    fn create(&self, request: &ResourceRequest) -> Result<Attributes, AppError> {
        self.check("create", &request.name)?;
        let attrs = self.attributes(request)?;
        tracing::debug!(resource = %request.name, kind = %request.kind, id = ?attrs.get("id"), "simulated create");
        self.live.lock().unwrap_or_else(PoisonError::into_inner).insert(request.name.clone(), attrs.clone());
        Ok(attrs)
    }

    fn update(
        &self,
        request: &ResourceRequest,
        current: &Attributes,
    ) -> Result<Attributes, AppError> {
        self.check("update", &request.name)?;
        tracing::debug!(resource = %request.name, kind = %request.kind, "simulated update");
        // Identity survives an in-place update.
        self.live.lock().unwrap_or_else(PoisonError::into_inner).insert(request.name.clone(), current.clone());
        Ok(current.clone())
    }

    fn delete(
        &self,
        name: &LogicalName,
        kind: ResourceKind,
        _current: &Attributes,
    ) -> Result<(), AppError> {
        self.check("delete", name)?;
        tracing::debug!(resource = %name, %kind, "simulated delete");
        self.live.lock().unwrap_or_else(PoisonError::into_inner).remove(name);
        Ok(())
    }
}

/// `{api_id}|{child_id}`, the identifier shape of API sub-resources.
fn composite(request: &ResourceRequest, child: &str) -> String {
    format!("{}|{}", request.text("api_id").unwrap_or_default(), child)
}

fn fingerprint(request: &ResourceRequest) -> Result<String, AppError> {
    let mut hasher = Sha256::new();
    hasher.update(request.kind.type_token().as_bytes());
    hasher.update(request.name.as_bytes());
    hasher.update(serde_json::to_vec(&request.inputs)?);
    Ok(hasher.finalize().iter().map(|byte| format!("{:02x}", byte)).collect())
}
