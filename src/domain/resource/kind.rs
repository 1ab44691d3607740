//! Resource types and their field schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a change to a field is applied by the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Updated on the live resource.
    InPlace,
    /// Forces destroy-then-recreate of the resource.
    Replace,
}

/// Expected shape of a literal field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Text,
    Integer,
    Bool,
    List,
    Map,
}

impl FieldShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldShape::Text => "string",
            FieldShape::Integer => "integer",
            FieldShape::Bool => "boolean",
            FieldShape::List => "list",
            FieldShape::Map => "map",
        }
    }
}

/// Schema entry for one descriptor field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
    pub required: bool,
    pub update: UpdateMode,
}

const fn required(name: &'static str, shape: FieldShape, update: UpdateMode) -> FieldSpec {
    FieldSpec { name, shape, required: true, update }
}

const fn optional(name: &'static str, shape: FieldShape, update: UpdateMode) -> FieldSpec {
    FieldSpec { name, shape, required: false, update }
}

use FieldShape::{Bool, Integer, List, Map, Text};
use UpdateMode::{InPlace, Replace};

const TAGS: FieldSpec = optional("tags", Map, InPlace);

const ROLE_FIELDS: &[FieldSpec] = &[
    required("assume_role_policy", Map, InPlace),
    optional("name", Text, Replace),
    optional("description", Text, InPlace),
    TAGS,
];

const ROLE_POLICY_ATTACHMENT_FIELDS: &[FieldSpec] =
    &[required("role", Text, Replace), required("policy_arn", Text, Replace)];

const POLICY_FIELDS: &[FieldSpec] = &[
    required("policy", Map, InPlace),
    optional("name", Text, Replace),
    optional("description", Text, Replace),
    TAGS,
];

const TABLE_FIELDS: &[FieldSpec] = &[
    required("attributes", List, InPlace),
    required("hash_key", Text, Replace),
    optional("range_key", Text, Replace),
    optional("name", Text, Replace),
    optional("billing_mode", Text, InPlace),
    optional("read_capacity", Integer, InPlace),
    optional("write_capacity", Integer, InPlace),
    TAGS,
];

const FUNCTION_FIELDS: &[FieldSpec] = &[
    required("role", Text, InPlace),
    required("runtime", Text, InPlace),
    required("handler", Text, InPlace),
    required("code", Text, InPlace),
    optional("name", Text, Replace),
    optional("timeout", Integer, InPlace),
    optional("memory_size", Integer, InPlace),
    optional("environment", Map, InPlace),
    TAGS,
];

const PERMISSION_FIELDS: &[FieldSpec] = &[
    required("action", Text, Replace),
    required("function", Text, Replace),
    required("principal", Text, Replace),
    optional("source_arn", Text, Replace),
];

const USER_POOL_FIELDS: &[FieldSpec] = &[
    required("name", Text, Replace),
    optional("password_policy", Map, InPlace),
    optional("auto_verified_attributes", List, InPlace),
    TAGS,
];

const USER_POOL_CLIENT_FIELDS: &[FieldSpec] = &[
    required("name", Text, InPlace),
    required("user_pool_id", Text, Replace),
    optional("generate_secret", Bool, Replace),
    optional("explicit_auth_flows", List, InPlace),
    optional("callback_urls", List, InPlace),
    optional("logout_urls", List, InPlace),
];

const API_FIELDS: &[FieldSpec] = &[
    required("name", Text, InPlace),
    required("protocol_type", Text, Replace),
    optional("description", Text, InPlace),
    optional("cors_configuration", Map, InPlace),
    TAGS,
];

const DOMAIN_NAME_FIELDS: &[FieldSpec] = &[
    required("domain_name", Text, Replace),
    required("domain_name_configurations", List, InPlace),
    TAGS,
];

const API_MAPPING_FIELDS: &[FieldSpec] = &[
    required("api_id", Text, InPlace),
    required("domain_name", Text, Replace),
    required("stage", Text, InPlace),
    optional("api_mapping_key", Text, InPlace),
];

const AUTHORIZER_FIELDS: &[FieldSpec] = &[
    required("api_id", Text, Replace),
    required("name", Text, InPlace),
    required("authorizer_type", Text, InPlace),
    optional("identity_source", List, InPlace),
    optional("jwt_configuration", Map, InPlace),
];

// The HTTP API provider cannot update request parameter mappings in place.
const INTEGRATION_FIELDS: &[FieldSpec] = &[
    required("api_id", Text, Replace),
    required("integration_type", Text, InPlace),
    optional("integration_uri", Text, InPlace),
    optional("payload_format_version", Text, InPlace),
    optional("request_parameters", Map, Replace),
];

// Route targets are likewise replace-only.
const ROUTE_FIELDS: &[FieldSpec] = &[
    required("api_id", Text, Replace),
    required("route_key", Text, InPlace),
    optional("target", Text, Replace),
    optional("authorization_type", Text, InPlace),
    optional("authorizer_id", Text, InPlace),
];

/// Cloud resource types understood by the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Role,
    RolePolicyAttachment,
    Policy,
    Table,
    Function,
    Permission,
    UserPool,
    UserPoolClient,
    Api,
    DomainName,
    ApiMapping,
    Authorizer,
    Integration,
    Route,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 14] = [
        ResourceKind::Role,
        ResourceKind::RolePolicyAttachment,
        ResourceKind::Policy,
        ResourceKind::Table,
        ResourceKind::Function,
        ResourceKind::Permission,
        ResourceKind::UserPool,
        ResourceKind::UserPoolClient,
        ResourceKind::Api,
        ResourceKind::DomainName,
        ResourceKind::ApiMapping,
        ResourceKind::Authorizer,
        ResourceKind::Integration,
        ResourceKind::Route,
    ];

    /// Provider type token sent to the provisioning engine.
    pub fn type_token(&self) -> &'static str {
        match self {
            ResourceKind::Role => "aws:iam/role:Role",
            ResourceKind::RolePolicyAttachment => {
                "aws:iam/rolePolicyAttachment:RolePolicyAttachment"
            }
            ResourceKind::Policy => "aws:iam/policy:Policy",
            ResourceKind::Table => "aws:dynamodb/table:Table",
            ResourceKind::Function => "aws:lambda/function:Function",
            ResourceKind::Permission => "aws:lambda/permission:Permission",
            ResourceKind::UserPool => "aws:cognito/userPool:UserPool",
            ResourceKind::UserPoolClient => "aws:cognito/userPoolClient:UserPoolClient",
            ResourceKind::Api => "aws-native:apigatewayv2:Api",
            ResourceKind::DomainName => "aws-native:apigatewayv2:DomainName",
            ResourceKind::ApiMapping => "aws-native:apigatewayv2:ApiMapping",
            ResourceKind::Authorizer => "aws-native:apigatewayv2:Authorizer",
            ResourceKind::Integration => "aws-native:apigatewayv2:Integration",
            ResourceKind::Route => "aws-native:apigatewayv2:Route",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ResourceKind::Role => ROLE_FIELDS,
            ResourceKind::RolePolicyAttachment => ROLE_POLICY_ATTACHMENT_FIELDS,
            ResourceKind::Policy => POLICY_FIELDS,
            ResourceKind::Table => TABLE_FIELDS,
            ResourceKind::Function => FUNCTION_FIELDS,
            ResourceKind::Permission => PERMISSION_FIELDS,
            ResourceKind::UserPool => USER_POOL_FIELDS,
            ResourceKind::UserPoolClient => USER_POOL_CLIENT_FIELDS,
            ResourceKind::Api => API_FIELDS,
            ResourceKind::DomainName => DOMAIN_NAME_FIELDS,
            ResourceKind::ApiMapping => API_MAPPING_FIELDS,
            ResourceKind::Authorizer => AUTHORIZER_FIELDS,
            ResourceKind::Integration => INTEGRATION_FIELDS,
            ResourceKind::Route => ROUTE_FIELDS,
        }
    }

    /// Output attributes assigned by the provisioning engine.
    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Role => &["id", "arn", "name"],
            ResourceKind::RolePolicyAttachment => &["id"],
            ResourceKind::Policy => &["id", "arn", "name"],
            ResourceKind::Table => &["id", "arn", "name"],
            ResourceKind::Function => &["id", "arn", "name", "invoke_arn"],
            ResourceKind::Permission => &["id"],
            ResourceKind::UserPool => &["id", "arn", "endpoint"],
            ResourceKind::UserPoolClient => &["id"],
            ResourceKind::Api => &["id", "api_endpoint"],
            ResourceKind::DomainName => {
                &["id", "domain_name", "regional_domain_name", "regional_hosted_zone_id"]
            }
            ResourceKind::ApiMapping => &["id", "api_mapping_id"],
            ResourceKind::Authorizer => &["id", "authorizer_id"],
            ResourceKind::Integration => &["id", "integration_id"],
            ResourceKind::Route => &["id", "route_id"],
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    pub fn has_output(&self, attribute: &str) -> bool {
        self.outputs().contains(&attribute)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
