//! The Bro-Ker serverless backend: role, table, function, user pool, HTTP API.

use std::collections::BTreeMap;

use crate::domain::deferred::Segment;
use crate::domain::{
    AppError, DeferredValue, DeploymentConfig, DeploymentParameters, Fields, ResourceGraph,
    ResourceHandle, ResourceKind, ResourceOptions, Value,
};

const LAMBDA_BASIC_EXECUTION_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

const TABLE_ACTIONS: &[&str] = &[
    "dynamodb:GetItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:Scan",
    "dynamodb:Query",
];

/// Caller's subject claim, injected for the function as `userIdAuth`.
const SUBJECT_MAPPING: (&str, &str) =
    ("overwrite:querystring.userIdAuth", "$context.authorizer.claims.sub");

/// Logical name and route key of every HTTP route.
pub const ROUTES: &[(&str, &str)] = &[
    ("authProfileRoute", "GET /api/auth"),
    ("stockQuotesRoute", "GET /api/stock-quotes"),
    ("stockNewsRoute", "GET /api/company-news"),
    ("portfolioGetRoute", "GET /api/portfolio"),
    ("portfolioPostRoute", "POST /api/portfolio"),
];

pub const EXPORT_FUNCTION_NAME: &str = "lambda_function_name";
pub const EXPORT_FUNCTION_ARN: &str = "lambda_function_arn";
pub const EXPORT_ROLE_ARN: &str = "lambda_role_arn";
pub const EXPORT_API_ID: &str = "api_gateway_id";
pub const EXPORT_TABLE_NAME: &str = "dynamodb_table_name";
pub const EXPORT_INVOKE_URL: &str = "api_gateway_invoke_url";
pub const EXPORT_USER_POOL_ID: &str = "cognito_user_pool_id";
pub const EXPORT_USER_POOL_CLIENT_ID: &str = "cognito_user_pool_client_id";

/// Declare the full broker backend graph.
pub fn broker_stack(
    config: &DeploymentConfig,
    params: &DeploymentParameters,
) -> Result<ResourceGraph, AppError> {
    let mut builder = StackBuilder { graph: ResourceGraph::new(), config, params };

    let role = builder.lambda_role()?;
    let table = builder.data_table()?;
    builder.table_access_policy(&role, &table)?;
    let function = builder.backend_function(&role, &table)?;
    let (user_pool, client) = builder.user_pool()?;
    let api = builder.http_api()?;
    builder.custom_domain(&api)?;
    let authorizer = builder.authorizer(&api, &user_pool, &client)?;
    builder.routes(&api, &function, authorizer.as_ref())?;
    builder.invoke_permission(&api, &function)?;
    builder.exports(&role, &table, &function, &user_pool, &client, &api)?;

    tracing::debug!(resources = builder.graph.len(), "built broker stack");
    Ok(builder.graph)
}

struct StackBuilder<'a> {
    graph: ResourceGraph,
    config: &'a DeploymentConfig,
    params: &'a DeploymentParameters,
}

impl StackBuilder<'_> {
    fn tags(&self, name: &str) -> Value {
        let mut tags: BTreeMap<String, Value> = self
            .config
            .project
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();
        tags.insert("Name".to_string(), Value::from(name));
        Value::Map(tags)
    }

    fn region(&self) -> &str {
        &self.config.provider.region
    }

    fn lambda_role(&mut self) -> Result<ResourceHandle, AppError> {
        let assume_role_policy = Value::map([
            ("Version", Value::from("2012-10-17")),
            (
                "Statement",
                Value::list([Value::map([
                    ("Action", Value::from("sts:AssumeRole")),
                    ("Effect", Value::from("Allow")),
                    ("Principal", Value::map([("Service", "lambda.amazonaws.com")])),
                ])]),
            ),
        ]);

        let role = self.graph.declare(
            ResourceKind::Role,
            "stockApiLambdaRole",
            Fields::new()
                .with("assume_role_policy", assume_role_policy)
                .with("tags", self.tags("stock-api-lambda-role")),
        )?;

        let role_name = self.graph.reference(&role, "name")?;
        self.graph.declare(
            ResourceKind::RolePolicyAttachment,
            "stockApiLambdaLogPolicyAttachment",
            Fields::new().with("role", role_name).with("policy_arn", LAMBDA_BASIC_EXECUTION_POLICY),
        )?;

        Ok(role)
    }

    fn data_table(&mut self) -> Result<ResourceHandle, AppError> {
        let table = &self.config.table;
        let key = |name: &str| Value::map([("name", name), ("type", "S")]);

        let mut fields = Fields::new()
            .with("name", self.params.table_name.as_str())
            .with("attributes", Value::list([key("id"), key("symbol")]))
            .with("hash_key", "id")
            .with("range_key", "symbol")
            .with("billing_mode", table.billing_mode.as_str())
            .with("tags", self.tags("broker-data-table"));
        if table.is_provisioned() {
            fields = fields
                .with("read_capacity", table.read_capacity)
                .with("write_capacity", table.write_capacity);
        }

        self.graph.declare(ResourceKind::Table, "brokerDataTable", fields)
    }

    fn table_access_policy(
        &mut self,
        role: &ResourceHandle,
        table: &ResourceHandle,
    ) -> Result<(), AppError> {
        let document = Value::map([
            ("Version", Value::from("2012-10-17")),
            (
                "Statement",
                Value::list([Value::map([
                    ("Action", Value::list(TABLE_ACTIONS.iter().copied())),
                    ("Effect", Value::from("Allow")),
                    ("Resource", Value::from(self.graph.reference(table, "arn")?)),
                ])]),
            ),
        ]);

        let policy = self.graph.declare(
            ResourceKind::Policy,
            "stockApiLambdaDynamoDbPolicy",
            Fields::new()
                .with(
                    "description",
                    "IAM policy for Lambda to read/write from the Broker DynamoDB table",
                )
                .with("policy", document),
        )?;

        let role_name = self.graph.reference(role, "name")?;
        let policy_arn = self.graph.reference(&policy, "arn")?;
        self.graph.declare(
            ResourceKind::RolePolicyAttachment,
            "stockApiLambdaDynamoDbAttachment",
            Fields::new().with("role", role_name).with("policy_arn", policy_arn),
        )?;
        Ok(())
    }

    fn backend_function(
        &mut self,
        role: &ResourceHandle,
        table: &ResourceHandle,
    ) -> Result<ResourceHandle, AppError> {
        let function = &self.config.function;
        let variables = Value::map([
            ("FINNHUB_API_KEY", Value::secret(&self.params.finnhub_api_key)),
            (
                "COGNITO_TOKEN_ENDPOINT",
                Value::from(format!("https://cognito-idp.{}.amazonaws.com/", self.region())),
            ),
            ("COGNITO_CLIENT_ID", Value::from(self.params.cognito_client_id.as_str())),
            ("COGNITO_CLIENT_SECRET", Value::secret(&self.params.cognito_client_secret)),
            ("DYNAMODB_TABLE_NAME", Value::from(self.graph.reference(table, "name")?)),
        ]);

        let fields = Fields::new()
            .with("role", self.graph.reference(role, "arn")?)
            .with("runtime", function.runtime.as_str())
            .with("handler", function.handler.as_str())
            .with("code", function.code.as_str())
            .with("timeout", function.timeout_secs)
            .with("memory_size", function.memory_mb)
            .with("environment", Value::map([("variables", variables)]))
            .with("tags", self.tags("stock-api-function"));

        // Code and environment are rolled out by the backend's own pipeline.
        self.graph.declare_with_options(
            ResourceKind::Function,
            "BrokerBackendFunction",
            fields,
            ResourceOptions::default().ignore_changes(&["code", "environment"]),
        )
    }

    fn user_pool(&mut self) -> Result<(ResourceHandle, ResourceHandle), AppError> {
        let pool_config = &self.config.user_pool;
        let password_policy = Value::map([
            ("minimum_length", Value::from(pool_config.password_min_length)),
            ("require_lowercase", Value::from(true)),
            ("require_numbers", Value::from(true)),
            ("require_symbols", Value::from(true)),
            ("require_uppercase", Value::from(true)),
        ]);

        let pool = self.graph.declare(
            ResourceKind::UserPool,
            "brokerUserPool",
            Fields::new()
                .with("name", pool_config.name.as_str())
                .with("password_policy", password_policy)
                .with("auto_verified_attributes", Value::list(["email"]))
                .with("tags", self.tags("broker-user-pool")),
        )?;

        let client = self.graph.declare(
            ResourceKind::UserPoolClient,
            "brokerUserPoolClient",
            Fields::new()
                .with("name", pool_config.client_name.as_str())
                .with("user_pool_id", self.graph.reference(&pool, "id")?)
                .with("generate_secret", true)
                .with(
                    "explicit_auth_flows",
                    Value::list([
                        "ALLOW_USER_PASSWORD_AUTH",
                        "ALLOW_REFRESH_TOKEN_AUTH",
                        "ALLOW_ADMIN_USER_PASSWORD_AUTH",
                    ]),
                )
                .with("callback_urls", Value::list(pool_config.callback_urls.iter().map(String::as_str)))
                .with("logout_urls", Value::list(pool_config.logout_urls.iter().map(String::as_str))),
        )?;

        Ok((pool, client))
    }

    fn http_api(&mut self) -> Result<ResourceHandle, AppError> {
        let api = &self.config.api;
        let strings = |items: &[String]| Value::list(items.iter().map(String::as_str));
        let cors = Value::map([
            ("allowOrigins", strings(&api.cors.allow_origins)),
            ("allowMethods", strings(&api.cors.allow_methods)),
            ("allowHeaders", strings(&api.cors.allow_headers)),
            ("maxAge", Value::from(api.cors.max_age)),
        ]);

        self.graph.declare(
            ResourceKind::Api,
            "stockHttpApi",
            Fields::new()
                .with("name", api.name.as_str())
                .with("protocol_type", "HTTP")
                .with("description", "API for Bro-Ker stock information")
                .with("cors_configuration", cors)
                .with("tags", self.tags("stock-broker-http-api")),
        )
    }

    fn custom_domain(&mut self, api: &ResourceHandle) -> Result<(), AppError> {
        let Some(domain) = &self.config.api.domain else {
            return Ok(());
        };

        let configuration = Value::map([
            ("certificate_arn", domain.certificate_arn.as_str()),
            ("endpoint_type", domain.endpoint_type.as_str()),
        ]);
        let custom_domain = self.graph.declare(
            ResourceKind::DomainName,
            "bro-kerApiCustomDomain",
            Fields::new()
                .with("domain_name", domain.name.as_str())
                .with("domain_name_configurations", Value::list([configuration]))
                .with("tags", Value::map([("Name", domain.name.as_str())])),
        )?;

        self.graph.declare(
            ResourceKind::ApiMapping,
            "bro-ker-apiMapping",
            Fields::new()
                .with("api_id", self.graph.reference(api, "id")?)
                .with("domain_name", self.graph.reference(&custom_domain, "domain_name")?)
                .with("stage", "$default"),
        )?;
        Ok(())
    }

    fn authorizer(
        &mut self,
        api: &ResourceHandle,
        pool: &ResourceHandle,
        client: &ResourceHandle,
    ) -> Result<Option<ResourceHandle>, AppError> {
        if !self.config.api.enforce_auth {
            return Ok(None);
        }

        let issuer = self
            .graph
            .reference(pool, "id")?
            .prefixed(format!("https://cognito-idp.{}.amazonaws.com/", self.region()));
        let jwt_configuration = Value::map([
            ("audience", Value::list([self.graph.reference(client, "id")?])),
            ("issuer", Value::from(issuer)),
        ]);

        let authorizer = self.graph.declare(
            ResourceKind::Authorizer,
            "brokerJwtAuthorizer",
            Fields::new()
                .with("api_id", self.graph.reference(api, "id")?)
                .with("name", "CognitoJwtAuthorizer")
                .with("authorizer_type", "JWT")
                .with("identity_source", Value::list(["$request.header.Authorization"]))
                .with("jwt_configuration", jwt_configuration),
        )?;
        Ok(Some(authorizer))
    }

    fn routes(
        &mut self,
        api: &ResourceHandle,
        function: &ResourceHandle,
        authorizer: Option<&ResourceHandle>,
    ) -> Result<(), AppError> {
        let integration = self.graph.declare(
            ResourceKind::Integration,
            "bro-ker-backend",
            Fields::new()
                .with("api_id", self.graph.reference(api, "id")?)
                .with("integration_type", "AWS_PROXY")
                .with("integration_uri", self.graph.reference(function, "invoke_arn")?)
                .with("payload_format_version", "2.0")
                .with("request_parameters", Value::map([SUBJECT_MAPPING])),
        )?;

        // Integration ids come back as "{api_id}|{integration_id}"; routes want
        // "integrations/{integration_id}".
        let target = ResourceGraph::compose_identifier(
            self.graph.reference(&integration, "id")?,
            "|",
            1,
        )
        .prefixed("integrations/");

        let authorizer_id = match authorizer {
            Some(handle) => Some(self.graph.reference(handle, "authorizer_id")?),
            None => None,
        };

        for (name, route_key) in ROUTES {
            let fields = Fields::new()
                .with("api_id", self.graph.reference(api, "id")?)
                .with("route_key", *route_key)
                .with("target", target.clone())
                .with_opt("authorization_type", authorizer_id.as_ref().map(|_| "JWT"))
                .with_opt("authorizer_id", authorizer_id.clone());
            self.graph.declare(ResourceKind::Route, name, fields)?;
        }
        Ok(())
    }

    fn invoke_permission(
        &mut self,
        api: &ResourceHandle,
        function: &ResourceHandle,
    ) -> Result<(), AppError> {
        let source_arn = DeferredValue::interpolate(vec![
            Segment::Text(format!(
                "arn:aws:execute-api:{}:{}:",
                self.region(),
                self.params.account_id
            )),
            Segment::Value(self.graph.reference(api, "id")?),
            Segment::Text("/*/*".to_string()),
        ]);

        self.graph.declare(
            ResourceKind::Permission,
            "bro-ker-ApiLambdaPermission",
            Fields::new()
                .with("action", "lambda:InvokeFunction")
                .with("function", self.graph.reference(function, "name")?)
                .with("principal", "apigateway.amazonaws.com")
                .with("source_arn", source_arn),
        )?;
        Ok(())
    }

    fn exports(
        &mut self,
        role: &ResourceHandle,
        table: &ResourceHandle,
        function: &ResourceHandle,
        pool: &ResourceHandle,
        client: &ResourceHandle,
        api: &ResourceHandle,
    ) -> Result<(), AppError> {
        let exports = [
            (EXPORT_FUNCTION_NAME, function, "name"),
            (EXPORT_FUNCTION_ARN, function, "arn"),
            (EXPORT_ROLE_ARN, role, "arn"),
            (EXPORT_API_ID, api, "id"),
            (EXPORT_TABLE_NAME, table, "name"),
            (EXPORT_INVOKE_URL, api, "api_endpoint"),
            (EXPORT_USER_POOL_ID, pool, "id"),
            (EXPORT_USER_POOL_CLIENT_ID, client, "id"),
        ];
        for (key, handle, attribute) in exports {
            let value = self.graph.reference(handle, attribute)?;
            self.graph.export(key, value)?;
        }
        Ok(())
    }
}
