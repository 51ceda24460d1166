//! JSON-RPC client for the provisioning backend. `ApiClient` is the single
//! concrete implementation of every remote contract the orchestrator
//! consumes: `JobClient`, `MappingStore`, `ReadinessProbe`, and
//! `WorkspaceRegistry`.

use crate::provision::contracts::{
    JobClient, JobOutcome, MappingStore, ReadinessProbe, WorkspaceRegistry,
};
use crate::provision::readiness::ReadinessResult;
use crate::registry::{Model, Module, ModuleMap, NeuralNetSpec, Workspace};
use crate::rpc::auth::build_auth_headers;
use crate::rpc::metrics::{ApiMetrics, ApiMetricsSnapshot};
use crate::rpc::options::ApiClientOptions;
use crate::rpc::payload::{
    AckReply, HealthReply, JobReply, MappingReply, ModelsReply, ModulesReply, NeuralNetsReply,
    WorkspaceReply,
};
use crate::runtime::config::BackendConfig;
use anyhow::{anyhow, bail, Result};
use futures::future::BoxFuture;
use jsonrpsee::core::client::{ClientT, Error as JsonRpcError};
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Failures the backend reports explicitly, as opposed to transport-level
/// errors that travel as plain `anyhow` chains.
#[derive(Debug)]
pub enum ApiError {
    Timeout {
        method: &'static str,
    },
    Backend {
        method: &'static str,
        code: i32,
        message: String,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Timeout { method } => write!(f, "rpc method {method} timed out"),
            ApiError::Backend {
                method,
                code,
                message,
            } => write!(f, "backend rejected {method} (code {code}): {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Arc<String>,
    client: HttpClient,
    metrics: Arc<ApiMetrics>,
}

impl ApiClient {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::with_options(url, user, password, ApiClientOptions::default())
    }

    pub fn with_options(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        options: ApiClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let base_url = url.into();
        let headers = build_auth_headers(&user.into(), &password.into())?;
        let max_request_body_size = options.max_request_body_bytes.min(u32::MAX as usize) as u32;
        let max_response_body_size = options.max_response_body_bytes.min(u32::MAX as usize) as u32;

        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(options.request_timeout)
            .max_concurrent_requests(options.max_concurrent_requests)
            .max_request_size(max_request_body_size)
            .max_response_size(max_response_body_size)
            .build(&base_url)
            .map_err(|err| anyhow!("failed to build backend client: {err}"))?;

        Ok(Self {
            base_url: Arc::new(base_url),
            client,
            metrics: Arc::new(ApiMetrics::default()),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        config.validate()?;
        let options = ApiClientOptions {
            request_timeout: config.request_timeout(),
            ..ApiClientOptions::default()
        };
        Self::with_options(
            config.base_url().to_owned(),
            config.api_user().to_owned(),
            config.api_password().to_owned(),
            options,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> ApiMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Submits a training job and suspends until it resolves. Exactly one
    /// request: training is not idempotent, so transport-level retries are
    /// never attempted.
    pub async fn train(
        &self,
        module_id: &str,
        seed: u64,
        nn_id: Option<&str>,
    ) -> Result<JobOutcome> {
        let reply: JobReply = self
            .call("train", rpc_params![module_id, seed, nn_id])
            .await?;
        Ok(reply.into_outcome())
    }

    /// Submits an evaluation job for a mapped model and suspends until it
    /// resolves.
    pub async fn evaluate(&self, module_id: &str, seed: u64, model_id: &str) -> Result<JobOutcome> {
        let reply: JobReply = self
            .call("evaluate", rpc_params![module_id, seed, model_id])
            .await?;
        Ok(reply.into_outcome())
    }

    /// One readiness probe. Read-only; callers own any repetition.
    pub async fn readiness(&self) -> Result<ReadinessResult> {
        self.call("readiness", rpc_params![]).await
    }

    pub async fn get_mapping(&self) -> Result<ModuleMap> {
        let reply: MappingReply = self.call("get_mapping", rpc_params![]).await?;
        Ok(reply.module_map)
    }

    pub async fn save_mapping(&self, mapping: &ModuleMap) -> Result<()> {
        let reply: AckReply = self.call("save_mapping", rpc_params![mapping]).await?;
        if !reply.ok {
            bail!("backend did not acknowledge the mapping save");
        }
        Ok(())
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>> {
        let reply: ModulesReply = self.call("list_modules", rpc_params![]).await?;
        Ok(reply.modules)
    }

    pub async fn list_models(&self) -> Result<Vec<Model>> {
        let reply: ModelsReply = self.call("list_models", rpc_params![]).await?;
        Ok(reply.models)
    }

    pub async fn list_neural_nets(&self) -> Result<Vec<NeuralNetSpec>> {
        let reply: NeuralNetsReply = self.call("list_neural_nets", rpc_params![]).await?;
        Ok(reply.neural_nets)
    }

    pub async fn get_workspace(&self) -> Result<Workspace> {
        self.call("get_workspace", rpc_params![]).await
    }

    pub async fn save_workspace(
        &self,
        selected: &[String],
        name: Option<&str>,
        seed: Option<u64>,
    ) -> Result<Workspace> {
        let reply: WorkspaceReply = self
            .call("save_workspace", rpc_params![selected, name, seed])
            .await?;
        if !reply.ok {
            bail!("backend did not acknowledge the workspace save");
        }
        Ok(reply.workspace)
    }

    /// Backend liveness check.
    pub async fn health(&self) -> Result<()> {
        let reply: HealthReply = self.call("health", rpc_params![]).await?;
        if reply.status != "ok" {
            bail!("backend reported unexpected health status {:?}", reply.status);
        }
        Ok(())
    }

    /// Performs one request, records metrics, and classifies timeout and
    /// backend-reported failures into [`ApiError`].
    async fn call<R>(&self, method: &'static str, params: ArrayParams) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let started = Instant::now();
        match self.client.request::<R, _>(method, params).await {
            Ok(reply) => {
                self.metrics.record_success(started.elapsed());
                tracing::trace!(method, "rpc call completed");
                Ok(reply)
            }
            Err(JsonRpcError::RequestTimeout) => {
                self.metrics.record_timeout(started.elapsed());
                tracing::warn!(method, "rpc call timed out");
                Err(ApiError::Timeout { method }.into())
            }
            Err(JsonRpcError::Call(object)) => {
                self.metrics.record_failure(started.elapsed());
                tracing::warn!(
                    method,
                    code = object.code(),
                    message = object.message(),
                    "backend rejected rpc call"
                );
                Err(ApiError::Backend {
                    method,
                    code: object.code(),
                    message: object.message().to_owned(),
                }
                .into())
            }
            Err(err) => {
                self.metrics.record_failure(started.elapsed());
                tracing::warn!(method, error = %err, "rpc call failed");
                Err(anyhow!(err).context(format!("rpc method {method} failed")))
            }
        }
    }
}

impl JobClient for ApiClient {
    fn train<'a>(
        &'a self,
        module_id: &'a str,
        seed: u64,
        nn_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<JobOutcome>> {
        Box::pin(self.train(module_id, seed, nn_id))
    }

    fn evaluate<'a>(
        &'a self,
        module_id: &'a str,
        seed: u64,
        model_id: &'a str,
    ) -> BoxFuture<'a, Result<JobOutcome>> {
        Box::pin(self.evaluate(module_id, seed, model_id))
    }
}

impl MappingStore for ApiClient {
    fn get_mapping(&self) -> BoxFuture<'_, Result<ModuleMap>> {
        Box::pin(self.get_mapping())
    }

    fn save_mapping<'a>(&'a self, mapping: &'a ModuleMap) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.save_mapping(mapping))
    }
}

impl ReadinessProbe for ApiClient {
    fn probe(&self) -> BoxFuture<'_, Result<ReadinessResult>> {
        Box::pin(self.readiness())
    }
}

impl WorkspaceRegistry for ApiClient {
    fn list_modules(&self) -> BoxFuture<'_, Result<Vec<Module>>> {
        Box::pin(self.list_modules())
    }

    fn list_models(&self) -> BoxFuture<'_, Result<Vec<Model>>> {
        Box::pin(self.list_models())
    }

    fn list_neural_nets(&self) -> BoxFuture<'_, Result<Vec<NeuralNetSpec>>> {
        Box::pin(self.list_neural_nets())
    }

    fn get_workspace(&self) -> BoxFuture<'_, Result<Workspace>> {
        Box::pin(self.get_workspace())
    }

    fn save_workspace<'a>(
        &'a self,
        selected: &'a [String],
        name: Option<&'a str>,
        seed: Option<u64>,
    ) -> BoxFuture<'a, Result<Workspace>> {
        Box::pin(self.save_workspace(selected, name, seed))
    }
}
