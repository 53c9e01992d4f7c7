use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use storekit_core::error::{Error, Result};
use storekit_core::types::{AssetBundle, Deployment};
use storekit_core::ProviderConfig;

/// Hosting project record as the provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
}

/// One uploaded file on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployFile {
    pub path: String,
    pub content: String,
    pub encoding: String,
}

/// Outcome of a domain registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainRegistration {
    Registered,
    AlreadyExists,
}

/// The contract this pipeline requires from any hosting provider.
///
/// Everything here must be idempotent enough to survive repeated publishes
/// mutating the same server-side project and aliases.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    /// `None` when no project of that name exists.
    async fn get_project(&self, name: &str) -> Result<Option<ProviderProject>>;
    async fn create_project(&self, name: &str) -> Result<ProviderProject>;
    async fn create_deployment(
        &self,
        project_name: &str,
        files: &[DeployFile],
        target: &str,
    ) -> Result<Deployment>;
    /// `None` means "not yet queryable"; the poller treats early 404s as
    /// transient.
    async fn get_deployment(&self, deployment_id: &str) -> Result<Option<Deployment>>;
    async fn bind_alias(&self, deployment_id: &str, hostname: &str) -> Result<()>;
    async fn register_domain(
        &self,
        project_name: &str,
        hostname: &str,
    ) -> Result<DomainRegistration>;
    /// Which project currently owns a hostname, if any.
    async fn resolve_domain_owner(&self, hostname: &str) -> Result<Option<String>>;
}

/// Ensure the hosting project exists. "Already exists" is success.
pub async fn ensure_project(
    provider: &dyn HostingProvider,
    name: &str,
) -> Result<ProviderProject> {
    if let Some(project) = provider.get_project(name).await? {
        return Ok(project);
    }
    tracing::info!(project = name, "creating hosting project");
    provider.create_project(name).await
}

/// Pick the project a deployment should target.
///
/// When the requested custom domain is already owned by a *different*
/// project, the deployment is routed there instead of creating a duplicate
/// project fighting over one domain. Kept for compatibility; logged loudly
/// so the reroute is auditable.
pub async fn resolve_target_project(
    provider: &dyn HostingProvider,
    project_name: &str,
    custom_domain: Option<&str>,
) -> Result<String> {
    let Some(domain) = custom_domain else {
        return Ok(project_name.to_string());
    };
    match provider.resolve_domain_owner(domain).await? {
        Some(owner) if owner != project_name => {
            tracing::warn!(
                domain,
                requested = project_name,
                owner = owner.as_str(),
                "custom domain already owned by another project; deploying there"
            );
            Ok(owner)
        }
        _ => Ok(project_name.to_string()),
    }
}

/// Submit the asset bundle as a new production deployment.
pub async fn upload_bundle(
    provider: &dyn HostingProvider,
    project_name: &str,
    bundle: &AssetBundle,
) -> Result<Deployment> {
    let files: Vec<DeployFile> = bundle
        .files
        .iter()
        .map(|f| DeployFile {
            path: f.path.clone(),
            content: BASE64.encode(&f.bytes),
            encoding: "base64".to_string(),
        })
        .collect();

    tracing::info!(
        project = project_name,
        files = files.len(),
        bytes = bundle.total_bytes(),
        "uploading deployment"
    );
    provider
        .create_deployment(project_name, &files, "production")
        .await
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Provider API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[allow(dead_code)]
    code: i32,
    message: String,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            let msg = self
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown provider error".to_string());
            return Err(Error::Deployment(msg));
        }
        self.result
            .ok_or_else(|| Error::Deployment("provider returned no result".into()))
    }
}

/// REST client for the hosting provider, authenticated with a bearer token
/// set once as a default header.
pub struct HttpProvider {
    client: reqwest::Client,
    api_url: String,
    account_id: String,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|e| Error::Config(format!("invalid api token: {}", e)))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
        })
    }

    fn url(&self, rest: &str) -> String {
        format!("{}/accounts/{}/{}", self.api_url, self.account_id, rest)
    }
}

#[async_trait]
impl HostingProvider for HttpProvider {
    async fn get_project(&self, name: &str) -> Result<Option<ProviderProject>> {
        let response = self
            .client
            .get(self.url(&format!("projects/{}", name)))
            .send()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        if response.status() == 404 {
            return Ok(None);
        }
        let body: ApiResponse<ProviderProject> = response
            .json()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        body.into_result().map(Some)
    }

    async fn create_project(&self, name: &str) -> Result<ProviderProject> {
        #[derive(Serialize)]
        struct CreateProject<'a> {
            name: &'a str,
        }
        let response = self
            .client
            .post(self.url("projects"))
            .json(&CreateProject { name })
            .send()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        let body: ApiResponse<ProviderProject> = response
            .json()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        body.into_result()
    }

    async fn create_deployment(
        &self,
        project_name: &str,
        files: &[DeployFile],
        target: &str,
    ) -> Result<Deployment> {
        #[derive(Serialize)]
        struct CreateDeployment<'a> {
            files: &'a [DeployFile],
            target: &'a str,
        }
        let response = self
            .client
            .post(self.url(&format!("projects/{}/deployments", project_name)))
            .json(&CreateDeployment { files, target })
            .send()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            // Log the raw payload; callers only ever see the status line.
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%status, payload = %text, "deployment upload rejected");
            return Err(Error::Deployment(format!("upload failed ({})", status)));
        }
        let body: ApiResponse<Deployment> = response
            .json()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        body.into_result()
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Option<Deployment>> {
        let response = self
            .client
            .get(self.url(&format!("deployments/{}", deployment_id)))
            .send()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        if response.status() == 404 {
            return Ok(None);
        }
        let body: ApiResponse<Deployment> = response
            .json()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        body.into_result().map(Some)
    }

    async fn bind_alias(&self, deployment_id: &str, hostname: &str) -> Result<()> {
        #[derive(Serialize)]
        struct BindAlias<'a> {
            hostname: &'a str,
        }
        let response = self
            .client
            .post(self.url(&format!("deployments/{}/aliases", deployment_id)))
            .json(&BindAlias { hostname })
            .send()
            .await
            .map_err(|e| Error::Alias(e.to_string()))?;
        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Alias(e.to_string()))?;
        body.into_result()
            .map(|_| ())
            .map_err(|e| Error::Alias(e.to_string()))
    }

    async fn register_domain(
        &self,
        project_name: &str,
        hostname: &str,
    ) -> Result<DomainRegistration> {
        #[derive(Serialize)]
        struct RegisterDomain<'a> {
            hostname: &'a str,
        }
        let response = self
            .client
            .post(self.url(&format!("projects/{}/domains", project_name)))
            .json(&RegisterDomain { hostname })
            .send()
            .await
            .map_err(|e| Error::Alias(e.to_string()))?;
        if response.status() == 409 {
            return Ok(DomainRegistration::AlreadyExists);
        }
        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Alias(e.to_string()))?;
        body.into_result()
            .map(|_| DomainRegistration::Registered)
            .map_err(|e| Error::Alias(e.to_string()))
    }

    async fn resolve_domain_owner(&self, hostname: &str) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct DomainOwner {
            project_name: String,
        }
        let response = self
            .client
            .get(self.url(&format!("domains/{}", hostname)))
            .send()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        if response.status() == 404 {
            return Ok(None);
        }
        let body: ApiResponse<DomainOwner> = response
            .json()
            .await
            .map_err(|e| Error::Deployment(e.to_string()))?;
        body.into_result().map(|o| Some(o.project_name))
    }
}
