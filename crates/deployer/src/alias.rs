use crate::client::{DomainRegistration, HostingProvider};
use storekit_core::ProviderConfig;
use storekit_core::types::Deployment;

/// Bind hostnames to a freshly READY deployment.
///
/// The stable alias is always attempted: every successful publish ends with
/// some durable, predictable URL. The custom domain is best-effort on top.
/// Nothing here fails the publish: alias problems degrade to warnings and
/// the best URL we did secure is returned.
pub async fn assign_aliases(
    provider: &dyn HostingProvider,
    config: &ProviderConfig,
    project_name: &str,
    deployment: &Deployment,
    custom_domain: Option<&str>,
) -> String {
    let stable = config.stable_alias(project_name);

    let mut url = match provider.bind_alias(&deployment.id, &stable).await {
        Ok(()) => {
            tracing::info!(hostname = stable.as_str(), deployment = deployment.id.as_str(), "stable alias bound");
            format!("https://{}", stable)
        }
        Err(e) => {
            tracing::warn!(hostname = stable.as_str(), error = %e, "stable alias bind failed");
            deployment
                .url
                .clone()
                .unwrap_or_else(|| format!("https://{}", stable))
        }
    };

    if let Some(domain) = custom_domain {
        if domain == stable {
            return url;
        }
        match bind_custom_domain(provider, project_name, deployment, domain).await {
            Ok(()) => {
                tracing::info!(hostname = domain, "custom domain bound");
                url = format!("https://{}", domain);
            }
            Err(reason) => {
                // Non-fatal by design: the stable URL already works.
                tracing::warn!(hostname = domain, %reason, "custom domain skipped");
            }
        }
    }

    url
}

async fn bind_custom_domain(
    provider: &dyn HostingProvider,
    project_name: &str,
    deployment: &Deployment,
    domain: &str,
) -> Result<(), String> {
    match provider.register_domain(project_name, domain).await {
        Ok(DomainRegistration::Registered) => {}
        Ok(DomainRegistration::AlreadyExists) => {
            tracing::debug!(hostname = domain, "domain already registered to project");
        }
        Err(e) => return Err(e.to_string()),
    }
    provider
        .bind_alias(&deployment.id, domain)
        .await
        .map_err(|e| e.to_string())
}
