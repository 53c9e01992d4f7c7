//! The publish pipeline orchestrator: the one entry point the rest of the
//! application calls to turn a store's layout into a live deployment.
//!
//! Stages run strictly in sequence (normalize, scaffold, synthesize, build,
//! upload, poll, alias), short-circuiting to cleanup on the first fatal
//! error. The per-store lock spans the whole attempt and the workspace
//! janitor guarantees no build directory outlives it.

pub mod janitor;
pub mod locks;
pub mod store;

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use storekit_core::ProviderConfig;
use storekit_core::error::{Error, Result};
use storekit_core::types::{Deployment, DeploymentState, PublishReceipt, StoreRecord};
use storekit_deployer::client::HostingProvider;
use storekit_generator::build::BuildCommands;

pub use janitor::WorkspaceJanitor;
pub use locks::{LockRegistry, PublishGuard};
pub use store::{FsStoreRepository, PublishState, StoreRepository};

static ATTEMPT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Drives one publish attempt end to end. Cheap to clone across handlers;
/// the lock registry inside is shared.
#[derive(Clone)]
pub struct Publisher {
    provider: Arc<dyn HostingProvider>,
    config: Arc<ProviderConfig>,
    locks: LockRegistry,
    build_commands: Arc<BuildCommands>,
    workspace_root: PathBuf,
}

impl Publisher {
    pub fn new(provider: Arc<dyn HostingProvider>, config: ProviderConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
            locks: LockRegistry::new(),
            build_commands: Arc::new(BuildCommands::default()),
            workspace_root: std::env::temp_dir().join("storekit"),
        }
    }

    /// Override the build toolchain. Used by tests and by deployments that
    /// pin their own package manager.
    pub fn with_build_commands(mut self, commands: BuildCommands) -> Self {
        self.build_commands = Arc::new(commands);
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Publish with the configured default deadline.
    pub async fn publish(&self, store: &StoreRecord) -> Result<PublishReceipt> {
        self.publish_with_deadline(store, self.config.deadline()).await
    }

    /// Publish, bounding the whole attempt (build and polling included) by
    /// `deadline`. Rejects immediately with `Busy` if another attempt for
    /// this store is running.
    pub async fn publish_with_deadline(
        &self,
        store: &StoreRecord,
        deadline: Duration,
    ) -> Result<PublishReceipt> {
        let _guard = self.locks.try_acquire(&store.id)?;
        let deadline_at = tokio::time::Instant::now() + deadline;

        tracing::info!(store = store.id.as_str(), "publish started");
        let result = self.run_pipeline(store, deadline_at).await;
        match &result {
            Ok(receipt) => {
                tracing::info!(store = store.id.as_str(), url = receipt.url.as_str(), "publish succeeded");
            }
            Err(e) => {
                tracing::warn!(store = store.id.as_str(), error = %e, "publish failed");
            }
        }
        result
    }

    async fn run_pipeline(
        &self,
        store: &StoreRecord,
        deadline_at: tokio::time::Instant,
    ) -> Result<PublishReceipt> {
        // Validate before any filesystem work: an unrepairable layout never
        // creates a workspace.
        let site = storekit_layout::parse_layout(store.layout.as_deref(), &store.store_name)?;

        let workspace = self.fresh_workspace_path(&store.id);
        std::fs::create_dir_all(&workspace)
            .map_err(|e| Error::Scaffold(format!("creating {}: {}", workspace.display(), e)))?;
        let janitor = WorkspaceJanitor::new(&workspace);

        storekit_generator::scaffold(&workspace, store)?;
        storekit_generator::synthesize(&workspace, &site)?;

        let remaining = deadline_at
            .checked_duration_since(tokio::time::Instant::now())
            .ok_or_else(|| Error::Timeout("deadline expired before build".into()))?;
        let bundle =
            storekit_generator::run_build(&workspace, &self.build_commands, remaining).await?;

        let project_name = store.project_name();
        let target = storekit_deployer::resolve_target_project(
            self.provider.as_ref(),
            &project_name,
            store.custom_domain.as_deref(),
        )
        .await?;
        storekit_deployer::ensure_project(self.provider.as_ref(), &target).await?;

        let deployment =
            storekit_deployer::upload_bundle(self.provider.as_ref(), &target, &bundle).await?;

        let resolved_url = storekit_deployer::poll_deployment(
            self.provider.as_ref(),
            &deployment.id,
            self.config.poll,
            Some(deadline_at),
        )
        .await?;

        let ready = Deployment {
            id: deployment.id.clone(),
            state: DeploymentState::Ready,
            url: Some(resolved_url),
            error: None,
        };
        let url = storekit_deployer::assign_aliases(
            self.provider.as_ref(),
            &self.config,
            &target,
            &ready,
            store.custom_domain.as_deref(),
        )
        .await;

        janitor.cleanup();
        Ok(PublishReceipt {
            url,
            deployment_id: deployment.id,
            published_at: Utc::now(),
        })
    }

    /// Per-attempt workspace path: store id plus a process-unique nonce, so
    /// two attempts can never collide on disk even across the per-store lock.
    fn fresh_workspace_path(&self, store_id: &str) -> PathBuf {
        let nonce = ATTEMPT_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.workspace_root.join(format!(
            "{}-{}-{}",
            storekit_core::types::slugify(store_id),
            std::process::id(),
            nonce
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storekit_core::config::PollSchedule;
    use storekit_deployer::testing::{MockProvider, Outcome};
    use tempfile::TempDir;

    fn config() -> ProviderConfig {
        ProviderConfig {
            api_url: "https://api.mock.dev".into(),
            api_token: "t".into(),
            account_id: "a".into(),
            base_domain: "sites.test".into(),
            poll: PollSchedule {
                fast_interval_ms: 1,
                slow_interval_ms: 2,
                fast_attempts: 3,
                max_attempts: 10,
                grace_attempts: 3,
            },
            deadline_secs: 30,
        }
    }

    fn fake_build(script: &str) -> BuildCommands {
        BuildCommands {
            install: vec!["true".into()],
            build: vec!["sh".into(), "-c".into(), script.into()],
            output_dir: "dist".into(),
        }
    }

    fn store(layout: Option<&str>) -> StoreRecord {
        StoreRecord {
            id: "s1".into(),
            store_name: "Test Store".into(),
            domain: None,
            custom_domain: None,
            layout: layout.map(String::from),
        }
    }

    fn publisher(provider: Arc<MockProvider>, root: &TempDir) -> Publisher {
        Publisher::new(provider, config())
            .with_build_commands(fake_build("mkdir -p dist && echo hi > dist/index.html"))
            .with_workspace_root(root.path())
    }

    fn workspace_count(root: &TempDir) -> usize {
        std::fs::read_dir(root.path()).unwrap().count()
    }

    const LAYOUT: &str = r#"{"pages":[{"name":"Home","sections":[{"type":"hero","title":"Hi"}]}]}"#;

    #[tokio::test]
    async fn test_successful_publish() {
        let provider = Arc::new(MockProvider::default());
        let root = TempDir::new().unwrap();
        let p = publisher(provider.clone(), &root);

        let receipt = p.publish(&store(Some(LAYOUT))).await.unwrap();
        assert_eq!(receipt.url, "https://test-store.sites.test");
        assert_eq!(receipt.deployment_id, "dep-1");
        assert_eq!(
            provider.alias_target("test-store.sites.test").as_deref(),
            Some("dep-1")
        );
        assert_eq!(workspace_count(&root), 0, "workspace left behind");
    }

    #[tokio::test]
    async fn test_republish_is_a_new_deployment_same_url() {
        let provider = Arc::new(MockProvider::default());
        let root = TempDir::new().unwrap();
        let p = publisher(provider.clone(), &root);

        let first = p.publish(&store(Some(LAYOUT))).await.unwrap();
        let second = p.publish(&store(Some(LAYOUT))).await.unwrap();
        assert_ne!(first.deployment_id, second.deployment_id);
        assert_eq!(first.url, second.url);
        assert_eq!(
            provider.alias_target("test-store.sites.test").as_deref(),
            Some(second.deployment_id.as_str())
        );
        // Republish reuses the project rather than creating another.
        assert_eq!(provider.projects_created(), 1);
    }

    #[tokio::test]
    async fn test_bad_layout_never_creates_workspace() {
        let provider = Arc::new(MockProvider::default());
        let root = TempDir::new().unwrap();
        let p = publisher(provider.clone(), &root);

        let err = p.publish(&store(Some("certainly not json"))).await.unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_build_failure_cleans_workspace() {
        let provider = Arc::new(MockProvider::default());
        let root = TempDir::new().unwrap();
        let p = Publisher::new(provider, config())
            .with_build_commands(fake_build("echo nope >&2; exit 1"))
            .with_workspace_root(root.path());

        let err = p.publish(&store(Some(LAYOUT))).await.unwrap_err();
        assert!(matches!(err, Error::Build(_)));
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_failed_deployment_cleans_workspace() {
        let provider = Arc::new(MockProvider::default());
        provider.script_next(Outcome::Error {
            building: 1,
            message: "asset too large".into(),
        });
        let root = TempDir::new().unwrap();
        let p = publisher(provider.clone(), &root);

        let err = p.publish(&store(Some(LAYOUT))).await.unwrap_err();
        match err {
            Error::Deployment(msg) => assert!(msg.contains("asset too large")),
            other => panic!("expected Deployment, got {other:?}"),
        }
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_poll_timeout_cleans_workspace() {
        let provider = Arc::new(MockProvider::default());
        provider.script_next(Outcome::NeverTerminal);
        let root = TempDir::new().unwrap();
        let p = publisher(provider.clone(), &root);

        let err = p.publish(&store(Some(LAYOUT))).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_concurrent_publish_rejected_then_allowed() {
        let provider = Arc::new(MockProvider::default());
        let root = TempDir::new().unwrap();
        let p = Publisher::new(provider, config())
            .with_build_commands(fake_build(
                "sleep 1 && mkdir -p dist && echo hi > dist/index.html",
            ))
            .with_workspace_root(root.path());

        let first = {
            let p = p.clone();
            tokio::spawn(async move { p.publish(&store(Some(LAYOUT))).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;

        let err = p.publish(&store(Some(LAYOUT))).await.unwrap_err();
        assert!(matches!(err, Error::Busy(_)));

        first.await.unwrap().unwrap();
        // Once the first attempt finishes, the store is publishable again.
        p.publish(&store(Some(LAYOUT))).await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_domain_owned_elsewhere_still_succeeds() {
        let provider = Arc::new(MockProvider::default());
        provider.claim_domain("shop.example.com", "other");
        let root = TempDir::new().unwrap();
        let p = publisher(provider.clone(), &root);

        let mut s = store(Some(LAYOUT));
        s.custom_domain = Some("shop.example.com".into());
        let receipt = p.publish(&s).await.unwrap();
        // Rerouted to the owning project instead of fighting over the domain:
        // the deployment lands under "other" and both hostnames track it.
        assert_eq!(receipt.url, "https://shop.example.com");
        assert_eq!(
            provider.alias_target("other.sites.test").as_deref(),
            Some(receipt.deployment_id.as_str())
        );
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_overall_deadline_bounds_build() {
        let provider = Arc::new(MockProvider::default());
        let root = TempDir::new().unwrap();
        let p = Publisher::new(provider, config())
            .with_build_commands(fake_build("sleep 30"))
            .with_workspace_root(root.path());

        let err = p
            .publish_with_deadline(&store(Some(LAYOUT)), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(workspace_count(&root), 0);
    }
}
