use crate::backoff::Backoff;
use crate::client::HostingProvider;
use storekit_core::config::PollSchedule;
use storekit_core::error::{Error, Result};
use storekit_core::types::DeploymentState;
use tokio::time::Instant;

/// Poll a deployment until it reaches a terminal state, within the bounds of
/// the schedule and the caller's deadline. Returns the deployment's resolved
/// URL on READY.
///
/// A 404 during the first few attempts means the provider hasn't indexed the
/// deployment yet and is retried; past the grace window it is a real error.
pub async fn poll_deployment(
    provider: &dyn HostingProvider,
    deployment_id: &str,
    schedule: PollSchedule,
    deadline: Option<Instant>,
) -> Result<String> {
    let mut backoff = Backoff::new(schedule, deadline);

    loop {
        let attempt = backoff.attempt();
        match provider.get_deployment(deployment_id).await? {
            None if attempt <= schedule.grace_attempts => {
                tracing::debug!(deployment_id, attempt, "deployment not yet queryable");
            }
            None => {
                return Err(Error::Deployment(format!(
                    "deployment {} unknown to provider after {} attempts",
                    deployment_id, attempt
                )));
            }
            Some(deployment) => {
                tracing::debug!(deployment_id, attempt, state = ?deployment.state, "polled");
                match deployment.state {
                    DeploymentState::Ready => {
                        return deployment.url.ok_or_else(|| {
                            Error::Deployment(format!(
                                "deployment {} is ready but has no hostname",
                                deployment_id
                            ))
                        });
                    }
                    DeploymentState::Error => {
                        let detail = deployment
                            .error
                            .unwrap_or_else(|| "provider flagged the deployment".to_string());
                        return Err(Error::Deployment(detail));
                    }
                    DeploymentState::Queued | DeploymentState::Building => {}
                }
            }
        }
        backoff.wait().await.map_err(|e| match e {
            Error::Timeout(_) => Error::Timeout(format!(
                "deployment {} never reached a terminal state",
                deployment_id
            )),
            other => other,
        })?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ensure_project, upload_bundle};
    use crate::testing::{MockProvider, Outcome};
    use std::time::Duration;
    use storekit_core::types::{AssetBundle, BundleFile};

    fn schedule() -> PollSchedule {
        PollSchedule {
            fast_interval_ms: 1,
            slow_interval_ms: 2,
            fast_attempts: 3,
            max_attempts: 8,
            grace_attempts: 3,
        }
    }

    async fn deploy(provider: &MockProvider, outcome: Outcome) -> String {
        provider.script_next(outcome);
        ensure_project(provider, "s").await.unwrap();
        let bundle = AssetBundle {
            files: vec![BundleFile {
                path: "index.html".into(),
                bytes: b"x".to_vec(),
            }],
        };
        upload_bundle(provider, "s", &bundle).await.unwrap().id
    }

    #[tokio::test]
    async fn test_ready_returns_url() {
        let provider = MockProvider::default();
        let id = deploy(
            &provider,
            Outcome::Ready {
                not_found: 0,
                building: 2,
            },
        )
        .await;
        let url = poll_deployment(&provider, &id, schedule(), None).await.unwrap();
        assert_eq!(url, format!("https://{}.mock.dev", id));
    }

    #[tokio::test]
    async fn test_early_404_is_transient() {
        let provider = MockProvider::default();
        let id = deploy(
            &provider,
            Outcome::Ready {
                not_found: 2,
                building: 1,
            },
        )
        .await;
        assert!(poll_deployment(&provider, &id, schedule(), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_persistent_404_is_fatal() {
        let provider = MockProvider::default();
        let err = poll_deployment(&provider, "dep-ghost", schedule(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Deployment(_)));
    }

    #[tokio::test]
    async fn test_error_state_carries_provider_detail() {
        let provider = MockProvider::default();
        let id = deploy(
            &provider,
            Outcome::Error {
                building: 1,
                message: "minify step failed".into(),
            },
        )
        .await;
        let err = poll_deployment(&provider, &id, schedule(), None)
            .await
            .unwrap_err();
        match err {
            Error::Deployment(msg) => assert!(msg.contains("minify step failed")),
            other => panic!("expected Deployment, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_never_terminal_exhausts_attempts() {
        let provider = MockProvider::default();
        let id = deploy(&provider, Outcome::NeverTerminal).await;
        let err = poll_deployment(&provider, &id, schedule(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(provider.polls(&id), schedule().max_attempts);
    }

    #[tokio::test]
    async fn test_deadline_cancels_polling() {
        let provider = MockProvider::default();
        let mut slow = schedule();
        slow.fast_interval_ms = 60_000;
        slow.slow_interval_ms = 60_000;
        let id = deploy(&provider, Outcome::NeverTerminal).await;
        let deadline = Instant::now() + Duration::from_millis(20);
        let err = poll_deployment(&provider, &id, slow, Some(deadline))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_) | Error::Timeout(_)));
    }
}
