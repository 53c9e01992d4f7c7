//! In-memory [`HostingProvider`] for tests, here and in downstream crates.
//! Behavior is scriptable per deployment: how many polls return "not yet
//! queryable", how many stay in `Building`, and whether the terminal state
//! is `Ready` or `Error`.

use crate::client::{DeployFile, DomainRegistration, HostingProvider, ProviderProject};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use storekit_core::error::{Error, Result};
use storekit_core::types::{Deployment, DeploymentState};

/// What a scripted deployment eventually reports.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// `not_found` polls of 404, then `building` polls of BUILDING, then READY.
    Ready { not_found: u32, building: u32 },
    /// As above, but the terminal state is ERROR with this message.
    Error { building: u32, message: String },
    /// Stays in BUILDING forever; only the poll budget ends this.
    NeverTerminal,
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Ready {
            not_found: 0,
            building: 1,
        }
    }
}

#[derive(Default)]
struct State {
    projects: HashMap<String, ProviderProject>,
    projects_created: usize,
    domains: HashMap<String, String>,
    aliases: HashMap<String, String>,
    failing_aliases: HashSet<String>,
    last_upload: Vec<DeployFile>,
    deployments: u64,
    polls: HashMap<String, u32>,
    next_outcome: Outcome,
    outcomes: HashMap<String, Outcome>,
}

#[derive(Default)]
pub struct MockProvider {
    state: Mutex<State>,
}

impl MockProvider {
    pub fn projects_created(&self) -> usize {
        self.state.lock().unwrap().projects_created
    }

    /// Pretend `project` already registered `hostname`.
    pub fn claim_domain(&self, hostname: &str, project: &str) {
        self.state
            .lock()
            .unwrap()
            .domains
            .insert(hostname.to_string(), project.to_string());
    }

    /// Make every bind of `hostname` fail.
    pub fn fail_alias(&self, hostname: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_aliases
            .insert(hostname.to_string());
    }

    /// Script the outcome of the next created deployment.
    pub fn script_next(&self, outcome: Outcome) {
        self.state.lock().unwrap().next_outcome = outcome;
    }

    pub fn last_upload(&self) -> Vec<DeployFile> {
        self.state.lock().unwrap().last_upload.clone()
    }

    /// Which deployment a hostname currently points at.
    pub fn alias_target(&self, hostname: &str) -> Option<String> {
        self.state.lock().unwrap().aliases.get(hostname).cloned()
    }

    pub fn polls(&self, deployment_id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(deployment_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl HostingProvider for MockProvider {
    async fn get_project(&self, name: &str) -> Result<Option<ProviderProject>> {
        Ok(self.state.lock().unwrap().projects.get(name).cloned())
    }

    async fn create_project(&self, name: &str) -> Result<ProviderProject> {
        let mut state = self.state.lock().unwrap();
        let project = ProviderProject {
            name: name.to_string(),
            subdomain: Some(format!("{}.mock.dev", name)),
            domains: Vec::new(),
        };
        state.projects.insert(name.to_string(), project.clone());
        state.projects_created += 1;
        Ok(project)
    }

    async fn create_deployment(
        &self,
        _project_name: &str,
        files: &[DeployFile],
        _target: &str,
    ) -> Result<Deployment> {
        let mut state = self.state.lock().unwrap();
        state.deployments += 1;
        let id = format!("dep-{}", state.deployments);
        state.last_upload = files.to_vec();
        let outcome = state.next_outcome.clone();
        state.outcomes.insert(id.clone(), outcome);
        Ok(Deployment {
            id,
            state: DeploymentState::Queued,
            url: None,
            error: None,
        })
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Option<Deployment>> {
        let mut state = self.state.lock().unwrap();
        let seen = state.polls.entry(deployment_id.to_string()).or_insert(0);
        *seen += 1;
        let poll = *seen;

        let Some(outcome) = state.outcomes.get(deployment_id) else {
            return Ok(None);
        };
        let snapshot = |st, url: Option<String>, error: Option<String>| Deployment {
            id: deployment_id.to_string(),
            state: st,
            url,
            error,
        };
        match outcome {
            Outcome::Ready { not_found, building } => {
                if poll <= *not_found {
                    Ok(None)
                } else if poll <= not_found + building {
                    Ok(Some(snapshot(DeploymentState::Building, None, None)))
                } else {
                    Ok(Some(snapshot(
                        DeploymentState::Ready,
                        Some(format!("https://{}.mock.dev", deployment_id)),
                        None,
                    )))
                }
            }
            Outcome::Error { building, message } => {
                if poll <= *building {
                    Ok(Some(snapshot(DeploymentState::Building, None, None)))
                } else {
                    Ok(Some(snapshot(
                        DeploymentState::Error,
                        None,
                        Some(message.clone()),
                    )))
                }
            }
            Outcome::NeverTerminal => {
                Ok(Some(snapshot(DeploymentState::Building, None, None)))
            }
        }
    }

    async fn bind_alias(&self, deployment_id: &str, hostname: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_aliases.contains(hostname) {
            return Err(Error::Alias(format!("cannot bind {}", hostname)));
        }
        state
            .aliases
            .insert(hostname.to_string(), deployment_id.to_string());
        Ok(())
    }

    async fn register_domain(
        &self,
        project_name: &str,
        hostname: &str,
    ) -> Result<DomainRegistration> {
        let mut state = self.state.lock().unwrap();
        if let Some(owner) = state.domains.get(hostname) {
            if owner != project_name {
                return Err(Error::Alias(format!(
                    "{} is registered to another project",
                    hostname
                )));
            }
            return Ok(DomainRegistration::AlreadyExists);
        }
        state
            .domains
            .insert(hostname.to_string(), project_name.to_string());
        Ok(DomainRegistration::Registered)
    }

    async fn resolve_domain_owner(&self, hostname: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().domains.get(hostname).cloned())
    }
}
