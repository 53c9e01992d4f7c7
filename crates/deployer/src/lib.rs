//! Hosting-provider integration: the provider contract and its HTTP client,
//! deployment polling with bounded backoff, and alias/domain binding.

pub mod alias;
pub mod backoff;
pub mod client;
pub mod poller;
pub mod testing;

pub use alias::assign_aliases;
pub use backoff::Backoff;
pub use client::{
    DeployFile, DomainRegistration, HostingProvider, HttpProvider, ProviderProject,
    ensure_project, resolve_target_project, upload_bundle,
};
pub use poller::poll_deployment;
