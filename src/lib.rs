//! # Kube Vault Controller
//!
//! A Kubernetes controller that reconciles `SecretClaim` resources
//! against a vault by materializing its responses as cluster Secrets
//! and managing the lifecycle of the leases that back them.
//!
//! For every claim the controller ensures that a cluster Secret of
//! the same `namespace/name` exists with fresh vault data, renews the
//! backing lease in place while that is possible, rotates to fresh
//! credential material when it is not, and revokes the lease and
//! deletes the Secret when the claim goes away.
//!
//! The design is level-triggered and idempotent: two watch streams
//! (claims and Secrets) feed one decision function through a per-key
//! dispatcher, and a periodic resync sweep catches drift and expiring
//! leases between apiserver events.

pub mod cli;
pub mod clock;
pub mod cluster;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod reconciler;
pub mod server;
pub mod vault;
