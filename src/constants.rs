//! # Constants
//!
//! Shared constants used throughout the controller.

/// Annotation carrying the vault lease id backing a managed Secret.
pub const LEASE_ID_ANNOTATION: &str = "vaultproject.io/lease-id";

/// Annotation carrying the lease expiration as decimal unix seconds.
pub const LEASE_EXPIRATION_ANNOTATION: &str = "vaultproject.io/lease-expiration";

/// Annotation carrying vault's renewable flag ("true" / "false").
pub const RENEWABLE_ANNOTATION: &str = "vaultproject.io/renewable";

/// Vault response key holding the certificate for TLS-typed claims.
pub const PKI_CERTIFICATE_KEY: &str = "certificate";

/// Vault response key holding the private key for TLS-typed claims.
pub const PKI_PRIVATE_KEY_KEY: &str = "private_key";

/// Cluster Secret type that triggers TLS payload shaping.
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Cluster Secret data key for the certificate of a TLS Secret.
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Cluster Secret data key for the private key of a TLS Secret.
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Renewal buffer applied when a claim sets `renew: 0` (seconds).
pub const DEFAULT_RENEW_BUFFER_SECS: i64 = 3600;

/// Default vault address when `VAULT_ADDR` is unset.
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Default vault HTTP client timeout (seconds).
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 60;

/// Default HTTP server port for metrics and health probes.
pub const DEFAULT_METRICS_PORT: u16 = 8080;
