//! Trust settings for the TLS I/O layer
//!
//! The handshake runs inside the engine. All this module decides is which
//! roots the engine should trust, compiled into a rustls `ClientConfig` the
//! engine can use as-is. A connection without a `TlsConfig` gets the engine's
//! platform default TLS I/O.

use crate::{Error, Result};
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::{CertificateDer, ServerName};
use std::fmt;
use std::io::BufReader;
use std::sync::Arc;

/// Where trusted root certificates come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootSource {
    /// Operating system trust store (rustls-native-certs)
    #[default]
    Native,
    /// Mozilla roots bundled at compile time (webpki-roots)
    WebPki,
}

/// Trust configuration handed to [`Engine::create_tls_io`](crate::Engine::create_tls_io)
///
/// ```ignore
/// use amqp_bind::connection::{RootSource, TlsConfig};
///
/// let tls = TlsConfig::builder().root_source(RootSource::WebPki).build()?;
/// let private_ca = TlsConfig::builder().ca_cert_path("/etc/broker/ca.pem").build()?;
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    ca_cert_path: Option<String>,
    root_source: RootSource,
    verify_hostname: bool,
    roots: usize,
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Start building a trust configuration
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Compiled rustls configuration
    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.client_config)
    }

    /// Hostname check hint for the engine; the compiled config ignores it
    pub fn verify_hostname(&self) -> bool {
        self.verify_hostname
    }

    /// Root certificate source used when no CA file is set
    pub fn root_source(&self) -> RootSource {
        self.root_source
    }

    /// Private CA bundle, if any
    pub fn ca_cert_path(&self) -> Option<&str> {
        self.ca_cert_path.as_deref()
    }

    /// Number of trust anchors loaded
    pub fn root_count(&self) -> usize {
        self.roots
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("root_source", &self.root_source)
            .field("verify_hostname", &self.verify_hostname)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TlsConfig`]
#[derive(Debug, Clone)]
pub struct TlsConfigBuilder {
    ca_cert_path: Option<String>,
    root_source: RootSource,
    verify_hostname: bool,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            ca_cert_path: None,
            root_source: RootSource::Native,
            verify_hostname: true,
        }
    }
}

impl TlsConfigBuilder {
    /// Trust only the certificates in this PEM bundle; overrides the root source
    pub fn ca_cert_path(mut self, path: impl Into<String>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Choose the root certificate source (default: native)
    pub fn root_source(mut self, source: RootSource) -> Self {
        self.root_source = source;
        self
    }

    /// Ask the engine to skip or keep the certificate name check (default: keep)
    ///
    /// This is a hint read by the engine through
    /// [`TlsConfig::verify_hostname`]. The compiled [`ClientConfig`] always
    /// verifies the chain and the name; an engine that hands it to rustls
    /// unchanged ignores `false`.
    pub fn verify_hostname(mut self, verify: bool) -> Self {
        self.verify_hostname = verify;
        self
    }

    /// Load the roots and compile the rustls configuration.
    ///
    /// Fails with [`Error::Config`] when the CA bundle is unreadable or holds
    /// no certificate, or when the native store yields nothing usable.
    pub fn build(self) -> Result<TlsConfig> {
        let store = match (&self.ca_cert_path, self.root_source) {
            (Some(path), _) => private_roots(path)?,
            (None, RootSource::WebPki) => webpki_roots(),
            (None, RootSource::Native) => native_roots()?,
        };
        let roots = store.len();
        tracing::debug!(roots, source = ?self.root_source, "TLS trust loaded");

        let client_config = ClientConfig::builder()
            .with_root_certificates(store)
            .with_no_client_auth();

        Ok(TlsConfig {
            ca_cert_path: self.ca_cert_path,
            root_source: self.root_source,
            verify_hostname: self.verify_hostname,
            roots,
            client_config: Arc::new(client_config),
        })
    }
}

fn webpki_roots() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

fn native_roots() -> Result<RootCertStore> {
    let loaded = rustls_native_certs::load_native_certs();
    let mut store = RootCertStore::empty();
    let (added, ignored) = store.add_parsable_certificates(loaded.certs);

    if store.is_empty() {
        return Err(Error::Config(format!(
            "no usable system root certificates ({} load errors)",
            loaded.errors.len()
        )));
    }
    if ignored > 0 || !loaded.errors.is_empty() {
        tracing::warn!(
            added,
            ignored,
            errors = loaded.errors.len(),
            "some system root certificates were skipped"
        );
    }
    Ok(store)
}

fn private_roots(path: &str) -> Result<RootCertStore> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Config(format!("cannot open CA bundle '{}': {}", path, e)))?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Config(format!("malformed PEM in CA bundle '{}': {}", path, e)))?;

    if certs.is_empty() {
        return Err(Error::Config(format!("CA bundle '{}' holds no certificates", path)));
    }

    let mut store = RootCertStore::empty();
    let (added, _) = store.add_parsable_certificates(certs);
    if added == 0 {
        return Err(Error::Config(format!(
            "CA bundle '{}' holds no usable certificates",
            path
        )));
    }
    Ok(store)
}

/// Check that `host` can be sent as the TLS server name (SNI).
///
/// DNS names and IP literals are accepted; one trailing dot is dropped.
pub fn parse_server_name(host: &str) -> Result<String> {
    let host = host.strip_suffix('.').unwrap_or(host);
    let invalid = || Error::Config(format!("'{}' is not a valid TLS server name", host));

    if host.is_empty() || host.len() > 253 {
        return Err(invalid());
    }
    ServerName::try_from(host).map_err(|_| invalid())?;
    Ok(host.to_string())
}
