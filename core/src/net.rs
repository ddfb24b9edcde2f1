/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Sonda, a hand-written HTTP/1.0 client.
 *
 * Sonda is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sonda is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sonda.  If not, see <http://www.gnu.org/licenses/>.
 */

//! TLS helpers: server trust strategies, client identity loading, and the handshake itself.
//!
//! Server certificates are checked by a pluggable [`ServerTrust`]. The default strategy,
//! [`InsecureTrustAll`], accepts every certificate; [`WebPkiTrust`] validates against the
//! platform roots with webpki-roots as fallback. The connection code never looks at which one
//! is in use.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig as TlsConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::error::Elapsed;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::{ClientCertConfig, ClientConfig};
use crate::error::HttpError;

/// Strategy deciding which server certificates are acceptable.
pub trait ServerTrust: fmt::Debug + Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Build the rustls verifier implementing this strategy.
    fn verifier(&self, provider: &Arc<CryptoProvider>) -> Result<Arc<dyn ServerCertVerifier>, HttpError>;
}

/// Accepts every server certificate without validation. Handshake signatures are still checked,
/// so the peer must hold the key of the certificate it presents, whatever that certificate is.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureTrustAll;

impl ServerTrust for InsecureTrustAll {
    fn name(&self) -> &'static str {
        "insecure-trust-all"
    }

    fn verifier(&self, provider: &Arc<CryptoProvider>) -> Result<Arc<dyn ServerCertVerifier>, HttpError> {
        Ok(Arc::new(AcceptAnyCertificate {
            provider: provider.clone(),
        }))
    }
}

/// Validates the chain against the platform roots (webpki-roots when none are available).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPkiTrust;

impl ServerTrust for WebPkiTrust {
    fn name(&self) -> &'static str {
        "webpki"
    }

    fn verifier(&self, provider: &Arc<CryptoProvider>) -> Result<Arc<dyn ServerCertVerifier>, HttpError> {
        let verifier = WebPkiServerVerifier::builder_with_provider(Arc::new(build_root_store()), provider.clone())
            .build()
            .map_err(|e| HttpError::tls(format!("cannot build certificate verifier: {}", e)))?;
        Ok(verifier)
    }
}

#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Load the client certificate chain and private key from PEM files.
pub fn load_client_identity(
    identity: &ClientCertConfig,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), HttpError> {
    let cert_path = identity.cert_path.display();
    let certs = CertificateDer::pem_file_iter(&identity.cert_path)
        .map_err(|e| HttpError::tls(format!("cannot read certificate {}: {}", cert_path, e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| HttpError::tls(format!("cannot parse certificate {}: {}", cert_path, e)))?;
    if certs.is_empty() {
        return Err(HttpError::tls(format!("no certificate found in {}", cert_path)));
    }
    let key = PrivateKeyDer::from_pem_file(&identity.key_path).map_err(|e| {
        HttpError::tls(format!("cannot load private key {}: {}", identity.key_path.display(), e))
    })?;
    Ok((certs, key))
}

/// TLS client configuration for the given options: trust strategy plus optional client identity.
pub fn tls_client_config(config: &ClientConfig) -> Result<Arc<TlsConfig>, HttpError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = config.trust.verifier(&provider)?;
    let builder = TlsConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| HttpError::tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier);
    let tls = match &config.client_cert {
        Some(identity) => {
            let (certs, key) = load_client_identity(identity)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| HttpError::tls(format!("client certificate rejected: {}", e)))?
        }
        None => builder.with_no_client_auth(),
    };
    Ok(Arc::new(tls))
}

pub fn server_name(host: &str) -> Result<ServerName<'static>, HttpError> {
    ServerName::try_from(host.to_string()).map_err(|_| HttpError::tls(format!("invalid host name: {}", host)))
}

/// Run `fut` under `limit`. A zero limit means no timeout at all.
pub async fn within<F: Future>(limit: Duration, fut: F) -> Result<F::Output, Elapsed> {
    if limit.is_zero() {
        Ok(fut.await)
    } else {
        tokio::time::timeout(limit, fut).await
    }
}

/// Client-mode TLS handshake over an established TCP stream (direct or proxy tunnel).
pub async fn handshake(
    tcp: TcpStream,
    host: &str,
    config: &ClientConfig,
    limit: Duration,
) -> Result<TlsStream<TcpStream>, HttpError> {
    let connector = TlsConnector::from(tls_client_config(config)?);
    let name = server_name(host)?;
    tracing::debug!("TLS handshake with {} (trust: {})", host, config.trust.name());
    match within(limit, connector.connect(name, tcp)).await {
        Ok(Ok(tls)) => Ok(tls),
        Ok(Err(e)) => Err(HttpError::tls(format!("handshake with {} failed: {}", host, e))),
        Err(_) => Err(HttpError::tls(format!("handshake with {} timed out", host))),
    }
}
