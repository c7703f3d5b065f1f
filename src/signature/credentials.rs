//! Signing credential loading: X.509 certificate plus RSA private key from
//! PKCS#12 or PEM sources.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use sha2::Sha256;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::core::FacturaError;

/// An immutable certificate + RSA key pair, the single credential used for
/// both document signing and the mutual-TLS client identity.
#[derive(Clone)]
pub struct Credentials {
    cert_der: Vec<u8>,
    cert_pem: String,
    key_pem: String,
    key: RsaPrivateKey,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cert_der_len", &self.cert_der.len())
            .finish_non_exhaustive()
    }
}

fn load_err(context: &str, e: impl std::fmt::Display) -> FacturaError {
    FacturaError::CredentialLoad(format!("{context}: {e}"))
}

impl Credentials {
    /// Load from in-memory PEM strings (certificate and private key).
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, FacturaError> {
        if cert_pem.is_empty() || key_pem.is_empty() {
            return Err(FacturaError::CredentialLoad(
                "certificate and key PEM are both required".into(),
            ));
        }
        Self::from_pem_bundle(&format!("{cert_pem}\n{key_pem}"))
    }

    /// Load from a PEM bundle file holding both the certificate and the key.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, FacturaError> {
        let data = fs::read_to_string(path.as_ref())
            .map_err(|e| load_err("reading PEM file", e))?;
        Self::from_pem_bundle(&data)
    }

    /// Load from a PKCS#12 file. Decoding is delegated to the system
    /// `openssl pkcs12` tool (retried with `-legacy` for RC2-40-CBC
    /// archives); the decoded PEM is cached next to the source as
    /// `<stem>.pem` and reused until the PKCS#12 file is newer.
    pub fn from_pkcs12_file(
        path: impl AsRef<Path>,
        password: &str,
    ) -> Result<Self, FacturaError> {
        let path = path.as_ref();
        let cache = path.with_extension("pem");

        if cache_is_fresh(path, &cache) {
            return Self::from_pem_file(&cache);
        }

        decode_pkcs12_to_pem(path, password, &cache)?;
        Self::from_pem_file(&cache)
    }

    fn from_pem_bundle(pem: &str) -> Result<Self, FacturaError> {
        let mut reader = std::io::BufReader::new(pem.as_bytes());
        let items = rustls_pemfile::read_all(&mut reader)
            .map_err(|e| load_err("parsing PEM", e))?;

        let mut cert_der: Option<Vec<u8>> = None;
        let mut key: Option<RsaPrivateKey> = None;

        for item in items {
            match item {
                rustls_pemfile::Item::X509Certificate(der) => {
                    if cert_der.is_none() {
                        cert_der = Some(der);
                    }
                }
                rustls_pemfile::Item::PKCS8Key(der) => {
                    let parsed = RsaPrivateKey::from_pkcs8_der(&der)
                        .map_err(|e| load_err("parsing PKCS#8 key (RSA required)", e))?;
                    key = Some(parsed);
                }
                rustls_pemfile::Item::RSAKey(der) => {
                    let parsed = RsaPrivateKey::from_pkcs1_der(&der)
                        .map_err(|e| load_err("parsing PKCS#1 key", e))?;
                    key = Some(parsed);
                }
                _ => {}
            }
        }

        let cert_der = cert_der.ok_or_else(|| {
            FacturaError::CredentialLoad("no CERTIFICATE block found in PEM".into())
        })?;
        let key = key.ok_or_else(|| {
            FacturaError::CredentialLoad("no private key block found in PEM".into())
        })?;

        let credentials = Self {
            cert_pem: pem_encode_cert(&cert_der),
            key_pem: extract_key_pem(pem),
            cert_der,
            key,
        };
        credentials.check_key_matches_cert()?;
        Ok(credentials)
    }

    /// The key must be the private counterpart of the certificate's subject
    /// public key.
    fn check_key_matches_cert(&self) -> Result<(), FacturaError> {
        let cert = self.certificate()?;
        let public = cert
            .public_key()
            .parsed()
            .map_err(|e| load_err("parsing certificate public key", e))?;
        match public {
            PublicKey::RSA(rsa_pub) => {
                let modulus = BigUint::from_bytes_be(rsa_pub.modulus);
                let exponent = BigUint::from_bytes_be(rsa_pub.exponent);
                if &modulus != self.key.n() || &exponent != self.key.e() {
                    return Err(FacturaError::CredentialLoad(
                        "private key does not match certificate public key".into(),
                    ));
                }
                Ok(())
            }
            _ => Err(FacturaError::CredentialLoad(
                "certificate public key is not RSA".into(),
            )),
        }
    }

    /// Raw DER bytes of the certificate.
    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Certificate DER as standard base64, the form embedded in
    /// `X509Certificate` and `BinarySecurityToken` elements.
    pub fn cert_base64(&self) -> String {
        STANDARD.encode(&self.cert_der)
    }

    /// Parse the certificate on demand.
    pub fn certificate(&self) -> Result<X509Certificate<'_>, FacturaError> {
        let (_, cert) = X509Certificate::from_der(&self.cert_der)
            .map_err(|e| load_err("parsing certificate", e))?;
        Ok(cert)
    }

    /// Issuer distinguished name.
    pub fn issuer_name(&self) -> Result<String, FacturaError> {
        Ok(self.certificate()?.issuer().to_string())
    }

    /// Certificate serial number in decimal.
    pub fn serial_decimal(&self) -> Result<String, FacturaError> {
        Ok(self.certificate()?.serial.to_string())
    }

    /// Certificate and key as a combined PEM, the mTLS client identity.
    pub fn identity_pem(&self) -> String {
        format!("{}\n{}", self.cert_pem, self.key_pem)
    }

    /// Sign a precomputed SHA-256 digest with RSA PKCS#1 v1.5.
    pub fn sign_sha256(&self, digest: &[u8]) -> Result<Vec<u8>, FacturaError> {
        self.key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            .map_err(|e| FacturaError::Crypto(format!("RSA signing failed: {e}")))
    }

    /// Public key for verification in tests and diagnostics.
    pub fn public_key(&self) -> rsa::RsaPublicKey {
        self.key.to_public_key()
    }
}

fn cache_is_fresh(p12: &Path, cache: &Path) -> bool {
    let (Ok(p12_meta), Ok(cache_meta)) = (fs::metadata(p12), fs::metadata(cache)) else {
        return false;
    };
    match (p12_meta.modified(), cache_meta.modified()) {
        (Ok(p12_time), Ok(cache_time)) => cache_time >= p12_time,
        _ => false,
    }
}

/// Decode a PKCS#12 archive to PEM with the external `openssl` tool and
/// install the result at `cache` atomically (temp file + rename), so
/// concurrent loaders never observe a partial cache.
fn decode_pkcs12_to_pem(p12: &Path, password: &str, cache: &Path) -> Result<(), FacturaError> {
    let tmp: PathBuf = cache.with_extension(format!("pem.tmp.{}", std::process::id()));
    let passin = format!("pass:{password}");

    let mut modern = Command::new("openssl");
    modern
        .args(["pkcs12", "-in"])
        .arg(p12)
        .arg("-out")
        .arg(&tmp)
        .args(["-nodes", "-passin", &passin]);

    let output = modern
        .output()
        .map_err(|e| load_err("invoking openssl pkcs12", e))?;

    let output = if output.status.success() {
        output
    } else {
        // Older archives use RC2-40-CBC, which current OpenSSL only decodes
        // behind the legacy provider.
        let mut legacy = Command::new("openssl");
        legacy
            .args(["pkcs12", "-in"])
            .arg(p12)
            .arg("-out")
            .arg(&tmp)
            .args(["-nodes", "-passin", &passin, "-legacy"]);
        legacy
            .output()
            .map_err(|e| load_err("invoking openssl pkcs12 -legacy", e))?
    };

    if !output.status.success() {
        let _ = fs::remove_file(&tmp);
        return Err(FacturaError::CredentialLoad(format!(
            "openssl pkcs12 failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    fs::rename(&tmp, cache).map_err(|e| load_err("installing PEM cache", e))
}

fn pem_encode_cert(der: &[u8]) -> String {
    let b64 = STANDARD.encode(der);
    let mut out = String::from("-----BEGIN CERTIFICATE-----\n");
    for chunk in b64.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str("-----END CERTIFICATE-----\n");
    out
}

/// Keep the private-key block of the source bundle verbatim for the mTLS
/// identity.
fn extract_key_pem(pem: &str) -> String {
    for marker in ["PRIVATE KEY", "RSA PRIVATE KEY"] {
        let begin = format!("-----BEGIN {marker}-----");
        let end = format!("-----END {marker}-----");
        if let (Some(start), Some(stop)) = (pem.find(&begin), pem.find(&end)) {
            return format!("{}\n", &pem[start..stop + end.len()]);
        }
    }
    String::new()
}
