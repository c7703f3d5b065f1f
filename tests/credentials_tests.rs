#![cfg(feature = "signing")]

use facturacol::core::FacturaError;
use facturacol::signature::Credentials;
use std::fs;
use std::path::PathBuf;

const P12_BYTES: &[u8] = include_bytes!("fixtures/credential.p12");
const BUNDLE_PEM: &str = include_str!("fixtures/bundle.pem");
const P12_PASSWORD: &str = "prueba123";

/// Copy the PKCS#12 fixture into a scratch directory so the PEM cache is
/// written next to the copy, not into the fixture tree.
fn scratch_p12(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("facturacol-test-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("credential.p12");
    fs::write(&path, P12_BYTES).unwrap();
    path
}

#[test]
fn pem_bundle_file_loads() {
    let dir = std::env::temp_dir().join(format!("facturacol-bundle-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bundle.pem");
    fs::write(&path, BUNDLE_PEM).unwrap();

    let creds = Credentials::from_pem_file(&path).unwrap();
    assert!(!creds.cert_der().is_empty());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn unreadable_pem_path_is_credential_load() {
    let err = Credentials::from_pem_file("/nonexistent/credential.pem").unwrap_err();
    assert!(matches!(err, FacturaError::CredentialLoad(_)));
}

#[test]
fn pkcs12_decodes_and_caches_pem() {
    let p12 = scratch_p12("ok");
    let creds = Credentials::from_pkcs12_file(&p12, P12_PASSWORD).unwrap();
    assert!(!creds.cert_der().is_empty());

    // The decoded PEM is cached next to the source and reused.
    let cache = p12.with_extension("pem");
    assert!(cache.exists());
    let again = Credentials::from_pkcs12_file(&p12, P12_PASSWORD).unwrap();
    assert_eq!(creds.cert_der(), again.cert_der());

    fs::remove_dir_all(p12.parent().unwrap()).ok();
}

#[test]
fn wrong_pkcs12_password_is_credential_load() {
    let p12 = scratch_p12("badpass");
    let err = Credentials::from_pkcs12_file(&p12, "contraseña-equivocada").unwrap_err();
    assert!(matches!(err, FacturaError::CredentialLoad(_)));

    // A failed decode must not leave a cache behind.
    assert!(!p12.with_extension("pem").exists());
    fs::remove_dir_all(p12.parent().unwrap()).ok();
}

#[test]
fn corrupt_pkcs12_is_credential_load() {
    let dir = std::env::temp_dir().join(format!("facturacol-corrupt-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("credential.p12");
    fs::write(&path, b"not a pkcs12 archive").unwrap();

    let err = Credentials::from_pkcs12_file(&path, P12_PASSWORD).unwrap_err();
    assert!(matches!(err, FacturaError::CredentialLoad(_)));
    fs::remove_dir_all(&dir).ok();
}
