//! Two-level certificate chain: root → domain → authority.
//!
//! Signatures are presence-checked only. Deployments that need real
//! guarantees must replace [`TrustVerifier::verify_at`]'s final step with
//! asymmetric verification against the certificate public keys.

use crate::domain::glyph::Domain;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Issuer id denoting the root authority
pub const ROOT_ISSUER: u16 = 0;

/// Number of certificates in a verified chain (root is implicit)
pub const CHAIN_LENGTH: usize = 2;

/// Domain- or authority-level certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// Authority id; for domain certificates, the id of the domain authority
    pub authority_id: u16,
    /// Domain this certificate belongs to
    pub domain: Domain,
    /// Display name
    pub name: String,
    /// Opaque public key
    pub public_key: String,
    /// Start of validity
    pub valid_from: DateTime<Utc>,
    /// End of validity
    pub valid_until: DateTime<Utc>,
    /// Issuer id; `0` for root
    pub issuer_id: u16,
    /// Issuer signature
    pub signature: String,
}

impl Certificate {
    /// Whether `now` lies inside the validity window
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    /// Whether the certificate has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}

/// Why a trust chain was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustFailure {
    /// Authority is on the revocation list
    #[error("Authority has been revoked")]
    AuthorityRevoked,

    /// No certificate for (domain, authority)
    #[error("Unknown authority: domain={domain}, authority=0x{authority:03X}")]
    UnknownAuthority {
        /// Requested domain
        domain: Domain,
        /// Requested authority
        authority: u16,
    },

    /// Authority certificate window has passed
    #[error("Authority certificate expired")]
    AuthorityExpired,

    /// Authority certificate window has not started
    #[error("Authority certificate not yet valid")]
    AuthorityNotYetValid,

    /// No certificate for the domain
    #[error("Unknown domain: {0}")]
    UnknownDomain(Domain),

    /// Domain certificate window has passed
    #[error("Domain certificate expired")]
    DomainExpired,

    /// Domain certificate window has not started
    #[error("Domain certificate not yet valid")]
    DomainNotYetValid,

    /// Authority certificate was not issued by the domain authority
    #[error("Authority not certified by domain authority")]
    IssuerMismatch,

    /// Domain certificate was not issued by root
    #[error("Domain not certified by root authority")]
    DomainNotRootIssued,

    /// Binding carries no signature
    #[error("Glyph binding signature missing")]
    MissingSignature,
}

/// Outcome of [`TrustVerifier::verify`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the chain verified
    pub valid: bool,
    /// Human-readable reason
    pub reason: String,
    /// Authority display name; empty on failure
    pub authority_name: String,
    /// Certificates checked; `0` on failure
    pub chain_length: usize,
    /// Machine-checkable failure
    #[serde(skip)]
    pub failure: Option<TrustFailure>,
}

impl VerificationResult {
    fn verified(authority_name: &str) -> Self {
        Self {
            valid: true,
            reason: "Trust chain verified".to_string(),
            authority_name: authority_name.to_string(),
            chain_length: CHAIN_LENGTH,
            failure: None,
        }
    }

    fn rejected(failure: TrustFailure) -> Self {
        Self {
            valid: false,
            reason: failure.to_string(),
            authority_name: String::new(),
            chain_length: 0,
            failure: Some(failure),
        }
    }
}

#[derive(Default)]
struct TrustStore {
    domain_certs: HashMap<Domain, Certificate>,
    authority_certs: HashMap<(Domain, u16), Certificate>,
    revoked_authorities: HashSet<(Domain, u16)>,
}

/// Verifies that a (domain, authority) pair chains back to root
pub struct TrustVerifier {
    root_public_key: String,
    store: RwLock<TrustStore>,
}

impl Default for TrustVerifier {
    fn default() -> Self {
        Self::new("ROOT_PUBLIC_KEY")
    }
}

impl TrustVerifier {
    /// Create an empty verifier anchored at `root_public_key`
    pub fn new(root_public_key: impl Into<String>) -> Self {
        Self {
            root_public_key: root_public_key.into(),
            store: RwLock::new(TrustStore::default()),
        }
    }

    /// Root public key
    pub fn root_public_key(&self) -> &str {
        &self.root_public_key
    }

    /// Install or replace a domain certificate
    pub fn add_domain_certificate(&self, cert: Certificate) {
        debug!(domain = %cert.domain, name = %cert.name, "Added domain certificate");
        self.store.write().domain_certs.insert(cert.domain, cert);
    }

    /// Install or replace an authority certificate
    pub fn add_authority_certificate(&self, cert: Certificate) {
        debug!(
            domain = %cert.domain,
            authority = cert.authority_id,
            name = %cert.name,
            "Added authority certificate"
        );
        self.store
            .write()
            .authority_certs
            .insert((cert.domain, cert.authority_id), cert);
    }

    /// Revoke an authority; all later verifications for it fail
    pub fn revoke_authority(&self, domain: Domain, authority: u16) {
        warn!(domain = %domain, authority = authority, "Revoked authority");
        self.store
            .write()
            .revoked_authorities
            .insert((domain, authority));
    }

    /// `[authority_cert, domain_cert]`, omitting whichever is missing
    pub fn authority_chain(&self, domain: Domain, authority: u16) -> Vec<Certificate> {
        let store = self.store.read();
        store
            .authority_certs
            .get(&(domain, authority))
            .into_iter()
            .chain(store.domain_certs.get(&domain))
            .cloned()
            .collect()
    }

    /// Verify the chain for (domain, authority) now
    pub fn verify(&self, domain: Domain, authority: u16, binding_signature: &str) -> VerificationResult {
        self.verify_at(domain, authority, binding_signature, Utc::now())
    }

    /// Verify the chain at `now`. Checks short-circuit in a fixed order.
    pub fn verify_at(
        &self,
        domain: Domain,
        authority: u16,
        binding_signature: &str,
        now: DateTime<Utc>,
    ) -> VerificationResult {
        match self.check_chain(domain, authority, binding_signature, now) {
            Ok(authority_name) => VerificationResult::verified(&authority_name),
            Err(failure) => {
                debug!(domain = %domain, authority = authority, reason = %failure, "Trust verification failed");
                VerificationResult::rejected(failure)
            }
        }
    }

    fn check_chain(
        &self,
        domain: Domain,
        authority: u16,
        binding_signature: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TrustFailure> {
        let store = self.store.read();

        if store.revoked_authorities.contains(&(domain, authority)) {
            return Err(TrustFailure::AuthorityRevoked);
        }

        let auth_cert = store
            .authority_certs
            .get(&(domain, authority))
            .ok_or(TrustFailure::UnknownAuthority { domain, authority })?;
        if !auth_cert.is_valid_at(now) {
            return Err(if auth_cert.is_expired_at(now) {
                TrustFailure::AuthorityExpired
            } else {
                TrustFailure::AuthorityNotYetValid
            });
        }

        let domain_cert = store
            .domain_certs
            .get(&domain)
            .ok_or(TrustFailure::UnknownDomain(domain))?;
        if !domain_cert.is_valid_at(now) {
            return Err(if domain_cert.is_expired_at(now) {
                TrustFailure::DomainExpired
            } else {
                TrustFailure::DomainNotYetValid
            });
        }

        if auth_cert.issuer_id != domain_cert.authority_id {
            return Err(TrustFailure::IssuerMismatch);
        }
        if domain_cert.issuer_id != ROOT_ISSUER {
            return Err(TrustFailure::DomainNotRootIssued);
        }
        if binding_signature.is_empty() {
            return Err(TrustFailure::MissingSignature);
        }

        Ok(auth_cert.name.clone())
    }
}

/// Verifier with a valid root → domain → authority chain, for tests and demos
#[cfg(feature = "testing")]
pub fn mock_trust_chain(domain: Domain, authority: u16, authority_name: &str) -> TrustVerifier {
    use chrono::Duration;

    let now = Utc::now();
    let verifier = TrustVerifier::default();

    let domain_name = match domain {
        Domain::SMART_CITY => "International Smart City Consortium".to_string(),
        Domain::AEROSPACE => "International Aerospace Authority".to_string(),
        Domain::MARITIME => "International Maritime Organization".to_string(),
        Domain::MILITARY => "Allied Defense Authority".to_string(),
        Domain::MEDICAL => "Global Medical AI Consortium".to_string(),
        other => format!("Domain {} Authority", other.code()),
    };

    verifier.add_domain_certificate(Certificate {
        authority_id: 0,
        domain,
        name: domain_name,
        public_key: "DOMAIN_PUBLIC_KEY_PLACEHOLDER".to_string(),
        valid_from: now - Duration::days(365),
        valid_until: now + Duration::days(5 * 365),
        issuer_id: ROOT_ISSUER,
        signature: "ROOT_SIGNATURE_PLACEHOLDER".to_string(),
    });

    verifier.add_authority_certificate(Certificate {
        authority_id: authority,
        domain,
        name: authority_name.to_string(),
        public_key: "AUTHORITY_PUBLIC_KEY_PLACEHOLDER".to_string(),
        valid_from: now - Duration::days(365),
        valid_until: now + Duration::days(3 * 365),
        issuer_id: 0,
        signature: "DOMAIN_SIGNATURE_PLACEHOLDER".to_string(),
    });

    verifier
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cert(domain: Domain, authority_id: u16, issuer_id: u16, name: &str) -> Certificate {
        let now = Utc::now();
        Certificate {
            authority_id,
            domain,
            name: name.to_string(),
            public_key: "PK".to_string(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            issuer_id,
            signature: "SIG".to_string(),
        }
    }

    fn verifier() -> TrustVerifier {
        let verifier = TrustVerifier::default();
        verifier.add_domain_certificate(cert(Domain::SMART_CITY, 0, ROOT_ISSUER, "City Consortium"));
        verifier.add_authority_certificate(cert(Domain::SMART_CITY, 0x042, 0, "Metro Traffic"));
        verifier
    }

    #[test]
    fn test_valid_chain() {
        let result = verifier().verify(Domain::SMART_CITY, 0x042, "abc");
        assert!(result.valid);
        assert_eq!(result.reason, "Trust chain verified");
        assert_eq!(result.authority_name, "Metro Traffic");
        assert_eq!(result.chain_length, 2);
        assert_eq!(result.failure, None);
    }

    #[test]
    fn test_unknown_authority() {
        let result = verifier().verify(Domain::SMART_CITY, 0x099, "abc");
        assert!(!result.valid);
        assert_eq!(result.reason, "Unknown authority: domain=smart_city, authority=0x099");
        assert_eq!(
            result.failure,
            Some(TrustFailure::UnknownAuthority {
                domain: Domain::SMART_CITY,
                authority: 0x099
            })
        );
    }

    #[test]
    fn test_revocation_checked_first() {
        let verifier = verifier();
        verifier.revoke_authority(Domain::SMART_CITY, 0x042);
        let result = verifier.verify(Domain::SMART_CITY, 0x042, "");
        assert_eq!(result.failure, Some(TrustFailure::AuthorityRevoked));
        assert_eq!(result.reason, "Authority has been revoked");
    }

    #[test]
    fn test_certificate_windows() {
        let verifier = verifier();
        let now = Utc::now();

        let result = verifier.verify_at(Domain::SMART_CITY, 0x042, "abc", now + Duration::days(2));
        assert_eq!(result.failure, Some(TrustFailure::AuthorityExpired));

        let result = verifier.verify_at(Domain::SMART_CITY, 0x042, "abc", now - Duration::days(2));
        assert_eq!(result.failure, Some(TrustFailure::AuthorityNotYetValid));

        let mut long_lived = cert(Domain::SMART_CITY, 0x042, 0, "Metro Traffic");
        long_lived.valid_until = now + Duration::days(10);
        verifier.add_authority_certificate(long_lived);
        let result = verifier.verify_at(Domain::SMART_CITY, 0x042, "abc", now + Duration::days(2));
        assert_eq!(result.failure, Some(TrustFailure::DomainExpired));
        assert_eq!(result.reason, "Domain certificate expired");
    }

    #[test]
    fn test_unknown_domain() {
        let verifier = TrustVerifier::default();
        verifier.add_authority_certificate(cert(Domain::MARITIME, 0x010, 0, "Harbour"));
        let result = verifier.verify(Domain::MARITIME, 0x010, "abc");
        assert_eq!(result.failure, Some(TrustFailure::UnknownDomain(Domain::MARITIME)));
        assert_eq!(result.reason, "Unknown domain: maritime");
    }

    #[test]
    fn test_issuer_checks() {
        let verifier = verifier();
        verifier.add_authority_certificate(cert(Domain::SMART_CITY, 0x043, 7, "Rogue"));
        let result = verifier.verify(Domain::SMART_CITY, 0x043, "abc");
        assert_eq!(result.failure, Some(TrustFailure::IssuerMismatch));

        verifier.add_domain_certificate(cert(Domain::SMART_CITY, 0, 5, "Self-signed"));
        let result = verifier.verify(Domain::SMART_CITY, 0x042, "abc");
        assert_eq!(result.failure, Some(TrustFailure::DomainNotRootIssued));
    }

    #[test]
    fn test_missing_signature() {
        let result = verifier().verify(Domain::SMART_CITY, 0x042, "");
        assert_eq!(result.failure, Some(TrustFailure::MissingSignature));
        assert_eq!(result.reason, "Glyph binding signature missing");
    }

    #[test]
    fn test_authority_chain() {
        let verifier = verifier();
        let chain = verifier.authority_chain(Domain::SMART_CITY, 0x042);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name, "Metro Traffic");
        assert_eq!(chain[1].name, "City Consortium");

        assert_eq!(verifier.authority_chain(Domain::SMART_CITY, 0x099).len(), 1);
        assert!(verifier.authority_chain(Domain::AEROSPACE, 0x042).is_empty());
    }

    #[cfg(feature = "testing")]
    #[test]
    fn test_mock_trust_chain() {
        let verifier = mock_trust_chain(Domain::SMART_CITY, 0x042, "Metro Traffic Authority");
        let result = verifier.verify(Domain::SMART_CITY, 0x042, "signature");
        assert!(result.valid);
        assert_eq!(result.authority_name, "Metro Traffic Authority");
    }
}
