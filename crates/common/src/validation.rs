//! Manifest Validation & Submission Verification
//!
//! Two rule sets, both pure:
//!
//! - [`validate_manifest_with_groups`] checks a manifest against the
//!   deployment's group set: every manifest group must name an on-chain
//!   group, and its aggregate resource ask must fit inside that group.
//! - [`verify_submission`] checks a submission's authenticity against the
//!   deployment record: address match, version match, then the tenant's
//!   Ed25519 signature.
//!
//! Failures are reported per-rule with enough context to be surfaced to the
//! submitting tenant verbatim.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

use crate::manifest::{Manifest, SubmitManifest};
use crate::types::{Deployment, DeploymentGroup};

// ════════════════════════════════════════════════════════════════════════════
// ERRORS
// ════════════════════════════════════════════════════════════════════════════

/// A manifest failed validation against its deployment's groups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The manifest has no groups at all.
    #[error("manifest contains no groups")]
    EmptyManifest,

    /// A manifest group has no services.
    #[error("manifest group {name} contains no services")]
    EmptyGroup { name: String },

    /// A manifest group names no deployment group.
    #[error("manifest group {name} matches no deployment group")]
    UnknownGroup { name: String },

    /// A manifest group asks for more of a resource than its deployment
    /// group offers.
    #[error("manifest group {name} exceeds {resource}: requested {requested}, available {available}")]
    InsufficientCapacity {
        name: String,
        resource: &'static str,
        requested: u128,
        available: u128,
    },
}

/// A submission failed verification against the deployment record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Submission targets a different deployment.
    #[error("submission is for deployment {submitted}, expected {expected}")]
    DeploymentMismatch { expected: String, submitted: String },

    /// Submission was built against a stale deployment version.
    #[error("submission version {submitted} does not match deployment version {expected}")]
    VersionMismatch { expected: String, submitted: String },

    /// The tenant key on the deployment record is not a valid Ed25519 key.
    #[error("deployment tenant key is malformed")]
    MalformedTenantKey,

    /// The signature does not verify against the tenant key.
    #[error("submission signature is invalid")]
    InvalidSignature,
}

// ════════════════════════════════════════════════════════════════════════════
// MANIFEST VALIDATION
// ════════════════════════════════════════════════════════════════════════════

/// Validate a manifest against the deployment's group set.
///
/// Rules, applied per manifest group in order:
/// 1. the group must contain at least one service;
/// 2. a deployment group with the same name must exist;
/// 3. total cpu / memory / storage asked by the group's services must not
///    exceed the matching deployment group's totals.
///
/// Deployment groups with no matching manifest group are allowed — a tenant
/// may stage workloads group by group.
pub fn validate_manifest_with_groups(
    manifest: &Manifest,
    groups: &[DeploymentGroup],
) -> Result<(), ValidationError> {
    if manifest.groups.is_empty() {
        return Err(ValidationError::EmptyManifest);
    }

    for mgroup in &manifest.groups {
        if mgroup.services.is_empty() {
            return Err(ValidationError::EmptyGroup {
                name: mgroup.name.clone(),
            });
        }

        let dgroup = groups
            .iter()
            .find(|g| g.name == mgroup.name)
            .ok_or_else(|| ValidationError::UnknownGroup {
                name: mgroup.name.clone(),
            })?;

        check_capacity(mgroup.name.clone(), "cpu", mgroup.total_cpu() as u128, u128::from(dgroup.total_cpu()))?;
        check_capacity(mgroup.name.clone(), "memory", mgroup.total_memory(), dgroup.total_memory())?;
        check_capacity(mgroup.name.clone(), "storage", mgroup.total_storage(), dgroup.total_storage())?;
    }

    Ok(())
}

fn check_capacity(
    name: String,
    resource: &'static str,
    requested: u128,
    available: u128,
) -> Result<(), ValidationError> {
    if requested > available {
        return Err(ValidationError::InsufficientCapacity {
            name,
            resource,
            requested,
            available,
        });
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// SUBMISSION VERIFICATION
// ════════════════════════════════════════════════════════════════════════════

/// Verify a submission's authenticity against the deployment record.
///
/// Checks, in order: the submission targets this deployment, it was built
/// against the deployment's current version, and the tenant's signature over
/// the signing message verifies against the tenant key on record.
pub fn verify_submission(
    submission: &SubmitManifest,
    deployment: &Deployment,
) -> Result<(), VerificationError> {
    if submission.address != deployment.address {
        return Err(VerificationError::DeploymentMismatch {
            expected: deployment.address.to_string(),
            submitted: submission.address.to_string(),
        });
    }

    if submission.version != deployment.version {
        return Err(VerificationError::VersionMismatch {
            expected: deployment.version.to_string(),
            submitted: submission.version.to_string(),
        });
    }

    let key = VerifyingKey::from_bytes(&deployment.tenant)
        .map_err(|_| VerificationError::MalformedTenantKey)?;
    let signature = Signature::from_slice(&submission.signature)
        .map_err(|_| VerificationError::InvalidSignature)?;

    let message = SubmitManifest::signing_message(
        &submission.address,
        &submission.version,
        &submission.manifest,
    );
    key.verify(&message, &signature)
        .map_err(|_| VerificationError::InvalidSignature)
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestGroup, Service};
    use crate::types::{
        DeploymentAddress, DeploymentState, DeploymentVersion, GroupId, ResourceGroup,
        ResourceUnit,
    };
    use ed25519_dalek::{Signer, SigningKey};

    const MIB: u64 = 1024 * 1024;

    fn addr() -> DeploymentAddress {
        DeploymentAddress::new([0x10; 32])
    }

    fn dgroup(name: &str) -> DeploymentGroup {
        DeploymentGroup {
            id: GroupId {
                address: addr(),
                seq: 0,
            },
            name: name.to_string(),
            resources: vec![ResourceGroup {
                unit: ResourceUnit {
                    cpu: 1000,
                    memory: 512 * MIB,
                    storage: 1024 * MIB,
                },
                count: 2,
                price: 50,
            }],
        }
    }

    fn service(cpu: u32, memory: u64, count: u32) -> Service {
        Service {
            name: "svc".to_string(),
            image: "registry.example/svc:v1".to_string(),
            unit: ResourceUnit {
                cpu,
                memory,
                storage: 0,
            },
            count,
        }
    }

    fn manifest_for(name: &str, services: Vec<Service>) -> Manifest {
        Manifest {
            groups: vec![ManifestGroup {
                name: name.to_string(),
                services,
            }],
        }
    }

    fn tenant_key() -> SigningKey {
        SigningKey::from_bytes(&[0x42; 32])
    }

    fn deployment(version: &[u8]) -> Deployment {
        Deployment {
            address: addr(),
            tenant: tenant_key().verifying_key().to_bytes(),
            version: DeploymentVersion::new(version.to_vec()),
            state: DeploymentState::Active,
        }
    }

    fn signed_submission(version: &[u8], manifest: Manifest) -> SubmitManifest {
        let version = DeploymentVersion::new(version.to_vec());
        let message = SubmitManifest::signing_message(&addr(), &version, &manifest);
        let signature = tenant_key().sign(&message).to_bytes().to_vec();
        SubmitManifest {
            address: addr(),
            version,
            manifest,
            signature,
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // MANIFEST VALIDATION
    // ──────────────────────────────────────────────────────────────────────

    #[test]
    fn test_valid_manifest_passes() {
        let m = manifest_for("web", vec![service(500, 128 * MIB, 2)]);
        assert!(validate_manifest_with_groups(&m, &[dgroup("web")]).is_ok());
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let m = Manifest { groups: vec![] };
        assert_eq!(
            validate_manifest_with_groups(&m, &[dgroup("web")]),
            Err(ValidationError::EmptyManifest)
        );
    }

    #[test]
    fn test_empty_group_rejected() {
        let m = manifest_for("web", vec![]);
        assert_eq!(
            validate_manifest_with_groups(&m, &[dgroup("web")]),
            Err(ValidationError::EmptyGroup {
                name: "web".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_group_rejected() {
        let m = manifest_for("db", vec![service(100, MIB, 1)]);
        assert_eq!(
            validate_manifest_with_groups(&m, &[dgroup("web")]),
            Err(ValidationError::UnknownGroup {
                name: "db".to_string()
            })
        );
    }

    #[test]
    fn test_cpu_over_capacity_rejected() {
        // Group offers 2 × 1000 mcpu; ask for 3000.
        let m = manifest_for("web", vec![service(1500, MIB, 2)]);
        let err = validate_manifest_with_groups(&m, &[dgroup("web")]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientCapacity {
                name: "web".to_string(),
                resource: "cpu",
                requested: 3000,
                available: 2000,
            }
        );
    }

    #[test]
    fn test_memory_over_capacity_rejected() {
        let m = manifest_for("web", vec![service(100, 2048 * MIB, 1)]);
        let err = validate_manifest_with_groups(&m, &[dgroup("web")]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InsufficientCapacity {
                resource: "memory",
                ..
            }
        ));
    }

    #[test]
    fn test_exact_capacity_allowed() {
        let m = manifest_for("web", vec![service(1000, 512 * MIB, 2)]);
        assert!(validate_manifest_with_groups(&m, &[dgroup("web")]).is_ok());
    }

    #[test]
    fn test_unmatched_deployment_groups_allowed() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let groups = vec![dgroup("web"), dgroup("batch")];
        assert!(validate_manifest_with_groups(&m, &groups).is_ok());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InsufficientCapacity {
            name: "web".to_string(),
            resource: "cpu",
            requested: 3000,
            available: 2000,
        };
        assert_eq!(
            format!("{}", err),
            "manifest group web exceeds cpu: requested 3000, available 2000"
        );
    }

    // ──────────────────────────────────────────────────────────────────────
    // SUBMISSION VERIFICATION
    // ──────────────────────────────────────────────────────────────────────

    #[test]
    fn test_valid_submission_verifies() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let sub = signed_submission(b"v1", m);
        assert!(verify_submission(&sub, &deployment(b"v1")).is_ok());
    }

    #[test]
    fn test_deployment_mismatch_rejected() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let mut sub = signed_submission(b"v1", m);
        sub.address = DeploymentAddress::new([0x99; 32]);
        assert!(matches!(
            verify_submission(&sub, &deployment(b"v1")),
            Err(VerificationError::DeploymentMismatch { .. })
        ));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let sub = signed_submission(b"v1", m);
        assert!(matches!(
            verify_submission(&sub, &deployment(b"v2")),
            Err(VerificationError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_manifest_rejected() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let mut sub = signed_submission(b"v1", m);
        sub.manifest.groups[0].services[0].count = 99;
        assert_eq!(
            verify_submission(&sub, &deployment(b"v1")),
            Err(VerificationError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let mut sub = signed_submission(b"v1", m);
        sub.signature = vec![0xFF; 16];
        assert_eq!(
            verify_submission(&sub, &deployment(b"v1")),
            Err(VerificationError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let m = manifest_for("web", vec![service(100, MIB, 1)]);
        let version = DeploymentVersion::new(b"v1".to_vec());
        let message = SubmitManifest::signing_message(&addr(), &version, &m);
        let intruder = SigningKey::from_bytes(&[0x13; 32]);
        let sub = SubmitManifest {
            address: addr(),
            version,
            manifest: m,
            signature: intruder.sign(&message).to_bytes().to_vec(),
        };
        assert_eq!(
            verify_submission(&sub, &deployment(b"v1")),
            Err(VerificationError::InvalidSignature)
        );
    }

}
