//! Owner registry
//!
//! The fixed set of principals allowed to act on a wallet, together with
//! the quorum required to execute a transaction.

use crate::multisig::wallet::MultisigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable owner set and quorum (M-of-N)
///
/// Deserialization goes through `OwnerRegistry::new`, so a stored registry
/// is held to the same rules as a freshly constructed one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawRegistry")]
pub struct OwnerRegistry {
    /// Owner identifiers in construction order
    owners: Vec<String>,
    /// Confirmations required before execution (M)
    quorum: usize,
}

/// Unchecked registry as read from storage
#[derive(Deserialize)]
struct RawRegistry {
    owners: Vec<String>,
    quorum: usize,
}

impl TryFrom<RawRegistry> for OwnerRegistry {
    type Error = MultisigError;

    fn try_from(raw: RawRegistry) -> Result<Self, Self::Error> {
        OwnerRegistry::new(raw.owners, raw.quorum)
    }
}

impl OwnerRegistry {
    /// Create a new registry
    ///
    /// # Arguments
    /// * `owners` - Owner identifiers (N), order is preserved
    /// * `quorum` - Minimum confirmations required (M)
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if owners is empty, contains duplicates,
    /// or the quorum is zero or larger than the owner count
    pub fn new(owners: Vec<String>, quorum: usize) -> Result<Self, MultisigError> {
        if owners.is_empty() {
            return Err(MultisigError::InvalidConfiguration(
                "owners required".to_string(),
            ));
        }

        if quorum == 0 {
            return Err(MultisigError::InvalidConfiguration(
                "quorum must be at least 1".to_string(),
            ));
        }

        if quorum > owners.len() {
            return Err(MultisigError::InvalidConfiguration(format!(
                "quorum {} exceeds owner count {}",
                quorum,
                owners.len()
            )));
        }

        let mut seen = HashSet::with_capacity(owners.len());
        for owner in &owners {
            if owner.is_empty() {
                return Err(MultisigError::InvalidConfiguration(
                    "invalid owner".to_string(),
                ));
            }
            if !seen.insert(owner.as_str()) {
                return Err(MultisigError::InvalidConfiguration(format!(
                    "owner not unique: {}",
                    owner
                )));
            }
        }

        Ok(Self { owners, quorum })
    }

    /// Check if an identifier belongs to an owner
    pub fn is_owner(&self, id: &str) -> bool {
        self.owners.iter().any(|o| o == id)
    }

    /// Owners in construction order
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Required confirmations (M)
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Total owner count (N)
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.quorum, self.owners.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_owners() -> Vec<String> {
        vec![
            "0xc0ffee254729296a45a3885639AC7E10F9d54979".to_string(),
            "0x999999cf1046e68e36E1aA2E0E07105eDDD1f08E".to_string(),
            "0x913D2112F2Bf0ec05D73A85A4c0C3025f7160F29".to_string(),
        ]
    }

    #[test]
    fn test_registry_creation() {
        let registry = OwnerRegistry::new(sample_owners(), 2).unwrap();

        assert_eq!(registry.quorum(), 2);
        assert_eq!(registry.owner_count(), 3);
        assert_eq!(registry.description(), "2-of-3");
        assert_eq!(registry.owners(), sample_owners().as_slice());
    }

    #[test]
    fn test_registry_validation() {
        // No owners
        assert!(matches!(
            OwnerRegistry::new(vec![], 1),
            Err(MultisigError::InvalidConfiguration(_))
        ));

        // Zero quorum
        assert!(matches!(
            OwnerRegistry::new(sample_owners(), 0),
            Err(MultisigError::InvalidConfiguration(_))
        ));

        // Quorum > owners
        assert!(matches!(
            OwnerRegistry::new(sample_owners(), 4),
            Err(MultisigError::InvalidConfiguration(_))
        ));

        // Duplicate owners
        assert!(matches!(
            OwnerRegistry::new(vec!["same".to_string(), "same".to_string()], 1),
            Err(MultisigError::InvalidConfiguration(_))
        ));

        // Empty identifier
        assert!(OwnerRegistry::new(vec!["".to_string()], 1).is_err());
    }

    #[test]
    fn test_single_owner_is_allowed() {
        let registry = OwnerRegistry::new(vec!["solo".to_string()], 1).unwrap();
        assert_eq!(registry.description(), "1-of-1");
    }

    #[test]
    fn test_is_owner() {
        let owners = sample_owners();
        let registry = OwnerRegistry::new(owners.clone(), 2).unwrap();

        assert!(registry.is_owner(&owners[0]));
        assert!(registry.is_owner(&owners[2]));
        assert!(!registry.is_owner("0x0000000000000000000000000000000000000000"));
    }

    #[test]
    fn test_deserialize_enforces_rules() {
        let registry = OwnerRegistry::new(sample_owners(), 2).unwrap();
        let json = serde_json::to_string(&registry).unwrap();
        let restored: OwnerRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, registry);

        let zero_quorum = r#"{"owners":["a","b"],"quorum":0}"#;
        let err = serde_json::from_str::<OwnerRegistry>(zero_quorum).unwrap_err();
        assert!(err.to_string().contains("quorum must be at least 1"));

        assert!(serde_json::from_str::<OwnerRegistry>(r#"{"owners":[],"quorum":1}"#).is_err());
        assert!(
            serde_json::from_str::<OwnerRegistry>(r#"{"owners":["a","a"],"quorum":1}"#).is_err()
        );
        assert!(serde_json::from_str::<OwnerRegistry>(r#"{"owners":["a"],"quorum":2}"#).is_err());
    }
}
