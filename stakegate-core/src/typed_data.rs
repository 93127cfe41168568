//! Domain-separated structured-data hashing.
//!
//! Every signature this crate checks is over a two-level hash: a struct hash
//! describing the approved action, wrapped in a domain separator scoped to
//! the chain and to the specific vault. A signature valid for one vault can
//! therefore never be replayed against another vault, and a signature valid
//! on one deployment can never be replayed on another chain.
//!
//! The domain separator is recomputed per call rather than cached, so a
//! chain-id change (a fork) invalidates outstanding signatures immediately.

use alloy_core::sol_types::SolValue;
use alloy_primitives::{keccak256, Address, B256, U256};

use crate::entry::CURRENT_FORMAT_MIN_VERSION;

/// Default EIP-712 domain name.
pub const DOMAIN_NAME: &str = "VaultRegistrar";

/// Default EIP-712 domain version.
pub const DOMAIN_VERSION: &str = "1";

const EIP712_DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const LEGACY_APPROVAL_TYPE: &[u8] =
    b"VaultValidators(bytes32 validatorsRegistryRoot,bytes validators)";

const NONCE_APPROVAL_TYPE: &[u8] = b"VaultValidators(uint256 nonce,bytes validators)";

const CONSOLIDATION_TYPE: &[u8] =
    b"ValidatorsConsolidation(address vault,bytes validators,uint256 deadline)";

/// The signing domain shared by every verifier in one deployment.
#[derive(Debug, Clone)]
pub struct SigningDomain {
    /// Domain name, [`DOMAIN_NAME`] unless overridden.
    pub name: String,
    /// Domain version, [`DOMAIN_VERSION`] unless overridden.
    pub version: String,
    /// Chain identifier of the executing chain.
    pub chain_id: u64,
}

impl SigningDomain {
    /// Creates the default domain for a chain.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
        }
    }

    /// Computes the domain separator scoped to `vault`.
    ///
    /// `H(domainTypeHash ‖ H(name) ‖ H(version) ‖ chainId ‖ vault)` with
    /// ABI-encoded fields.
    #[must_use]
    pub fn separator(&self, vault: Address) -> B256 {
        let encoded = (
            keccak256(EIP712_DOMAIN_TYPE),
            keccak256(self.name.as_bytes()),
            keccak256(self.version.as_bytes()),
            U256::from(self.chain_id),
            vault,
        )
            .abi_encode();
        keccak256(encoded)
    }
}

/// The version-dependent message a delegated manager signs over a
/// registration batch.
///
/// Legacy vaults bind the externally-advancing registry root, so a manager
/// approval lives exactly as long as that root is current. Upgraded vaults
/// bind a vault-owned nonce instead, decoupling approval replay protection
/// from the external root's cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerMessage {
    /// Pre-nonce vaults: replay protection rides on the external registry
    /// root.
    Legacy {
        /// The external validators-registry root the approval is pinned to.
        registry_root: B256,
    },
    /// Nonce-signing vaults: replay protection is the vault's own counter.
    Current {
        /// The vault-owned approval nonce.
        nonce: u64,
    },
}

impl ManagerMessage {
    /// Selects the message form from the vault's recorded protocol version.
    #[must_use]
    pub const fn for_vault_version(version: u64, registry_root: B256, nonce: u64) -> Self {
        if version >= CURRENT_FORMAT_MIN_VERSION {
            Self::Current { nonce }
        } else {
            Self::Legacy { registry_root }
        }
    }

    /// Struct hash of this approval over the given validators blob.
    #[must_use]
    pub fn struct_hash(&self, validators: &[u8]) -> B256 {
        let encoded = match self {
            Self::Legacy { registry_root } => (
                keccak256(LEGACY_APPROVAL_TYPE),
                *registry_root,
                keccak256(validators),
            )
                .abi_encode(),
            Self::Current { nonce } => (
                keccak256(NONCE_APPROVAL_TYPE),
                U256::from(*nonce),
                keccak256(validators),
            )
                .abi_encode(),
        };
        keccak256(encoded)
    }
}

/// Struct hash of a validator-consolidation request.
#[must_use]
pub fn consolidation_struct_hash(vault: Address, payload: &[u8], deadline: u64) -> B256 {
    let encoded = (
        keccak256(CONSOLIDATION_TYPE),
        vault,
        keccak256(payload),
        U256::from(deadline),
    )
        .abi_encode();
    keccak256(encoded)
}

/// The 32-byte digest signatures are made over:
/// `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)`.
#[must_use]
pub fn signing_digest(domain: &SigningDomain, vault: Address, struct_hash: B256) -> B256 {
    let separator = domain.separator(vault);
    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(separator.as_slice());
    buf[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(buf)
}
