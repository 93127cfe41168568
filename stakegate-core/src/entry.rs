//! Wire formats for validator entries and signature bundles.
//!
//! Both formats are bit-exact compatibility surfaces: entries are produced by
//! off-chain deposit-data tooling and signature bundles by the oracle network,
//! so the strides and field offsets here must never drift.

use alloy_primitives::B256;

use crate::error::{Error, Result};

/// BLS public key length in a validator entry.
pub const PUBLIC_KEY_LEN: usize = 48;

/// BLS deposit/exit signature length in a validator entry.
pub const BLS_SIGNATURE_LEN: usize = 96;

/// Deposit-data integrity hash length in a validator entry.
pub const DEPOSIT_DATA_HASH_LEN: usize = 32;

/// Explicit deposit-amount field length (current format only).
pub const DEPOSIT_AMOUNT_LEN: usize = 8;

/// Stride of a legacy validator entry.
/// Layout: `public_key(48) ‖ signature(96) ‖ deposit_data_hash(32)` = 176
pub const LEGACY_ENTRY_LEN: usize = PUBLIC_KEY_LEN + BLS_SIGNATURE_LEN + DEPOSIT_DATA_HASH_LEN;

/// Stride of a current validator entry.
/// Layout: `public_key(48) ‖ signature(96) ‖ deposit_data_hash(32) ‖ deposit_amount(8, LE)` = 184
pub const ENTRY_WITH_AMOUNT_LEN: usize = LEGACY_ENTRY_LEN + DEPOSIT_AMOUNT_LEN;

/// Length of one `r ‖ s ‖ v` signature record in a bundle.
pub const SIGNATURE_RECORD_LEN: usize = 65;

/// First vault protocol version whose entries carry an explicit deposit
/// amount and whose manager approvals are signed over a vault-owned nonce.
pub const CURRENT_FORMAT_MIN_VERSION: u64 = 5;

/// The binary layout a vault's validator entries use, selected by the vault's
/// recorded protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    /// 176-byte entries without an amount field.
    Legacy,
    /// 184-byte entries with a trailing little-endian deposit amount.
    WithAmount,
}

impl EntryFormat {
    /// Selects the entry format for a vault protocol version.
    #[must_use]
    pub const fn for_vault_version(version: u64) -> Self {
        if version >= CURRENT_FORMAT_MIN_VERSION {
            Self::WithAmount
        } else {
            Self::Legacy
        }
    }

    /// The fixed stride of one entry in this format.
    #[must_use]
    pub const fn stride(self) -> usize {
        match self {
            Self::Legacy => LEGACY_ENTRY_LEN,
            Self::WithAmount => ENTRY_WITH_AMOUNT_LEN,
        }
    }
}

/// A borrowed, stride-checked view over one validator entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorEntry<'a> {
    bytes: &'a [u8],
    format: EntryFormat,
}

impl<'a> ValidatorEntry<'a> {
    /// Wraps `bytes` as a single entry of the given format.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBatchShape`] when the length does not match
    /// the format's stride.
    pub const fn new(bytes: &'a [u8], format: EntryFormat) -> Result<Self> {
        if bytes.len() != format.stride() {
            return Err(Error::InvalidBatchShape {
                reason: "entry length does not match the vault's entry stride",
            });
        }
        Ok(Self { bytes, format })
    }

    /// The entry's BLS public key.
    #[must_use]
    pub fn public_key(&self) -> &'a [u8] {
        &self.bytes[..PUBLIC_KEY_LEN]
    }

    /// The entry's BLS deposit/exit signature.
    #[must_use]
    pub fn bls_signature(&self) -> &'a [u8] {
        &self.bytes[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + BLS_SIGNATURE_LEN]
    }

    /// The entry's deposit-data integrity hash.
    #[must_use]
    pub fn deposit_data_hash(&self) -> B256 {
        let start = PUBLIC_KEY_LEN + BLS_SIGNATURE_LEN;
        B256::from_slice(&self.bytes[start..start + DEPOSIT_DATA_HASH_LEN])
    }

    /// The explicit deposit amount in gwei, present only in the current
    /// format.
    #[must_use]
    pub fn deposit_amount(&self) -> Option<u64> {
        match self.format {
            EntryFormat::Legacy => None,
            EntryFormat::WithAmount => {
                let start = LEGACY_ENTRY_LEN;
                let amount: [u8; DEPOSIT_AMOUNT_LEN] = self.bytes
                    [start..start + DEPOSIT_AMOUNT_LEN]
                    .try_into()
                    .ok()?;
                Some(u64::from_le_bytes(amount))
            }
        }
    }

    /// The raw entry bytes, exactly one stride long.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Splits a concatenated entries blob into stride-checked entry views.
///
/// # Errors
/// Returns [`Error::EmptyBatch`] for an empty blob and
/// [`Error::InvalidBatchShape`] when the blob is not an exact multiple of the
/// format's stride.
pub fn split_entries(blob: &[u8], format: EntryFormat) -> Result<Vec<ValidatorEntry<'_>>> {
    if blob.is_empty() {
        return Err(Error::EmptyBatch);
    }
    let stride = format.stride();
    if blob.len() % stride != 0 {
        return Err(Error::InvalidBatchShape {
            reason: "entries blob is not a multiple of the entry stride",
        });
    }
    Ok(blob
        .chunks_exact(stride)
        .map(|bytes| ValidatorEntry { bytes, format })
        .collect())
}

/// An ordered concatenation of 65-byte `r ‖ s ‖ v` signature records.
///
/// Ordering is semantically significant: the threshold verifier requires the
/// recovered signers to be strictly ascending.
#[derive(Debug, Clone, Copy)]
pub struct SignatureBundle<'a> {
    bytes: &'a [u8],
}

impl<'a> SignatureBundle<'a> {
    /// Wraps `bytes` as a signature bundle.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSignatures`] when the length is not a multiple
    /// of 65 bytes.
    pub const fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % SIGNATURE_RECORD_LEN != 0 {
            return Err(Error::InvalidSignatures {
                reason: "bundle length is not a multiple of 65 bytes",
            });
        }
        Ok(Self { bytes })
    }

    /// The number of complete signature records in the bundle.
    #[must_use]
    pub const fn record_count(&self) -> usize {
        self.bytes.len() / SIGNATURE_RECORD_LEN
    }

    /// Iterates the 65-byte records in bundle order.
    pub fn records(&self) -> impl Iterator<Item = &'a [u8]> {
        self.bytes.chunks_exact(SIGNATURE_RECORD_LEN)
    }
}
