// src/network/transaction.rs
//! Legacy (EIP-155) transactions
//!
//! Mint transactions are plain self-transfers of zero value whose calldata
//! is the inscription payload. They are encoded as legacy transactions so
//! that a single `gasPrice` carries the premium.

use crate::config::MiningConfig;
use crate::miner::algorithm::keccak256;
use crate::miner::search::Candidate;
use crate::network::rlp;
use crate::network::signer::SigningKey;
use crate::utils::error::MinerError;

/// Base cost of any transaction
pub const TX_BASE_GAS: u64 = 21_000;
const ZERO_BYTE_GAS: u64 = 4;
const NONZERO_BYTE_GAS: u64 = 16;

/// Intrinsic gas of a transaction carrying `data` to an externally owned account
pub fn intrinsic_gas(data: &[u8]) -> u64 {
    data.iter().fold(TX_BASE_GAS, |gas, byte| {
        gas + if *byte == 0 { ZERO_BYTE_GAS } else { NONZERO_BYTE_GAS }
    })
}

/// Unsigned legacy transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    /// Account nonce
    pub nonce: u64,
    /// Price per gas in wei
    pub gas_price: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient address
    pub to: [u8; 20],
    /// Value in wei
    pub value: u128,
    /// Calldata
    pub data: Vec<u8>,
    /// EIP-155 chain id
    pub chain_id: u64,
}

/// Signed, RLP-encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Raw encoding
    pub raw: Vec<u8>,
    /// Keccak-256 of `raw`
    pub hash: [u8; 32],
}

impl SignedTransaction {
    /// `0x`-prefixed hex of the raw encoding
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    /// `0x`-prefixed transaction hash
    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

impl LegacyTransaction {
    /// Builds the mint transaction for a winning candidate
    ///
    /// The transaction is sent to the signer's own address with zero value;
    /// the gas limit is exactly the intrinsic gas of the payload.
    pub fn mint(
        config: &MiningConfig,
        candidate: &Candidate,
        account_nonce: u64,
        gas_price: u128,
        chain_id: u64,
    ) -> Self {
        let data = config.inscription.payload(candidate.nonce);
        LegacyTransaction {
            nonce: account_nonce,
            gas_price,
            gas_limit: intrinsic_gas(&data),
            to: config.signing_key.address(),
            value: 0,
            data,
            chain_id,
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        rlp::encode_uint(out, self.nonce as u128);
        rlp::encode_uint(out, self.gas_price);
        rlp::encode_uint(out, self.gas_limit as u128);
        rlp::encode_bytes(out, &self.to);
        rlp::encode_uint(out, self.value);
        rlp::encode_bytes(out, &self.data);
    }

    /// Hash the signer commits to: `keccak(rlp([.., chainId, 0, 0]))`
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut items = Vec::with_capacity(self.data.len() + 64);
        self.encode_fields(&mut items);
        rlp::encode_uint(&mut items, self.chain_id as u128);
        rlp::encode_uint(&mut items, 0);
        rlp::encode_uint(&mut items, 0);
        keccak256(&rlp::encode_list(&items))
    }

    /// Signs with `key`, producing `rlp([.., v, r, s])` with `v = recid + 35 + 2 * chainId`
    pub fn sign(&self, key: &SigningKey) -> Result<SignedTransaction, MinerError> {
        let signature = key.sign_prehash(&self.signing_hash())?;
        let v = signature.recovery_id as u128 + 35 + 2 * self.chain_id as u128;

        let mut items = Vec::with_capacity(self.data.len() + 128);
        self.encode_fields(&mut items);
        rlp::encode_uint(&mut items, v);
        rlp::encode_uint_bytes(&mut items, &signature.r);
        rlp::encode_uint_bytes(&mut items, &signature.s);

        let raw = rlp::encode_list(&items);
        let hash = keccak256(&raw);
        Ok(SignedTransaction { raw, hash })
    }
}
