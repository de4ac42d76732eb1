//! Signed representative votes.
//!
//! A vote names one or more blocks, either in full or by hash, under a
//! per-representative sequence number. The signature covers Blake2b over the
//! `"vote "` tag, every named block hash and the sequence, so the same
//! statement signs identically whether blocks travel in full or as hashes.

use lattice_crypto::{blake2b_256_multi, sign_message, verify_batch, verify_signature};
use lattice_ledger::Block;
use lattice_types::{Account, BlockHash, KeyPair, Signature};
use serde::{Deserialize, Serialize};

use crate::ConsensusError;

/// Most hashes a single vote may carry.
pub const MAX_VOTE_ENTRIES: usize = 12;

const VOTE_TAG: &[u8] = b"vote ";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteEntry {
    Block(Block),
    Hash(BlockHash),
}

impl VoteEntry {
    pub fn hash(&self) -> BlockHash {
        match self {
            VoteEntry::Block(block) => block.hash(),
            VoteEntry::Hash(hash) => *hash,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub account: Account,
    pub signature: Signature,
    pub sequence: u64,
    pub entries: Vec<VoteEntry>,
}

impl Vote {
    /// Build and sign a vote by `key`.
    pub fn new(key: &KeyPair, sequence: u64, entries: Vec<VoteEntry>) -> Result<Self, ConsensusError> {
        if entries.is_empty() {
            return Err(ConsensusError::EmptyVote);
        }
        if entries.len() > MAX_VOTE_ENTRIES {
            return Err(ConsensusError::TooManyEntries(entries.len()));
        }
        let mut vote = Self {
            account: key.account,
            signature: Signature::default(),
            sequence,
            entries,
        };
        vote.signature = sign_message(&vote.digest(), &key.private);
        Ok(vote)
    }

    /// Vote for a batch of hashes.
    pub fn for_hashes(key: &KeyPair, sequence: u64, hashes: &[BlockHash]) -> Result<Self, ConsensusError> {
        Self::new(key, sequence, hashes.iter().map(|h| VoteEntry::Hash(*h)).collect())
    }

    /// Vote for a single block carried in full.
    pub fn for_block(key: &KeyPair, sequence: u64, block: Block) -> Result<Self, ConsensusError> {
        Self::new(key, sequence, vec![VoteEntry::Block(block)])
    }

    pub fn hashes(&self) -> Vec<BlockHash> {
        self.entries.iter().map(VoteEntry::hash).collect()
    }

    /// The signed message.
    pub fn digest(&self) -> [u8; 32] {
        let hashes = self.hashes();
        let sequence = self.sequence.to_le_bytes();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(hashes.len() + 2);
        parts.push(VOTE_TAG);
        parts.extend(hashes.iter().map(|h| &h.as_bytes()[..]));
        parts.push(&sequence);
        blake2b_256_multi(&parts)
    }

    /// Identity of the vote including its signature; distinct for every
    /// distinct signed vote.
    pub fn full_hash(&self) -> BlockHash {
        BlockHash::new(blake2b_256_multi(&[
            &self.digest(),
            self.account.as_bytes(),
            self.signature.as_bytes(),
        ]))
    }

    pub fn validate(&self) -> bool {
        !self.entries.is_empty()
            && self.entries.len() <= MAX_VOTE_ENTRIES
            && verify_signature(&self.digest(), &self.signature, &self.account)
    }
}

/// Verify many votes at once, one verdict per vote.
pub fn validate_batch(votes: &[&Vote]) -> Vec<bool> {
    let digests: Vec<[u8; 32]> = votes.iter().map(|v| v.digest()).collect();
    let messages: Vec<&[u8]> = digests.iter().map(|d| &d[..]).collect();
    let signatures: Vec<Signature> = votes.iter().map(|v| v.signature).collect();
    let accounts: Vec<Account> = votes.iter().map(|v| v.account).collect();
    verify_batch(&messages, &signatures, &accounts)
        .into_iter()
        .zip(votes)
        .map(|(ok, vote)| ok && !vote.entries.is_empty() && vote.entries.len() <= MAX_VOTE_ENTRIES)
        .collect()
}
