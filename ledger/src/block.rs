//! Block model.
//!
//! Every variant is immutable and content-addressed: the hash is Blake2b-256
//! over a per-variant domain tag followed by the variant's typed fields.
//! Signature and work are not part of the hash. Blocks never reference each
//! other in memory, only by hash through the store.

use lattice_crypto::{blake2b_256_multi, sign_message, verify_signature};
use lattice_types::{Account, Amount, BlockHash, Link, PrivateKey, Root, Signature};
use serde::{Deserialize, Serialize};

/// Variant discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Open,
    Send,
    Receive,
    Change,
    State,
    Dividend,
    Claim,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Open => "open",
            BlockType::Send => "send",
            BlockType::Receive => "receive",
            BlockType::Change => "change",
            BlockType::State => "state",
            BlockType::Dividend => "dividend",
            BlockType::Claim => "claim",
        }
    }

    /// Domain separation prefix hashed in front of the block fields.
    fn tag(&self) -> &'static [u8] {
        match self {
            BlockType::Open => b"lattice:open",
            BlockType::Send => b"lattice:send",
            BlockType::Receive => b"lattice:receive",
            BlockType::Change => b"lattice:change",
            BlockType::State => b"lattice:state",
            BlockType::Dividend => b"lattice:dividend",
            BlockType::Claim => b"lattice:claim",
        }
    }

    /// State, dividend and claim blocks carry the full account state.
    pub fn is_state_era(&self) -> bool {
        matches!(self, BlockType::State | BlockType::Dividend | BlockType::Claim)
    }
}

/// First block of a legacy account chain, receiving `source`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    /// Balance of the sender after the send.
    pub balance: Amount,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub signature: Signature,
    pub work: u64,
}

/// Unified block carrying the whole account state after the operation.
///
/// The meaning of `link` depends on the balance delta: destination account
/// when the balance decreases, source hash when it increases, zero or the
/// epoch sentinel when it is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBlock {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
    /// The account's dividend pointer.
    pub dividend: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

/// Issues a dividend out of the issuer's balance. `dividend` names the
/// previous dividend in the global dividend chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendBlock {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub dividend: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

/// Claims the account's share of the dividend named by `dividend`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimBlock {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub dividend: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Open(OpenBlock),
    Send(SendBlock),
    Receive(ReceiveBlock),
    Change(ChangeBlock),
    State(StateBlock),
    Dividend(DividendBlock),
    Claim(ClaimBlock),
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Open(_) => BlockType::Open,
            Block::Send(_) => BlockType::Send,
            Block::Receive(_) => BlockType::Receive,
            Block::Change(_) => BlockType::Change,
            Block::State(_) => BlockType::State,
            Block::Dividend(_) => BlockType::Dividend,
            Block::Claim(_) => BlockType::Claim,
        }
    }

    pub fn is_state_era(&self) -> bool {
        self.block_type().is_state_era()
    }

    pub fn hash(&self) -> BlockHash {
        let tag = self.block_type().tag();
        let digest = match self {
            Block::Open(b) => blake2b_256_multi(&[
                tag,
                b.source.as_bytes(),
                b.representative.as_bytes(),
                b.account.as_bytes(),
            ]),
            Block::Send(b) => blake2b_256_multi(&[
                tag,
                b.previous.as_bytes(),
                b.destination.as_bytes(),
                &b.balance.to_be_bytes(),
            ]),
            Block::Receive(b) => {
                blake2b_256_multi(&[tag, b.previous.as_bytes(), b.source.as_bytes()])
            }
            Block::Change(b) => {
                blake2b_256_multi(&[tag, b.previous.as_bytes(), b.representative.as_bytes()])
            }
            Block::State(b) => blake2b_256_multi(&[
                tag,
                b.account.as_bytes(),
                b.previous.as_bytes(),
                b.representative.as_bytes(),
                &b.balance.to_be_bytes(),
                b.link.as_bytes(),
                b.dividend.as_bytes(),
            ]),
            Block::Dividend(DividendBlock {
                account,
                previous,
                representative,
                balance,
                dividend,
                ..
            })
            | Block::Claim(ClaimBlock {
                account,
                previous,
                representative,
                balance,
                dividend,
                ..
            }) => blake2b_256_multi(&[
                tag,
                account.as_bytes(),
                previous.as_bytes(),
                representative.as_bytes(),
                &balance.to_be_bytes(),
                dividend.as_bytes(),
            ]),
        };
        BlockHash::new(digest)
    }

    /// Zero for the first block of a chain.
    pub fn previous(&self) -> BlockHash {
        match self {
            Block::Open(_) => BlockHash::ZERO,
            Block::Send(b) => b.previous,
            Block::Receive(b) => b.previous,
            Block::Change(b) => b.previous,
            Block::State(b) => b.previous,
            Block::Dividend(b) => b.previous,
            Block::Claim(b) => b.previous,
        }
    }

    /// The previous hash, or the account for the first block of a chain.
    pub fn root(&self) -> Root {
        match self {
            Block::Open(b) => Root::from(b.account),
            Block::State(b) if b.previous.is_zero() => Root::from(b.account),
            other => Root::from(other.previous()),
        }
    }

    /// Owning account, for the variants that carry one.
    pub fn account(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.account),
            Block::State(b) => Some(b.account),
            Block::Dividend(b) => Some(b.account),
            Block::Claim(b) => Some(b.account),
            Block::Send(_) | Block::Receive(_) | Block::Change(_) => None,
        }
    }

    pub fn representative(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.representative),
            Block::Change(b) => Some(b.representative),
            Block::State(b) => Some(b.representative),
            Block::Dividend(b) => Some(b.representative),
            Block::Claim(b) => Some(b.representative),
            Block::Send(_) | Block::Receive(_) => None,
        }
    }

    pub fn balance(&self) -> Option<Amount> {
        match self {
            Block::Send(b) => Some(b.balance),
            Block::State(b) => Some(b.balance),
            Block::Dividend(b) => Some(b.balance),
            Block::Claim(b) => Some(b.balance),
            Block::Open(_) | Block::Receive(_) | Block::Change(_) => None,
        }
    }

    /// Source hash of legacy open and receive blocks.
    pub fn source(&self) -> Option<BlockHash> {
        match self {
            Block::Open(b) => Some(b.source),
            Block::Receive(b) => Some(b.source),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<Link> {
        match self {
            Block::State(b) => Some(b.link),
            _ => None,
        }
    }

    /// Destination of a legacy send.
    pub fn destination(&self) -> Option<Account> {
        match self {
            Block::Send(b) => Some(b.destination),
            _ => None,
        }
    }

    pub fn dividend(&self) -> Option<BlockHash> {
        match self {
            Block::State(b) => Some(b.dividend),
            Block::Dividend(b) => Some(b.dividend),
            Block::Claim(b) => Some(b.dividend),
            _ => None,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Block::Open(b) => &b.signature,
            Block::Send(b) => &b.signature,
            Block::Receive(b) => &b.signature,
            Block::Change(b) => &b.signature,
            Block::State(b) => &b.signature,
            Block::Dividend(b) => &b.signature,
            Block::Claim(b) => &b.signature,
        }
    }

    pub fn set_signature(&mut self, signature: Signature) {
        match self {
            Block::Open(b) => b.signature = signature,
            Block::Send(b) => b.signature = signature,
            Block::Receive(b) => b.signature = signature,
            Block::Change(b) => b.signature = signature,
            Block::State(b) => b.signature = signature,
            Block::Dividend(b) => b.signature = signature,
            Block::Claim(b) => b.signature = signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Open(b) => b.work,
            Block::Send(b) => b.work,
            Block::Receive(b) => b.work,
            Block::Change(b) => b.work,
            Block::State(b) => b.work,
            Block::Dividend(b) => b.work,
            Block::Claim(b) => b.work,
        }
    }

    pub fn set_work(&mut self, work: u64) {
        match self {
            Block::Open(b) => b.work = work,
            Block::Send(b) => b.work = work,
            Block::Receive(b) => b.work = work,
            Block::Change(b) => b.work = work,
            Block::State(b) => b.work = work,
            Block::Dividend(b) => b.work = work,
            Block::Claim(b) => b.work = work,
        }
    }

    /// Sign the block hash with `key`.
    pub fn sign(&mut self, key: &PrivateKey) {
        let signature = sign_message(self.hash().as_bytes(), key);
        self.set_signature(signature);
    }

    pub fn verify_signature(&self, signer: &Account) -> bool {
        verify_signature(self.hash().as_bytes(), self.signature(), signer)
    }
}
