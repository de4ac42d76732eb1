//! Logical tables.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Table {
    /// account -> AccountInfo
    Accounts,
    /// block hash -> serialized block
    Blocks,
    /// block hash -> hash of the next block in the same chain
    Successors,
    /// (destination, send hash) -> PendingInfo
    Pending,
    /// representative -> delegated weight
    Representation,
    /// legacy head hash -> owning account
    Frontiers,
    /// (missing dependency, block hash) -> serialized unchecked block
    Unchecked,
    /// (prefix, mask) -> XOR of account heads
    Checksum,
    /// representative -> highest-sequence vote seen
    Votes,
    /// dividend hash -> DividendInfo
    Dividends,
    /// (dividend hash, claim hash) -> claiming account
    DividendClaims,
    /// string key -> opaque value
    Meta,
}

impl Table {
    pub const ALL: [Table; 12] = [
        Table::Accounts,
        Table::Blocks,
        Table::Successors,
        Table::Pending,
        Table::Representation,
        Table::Frontiers,
        Table::Unchecked,
        Table::Checksum,
        Table::Votes,
        Table::Dividends,
        Table::DividendClaims,
        Table::Meta,
    ];

    /// Name used by backends for the physical database.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Blocks => "blocks",
            Table::Successors => "successors",
            Table::Pending => "pending",
            Table::Representation => "representation",
            Table::Frontiers => "frontiers",
            Table::Unchecked => "unchecked",
            Table::Checksum => "checksum",
            Table::Votes => "votes",
            Table::Dividends => "dividends",
            Table::DividendClaims => "dividend_claims",
            Table::Meta => "meta",
        }
    }
}
