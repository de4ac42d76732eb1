//! Dividend share arithmetic.

use lattice_store::DividendInfo;
use lattice_types::Amount;
use primitive_types::U256;

/// Share of `info` owed to an account holding `balance` when it claims:
/// `floor(balance * amount / eligible_supply)`. `None` when the share does
/// not fit the remaining pool.
pub fn claim_share(balance: Amount, info: &DividendInfo) -> Option<Amount> {
    if info.eligible_supply.is_zero() {
        return Some(Amount::ZERO);
    }
    let product = U256::from(balance.number()) * U256::from(info.amount.number());
    let share = product / U256::from(info.eligible_supply.number());
    let share = u128::try_from(share).ok().map(Amount::raw)?;
    if share > info.unclaimed() {
        return None;
    }
    Some(share)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::{Account, BlockHash};

    fn info(amount: u128, eligible: u128, claimed: u128) -> DividendInfo {
        DividendInfo {
            account: Account::from_u64(1),
            amount: Amount::raw(amount),
            eligible_supply: Amount::raw(eligible),
            height: 1,
            previous: BlockHash::ZERO,
            claimed: Amount::raw(claimed),
        }
    }

    #[test]
    fn share_is_proportional_and_floored() {
        assert_eq!(claim_share(Amount::raw(10), &info(100, 1_000, 0)), Some(Amount::raw(1)));
        assert_eq!(claim_share(Amount::raw(15), &info(100, 1_000, 0)), Some(Amount::raw(1)));
        assert_eq!(claim_share(Amount::raw(500), &info(100, 1_000, 0)), Some(Amount::raw(50)));
    }

    #[test]
    fn large_values_do_not_overflow() {
        let big = u128::MAX / 2;
        let share = claim_share(Amount::raw(big), &info(big, u128::MAX, 0)).unwrap();
        assert!(share.number() < big);
        assert!(share.number() > big / 3);
    }

    #[test]
    fn share_cannot_exceed_pool() {
        assert_eq!(claim_share(Amount::raw(1_000), &info(100, 1_000, 1)), None);
    }

    #[test]
    fn empty_eligible_supply_pays_nothing() {
        assert_eq!(claim_share(Amount::raw(5), &info(100, 0, 0)), Some(Amount::ZERO));
    }
}
