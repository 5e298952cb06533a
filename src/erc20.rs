//! ERC20 spending approvals
//!
//! Router and position-manager contracts move tokens out of the caller's
//! balance, which requires an allowance on the token contract first. The
//! router grants exact-amount allowances immediately before the dependent
//! call rather than open-ended ones.

use crate::error::RouterError;
use crate::ledger::Ledger;
use clarity::{Address, Uint256};

/// Grants `spender` an allowance of exactly `amount` on the `erc20`
/// contract
///
/// The ledger acknowledges the approval transaction before this returns, so
/// a swap or mint submitted afterwards is guaranteed to queue behind it.
pub async fn approve_erc20<L: Ledger + ?Sized>(
    ledger: &L,
    erc20: Address,
    spender: Address,
    amount: Uint256,
) -> Result<Uint256, RouterError> {
    let txid = ledger
        .submit(
            erc20,
            "approve(address,uint256)",
            &[spender.into(), amount.into()],
            0u8.into(),
            Vec::new(),
        )
        .await?;
    debug!("approved {spender} to spend {amount} of {erc20}, txid {txid}");
    Ok(txid)
}
