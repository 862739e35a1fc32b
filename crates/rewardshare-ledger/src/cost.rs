use crate::balance::LedgerError;
use rewardshare_types::constants::PLATFORM_FEE_PERCENT;
use rewardshare_types::Amount;

/// Task creation cost breakdown: the full reward pool plus the platform fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCost {
    pub total_reward: Amount,
    pub fee: Amount,
    pub total: Amount,
}

/// Cost of creating a task: `reward × slots + floor(reward × slots × fee%)`.
pub fn task_cost(reward: Amount, slots: u32) -> Result<TaskCost, LedgerError> {
    let total_reward = reward
        .checked_mul(slots as u64)
        .ok_or(LedgerError::Overflow)?;
    let fee = total_reward
        .checked_mul(PLATFORM_FEE_PERCENT)
        .ok_or(LedgerError::Overflow)?
        .rupiah()
        / 100;
    let fee = Amount::from_rupiah(fee);
    let total = total_reward.checked_add(fee).ok_or(LedgerError::Overflow)?;

    Ok(TaskCost {
        total_reward,
        fee,
        total,
    })
}
