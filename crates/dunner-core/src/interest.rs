//! Late-payment interest under the Late Payment of Commercial Debts
//! (Interest) Act 1998: statutory 8% on top of the Bank of England base
//! rate, plus a fixed recovery cost banded by principal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DomainError;
use crate::invoice::days_overdue;

/// Fixed by the Act.
pub const STATUTORY_RATE_PCT: f64 = 8.0;

#[derive(Debug, Clone)]
pub struct InterestParams {
    pub principal_pence: i64,
    pub due_date: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
    /// Bank of England base rate in percent. Deployment configuration —
    /// update when the BoE moves it.
    pub base_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestBreakdown {
    pub principal_pence: i64,
    pub annual_rate_pct: f64,
    pub days_overdue: i64,
    pub interest_pence: i64,
    pub recovery_cost_pence: i64,
    pub total_owed_pence: i64,
}

/// Fixed debt recovery cost banded by principal: £40 under £1,000,
/// £70 under £10,000, £100 above.
pub fn fixed_recovery_cost_pence(principal_pence: i64) -> i64 {
    if principal_pence < 100_000 {
        4_000
    } else if principal_pence < 1_000_000 {
        7_000
    } else {
        10_000
    }
}

/// Daily interest = principal × annual rate / 365, accrued per day overdue.
pub fn calculate(params: &InterestParams) -> Result<InterestBreakdown, DomainError> {
    if params.principal_pence <= 0 {
        return Err(DomainError::InvalidPrincipal);
    }
    let days = days_overdue(params.due_date, params.as_of);
    if days < 0 {
        return Err(DomainError::DueDateInFuture);
    }

    let annual_rate_pct = STATUTORY_RATE_PCT + params.base_rate_pct;
    let daily = params.principal_pence as f64 * (annual_rate_pct / 100.0) / 365.0;
    let interest_pence = (daily * days as f64).round() as i64;
    let recovery_cost_pence = fixed_recovery_cost_pence(params.principal_pence);

    Ok(InterestBreakdown {
        principal_pence: params.principal_pence,
        annual_rate_pct,
        days_overdue: days,
        interest_pence,
        recovery_cost_pence,
        total_owed_pence: params.principal_pence + interest_pence + recovery_cost_pence,
    })
}
