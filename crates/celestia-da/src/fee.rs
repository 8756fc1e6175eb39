//! Gas and fee estimation for pay-for-blob transactions.
//!
//! The gas a pay-for-blob transaction consumes is dominated by the shares its blobs occupy,
//! plus a per-blob charge for the transaction bytes describing each blob and a fixed cost.
use serde::{
    Deserialize,
    Serialize,
};

use crate::celestia::blob::{
    shares_needed,
    SHARE_SIZE,
};

/// Gas charged per byte of share occupied by a blob.
pub const GAS_PER_BLOB_BYTE: u64 = 8;

/// Gas charged per byte of transaction.
pub const TX_SIZE_COST_PER_BYTE: u64 = 10;

/// The number of transaction bytes needed to describe a single blob.
pub const BYTES_PER_BLOB_INFO: u64 = 70;

/// The fixed gas cost of every pay-for-blob transaction.
pub const PFB_GAS_FIXED_COST: u64 = 75_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FeeError {
    #[error("gas price `{0}` is not a finite number")]
    NonFinitePrice(f64),
    #[error("fee for gas price `{price}` and gas limit `{gas_limit}` does not fit into an i64")]
    Overflow { price: f64, gas_limit: u64 },
}

/// A non-negative, finite gas price in utia per unit of gas.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct GasPrice(f64);

impl GasPrice {
    /// Reads a gas price where any negative value means "not set".
    ///
    /// `NaN` is treated as not set as well.
    ///
    /// # Errors
    /// Returns an error if `value` is positive infinity.
    pub fn from_sentinel(value: f64) -> Result<Option<Self>, FeeError> {
        if value.is_nan() || value < 0.0 {
            return Ok(None);
        }
        if value.is_infinite() {
            return Err(FeeError::NonFinitePrice(value));
        }
        Ok(Some(Self(value)))
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

/// The fee and gas limit attached to a submission.
///
/// Serialized the way the node's blob API expects its submit options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubmitOptions {
    pub fee: i64,
    pub gas_limit: u64,
}

impl SubmitOptions {
    /// Leaves fee and gas selection to the node's default policy.
    #[must_use]
    pub const fn node_default() -> Self {
        Self {
            fee: -1,
            gas_limit: 0,
        }
    }

    #[must_use]
    pub fn is_node_default(&self) -> bool {
        *self == Self::node_default()
    }
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self::node_default()
    }
}

/// Picks the per-call price if set, falling back to the configured default.
#[must_use]
pub fn resolve_gas_price(per_call: Option<GasPrice>, default: Option<GasPrice>) -> Option<GasPrice> {
    per_call.or(default)
}

/// Estimates the gas limit of a pay-for-blob transaction carrying blobs of `blob_sizes` bytes.
#[must_use]
pub fn estimate_gas<I>(blob_sizes: I) -> u64
where
    I: IntoIterator<Item = usize>,
{
    let (blob_count, share_gas) = blob_sizes
        .into_iter()
        .fold((0u64, 0u64), |(count, gas), size| {
            let shares = shares_needed(size) as u64;
            (
                count.saturating_add(1),
                gas.saturating_add(shares * SHARE_SIZE as u64 * GAS_PER_BLOB_BYTE),
            )
        });
    share_gas
        .saturating_add(TX_SIZE_COST_PER_BYTE * BYTES_PER_BLOB_INFO * blob_count)
        .saturating_add(PFB_GAS_FIXED_COST)
}

/// Computes the fee for `gas_limit` at `price`, rounding up to the next whole utia.
///
/// # Errors
/// Returns an error if the fee cannot be represented as an `i64`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "fee computation is inherently floating point; the result is range checked"
)]
pub fn calculate_fee(price: GasPrice, gas_limit: u64) -> Result<i64, FeeError> {
    let fee = (price.get() * gas_limit as f64).ceil();
    if fee >= i64::MAX as f64 {
        return Err(FeeError::Overflow {
            price: price.get(),
            gas_limit,
        });
    }
    Ok(fee as i64)
}

/// Builds the submit options for blobs of `blob_sizes` bytes.
///
/// Without a gas price the node's default fee policy applies and nothing is estimated locally.
///
/// # Errors
/// Returns an error if the fee overflows.
pub fn submit_options<I>(price: Option<GasPrice>, blob_sizes: I) -> Result<SubmitOptions, FeeError>
where
    I: IntoIterator<Item = usize>,
{
    let Some(price) = price else {
        return Ok(SubmitOptions::node_default());
    };
    let gas_limit = estimate_gas(blob_sizes);
    let fee = calculate_fee(price, gas_limit)?;
    Ok(SubmitOptions {
        fee,
        gas_limit,
    })
}
