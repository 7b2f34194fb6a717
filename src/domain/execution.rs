//! Trade costs and fill sizing.
//!
//! Fees are computed by a [`CommissionFee`] model chosen by the caller and
//! passed into each simulation; there is no process-wide fee setting.

use super::action::Action;

/// Fee charged for trading `size` shares at `price`.
pub trait CommissionFee {
    fn calculate(&self, price: f64, size: f64, action: Action) -> f64;

    /// A lower bound on any fee this model charges for `action`.
    fn minimum(&self, _action: Action) -> f64 {
        0.0
    }

    /// Upper bound on the whole lots `balance` can buy with this model's fee
    /// included. May be fractional; must never be below the true answer.
    fn max_affordable_lots(&self, balance: f64, price: f64, lot_size: f64) -> f64 {
        (balance - self.minimum(Action::Buy)) / (price * lot_size)
    }
}

impl<F: CommissionFee + ?Sized> CommissionFee for Box<F> {
    fn calculate(&self, price: f64, size: f64, action: Action) -> f64 {
        (**self).calculate(price, size, action)
    }

    fn minimum(&self, action: Action) -> f64 {
        (**self).minimum(action)
    }

    fn max_affordable_lots(&self, balance: f64, price: f64, lot_size: f64) -> f64 {
        (**self).max_affordable_lots(balance, price, lot_size)
    }
}

impl<F: CommissionFee + ?Sized> CommissionFee for &F {
    fn calculate(&self, price: f64, size: f64, action: Action) -> f64 {
        (**self).calculate(price, size, action)
    }

    fn minimum(&self, action: Action) -> f64 {
        (**self).minimum(action)
    }

    fn max_affordable_lots(&self, balance: f64, price: f64, lot_size: f64) -> f64 {
        (**self).max_affordable_lots(balance, price, lot_size)
    }
}

/// Stock-exchange fee schedule:
/// max(commission, floor) + slippage, plus stamp duty on sells.
#[derive(Debug, Clone, PartialEq)]
pub struct StockCommissionFee {
    pub commission_rate: f64,
    pub min_commission: f64,
    pub slippage_rate: f64,
    pub stamp_duty_rate: f64,
}

impl Default for StockCommissionFee {
    fn default() -> Self {
        StockCommissionFee {
            commission_rate: 0.0003,
            min_commission: 5.0,
            slippage_rate: 0.001,
            stamp_duty_rate: 0.0005,
        }
    }
}

impl CommissionFee for StockCommissionFee {
    fn calculate(&self, price: f64, size: f64, action: Action) -> f64 {
        let value = price * size;
        let commission = (value * self.commission_rate).max(self.min_commission);
        let slippage = value * self.slippage_rate;
        let stamp_duty = match action {
            Action::Sell => value * self.stamp_duty_rate,
            Action::Buy | Action::Hold => 0.0,
        };
        commission + slippage + stamp_duty
    }

    fn minimum(&self, _action: Action) -> f64 {
        self.min_commission.max(0.0)
    }

    /// A buy of value `v` pays at least `min + slippage * v` and at least
    /// `(commission + slippage) * v`, which bounds `v` from both sides.
    fn max_affordable_lots(&self, balance: f64, price: f64, lot_size: f64) -> f64 {
        let lot_value = price * lot_size;
        let bound = |numerator: f64, scale: f64| {
            if scale > 0.0 {
                numerator / (lot_value * scale)
            } else {
                f64::INFINITY
            }
        };
        let floored = bound(balance - self.min_commission, 1.0 + self.slippage_rate);
        let proportional = bound(balance, 1.0 + self.commission_rate + self.slippage_rate);
        floored.min(proportional)
    }
}

/// Free trading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoCommission;

impl CommissionFee for NoCommission {
    fn calculate(&self, _price: f64, _size: f64, _action: Action) -> f64 {
        0.0
    }
}

/// A sized buy order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyFill {
    pub quantity: f64,
    pub cost: f64,
    pub fee: f64,
}

impl BuyFill {
    pub fn total(&self) -> f64 {
        self.cost + self.fee
    }
}

/// Largest whole-lot buy that `balance` covers including its own fee.
///
/// The fee depends on the quantity, so lots are tried from the top down. The
/// search starts one lot above the model's
/// [`max_affordable_lots`](CommissionFee::max_affordable_lots) bound (never
/// above `floor(balance / price / lot)`), which leaves only a few candidates
/// to try. Counts too large to step by a single lot step by a few ulps.
pub fn size_buy<F: CommissionFee + ?Sized>(
    balance: f64,
    price: f64,
    lot_size: f64,
    fee: &F,
) -> Option<BuyFill> {
    if !(price > 0.0 && lot_size > 0.0 && balance > 0.0 && balance.is_finite()) {
        return None;
    }

    let max_lots = (balance / price / lot_size).floor();
    let fee_bound = fee.max_affordable_lots(balance, price, lot_size).floor() + 1.0;
    let mut lots = max_lots.min(fee_bound);

    while lots >= 1.0 {
        let quantity = lots * lot_size;
        let cost = price * quantity;
        let commission = fee.calculate(price, quantity, Action::Buy);
        if cost + commission <= balance {
            return Some(BuyFill {
                quantity,
                cost,
                fee: commission,
            });
        }
        let step = (lots * 4.0 * f64::EPSILON).max(1.0);
        lots = (lots - step).floor();
    }
    None
}
