use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::round_up_to_lot;
use crate::indicators::EPSILON;
use crate::models::{Direction, Vote};

/// Account risk limits, fixed for a run unless reconfigured
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskParameters {
    /// Reference capital the daily loss limit is measured against
    pub capital: f64,
    pub risk_per_trade_fraction: f64,
    pub max_daily_loss_fraction: f64,
    pub max_trades_per_day: u32,
    pub max_position_fraction: f64,
    /// Haircut applied to the raw risk-based size
    pub safety_factor: f64,
    pub stop_atr_multiple: f64,
    pub target_atr_multiple: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            capital: 1000.0,
            risk_per_trade_fraction: 0.01, // 1% risked per trade
            max_daily_loss_fraction: 0.05, // -5% daily
            max_trades_per_day: 5,
            max_position_fraction: 0.05, // 5% max per position
            safety_factor: 0.7,          // 30% size reduction
            stop_atr_multiple: 1.5,
            target_atr_multiple: 3.5,
        }
    }
}

/// Intra-day risk state
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLedger {
    pub daily_pnl: f64,
    pub trades_today: u32,
    /// Trades booked today that closed with a positive P&L
    pub winning_trades: u32,
    pub trading_day: NaiveDate,
}

impl RiskLedger {
    pub fn new(trading_day: NaiveDate) -> Self {
        Self {
            daily_pnl: 0.0,
            trades_today: 0,
            winning_trades: 0,
            trading_day,
        }
    }

    pub fn reset(&mut self, trading_day: NaiveDate) {
        self.daily_pnl = 0.0;
        self.trades_today = 0;
        self.winning_trades = 0;
        self.trading_day = trading_day;
    }
}

/// Sized position with protective levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPlan {
    pub size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: f64,
}

impl PositionPlan {
    /// Amount lost if the stop is hit
    pub fn planned_risk(&self, entry: f64) -> f64 {
        (entry - self.stop_loss).abs() * self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySummary {
    pub trades: u32,
    pub winning_trades: u32,
    /// Winning share of today's trades, 0 before the first trade
    pub win_rate: f64,
    pub daily_pnl: f64,
    /// Daily P&L as a percentage of capital
    pub return_pct: f64,
    /// Loss budget left before the daily limit trips
    pub remaining_risk: f64,
}

/// Why a trade was refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskRejection {
    #[error("daily loss limit would be exceeded (pnl {daily_pnl:.2}, planned risk {planned_risk:.2}, limit {limit:.2})")]
    DailyLossLimit {
        daily_pnl: f64,
        planned_risk: f64,
        limit: f64,
    },

    #[error("max {max} trades per day reached")]
    TradeLimit { max: u32 },

    #[error("one lot of {min_quantity} exceeds the position cap of {cap:.4}")]
    BelowMinimumLot { min_quantity: f64, cap: f64 },

    #[error("consensus direction {0} is not tradeable")]
    NoDirection(Direction),
}

/// Position sizing and daily risk gating
///
/// Owns the [`RiskLedger`]; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct RiskManager {
    params: RiskParameters,
    ledger: RiskLedger,
}

impl RiskManager {
    pub fn new(params: RiskParameters) -> Self {
        Self {
            params,
            ledger: RiskLedger::new(Utc::now().date_naive()),
        }
    }

    pub fn params(&self) -> &RiskParameters {
        &self.params
    }

    pub fn ledger(&self) -> &RiskLedger {
        &self.ledger
    }

    /// Replace the limits; the ledger is kept
    ///
    /// A trade count above the new cap is clamped down to it, which keeps
    /// trading blocked for the rest of the day.
    pub fn reconfigure(&mut self, params: RiskParameters) {
        tracing::info!(?params, "Risk parameters reconfigured");
        let cap = params.max_trades_per_day;
        if self.ledger.trades_today > cap {
            tracing::warn!(
                trades_today = self.ledger.trades_today,
                cap,
                "Trade count above new cap, clamping"
            );
            self.ledger.trades_today = cap;
            self.ledger.winning_trades = self.ledger.winning_trades.min(cap);
        }
        self.params = params;
    }

    /// Risk-based size capped at the max position fraction of `balance`
    pub fn position_size(&self, balance: f64, atr: f64) -> f64 {
        let risk_amount = balance * self.params.risk_per_trade_fraction;
        let reduced = (risk_amount / (atr + EPSILON)) * self.params.safety_factor;
        let cap = balance * self.params.max_position_fraction;
        reduced.min(cap)
    }

    /// Stop loss, take profit and reward/risk ratio for an entry
    pub fn stops(&self, entry: f64, direction: Vote, atr: f64) -> (f64, f64, f64) {
        let stop_distance = atr * self.params.stop_atr_multiple;
        let target_distance = atr * self.params.target_atr_multiple;

        let (stop_loss, take_profit) = match direction {
            Vote::Long => (entry - stop_distance, entry + target_distance),
            Vote::Short => (entry + stop_distance, entry - target_distance),
        };

        let rr = (take_profit - entry).abs() / ((entry - stop_loss).abs() + EPSILON);
        (stop_loss, take_profit, rr)
    }

    /// Size a position in whole lots and attach protective levels
    ///
    /// The size is rounded up to the lot, or down when rounding up would
    /// break the position cap.
    pub fn plan_position(
        &self,
        entry: f64,
        direction: Direction,
        atr: f64,
        balance: f64,
        min_quantity: f64,
    ) -> Result<PositionPlan, RiskRejection> {
        let vote = direction
            .vote()
            .ok_or(RiskRejection::NoDirection(direction))?;

        let cap = balance * self.params.max_position_fraction;
        let raw = self.position_size(balance, atr);

        let mut size = round_up_to_lot(raw, min_quantity);
        if size > cap + EPSILON {
            size = (cap / min_quantity + EPSILON).floor() * min_quantity;
        }
        if size < min_quantity {
            return Err(RiskRejection::BelowMinimumLot { min_quantity, cap });
        }

        let (stop_loss, take_profit, risk_reward_ratio) = self.stops(entry, vote, atr);

        Ok(PositionPlan {
            size,
            stop_loss,
            take_profit,
            risk_reward_ratio,
        })
    }

    /// Check the daily loss budget and trade count
    pub fn validate(&self, planned_risk: f64) -> Result<(), RiskRejection> {
        let limit = -self.params.capital * self.params.max_daily_loss_fraction;
        if self.ledger.daily_pnl - planned_risk < limit {
            return Err(RiskRejection::DailyLossLimit {
                daily_pnl: self.ledger.daily_pnl,
                planned_risk,
                limit,
            });
        }

        if self.ledger.trades_today >= self.params.max_trades_per_day {
            return Err(RiskRejection::TradeLimit {
                max: self.params.max_trades_per_day,
            });
        }

        Ok(())
    }

    /// Book a completed trade, returns its P&L
    ///
    /// Refused once today's trade count has reached the cap; the ledger is
    /// left untouched in that case.
    pub fn record_trade(
        &mut self,
        entry: f64,
        exit: f64,
        size: f64,
    ) -> Result<f64, RiskRejection> {
        if self.ledger.trades_today >= self.params.max_trades_per_day {
            return Err(RiskRejection::TradeLimit {
                max: self.params.max_trades_per_day,
            });
        }

        let pnl = (exit - entry) * size;
        self.ledger.daily_pnl += pnl;
        self.ledger.trades_today += 1;
        if pnl > 0.0 {
            self.ledger.winning_trades += 1;
        }

        tracing::info!(
            pnl,
            daily_pnl = self.ledger.daily_pnl,
            trades_today = self.ledger.trades_today,
            winning_trades = self.ledger.winning_trades,
            "Trade recorded"
        );
        Ok(pnl)
    }

    /// Reset the ledger for a new day
    pub fn reset_daily(&mut self, today: NaiveDate) {
        self.ledger.reset(today);
    }

    /// Reset the ledger if `today` is a later date than the ledger's
    pub fn roll_day(&mut self, today: NaiveDate) -> bool {
        if today > self.ledger.trading_day {
            tracing::info!(
                previous = %self.ledger.trading_day,
                %today,
                trades = self.ledger.trades_today,
                daily_pnl = self.ledger.daily_pnl,
                "New trading day, resetting risk ledger"
            );
            self.ledger.reset(today);
            true
        } else {
            false
        }
    }

    pub fn daily_summary(&self) -> DailySummary {
        let win_rate = if self.ledger.trades_today == 0 {
            0.0
        } else {
            self.ledger.winning_trades as f64 / self.ledger.trades_today as f64
        };
        let return_pct = if self.params.capital > 0.0 {
            self.ledger.daily_pnl / self.params.capital * 100.0
        } else {
            0.0
        };

        DailySummary {
            trades: self.ledger.trades_today,
            winning_trades: self.ledger.winning_trades,
            win_rate,
            daily_pnl: self.ledger.daily_pnl,
            return_pct,
            remaining_risk: self.params.capital * self.params.max_daily_loss_fraction
                + self.ledger.daily_pnl,
        }
    }
}
