use std::fmt;

use chrono::Utc;
use tokio::sync::watch;

use crate::api::{with_timeout, ExchangeGateway};
use crate::config::BotConfig;
use crate::execution::{LadderReport, OrderLifecycleController, PriceHistory};
use crate::grid::GridPlanner;
use crate::indicators::calculate_average_range;
use crate::models::ConsensusResult;
use crate::risk::{PositionPlan, RiskManager, RiskRejection};
use crate::strategy::{
    ConfluenceTrader, MarketContext, MeanReversionTrader, ReinforcementActionSelector,
    SignalEnsemble, TrendPredictor,
};

/// Window for the grid sizing range estimate
const RANGE_PERIOD: usize = 14;
/// Range used until enough prices exist to measure one
const RANGE_FALLBACK: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    BalanceUnavailable(String),
    PriceUnavailable(String),
    LowBalance { balance: f64, min_balance: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BalanceUnavailable(e) => write!(f, "balance unavailable: {}", e),
            Self::PriceUnavailable(e) => write!(f, "price unavailable: {}", e),
            Self::LowBalance {
                balance,
                min_balance,
            } => write!(f, "balance {:.2} below minimum {:.2}", balance, min_balance),
        }
    }
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Warmup { have: usize, need: usize },
    NoAction(ConsensusResult),
    RiskRejected(RiskRejection),
    Deployed {
        consensus: ConsensusResult,
        plan: PositionPlan,
        report: LadderReport,
    },
}

/// Fixed-interval orchestrator
///
/// Owns every piece of mutable trading state; a cycle runs to completion
/// before the next one starts.
pub struct TradingEngine<G: ExchangeGateway> {
    gateway: G,
    config: BotConfig,
    history: PriceHistory,
    ensemble: SignalEnsemble,
    risk: RiskManager,
    planner: GridPlanner,
    orders: OrderLifecycleController,
    cycle: u64,
}

impl<G: ExchangeGateway> TradingEngine<G> {
    pub fn new(config: BotConfig, gateway: G) -> Self {
        let ensemble = SignalEnsemble::new(
            TrendPredictor::new(config.trend_model),
            ConfluenceTrader::default(),
            MeanReversionTrader::default().with_confidence(config.mean_reversion_confidence),
            ReinforcementActionSelector::default(),
        );

        Self {
            history: PriceHistory::new(config.history_capacity),
            risk: RiskManager::new(config.risk_parameters()),
            planner: GridPlanner::new(config.grid_levels, config.grid_width),
            orders: OrderLifecycleController::new(config.settle_delay(), config.request_timeout()),
            ensemble,
            gateway,
            config,
            cycle: 0,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn orders(&self) -> &OrderLifecycleController {
        &self.orders
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    pub fn ensemble_mut(&mut self) -> &mut SignalEnsemble {
        &mut self.ensemble
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run one observe-decide-act pass
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle += 1;
        let cycle = self.cycle;
        let symbol = self.config.symbol.as_str();
        let timeout = self.config.request_timeout();

        self.risk.roll_day(Utc::now().date_naive());

        let (balance, price) = tokio::join!(
            with_timeout("get_balance", timeout, self.gateway.get_balance()),
            with_timeout("get_price", timeout, self.gateway.get_price(symbol)),
        );

        let price = match price {
            Ok(p) if p > 0.0 && p.is_finite() => {
                self.history.append(p);
                p
            }
            Ok(p) => {
                return self.skip(SkipReason::PriceUnavailable(format!("invalid price {}", p)))
            }
            Err(e) => return self.skip(SkipReason::PriceUnavailable(e.to_string())),
        };

        let balance = match balance {
            Ok(b) => b,
            Err(e) => return self.skip(SkipReason::BalanceUnavailable(e.to_string())),
        };

        if balance < self.config.min_balance {
            return self.skip(SkipReason::LowBalance {
                balance,
                min_balance: self.config.min_balance,
            });
        }

        tracing::info!(cycle, symbol, price, balance, history = self.history.len(), "Cycle");

        if self.history.len() < self.config.warmup_prices {
            tracing::debug!(
                have = self.history.len(),
                need = self.config.warmup_prices,
                "Warming up price history"
            );
            return CycleOutcome::Warmup {
                have: self.history.len(),
                need: self.config.warmup_prices,
            };
        }

        let prices = self.history.snapshot();
        let consensus = self
            .ensemble
            .evaluate(&prices, &MarketContext { capital: balance });

        for signal in &consensus.per_provider {
            tracing::debug!(
                provider = %signal.provider,
                direction = %signal.direction,
                confidence = signal.confidence,
                "Provider signal"
            );
        }

        if !consensus.direction.is_actionable()
            || consensus.confidence < self.config.activation_threshold
        {
            tracing::info!(
                direction = %consensus.direction,
                confidence = consensus.confidence,
                threshold = self.config.activation_threshold,
                "No action"
            );
            return CycleOutcome::NoAction(consensus);
        }

        let atr = calculate_average_range(&prices, RANGE_PERIOD).unwrap_or(RANGE_FALLBACK);

        let plan = match self.risk.plan_position(
            price,
            consensus.direction,
            atr,
            balance,
            self.config.min_quantity,
        ) {
            Ok(plan) => plan,
            Err(rejection) => return self.reject(rejection),
        };

        if let Err(rejection) = self.risk.validate(plan.planned_risk(price)) {
            return self.reject(rejection);
        }

        let grid = self.planner.plan(price, plan.size);
        let levels = grid.orders_for(self.config.ladder_mode, consensus.direction);

        tracing::info!(
            direction = %consensus.direction,
            confidence = consensus.confidence,
            size = plan.size,
            stop_loss = plan.stop_loss,
            take_profit = plan.take_profit,
            rr = plan.risk_reward_ratio,
            levels = levels.len(),
            "Deploying grid"
        );

        let report = self
            .orders
            .replace_ladder(&self.gateway, symbol, &levels)
            .await;

        CycleOutcome::Deployed {
            consensus,
            plan,
            report,
        }
    }

    fn skip(&self, reason: SkipReason) -> CycleOutcome {
        tracing::warn!(cycle = self.cycle, %reason, "Skipping cycle");
        CycleOutcome::Skipped(reason)
    }

    fn reject(&self, rejection: RiskRejection) -> CycleOutcome {
        tracing::warn!(cycle = self.cycle, reason = %rejection, "Trade rejected by risk manager");
        CycleOutcome::RiskRejected(rejection)
    }

    /// Run cycles until `shutdown` flips to true, then cancel everything
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let delay = self.config.cycle_delay();
        tracing::info!(
            symbol = %self.config.symbol,
            levels = self.config.grid_levels,
            width = self.config.grid_width,
            delay_secs = delay.as_secs_f64(),
            "Trading loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(cycles = self.cycle, "Shutting down, cancelling open orders");
        let symbol = self.config.symbol.clone();
        let report = self.orders.cancel_all(&self.gateway, &symbol).await;

        let summary = self.risk.daily_summary();
        tracing::info!(
            trades = summary.trades,
            winning_trades = summary.winning_trades,
            win_rate = summary.win_rate,
            daily_pnl = summary.daily_pnl,
            return_pct = summary.return_pct,
            remaining_risk = summary.remaining_risk,
            cancel_failed = report.cancel_failed,
            "Trading loop stopped"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PaperGateway;
    use crate::models::Direction;

    fn config() -> BotConfig {
        let mut cfg = BotConfig::new("BTCUSD");
        cfg.settle_delay_ms = 0;
        cfg.initial_capital = 10_000.0;
        cfg
    }

    #[tokio::test]
    async fn test_low_balance_skips_without_orders() {
        let gateway = PaperGateway::scripted(500.0, [100.0]);
        let mut engine = TradingEngine::new(config(), gateway);

        let outcome = engine.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Skipped(SkipReason::LowBalance {
                balance: 500.0,
                min_balance: 1000.0
            })
        );
        // Price still lands in the history
        assert_eq!(engine.history().len(), 1);
        assert!(engine.orders().is_empty());
        assert_eq!(engine.gateway().placed_total(), 0);
    }

    #[tokio::test]
    async fn test_price_failure_does_not_append() {
        let gateway = PaperGateway::scripted(10_000.0, [100.0]);
        gateway.set_price_unavailable(true);
        let mut engine = TradingEngine::new(config(), gateway);

        let outcome = engine.run_cycle().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Skipped(SkipReason::PriceUnavailable(_))
        ));
        assert!(engine.history().is_empty());
    }

    #[tokio::test]
    async fn test_warmup_then_no_action() {
        let gateway = PaperGateway::scripted(10_000.0, vec![100.0; 60]);
        let mut engine = TradingEngine::new(config(), gateway);

        for i in 1..50 {
            assert_eq!(
                engine.run_cycle().await,
                CycleOutcome::Warmup { have: i, need: 50 }
            );
        }

        match engine.run_cycle().await {
            CycleOutcome::NoAction(consensus) => {
                assert_eq!(consensus.direction, Direction::None);
                assert_eq!(consensus.per_provider.len(), 4);
            }
            other => panic!("expected no action, got {:?}", other),
        }
        assert_eq!(engine.gateway().placed_total(), 0);
    }

    #[tokio::test]
    async fn test_trade_limit_blocks_deployment() {
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + 0.5 * i as f64).collect();
        let gateway = PaperGateway::scripted(10_000.0, prices);
        let mut engine = TradingEngine::new(config(), gateway);

        for _ in 0..5 {
            engine.risk_mut().record_trade(100.0, 100.0, 1.0).unwrap();
        }

        let mut last = None;
        for _ in 0..100 {
            last = Some(engine.run_cycle().await);
        }

        assert_eq!(
            last,
            Some(CycleOutcome::RiskRejected(RiskRejection::TradeLimit { max: 5 }))
        );
        assert_eq!(engine.gateway().placed_total(), 0);
    }
}
