// Price collection, order lifecycle and the trading loop
pub mod engine;
pub mod order_manager;
pub mod price_history;

pub use engine::{CycleOutcome, SkipReason, TradingEngine};
pub use order_manager::{LadderReport, OrderLifecycleController, OrderRecord, OrderStatus};
pub use price_history::PriceHistory;
