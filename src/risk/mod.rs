// Risk management module
pub mod manager;

pub use manager::{
    DailySummary, PositionPlan, RiskLedger, RiskManager, RiskParameters, RiskRejection,
};
