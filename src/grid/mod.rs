// Grid ladder planning
pub mod planner;

pub use planner::{round2, round_up_to_lot, GridPlan, GridPlanner, LadderMode};
