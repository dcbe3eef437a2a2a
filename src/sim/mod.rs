/// Month and hour-of-day lookup for step indices.
pub mod calendar;
pub mod dispatch;
pub mod kpi;
/// Monthly peak shaving for capacity-billed contracts.
pub mod peak;
pub mod power_balance;
pub mod types;
