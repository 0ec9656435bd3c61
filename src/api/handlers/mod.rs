pub mod accounts;
pub mod arbitrages;
pub mod bets;
pub mod sportsbooks;
pub mod system;
pub mod transactions;

pub use accounts::*;
pub use arbitrages::*;
pub use bets::*;
pub use sportsbooks::*;
pub use system::*;
pub use transactions::*;
