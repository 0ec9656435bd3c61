pub mod account;
pub mod arbitrage;
pub mod bet;
pub mod reference;
pub mod transaction;

pub use account::*;
pub use arbitrage::*;
pub use bet::*;
pub use reference::Reference;
pub use transaction::*;
