pub mod api_server;
pub mod sqlite;

pub use api_server::start_api_server;
pub use sqlite::{LedgerStore, TransactionQuery};
