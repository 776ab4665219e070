pub mod account;
pub mod transaction;

pub use account::{Account, AccountStatus, Owner};
pub use transaction::{TransactionRecord, TransactionResult, TransactionType};
