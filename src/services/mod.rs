pub mod transaction;

pub use transaction::{TransactionDto, TransactionService};
