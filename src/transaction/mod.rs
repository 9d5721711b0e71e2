//! Ledger rows: creation with amount-sign normalization, queries, the
//! transactions listing page and the new-transaction form.

pub mod core;
mod create_endpoint;
mod new_transaction_page;
mod transactions_page;

pub use core::{
    Transaction, TransactionBuilder, TransactionListEntry, count_transactions_for_user,
    create_transaction, create_transaction_table, get_transaction, get_transactions_for_user,
    normalized_amount,
};
pub use create_endpoint::create_transaction_endpoint;
pub use new_transaction_page::get_new_transaction_page;
pub use transactions_page::get_transactions_page;
