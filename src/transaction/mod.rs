//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the request bodies for creating and updating transactions
//! - Database functions for storing, querying, and summarising transactions
//! - Route handlers that scope every operation to the authenticated user

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod summary;

pub use core::{NewTransaction, Transaction, TransactionUpdate, create_transaction_table};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::{TransactionPage, get_transactions_endpoint};
pub use summary::{Summary, get_categories_endpoint, get_summary_endpoint};
