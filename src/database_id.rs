//! Type aliases for integer row IDs in the application database.
//!
//! These exist to make function signatures self-documenting. The user ID is
//! a newtype instead (see [crate::user::UserId]) because every query in the
//! application is scoped by it.

/// An integer ID for a row in the application database.
pub type DatabaseId = i64;

/// The ID of a row in the account table.
pub type AccountId = DatabaseId;

/// The ID of a row in the category table.
pub type CategoryId = DatabaseId;

/// The ID of a row in the debt table.
pub type DebtId = DatabaseId;

/// The ID of a row in the transaction table.
pub type TransactionId = DatabaseId;
