//! Defines the core data model and database queries for ledger rows.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{Category, CategoryKind},
    database_id::{AccountId, CategoryId, DebtId, TransactionId},
    user::UserId,
    validation::ValidationErrors,
};

// ============================================================================
// MODELS
// ============================================================================

/// A single signed ledger entry: money earned, spent, transferred or lent.
///
/// The sign of `amount` is not what the user typed: it is derived from the
/// category's kind when the row is created (see [normalized_amount]).
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user the transaction belongs to.
    pub user_id: UserId,
    /// The signed amount of money. Never zero.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// An optional free-text note.
    pub note: Option<String>,
    /// The account the money moved through, if any.
    pub account_id: Option<AccountId>,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The debt this transaction pays into or out of, if any.
    pub debt_id: Option<DebtId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            description: description.to_owned(),
            note: None,
            account_id: None,
            debt_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The required fields are set up front; the optional account, note and debt
/// links can be chained on before handing the builder to
/// [create_transaction].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The amount as submitted by the user. The stored sign is decided by
    /// the category kind, not by this value.
    pub amount: f64,
    /// The date when the transaction occurred.
    pub date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// An optional free-text note.
    pub note: Option<String>,
    /// The account the money moved through, if any.
    pub account_id: Option<AccountId>,
    /// The debt this transaction pays into or out of, if any.
    pub debt_id: Option<DebtId>,
}

impl TransactionBuilder {
    /// Set the note for the transaction.
    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Set the account for the transaction.
    pub fn account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Set the debt for the transaction.
    pub fn debt_id(mut self, debt_id: Option<DebtId>) -> Self {
        self.debt_id = debt_id;
        self
    }
}

/// The sign-normalized amount to store for a transaction with `kind`.
///
/// Money leaving the user's pocket (expense, transfer out) is stored
/// negative; money arriving (income, transfer in) is stored positive,
/// regardless of the sign the user typed. Kinds without a canonical
/// direction (loan, debt) keep the amount exactly as given.
pub fn normalized_amount(amount: f64, kind: CategoryKind) -> f64 {
    match kind {
        CategoryKind::Expense | CategoryKind::TransferOut => -amount.abs(),
        CategoryKind::Income | CategoryKind::TransferIn => amount.abs(),
        CategoryKind::Loan | CategoryKind::Debt => amount,
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new ledger row for the owner of `category`.
///
/// The stored amount is `builder.amount` normalized against
/// `category.kind`. The row is validated before anything is written: a zero
/// normalized amount or a blank description fails the whole call.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransaction] carrying the field errors if the row fails
///   validation,
/// - [Error::NotFound] if the optional account or debt does not belong to
///   the same user as `category`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    category: &Category,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = normalized_amount(builder.amount, category.kind);
    let description = builder.description.trim();

    let mut errors = ValidationErrors::new();
    if amount == 0.0 {
        errors.add("amount", "must not be zero");
    }
    if description.is_empty() {
        errors.add("description", "is required");
    }
    if !errors.is_empty() {
        return Err(Error::InvalidTransaction(errors));
    }

    let user_id = category.user_id;

    if let Some(account_id) = builder.account_id {
        ensure_owned_row("account", account_id, user_id, connection)?;
    }
    if let Some(debt_id) = builder.debt_id {
        ensure_owned_row("debt", debt_id, user_id, connection)?;
    }

    connection
        .prepare(
            "INSERT INTO \"transaction\"
                (user_id, amount, date, description, note, account_id, category_id, debt_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, user_id, amount, date, description, note,
                       account_id, category_id, debt_id",
        )?
        .query_one(
            (
                user_id.as_i64(),
                amount,
                builder.date,
                description,
                &builder.note,
                builder.account_id,
                category.id,
                builder.debt_id,
            ),
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a transaction by its `id`, scoped to its owner.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, date, description, note,
                    account_id, category_id, debt_id
             FROM \"transaction\"
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_one((id, user_id.as_i64()), map_transaction_row)
        .map_err(|error| error.into())
}

/// A ledger row joined with the names shown in the transactions listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionListEntry {
    pub transaction: Transaction,
    pub category_name: String,
    pub account_name: Option<String>,
}

/// Retrieve the user's transactions with their category and account names,
/// newest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_transactions_for_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<TransactionListEntry>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.user_id, t.amount, t.date, t.description, t.note,
                    t.account_id, t.category_id, t.debt_id, c.name, a.name
             FROM \"transaction\" t
             INNER JOIN category c ON c.id = t.category_id
             LEFT JOIN account a ON a.id = t.account_id
             WHERE t.user_id = :user_id
             ORDER BY t.date DESC, t.id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(TransactionListEntry {
                transaction: map_transaction_row(row)?,
                category_name: row.get(9)?,
                account_name: row.get(10)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(Error::SqlError))
        .collect()
}

/// Get the number of transactions belonging to `user_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn count_transactions_for_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1",
            (user_id.as_i64(),),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the transaction table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                note TEXT,
                account_id INTEGER,
                category_id INTEGER NOT NULL,
                debt_id INTEGER,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(debt_id) REFERENCES debt(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    Ok(())
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        amount: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        note: row.get(5)?,
        account_id: row.get(6)?,
        category_id: row.get(7)?,
        debt_id: row.get(8)?,
    })
}

fn ensure_owned_row(
    table: &str,
    id: i64,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let count: u32 = connection.query_row(
        &format!("SELECT COUNT(id) FROM {table} WHERE id = ?1 AND user_id = ?2"),
        (id, user_id.as_i64()),
        |row| row.get(0),
    )?;

    if count == 0 {
        // Do not reveal whether the row exists for another user.
        return Err(Error::NotFound);
    }

    Ok(())
}



#[cfg(test)]
mod query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::resolve_account,
        category::{CategoryKind, resolve_category},
        db::initialize,
        user::{User, create_user},
    };

    use super::{Transaction, create_transaction, get_transaction, get_transactions_for_user};

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user(&conn).unwrap();

        (conn, user)
    }

    #[test]
    fn get_transaction_is_scoped_to_the_owner() {
        let (conn, user) = get_test_connection_and_user();
        let other_user = create_user(&conn).unwrap();
        let category = resolve_category(user.id, "Pay", CategoryKind::Income, &conn).unwrap();

        let transaction = create_transaction(
            Transaction::build(100.0, date!(2025 - 01 - 31), "January pay"),
            &category,
            &conn,
        )
        .unwrap();

        assert!(get_transaction(transaction.id, user.id, &conn).is_ok());
        assert_eq!(
            get_transaction(transaction.id, other_user.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn listing_joins_names_and_sorts_newest_first() {
        let (conn, user) = get_test_connection_and_user();
        let income = resolve_category(user.id, "Pay", CategoryKind::Income, &conn).unwrap();
        let expense = resolve_category(user.id, "Groceries", CategoryKind::Expense, &conn).unwrap();
        let account = resolve_account(user.id, "Everyday", &conn).unwrap();

        create_transaction(
            Transaction::build(100.0, date!(2025 - 01 - 31), "January pay"),
            &income,
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(42.0, date!(2025 - 02 - 02), "Weekly shop")
                .account_id(Some(account.id)),
            &expense,
            &conn,
        )
        .unwrap();

        let entries = get_transactions_for_user(user.id, &conn).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].transaction.description, "Weekly shop");
        assert_eq!(entries[0].category_name, "Groceries");
        assert_eq!(entries[0].account_name, Some("Everyday".to_owned()));
        assert_eq!(entries[1].transaction.description, "January pay");
        assert_eq!(entries[1].account_name, None);
    }

    #[test]
    fn listing_is_empty_for_a_user_with_no_transactions() {
        let (conn, user) = get_test_connection_and_user();

        assert_eq!(get_transactions_for_user(user.id, &conn).unwrap(), []);
    }
}
