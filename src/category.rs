//! The category model: a per-user label-with-kind attached to every ledger
//! row, plus the find-or-create resolver.
//!
//! The kind is what drives amount-sign normalization when a transaction is
//! created (see [crate::transaction]).

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CategoryId, user::UserId};

/// The fixed classification of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Income,
    Expense,
    Loan,
    Debt,
    TransferIn,
    TransferOut,
}

impl CategoryKind {
    /// Every category kind, in display order.
    pub const ALL: &[CategoryKind] = &[
        CategoryKind::Income,
        CategoryKind::Expense,
        CategoryKind::Loan,
        CategoryKind::Debt,
        CategoryKind::TransferIn,
        CategoryKind::TransferOut,
    ];

    /// The stable key used in the database and form payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Loan => "loan",
            Self::Debt => "debt",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
        }
    }

    /// Parse a stored or submitted key. Unknown keys return `None`.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    /// The human-readable label shown in forms.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
            Self::Loan => "Loan",
            Self::Debt => "Debt",
            Self::TransferIn => "Transfer in",
            Self::TransferOut => "Transfer out",
        }
    }
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction category belonging to one user, e.g. ("Groceries", expense).
///
/// The (name, kind) pair is unique per user, with the name compared
/// case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The id for the category.
    pub id: CategoryId,
    /// The user the category belongs to.
    pub user_id: UserId,
    /// The name of the category, as first entered by the user.
    pub name: String,
    /// The classification driving sign normalization.
    pub kind: CategoryKind,
    /// A monthly budget target for the category. Never negative.
    pub budget_goal: f64,
}

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                kind TEXT NOT NULL,
                budget_goal REAL NOT NULL DEFAULT 0,
                UNIQUE(user_id, name, kind),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_kind: String = row.get(3)?;
    let kind = CategoryKind::parse(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown category kind {raw_kind:?}").into(),
        )
    })?;

    Ok(Category {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        kind,
        budget_goal: row.get(4)?,
    })
}

/// Find the category with `name` and `kind` (name compared
/// case-insensitively, ignoring surrounding whitespace) for `user_id`, or
/// create it with a zero budget goal if it does not exist. Existing
/// categories are returned untouched.
///
/// Concurrent creation of the same (name, kind) is resolved the same way as
/// for accounts: the losing insert's constraint violation is converted into
/// a re-fetch.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn resolve_category(
    user_id: UserId,
    name: &str,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = name.trim();

    if let Some(category) = find_category(user_id, name, kind, connection)? {
        return Ok(category);
    }

    let insert_result = connection
        .prepare(
            "INSERT INTO category (user_id, name, kind, budget_goal)
             VALUES (?1, ?2, ?3, 0)
             RETURNING id, user_id, name, kind, budget_goal",
        )?
        .query_one((user_id.as_i64(), name, kind.as_str()), map_row_to_category);

    match insert_result {
        Ok(category) => Ok(category),
        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        )) => find_category(user_id, name, kind, connection)?.ok_or(Error::NotFound),
        Err(error) => Err(error.into()),
    }
}

fn find_category(
    user_id: UserId,
    name: &str,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    let mut statement = connection.prepare(
        "SELECT id, user_id, name, kind, budget_goal
         FROM category
         WHERE user_id = ?1 AND name = ?2 AND kind = ?3",
    )?;

    let mut rows =
        statement.query_map((user_id.as_i64(), name, kind.as_str()), map_row_to_category)?;

    rows.next().transpose().map_err(|error| error.into())
}

/// Retrieve a category by its `id`, scoped to its owner.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a category owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category(
    id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind, budget_goal
             FROM category
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_one((id, user_id.as_i64()), map_row_to_category)
        .map_err(|error| error.into())
}


#[cfg(test)]
mod resolve_category_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{CategoryKind, create_category_table, get_category, resolve_category},
        user::{User, create_user, create_user_table},
    };

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        create_user_table(&conn).unwrap();
        create_category_table(&conn).unwrap();
        let user = create_user(&conn).unwrap();

        (conn, user)
    }

    #[test]
    fn creates_missing_category_with_zero_budget() {
        let (conn, user) = get_test_connection_and_user();

        let category =
            resolve_category(user.id, "Groceries", CategoryKind::Expense, &conn).unwrap();

        assert!(category.id > 0);
        assert_eq!(category.user_id, user.id);
        assert_eq!(category.name, "Groceries");
        assert_eq!(category.kind, CategoryKind::Expense);
        assert_eq!(category.budget_goal, 0.0);
    }

    #[test]
    fn resolving_twice_returns_the_same_row() {
        let (conn, user) = get_test_connection_and_user();

        let first = resolve_category(user.id, "Groceries", CategoryKind::Expense, &conn).unwrap();
        let second =
            resolve_category(user.id, " groceries ", CategoryKind::Expense, &conn).unwrap();

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn same_name_with_different_kind_is_a_different_category() {
        let (conn, user) = get_test_connection_and_user();

        let expense = resolve_category(user.id, "Rent", CategoryKind::Expense, &conn).unwrap();
        let income = resolve_category(user.id, "Rent", CategoryKind::Income, &conn).unwrap();

        assert_ne!(expense.id, income.id);
    }

    #[test]
    fn get_category_is_scoped_to_the_owner() {
        let (conn, user) = get_test_connection_and_user();
        let other_user = create_user(&conn).unwrap();
        let category =
            resolve_category(user.id, "Groceries", CategoryKind::Expense, &conn).unwrap();

        assert_eq!(
            get_category(category.id, user.id, &conn).unwrap().id,
            category.id
        );
        assert_eq!(
            get_category(category.id, other_user.id, &conn),
            Err(Error::NotFound)
        );
    }
}
