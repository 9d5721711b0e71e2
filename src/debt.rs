//! The debt model: money lent to or borrowed from someone outside the app.
//!
//! Ledger rows can optionally reference a debt so repayments and
//! reimbursements show up against it.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DebtId, user::UserId};

/// Which way the money went when the debt was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtDirection {
    /// The user lent money to someone.
    Lent,
    /// The user borrowed money from someone.
    Borrowed,
}

impl DebtDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lent => "lent",
            Self::Borrowed => "borrowed",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "lent" => Some(Self::Lent),
            "borrowed" => Some(Self::Borrowed),
            _ => None,
        }
    }
}

impl Display for DebtDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a debt is still being paid off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Ongoing,
    Paid,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Paid => "paid",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "ongoing" => Some(Self::Ongoing),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl Display for DebtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A debt belonging to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Debt {
    /// The id for the debt.
    pub id: DebtId,
    /// The user the debt belongs to.
    pub user_id: UserId,
    /// Who the debt is with, e.g. "Alice" or "Car loan".
    pub name: String,
    /// Which way the money went when the debt was opened.
    pub direction: DebtDirection,
    /// Whether the debt is still being paid off.
    pub status: DebtStatus,
    /// The total amount lent (or borrowed).
    pub total_lent: f64,
    /// The total amount paid back so far.
    pub total_reimbursed: f64,
}

impl Debt {
    /// How much of the debt is still outstanding.
    pub fn remaining(&self) -> f64 {
        self.total_lent - self.total_reimbursed
    }
}

/// Create the debt table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_debt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debt (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                direction TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'ongoing',
                total_lent REAL NOT NULL DEFAULT 0,
                total_reimbursed REAL NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_debt(row: &Row) -> Result<Debt, rusqlite::Error> {
    let raw_direction: String = row.get(3)?;
    let direction = DebtDirection::parse(&raw_direction).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown debt direction {raw_direction:?}").into(),
        )
    })?;

    let raw_status: String = row.get(4)?;
    let status = DebtStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown debt status {raw_status:?}").into(),
        )
    })?;

    Ok(Debt {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        direction,
        status,
        total_lent: row.get(5)?,
        total_reimbursed: row.get(6)?,
    })
}

/// Create and insert a new, ongoing debt.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_debt(
    user_id: UserId,
    name: &str,
    direction: DebtDirection,
    total_lent: f64,
    connection: &Connection,
) -> Result<Debt, Error> {
    connection
        .prepare(
            "INSERT INTO debt (user_id, name, direction, status, total_lent)
             VALUES (?1, ?2, ?3, 'ongoing', ?4)
             RETURNING id, user_id, name, direction, status, total_lent, total_reimbursed",
        )?
        .query_one(
            (user_id.as_i64(), name.trim(), direction.as_str(), total_lent),
            map_row_to_debt,
        )
        .map_err(|error| error.into())
}

/// Retrieve a debt by its `id`, scoped to its owner.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a debt owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_debt(id: DebtId, user_id: UserId, connection: &Connection) -> Result<Debt, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, direction, status, total_lent, total_reimbursed
             FROM debt
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_one((id, user_id.as_i64()), map_row_to_debt)
        .map_err(|error| error.into())
}

#[cfg(test)]
mod debt_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        debt::{DebtDirection, DebtStatus, create_debt, create_debt_table, get_debt},
        user::{User, create_user, create_user_table},
    };

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        create_user_table(&conn).unwrap();
        create_debt_table(&conn).unwrap();
        let user = create_user(&conn).unwrap();

        (conn, user)
    }

    #[test]
    fn create_debt_starts_ongoing_with_nothing_reimbursed() {
        let (conn, user) = get_test_connection_and_user();

        let debt = create_debt(user.id, "Alice", DebtDirection::Lent, 120.0, &conn).unwrap();

        assert!(debt.id > 0);
        assert_eq!(debt.user_id, user.id);
        assert_eq!(debt.name, "Alice");
        assert_eq!(debt.direction, DebtDirection::Lent);
        assert_eq!(debt.status, DebtStatus::Ongoing);
        assert_eq!(debt.total_lent, 120.0);
        assert_eq!(debt.total_reimbursed, 0.0);
    }

    #[test]
    fn remaining_is_lent_minus_reimbursed() {
        let (conn, user) = get_test_connection_and_user();
        let debt = create_debt(user.id, "Alice", DebtDirection::Lent, 120.0, &conn).unwrap();

        conn.execute(
            "UPDATE debt SET total_reimbursed = 45.0 WHERE id = ?1",
            (debt.id,),
        )
        .unwrap();

        let fetched = get_debt(debt.id, user.id, &conn).unwrap();

        assert_eq!(fetched.remaining(), 75.0);
    }

    #[test]
    fn get_debt_is_scoped_to_the_owner() {
        let (conn, user) = get_test_connection_and_user();
        let other_user = create_user(&conn).unwrap();
        let debt = create_debt(user.id, "Alice", DebtDirection::Borrowed, 50.0, &conn).unwrap();

        assert!(get_debt(debt.id, user.id, &conn).is_ok());
        assert_eq!(get_debt(debt.id, other_user.id, &conn), Err(Error::NotFound));
    }
}
