//! The account model: a named pot of money belonging to one user, plus the
//! find-or-create resolver used by every flow that accepts a free-text
//! account name.

use rusqlite::{Connection, Row};

use crate::{Error, database_id::AccountId, user::UserId};

/// A bank account, credit card or cash pot belonging to one user.
///
/// Account names are unique per user, compared case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user the account belongs to.
    pub user_id: UserId,
    /// The name of the account, as first entered by the user.
    pub name: String,
    /// The stored balance. Nothing recomputes this from ledger rows.
    pub balance: f64,
    /// An optional savings target for the account. Never negative.
    pub saving_goal: Option<f64>,
}

/// Create the account table.
///
/// The `NOCASE` collation on the name column makes the per-user uniqueness
/// constraint case-insensitive, which is what the resolver relies on.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                balance REAL NOT NULL DEFAULT 0,
                saving_goal REAL,
                UNIQUE(user_id, name),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        balance: row.get(3)?,
        saving_goal: row.get(4)?,
    })
}

/// Find the account named `name` (case-insensitively, ignoring surrounding
/// whitespace) for `user_id`, or create it with a zero balance if it does
/// not exist. Existing accounts are returned untouched.
///
/// Two requests racing to create the same name are resolved by the unique
/// constraint: the loser's insert fails with a constraint violation, which
/// is converted into a re-fetch of the winner's row instead of an error.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn resolve_account(user_id: UserId, name: &str, connection: &Connection) -> Result<Account, Error> {
    let name = name.trim();

    if let Some(account) = find_account_by_name(user_id, name, connection)? {
        return Ok(account);
    }

    let insert_result = connection
        .prepare(
            "INSERT INTO account (user_id, name, balance)
             VALUES (?1, ?2, 0)
             RETURNING id, user_id, name, balance, saving_goal",
        )?
        .query_one((user_id.as_i64(), name), map_row_to_account);

    match insert_result {
        Ok(account) => Ok(account),
        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        )) => {
            // Lost the race to another request creating the same name.
            find_account_by_name(user_id, name, connection)?.ok_or(Error::NotFound)
        }
        Err(error) => Err(error.into()),
    }
}

fn find_account_by_name(
    user_id: UserId,
    name: &str,
    connection: &Connection,
) -> Result<Option<Account>, Error> {
    let mut statement = connection.prepare(
        "SELECT id, user_id, name, balance, saving_goal
         FROM account
         WHERE user_id = ?1 AND name = ?2",
    )?;

    let mut rows = statement.query_map((user_id.as_i64(), name), map_row_to_account)?;

    rows.next().transpose().map_err(|error| error.into())
}

/// Retrieve the accounts belonging to `user_id`, ordered by name.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_accounts_for_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, balance, saving_goal
             FROM account
             WHERE user_id = :user_id
             ORDER BY name",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::SqlError))
        .collect()
}

/// Get the total stored balance across the user's accounts.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_total_account_balance(user_id: UserId, connection: &Connection) -> Result<f64, Error> {
    connection
        .prepare("SELECT COALESCE(SUM(balance), 0) FROM account WHERE user_id = :user_id")?
        .query_one(&[(":user_id", &user_id.as_i64())], |row| row.get(0))
        .map_err(|error| error.into())
}


#[cfg(test)]
mod account_query_tests {
    use rusqlite::Connection;

    use crate::{
        account::{
            create_account_table, get_accounts_for_user, get_total_account_balance,
            resolve_account,
        },
        user::{User, create_user, create_user_table},
    };

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        create_user_table(&conn).unwrap();
        create_account_table(&conn).unwrap();
        let user = create_user(&conn).unwrap();

        (conn, user)
    }

    #[test]
    fn accounts_are_ordered_by_name() {
        let (conn, user) = get_test_connection_and_user();
        resolve_account(user.id, "Savings", &conn).unwrap();
        resolve_account(user.id, "Everyday", &conn).unwrap();

        let names: Vec<String> = get_accounts_for_user(user.id, &conn)
            .unwrap()
            .into_iter()
            .map(|account| account.name)
            .collect();

        assert_eq!(names, ["Everyday", "Savings"]);
    }

    #[test]
    fn total_balance_is_zero_with_no_accounts() {
        let (conn, user) = get_test_connection_and_user();

        assert_eq!(get_total_account_balance(user.id, &conn).unwrap(), 0.0);
    }

    #[test]
    fn total_balance_only_counts_the_given_user() {
        let (conn, user) = get_test_connection_and_user();
        let other_user = create_user(&conn).unwrap();

        let account = resolve_account(user.id, "Everyday", &conn).unwrap();
        let other_account = resolve_account(other_user.id, "Everyday", &conn).unwrap();
        conn.execute("UPDATE account SET balance = 100.0 WHERE id = ?1", (account.id,))
            .unwrap();
        conn.execute(
            "UPDATE account SET balance = 999.0 WHERE id = ?1",
            (other_account.id,),
        )
        .unwrap();

        assert_eq!(get_total_account_balance(user.id, &conn).unwrap(), 100.0);
    }
}
