//! The user row: identity, onboarding progress and profile attributes.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    onboarding::OnboardingStep,
    reference::{CURRENCY_CODES, FinancialGoal, IncomeFrequency, IncomeSource},
    validation::ValidationErrors,
};

/// A newtype wrapper for integer user IDs.
///
/// Every query in the application is scoped by the owning user, so keeping
/// the user ID a distinct type makes it hard to pass the wrong ID into a
/// query by accident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// Where the user is in the onboarding flow. `None` means the stored
    /// marker was missing or not a known step; callers treat that as "start
    /// from the first step".
    pub onboarding_step: Option<OnboardingStep>,
    /// The country the user lives in, as entered by the user.
    pub country: Option<String>,
    /// The user's preferred ISO 4217 currency code.
    pub currency: Option<String>,
    /// How often the user's main income arrives.
    pub income_frequency: Option<IncomeFrequency>,
    /// Where the user's main income comes from.
    pub main_income_source: Option<IncomeSource>,
    /// The financial goals picked during onboarding.
    pub financial_goals: Vec<FinancialGoal>,
}

impl User {
    /// Advance the onboarding marker to `target`.
    ///
    /// Only the adjacent forward transition is applied; backward and
    /// skipping transitions are silently ignored so the marker never
    /// regresses, no matter what order step forms are replayed in. A missing
    /// marker is treated as the first step.
    pub fn advance_onboarding(&mut self, target: OnboardingStep) {
        let current = self.onboarding_step.unwrap_or(OnboardingStep::FIRST);

        if current.can_transition_to(target) {
            self.onboarding_step = Some(target);
        } else if self.onboarding_step != Some(target) {
            tracing::debug!(
                "ignoring onboarding transition {current} -> {target} for user {}",
                self.id
            );
        }
    }

    /// Validate the user record as a whole.
    ///
    /// Step forms call this after copying their fields onto the user so that
    /// cross-field problems surface as form errors instead of slipping into
    /// the database.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if let Some(currency) = &self.currency
            && !CURRENCY_CODES.contains(&currency.as_str())
        {
            errors.add("currency", format!("{currency} is not a known currency"));
        }

        errors
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                onboarding_step TEXT NOT NULL DEFAULT 'financial_goal',
                country TEXT,
                currency TEXT,
                income_frequency TEXT,
                main_income_source TEXT,
                financial_goals TEXT NOT NULL DEFAULT '[]'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user, starting at the first onboarding step.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn create_user(connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (onboarding_step) VALUES (?1)",
        (OnboardingStep::FIRST.as_str(),),
    )?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        onboarding_step: Some(OnboardingStep::FIRST),
        country: None,
        currency: None,
        income_frequency: None,
        main_income_source: None,
        financial_goals: Vec::new(),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, onboarding_step, country, currency, income_frequency,
                    main_income_source, financial_goals
             FROM user WHERE id = :id",
        )?
        .query_one(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Write the user's mutable columns back to the database.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user.id` does not refer to an existing row,
/// or an [Error::SqlError] if an SQL related error occurred.
pub fn update_user(user: &User, connection: &Connection) -> Result<(), Error> {
    let goals = serialize_goals(&user.financial_goals);

    let rows_updated = connection.execute(
        "UPDATE user SET
            onboarding_step = ?1,
            country = ?2,
            currency = ?3,
            income_frequency = ?4,
            main_income_source = ?5,
            financial_goals = ?6
         WHERE id = ?7",
        (
            user.onboarding_step
                .unwrap_or(OnboardingStep::FIRST)
                .as_str(),
            &user.country,
            &user.currency,
            user.income_frequency.map(|f| f.as_str()),
            user.main_income_source.map(|s| s.as_str()),
            goals,
            user.id.as_i64(),
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_step: String = row.get(1)?;
    let raw_frequency: Option<String> = row.get(4)?;
    let raw_source: Option<String> = row.get(5)?;
    let raw_goals: String = row.get(6)?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        // Unknown markers fall open to None so the navigator restarts the
        // flow instead of erroring on legacy rows.
        onboarding_step: OnboardingStep::parse(&raw_step),
        country: row.get(2)?,
        currency: row.get(3)?,
        income_frequency: raw_frequency.as_deref().and_then(IncomeFrequency::parse),
        main_income_source: raw_source.as_deref().and_then(IncomeSource::parse),
        financial_goals: parse_goals(&raw_goals),
    })
}

fn serialize_goals(goals: &[FinancialGoal]) -> String {
    let keys: Vec<&str> = goals.iter().map(FinancialGoal::as_str).collect();

    // Serialising a list of plain strings cannot fail.
    serde_json::to_string(&keys).unwrap_or_else(|_| "[]".to_owned())
}

fn parse_goals(raw: &str) -> Vec<FinancialGoal> {
    let keys: Vec<String> = match serde_json::from_str(raw) {
        Ok(keys) => keys,
        Err(error) => {
            tracing::warn!("could not parse stored financial goals {raw:?}: {error}");
            return Vec::new();
        }
    };

    keys.iter()
        .filter_map(|key| {
            let goal = FinancialGoal::parse(key);
            if goal.is_none() {
                tracing::warn!("dropping unknown stored financial goal {key:?}");
            }
            goal
        })
        .collect()
}


#[cfg(test)]
mod advance_onboarding_tests {
    use rusqlite::Connection;

    use crate::{
        onboarding::OnboardingStep,
        user::{create_user, create_user_table},
    };

    fn get_test_user() -> crate::user::User {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        create_user(&connection).unwrap()
    }

    #[test]
    fn adjacent_forward_transition_is_applied() {
        let mut user = get_test_user();

        user.advance_onboarding(OnboardingStep::ProfileSetup);

        assert_eq!(user.onboarding_step, Some(OnboardingStep::ProfileSetup));
    }

    #[test]
    fn backward_transition_is_ignored() {
        let mut user = get_test_user();
        user.onboarding_step = Some(OnboardingStep::AccountSetup);

        user.advance_onboarding(OnboardingStep::ProfileSetup);

        assert_eq!(user.onboarding_step, Some(OnboardingStep::AccountSetup));
    }

    #[test]
    fn skipping_transition_is_ignored() {
        let mut user = get_test_user();

        user.advance_onboarding(OnboardingStep::Completed);

        assert_eq!(user.onboarding_step, Some(OnboardingStep::FinancialGoal));
    }

    #[test]
    fn marker_never_regresses_over_any_submit_order() {
        let mut user = get_test_user();
        let replay = [
            OnboardingStep::ProfileSetup,
            OnboardingStep::ProfileSetup,
            OnboardingStep::AccountSetup,
            OnboardingStep::ProfileSetup,
            OnboardingStep::Completed,
            OnboardingStep::ProfileSetup,
        ];

        let mut furthest = OnboardingStep::FinancialGoal;
        for target in replay {
            user.advance_onboarding(target);
            let current = user.onboarding_step.unwrap();
            assert!(
                current == furthest || furthest.can_transition_to(current),
                "marker went from {furthest} to {current}"
            );
            furthest = current;
        }

        assert_eq!(user.onboarding_step, Some(OnboardingStep::Completed));
    }

    #[test]
    fn missing_marker_is_treated_as_the_first_step() {
        let mut user = get_test_user();
        user.onboarding_step = None;

        user.advance_onboarding(OnboardingStep::ProfileSetup);

        assert_eq!(user.onboarding_step, Some(OnboardingStep::ProfileSetup));
    }
}
