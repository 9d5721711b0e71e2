//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    account::resolve_account,
    category::{CategoryKind, resolve_category},
    database_id::DebtId,
    debt::get_debt,
    endpoints,
    timezone::get_local_offset,
    transaction::{Transaction, core::create_transaction},
    user::UserId,
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The name of the account the money moved through. Blank means no
    /// account.
    #[serde(default)]
    pub account_name: String,
    /// The name of the category to file the transaction under.
    pub category_name: String,
    /// The kind of the category, e.g. "expense".
    pub category_kind: String,
    /// The value of the transaction in dollars. The stored sign is decided
    /// by the category kind.
    pub amount: f64,
    /// The date when the transaction occurred.
    pub date: Date,
    /// Text detailing the transaction.
    pub description: String,
    /// An optional free-text note.
    #[serde(default)]
    pub note: Option<String>,
    /// The debt this transaction pays into or out of, if any.
    #[serde(default)]
    pub debt_id: Option<DebtId>,
}

/// A route handler for creating a new transaction, redirects to transactions view on success.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let Some(local_timezone) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let now_local_time = OffsetDateTime::now_utc().to_offset(local_timezone);

    if form.date > now_local_time.date() {
        tracing::error!(
            "Tried to perform an operation with a future date (e.g., create a transaction)"
        );

        return Error::FutureDate(form.date).into_alert_response();
    }

    let Some(category_kind) = CategoryKind::parse(&form.category_kind) else {
        return Error::InvalidCategoryKind(form.category_kind).into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let account = if form.account_name.trim().is_empty() {
        None
    } else {
        match resolve_account(user_id, &form.account_name, &connection) {
            Ok(account) => Some(account),
            Err(error) => {
                tracing::error!("could not resolve account: {error}");
                return error.into_alert_response();
            }
        }
    };

    let category = match resolve_category(user_id, &form.category_name, category_kind, &connection)
    {
        Ok(category) => category,
        Err(error) => {
            tracing::error!("could not resolve category: {error}");
            return error.into_alert_response();
        }
    };

    if let Some(debt_id) = form.debt_id
        && let Err(error) = get_debt(debt_id, user_id, &connection)
    {
        return error.into_alert_response();
    }

    let note = form.note.filter(|note| !note.trim().is_empty());
    let builder = Transaction::build(form.amount, form.date, &form.description)
        .account_id(account.map(|account| account.id))
        .debt_id(form.debt_id)
        .note(note);

    if let Err(error) = create_transaction(builder, &category, &connection) {
        tracing::error!("could not create transaction: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
