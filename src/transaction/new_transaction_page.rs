//! The page with the form for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    account::{Account, get_accounts_for_user},
    category::CategoryKind,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base, render,
    },
    onboarding::next_path,
    timezone::today_in_timezone,
    user::{UserId, get_user_by_id},
};

/// The state needed to display the new transaction page.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    /// The database connection for fetching the user's accounts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn new_transaction_view(accounts: &[Account], today: Date) -> Markup {
    let content = html! {
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "New transaction"
            }

            form
                hx-post=(endpoints::TRANSACTIONS_API)
                class="w-full space-y-4 md:space-y-6"
            {
                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    input
                        id="description"
                        type="text"
                        name="description"
                        placeholder="What was it for?"
                        required
                        autofocus
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    input
                        id="amount"
                        type="number"
                        step="0.01"
                        name="amount"
                        placeholder="0.00"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                    input
                        id="date"
                        type="date"
                        name="date"
                        value=(today)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="category-kind" class=(FORM_LABEL_STYLE) { "Kind" }

                    select id="category-kind" name="category_kind" class=(FORM_SELECT_STYLE)
                    {
                        @for kind in CategoryKind::ALL {
                            option value=(kind.as_str()) { (kind.label()) }
                        }
                    }
                }

                div
                {
                    label for="category-name" class=(FORM_LABEL_STYLE) { "Category" }

                    input
                        id="category-name"
                        type="text"
                        name="category_name"
                        placeholder="e.g. Groceries"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="account-name" class=(FORM_LABEL_STYLE) { "Account (optional)" }

                    input
                        id="account-name"
                        type="text"
                        name="account_name"
                        list="account-options"
                        placeholder="Account"
                        class=(FORM_TEXT_INPUT_STYLE);

                    datalist id="account-options"
                    {
                        @for account in accounts { option value=(account.name) {} }
                    }
                }

                div
                {
                    label for="note" class=(FORM_LABEL_STYLE) { "Note (optional)" }

                    input
                        id="note"
                        type="text"
                        name="note"
                        placeholder="Anything to remember"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create transaction" }
            }
        }
    };

    base("New Transaction", &[], &content)
}

/// Display the form for creating a new transaction.
///
/// A user who has not finished onboarding is redirected into the flow.
pub async fn get_new_transaction_page(
    State(state): State<NewTransactionPageState>,
    Extension(user_id): Extension<UserId>,
) -> Response {
    let Some(today) = today_in_timezone(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    if !user.onboarding_step.is_some_and(|step| step.is_completed()) {
        return Redirect::to(next_path(user.onboarding_step)).into_response();
    }

    match get_accounts_for_user(user_id, &connection) {
        Ok(accounts) => render(StatusCode::OK, new_transaction_view(&accounts, today)),
        Err(error) => error.into_response(),
    }
}
