//! The page listing the user's transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, render,
    },
    onboarding::next_path,
    transaction::core::{TransactionListEntry, get_transactions_for_user},
    user::{UserId, get_user_by_id},
};

/// The state needed to display the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    /// The database connection for fetching transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn amount_cell(amount: f64) -> Markup {
    let style = if amount < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-green-600 dark:text-green-400"
    };

    html! {
        td class=(format!("{TABLE_CELL_STYLE} {style}")) { (format_currency(amount)) }
    }
}

fn transactions_view(entries: &[TransactionListEntry]) -> Markup {
    let content = html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "Transactions"
            }

            p class="mb-4"
            {
                a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                {
                    "New transaction"
                }
            }

            @if entries.is_empty() {
                p { "Nothing recorded yet." }
            } @else {
                table class="w-full max-w-3xl text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th class=(TABLE_CELL_STYLE) { "Date" }
                            th class=(TABLE_CELL_STYLE) { "Description" }
                            th class=(TABLE_CELL_STYLE) { "Category" }
                            th class=(TABLE_CELL_STYLE) { "Account" }
                            th class=(TABLE_CELL_STYLE) { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for entry in entries {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (entry.transaction.date) }
                                td class=(TABLE_CELL_STYLE) { (entry.transaction.description) }
                                td class=(TABLE_CELL_STYLE) { (entry.category_name) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (entry.account_name.as_deref().unwrap_or("—"))
                                }
                                (amount_cell(entry.transaction.amount))
                            }
                        }
                    }
                }
            }
        }
    };

    base("Transactions", &[], &content)
}

/// Display the user's transactions, newest first.
///
/// A user who has not finished onboarding is redirected into the flow.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserId>,
) -> Response {
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

    match get_transactions_for_user(user_id, &connection) {
        Ok(entries) => render(StatusCode::OK, transactions_view(&entries)),
        Err(error) => error.into_response(),
    }
}
