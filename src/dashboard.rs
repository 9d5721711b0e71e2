//! The dashboard: the landing page once onboarding is complete.

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
    AppState, Error,
    account::{Account, get_accounts_for_user, get_total_account_balance},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, render,
    },
    onboarding::next_path,
    transaction::count_transactions_for_user,
    user::{User, UserId, get_user_by_id},
};

/// The state needed to display the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for fetching accounts and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn dashboard_view(
    user: &User,
    accounts: &[Account],
    total_balance: f64,
    transaction_count: u32,
) -> Markup {
    let currency = user.currency.as_deref().unwrap_or_default();

    let content = html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "Your money at a glance"
            }

            p class="mb-2 text-lg"
            {
                "Across your accounts: "
                span class="font-semibold" { (format_currency(total_balance)) }
                @if !currency.is_empty() {
                    " " (currency)
                }
            }

            p class="mb-6 text-sm text-gray-500 dark:text-gray-400"
            {
                (transaction_count) " transactions recorded. "

                a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE) { "see them" }

                " or "

                a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "add one" }
            }

            @if accounts.is_empty() {
                p { "No accounts yet." }
            } @else {
                table class="w-full max-w-xl text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th class=(TABLE_CELL_STYLE) { "Account" }
                            th class=(TABLE_CELL_STYLE) { "Balance" }
                            th class=(TABLE_CELL_STYLE) { "Saving goal" }
                        }
                    }

                    tbody
                    {
                        @for account in accounts {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (account.name) }
                                td class=(TABLE_CELL_STYLE) { (format_currency(account.balance)) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @match account.saving_goal {
                                        Some(goal) => { (format_currency(goal)) }
                                        None => { "—" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Dashboard", &[], &content)
}

/// Display the dashboard.
///
/// A user who has not finished onboarding is redirected to their current
/// step instead.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
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

    let page_data = get_accounts_for_user(user_id, &connection).and_then(|accounts| {
        let total = get_total_account_balance(user_id, &connection)?;
        let count = count_transactions_for_user(user_id, &connection)?;
        Ok((accounts, total, count))
    });

    match page_data {
        Ok((accounts, total, count)) => render(
            StatusCode::OK,
            dashboard_view(&user, &accounts, total, count),
        ),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        account::resolve_account,
        db::initialize,
        endpoints,
        onboarding::OnboardingStep,
        test_utils::response_body_text,
        user::{UserId, create_user, update_user},
    };

    use super::{DashboardState, get_dashboard_page};

    fn get_test_state(step: OnboardingStep) -> (DashboardState, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let mut user = create_user(&conn).unwrap();
        user.onboarding_step = Some(step);
        update_user(&user, &conn).unwrap();

        (
            DashboardState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn shows_accounts_and_total() {
        let (state, user_id) = get_test_state(OnboardingStep::Completed);
        {
            let connection = state.db_connection.lock().unwrap();
            let account = resolve_account(user_id, "Everyday", &connection).unwrap();
            connection
                .execute(
                    "UPDATE account SET balance = 123.45 WHERE id = ?1",
                    (account.id,),
                )
                .unwrap();
        }

        let response = get_dashboard_page(State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body_text(response).await;
        assert!(body.contains("Everyday"));
        assert!(body.contains("$123.45"));
    }

    #[tokio::test]
    async fn redirects_a_mid_onboarding_user_to_their_step() {
        let (state, user_id) = get_test_state(OnboardingStep::ProfileSetup);

        let response = get_dashboard_page(State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::ONBOARDING_PROFILE_VIEW
        );
    }
}
