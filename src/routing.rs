//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState,
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    onboarding::{
        get_account_setup_page, get_financial_goals_page, get_profile_setup_page,
        submit_account_setup_endpoint, submit_financial_goals_endpoint,
        submit_profile_setup_endpoint,
    },
    register_user::{get_register_page, register_user},
    session::{session_guard, session_guard_hx},
    transaction::{create_transaction_endpoint, get_new_transaction_page, get_transactions_page},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(
            endpoints::ONBOARDING_GOALS_VIEW,
            get(get_financial_goals_page),
        )
        .route(
            endpoints::ONBOARDING_PROFILE_VIEW,
            get(get_profile_setup_page),
        )
        .route(
            endpoints::ONBOARDING_ACCOUNTS_VIEW,
            get(get_account_setup_page),
        )
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            get(get_new_transaction_page),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_guard));

    // These POST routes need to use the HX-REDIRECT header for session
    // redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::ONBOARDING_GOALS_API,
                post(submit_financial_goals_endpoint),
            )
            .route(
                endpoints::ONBOARDING_PROFILE_API,
                post(submit_profile_setup_endpoint),
            )
            .route(
                endpoints::ONBOARDING_ACCOUNTS_API,
                post(submit_account_setup_endpoint),
            )
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                session_guard_hx,
            )),
    );

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod build_router_tests {
    use rusqlite::Connection;

    use crate::AppState;

    use super::build_router;

    #[test]
    fn builds_with_every_route() {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "router test secret", "Etc/UTC").unwrap();

        // Panics on duplicate or malformed routes.
        let _router = build_router(state);
    }
}
