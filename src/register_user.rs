//! The registration page and endpoint.
//!
//! Registering creates a user row starting at the first onboarding step and
//! issues the session cookie. Credentials are not handled here: protecting
//! the app is left to whatever sits in front of it.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base},
    onboarding::next_path,
    session::set_session_cookie,
    user::create_user,
};

fn register_view() -> Markup {
    let content = html! {
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "Welcome to Fintrack"
            }

            p class="mb-6"
            {
                "Track your accounts, spending and debts in one place. \
                Setting up takes three short steps."
            }

            form method="post" action=(endpoints::USERS) class="w-full"
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Get started" }
            }
        }
    };

    base("Welcome", &[], &content)
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    register_view().into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for creating the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a new user, set the session cookie and send them into onboarding.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_user(&connection) {
        Ok(user) => {
            let jar = set_session_cookie(jar, user.id);

            (jar, Redirect::to(next_path(user.onboarding_step))).into_response()
        }
        Err(error) => {
            tracing::error!("could not create user: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;
    use rusqlite::Connection;

    use crate::{app_state::create_cookie_key, db::initialize, endpoints};

    use super::{RegistrationState, register_user};

    fn get_test_state() -> RegistrationState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        RegistrationState {
            cookie_key: create_cookie_key("registration test secret"),
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn creates_a_user_and_redirects_into_onboarding() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = register_user(State(state.clone()), jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::ONBOARDING_GOALS_VIEW
        );
        assert!(
            response.headers().get("set-cookie").is_some(),
            "expected the session cookie to be set"
        );

        let connection = state.db_connection.lock().unwrap();
        let user_count: i64 = connection
            .query_row("SELECT COUNT(id) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(user_count, 1);
    }
}
