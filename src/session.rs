//! The session cookie and the guard middleware that resolves it.
//!
//! The session is a signed, encrypted cookie carrying the current user's id.
//! Registration issues it; the guard middleware turns it into an
//! `Extension<UserId>` for route handlers. There are no credentials here:
//! verifying who is allowed to hold a session is a concern of whatever sits
//! in front of the app.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use axum_htmx::HxRedirect;

use crate::{AppState, Error, endpoints, user::UserId};

pub(crate) const COOKIE_USER_ID: &str = "user_id";

/// Add the session cookie for `user_id` to the cookie jar.
///
/// Returns the cookie jar with the cookie added.
pub fn set_session_cookie(jar: PrivateCookieJar, user_id: UserId) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_USER_ID, user_id.as_i64().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read the current user's id back out of the cookie jar.
///
/// # Errors
///
/// Returns [Error::CookieMissing] if the session cookie is absent or does
/// not contain a user id.
pub fn get_session_user_id(jar: &PrivateCookieJar) -> Result<UserId, Error> {
    let cookie = jar.get(COOKIE_USER_ID).ok_or(Error::CookieMissing)?;

    cookie
        .value()
        .parse::<i64>()
        .map(UserId::new)
        .map_err(|_| Error::CookieMissing)
}

/// The state needed for the session guard middleware.
#[derive(Clone)]
pub struct SessionState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<SessionState> for Key {
    fn from_ref(state: &SessionState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
/// The user ID is placed into the request and the request executed normally
/// if the cookie is valid, otherwise the response from `get_redirect` is
/// returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserId>` to receive the user ID.
#[inline]
async fn session_guard_internal(
    state: SessionState,
    request: Request,
    next: Next,
    get_redirect: impl Fn() -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to registration.");
            return get_redirect();
        }
    };

    let user_id = match get_session_user_id(&jar) {
        Ok(user_id) => user_id,
        Err(_) => {
            tracing::debug!("No session cookie in request. Redirecting to registration.");
            return get_redirect();
        }
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(user_id);

    next.run(request).await
}

/// The session guard for page (GET) routes: redirects to the registration
/// page when there is no session.
pub async fn session_guard(
    State(state): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    session_guard_internal(state, request, next, || {
        Redirect::to(endpoints::REGISTER_VIEW).into_response()
    })
    .await
}

/// The session guard for API routes called by HTMX: uses the HX-Redirect
/// header so the whole page navigates to the registration page.
pub async fn session_guard_hx(
    State(state): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    session_guard_internal(state, request, next, || {
        (
            HxRedirect(endpoints::REGISTER_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response()
    })
    .await
}

#[cfg(test)]
mod session_cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};

    use crate::{Error, app_state::create_cookie_key, user::UserId};

    use super::{get_session_user_id, set_session_cookie};

    fn get_test_key() -> Key {
        create_cookie_key("the session cookie test secret")
    }

    #[test]
    fn round_trips_the_user_id() {
        let jar = PrivateCookieJar::new(get_test_key());

        let jar = set_session_cookie(jar, UserId::new(42));

        assert_eq!(get_session_user_id(&jar), Ok(UserId::new(42)));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        let jar = PrivateCookieJar::new(get_test_key());

        assert_eq!(get_session_user_id(&jar), Err(Error::CookieMissing));
    }

    #[test]
    fn garbage_cookie_value_is_an_error() {
        let jar = PrivateCookieJar::new(get_test_key());
        let jar = jar.add(axum_extra::extract::cookie::Cookie::new(
            super::COOKIE_USER_ID,
            "not a number",
        ));

        assert_eq!(get_session_user_id(&jar), Err(Error::CookieMissing));
    }
}
