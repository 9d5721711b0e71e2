//! The profile setup step: the second onboarding form.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base, field_errors, render,
    },
    onboarding::{OnboardingStep, next_path},
    reference::{
        COUNTRIES, CURRENCY_CODES, DEFAULT_CURRENCY, IncomeFrequency, IncomeSource,
        PRIORITY_COUNTRIES, PRIORITY_CURRENCY_CODES,
    },
    user::{User, UserId, get_user_by_id, update_user},
    validation::{SubmitError, ValidationErrors},
};

/// The submitted payload for the profile setup step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSetupPayload {
    /// The country the user lives in.
    #[serde(default)]
    pub country: String,
    /// The preferred currency code.
    #[serde(default)]
    pub currency: String,
    /// How often the user's main income arrives, if they said.
    #[serde(default)]
    pub income_frequency: Option<String>,
    /// Where the user's main income comes from, if they said.
    #[serde(default)]
    pub main_income_source: Option<String>,
}

/// The form object for the profile setup step.
pub struct ProfileSetupForm {
    user: User,
    country: String,
    currency: String,
    income_frequency: Option<String>,
    main_income_source: Option<String>,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl ProfileSetupForm {
    /// Build the form for `user`, seeding the fields from `payload` when
    /// present and from the user's stored profile otherwise. The currency
    /// falls back to [DEFAULT_CURRENCY] when neither provides one.
    ///
    /// A user with no step marker gets it initialized to this step; a later
    /// marker is left alone.
    pub fn new(mut user: User, payload: Option<ProfileSetupPayload>) -> Self {
        let (country, currency, income_frequency, main_income_source) = match payload {
            Some(payload) => (
                payload.country.trim().to_owned(),
                payload.currency.trim().to_owned(),
                normalize_optional(payload.income_frequency),
                normalize_optional(payload.main_income_source),
            ),
            None => (
                user.country.clone().unwrap_or_default(),
                user.currency.clone().unwrap_or_default(),
                user.income_frequency.map(|f| f.as_str().to_owned()),
                user.main_income_source.map(|s| s.as_str().to_owned()),
            ),
        };

        let currency = if currency.is_empty() {
            DEFAULT_CURRENCY.to_owned()
        } else {
            currency
        };

        if user.onboarding_step.is_none() {
            user.onboarding_step = Some(OnboardingStep::ProfileSetup);
        }

        Self {
            user,
            country,
            currency,
            income_frequency,
            main_income_source,
        }
    }

    /// Check the profile fields against the reference lists.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.country.is_empty() {
            errors.add("country", "is required");
        }

        if !CURRENCY_CODES.contains(&self.currency.as_str()) {
            errors.add(
                "currency",
                format!("{} is not a known currency", self.currency),
            );
        }

        if let Some(frequency) = &self.income_frequency
            && IncomeFrequency::parse(frequency).is_none()
        {
            errors.add(
                "income_frequency",
                format!("{frequency} is not a valid income frequency"),
            );
        }

        if let Some(source) = &self.main_income_source
            && IncomeSource::parse(source).is_none()
        {
            errors.add(
                "main_income_source",
                format!("{source} is not a valid income source"),
            );
        }

        errors
    }

    /// Validate, copy the profile onto the user, advance the step marker and
    /// save the user.
    ///
    /// Submitting the same values again is safe: the update is a no-op and
    /// the marker, already past this step, stays where it is.
    ///
    /// # Errors
    ///
    /// Returns [SubmitError::Invalid] with the field errors if validation
    /// fails (nothing is persisted), or [SubmitError::Db] if saving the user
    /// fails unexpectedly.
    pub fn submit(mut self, connection: &mut Connection) -> Result<User, SubmitError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SubmitError::Invalid(errors));
        }

        self.user.country = Some(self.country.clone());
        self.user.currency = Some(self.currency.clone());
        // Both parse after validation.
        self.user.income_frequency = self
            .income_frequency
            .as_deref()
            .and_then(IncomeFrequency::parse);
        self.user.main_income_source = self
            .main_income_source
            .as_deref()
            .and_then(IncomeSource::parse);
        self.user.advance_onboarding(OnboardingStep::AccountSetup);

        let user_errors = self.user.validate();
        if !user_errors.is_empty() {
            return Err(SubmitError::Invalid(user_errors));
        }

        update_user(&self.user, connection)?;

        Ok(self.user)
    }
}

fn profile_form_view(form: &ProfileSetupForm, errors: &ValidationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::ONBOARDING_PROFILE_API)
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            @for message in errors.base() {
                p class="text-red-600 dark:text-red-400" { (message) }
            }

            div
            {
                label for="country" class=(FORM_LABEL_STYLE) { "Country" }

                input
                    id="country"
                    type="text"
                    name="country"
                    list="country-options"
                    placeholder="Country"
                    required
                    autofocus
                    value=(form.country)
                    class=(FORM_TEXT_INPUT_STYLE);

                datalist id="country-options"
                {
                    @for country in PRIORITY_COUNTRIES { option value=(country) {} }
                    @for country in COUNTRIES {
                        @if !PRIORITY_COUNTRIES.contains(country) {
                            option value=(country) {}
                        }
                    }
                }

                (field_errors(errors.field("country")))
            }

            div
            {
                label for="currency" class=(FORM_LABEL_STYLE) { "Currency" }

                select id="currency" name="currency" class=(FORM_SELECT_STYLE)
                {
                    optgroup label="Common"
                    {
                        @for code in PRIORITY_CURRENCY_CODES {
                            option value=(code) selected[form.currency == *code] { (code) }
                        }
                    }

                    optgroup label="All currencies"
                    {
                        @for code in CURRENCY_CODES {
                            @if !PRIORITY_CURRENCY_CODES.contains(code) {
                                option value=(code) selected[form.currency == *code] { (code) }
                            }
                        }
                    }
                }

                (field_errors(errors.field("currency")))
            }

            div
            {
                label for="income-frequency" class=(FORM_LABEL_STYLE) { "How often are you paid?" }

                select
                    id="income-frequency"
                    name="income_frequency"
                    class=(FORM_SELECT_STYLE)
                {
                    option value="" { "Prefer not to say" }

                    @for frequency in IncomeFrequency::ALL {
                        option
                            value=(frequency.as_str())
                            selected[form.income_frequency.as_deref() == Some(frequency.as_str())]
                        {
                            (frequency.label())
                        }
                    }
                }

                (field_errors(errors.field("income_frequency")))
            }

            div
            {
                label for="main-income-source" class=(FORM_LABEL_STYLE) { "Main source of income" }

                select
                    id="main-income-source"
                    name="main_income_source"
                    class=(FORM_SELECT_STYLE)
                {
                    option value="" { "Prefer not to say" }

                    @for source in IncomeSource::ALL {
                        option
                            value=(source.as_str())
                            selected[form.main_income_source.as_deref() == Some(source.as_str())]
                        {
                            (source.label())
                        }
                    }
                }

                (field_errors(errors.field("main_income_source")))
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Continue" }
        }
    }
}

fn profile_page_view(form: &ProfileSetupForm, errors: &ValidationErrors) -> Markup {
    let content = html! {
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "About you"
            }

            p class="mb-6 text-sm text-gray-500 dark:text-gray-400" { "Step 2 of 3" }

            (profile_form_view(form, errors))
        }
    };

    base("About you", &[], &content)
}

/// The state needed for the profile setup step.
#[derive(Debug, Clone)]
pub struct ProfileSetupState {
    /// The database connection for loading and saving the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileSetupState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the profile setup page.
///
/// A user whose marker points at another step is redirected there instead.
pub async fn get_profile_setup_page(
    State(state): State<ProfileSetupState>,
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

    if let Some(step) = user.onboarding_step
        && step != OnboardingStep::ProfileSetup
    {
        return Redirect::to(next_path(Some(step))).into_response();
    }

    let form = ProfileSetupForm::new(user, None);

    render(
        StatusCode::OK,
        profile_page_view(&form, &ValidationErrors::new()),
    )
}

/// A route handler for submitting the profile setup step.
pub async fn submit_profile_setup_endpoint(
    State(state): State<ProfileSetupState>,
    Extension(user_id): Extension<UserId>,
    Form(payload): Form<ProfileSetupPayload>,
) -> Response {
    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => return error.into_alert_response(),
    };

    let form = ProfileSetupForm::new(user.clone(), Some(payload.clone()));

    match form.submit(&mut connection) {
        Ok(user) => (
            HxRedirect(next_path(user.onboarding_step).to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(SubmitError::Invalid(errors)) => {
            // Rebuild the form so the user's input is shown alongside the
            // errors. The user row itself was not changed.
            let form = ProfileSetupForm::new(user, Some(payload));
            render(StatusCode::OK, profile_form_view(&form, &errors))
        }
        Err(SubmitError::Db(error)) => {
            tracing::error!("could not save profile: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod profile_setup_form_tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        onboarding::OnboardingStep,
        reference::{DEFAULT_CURRENCY, IncomeFrequency, IncomeSource},
        user::{User, create_user, get_user_by_id, update_user},
        validation::SubmitError,
    };

    use super::{ProfileSetupForm, ProfileSetupPayload};

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let mut user = create_user(&conn).unwrap();
        // A user normally reaches this step with the marker already advanced.
        user.onboarding_step = Some(OnboardingStep::ProfileSetup);
        update_user(&user, &conn).unwrap();

        (conn, user)
    }

    fn full_payload() -> ProfileSetupPayload {
        ProfileSetupPayload {
            country: "New Zealand".to_owned(),
            currency: "NZD".to_owned(),
            income_frequency: Some("fortnightly".to_owned()),
            main_income_source: Some("salary".to_owned()),
        }
    }

    #[test]
    fn currency_defaults_when_unset() {
        let (_conn, user) = get_test_connection_and_user();

        let form = ProfileSetupForm::new(user, None);

        assert_eq!(form.currency, DEFAULT_CURRENCY);
    }

    #[test]
    fn seeds_from_stored_profile_without_a_payload() {
        let (conn, mut user) = get_test_connection_and_user();
        user.country = Some("Ireland".to_owned());
        user.currency = Some("EUR".to_owned());
        user.income_frequency = Some(IncomeFrequency::Monthly);
        update_user(&user, &conn).unwrap();

        let form = ProfileSetupForm::new(user, None);

        assert_eq!(form.country, "Ireland");
        assert_eq!(form.currency, "EUR");
        assert_eq!(form.income_frequency.as_deref(), Some("monthly"));
        assert_eq!(form.main_income_source, None);
    }

    #[test]
    fn blank_country_is_invalid() {
        let (_conn, user) = get_test_connection_and_user();

        let form = ProfileSetupForm::new(
            user,
            Some(ProfileSetupPayload {
                country: "   ".to_owned(),
                ..full_payload()
            }),
        );
        let errors = form.validate();

        assert_eq!(errors.field("country"), ["is required"]);
    }

    #[test]
    fn unknown_currency_is_invalid() {
        let (_conn, user) = get_test_connection_and_user();

        let form = ProfileSetupForm::new(
            user,
            Some(ProfileSetupPayload {
                currency: "DOGE".to_owned(),
                ..full_payload()
            }),
        );
        let errors = form.validate();

        assert_eq!(errors.field("currency"), ["DOGE is not a known currency"]);
    }

    #[test]
    fn unknown_optional_fields_are_invalid() {
        let (_conn, user) = get_test_connection_and_user();

        let form = ProfileSetupForm::new(
            user,
            Some(ProfileSetupPayload {
                income_frequency: Some("daily".to_owned()),
                main_income_source: Some("lottery".to_owned()),
                ..full_payload()
            }),
        );
        let errors = form.validate();

        assert_eq!(
            errors.field("income_frequency"),
            ["daily is not a valid income frequency"]
        );
        assert_eq!(
            errors.field("main_income_source"),
            ["lottery is not a valid income source"]
        );
    }

    #[test]
    fn submit_saves_the_profile_and_advances_the_marker() {
        let (mut conn, user) = get_test_connection_and_user();
        let user_id = user.id;

        let form = ProfileSetupForm::new(user, Some(full_payload()));
        let saved = form.submit(&mut conn).unwrap();

        assert_eq!(saved.onboarding_step, Some(OnboardingStep::AccountSetup));

        let stored = get_user_by_id(user_id, &conn).unwrap();
        assert_eq!(stored.country.as_deref(), Some("New Zealand"));
        assert_eq!(stored.currency.as_deref(), Some("NZD"));
        assert_eq!(stored.income_frequency, Some(IncomeFrequency::Fortnightly));
        assert_eq!(stored.main_income_source, Some(IncomeSource::Salary));
    }

    #[test]
    fn optional_fields_may_be_omitted() {
        let (mut conn, user) = get_test_connection_and_user();
        let user_id = user.id;

        let form = ProfileSetupForm::new(
            user,
            Some(ProfileSetupPayload {
                country: "Ireland".to_owned(),
                currency: "EUR".to_owned(),
                income_frequency: Some("".to_owned()),
                main_income_source: None,
            }),
        );
        form.submit(&mut conn).unwrap();

        let stored = get_user_by_id(user_id, &conn).unwrap();
        assert_eq!(stored.income_frequency, None);
        assert_eq!(stored.main_income_source, None);
    }

    #[test]
    fn invalid_submit_persists_nothing() {
        let (mut conn, user) = get_test_connection_and_user();
        let user_id = user.id;

        let form = ProfileSetupForm::new(
            user,
            Some(ProfileSetupPayload {
                currency: "DOGE".to_owned(),
                ..full_payload()
            }),
        );
        let result = form.submit(&mut conn);

        assert!(matches!(result, Err(SubmitError::Invalid(_))));

        let stored = get_user_by_id(user_id, &conn).unwrap();
        assert_eq!(stored.country, None);
        assert_eq!(stored.currency, None);
        assert_eq!(stored.onboarding_step, Some(OnboardingStep::ProfileSetup));
    }

    #[test]
    fn resubmitting_identical_values_is_idempotent() {
        let (mut conn, user) = get_test_connection_and_user();
        let user_id = user.id;

        let form = ProfileSetupForm::new(user, Some(full_payload()));
        form.submit(&mut conn).unwrap();

        let first = get_user_by_id(user_id, &conn).unwrap();
        assert_eq!(first.onboarding_step, Some(OnboardingStep::AccountSetup));

        // A second identical submission is accepted and leaves the user in
        // the same state.
        let form = ProfileSetupForm::new(first.clone(), Some(full_payload()));
        let saved = form.submit(&mut conn).unwrap();

        assert_eq!(saved.onboarding_step, Some(OnboardingStep::AccountSetup));
        assert_eq!(get_user_by_id(user_id, &conn).unwrap(), first);
    }
}

#[cfg(test)]
mod profile_setup_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        endpoints,
        onboarding::OnboardingStep,
        test_utils::response_body_text,
        user::{UserId, create_user, update_user},
    };

    use super::{ProfileSetupPayload, ProfileSetupState, submit_profile_setup_endpoint};

    fn get_test_state() -> (ProfileSetupState, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let mut user = create_user(&conn).unwrap();
        user.onboarding_step = Some(OnboardingStep::ProfileSetup);
        update_user(&user, &conn).unwrap();

        (
            ProfileSetupState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn successful_submit_redirects_to_the_account_setup_step() {
        let (state, user_id) = get_test_state();

        let payload = ProfileSetupPayload {
            country: "Ireland".to_owned(),
            currency: "EUR".to_owned(),
            income_frequency: None,
            main_income_source: None,
        };
        let response =
            submit_profile_setup_endpoint(State(state), Extension(user_id), Form(payload)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(HX_REDIRECT).unwrap(),
            endpoints::ONBOARDING_ACCOUNTS_VIEW
        );
    }

    #[tokio::test]
    async fn failed_submit_re_renders_the_form_with_errors() {
        let (state, user_id) = get_test_state();

        let payload = ProfileSetupPayload {
            country: "".to_owned(),
            currency: "DOGE".to_owned(),
            income_frequency: None,
            main_income_source: None,
        };
        let response =
            submit_profile_setup_endpoint(State(state), Extension(user_id), Form(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body_text(response).await;
        assert!(body.contains("is required"));
        assert!(body.contains("DOGE is not a known currency"));
    }
}
