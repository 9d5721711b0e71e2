//! The financial goals step: the first onboarding form.

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
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_LABEL_STYLE, FORM_CHECKBOX_STYLE, FORM_CONTAINER_STYLE,
        FORM_LABEL_STYLE, base, field_errors, render,
    },
    onboarding::{OnboardingStep, next_path},
    reference::FinancialGoal,
    user::{User, UserId, get_user_by_id, update_user},
    validation::{SubmitError, ValidationErrors},
};

/// The submitted payload for the financial goals step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinancialGoalsPayload {
    /// The goal keys ticked in the form.
    #[serde(default)]
    pub financial_goals: Vec<String>,
}

/// The form object for the financial goals step.
///
/// Built from the user plus an optional submitted payload; without a payload
/// the form shows the user's stored goals, so re-displaying it is
/// idempotent.
pub struct FinancialGoalForm {
    user: User,
    selected: Vec<String>,
}

impl FinancialGoalForm {
    /// Build the form for `user`, seeding the selection from `payload` when
    /// present and from the user's stored goals otherwise.
    ///
    /// A user with no step marker gets it initialized to this step. A marker
    /// pointing at a later step is left alone, so replaying this form cannot
    /// pull a user backwards.
    pub fn new(mut user: User, payload: Option<FinancialGoalsPayload>) -> Self {
        let selected = match payload {
            Some(payload) => payload.financial_goals,
            None => user
                .financial_goals
                .iter()
                .map(|goal| goal.as_str().to_owned())
                .collect(),
        };

        if user.onboarding_step.is_none() {
            user.onboarding_step = Some(OnboardingStep::FinancialGoal);
        }

        Self { user, selected }
    }

    /// The goal keys currently shown as ticked.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Check the selected goal keys against the fixed vocabulary.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.selected.is_empty() {
            errors.add("financial_goals", "pick at least one goal");
        }

        let unknown: Vec<&str> = self
            .selected
            .iter()
            .filter(|key| FinancialGoal::parse(key).is_none())
            .map(String::as_str)
            .collect();

        if !unknown.is_empty() {
            errors.add(
                "financial_goals",
                format!("{} is not a valid goal", unknown.join(", ")),
            );
        }

        errors
    }

    /// Validate, copy the goals onto the user, advance the step marker and
    /// save the user.
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

        // Every key parses after validation.
        self.user.financial_goals = self
            .selected
            .iter()
            .filter_map(|key| FinancialGoal::parse(key))
            .collect();
        self.user.advance_onboarding(OnboardingStep::ProfileSetup);

        let user_errors = self.user.validate();
        if !user_errors.is_empty() {
            return Err(SubmitError::Invalid(user_errors));
        }

        update_user(&self.user, connection)?;

        Ok(self.user)
    }
}

fn goals_form_view(selected: &[String], errors: &ValidationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::ONBOARDING_GOALS_API)
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            @for message in errors.base() {
                p class="text-red-600 dark:text-red-400" { (message) }
            }

            fieldset class="flex flex-col gap-2"
            {
                legend class=(FORM_LABEL_STYLE) { "What do you want to get out of Fintrack?" }

                @for goal in FinancialGoal::ALL {
                    label class=(FORM_CHECKBOX_LABEL_STYLE)
                    {
                        input
                            type="checkbox"
                            name="financial_goals"
                            value=(goal.as_str())
                            class=(FORM_CHECKBOX_STYLE)
                            checked[selected.iter().any(|key| key == goal.as_str())];

                        (goal.label())
                    }
                }
            }

            (field_errors(errors.field("financial_goals")))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Continue" }
        }
    }
}

fn goals_page_view(selected: &[String], errors: &ValidationErrors) -> Markup {
    let content = html! {
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "Your goals"
            }

            p class="mb-6 text-sm text-gray-500 dark:text-gray-400" { "Step 1 of 3" }

            (goals_form_view(selected, errors))
        }
    };

    base("Your goals", &[], &content)
}

/// The state needed for the financial goals step.
#[derive(Debug, Clone)]
pub struct GoalsState {
    /// The database connection for loading and saving the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the financial goals page.
///
/// A user whose marker points at another step is redirected there instead.
pub async fn get_financial_goals_page(
    State(state): State<GoalsState>,
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
        && step != OnboardingStep::FinancialGoal
    {
        return Redirect::to(next_path(Some(step))).into_response();
    }

    let form = FinancialGoalForm::new(user, None);

    render(
        StatusCode::OK,
        goals_page_view(form.selected(), &ValidationErrors::new()),
    )
}

/// A route handler for submitting the financial goals step.
///
/// Redirects to the next step on success; re-renders the form with the
/// error set on validation failure.
pub async fn submit_financial_goals_endpoint(
    State(state): State<GoalsState>,
    Extension(user_id): Extension<UserId>,
    Form(payload): Form<FinancialGoalsPayload>,
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

    let form = FinancialGoalForm::new(user, Some(payload));
    let selected = form.selected().to_vec();

    match form.submit(&mut connection) {
        Ok(user) => (
            HxRedirect(next_path(user.onboarding_step).to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(SubmitError::Invalid(errors)) => {
            render(StatusCode::OK, goals_form_view(&selected, &errors))
        }
        Err(SubmitError::Db(error)) => {
            tracing::error!("could not save financial goals: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod financial_goal_form_tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        onboarding::OnboardingStep,
        reference::FinancialGoal,
        user::{User, create_user, get_user_by_id},
        validation::SubmitError,
    };

    use super::{FinancialGoalForm, FinancialGoalsPayload};

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user(&conn).unwrap();

        (conn, user)
    }

    fn payload(keys: &[&str]) -> FinancialGoalsPayload {
        FinancialGoalsPayload {
            financial_goals: keys.iter().map(|key| key.to_string()).collect(),
        }
    }

    #[test]
    fn seeds_from_stored_goals_without_a_payload() {
        let (conn, mut user) = get_test_connection_and_user();
        user.financial_goals = vec![FinancialGoal::PayOffDebt];
        crate::user::update_user(&user, &conn).unwrap();

        let form = FinancialGoalForm::new(user, None);

        assert_eq!(form.selected(), ["pay_off_debt"]);
    }

    #[test]
    fn initializes_a_missing_step_marker() {
        let (_conn, mut user) = get_test_connection_and_user();
        user.onboarding_step = None;

        let form = FinancialGoalForm::new(user, Some(payload(&["pay_off_debt"])));

        assert_eq!(
            form.user.onboarding_step,
            Some(OnboardingStep::FinancialGoal)
        );
    }

    #[test]
    fn does_not_touch_a_later_step_marker() {
        let (_conn, mut user) = get_test_connection_and_user();
        user.onboarding_step = Some(OnboardingStep::AccountSetup);

        let form = FinancialGoalForm::new(user, Some(payload(&["pay_off_debt"])));

        assert_eq!(form.user.onboarding_step, Some(OnboardingStep::AccountSetup));
    }

    #[test]
    fn empty_selection_is_invalid() {
        let (_conn, user) = get_test_connection_and_user();

        let form = FinancialGoalForm::new(user, Some(payload(&[])));
        let errors = form.validate();

        assert_eq!(errors.field("financial_goals"), ["pick at least one goal"]);
    }

    #[test]
    fn unknown_keys_are_named_in_the_error() {
        let (_conn, user) = get_test_connection_and_user();

        let form = FinancialGoalForm::new(
            user,
            Some(payload(&["pay_off_debt", "not_a_real_goal", "win_big"])),
        );
        let errors = form.validate();

        assert_eq!(
            errors.field("financial_goals"),
            ["not_a_real_goal, win_big is not a valid goal"]
        );
    }

    #[test]
    fn invalid_submit_persists_nothing() {
        let (mut conn, user) = get_test_connection_and_user();
        let user_id = user.id;

        let form = FinancialGoalForm::new(user, Some(payload(&["not_a_real_goal"])));
        let result = form.submit(&mut conn);

        assert!(matches!(result, Err(SubmitError::Invalid(_))));

        let stored = get_user_by_id(user_id, &conn).unwrap();
        assert!(stored.financial_goals.is_empty());
        assert_eq!(stored.onboarding_step, Some(OnboardingStep::FinancialGoal));
    }

    #[test]
    fn submit_saves_goals_and_advances_the_marker() {
        let (mut conn, user) = get_test_connection_and_user();
        let user_id = user.id;

        let form = FinancialGoalForm::new(
            user,
            Some(payload(&["save_for_emergency", "track_spending"])),
        );
        let saved = form.submit(&mut conn).unwrap();

        assert_eq!(saved.onboarding_step, Some(OnboardingStep::ProfileSetup));

        let stored = get_user_by_id(user_id, &conn).unwrap();
        assert_eq!(
            stored.financial_goals,
            vec![FinancialGoal::SaveForEmergency, FinancialGoal::TrackSpending]
        );
        assert_eq!(stored.onboarding_step, Some(OnboardingStep::ProfileSetup));
    }

    #[test]
    fn replaying_the_form_cannot_regress_the_marker() {
        let (mut conn, mut user) = get_test_connection_and_user();
        let user_id = user.id;
        user.onboarding_step = Some(OnboardingStep::AccountSetup);
        crate::user::update_user(&user, &conn).unwrap();

        let form = FinancialGoalForm::new(user, Some(payload(&["pay_off_debt"])));
        form.submit(&mut conn).unwrap();

        let stored = get_user_by_id(user_id, &conn).unwrap();
        // The goals update, the marker does not move backwards.
        assert_eq!(stored.financial_goals, vec![FinancialGoal::PayOffDebt]);
        assert_eq!(stored.onboarding_step, Some(OnboardingStep::AccountSetup));
    }
}
