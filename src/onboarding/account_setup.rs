//! The account setup step: the last and heaviest onboarding form.
//!
//! The user enters any number of "account lines" (name, opening amount,
//! date). Lines that are missing a name or a positive amount are silently
//! skipped; the surviving lines are persisted in one database transaction as
//! an account row (via the resolver) plus an opening-balance ledger row, and
//! the same transaction marks onboarding as completed.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use time::{Date, macros::format_description};

use crate::{
    AppState, Error,
    account::resolve_account,
    category::{CategoryKind, resolve_category},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, HeadElement, base, render,
    },
    onboarding::{OnboardingStep, next_path},
    timezone::today_in_timezone,
    transaction::{Transaction, create_transaction},
    user::{User, UserId, get_user_by_id, update_user},
    validation::{SubmitError, ValidationErrors},
};

/// The name of the fixed category that opening-balance ledger rows are filed
/// under. Its kind is always [CategoryKind::TransferIn].
pub const INITIAL_BALANCE_CATEGORY: &str = "Initial balance";

/// One line of the account setup form.
///
/// Whether the line came from an integer index or a client-side placeholder
/// token is irrelevant by the time it exists: the token only separated it
/// from the other lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountLine {
    /// The account name, trimmed. May be empty, in which case the line is
    /// skipped.
    pub account_name: String,
    /// The opening balance. `None` if absent or unparseable.
    pub amount: Option<f64>,
    /// The date for the opening-balance ledger row. `None` means "today".
    pub transaction_date: Option<Date>,
}

impl AccountLine {
    /// The skip predicate: lines without a name or without a strictly
    /// positive amount are dropped at submission time without an error.
    pub fn should_skip(&self) -> bool {
        self.account_name.is_empty() || self.amount.is_none_or(|amount| amount <= 0.0)
    }
}

/// Rebuild the account lines from the raw form pairs.
///
/// Line keys look like `accounts[<token>][<field>]` where `<token>` is
/// either an integer index or a placeholder the client made up for a row
/// added after page load. Tokens carry no meaning beyond "distinct line":
/// lines come back in order of first appearance, and the order of fields
/// within a line does not matter. Unknown fields (the payload may carry
/// `category_name`/`category_kind`, which this step fixes server-side) and
/// keys that do not match the pattern are ignored.
pub fn parse_account_lines(pairs: &[(String, String)]) -> Vec<AccountLine> {
    let mut order: Vec<&str> = Vec::new();
    let mut lines: HashMap<&str, AccountLine> = HashMap::new();

    for (key, value) in pairs {
        let Some((token, field)) = parse_line_key(key) else {
            continue;
        };

        if !lines.contains_key(token) {
            order.push(token);
        }
        let line = lines.entry(token).or_default();

        match field {
            "account_name" => line.account_name = value.trim().to_owned(),
            "amount" => line.amount = value.trim().parse::<f64>().ok(),
            "transaction_date" => {
                line.transaction_date =
                    Date::parse(value.trim(), &format_description!("[year]-[month]-[day]")).ok()
            }
            _ => {}
        }
    }

    order
        .into_iter()
        .filter_map(|token| lines.remove(token))
        .collect()
}

fn parse_line_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix("accounts[")?;
    let (token, rest) = rest.split_once(']')?;
    let field = rest.strip_prefix('[')?.strip_suffix(']')?;

    Some((token, field))
}

/// The form object for the account setup step.
pub struct AccountSetupForm {
    user: User,
    lines: Vec<AccountLine>,
}

impl AccountSetupForm {
    /// Build the form for `user` from the parsed lines. An empty submission
    /// (or first display) gets a single blank line.
    ///
    /// A user with no step marker gets it initialized to this step; a later
    /// marker is left alone.
    pub fn new(mut user: User, lines: Vec<AccountLine>) -> Self {
        let lines = if lines.is_empty() {
            vec![AccountLine::default()]
        } else {
            lines
        };

        if user.onboarding_step.is_none() {
            user.onboarding_step = Some(OnboardingStep::AccountSetup);
        }

        Self { user, lines }
    }

    /// The lines as they will be shown or submitted.
    pub fn lines(&self) -> &[AccountLine] {
        &self.lines
    }

    /// At least one line has to survive the skip predicate. Lines that fail
    /// it are not individually reported; they are simply dropped at
    /// submission time.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.lines.iter().all(AccountLine::should_skip) {
            errors.add_base("Add at least one account with a name and a positive opening balance.");
        }

        errors
    }

    /// Persist every surviving line and mark onboarding as completed, all in
    /// one database transaction.
    ///
    /// For each line that passes the skip predicate: resolve the named
    /// account (find-or-create, so two lines naming the same account share
    /// one row), then insert an opening-balance ledger row against the fixed
    /// [INITIAL_BALANCE_CATEGORY] transfer-in category. Lines without a date
    /// use `default_date`. Any failure rolls back every row written by this
    /// call, including the user update.
    ///
    /// # Errors
    ///
    /// Returns [SubmitError::Invalid] if validation fails or a generated
    /// ledger row fails validation (with the row's errors promoted onto the
    /// form), or [SubmitError::Db] for unexpected storage errors.
    pub fn submit(
        mut self,
        default_date: Date,
        connection: &mut Connection,
    ) -> Result<User, SubmitError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SubmitError::Invalid(errors));
        }

        // Dropping the transaction without committing rolls everything back,
        // so every early return below aborts the whole submission.
        let transaction = connection.transaction().map_err(Error::from)?;

        let category = resolve_category(
            self.user.id,
            INITIAL_BALANCE_CATEGORY,
            CategoryKind::TransferIn,
            &transaction,
        )?;

        for line in &self.lines {
            if line.should_skip() {
                continue;
            }
            let Some(amount) = line.amount else {
                continue;
            };

            let account = resolve_account(self.user.id, &line.account_name, &transaction)?;
            let date = line.transaction_date.unwrap_or(default_date);
            let description = format!("Initial balance for {}", account.name);

            create_transaction(
                Transaction::build(amount, date, &description).account_id(Some(account.id)),
                &category,
                &transaction,
            )
            .map_err(|error| match error {
                Error::InvalidTransaction(row_errors) => SubmitError::Invalid(row_errors),
                error => SubmitError::Db(error),
            })?;
        }

        self.user.advance_onboarding(OnboardingStep::Completed);

        let user_errors = self.user.validate();
        if !user_errors.is_empty() {
            return Err(SubmitError::Invalid(user_errors));
        }

        update_user(&self.user, &transaction)?;

        transaction.commit().map_err(Error::from)?;

        Ok(self.user)
    }
}

fn account_line_view(index: usize, line: &AccountLine) -> Markup {
    html! {
        div class="account-line grid grid-cols-3 gap-2"
        {
            input
                type="text"
                name=(format!("accounts[{index}][account_name]"))
                placeholder="Account name"
                class=(FORM_TEXT_INPUT_STYLE)
                value=(line.account_name);

            input
                type="number"
                step="0.01"
                name=(format!("accounts[{index}][amount]"))
                placeholder="Balance"
                class=(FORM_TEXT_INPUT_STYLE)
                value=[line.amount];

            input
                type="date"
                name=(format!("accounts[{index}][transaction_date]"))
                class=(FORM_TEXT_INPUT_STYLE)
                value=[line.transaction_date.map(|date| date.to_string())];
        }
    }
}

fn account_setup_form_view(lines: &[AccountLine], errors: &ValidationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::ONBOARDING_ACCOUNTS_API)
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            @for message in errors.base() {
                p class="text-red-600 dark:text-red-400" { (message) }
            }

            p class=(FORM_LABEL_STYLE)
            {
                "Enter your accounts and what is in them right now."
            }

            div id="account-lines" class="flex flex-col gap-2"
            {
                @for (index, line) in lines.iter().enumerate() {
                    (account_line_view(index, line))
                }
            }

            button type="button" onclick="addAccountLine()" class=(BUTTON_SECONDARY_STYLE)
            {
                "Add another account"
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Finish" }
        }
    }
}

// Rows added on the client get a placeholder token instead of an index. The
// server only uses tokens to group fields into lines.
const ADD_LINE_SCRIPT: &str = "
    let addedLineCount = 0;

    function addAccountLine() {
        const container = document.getElementById('account-lines');
        const first = container.querySelector('.account-line');
        const clone = first.cloneNode(true);

        addedLineCount += 1;
        const token = 'new-' + addedLineCount;

        clone.querySelectorAll('input').forEach((input) => {
            input.name = input.name.replace(/accounts\\[[^\\]]*\\]/, 'accounts[' + token + ']');
            input.value = '';
        });

        container.appendChild(clone);
    }
";

fn account_setup_page_view(lines: &[AccountLine], errors: &ValidationErrors) -> Markup {
    let content = html! {
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl my-6"
            {
                "Your accounts"
            }

            p class="mb-6 text-sm text-gray-500 dark:text-gray-400" { "Step 3 of 3" }

            (account_setup_form_view(lines, errors))
        }
    };

    base(
        "Your accounts",
        &[HeadElement::ScriptSource(PreEscaped(
            ADD_LINE_SCRIPT.to_owned(),
        ))],
        &content,
    )
}

/// The state needed for the account setup step.
#[derive(Debug, Clone)]
pub struct AccountSetupState {
    /// The database connection for persisting the submission.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AccountSetupState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display the account setup page.
///
/// A user whose marker points at another step is redirected there instead.
pub async fn get_account_setup_page(
    State(state): State<AccountSetupState>,
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
        && step != OnboardingStep::AccountSetup
    {
        return Redirect::to(next_path(Some(step))).into_response();
    }

    let form = AccountSetupForm::new(user, Vec::new());

    render(
        StatusCode::OK,
        account_setup_page_view(form.lines(), &ValidationErrors::new()),
    )
}

/// A route handler for submitting the account setup step.
///
/// Redirects to the dashboard on success; re-renders the form with the
/// error set when every line was skipped or a row failed validation.
pub async fn submit_account_setup_endpoint(
    State(state): State<AccountSetupState>,
    Extension(user_id): Extension<UserId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let Some(default_date) = today_in_timezone(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

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

    let lines = parse_account_lines(&pairs);
    let form = AccountSetupForm::new(user, lines);
    let shown_lines = form.lines().to_vec();

    match form.submit(default_date, &mut connection) {
        Ok(user) => (
            HxRedirect(next_path(user.onboarding_step).to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(SubmitError::Invalid(errors)) => {
            render(StatusCode::OK, account_setup_form_view(&shown_lines, &errors))
        }
        Err(SubmitError::Db(error)) => {
            tracing::error!("could not save account setup: {error}");
            error.into_alert_response()
        }
    }
}




#[cfg(test)]
mod account_setup_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;

    use crate::{
        account::get_accounts_for_user,
        db::initialize,
        endpoints,
        onboarding::OnboardingStep,
        test_utils::response_body_text,
        user::{UserId, create_user, update_user},
    };

    use super::{AccountSetupState, submit_account_setup_endpoint};

    fn get_test_state() -> (AccountSetupState, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let mut user = create_user(&conn).unwrap();
        user.onboarding_step = Some(OnboardingStep::AccountSetup);
        update_user(&user, &conn).unwrap();

        (
            AccountSetupState {
                db_connection: Arc::new(Mutex::new(conn)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user.id,
        )
    }

    fn form_pairs(raw: &[(&str, &str)]) -> Form<Vec<(String, String)>> {
        Form(
            raw.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn successful_submit_redirects_to_the_dashboard() {
        let (state, user_id) = get_test_state();

        let response = submit_account_setup_endpoint(
            State(state.clone()),
            Extension(user_id),
            form_pairs(&[
                ("accounts[0][account_name]", "Cash"),
                ("accounts[0][amount]", "100"),
            ]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(HX_REDIRECT).unwrap(),
            endpoints::DASHBOARD_VIEW
        );

        let connection = state.db_connection.lock().unwrap();
        let accounts = get_accounts_for_user(user_id, &connection).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Cash");
    }

    #[tokio::test]
    async fn submit_with_every_line_blank_re_renders_with_the_base_error() {
        let (state, user_id) = get_test_state();

        let response = submit_account_setup_endpoint(
            State(state.clone()),
            Extension(user_id),
            form_pairs(&[
                ("accounts[0][account_name]", ""),
                ("accounts[0][amount]", ""),
            ]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body_text(response).await;
        assert!(body.contains("Add at least one account"));

        let connection = state.db_connection.lock().unwrap();
        assert!(get_accounts_for_user(user_id, &connection).unwrap().is_empty());
    }
}
