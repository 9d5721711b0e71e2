//! The onboarding flow: a linear sequence of step forms (financial goals →
//! profile setup → account setup) driven by a step marker persisted on the
//! user row.
//!
//! Each step module bundles its form object, the step's page and submit
//! handlers, and the maud views. The step marker itself lives in [step]; the
//! mapping from marker to destination lives in [navigator].

mod account_setup;
mod financial_goal;
mod navigator;
mod profile_setup;
mod step;

pub use account_setup::{
    AccountLine, AccountSetupForm, INITIAL_BALANCE_CATEGORY, get_account_setup_page,
    parse_account_lines, submit_account_setup_endpoint,
};
pub use financial_goal::{
    FinancialGoalForm, FinancialGoalsPayload, get_financial_goals_page,
    submit_financial_goals_endpoint,
};
pub use navigator::next_path;
pub use profile_setup::{
    ProfileSetupForm, ProfileSetupPayload, get_profile_setup_page, submit_profile_setup_endpoint,
};
pub use step::OnboardingStep;
