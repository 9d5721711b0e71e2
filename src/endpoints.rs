//! The application's endpoint URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for users who have finished onboarding.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for picking financial goals (first onboarding step).
pub const ONBOARDING_GOALS_VIEW: &str = "/onboarding/goals";
/// The page for setting up the user profile (second onboarding step).
pub const ONBOARDING_PROFILE_VIEW: &str = "/onboarding/profile";
/// The page for entering initial account balances (third onboarding step).
pub const ONBOARDING_ACCOUNTS_VIEW: &str = "/onboarding/accounts";
/// The page for displaying a user's transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for creating a new transaction.
pub const NEW_TRANSACTION_VIEW: &str = "/transactions/new";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route to create a user.
pub const USERS: &str = "/api/users";
/// The route for submitting the financial goals step.
pub const ONBOARDING_GOALS_API: &str = "/api/onboarding/goals";
/// The route for submitting the profile setup step.
pub const ONBOARDING_PROFILE_API: &str = "/api/onboarding/profile";
/// The route for submitting the account setup step.
pub const ONBOARDING_ACCOUNTS_API: &str = "/api/onboarding/accounts";
/// The route to create a transaction.
pub const TRANSACTIONS_API: &str = "/api/transactions";
