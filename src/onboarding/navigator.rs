//! Maps a user's onboarding step marker to the page they should be on.

use crate::{endpoints, onboarding::OnboardingStep};

/// The destination for a user whose step marker is `step`.
///
/// Forms advance the marker as part of their own submit, so callers must
/// re-read the user after submitting and pass the fresh marker here: a user
/// who just finished step N is sent to step N+1's page, and a user who opens
/// a stale link is sent forward to their own current step.
///
/// A missing or unparseable marker falls open to the first step's page, never
/// to an error.
pub fn next_path(step: Option<OnboardingStep>) -> &'static str {
    match step {
        None | Some(OnboardingStep::FinancialGoal) => endpoints::ONBOARDING_GOALS_VIEW,
        Some(OnboardingStep::ProfileSetup) => endpoints::ONBOARDING_PROFILE_VIEW,
        Some(OnboardingStep::AccountSetup) => endpoints::ONBOARDING_ACCOUNTS_VIEW,
        Some(OnboardingStep::Completed) => endpoints::DASHBOARD_VIEW,
    }
}

#[cfg(test)]
mod next_path_tests {
    use super::next_path;
    use crate::{endpoints, onboarding::OnboardingStep};

    #[test]
    fn each_step_maps_to_its_own_page() {
        assert_eq!(
            next_path(Some(OnboardingStep::FinancialGoal)),
            endpoints::ONBOARDING_GOALS_VIEW
        );
        assert_eq!(
            next_path(Some(OnboardingStep::ProfileSetup)),
            endpoints::ONBOARDING_PROFILE_VIEW
        );
        assert_eq!(
            next_path(Some(OnboardingStep::AccountSetup)),
            endpoints::ONBOARDING_ACCOUNTS_VIEW
        );
    }

    #[test]
    fn completed_maps_to_the_dashboard() {
        assert_eq!(
            next_path(Some(OnboardingStep::Completed)),
            endpoints::DASHBOARD_VIEW
        );
    }

    #[test]
    fn missing_marker_fails_open_to_the_first_step() {
        assert_eq!(next_path(None), endpoints::ONBOARDING_GOALS_VIEW);
    }

    #[test]
    fn submitting_a_step_leads_to_the_following_page() {
        // The marker is advanced by submit before the navigator runs, so the
        // path for the advanced marker is the next step's page.
        let after_goals = OnboardingStep::FinancialGoal.next();
        assert_eq!(next_path(after_goals), endpoints::ONBOARDING_PROFILE_VIEW);

        let after_profile = OnboardingStep::ProfileSetup.next();
        assert_eq!(next_path(after_profile), endpoints::ONBOARDING_ACCOUNTS_VIEW);

        let after_accounts = OnboardingStep::AccountSetup.next();
        assert_eq!(next_path(after_accounts), endpoints::DASHBOARD_VIEW);
    }
}
