//! The onboarding step marker: a linear state machine persisted on the user
//! row as plain text.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The steps of the onboarding flow.
///
/// Progresses linearly: FinancialGoal → ProfileSetup → AccountSetup →
/// Completed. The marker only ever moves forward; see
/// [crate::user::User::advance_onboarding].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    FinancialGoal,
    ProfileSetup,
    AccountSetup,
    Completed,
}

impl OnboardingStep {
    /// The step every new user starts on.
    pub const FIRST: OnboardingStep = OnboardingStep::FinancialGoal;

    /// The stable identifier stored in the `user.onboarding_step` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinancialGoal => "financial_goal",
            Self::ProfileSetup => "profile_setup",
            Self::AccountSetup => "account_setup",
            Self::Completed => "completed",
        }
    }

    /// Parse a stored marker. Unknown text returns `None`, which callers
    /// treat as "restart at the first step" rather than an error.
    pub fn parse(marker: &str) -> Option<Self> {
        match marker {
            "financial_goal" => Some(Self::FinancialGoal),
            "profile_setup" => Some(Self::ProfileSetup),
            "account_setup" => Some(Self::AccountSetup),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The step that follows this one, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        match self {
            Self::FinancialGoal => Some(Self::ProfileSetup),
            Self::ProfileSetup => Some(Self::AccountSetup),
            Self::AccountSetup => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Check whether moving from `self` to `target` is an allowed (adjacent,
    /// forward) transition. Backward and skipping transitions are not.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        self.next() == Some(target)
    }

    /// Whether onboarding is finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod onboarding_step_tests {
    use super::OnboardingStep::{self, *};

    #[test]
    fn next_walks_all_steps() {
        let mut current = OnboardingStep::FIRST;
        for expected in [ProfileSetup, AccountSetup, Completed] {
            let next = current.next().unwrap();
            assert_eq!(next, expected);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn adjacent_forward_transitions_are_allowed() {
        assert!(FinancialGoal.can_transition_to(ProfileSetup));
        assert!(ProfileSetup.can_transition_to(AccountSetup));
        assert!(AccountSetup.can_transition_to(Completed));
    }

    #[test]
    fn other_transitions_are_rejected() {
        // Skipping ahead
        assert!(!FinancialGoal.can_transition_to(AccountSetup));
        assert!(!ProfileSetup.can_transition_to(Completed));
        // Going backward
        assert!(!AccountSetup.can_transition_to(ProfileSetup));
        assert!(!Completed.can_transition_to(FinancialGoal));
        // Self-transition
        assert!(!ProfileSetup.can_transition_to(ProfileSetup));
    }

    #[test]
    fn markers_round_trip() {
        for step in [FinancialGoal, ProfileSetup, AccountSetup, Completed] {
            assert_eq!(OnboardingStep::parse(step.as_str()), Some(step));
        }
    }

    #[test]
    fn unknown_marker_parses_to_none() {
        assert_eq!(OnboardingStep::parse("bank_details"), None);
        assert_eq!(OnboardingStep::parse(""), None);
    }

    #[test]
    fn only_completed_is_terminal() {
        assert!(Completed.is_completed());
        assert!(!FinancialGoal.is_completed());
        assert!(!ProfileSetup.is_completed());
        assert!(!AccountSetup.is_completed());
    }

    #[test]
    fn markers_match_serde() {
        for step in [FinancialGoal, ProfileSetup, AccountSetup, Completed] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
    }
}
