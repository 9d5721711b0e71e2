//! Reference data backing the onboarding and transaction forms: currency and
//! country option lists with their priority subsets, and the fixed
//! vocabularies for income frequency, income source and financial goals.
//!
//! Everything in here is a pure lookup over static data.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The ISO 4217 currency codes the profile form accepts.
pub const CURRENCY_CODES: &[&str] = &[
    "AUD", "BRL", "CAD", "CHF", "CLP", "CNY", "COP", "CZK", "DKK", "EUR", "GBP", "HKD", "HUF",
    "IDR", "ILS", "INR", "JPY", "KRW", "MXN", "MYR", "NOK", "NZD", "PEN", "PHP", "PLN", "SEK",
    "SGD", "THB", "TRY", "USD", "VND", "ZAR",
];

/// The currencies listed first in the currency picker.
pub const PRIORITY_CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "CAD", "AUD", "NZD"];

/// The currency assigned when the user does not pick one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Countries offered by the profile form.
///
/// The country is stored as plain text, so this list is presentational only
/// and does not constrain what the form accepts.
pub const COUNTRIES: &[&str] = &[
    "Argentina",
    "Australia",
    "Austria",
    "Belgium",
    "Brazil",
    "Canada",
    "Chile",
    "China",
    "Colombia",
    "Czechia",
    "Denmark",
    "Finland",
    "France",
    "Germany",
    "Greece",
    "Hungary",
    "India",
    "Indonesia",
    "Ireland",
    "Israel",
    "Italy",
    "Japan",
    "Malaysia",
    "Mexico",
    "Netherlands",
    "New Zealand",
    "Norway",
    "Peru",
    "Philippines",
    "Poland",
    "Portugal",
    "Singapore",
    "South Africa",
    "South Korea",
    "Spain",
    "Sweden",
    "Switzerland",
    "Thailand",
    "Turkey",
    "United Kingdom",
    "United States",
    "Vietnam",
];

/// The countries listed first in the country picker.
pub const PRIORITY_COUNTRIES: &[&str] = &[
    "United States",
    "United Kingdom",
    "Canada",
    "Australia",
    "New Zealand",
];

/// How often the user's main income arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeFrequency {
    Weekly,
    Fortnightly,
    Monthly,
    Quarterly,
    Annually,
    Irregular,
}

impl IncomeFrequency {
    /// Every income frequency, in display order.
    pub const ALL: &[IncomeFrequency] = &[
        IncomeFrequency::Weekly,
        IncomeFrequency::Fortnightly,
        IncomeFrequency::Monthly,
        IncomeFrequency::Quarterly,
        IncomeFrequency::Annually,
        IncomeFrequency::Irregular,
    ];

    /// The stable key used in the database and form payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Fortnightly => "fortnightly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
            Self::Irregular => "irregular",
        }
    }

    /// Parse a stored or submitted key. Unknown keys return `None`.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == key)
    }

    /// The human-readable label shown in the form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Fortnightly => "Fortnightly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Annually => "Annually",
            Self::Irregular => "Irregular",
        }
    }
}

impl Display for IncomeFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the user's main income comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeSource {
    Salary,
    SelfEmployment,
    Investments,
    Pension,
    Benefits,
    Other,
}

impl IncomeSource {
    /// Every income source, in display order.
    pub const ALL: &[IncomeSource] = &[
        IncomeSource::Salary,
        IncomeSource::SelfEmployment,
        IncomeSource::Investments,
        IncomeSource::Pension,
        IncomeSource::Benefits,
        IncomeSource::Other,
    ];

    /// The stable key used in the database and form payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::SelfEmployment => "self_employment",
            Self::Investments => "investments",
            Self::Pension => "pension",
            Self::Benefits => "benefits",
            Self::Other => "other",
        }
    }

    /// Parse a stored or submitted key. Unknown keys return `None`.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == key)
    }

    /// The human-readable label shown in the form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Salary => "Salary or wages",
            Self::SelfEmployment => "Self-employment",
            Self::Investments => "Investments",
            Self::Pension => "Pension",
            Self::Benefits => "Benefits",
            Self::Other => "Other",
        }
    }
}

impl Display for IncomeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fixed vocabulary of financial goals a user can pick during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialGoal {
    SaveForEmergency,
    PayOffDebt,
    BuyAHome,
    SaveForRetirement,
    TrackSpending,
    GrowInvestments,
    SaveForTravel,
}

impl FinancialGoal {
    /// Every financial goal, in display order.
    pub const ALL: &[FinancialGoal] = &[
        FinancialGoal::SaveForEmergency,
        FinancialGoal::PayOffDebt,
        FinancialGoal::BuyAHome,
        FinancialGoal::SaveForRetirement,
        FinancialGoal::TrackSpending,
        FinancialGoal::GrowInvestments,
        FinancialGoal::SaveForTravel,
    ];

    /// The stable key used in the database and form payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaveForEmergency => "save_for_emergency",
            Self::PayOffDebt => "pay_off_debt",
            Self::BuyAHome => "buy_a_home",
            Self::SaveForRetirement => "save_for_retirement",
            Self::TrackSpending => "track_spending",
            Self::GrowInvestments => "grow_investments",
            Self::SaveForTravel => "save_for_travel",
        }
    }

    /// Parse a stored or submitted key. Unknown keys return `None`.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.as_str() == key)
    }

    /// The human-readable label shown in the form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SaveForEmergency => "Build an emergency fund",
            Self::PayOffDebt => "Pay off debt",
            Self::BuyAHome => "Save for a home",
            Self::SaveForRetirement => "Save for retirement",
            Self::TrackSpending => "Understand my spending",
            Self::GrowInvestments => "Grow my investments",
            Self::SaveForTravel => "Save for travel",
        }
    }
}

impl Display for FinancialGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
