use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Pages of the tradesperson sign-up wizard, in display order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Account,
    Skills,
    Location,
    Certification,
    Insurance,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::Account,
        WizardStep::Skills,
        WizardStep::Location,
        WizardStep::Certification,
        WizardStep::Insurance,
        WizardStep::Review,
    ];

    /// One-based position shown to the user.
    pub const fn number(self) -> u8 {
        match self {
            WizardStep::Account => 1,
            WizardStep::Skills => 2,
            WizardStep::Location => 3,
            WizardStep::Certification => 4,
            WizardStep::Insurance => 5,
            WizardStep::Review => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|step| step.number() == number)
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::Account => "account",
            WizardStep::Skills => "skills",
            WizardStep::Location => "location",
            WizardStep::Certification => "certification",
            WizardStep::Insurance => "insurance",
            WizardStep::Review => "review",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.number())
    }
}

/// Raw wizard input. Every field may be blank until its step is gated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,

    pub skills: BTreeSet<String>,
    pub business_name: String,
    pub years_of_experience: Option<u32>,
    /// Minor units (pence).
    pub hourly_rate: Option<u64>,
    pub bio: String,

    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,

    pub certification: CertificationForm,
    pub insurance: InsuranceForm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CertificationForm {
    pub name: String,
    pub issuer: String,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub document_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InsuranceForm {
    pub provider: String,
    pub policy_number: String,
    pub coverage_amount: Option<u64>,
    pub expiry_date: Option<NaiveDate>,
    pub document_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insurance {
    pub provider: String,
    pub policy_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

/// Profile assembled from a completed wizard, ready for the account backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradespersonRegistration {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certification: Option<Certification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
}
