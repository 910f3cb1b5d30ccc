//! Per-step gates for the registration wizard and final profile assembly.

use std::sync::OnceLock;

use regex::Regex;

use super::domain::{
    Certification, CertificationForm, Insurance, InsuranceForm, RegistrationForm,
    TradespersonRegistration, WizardStep,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Reasons a wizard step cannot be left.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("please fill in all required fields: {}", .fields.join(", "))]
    MissingFields {
        step: WizardStep,
        fields: Vec<&'static str>,
    },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("select at least one skill")]
    NoSkills,
    #[error("'{0}' is not a valid UK postcode")]
    InvalidPostcode(String),
    #[error("registration can only be submitted from the review step, not {0}")]
    NotAtReview(WizardStep),
}

impl RegistrationError {
    /// Step whose gate raised the error.
    pub fn step(&self) -> WizardStep {
        match self {
            RegistrationError::MissingFields { step, .. } => *step,
            RegistrationError::PasswordMismatch | RegistrationError::PasswordTooShort { .. } => {
                WizardStep::Account
            }
            RegistrationError::NoSkills => WizardStep::Skills,
            RegistrationError::InvalidPostcode(_) => WizardStep::Location,
            RegistrationError::NotAtReview(step) => *step,
        }
    }
}

fn postcode_pattern() -> &'static Regex {
    static POSTCODE_PATTERN: OnceLock<Regex> = OnceLock::new();
    POSTCODE_PATTERN.get_or_init(|| {
        // ASCII letters and digits only.
        Regex::new(r"^[A-Za-z]{1,2}[0-9][A-Za-z0-9]? ?[0-9][A-Za-z]{2}$")
            .expect("postcode regex pattern must be valid")
    })
}

/// UK postcode format check: outward code, optional single space, inward code.
pub fn is_uk_postcode(value: &str) -> bool {
    postcode_pattern().is_match(value.trim())
}

/// Upper-cases a valid postcode and puts one space before the inward code.
pub fn normalise_postcode(value: &str) -> Option<String> {
    if !is_uk_postcode(value) {
        return None;
    }

    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let (split, _) = compact.char_indices().rev().nth(2)?;
    let (outward, inward) = compact.split_at(split);
    Some(format!("{outward} {inward}"))
}

/// Gate for leaving `step` forwards. Steps after location are not gated.
pub fn validate_step(step: WizardStep, form: &RegistrationForm) -> Result<(), RegistrationError> {
    match step {
        WizardStep::Account => check_account(form),
        WizardStep::Skills => check_skills(form),
        WizardStep::Location => check_location(form),
        WizardStep::Certification | WizardStep::Insurance | WizardStep::Review => Ok(()),
    }
}

fn missing(step: WizardStep, fields: &[(&'static str, &str)]) -> Result<(), RegistrationError> {
    let fields: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if fields.is_empty() {
        Ok(())
    } else {
        Err(RegistrationError::MissingFields { step, fields })
    }
}

fn check_account(form: &RegistrationForm) -> Result<(), RegistrationError> {
    missing(
        WizardStep::Account,
        &[
            ("email", &form.email),
            ("password", &form.password),
            ("confirm_password", &form.confirm_password),
            ("first_name", &form.first_name),
            ("last_name", &form.last_name),
            ("phone_number", &form.phone_number),
        ],
    )?;

    if form.password != form.confirm_password {
        return Err(RegistrationError::PasswordMismatch);
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RegistrationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    Ok(())
}

fn check_skills(form: &RegistrationForm) -> Result<(), RegistrationError> {
    if form.skills.iter().any(|skill| !skill.trim().is_empty()) {
        Ok(())
    } else {
        Err(RegistrationError::NoSkills)
    }
}

fn check_location(form: &RegistrationForm) -> Result<(), RegistrationError> {
    missing(
        WizardStep::Location,
        &[
            ("address", &form.address),
            ("city", &form.city),
            ("state", &form.state),
            ("postal_code", &form.postal_code),
        ],
    )?;

    if !is_uk_postcode(&form.postal_code) {
        return Err(RegistrationError::InvalidPostcode(
            form.postal_code.trim().to_string(),
        ));
    }

    Ok(())
}

fn present(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn certification(form: &CertificationForm) -> Option<Certification> {
    Some(Certification {
        name: present(&form.name)?,
        issuer: present(&form.issuer)?,
        issue_date: form.issue_date,
        expiry_date: form.expiry_date,
        document_url: present(&form.document_url),
    })
}

fn insurance(form: &InsuranceForm) -> Option<Insurance> {
    Some(Insurance {
        provider: present(&form.provider)?,
        policy_number: present(&form.policy_number)?,
        coverage_amount: form.coverage_amount,
        expiry_date: form.expiry_date,
        document_url: present(&form.document_url),
    })
}

/// Re-runs the gated steps and builds the profile sent to the account backend.
pub fn assemble(form: &RegistrationForm) -> Result<TradespersonRegistration, RegistrationError> {
    for step in [
        WizardStep::Account,
        WizardStep::Skills,
        WizardStep::Location,
    ] {
        validate_step(step, form)?;
    }

    let postal_code = normalise_postcode(&form.postal_code)
        .ok_or_else(|| RegistrationError::InvalidPostcode(form.postal_code.clone()))?;

    Ok(TradespersonRegistration {
        email: form.email.trim().to_lowercase(),
        password: form.password.clone(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        phone_number: form.phone_number.trim().to_string(),
        skills: form
            .skills
            .iter()
            .filter_map(|skill| present(skill))
            .collect(),
        business_name: present(&form.business_name),
        years_of_experience: form.years_of_experience,
        hourly_rate: form.hourly_rate,
        bio: present(&form.bio),
        address: form.address.trim().to_string(),
        city: form.city.trim().to_string(),
        state: form.state.trim().to_string(),
        postal_code,
        certification: certification(&form.certification),
        insurance: insurance(&form.insurance),
    })
}
