//! Tradesperson sign-up wizard: per-step gating and profile assembly.

pub mod domain;
pub mod router;
pub mod validation;
pub mod wizard;

pub use domain::{
    Certification, CertificationForm, Insurance, InsuranceForm, RegistrationForm,
    TradespersonRegistration, WizardStep,
};
pub use router::registration_router;
pub use validation::{
    assemble, is_uk_postcode, normalise_postcode, validate_step, RegistrationError,
    MIN_PASSWORD_LENGTH,
};
pub use wizard::RegistrationWizard;
