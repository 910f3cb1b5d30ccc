use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for posted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier of a marketplace user (customer, tradesperson or admin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Tradesperson,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Tradesperson => "tradesperson",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "customer" => Some(Role::Customer),
            "tradesperson" => Some(Role::Tradesperson),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated caller of a workflow operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId(id.into()),
            role,
        }
    }

    pub fn customer(id: impl Into<String>) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn tradesperson(id: impl Into<String>) -> Self {
        Self::new(id, Role::Tradesperson)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Draft,
    Open,
    InProgress,
    Completed,
    Canceled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Open => "open",
            JobStatus::InProgress => "in-progress",
            JobStatus::Completed => "completed",
            JobStatus::Canceled => "canceled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Canceled)
    }

    /// Statuses in which a tradesperson is expected to be selected.
    pub const fn has_selected_tradesperson(self) -> bool {
        matches!(self, JobStatus::InProgress | JobStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Still under consideration by the job owner.
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending | ApplicationStatus::Shortlisted
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Fixed,
    Range,
    Negotiable,
}

/// Customer budget for a job. Amounts are in minor units (pence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(rename = "type")]
    pub kind: BudgetKind,
    #[serde(default)]
    pub min_amount: Option<u64>,
    #[serde(default)]
    pub max_amount: Option<u64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Budget {
    pub fn fixed(amount: u64) -> Self {
        Self {
            kind: BudgetKind::Fixed,
            min_amount: Some(amount),
            max_amount: Some(amount),
            currency: default_currency(),
        }
    }

    pub fn range(min_amount: u64, max_amount: u64) -> Self {
        Self {
            kind: BudgetKind::Range,
            min_amount: Some(min_amount),
            max_amount: Some(max_amount),
            currency: default_currency(),
        }
    }

    pub fn negotiable() -> Self {
        Self {
            kind: BudgetKind::Negotiable,
            min_amount: None,
            max_amount: None,
            currency: default_currency(),
        }
    }
}

pub(crate) fn default_currency() -> String {
    "GBP".to_string()
}

fn check_currency(currency: &str) -> Result<(), String> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(format!("currency '{currency}' must be a three letter ISO code"))
    }
}

impl Budget {
    pub fn validate(&self) -> Result<(), String> {
        check_currency(&self.currency)?;

        match (self.kind, self.min_amount, self.max_amount) {
            (BudgetKind::Fixed, None, _) => Err("fixed budget requires an amount".to_string()),
            (BudgetKind::Range, Some(min), Some(max)) if min > max => Err(format!(
                "budget range minimum {min} exceeds maximum {max}"
            )),
            (BudgetKind::Range, None, _) | (BudgetKind::Range, _, None) => {
                Err("range budget requires both a minimum and a maximum".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidKind {
    Fixed,
    Hourly,
    Negotiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkEstimate {
    Days(u32),
    Hours(u32),
}

/// Tradesperson's price for the job. Amounts are in minor units (pence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    #[serde(rename = "type")]
    pub kind: BidKind,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub estimate: Option<WorkEstimate>,
}

impl Bid {
    pub fn fixed(amount: u64, estimated_days: u32) -> Self {
        Self {
            kind: BidKind::Fixed,
            amount: Some(amount),
            currency: default_currency(),
            estimate: Some(WorkEstimate::Days(estimated_days)),
        }
    }

    pub fn hourly(rate: u64, estimated_hours: u32) -> Self {
        Self {
            kind: BidKind::Hourly,
            amount: Some(rate),
            currency: default_currency(),
            estimate: Some(WorkEstimate::Hours(estimated_hours)),
        }
    }

    pub fn negotiable() -> Self {
        Self {
            kind: BidKind::Negotiable,
            amount: None,
            currency: default_currency(),
            estimate: None,
        }
    }
}

impl Bid {
    pub fn validate(&self) -> Result<(), String> {
        check_currency(&self.currency)?;

        match (self.kind, self.amount) {
            (BidKind::Negotiable, _) => {}
            (_, None) | (_, Some(0)) => {
                return Err("fixed and hourly bids require a positive amount".to_string())
            }
            _ => {}
        }

        match self.estimate {
            Some(WorkEstimate::Days(0)) | Some(WorkEstimate::Hours(0)) => {
                Err("work estimate must be at least one day or hour".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Free-form notes each party attaches to an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradesperson: Option<String>,
}

/// Which side of an application a note belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteAuthor {
    Customer,
    Tradesperson,
}

impl ApplicationNotes {
    pub(crate) fn append(&mut self, author: NoteAuthor, text: &str) {
        let slot = match author {
            NoteAuthor::Customer => &mut self.customer,
            NoteAuthor::Tradesperson => &mut self.tradesperson,
        };

        match slot {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => *slot = Some(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub customer_id: UserId,
    pub status: JobStatus,
    pub selected_tradesperson_id: Option<UserId>,
    pub budget: Budget,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Job {
    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.customer_id == actor.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub tradesperson_id: UserId,
    pub status: ApplicationStatus,
    pub bid: Bid,
    pub cover_letter: String,
    pub availability: String,
    pub notes: ApplicationNotes,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Application {
    pub fn is_submitted_by(&self, actor: &Actor) -> bool {
        self.tradesperson_id == actor.id
    }
}

/// Customer input for posting a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub budget: Budget,
    #[serde(default)]
    pub draft: bool,
}

/// Tradesperson input for applying to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub tradesperson_id: UserId,
    pub bid: Bid,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub availability: String,
}

/// Knobs for the accept side-effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    /// Move the job to in-progress in the same commit as the acceptance.
    pub start_job_on_accept: bool,
    /// Also reject shortlisted siblings, not only pending ones.
    pub reject_shortlisted_on_accept: bool,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            start_job_on_accept: true,
            reject_shortlisted_on_accept: false,
        }
    }
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedApplication {
    pub application: Application,
    pub job: Job,
    pub rejected: Vec<ApplicationId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_serializes_kebab_case() {
        let raw = serde_json::to_string(&JobStatus::InProgress).expect("serializes");
        assert_eq!(raw, "\"in-progress\"");
        let parsed: JobStatus = serde_json::from_str("\"canceled\"").expect("parses");
        assert_eq!(parsed, JobStatus::Canceled);
    }

    #[test]
    fn notes_append_on_new_line() {
        let mut notes = ApplicationNotes::default();
        notes.append(NoteAuthor::Customer, "Can you start Monday?");
        notes.append(NoteAuthor::Customer, "Parking is on the drive.");
        notes.append(NoteAuthor::Tradesperson, "Monday works.");

        assert_eq!(
            notes.customer.as_deref(),
            Some("Can you start Monday?\nParking is on the drive.")
        );
        assert_eq!(notes.tradesperson.as_deref(), Some("Monday works."));
    }

    #[test]
    fn budget_range_must_be_ordered() {
        assert!(Budget::range(10_000, 20_000).validate().is_ok());
        assert!(Budget::range(20_000, 10_000).validate().is_err());
        assert!(Budget::negotiable().validate().is_ok());

        let mut missing = Budget::fixed(5_000);
        missing.min_amount = None;
        assert!(missing.validate().is_err());
    }

    #[test]
    fn bid_requires_amount_unless_negotiable() {
        assert!(Bid::negotiable().validate().is_ok());
        assert!(Bid::hourly(4_500, 6).validate().is_ok());

        let mut free = Bid::fixed(1, 1);
        free.amount = Some(0);
        assert!(free.validate().is_err());

        let mut dollars = Bid::fixed(10_000, 1);
        dollars.currency = "usd".to_string();
        assert!(dollars.validate().is_err());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("plumber"), None);
    }
}
