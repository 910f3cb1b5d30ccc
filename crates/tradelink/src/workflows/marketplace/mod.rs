//! Job and application lifecycle for the tradesperson marketplace.
//!
//! `transitions` holds the pure rules, `service` runs them against a
//! [`MarketplaceRepository`] and `router` exposes them over HTTP.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    AcceptancePolicy, AcceptedApplication, Actor, Application, ApplicationId, ApplicationNotes,
    ApplicationStatus, ApplicationSubmission, Bid, BidKind, Budget, BudgetKind, Job, JobId,
    JobStatus, NewJob, NoteAuthor, Role, UserId, WorkEstimate,
};
pub use repository::{
    Changeset, Committed, DiscardEvents, EventPublisher, MarketplaceRepository, PublishError,
    RepositoryError, WorkflowEvent,
};
pub use router::{marketplace_router, RequestActor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use service::{JobApplicationWorkflow, WorkflowError};
pub use store::{InMemoryMarketplaceStore, StoreSnapshot};
pub use transitions::{EntityKind, TransitionError};
