use crate::infra::{build_workflow, EventLog};
use clap::Args;
use tradelink::error::AppError;
use tradelink::workflows::marketplace::{
    AcceptancePolicy, Actor, ApplicationStatus, ApplicationSubmission, Bid, Budget, JobStatus,
    NewJob, WorkflowError,
};
use tradelink::workflows::registration::{is_uk_postcode, RegistrationForm, RegistrationWizard};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject shortlisted applications as well as pending ones on acceptance.
    #[arg(long)]
    pub(crate) reject_shortlisted: bool,
    /// Leave the job open after acceptance and start it explicitly.
    #[arg(long)]
    pub(crate) hold_job_open: bool,
}

impl DemoArgs {
    fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy {
            start_job_on_accept: !self.hold_job_open,
            reject_shortlisted_on_accept: self.reject_shortlisted,
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let policy = args.policy();
    let events = EventLog::default();
    let (workflow, store) = build_workflow(policy, events.clone());

    println!("Tradelink marketplace demo");
    println!(
        "- policy: start job on accept = {}, reject shortlisted on accept = {}",
        policy.start_job_on_accept, policy.reject_shortlisted_on_accept
    );

    let customer = Actor::customer("cust-demo");
    let job = workflow.post_job(
        &customer,
        NewJob {
            title: "Replace bathroom suite".to_string(),
            description: "Bath, basin and WC; pipework to be reused".to_string(),
            budget: Budget::range(250_000, 400_000),
            draft: false,
        },
    )?;
    println!("\nPosted {} \"{}\" ({})", job.id, job.title, job.status);

    let mut applications = Vec::new();
    for (name, bid) in [
        ("ana", Bid::fixed(320_000, 4)),
        ("ben", Bid::hourly(4_800, 60)),
        ("cal", Bid::negotiable()),
    ] {
        let tradesperson = Actor::tradesperson(format!("trade-{name}"));
        let application = workflow.submit_application(
            &job.id,
            ApplicationSubmission {
                tradesperson_id: tradesperson.id.clone(),
                bid,
                cover_letter: format!("{name} can take this on."),
                availability: "From next Monday".to_string(),
            },
            &tradesperson,
        )?;
        println!(
            "- {} applied as {} ({})",
            application.tradesperson_id, application.id, application.status
        );
        applications.push(application);
    }

    let shortlisted = workflow.transition_application(
        &applications[2].id,
        ApplicationStatus::Shortlisted,
        &customer,
    )?;
    println!("- owner shortlisted {}", shortlisted.id);

    let applicant = Actor::tradesperson(applications[0].tradesperson_id.0.clone());
    if let Err(err) = workflow.accept_application(&applications[0].id, &applicant) {
        println!("- applicant self-accept refused: {err}");
    }

    let accepted = workflow.accept_application(&applications[0].id, &customer)?;
    println!(
        "\nAccepted {} -> job {} is {} with {}",
        accepted.application.id,
        accepted.job.id,
        accepted.job.status,
        accepted
            .job
            .selected_tradesperson_id
            .as_ref()
            .map(|id| id.0.as_str())
            .unwrap_or("nobody")
    );

    if accepted.job.status == JobStatus::Open {
        let started = workflow.transition_job(&job.id, JobStatus::InProgress, &customer)?;
        println!("- owner started the job ({})", started.status);
    }
    let completed = workflow.transition_job(&job.id, JobStatus::Completed, &customer)?;
    println!("- owner completed the job ({})", completed.status);
    if let Err(err) = workflow.transition_job(&job.id, JobStatus::Open, &Actor::admin("admin-demo"))
    {
        println!("- reopening refused: {err}");
    }

    let snapshot = store.snapshot().map_err(WorkflowError::from)?;
    println!("\nFinal application statuses:");
    for application in snapshot.applications.values() {
        println!(
            "  - {} ({}): {}",
            application.id, application.tradesperson_id, application.status
        );
    }

    let notifications = events.events();
    println!("\n{} notifications queued:", notifications.len());
    for event in &notifications {
        println!("  - {}", event.name());
    }

    println!("\nRegistration wizard checks");
    for postcode in ["NW1 6XE", "nw16xe", "10001"] {
        println!(
            "- postcode {postcode:?}: {}",
            if is_uk_postcode(postcode) {
                "valid"
            } else {
                "invalid"
            }
        );
    }
    let mut wizard = RegistrationWizard::with_form(RegistrationForm {
        email: "ana@example.com".to_string(),
        password: "short".to_string(),
        confirm_password: "short".to_string(),
        first_name: "Ana".to_string(),
        last_name: "Silva".to_string(),
        phone_number: "07700 900456".to_string(),
        ..RegistrationForm::default()
    });
    if let Err(err) = wizard.next_step() {
        println!("- {} step blocked: {err}", wizard.step().label());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_under_both_policies() {
        run_demo(DemoArgs::default()).expect("default policy demo");
        run_demo(DemoArgs {
            reject_shortlisted: true,
            hold_job_open: true,
        })
        .expect("alternate policy demo");
    }

    #[test]
    fn flags_map_onto_policy() {
        let policy = DemoArgs {
            reject_shortlisted: false,
            hold_job_open: true,
        }
        .policy();
        assert!(!policy.start_job_on_accept);
        assert!(!policy.reject_shortlisted_on_accept);
    }
}
