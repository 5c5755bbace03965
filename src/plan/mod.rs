//! Execution plans: multi-step tasks behind a single confirmation
//!
//! A plan is built in `Draft`, shown to the user, and parked in
//! `AwaitingConfirmation`. From then on its target and steps are frozen;
//! the only thing that moves is the status (to `Executed` or `Cancelled`).
//! Illegal transitions are errors, never silent no-ops.

pub mod compose;
pub mod style;

pub use compose::ComposePolicy;
pub use style::{Formality, StyleHints, Tone};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{AssistError, Result};
use crate::core::types::PlanId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    AwaitingConfirmation,
    Executed,
    Cancelled,
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Generate message text from the user's request
    ComposeMessage { request: String, style: StyleHints },
    /// Deliver text to a contact
    SendMessage {
        contact: String,
        use_previous_output: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    id: PlanId,
    target_contact: String,
    steps: Vec<PlanStep>,
    status: PlanStatus,
    summary: String,
    request: String,
    style: StyleHints,
    composed_content: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Build a compose-then-send plan for `contact`
    ///
    /// Style cues are read from `request`, the user's own words.
    pub fn compose_and_send(contact: impl Into<String>, request: impl Into<String>) -> Self {
        let contact = contact.into();
        let request = request.into();
        let style = StyleHints::detect(&request);

        Self {
            id: PlanId::new(),
            summary: summarize(&contact, &style),
            steps: vec![
                PlanStep::ComposeMessage {
                    request: request.clone(),
                    style: style.clone(),
                },
                PlanStep::SendMessage {
                    contact: contact.clone(),
                    use_previous_output: true,
                },
            ],
            target_contact: contact,
            status: PlanStatus::Draft,
            request,
            style,
            composed_content: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn target_contact(&self) -> &str {
        &self.target_contact
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn style(&self) -> &StyleHints {
        &self.style
    }

    pub fn composed_content(&self) -> Option<&str> {
        self.composed_content.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_awaiting(&self) -> bool {
        self.status == PlanStatus::AwaitingConfirmation
    }

    /// The question shown to the user while the plan waits
    pub fn confirmation_prompt(&self) -> String {
        format!("{} Shall I proceed?", self.summary)
    }

    /// Retarget a draft. Frozen once confirmation has been requested.
    pub fn set_target(&mut self, contact: impl Into<String>) -> Result<()> {
        self.require(PlanStatus::Draft, "retarget")?;
        let contact = contact.into();
        for step in &mut self.steps {
            if let PlanStep::SendMessage { contact: c, .. } = step {
                *c = contact.clone();
            }
        }
        self.summary = summarize(&contact, &self.style);
        self.target_contact = contact;
        Ok(())
    }

    pub fn request_confirmation(&mut self) -> Result<()> {
        self.require(PlanStatus::Draft, "request confirmation for")?;
        self.status = PlanStatus::AwaitingConfirmation;
        tracing::info!(plan = ?self.id, contact = %self.target_contact, "plan awaiting confirmation");
        Ok(())
    }

    /// Store the output of the compose step
    pub fn record_composition(&mut self, text: impl Into<String>) -> Result<()> {
        self.require(PlanStatus::AwaitingConfirmation, "record output for")?;
        self.composed_content = Some(text.into());
        Ok(())
    }

    pub fn mark_executed(&mut self) -> Result<()> {
        self.require(PlanStatus::AwaitingConfirmation, "execute")?;
        self.status = PlanStatus::Executed;
        tracing::info!(plan = ?self.id, "plan executed");
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        match self.status {
            PlanStatus::Draft | PlanStatus::AwaitingConfirmation => {
                self.status = PlanStatus::Cancelled;
                tracing::info!(plan = ?self.id, "plan cancelled");
                Ok(())
            }
            from => Err(AssistError::InvalidPlanTransition {
                from,
                action: "cancel",
            }),
        }
    }

    fn require(&self, expected: PlanStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(AssistError::InvalidPlanTransition {
                from: self.status,
                action,
            })
        }
    }
}

fn summarize(contact: &str, style: &StyleHints) -> String {
    format!(
        "I'll write {} for {} based on your request and send it.",
        style.describe(),
        contact
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_plan_shape() {
        let plan = ExecutionPlan::compose_and_send("Ana", "send Ana a message introducing myself");
        assert_eq!(plan.status(), PlanStatus::Draft);
        assert_eq!(plan.target_contact(), "Ana");
        assert_eq!(plan.steps().len(), 2);
        assert!(matches!(plan.steps()[0], PlanStep::ComposeMessage { .. }));
        assert_eq!(
            plan.steps()[1],
            PlanStep::SendMessage {
                contact: "Ana".into(),
                use_previous_output: true
            }
        );
        assert!(plan.confirmation_prompt().ends_with("Shall I proceed?"));
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut plan = ExecutionPlan::compose_and_send("Ana", "write a love message");
        plan.request_confirmation().unwrap();
        assert!(plan.is_awaiting());
        plan.record_composition("Hi love").unwrap();
        plan.mark_executed().unwrap();
        assert_eq!(plan.status(), PlanStatus::Executed);
        assert_eq!(plan.composed_content(), Some("Hi love"));
    }

    #[test]
    fn test_target_frozen_while_awaiting() {
        let mut plan = ExecutionPlan::compose_and_send("Ana", "introduce yourself");
        plan.set_target("Bia").unwrap();
        assert_eq!(plan.target_contact(), "Bia");

        plan.request_confirmation().unwrap();
        let err = plan.set_target("Carla").unwrap_err();
        assert!(matches!(
            err,
            AssistError::InvalidPlanTransition {
                from: PlanStatus::AwaitingConfirmation,
                ..
            }
        ));
        assert_eq!(plan.target_contact(), "Bia");
    }

    #[test]
    fn test_executing_draft_is_rejected() {
        let mut plan = ExecutionPlan::compose_and_send("Ana", "introduce yourself");
        assert!(plan.mark_executed().is_err());
        assert_eq!(plan.status(), PlanStatus::Draft);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut plan = ExecutionPlan::compose_and_send("Ana", "introduce yourself");
        plan.request_confirmation().unwrap();
        plan.cancel().unwrap();

        assert!(plan.cancel().is_err());
        assert!(plan.mark_executed().is_err());
        assert!(plan.request_confirmation().is_err());
        assert!(plan.record_composition("late").is_err());
    }

    #[test]
    fn test_plan_serializes_with_step_tags() {
        let plan = ExecutionPlan::compose_and_send("Ana", "introduce yourself");
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["steps"][0]["type"], "compose_message");
        assert_eq!(json["steps"][1]["type"], "send_message");

        let back: ExecutionPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }
}
