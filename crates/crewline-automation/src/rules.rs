// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The built-in automation rule table.
//!
//! Each rule is an independent (predicate, builder) pair evaluated against
//! the same (call, lead) snapshot. Rules do not see each other's output;
//! adding or removing a rule is a data change to [`RULES`], not a
//! control-flow edit. When several rules mutate the lead in one pass, the
//! later entry in the table wins.

use chrono::{DateTime, Duration, Utc};
use crewline_core::{
    Agent, CallRecord, CallStatus, Lead, LeadStatus, Sentiment, Task, TaskOrigin, TaskPriority,
    TaskStatus, TaskType,
};

/// Snapshot a rule battery runs against: one completed call, its derived
/// lead (if any), and the agent that handled it.
pub struct RuleContext<'a> {
    pub call: &'a CallRecord,
    pub lead: Option<&'a Lead>,
    pub agent: &'a Agent,
    pub now: DateTime<Utc>,
}

impl RuleContext<'_> {
    /// Best display name for the contact: lead name, caller name, then phone.
    fn contact_name(&self) -> String {
        if let Some(lead) = self.lead {
            return lead.name.clone();
        }
        self.call
            .caller_name
            .clone()
            .or_else(|| self.call.caller_phone.clone())
            .unwrap_or_else(|| "unknown caller".to_string())
    }
}

/// Lead mutation requested by a firing rule.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadAction {
    /// Move the lead to `to` if its current status is in `from`.
    Advance {
        to: LeadStatus,
        from: &'static [LeadStatus],
    },
    /// Convert the lead, stamping `converted_at` and the realized value.
    Convert { value: f64 },
}

/// Everything one firing rule wants done.
pub struct RuleFire {
    pub task: Task,
    pub lead_action: Option<LeadAction>,
}

/// One entry in the automation battery.
pub struct AutomationRule {
    /// Stable name used in logs and summaries.
    pub name: &'static str,
    /// Whether this rule fires for the given snapshot.
    pub applies: fn(&RuleContext<'_>) -> bool,
    /// Build the task and lead mutation for a firing rule.
    pub build: fn(&RuleContext<'_>) -> RuleFire,
}

fn draft_task(
    ctx: &RuleContext<'_>,
    title: String,
    description: String,
    task_type: TaskType,
    priority: TaskPriority,
    due_at: DateTime<Utc>,
) -> Task {
    Task {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: ctx.call.owner_id.clone(),
        title,
        description: Some(description),
        task_type,
        status: TaskStatus::Pending,
        priority,
        due_at: Some(due_at),
        lead_id: ctx.lead.map(|l| l.id.clone()),
        call_id: Some(ctx.call.id.clone()),
        created_by: TaskOrigin::VoiceAgent,
        agent_id: Some(ctx.agent.id.clone()),
        completed_at: None,
        created_at: ctx.now,
    }
}

/// The fixed rule battery, in evaluation (and tie-break) order.
pub const RULES: &[AutomationRule] = &[
    // 1. Qualified caller: schedule a follow-up within a day.
    AutomationRule {
        name: "qualified_follow_up",
        applies: |ctx| ctx.call.extracted.qualified && ctx.lead.is_some(),
        build: |ctx| RuleFire {
            task: draft_task(
                ctx,
                format!("Follow up with {}", ctx.contact_name()),
                "Caller qualified during the call".to_string(),
                TaskType::FollowUp,
                TaskPriority::High,
                ctx.now + Duration::hours(24),
            ),
            lead_action: Some(LeadAction::Advance {
                to: LeadStatus::Qualified,
                from: &[LeadStatus::New],
            }),
        },
    },
    // 2. Appointment booked: reminder a day before the appointment.
    AutomationRule {
        name: "appointment_reminder",
        applies: |ctx| {
            ctx.call.extracted.appointment_booked
                && ctx.call.extracted.appointment_date.is_some()
                && ctx.lead.is_some()
        },
        build: |ctx| {
            // applies() guarantees the date is present.
            let appointment = ctx.call.extracted.appointment_date.unwrap();
            RuleFire {
                task: draft_task(
                    ctx,
                    format!("Appointment reminder: {}", ctx.contact_name()),
                    format!("Appointment booked for {appointment}"),
                    TaskType::Reminder,
                    TaskPriority::High,
                    appointment - Duration::hours(24),
                ),
                lead_action: Some(LeadAction::Advance {
                    to: LeadStatus::Qualified,
                    from: &[LeadStatus::New, LeadStatus::Contacted],
                }),
            }
        },
    },
    // 3. Missed call: retry within two hours.
    AutomationRule {
        name: "missed_call_retry",
        applies: |ctx| {
            matches!(
                ctx.call.status,
                CallStatus::NoAnswer | CallStatus::Failed | CallStatus::Busy
            )
        },
        build: |ctx| RuleFire {
            task: draft_task(
                ctx,
                format!("Retry call to {}", ctx.contact_name()),
                format!("Previous attempt ended with status {}", ctx.call.status),
                TaskType::Call,
                TaskPriority::Medium,
                ctx.now + Duration::hours(2),
            ),
            lead_action: None,
        },
    },
    // 4. Interested but not qualified: nurture over a few days.
    AutomationRule {
        name: "interest_nurture",
        applies: |ctx| {
            ctx.call
                .extracted
                .interest
                .as_deref()
                .is_some_and(|i| !i.is_empty())
                && !ctx.call.extracted.qualified
                && ctx.lead.is_some()
        },
        build: |ctx| {
            let interest = ctx.call.extracted.interest.clone().unwrap_or_default();
            RuleFire {
                task: draft_task(
                    ctx,
                    format!("Nurture: {}", ctx.contact_name()),
                    format!("Expressed interest in {interest}"),
                    TaskType::FollowUp,
                    TaskPriority::Medium,
                    ctx.now + Duration::days(3),
                ),
                lead_action: Some(LeadAction::Advance {
                    to: LeadStatus::Contacted,
                    from: &[LeadStatus::New],
                }),
            }
        },
    },
    // 5. Payment captured: thank the customer and convert the lead.
    AutomationRule {
        name: "payment_thank_you",
        applies: |ctx| {
            ctx.call.extracted.payment_captured
                && ctx.call.extracted.payment_amount.is_some()
                && ctx.lead.is_some()
        },
        build: |ctx| {
            let amount = ctx.call.extracted.payment_amount.unwrap_or(0.0);
            RuleFire {
                task: draft_task(
                    ctx,
                    format!("Send thank-you email to {}", ctx.contact_name()),
                    format!("Payment of ${amount:.2} captured on the call"),
                    TaskType::Email,
                    TaskPriority::Medium,
                    ctx.now + Duration::hours(1),
                ),
                lead_action: Some(LeadAction::Convert { value: amount }),
            }
        },
    },
    // 6. Negative completed call: escalate urgently.
    AutomationRule {
        name: "negative_sentiment_escalation",
        applies: |ctx| {
            ctx.call.sentiment == Some(Sentiment::Negative)
                && ctx.call.status == CallStatus::Completed
        },
        build: |ctx| RuleFire {
            task: draft_task(
                ctx,
                format!("Escalation: negative call with {}", ctx.contact_name()),
                "Caller sentiment was negative; review the transcript".to_string(),
                TaskType::FollowUp,
                TaskPriority::Urgent,
                ctx.now + Duration::minutes(30),
            ),
            lead_action: None,
        },
    },
];

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crewline_core::{CallDirection, ExtractedData};

    pub(crate) fn make_agent() -> Agent {
        Agent {
            id: "agent-1".to_string(),
            owner_id: "owner-1".to_string(),
            name: "Sales Agent".to_string(),
            agent_type: "sales".to_string(),
            provider_agent_id: None,
            phone_number: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn make_call(status: CallStatus, extracted: ExtractedData) -> CallRecord {
        CallRecord {
            id: "call-1".to_string(),
            owner_id: "owner-1".to_string(),
            agent_id: "agent-1".to_string(),
            direction: CallDirection::Inbound,
            caller_phone: Some("+15551234567".to_string()),
            caller_name: Some("Jane".to_string()),
            duration_seconds: 120,
            duration_minutes: 2,
            rate_per_minute: 0.15,
            total_cost: 0.30,
            transcript: None,
            recording_url: None,
            status,
            sentiment: None,
            extracted,
            provider_call_id: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn make_lead(status: LeadStatus) -> Lead {
        Lead {
            id: "lead-1".to_string(),
            owner_id: "owner-1".to_string(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            email_is_placeholder: false,
            phone: "+15551234567".to_string(),
            source: "sales".to_string(),
            qualified: false,
            score: None,
            estimated_value: None,
            status,
            source_call_id: "call-1".to_string(),
            last_contacted_at: None,
            converted_at: None,
            created_at: Utc::now(),
        }
    }

    fn ctx<'a>(
        call: &'a CallRecord,
        lead: Option<&'a Lead>,
        agent: &'a Agent,
        now: DateTime<Utc>,
    ) -> RuleContext<'a> {
        RuleContext {
            call,
            lead,
            agent,
            now,
        }
    }

    fn rule(name: &str) -> &'static AutomationRule {
        RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn table_order_matches_tie_break_policy() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "qualified_follow_up",
                "appointment_reminder",
                "missed_call_retry",
                "interest_nurture",
                "payment_thank_you",
                "negative_sentiment_escalation",
            ]
        );
    }

    #[test]
    fn qualified_rule_needs_both_flag_and_lead() {
        let agent = make_agent();
        let now = Utc::now();
        let call = make_call(
            CallStatus::Completed,
            ExtractedData {
                qualified: true,
                ..Default::default()
            },
        );
        let lead = make_lead(LeadStatus::New);

        let r = rule("qualified_follow_up");
        assert!((r.applies)(&ctx(&call, Some(&lead), &agent, now)));
        assert!(!(r.applies)(&ctx(&call, None, &agent, now)));

        let unqualified = make_call(CallStatus::Completed, ExtractedData::default());
        assert!(!(r.applies)(&ctx(&unqualified, Some(&lead), &agent, now)));
    }

    #[test]
    fn qualified_rule_due_in_24_hours() {
        let agent = make_agent();
        let now = Utc::now();
        let call = make_call(
            CallStatus::Completed,
            ExtractedData {
                qualified: true,
                ..Default::default()
            },
        );
        let lead = make_lead(LeadStatus::New);
        let fire = (rule("qualified_follow_up").build)(&ctx(&call, Some(&lead), &agent, now));

        assert_eq!(fire.task.task_type, TaskType::FollowUp);
        assert_eq!(fire.task.due_at, Some(now + Duration::hours(24)));
        assert_eq!(fire.task.created_by, TaskOrigin::VoiceAgent);
        assert_eq!(fire.task.call_id.as_deref(), Some("call-1"));
        assert_eq!(fire.task.lead_id.as_deref(), Some("lead-1"));
        assert_eq!(fire.task.agent_id.as_deref(), Some("agent-1"));
    }

    #[test]
    fn appointment_reminder_due_day_before_appointment() {
        let agent = make_agent();
        let now = Utc::now();
        let appointment = now + Duration::days(5);
        let call = make_call(
            CallStatus::Completed,
            ExtractedData {
                appointment_booked: true,
                appointment_date: Some(appointment),
                ..Default::default()
            },
        );
        let lead = make_lead(LeadStatus::Contacted);
        let r = rule("appointment_reminder");
        assert!((r.applies)(&ctx(&call, Some(&lead), &agent, now)));

        let fire = (r.build)(&ctx(&call, Some(&lead), &agent, now));
        assert_eq!(fire.task.task_type, TaskType::Reminder);
        assert_eq!(fire.task.due_at, Some(appointment - Duration::hours(24)));
        assert_eq!(
            fire.lead_action,
            Some(LeadAction::Advance {
                to: LeadStatus::Qualified,
                from: &[LeadStatus::New, LeadStatus::Contacted],
            })
        );
    }

    #[test]
    fn appointment_without_date_does_not_fire() {
        let agent = make_agent();
        let now = Utc::now();
        let call = make_call(
            CallStatus::Completed,
            ExtractedData {
                appointment_booked: true,
                ..Default::default()
            },
        );
        let lead = make_lead(LeadStatus::New);
        assert!(!(rule("appointment_reminder").applies)(&ctx(
            &call,
            Some(&lead),
            &agent,
            now
        )));
    }

    #[test]
    fn missed_call_retry_fires_without_a_lead() {
        let agent = make_agent();
        let now = Utc::now();
        for status in [CallStatus::NoAnswer, CallStatus::Failed, CallStatus::Busy] {
            let call = make_call(status, ExtractedData::default());
            let r = rule("missed_call_retry");
            assert!((r.applies)(&ctx(&call, None, &agent, now)));
            let fire = (r.build)(&ctx(&call, None, &agent, now));
            assert_eq!(fire.task.task_type, TaskType::Call);
            assert_eq!(fire.task.due_at, Some(now + Duration::hours(2)));
            assert!(fire.lead_action.is_none());
            assert!(fire.task.lead_id.is_none());
        }

        let completed = make_call(CallStatus::Completed, ExtractedData::default());
        assert!(!(rule("missed_call_retry").applies)(&ctx(
            &completed, None, &agent, now
        )));
    }

    #[test]
    fn nurture_requires_interest_without_qualification() {
        let agent = make_agent();
        let now = Utc::now();
        let lead = make_lead(LeadStatus::New);

        let interested = make_call(
            CallStatus::Completed,
            ExtractedData {
                interest: Some("bathroom remodel".to_string()),
                ..Default::default()
            },
        );
        let r = rule("interest_nurture");
        assert!((r.applies)(&ctx(&interested, Some(&lead), &agent, now)));

        let fire = (r.build)(&ctx(&interested, Some(&lead), &agent, now));
        assert_eq!(fire.task.due_at, Some(now + Duration::days(3)));

        // Qualified callers get rule 1, not nurture.
        let qualified = make_call(
            CallStatus::Completed,
            ExtractedData {
                interest: Some("bathroom remodel".to_string()),
                qualified: true,
                ..Default::default()
            },
        );
        assert!(!(r.applies)(&ctx(&qualified, Some(&lead), &agent, now)));

        // Empty interest string is signal absence.
        let empty = make_call(
            CallStatus::Completed,
            ExtractedData {
                interest: Some(String::new()),
                ..Default::default()
            },
        );
        assert!(!(r.applies)(&ctx(&empty, Some(&lead), &agent, now)));
    }

    #[test]
    fn payment_rule_converts_with_amount() {
        let agent = make_agent();
        let now = Utc::now();
        let lead = make_lead(LeadStatus::Qualified);
        let call = make_call(
            CallStatus::Completed,
            ExtractedData {
                payment_captured: true,
                payment_amount: Some(1250.0),
                ..Default::default()
            },
        );
        let r = rule("payment_thank_you");
        assert!((r.applies)(&ctx(&call, Some(&lead), &agent, now)));

        let fire = (r.build)(&ctx(&call, Some(&lead), &agent, now));
        assert_eq!(fire.task.task_type, TaskType::Email);
        assert_eq!(fire.task.due_at, Some(now + Duration::hours(1)));
        assert_eq!(fire.lead_action, Some(LeadAction::Convert { value: 1250.0 }));

        // Captured flag without an amount is signal absence.
        let no_amount = make_call(
            CallStatus::Completed,
            ExtractedData {
                payment_captured: true,
                ..Default::default()
            },
        );
        assert!(!(r.applies)(&ctx(&no_amount, Some(&lead), &agent, now)));
    }

    #[test]
    fn escalation_needs_negative_sentiment_on_completed_call() {
        let agent = make_agent();
        let now = Utc::now();
        let mut call = make_call(CallStatus::Completed, ExtractedData::default());
        call.sentiment = Some(Sentiment::Negative);

        let r = rule("negative_sentiment_escalation");
        assert!((r.applies)(&ctx(&call, None, &agent, now)));
        let fire = (r.build)(&ctx(&call, None, &agent, now));
        assert_eq!(fire.task.priority, TaskPriority::Urgent);
        assert_eq!(fire.task.due_at, Some(now + Duration::minutes(30)));

        // Negative sentiment on a failed call is rule 3 territory, not 6.
        let mut failed = make_call(CallStatus::Failed, ExtractedData::default());
        failed.sentiment = Some(Sentiment::Negative);
        assert!(!(r.applies)(&ctx(&failed, None, &agent, now)));

        let mut positive = make_call(CallStatus::Completed, ExtractedData::default());
        positive.sentiment = Some(Sentiment::Positive);
        assert!(!(r.applies)(&ctx(&positive, None, &agent, now)));
    }
}
