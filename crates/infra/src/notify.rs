//! Notification templates and fan-out.
//!
//! Delivery failures are counted, never propagated: a ticket mutation has
//! already committed by the time its notifications go out.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use hosteldesk_escalations::Escalation;

use crate::mail::{Mailer, NotificationKind, OutboundEmail};

const SIGNATURE: &str = "Hostel Escalation System";

/// Counts from one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub total_sent: usize,
    pub total_failed: usize,
}

/// Facts about a status change, as broadcast to oversight staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateNotice {
    pub escalation_id: String,
    pub student_name: String,
    pub department: String,
    pub old_status: String,
    pub new_status: String,
    pub updated_by: String,
}

pub fn new_escalation_email(escalation: &Escalation) -> OutboundEmail {
    let id = escalation.id_typed();
    OutboundEmail {
        to: escalation.supervisor_email().to_string(),
        subject: format!("New Escalation Assigned: #{id}"),
        body: page(
            "New Escalation Assignment",
            "Dear Supervisor,",
            "A new escalation has been assigned to your department and requires your attention.",
            &[
                ("Escalation ID", format!("#{id}")),
                ("Department", escape(escalation.department())),
                ("Student", escape(escalation.student_name())),
                ("Assigned", Utc::now().to_rfc2822()),
            ],
            None,
        ),
        kind: NotificationKind::NewEscalation,
    }
}

pub fn team_member_assignment_email(
    escalation: &Escalation,
    team_member_email: &str,
    assigned_by: &str,
) -> OutboundEmail {
    let id = escalation.id_typed();
    OutboundEmail {
        to: team_member_email.to_string(),
        subject: format!("New Task Assignment: Escalation #{id}"),
        body: page(
            "New Task Assignment",
            "Dear Team Member,",
            &format!(
                "You have been assigned a new escalation task by {} (Supervisor).",
                escape(assigned_by)
            ),
            &[
                ("Escalation ID", format!("#{id}")),
                ("Department", escape(escalation.department())),
                ("Student", escape(escalation.student_name())),
                ("Assigned by", escape(assigned_by)),
                ("Assigned on", Utc::now().to_rfc2822()),
            ],
            Some(escalation.description()),
        ),
        kind: NotificationKind::TeamMemberAssignment,
    }
}

pub fn status_update_email(notice: &StatusUpdateNotice, to: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Escalation Status Updated: #{}", notice.escalation_id),
        body: page(
            "Escalation Status Update",
            "Dear Hostel Office Team,",
            "An escalation status has been updated and requires your attention.",
            &[
                ("Escalation ID", format!("#{}", escape(&notice.escalation_id))),
                ("Department", escape(&notice.department)),
                ("Student", escape(&notice.student_name)),
                (
                    "Status Change",
                    format!("{} → {}", escape(&notice.old_status), escape(&notice.new_status)),
                ),
                ("Updated by", escape(&notice.updated_by)),
                ("Updated on", Utc::now().to_rfc2822()),
            ],
            None,
        ),
        kind: NotificationKind::StatusUpdate,
    }
}

fn page(title: &str, greeting: &str, lead: &str, details: &[(&str, String)], description: Option<&str>) -> String {
    let items: String = details
        .iter()
        .map(|(label, value)| format!("<li><strong>{label}:</strong> {value}</li>"))
        .collect();
    let description = description
        .map(|d| format!("<h3>Description</h3><p>{}</p>", escape(d)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>\
         <h2>{SIGNATURE}</h2><h2>{title}</h2><p>{greeting}</p><p>{lead}</p>\
         <h3>Details</h3><ul>{items}</ul>{description}\
         <p>Thank you,<br><strong>{SIGNATURE}</strong></p>\
         <p><small>This is an automated message. Please do not reply to this email.</small></p>\
         </body></html>"
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Sends notifications through a [`Mailer`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send every message concurrently and count the outcomes.
    pub async fn fan_out(&self, messages: Vec<OutboundEmail>) -> DispatchReport {
        let results = join_all(messages.iter().map(|m| self.mailer.send(m))).await;

        let mut report = DispatchReport::default();
        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(()) => report.total_sent += 1,
                Err(e) => {
                    report.total_failed += 1;
                    tracing::warn!(to = %message.to, kind = ?message.kind, error = %e, "notification failed");
                }
            }
        }
        report
    }

    /// Fan out on a background task; the caller's response does not wait.
    pub fn dispatch_detached(&self, messages: Vec<OutboundEmail>) -> JoinHandle<DispatchReport> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let report = dispatcher.fan_out(messages).await;
            tracing::info!(
                sent = report.total_sent,
                failed = report.total_failed,
                "detached notification dispatch finished"
            );
            report
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MemoryMailer;

    fn notice() -> StatusUpdateNotice {
        StatusUpdateNotice {
            escalation_id: "esc-1".to_string(),
            student_name: "Priya <script>".to_string(),
            department: "Water".to_string(),
            old_status: "New".to_string(),
            new_status: "In Progress".to_string(),
            updated_by: "ravi@hostel.test".to_string(),
        }
    }

    #[test]
    fn status_template_escapes_user_text() {
        let email = status_update_email(&notice(), "office@hostel.test");
        assert_eq!(email.subject, "Escalation Status Updated: #esc-1");
        assert!(email.body.contains("Priya &lt;script&gt;"));
        assert!(email.body.contains("New → In Progress"));
    }

    #[tokio::test]
    async fn fan_out_counts_each_recipient() {
        let mailer = Arc::new(MemoryMailer::new());
        mailer.fail_for("down@hostel.test");
        let dispatcher = NotificationDispatcher::new(mailer.clone());

        let messages = ["a@hostel.test", "down@hostel.test", "b@hostel.test"]
            .iter()
            .map(|to| status_update_email(&notice(), to))
            .collect();
        let report = dispatcher.dispatch_detached(messages).await.unwrap();

        assert_eq!(
            report,
            DispatchReport {
                total_sent: 2,
                total_failed: 1
            }
        );
        assert_eq!(mailer.sent().len(), 2);
    }
}
