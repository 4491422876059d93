use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::{
    baserow::{MemberRecord, MemberStore},
    brevo::{EmailMessage, EmailSender},
    config::Config,
    renewal::{
        reconciler::{MatchedPair, Reconciliation},
        templates::{Locale, ReminderTemplate},
    },
    utils,
};

/// What happened to a member that needed a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,
    /// Not on the allowlist; state still written back
    Skipped,
    /// A reminder went out too recently; nothing written back
    Suppressed,
    SendFailed,
    DryRun,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub french_language_id: i64,
    pub min_interval_days: i64,
    pub allowlist: Vec<String>,
    pub dry_run: bool,
}

impl EngineSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            french_language_id: config.membership.french_language_id,
            min_interval_days: config.reminder.min_interval_days,
            allowlist: config.reminder.allowlist.clone(),
            dry_run: dry_run || config.run.dry_run,
        }
    }
}

/// Applies the reconciliation decisions: sends reminders and writes members back
pub struct RenewalEngine<'a> {
    store: &'a dyn MemberStore,
    sender: &'a dyn EmailSender,
    template: ReminderTemplate,
    settings: EngineSettings,
}

impl<'a> RenewalEngine<'a> {
    pub fn new(
        store: &'a dyn MemberStore,
        sender: &'a dyn EmailSender,
        template: ReminderTemplate,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            sender,
            template,
            settings,
        }
    }

    /// True when the last reminder is old enough to send another one
    pub fn reminder_allowed(&self, last_reminder: Option<NaiveDate>, now: DateTime<Utc>) -> bool {
        let Some(day) = last_reminder else {
            return true;
        };
        let Some(sent_at) = day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()) else {
            return true;
        };
        sent_at < now - Duration::days(self.settings.min_interval_days)
    }

    fn is_allowlisted(&self, member: &MemberRecord) -> bool {
        self.settings.allowlist.is_empty()
            || self
                .settings
                .allowlist
                .iter()
                .any(|allowed| member.has_email(allowed))
    }

    pub fn compose(&self, member: &MemberRecord) -> (Locale, EmailMessage) {
        let locale = Locale::for_member(member, self.settings.french_language_id);
        let content = self.template.render(locale, &member.first_name);

        let message = EmailMessage {
            to_email: member.email.clone(),
            to_name: ReminderTemplate::recipient_name(member),
            subject: content.subject,
            html_content: content.html,
            text_content: content.text,
        };
        (locale, message)
    }

    /// Mark the member lapsed, send a reminder if the guard allows it and
    /// write the member back.
    pub async fn send_reminder(
        &self,
        pair: &MatchedPair,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> ReminderOutcome {
        let mut member = pair.member.clone();
        member.active_membership = false;
        member.last_payment_date = Some(pair.payment.order_day());

        if !self.reminder_allowed(member.last_reminder_date, now) {
            debug!(
                "Reminder to {} suppressed, last one sent on {}",
                member.email,
                utils::format_day(member.last_reminder_date)
            );
            summary.reminders_suppressed += 1;
            return ReminderOutcome::Suppressed;
        }

        let (locale, message) = self.compose(&member);

        if self.settings.dry_run {
            info!(
                "[dry run] Would send {} reminder to {} ({})",
                locale.code(),
                message.to_email,
                message.subject
            );
            summary.dry_run += 1;
            return ReminderOutcome::DryRun;
        }

        let outcome = if self.is_allowlisted(&member) {
            match self.sender.send(&message).await {
                Ok(()) => {
                    member.last_reminder_date = Some(now.date_naive());
                    member.reminder_count = member.reminder_count.saturating_add(1);
                    summary.reminders_sent += 1;
                    ReminderOutcome::Sent
                }
                Err(e) => {
                    error!("Failed to send reminder to {}: {}", member.email, e);
                    summary.reminders_failed += 1;
                    ReminderOutcome::SendFailed
                }
            }
        } else {
            info!("Skipping reminder to {}: not on allowlist", member.email);
            debug!("Subject: {}\n{}", message.subject, message.text_content);
            summary.reminders_skipped += 1;
            ReminderOutcome::Skipped
        };

        if let Err(e) = self.store.update_member(&member).await {
            error!("Failed to update member {} ({}): {}", member.id, member.email, e);
            summary.persist_failures += 1;
        }

        outcome
    }

    /// Mark the member active with the payment day and reset the reminder count
    pub async fn apply_status_update(&self, pair: &MatchedPair, summary: &mut RunSummary) {
        let mut member = pair.member.clone();
        member.active_membership = true;
        member.last_payment_date = Some(pair.payment.order_day());
        member.reminder_count = 0;

        if self.settings.dry_run {
            info!(
                "[dry run] Would mark {} active, paid on {}",
                member.email,
                pair.payment.order_day()
            );
            summary.dry_run += 1;
            return;
        }

        match self.store.update_member(&member).await {
            Ok(()) => summary.status_updates += 1,
            Err(e) => {
                error!("Failed to update member {} ({}): {}", member.id, member.email, e);
                summary.persist_failures += 1;
            }
        }
    }

    /// Reminders first, then status updates. Failures are logged and counted.
    pub async fn process(&self, reconciliation: &Reconciliation, now: DateTime<Utc>) -> RunSummary {
        let mut summary = RunSummary::default();

        info!("Processing {} members needing a reminder", reconciliation.reminders.len());
        for pair in &reconciliation.reminders {
            self.send_reminder(pair, now, &mut summary).await;
        }

        info!("Processing {} member status updates", reconciliation.status_updates.len());
        for pair in &reconciliation.status_updates {
            self.apply_status_update(pair, &mut summary).await;
        }

        if summary.failures() > 0 {
            warn!("{} operations failed during this run", summary.failures());
        }

        summary
    }
}

/// Counters of one reconciliation run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reminders_sent: usize,
    pub reminders_skipped: usize,
    pub reminders_suppressed: usize,
    pub reminders_failed: usize,
    pub status_updates: usize,
    pub persist_failures: usize,
    pub dry_run: usize,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.reminders_failed + self.persist_failures
    }

    /// Print a formatted summary to console
    pub fn print_summary(&self) {
        println!("\n=== Renewal Run Summary ===");
        println!("Reminders sent:        {} ✓", self.reminders_sent);
        println!("Reminders skipped:     {}", self.reminders_skipped);
        println!("Reminders suppressed:  {}", self.reminders_suppressed);
        println!("Reminders failed:      {} ✗", self.reminders_failed);
        println!("Status updates:        {} ✓", self.status_updates);
        println!("Update failures:       {} ✗", self.persist_failures);
        if self.dry_run > 0 {
            println!("Dry-run actions:       {}", self.dry_run);
        }
        println!("===========================");
    }
}
