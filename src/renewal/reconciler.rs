use std::collections::HashMap;

use chrono::{DateTime, Months, Utc};
use tracing::{debug, info, warn};

use crate::{baserow::MemberRecord, helloasso::PaymentRecord};

/// Lookup of members by any of their addresses
pub struct MemberIndex<'a> {
    by_email: HashMap<&'a str, &'a MemberRecord>,
}

impl<'a> MemberIndex<'a> {
    /// Register every member under its primary and alternate addresses.
    /// When two members share an address the one registered last wins.
    // TODO: report shared addresses as a data-quality problem instead of silently overwriting
    pub fn build(members: &'a [MemberRecord]) -> Self {
        let mut by_email: HashMap<&'a str, &'a MemberRecord> = HashMap::new();

        for member in members {
            for email in member.emails() {
                if let Some(previous) = by_email.insert(email, member) {
                    if previous.id != member.id {
                        warn!(
                            "Address {} shared by members {} and {}; keeping {}",
                            email, previous.id, member.id, member.id
                        );
                    }
                }
            }
        }

        Self { by_email }
    }

    pub fn get(&self, email: &str) -> Option<&'a MemberRecord> {
        self.by_email.get(email).copied()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.by_email.contains_key(email)
    }
}

/// A member joined with its most recent membership-fee payment
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub member: MemberRecord,
    pub payment: PaymentRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Last payment is older than the validity period
    NeedsReminder,
    /// Payment is current but the stored status or payment day is stale
    NeedsStatusUpdate,
    NoAction,
}

/// Instant before which a payment no longer covers the membership
pub fn lapse_threshold(now: DateTime<Utc>, validity_months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(validity_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl MatchedPair {
    pub fn classify(&self, threshold: DateTime<Utc>) -> Classification {
        let paid_at = self.payment.order_date.with_timezone(&Utc);

        if paid_at < threshold {
            return Classification::NeedsReminder;
        }

        let stale_day = self.member.last_payment_date != Some(self.payment.order_day());
        if !self.member.active_membership || stale_day {
            Classification::NeedsStatusUpdate
        } else {
            Classification::NoAction
        }
    }
}

/// Outcome of joining payments with members
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub reminders: Vec<MatchedPair>,
    pub status_updates: Vec<MatchedPair>,
    pub up_to_date: usize,
    pub unmatched_payments: Vec<PaymentRecord>,
}

impl Reconciliation {
    pub fn matched(&self) -> usize {
        self.reminders.len() + self.status_updates.len() + self.up_to_date
    }
}

pub struct Reconciler {
    validity_months: u32,
}

impl Reconciler {
    pub fn new(validity_months: u32) -> Self {
        Self { validity_months }
    }

    /// Join every reduced payment to its member and sort the pairs by the
    /// action they need.
    pub fn reconcile(
        &self,
        payments: &[PaymentRecord],
        index: &MemberIndex<'_>,
        now: DateTime<Utc>,
    ) -> Reconciliation {
        let threshold = lapse_threshold(now, self.validity_months);
        let mut result = Reconciliation::default();

        for payment in payments {
            let Some(member) = index.get(&payment.payer_email) else {
                debug!("No member for payer {}", payment.payer_email);
                result.unmatched_payments.push(payment.clone());
                continue;
            };

            let pair = MatchedPair {
                member: member.clone(),
                payment: payment.clone(),
            };

            match pair.classify(threshold) {
                Classification::NeedsReminder => result.reminders.push(pair),
                Classification::NeedsStatusUpdate => result.status_updates.push(pair),
                Classification::NoAction => result.up_to_date += 1,
            }
        }

        info!(
            "Matched {} payments: {} need a reminder, {} need a status update, {} up to date ({} without member)",
            result.matched(),
            result.reminders.len(),
            result.status_updates.len(),
            result.up_to_date,
            result.unmatched_payments.len()
        );

        result
    }
}
