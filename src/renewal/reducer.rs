use std::collections::BTreeMap;

use tracing::debug;

use crate::{config::MembershipConfig, helloasso::PaymentRecord};

/// Keeps the latest membership-fee payment of every payer
pub struct PaymentReducer {
    form_slugs: Vec<String>,
}

impl PaymentReducer {
    pub fn new(form_slugs: Vec<String>) -> Self {
        Self { form_slugs }
    }

    pub fn from_config(config: &MembershipConfig) -> Self {
        Self::new(vec![
            config.french_form_slug.clone(),
            config.english_form_slug.clone(),
        ])
    }

    pub fn is_membership_fee(&self, payment: &PaymentRecord) -> bool {
        self.form_slugs.iter().any(|slug| slug == &payment.order_form_slug)
    }

    /// Filter to membership fees, then keep one payment per payer email:
    /// the one with the latest order date. On equal dates the payment seen
    /// last wins. The result is ordered by payer email.
    pub fn reduce(&self, payments: &[PaymentRecord]) -> Vec<PaymentRecord> {
        let mut latest: BTreeMap<&str, &PaymentRecord> = BTreeMap::new();
        let mut fees = 0usize;

        for payment in payments.iter().filter(|p| self.is_membership_fee(p)) {
            fees += 1;
            latest
                .entry(payment.payer_email.as_str())
                .and_modify(|current| {
                    if payment.order_date >= current.order_date {
                        *current = payment;
                    }
                })
                .or_insert(payment);
        }

        debug!(
            "Reduced {} payments ({} membership fees) to {} payers",
            payments.len(),
            fees,
            latest.len()
        );

        latest.into_values().cloned().collect()
    }
}
