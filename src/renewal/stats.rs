use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::{
    baserow::MemberRecord,
    config::MembershipConfig,
    helloasso::PaymentRecord,
    renewal::reconciler::MemberIndex,
    utils,
};

/// Set-difference counts between the member table and the payments
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalStats {
    pub members: usize,
    pub payers: usize,
    pub members_without_payment: usize,
    pub individual_without_payment: usize,
    pub organization_without_payment: usize,
    pub payments_without_member: usize,
}

impl RenewalStats {
    /// A member counts as paying when its primary address paid a membership fee.
    pub fn compute(
        members: &[MemberRecord],
        payments: &[PaymentRecord],
        index: &MemberIndex<'_>,
        config: &MembershipConfig,
    ) -> Self {
        let payers: HashSet<&str> = payments.iter().map(|p| p.payer_email.as_str()).collect();

        let without_payment: Vec<&MemberRecord> = members
            .iter()
            .filter(|member| !payers.contains(member.email.as_str()))
            .collect();

        let count_type = |type_id: i64| {
            without_payment
                .iter()
                .filter(|member| member.membership_type == type_id)
                .count()
        };

        Self {
            members: members.len(),
            payers: payers.len(),
            members_without_payment: without_payment.len(),
            individual_without_payment: count_type(config.individual_type_id),
            organization_without_payment: count_type(config.organization_type_id),
            payments_without_member: payments
                .iter()
                .filter(|p| !index.contains(&p.payer_email))
                .count(),
        }
    }

    pub fn log(&self) {
        info!("Members without payment entry: {}", self.members_without_payment);
        info!("Individual members without payment entry: {}", self.individual_without_payment);
        info!("Organization members without payment entry: {}", self.organization_without_payment);
        info!("Payment entries without member: {}", self.payments_without_member);
    }

    pub fn print_table(&self) {
        let widths = [44, 10];
        utils::print_table_border(56);
        utils::print_table_row(&["Metric", "Count"], &widths);
        utils::print_table_border(56);

        let rows = [
            ("Members", self.members),
            ("Distinct payers", self.payers),
            ("Members without payment", self.members_without_payment),
            ("  individual", self.individual_without_payment),
            ("  organization", self.organization_without_payment),
            ("Payments without member", self.payments_without_member),
        ];
        for (label, count) in rows {
            utils::print_table_row(&[label, &count.to_string()], &widths);
        }
        utils::print_table_border(56);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};

    fn config() -> MembershipConfig {
        MembershipConfig {
            french_form_slug: "cotisation-annuelle".to_string(),
            english_form_slug: "annual-membership-fee".to_string(),
            validity_months: 12,
            french_language_id: 2591,
            individual_type_id: 2521,
            organization_type_id: 2520,
        }
    }

    fn member(id: u64, email: &str, alt: &str, membership_type: i64) -> MemberRecord {
        MemberRecord {
            id,
            email: email.to_string(),
            alternative_email_1: alt.to_string(),
            membership_type,
            ..Default::default()
        }
    }

    fn payment(email: &str) -> PaymentRecord {
        PaymentRecord {
            order_form_slug: "cotisation-annuelle".to_string(),
            order_date: DateTime::<FixedOffset>::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            payer_email: email.to_string(),
            payer_first_name: String::new(),
            payer_last_name: String::new(),
        }
    }

    #[test]
    fn test_compute_counts() {
        let members = vec![
            member(1, "a@x.org", "", 2521),
            member(2, "b@x.org", "b@alt.org", 2520),
            member(3, "c@x.org", "", 2521),
            member(4, "d@x.org", "", 2520),
            member(5, "e@x.org", "", 0),
        ];
        let payments = vec![payment("a@x.org"), payment("b@alt.org"), payment("stranger@x.org")];
        let index = MemberIndex::build(&members);

        let stats = RenewalStats::compute(&members, &payments, &index, &config());
        assert_eq!(stats.members, 5);
        assert_eq!(stats.payers, 3);
        assert_eq!(stats.members_without_payment, 4);
        assert_eq!(stats.individual_without_payment, 1);
        assert_eq!(stats.organization_without_payment, 2);
        assert_eq!(stats.payments_without_member, 1);
    }

    #[test]
    fn test_payment_from_alternate_address_counts_as_missing() {
        let members = vec![member(1, "a@x.org", "a@alt.org", 2521)];
        let payments = vec![payment("a@alt.org")];
        let index = MemberIndex::build(&members);

        let stats = RenewalStats::compute(&members, &payments, &index, &config());
        assert_eq!(stats.members_without_payment, 1);
        assert_eq!(stats.individual_without_payment, 1);
        // the payment still reaches the member through the index
        assert_eq!(stats.payments_without_member, 0);
    }

    #[test]
    fn test_compute_empty() {
        let stats = RenewalStats::compute(&[], &[], &MemberIndex::build(&[]), &config());
        assert_eq!(stats, RenewalStats::default());
    }
}
