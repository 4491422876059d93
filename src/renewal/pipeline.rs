use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    baserow::{MemberRecord, MemberStore},
    brevo::EmailSender,
    config::Config,
    error::Result,
    helloasso::{PaymentRecord, PaymentSource},
    renewal::{
        engine::{EngineSettings, RenewalEngine, RunSummary},
        reconciler::{MemberIndex, Reconciler},
        reducer::PaymentReducer,
        stats::RenewalStats,
        templates::ReminderTemplate,
    },
};

/// Everything a run produced
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub stats: RenewalStats,
}

/// Fetch payments and members. Errors here abort the run.
async fn fetch_inputs(
    source: &dyn PaymentSource,
    store: &dyn MemberStore,
    config: &Config,
) -> Result<(Vec<PaymentRecord>, Vec<MemberRecord>)> {
    let payments = source.fetch_payments().await?;
    info!("Fetched {} payments", payments.len());

    let reduced = PaymentReducer::from_config(&config.membership).reduce(&payments);
    info!("{} distinct payers with a membership fee", reduced.len());

    let members = store.fetch_members().await?;
    info!("Fetched {} members", members.len());

    Ok((reduced, members))
}

/// Full batch: fetch, reduce, reconcile, act, report.
pub async fn run_renewal(
    source: &dyn PaymentSource,
    store: &dyn MemberStore,
    sender: &dyn EmailSender,
    config: &Config,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    let (payments, members) = fetch_inputs(source, store, config).await?;
    let index = MemberIndex::build(&members);

    let reconciliation =
        Reconciler::new(config.membership.validity_months).reconcile(&payments, &index, now);

    let template = ReminderTemplate::from_config(&config.brevo.sender_name, &config.reminder);
    let engine = RenewalEngine::new(
        store,
        sender,
        template,
        EngineSettings::from_config(config, dry_run),
    );
    let summary = engine.process(&reconciliation, now).await;

    let stats = RenewalStats::compute(&members, &payments, &index, &config.membership);
    stats.log();

    Ok(RunReport { summary, stats })
}

/// Read-only variant: same inputs, no reminders and no writes.
pub async fn collect_stats(
    source: &dyn PaymentSource,
    store: &dyn MemberStore,
    config: &Config,
) -> Result<RenewalStats> {
    let (payments, members) = fetch_inputs(source, store, config).await?;
    let index = MemberIndex::build(&members);

    let stats = RenewalStats::compute(&members, &payments, &index, &config.membership);
    stats.log();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        baserow::client::MockMemberStore, brevo::client::MockEmailSender, error::RenewalError,
        helloasso::client::MockPaymentSource,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn config() -> Config {
        let raw = r#"
[helloasso]
client_id = "id"
client_secret = "secret"
org_slug = "boavizta"
from_date = "2020-01-01"

[baserow]
api_token = "token"
member_table_id = "1"

[brevo]
api_key = "key"
"#;
        Config::defaults(config::Config::builder())
            .unwrap()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    fn payment(email: &str, slug: &str, days_ago: i64) -> PaymentRecord {
        PaymentRecord {
            order_form_slug: slug.to_string(),
            order_date: (now() - Duration::days(days_ago)).fixed_offset(),
            payer_email: email.to_string(),
            payer_first_name: "X".to_string(),
            payer_last_name: "Y".to_string(),
        }
    }

    fn member(id: u64, email: &str, active: bool) -> MemberRecord {
        MemberRecord {
            id,
            email: email.to_string(),
            first_name: "marie".to_string(),
            surname: "Curie".to_string(),
            active_membership: active,
            membership_type: 2521,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let mut source = MockPaymentSource::new();
        source.expect_fetch_payments().times(1).returning(|| {
            Ok(vec![
                payment("lapsed@x.org", "annual-membership-fee", 400),
                payment("lapsed@x.org", "cotisation-annuelle", 500),
                payment("fresh@x.org", "cotisation-annuelle", 10),
                payment("fresh@x.org", "donation", 1),
                payment("ghost@x.org", "cotisation-annuelle", 10),
            ])
        });

        let mut store = MockMemberStore::new();
        store.expect_fetch_members().times(1).returning(|| {
            Ok(vec![
                member(1, "lapsed@x.org", true),
                member(2, "fresh@x.org", false),
                member(3, "quiet@x.org", false),
            ])
        });
        store
            .expect_update_member()
            .withf(|m| m.id == 1 && !m.active_membership && m.reminder_count == 1)
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_update_member()
            .withf(|m| m.id == 2 && m.active_membership && m.reminder_count == 0)
            .times(1)
            .returning(|_| Ok(()));

        let mut sender = MockEmailSender::new();
        sender
            .expect_send()
            .withf(|m| m.to_email == "lapsed@x.org" && m.to_name == "Marie Curie")
            .times(1)
            .returning(|_| Ok(()));

        let report = run_renewal(&source, &store, &sender, &config(), false, now())
            .await
            .unwrap();

        assert_eq!(report.summary.reminders_sent, 1);
        assert_eq!(report.summary.status_updates, 1);
        assert_eq!(report.stats.members_without_payment, 1);
        assert_eq!(report.stats.payments_without_member, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let mut source = MockPaymentSource::new();
        source.expect_fetch_payments().returning(|| {
            Err(RenewalError::Api {
                service: "HelloAsso",
                status: 401,
                body: "unauthorized".to_string(),
            })
        });
        let mut store = MockMemberStore::new();
        store.expect_fetch_members().never();
        store.expect_update_member().never();
        let sender = MockEmailSender::new();

        let result = run_renewal(&source, &store, &sender, &config(), false, now()).await;
        assert!(matches!(result, Err(RenewalError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_collect_stats_is_read_only() {
        let mut source = MockPaymentSource::new();
        source
            .expect_fetch_payments()
            .returning(|| Ok(vec![payment("a@x.org", "cotisation-annuelle", 3)]));
        let mut store = MockMemberStore::new();
        store
            .expect_fetch_members()
            .returning(|| Ok(vec![member(1, "a@x.org", true), member(2, "b@x.org", true)]));
        store.expect_update_member().never();

        let stats = collect_stats(&source, &store, &config()).await.unwrap();
        assert_eq!(stats.members_without_payment, 1);
        assert_eq!(stats.payments_without_member, 0);
    }
}
