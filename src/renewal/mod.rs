pub mod engine;
pub mod pipeline;
pub mod reconciler;
pub mod reducer;
pub mod stats;
pub mod templates;

pub use engine::{EngineSettings, ReminderOutcome, RenewalEngine, RunSummary};
pub use pipeline::{collect_stats, run_renewal, RunReport};
pub use reconciler::{Classification, MatchedPair, MemberIndex, Reconciler, Reconciliation};
pub use reducer::PaymentReducer;
pub use stats::RenewalStats;
pub use templates::{EmailContent, Locale, ReminderTemplate};
