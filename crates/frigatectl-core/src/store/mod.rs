// ── Reconciliation store ──
//
// Observed poll results, in-flight command intents, and the merged view
// derived from both.

mod data_store;
mod observed;
mod pending;

pub use data_store::DataStore;
pub use observed::{Freshness, ObservedSnapshot, ObservedState};
pub use pending::{IntentTicket, PendingIntent, PendingIntents};
