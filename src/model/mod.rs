pub mod event;
pub mod intent;
pub mod journal;
pub mod ledger;
pub mod program;
pub mod queue;
pub mod user;

pub use event::{ActivationKind, ActivationRequest, correlation_id};
pub use intent::Intent;
pub use journal::EventJournal;
pub use ledger::{EntryKind, FundPool, LedgerEntry, ReasonCode};
pub use program::{Currency, MOTHER, Phase, Program, UserId};
