//! Service layer: operations spanning several queries or external calls

pub mod ai;
pub mod phrase_transfer;
pub mod report;
pub mod response_cache;
pub mod seeding;

pub use phrase_transfer::{transfer_phrases, TransferError, TransferOutcome, TransferRequest};
pub use report::ReportService;
pub use response_cache::{InMemoryCache, ResponseCache};
pub use seeding::seed_new_user;
