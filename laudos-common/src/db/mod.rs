//! Database schema, migrations and models

pub mod init;
pub mod migrations;
pub mod models;
pub mod transaction;

pub use init::*;
pub use migrations::*;
pub use models::*;
pub use transaction::begin_write;
