pub mod canon;
pub mod hash;
pub mod redact;
pub mod run_id;
pub mod tail;
pub mod types;

pub use types::*;
