//! Client sessions: provider choice and credentials behind a random id.

mod store;
mod types;

pub use store::SessionStore;
pub use types::*;
