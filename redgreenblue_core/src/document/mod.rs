//! Document state and the store that owns it.

mod state;
mod store;

pub use state::DocumentState;
pub use store::DocumentStore;
