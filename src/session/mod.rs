//! Portal session state and the disclaimer handshake that creates it.

mod bootstrap;
mod error;
mod state;

pub use bootstrap::{BootstrapStep, DEFAULT_STEP_DELAY, SessionBootstrapper};
pub use error::BootstrapError;
pub use state::SessionState;
