pub mod extractor;
pub mod session;
pub mod state;
pub mod test_utils;

pub use session::SessionStore;
pub use state::AppState;
