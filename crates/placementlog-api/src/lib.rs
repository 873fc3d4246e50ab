pub mod auth;
pub mod error;
pub mod middleware;
pub mod password;
pub mod placements;
pub mod posts;
pub mod response;
pub mod router;
pub mod state;
pub mod token;

pub use error::ApiError;
pub use router::router;
pub use state::{AppState, AppStateInner};
pub use token::{TokenError, TokenService};
