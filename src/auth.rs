//! Client-credentials authentication: the upstream exchange and the single-slot token cache.

pub mod cache;
pub mod exchange;
pub mod secret;
pub mod token;

pub use cache::*;
pub use exchange::*;
pub use secret::*;
pub use token::*;
