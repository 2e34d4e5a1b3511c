//! Client-side session handling for the admission API.
//!
//! [`api_client::ApiClient`] speaks HTTP, [`session::SessionManager`] keeps
//! the logged-in state in a [`store::SessionStore`] and attaches the bearer
//! token to later calls.

pub mod api_client;
pub mod session;
pub mod store;
