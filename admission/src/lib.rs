//! # Admission
//!
//! Account, claim and content services behind the faculty admission platform.
//!
//! The crate holds everything the HTTP server and the client need to agree on:
//! credential storage, password hashing, signed access tokens with role
//! claims, single-use confirmation and reset codes, and the content services
//! (announcements and blob storage) that sit behind the same boundary.
//!
//! ## Core Modules
//!
//! - [`auth`]: Registration, email confirmation, password recovery, login and
//!   claim-based policies
//! - [`db`]: Connection pooling and repository traits with Postgres and
//!   in-memory implementations
//! - [`announcements`]: Announcement CRUD
//! - [`candidates`]: Exam candidates and their classroom repartition
//! - [`storage`]: Named blob storage
//! - [`email`]: Outgoing email collaborators
//!
//! ## Example
//!
//! ```
//! use admission::auth::{Claim, Policy};
//!
//! let claims = vec![Claim::user()];
//! assert!(Policy::User.is_satisfied_by(&claims));
//! assert!(!Policy::Admin.is_satisfied_by(&claims));
//! ```

pub mod announcements;
pub mod auth;
pub mod candidates;
pub mod db;
pub mod email;
pub mod storage;
pub mod validation;

pub use validation::ValidationErrors;
