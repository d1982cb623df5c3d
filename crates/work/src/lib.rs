//! Board Management
//!
//! Boards, lists, cards, checklists, comments and time logging.

#![warn(missing_docs)]

pub mod error;
pub mod manager;

pub use error::{Result, WorkError};
pub use manager::{BoardManager, BoardOverview, CardUpdate, WorkConfig};
