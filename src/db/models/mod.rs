//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` work.

pub mod maintenance_interval;
pub mod maintenance_log;
pub mod print_job;
pub mod printer;
pub mod user;

pub use self::maintenance_interval::*;
pub use self::maintenance_log::*;
pub use self::print_job::*;
pub use self::printer::*;
pub use self::user::*;
