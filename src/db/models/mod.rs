#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` work everywhere.

pub mod dm;
pub mod event;
pub mod playlist;
pub mod settings;
pub mod track;
pub mod user;

pub use self::dm::*;
pub use self::event::*;
pub use self::playlist::*;
pub use self::settings::*;
pub use self::track::*;
pub use self::user::*;
