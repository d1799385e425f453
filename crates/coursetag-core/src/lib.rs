//! Core types and trait definitions for course theme tagging.
//!
//! No HTTP or database dependencies. This crate holds
//! the domain model, the [`store::CourseTagStore`] abstraction and the
//! cross-period replication engine in [`replication`].

#![allow(async_fn_in_trait)]

pub mod audit;
pub mod catalog;
pub mod entry;
pub mod error;
pub mod period;
pub mod replication;
pub mod settings;
pub mod store;

pub use error::{Error, ErrorKind, Result, StoreError};
