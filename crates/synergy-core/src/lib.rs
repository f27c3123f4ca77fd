//! # Synergy Core
//!
//! Core types and traits for the Synergy resource dispatcher.
//!
//! This crate provides the foundational types used throughout Synergy:
//!
//! - [`Request`] / [`Response`] - the CRUD request model carried through the pipeline
//! - [`ValueStack`] - the non-empty push/peek stack behind names, payloads and bodies
//! - [`Payload`] - opaque request/response payloads (text, bytes, JSON, deferred)
//! - [`Schema`] - case-insensitive resource family token
//! - [`Controller`] - the pluggable unit that serves a resource family
//! - [`DispatchError`] - the error taxonomy shared by every stage

#![doc(html_root_url = "https://docs.rs/synergy-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod controller;
mod error;
pub mod fixtures;
mod payload;
pub mod request;
mod response;
mod schema;
mod stack;

pub use controller::{BoxFuture, Controller, ControllerFilter, SharedController};
pub use error::{DispatchError, DispatchResult, ErrorKind, ValidationSide};
pub use payload::{Payload, PayloadProvider};
pub use request::{items, Items, Method, Request, RequestId};
pub use response::{Response, StatusCode};
pub use schema::Schema;
pub use stack::ValueStack;
