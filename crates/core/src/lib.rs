//! Invoicer Core - Shared types library.
//!
//! This crate provides common types used across all Invoicer components:
//! - `dashboard` - Server-rendered invoicing dashboard
//! - `cli` - Command-line tools for seeding and inspecting the remote database
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, emails, and invoice statuses
//! - [`validation`] - The invoice form schema and its field-level errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{FieldErrors, InvoiceInput, InvoiceSchema, ValidInvoice};
