//! Google Sheets integration - the attendance datastore
//!
//! This crate provides the spreadsheet side of rollcall:
//! - **Service-account auth** (`auth`) - RS256 JWT assertion exchanged for a
//!   bearer token, cached until shortly before expiry
//! - **Sheets v4 REST client** (`client`) - load metadata, list rows, append
//!   a row, nothing more
//! - **Attendance store** (`store`) - the `AttendanceStore` impl the sign-in
//!   handler talks to
//!
//! The sheet is the source of truth: every sign-in reloads metadata and all
//! rows before the duplicate scan. People edit the spreadsheet by hand, so
//! nothing here is cached.

pub mod auth;
pub mod client;
pub mod store;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use client::{GoogleSheetsClient, SheetHandle, SheetsApi, SheetsError};
pub use store::GoogleSheetsStore;
