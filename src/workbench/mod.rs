//! The workbench: the process-wide owner of repositories and the blob-level
//! cache that sits in front of the persistent stores. Split into a
//! client-side [`Workbench`] (caller-initiated pull/push/checkout) and a
//! server-side [`ServerWorkbench`] (responds only to `op_*` calls), mirroring
//! the teacher's client/server workbench split where the server overrides
//! the caller-facing operations to refuse them.

pub mod client;
pub mod server;

pub use client::Workbench;
pub use server::{ReverseFetch, ServerWorkbench};
