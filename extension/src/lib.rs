//! ZeroPhish Extension - browser-side protection runtime
//!
//! The runtime that sits between a browser shell and the ZeroPhish
//! backend. A single background context owns navigation tracking, the
//! pending report queue and all backend traffic; one content context per
//! guarded page drives that page's shield, banner and warning overlay.
//!
//! ```text
//!  navigation events ──► BackgroundContext ──► ChainStore / LocalQueue
//!                           │         │
//!                  notices  │         │ REST (check-url, report, redirect)
//!                           ▼         ▼
//!  user actions ──► ContentContext   ZeroPhish backend
//!                           │
//!                           ▼
//!                    GuardView watch (shield, overlay, banner)
//! ```
//!
//! Everything crosses task boundaries over channels, so each half can be
//! exercised on its own with the other half scripted.

#![warn(missing_docs)]

pub mod api;
pub mod background;
pub mod config;
pub mod content;
pub mod protocol;
pub mod queue;

pub use api::{BackendApi, HttpBackend};
pub use background::BackgroundContext;
pub use config::ExtensionConfig;
pub use content::{ContentContext, GuardView, NoticeRouter, UserAction};
