// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host event boundary for the tiller model router.
//!
//! Translates host runtime events (turn start, tool calls, session end) into
//! [`SessionRouter`](tiller_router::SessionRouter) operations and renders the
//! resulting directives as text for the agent. Also provides the shell-backed
//! [`ShellWorkTracker`].

pub mod boundary;
pub mod events;
pub mod render;
pub mod signals;
pub mod tracker;

pub use boundary::RouterHooks;
pub use events::{HookEvent, HookRequest, HookResponse};
pub use render::DirectiveRenderer;
pub use signals::SignalDetector;
pub use tracker::ShellWorkTracker;
