// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod session;
mod events;
mod controller;
pub mod highlight;
pub mod view;

pub use session::{History, Message, QueryState, Sender, Session};
pub use events::{SessionEvent, Submission};
pub use controller::QueryController;
pub use highlight::{highlight, highlight_with, HighlightMarker};
pub use view::{render_live, render_transcript, RenderedMessage};
