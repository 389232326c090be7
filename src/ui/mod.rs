//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the loop that turns key presses into actions and runs
//!   network commands in the background.
//! - [`renderer`]: frame layout for the sidebar, transcript, status line and
//!   input box.
//! - [`markdown`] and [`markdown_wrap`]: bot reply rendering.
//!
//! This layer presents and captures interaction state, while [`crate::core`]
//! owns the conversation and sidebar logic.

pub mod chat_loop;
pub mod markdown;
pub mod markdown_wrap;
pub mod renderer;
