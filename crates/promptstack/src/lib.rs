//! `promptstack` provides composable interactive terminal prompts: a
//! stack-based focus manager, a keyboard-dispatch engine, and a family of
//! self-contained widgets sharing one render-and-dispatch contract.
//!
//! ## Design goals
//!
//! - Event-loop agnostic: a [`session::Session`] consumes key events from any
//!   [`input::KeySource`] and pushes rendered bodies plus a help footer to
//!   any [`render::Renderer`].
//! - No async runtime: everything is single-threaded; nested prompts (a
//!   field editor launched from the form builder, a confirmation inside a
//!   list) run as nested drive loops under exclusive focus.
//! - Widgets own their state: the dispatcher only resolves keypresses to
//!   action identifiers; handlers on the owning widget do the mutating.
//!
//! ## Widgets
//!
//! - [`menu::Menu`]: single- or dual-column selector with pagination, fuzzy
//!   search, and numeric quick-select.
//! - [`list_builder::ListBuilder`]: dual-pane pick-many builder over one
//!   entry universe.
//! - [`object_builder::ObjectBuilder`]: tabular form over a JSON working
//!   value with dirty tracking, validate/cancel hooks, and sanitize policies.
//! - [`editor`]: scalar editors for strings, numbers, passwords, and dates.
//! - [`confirm::Confirm`]: a minimal yes/no prompt.

pub mod confirm;
pub mod editor;
pub mod help;
mod layout;
pub mod list_builder;
pub mod menu;
pub mod object_builder;
pub mod session;
pub mod theme;
pub mod widget;

pub use promptstack_core::dispatch;
pub use promptstack_core::fuzzy;
pub use promptstack_core::input;
pub use promptstack_core::keymap;
pub use promptstack_core::paging;
pub use promptstack_core::render;
pub use promptstack_core::text;

#[cfg(feature = "crossterm-input")]
pub use promptstack_core::crossterm_input;
