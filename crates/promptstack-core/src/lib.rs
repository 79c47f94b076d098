//! `promptstack-core` provides the primitives behind `promptstack`'s
//! interactive terminal widgets: key events, composable keymaps, the keyboard
//! dispatcher, the focus stack, and ANSI-aware text utilities.
//!
//! ## Design goals
//!
//! - Event-loop agnostic: you feed [`input::KeyEvent`]s in and push rendered
//!   strings out through the [`render::Renderer`] boundary.
//! - No async runtime: everything runs single-threaded on the main thread;
//!   nested prompts are nested drive loops under [`Dispatcher::focus`].
//! - No global mutable state: the dispatcher is a plain owned value.
//!
//! ## Dispatch model
//!
//! Each widget ("owner") registers one flattened [`keymap::KeyMap`] with the
//! [`dispatch::Dispatcher`]. A keypress is normalized, then resolved across
//! every owner's map: direct bindings (explicit key lists) take precedence
//! over catch-all bindings, and the surviving handlers run in registration
//! order. The focus stack ([`Dispatcher::wrap`] / [`Dispatcher::focus`])
//! swaps the whole active set in and out around nested operations, so an
//! inner prompt can never receive keys meant for the widget that spawned it.
//!
//! Most users should depend on the facade crate `promptstack`, which adds the
//! widgets, help rendering, and the prompt session on top of these pieces.
//!
//! [`Dispatcher::focus`]: dispatch::Dispatcher::focus
//! [`Dispatcher::wrap`]: dispatch::Dispatcher::wrap

pub mod dispatch;
pub mod focus;
pub mod fuzzy;
pub mod input;
pub mod keymap;
pub mod paging;
pub mod render;
pub mod text;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;
