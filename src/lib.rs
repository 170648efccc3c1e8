//! Workspace facade crate.
//!
//! Re-exports the member crates so host applications can depend on
//! `openplayer-workspace` alone and pick the desktop bridge through the
//! `desktop-shims` feature instead of wiring each crate individually.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;
