//! # DrawPro Server
//!
//! The backend of a browser drawing app. The client does all the drawing; the
//! server keeps projects on disk, turns canvas snapshots into image files, and
//! runs the few pixel operations the client delegates to it.
//!
//! # Shape of the System
//!
//! Everything the client sends or receives is JSON. Images travel as data URLs
//! (`data:image/png;base64,...`), so one request carries a whole bitmap:
//!
//! ```text
//! client ──JSON──▶ server ──▶ store     projects/<id>.json
//!                         ├─▶ export    exports/export_<ts>.<ext>
//!                         └─▶ imaging   filter / resize → data URL back
//! ```
//!
//! There is no database and no in-memory cache. The directories are the state;
//! a restart loses nothing and a file copied into `projects/` by hand is a
//! project like any other.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | axum router, request/response shapes, error envelope |
//! | [`store`] | Save, load, list and delete JSON project documents |
//! | [`export`] | Encode a bitmap and write it under a fresh export id |
//! | [`imaging`] | Data-URL codec, filters, resize, encoder parameters |
//! | [`naming`] | Timestamp ids and collision-free file creation |
//! | [`config`] | Layered `drawpro.toml` loading and validation |
//! | [`error`] | Failure taxonomy shared by every module, mapped to HTTP status |
//!
//! # Design Decisions
//!
//! ## Ids From the Clock, Never Reused
//!
//! Project and export ids are `<prefix>_<YYYYMMDD_HHMMSS>`: readable, sortable
//! and free of any counter that would need persisting. Two writes in one
//! second get `_2`, `_3` suffixes instead of overwriting each other. See
//! [`naming::write_unique`].
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, filters, resampling and encoding all use the `image` crate, with
//! rayon for per-pixel passes. No system libraries are needed, so the binary
//! runs anywhere it compiles.
//!
//! ## Blocking Work Off the Async Runtime
//!
//! Pixel work and filesystem calls run inside `spawn_blocking`. A large blur
//! never stalls the health check.

pub mod config;
pub mod error;
pub mod export;
pub mod imaging;
pub mod naming;
pub mod server;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
