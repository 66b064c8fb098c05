//! # edgefx-core
//!
//! Core types shared by every edgefx crate.
//!
//! - [`HostImage`] - 8-bit single-channel image buffer in host memory, with
//!   an explicit row pitch
//! - [`Size`], [`Rect`] - image dimensions and regions of interest
//! - [`Error`] - buffer and region errors
//!
//! ## Crate Structure
//!
//! ```text
//! edgefx-core (this crate)
//!    ^
//!    |
//!    +-- edgefx-io (image files <-> HostImage)
//!    +-- edgefx-compute (HostImage <-> device buffers, filters)
//!    +-- edgefx-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;
pub mod rect;

pub use error::{Error, Result};
pub use image::HostImage;
pub use rect::{Rect, Size};
