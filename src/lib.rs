//! # image-metadata
//!
//! One key space over the IPTC, XMP and EXIF metadata of an image. A logical
//! field such as `caption` maps onto `Iptc.Application2.Caption` and
//! `Xmp.dc.description`; reads prefer IPTC, then XMP, then EXIF, and writes
//! go to every encoding the field lives in.
//!
//! Reading and writing the binary formats is left to
//! [exiv2](https://exiv2.org): stored tags are read with its print mode, and
//! edits are compiled into exiv2 command scripts (`del`/`set`/`add` lines)
//! that are run against the file on save.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image_metadata::ImageMetadata;
//!
//! fn main() -> image_metadata::Result<()> {
//!     let mut image = ImageMetadata::open("photo.jpg")?;
//!
//!     image.update([("caption", "Caption"), ("creator", "Creator")])?;
//!     image.set("keywords", vec!["harbour", "dusk"])?;
//!     image.set("headline", "")?; // clears the field on save
//!
//!     // IPTC+EXIF first, then XMP, each through its own exiv2 run
//!     image.save_strict()?;
//!
//!     for (key, value) in ImageMetadata::open("photo.jpg")?.to_map() {
//!         if let Some(value) = value {
//!             println!("{key}: {value}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`metadata`]: field registry, read precedence and command compilation
//! - [`tool`]: exiv2/jpegoptim invocation
//! - [`config`]: tool locations and the default IPTC charset
//! - [`files`]: image file collection for batch use

pub mod config;
mod error;
pub mod files;
mod image;
pub mod metadata;
pub mod tool;

pub use config::Config;
pub use error::{Error, Result};
pub use image::ImageMetadata;
pub use metadata::{Encoding, MetaValue, ValueType};
