//! Logical field access over IPTC, XMP and EXIF.
//!
//! - [`registry`]: the static table of logical fields and their native tags
//! - [`reader`]: stored-metadata lookup and read precedence (IPTC, XMP, EXIF)
//! - [`writer`]: compilation of pending edits into exiv2 command scripts
//!
//! [`ImageMetadata`](crate::ImageMetadata) ties these together per image.

mod overlay;
pub mod reader;
pub mod registry;
mod value;
pub mod writer;

pub use overlay::Overlay;
pub use reader::{Exiv2Source, InMemorySource, MetadataSource, read_field};
pub use registry::{Encoding, FIELDS, Field, Mapping, ValueType, lookup, supported_encodings};
pub use value::MetaValue;
pub use writer::{Command, EncodingGroup, compile, render_script};
