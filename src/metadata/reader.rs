use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::registry::{Encoding, Field};
use super::value::MetaValue;
use crate::error::{Error, Result};

/// Per-encoding lookup of stored metadata, keyed by native tag key.
pub trait MetadataSource {
    /// The stored value of `native_key` in `encoding`, if any.
    fn get(&self, encoding: Encoding, native_key: &str) -> Option<MetaValue>;
}

/// Metadata held in memory, one map per encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemorySource {
    iptc: HashMap<String, MetaValue>,
    xmp: HashMap<String, MetaValue>,
    exif: HashMap<String, MetaValue>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, encoding: Encoding) -> &HashMap<String, MetaValue> {
        match encoding {
            Encoding::Iptc => &self.iptc,
            Encoding::Xmp => &self.xmp,
            Encoding::Exif => &self.exif,
        }
    }

    fn map_mut(&mut self, encoding: Encoding) -> &mut HashMap<String, MetaValue> {
        match encoding {
            Encoding::Iptc => &mut self.iptc,
            Encoding::Xmp => &mut self.xmp,
            Encoding::Exif => &mut self.exif,
        }
    }

    /// Store `value` under `native_key`, replacing any previous value.
    pub fn insert(&mut self, encoding: Encoding, native_key: &str, value: impl Into<MetaValue>) {
        self.map_mut(encoding)
            .insert(native_key.to_string(), value.into());
    }

    /// Append one occurrence of `native_key`; repeated keys become a list.
    pub fn push(&mut self, encoding: Encoding, native_key: &str, value: String) {
        let map = self.map_mut(encoding);
        match map.remove(native_key) {
            None => {
                map.insert(native_key.to_string(), MetaValue::Text(value));
            }
            Some(MetaValue::Text(first)) => {
                map.insert(native_key.to_string(), MetaValue::List(vec![first, value]));
            }
            Some(MetaValue::List(mut items)) => {
                items.push(value);
                map.insert(native_key.to_string(), MetaValue::List(items));
            }
        }
    }

    /// Number of stored native keys across all encodings.
    pub fn len(&self) -> usize {
        self.iptc.len() + self.xmp.len() + self.exif.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataSource for InMemorySource {
    fn get(&self, encoding: Encoding, native_key: &str) -> Option<MetaValue> {
        self.map(encoding).get(native_key).cloned()
    }
}

/// Metadata of an image file as printed by exiv2.
///
/// The file is read once on open; later changes to the file are not seen.
#[derive(Debug, Clone)]
pub struct Exiv2Source {
    path: PathBuf,
    values: InMemorySource,
}

impl Exiv2Source {
    /// Read all IPTC, XMP and EXIF tags of `path` with `exiv2 -P EIXkv`.
    pub fn open(exiv2: &Path, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Read {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }

        let output = Command::new(exiv2)
            .args(["-q", "-P", "EIXkv"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Read {
                path: path.to_path_buf(),
                message: format!("failed to run {}: {e}", exiv2.display()),
            })?;

        // exiv2 exits non-zero for images without metadata, which is not an error here
        if !output.status.success() {
            log::debug!(
                "exiv2 exited with {} for {}",
                output.status,
                path.display()
            );
        }

        let values = parse_exiv2_print(&String::from_utf8_lossy(&output.stdout));
        log::debug!("Read {} tags from {}", values.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataSource for Exiv2Source {
    fn get(&self, encoding: Encoding, native_key: &str) -> Option<MetaValue> {
        self.values.get(encoding, native_key)
    }
}

const DEFAULT_LANG_PREFIX: &str = "lang=\"x-default\" ";

/// Parse `exiv2 -P kv` output: one `<key> <value>` pair per line.
///
/// Lines whose first token is not an `Iptc.`, `Xmp.` or `Exif.` key are ignored.
pub fn parse_exiv2_print(output: &str) -> InMemorySource {
    let mut source = InMemorySource::new();

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, rest)) => (key, rest.trim_start()),
            None => (line, ""),
        };

        let Some(encoding) = Encoding::from_native_key(key) else {
            continue;
        };

        let value = match encoding {
            Encoding::Xmp => value.strip_prefix(DEFAULT_LANG_PREFIX).unwrap_or(value),
            _ => value,
        };

        source.push(encoding, key, value.to_string());
    }

    source
}

/// Resolve a field from stored metadata, probing encodings in precedence order.
///
/// Returns the value of the first encoding the field is registered for that
/// holds a value, or `None` when no encoding does.
pub fn read_field(source: &dyn MetadataSource, field: &Field) -> Option<MetaValue> {
    Encoding::PRECEDENCE
        .into_iter()
        .filter_map(|enc| field.mapping(enc).map(|mapping| (enc, mapping)))
        .find_map(|(enc, mapping)| {
            let value = source.get(enc, mapping.native_key);
            if value.is_some() {
                log::debug!("{} resolved from {}", field.key, mapping.native_key);
            }
            value
        })
}
