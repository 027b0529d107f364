use std::fmt;

use encoding_rs::{EncoderResult, Encoding as Charset, UTF_8};

use super::overlay::Overlay;
use super::registry::{Encoding, Mapping};
use super::value::MetaValue;

const CHARSET_KEY: &str = "Iptc.Envelope.CharacterSet";

/// One line of an exiv2 command script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `del <key>`: remove every occurrence of the tag.
    Del { key: &'static str },
    /// `set <key> <type> <value>`: set (or append to an XMP array).
    Set {
        key: &'static str,
        type_name: &'static str,
        value: String,
    },
    /// `add <key> <type> <value>`: add another occurrence of a repeatable dataset.
    Add {
        key: &'static str,
        type_name: &'static str,
        value: String,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Del { key } => write!(f, "del {key}"),
            Self::Set { key, type_name, value } => write!(f, "set {key} {type_name} {value}"),
            Self::Add { key, type_name, value } => write!(f, "add {key} {type_name} {value}"),
        }
    }
}

/// The commands written by one exiv2 invocation during save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingGroup {
    /// IPTC datasets (plus the charset declaration) and EXIF tags.
    IptcExif,
    /// XMP properties.
    Xmp,
}

impl EncodingGroup {
    pub fn encodings(&self) -> &'static [Encoding] {
        match self {
            Self::IptcExif => &[Encoding::Iptc, Encoding::Exif],
            Self::Xmp => &[Encoding::Xmp],
        }
    }
}

/// A value as it can appear on a single script line.
///
/// Script commands are newline separated, so line breaks inside a value
/// (`\r\n`, `\r`, `\n`) become single spaces.
fn script_value(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Commands replacing one field's tag with `value`.
///
/// The delete always comes first. List elements are added one by one,
/// empty ones skipped; an empty value leaves only the delete.
fn field_commands(encoding: Encoding, mapping: &Mapping, value: &MetaValue) -> Vec<Command> {
    let key = mapping.native_key;
    let type_name = mapping.value_type.type_name(encoding);
    let mut commands = vec![Command::Del { key }];

    match value {
        MetaValue::List(items) => {
            for item in items.iter().filter(|item| !item.is_empty()) {
                let value = script_value(item);
                commands.push(match encoding {
                    // IPTC datasets repeat; XMP arrays and EXIF tags append on set
                    Encoding::Iptc => Command::Add { key, type_name, value },
                    Encoding::Xmp | Encoding::Exif => Command::Set { key, type_name, value },
                });
            }
        }
        MetaValue::Text(text) => {
            if !text.is_empty() {
                commands.push(Command::Set {
                    key,
                    type_name,
                    value: script_value(text),
                });
            }
        }
    }

    commands
}

/// Commands for every pending edit of fields registered in `encoding`, in overlay order.
pub fn compile_encoding(overlay: &Overlay, encoding: Encoding) -> Vec<Command> {
    overlay
        .iter()
        .filter_map(|(field, value)| {
            field
                .mapping(encoding)
                .map(|mapping| field_commands(encoding, mapping, value))
        })
        .flatten()
        .collect()
}

/// Compile the pending edits for one save phase.
///
/// A non-empty [`EncodingGroup::IptcExif`] phase ends with a declaration of
/// `charset_name`, the charset the script is transcoded to.
pub fn compile(overlay: &Overlay, group: EncodingGroup, charset_name: &str) -> Vec<Command> {
    let mut commands: Vec<Command> = group
        .encodings()
        .iter()
        .flat_map(|&encoding| compile_encoding(overlay, encoding))
        .collect();

    if group == EncodingGroup::IptcExif && !commands.is_empty() {
        commands.push(Command::Set {
            key: CHARSET_KEY,
            type_name: "String",
            value: charset_name.to_string(),
        });
    }

    commands
}

/// Join commands into script text, one per line.
pub fn render_script(commands: &[Command]) -> String {
    commands
        .iter()
        .map(Command::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve a charset label (`"UTF-8"`, `"ISO-8859-1"`, ...) to the charset
/// the script is encoded in and the name declared for it.
///
/// A known label is declared as given. Unknown labels, and UTF-16 (which
/// cannot encode a script), fall back to UTF-8.
pub fn resolve_charset(label: &str) -> (&'static Charset, &str) {
    let label = label.trim();
    match Charset::for_label(label.as_bytes()) {
        Some(charset) if charset.output_encoding() == charset => (charset, label),
        Some(charset) => {
            log::warn!("Charset {label:?} cannot encode scripts, using UTF-8");
            (charset.output_encoding(), UTF_8.name())
        }
        None => {
            log::warn!("Unknown charset {label:?}, using UTF-8");
            (UTF_8, UTF_8.name())
        }
    }
}

/// Encode `text` in `charset`. Characters the charset cannot represent are dropped.
pub fn transcode(text: &str, charset: &'static Charset) -> Vec<u8> {
    if charset == UTF_8 {
        return text.as_bytes().to_vec();
    }

    let mut encoder = charset.new_encoder();
    let mut out = Vec::new();
    let mut src = text;

    loop {
        if let Some(needed) = encoder.max_buffer_length_from_utf8_without_replacement(src.len()) {
            out.reserve(needed);
        }
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(src, &mut out, true);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::Unmappable(c) => {
                log::debug!("Dropping {c:?}, not representable in {}", charset.name());
            }
            EncoderResult::OutputFull => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::registry::lookup;

    fn overlay(edits: &[(&str, MetaValue)]) -> Overlay {
        let mut overlay = Overlay::new();
        for (key, value) in edits {
            overlay.set(lookup(key).unwrap(), value.clone());
        }
        overlay
    }

    fn lines(commands: &[Command]) -> Vec<String> {
        commands.iter().map(Command::to_string).collect()
    }

    #[test]
    fn scalar_field_is_deleted_then_set() {
        let overlay = overlay(&[("caption", "Caption".into())]);

        assert_eq!(
            lines(&compile(&overlay, EncodingGroup::IptcExif, "UTF-8")),
            vec![
                "del Iptc.Application2.Caption",
                "set Iptc.Application2.Caption String Caption",
                "set Iptc.Envelope.CharacterSet String UTF-8",
            ]
        );
        assert_eq!(
            lines(&compile(&overlay, EncodingGroup::Xmp, "UTF-8")),
            vec![
                "del Xmp.dc.description",
                "set Xmp.dc.description LangAlt Caption",
            ]
        );
    }

    #[test]
    fn list_field_explodes_per_element() {
        let overlay = overlay(&[("keywords", MetaValue::from(["a", "", "b"]))]);

        assert_eq!(
            lines(&compile_encoding(&overlay, Encoding::Iptc)),
            vec![
                "del Iptc.Application2.Keywords",
                "add Iptc.Application2.Keywords String a",
                "add Iptc.Application2.Keywords String b",
            ]
        );
        assert_eq!(
            lines(&compile_encoding(&overlay, Encoding::Xmp)),
            vec![
                "del Xmp.dc.subject",
                "set Xmp.dc.subject XmpBag a",
                "set Xmp.dc.subject XmpBag b",
            ]
        );
    }

    #[test]
    fn empty_values_only_delete() {
        let overlay = overlay(&[
            ("city", "".into()),
            ("keywords", MetaValue::List(Vec::new())),
            ("creator", MetaValue::from([""])),
        ]);

        assert_eq!(
            lines(&compile_encoding(&overlay, Encoding::Xmp)),
            vec![
                "del Xmp.photoshop.City",
                "del Xmp.dc.subject",
                "del Xmp.dc.creator",
            ]
        );
    }

    #[test]
    fn fields_follow_overlay_order() {
        let overlay = overlay(&[
            ("country", "NL".into()),
            ("city", "Utrecht".into()),
        ]);

        assert_eq!(
            lines(&compile_encoding(&overlay, Encoding::Iptc)),
            vec![
                "del Iptc.Application2.CountryName",
                "set Iptc.Application2.CountryName String NL",
                "del Iptc.Application2.City",
                "set Iptc.Application2.City String Utrecht",
            ]
        );
    }

    #[test]
    fn fields_outside_the_group_are_skipped() {
        let overlay = overlay(&[("reference", "R-1".into()), ("camera", "X100".into())]);

        assert!(compile(&overlay, EncodingGroup::Xmp, "UTF-8").is_empty());
        assert_eq!(
            lines(&compile(&overlay, EncodingGroup::IptcExif, "UTF-8")),
            vec![
                "del Iptc.Application2.ReferenceNumber",
                "set Iptc.Application2.ReferenceNumber String R-1",
                "del Exif.Image.Model",
                "set Exif.Image.Model Ascii X100",
                "set Iptc.Envelope.CharacterSet String UTF-8",
            ]
        );
    }

    #[test]
    fn exif_only_edits_still_declare_charset() {
        let overlay = overlay(&[("latitude", "51/1 30/1 0/1".into())]);

        assert_eq!(
            lines(&compile(&overlay, EncodingGroup::IptcExif, "UTF-8")),
            vec![
                "del Exif.GPSInfo.GPSLatitude",
                "set Exif.GPSInfo.GPSLatitude XmpText 51/1 30/1 0/1",
                "set Iptc.Envelope.CharacterSet String UTF-8",
            ]
        );
    }

    #[test]
    fn line_breaks_in_values_stay_on_one_line() {
        let overlay = overlay(&[
            ("caption", "line one\ndel Exif.Image.Make".into()),
            ("keywords", MetaValue::from(["a\r\nb", "c\rd"])),
        ]);

        let script = render_script(&compile(&overlay, EncodingGroup::IptcExif, "UTF-8"));
        assert_eq!(
            script.lines().collect::<Vec<_>>(),
            vec![
                "del Iptc.Application2.Caption",
                "set Iptc.Application2.Caption String line one del Exif.Image.Make",
                "del Iptc.Application2.Keywords",
                "add Iptc.Application2.Keywords String a b",
                "add Iptc.Application2.Keywords String c d",
                "set Iptc.Envelope.CharacterSet String UTF-8",
            ]
        );
        assert!(!script.lines().any(|line| line == "del Exif.Image.Make"));

        assert_eq!(
            lines(&compile(&overlay, EncodingGroup::Xmp, "UTF-8"))[1],
            "set Xmp.dc.description LangAlt line one del Exif.Image.Make"
        );
    }

    #[test]
    fn empty_overlay_compiles_to_nothing() {
        let overlay = Overlay::new();
        assert!(compile(&overlay, EncodingGroup::IptcExif, "UTF-8").is_empty());
        assert_eq!(render_script(&[]), "");
    }

    #[test]
    fn exif_lists_use_set() {
        let overlay = overlay(&[("manufacturer", MetaValue::from(["Fuji"]))]);
        assert_eq!(
            lines(&compile_encoding(&overlay, Encoding::Exif)),
            vec!["del Exif.Image.Make", "set Exif.Image.Make Ascii Fuji"]
        );
    }

    #[test]
    fn script_is_newline_joined() {
        let commands = vec![
            Command::Del { key: "Xmp.dc.title" },
            Command::Set {
                key: "Xmp.dc.title",
                type_name: "LangAlt",
                value: "Title".to_string(),
            },
        ];
        assert_eq!(
            render_script(&commands),
            "del Xmp.dc.title\nset Xmp.dc.title LangAlt Title"
        );
    }

    #[test]
    fn charset_labels() {
        assert_eq!(resolve_charset("UTF-8"), (UTF_8, "UTF-8"));
        assert_eq!(resolve_charset(" utf8 "), (UTF_8, "utf8"));
        assert_eq!(resolve_charset("no-such-charset"), (UTF_8, "UTF-8"));
        assert_eq!(resolve_charset("UTF-16LE"), (UTF_8, "UTF-8"));

        let (charset, name) = resolve_charset("ISO-8859-1");
        assert_eq!(charset.name(), "windows-1252");
        assert_eq!(name, "ISO-8859-1");
    }

    #[test]
    fn transcode_keeps_utf8_bytes() {
        assert_eq!(transcode("Zürich ✓", UTF_8), "Zürich ✓".as_bytes());
    }

    #[test]
    fn transcode_drops_unrepresentable_characters() {
        let (latin, _) = resolve_charset("ISO-8859-15");
        assert_eq!(transcode("Zürich ✓ €", latin), b"Z\xfcrich  \xa4".to_vec());
    }

    #[test]
    fn transcode_plain_ascii() {
        let (latin, _) = resolve_charset("ISO-8859-15");
        assert_eq!(transcode("del Iptc.Application2.City", latin), b"del Iptc.Application2.City");
    }
}
