use std::fmt;

use crate::error::{Error, Result};

use ValueType::{
    AsciiText, LanguageAlternative, OrderedSequence, PlainText, UnorderedBag,
};

/// One of the three metadata encodings an image can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Iptc,
    Xmp,
    Exif,
}

impl Encoding {
    /// Read precedence: the first encoding holding a value wins.
    pub const PRECEDENCE: [Encoding; 3] = [Encoding::Iptc, Encoding::Xmp, Encoding::Exif];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iptc => "iptc",
            Self::Xmp => "xmp",
            Self::Exif => "exif",
        }
    }

    /// Key prefix exiv2 uses for this encoding (`Iptc.`, `Xmp.`, `Exif.`).
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Iptc => "Iptc.",
            Self::Xmp => "Xmp.",
            Self::Exif => "Exif.",
        }
    }

    /// Determine the encoding from a native exiv2 key.
    pub fn from_native_key(key: &str) -> Option<Self> {
        Self::PRECEDENCE
            .into_iter()
            .find(|enc| key.starts_with(enc.key_prefix()))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a value is serialized for a given (field, encoding) pair.
///
/// Fixed by the registry, never inferred from the runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Plain text (`String` for IPTC datasets, `XmpText` elsewhere).
    PlainText,
    /// XMP language alternative (`LangAlt`).
    LanguageAlternative,
    /// XMP ordered array (`XmpSeq`).
    OrderedSequence,
    /// XMP unordered array (`XmpBag`).
    UnorderedBag,
    /// EXIF ASCII string (`Ascii`).
    AsciiText,
}

impl ValueType {
    /// The exiv2 type name written into command scripts.
    pub fn type_name(&self, encoding: Encoding) -> &'static str {
        match (self, encoding) {
            (Self::PlainText, Encoding::Iptc) => "String",
            (Self::PlainText, _) => "XmpText",
            (Self::LanguageAlternative, _) => "LangAlt",
            (Self::OrderedSequence, _) => "XmpSeq",
            (Self::UnorderedBag, _) => "XmpBag",
            (Self::AsciiText, _) => "Ascii",
        }
    }
}

/// Native tag key and value type of a field within one encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub native_key: &'static str,
    pub value_type: ValueType,
}

/// A logical field and the encodings it participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    iptc: Option<Mapping>,
    xmp: Option<Mapping>,
    exif: Option<Mapping>,
}

impl Field {
    const fn new(key: &'static str) -> Self {
        Self { key, iptc: None, xmp: None, exif: None }
    }

    const fn iptc(mut self, native_key: &'static str, value_type: ValueType) -> Self {
        self.iptc = Some(Mapping { native_key, value_type });
        self
    }

    const fn xmp(mut self, native_key: &'static str, value_type: ValueType) -> Self {
        self.xmp = Some(Mapping { native_key, value_type });
        self
    }

    const fn exif(mut self, native_key: &'static str, value_type: ValueType) -> Self {
        self.exif = Some(Mapping { native_key, value_type });
        self
    }

    /// The mapping for `encoding`, if this field participates in it.
    pub fn mapping(&self, encoding: Encoding) -> Option<&Mapping> {
        match encoding {
            Encoding::Iptc => self.iptc.as_ref(),
            Encoding::Xmp => self.xmp.as_ref(),
            Encoding::Exif => self.exif.as_ref(),
        }
    }

    /// Encodings this field participates in, in read-precedence order.
    pub fn encodings(&self) -> Vec<Encoding> {
        Encoding::PRECEDENCE
            .into_iter()
            .filter(|enc| self.mapping(*enc).is_some())
            .collect()
    }
}

/// Every logical field, in listing order.
pub static FIELDS: &[Field] = &[
    Field::new("caption")
        .iptc("Iptc.Application2.Caption", PlainText)
        .xmp("Xmp.dc.description", LanguageAlternative),
    Field::new("writer")
        .iptc("Iptc.Application2.Writer", PlainText)
        .xmp("Xmp.photoshop.CaptionWriter", PlainText),
    Field::new("headline")
        .iptc("Iptc.Application2.Headline", PlainText)
        .xmp("Xmp.photoshop.Headline", PlainText),
    Field::new("instructions")
        .iptc("Iptc.Application2.SpecialInstructions", PlainText)
        .xmp("Xmp.photoshop.Instructions", PlainText),
    Field::new("creator")
        .iptc("Iptc.Application2.Byline", PlainText)
        .xmp("Xmp.dc.creator", OrderedSequence),
    Field::new("creator_title")
        .iptc("Iptc.Application2.BylineTitle", PlainText)
        .xmp("Xmp.photoshop.AuthorsPosition", PlainText),
    Field::new("credit")
        .iptc("Iptc.Application2.Credit", PlainText)
        .xmp("Xmp.photoshop.Credit", PlainText),
    Field::new("source")
        .iptc("Iptc.Application2.Source", PlainText)
        .xmp("Xmp.photoshop.Source", PlainText),
    Field::new("title")
        .iptc("Iptc.Application2.ObjectName", PlainText)
        .xmp("Xmp.dc.title", LanguageAlternative),
    Field::new("city")
        .iptc("Iptc.Application2.City", PlainText)
        .xmp("Xmp.photoshop.City", PlainText),
    Field::new("province")
        .iptc("Iptc.Application2.ProvinceState", PlainText)
        .xmp("Xmp.photoshop.State", PlainText),
    Field::new("country")
        .iptc("Iptc.Application2.CountryName", PlainText)
        .xmp("Xmp.photoshop.Country", PlainText),
    Field::new("transmission")
        .iptc("Iptc.Application2.TransmissionReference", PlainText)
        .xmp("Xmp.photoshop.TransmissionReference", PlainText),
    Field::new("keywords")
        .iptc("Iptc.Application2.Keywords", PlainText)
        .xmp("Xmp.dc.subject", UnorderedBag),
    Field::new("copyright")
        .iptc("Iptc.Application2.Copyright", PlainText)
        .xmp("Xmp.dc.rights", LanguageAlternative),
    Field::new("reference").iptc("Iptc.Application2.ReferenceNumber", PlainText),
    Field::new("camera").exif("Exif.Image.Model", AsciiText),
    Field::new("manufacturer").exif("Exif.Image.Make", AsciiText),
    // GPS tags are written as XmpText, exiv2 converts them on write.
    Field::new("latitude").exif("Exif.GPSInfo.GPSLatitude", PlainText),
    Field::new("latitude_ref").exif("Exif.GPSInfo.GPSLatitudeRef", PlainText),
    Field::new("longitude").exif("Exif.GPSInfo.GPSLongitude", PlainText),
    Field::new("longitude_ref").exif("Exif.GPSInfo.GPSLongitudeRef", PlainText),
];

/// Look up a logical field by key.
pub fn lookup(key: &str) -> Result<&'static Field> {
    FIELDS
        .iter()
        .find(|field| field.key == key)
        .ok_or_else(|| Error::KeyNotFound(key.to_string()))
}

/// Encodings a logical key participates in, in read-precedence order.
pub fn supported_encodings(key: &str) -> Result<Vec<Encoding>> {
    lookup(key).map(Field::encodings)
}

/// All registered logical keys, in registry order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|field| field.key)
}
