use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::writer::{resolve_charset, transcode};
use crate::metadata::{
    Command, EncodingGroup, Exiv2Source, MetaValue, MetadataSource, Overlay, compile, lookup,
    read_field, registry, render_script,
};
use crate::tool::{self, CommandRunner, ProcessRunner};

/// The metadata of one image file: stored values plus pending edits.
///
/// Reads see pending edits first, then the stored IPTC, XMP and EXIF values
/// in that order. Edits reach the file only through [`save`](Self::save).
///
/// ```rust,no_run
/// use image_metadata::ImageMetadata;
///
/// # fn main() -> image_metadata::Result<()> {
/// let mut image = ImageMetadata::open("photo.jpg")?;
/// println!("Caption: {:?}", image.get("caption")?);
///
/// image.set("city", "Utrecht")?;
/// image.set("keywords", vec!["canal", "bikes"])?;
/// image.save_strict()?;
/// # Ok(())
/// # }
/// ```
pub struct ImageMetadata {
    path: PathBuf,
    config: Config,
    source: Box<dyn MetadataSource>,
    runner: Box<dyn CommandRunner>,
    overlay: Overlay,
}

impl ImageMetadata {
    /// Open `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Open `path`, reading its stored metadata with the configured exiv2.
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        let source = Exiv2Source::open(&config.exiv2, path)?;
        Ok(Self::with_source(path, source, config))
    }

    /// Build a session over already decoded metadata.
    pub fn with_source(
        path: impl AsRef<Path>,
        source: impl MetadataSource + 'static,
        config: Config,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            source: Box::new(source),
            runner: Box::new(ProcessRunner),
            overlay: Overlay::new(),
        }
    }

    /// Replace the runner used to invoke exiv2 on save.
    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Edits not yet saved, in first-write order.
    pub fn pending(&self) -> &Overlay {
        &self.overlay
    }

    /// Current value of a logical field; a pending edit shadows the file.
    pub fn get(&self, key: &str) -> Result<Option<MetaValue>> {
        let field = lookup(key)?;

        if let Some(value) = self.overlay.get(key) {
            return Ok(Some(value.clone()));
        }

        Ok(read_field(self.source.as_ref(), field))
    }

    /// Record a pending edit, replacing any earlier edit of the same field.
    pub fn set(&mut self, key: &str, value: impl Into<MetaValue>) -> Result<()> {
        let field = lookup(key)?;
        self.overlay.set(field, value.into());
        Ok(())
    }

    /// Apply [`set`](Self::set) for every pair in order.
    ///
    /// Stops at the first unknown key; edits before it stay applied.
    pub fn update<K, V>(&mut self, edits: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<MetaValue>,
    {
        for (key, value) in edits {
            self.set(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Every registered field with its current value.
    pub fn to_map(&self) -> BTreeMap<&'static str, Option<MetaValue>> {
        registry::FIELDS
            .iter()
            .map(|field| {
                let value = match self.overlay.get(field.key) {
                    Some(value) => Some(value.clone()),
                    None => read_field(self.source.as_ref(), field),
                };
                (field.key, value)
            })
            .collect()
    }

    /// The commands one save phase would run, using the configured charset.
    pub fn compiled(&self, group: EncodingGroup) -> Vec<Command> {
        let (_, charset_name) = resolve_charset(&self.config.iptc_charset);
        compile(&self.overlay, group, charset_name)
    }

    /// Write pending edits with the configured IPTC charset.
    ///
    /// Returns `Ok(false)` when an exiv2 run fails.
    pub fn save(&self) -> Result<bool> {
        self.save_with_charset(&self.config.iptc_charset)
    }

    /// Write pending edits, transcoding IPTC text to `charset`.
    ///
    /// Runs exiv2 twice: IPTC and EXIF first, then XMP. A failed first run
    /// skips the second; a failed second run leaves the first run's changes
    /// in place.
    pub fn save_with_charset(&self, charset: &str) -> Result<bool> {
        if !self.runner.is_available(&self.config.exiv2) {
            return Err(Error::Save("exiv2 is missing".to_string()));
        }

        let (charset, charset_name) = resolve_charset(charset);

        let iptc_exif = render_script(&compile(&self.overlay, EncodingGroup::IptcExif, charset_name));
        log::debug!("IPTC/EXIF script for {}:\n{iptc_exif}", self.path.display());
        let script = transcode(&iptc_exif, charset);
        if !tool::run_exiv2_script(self.runner.as_ref(), &self.config.exiv2, &script, &self.path)? {
            log::warn!("exiv2 failed writing IPTC/EXIF to {}", self.path.display());
            return Ok(false);
        }

        let xmp = render_script(&compile(&self.overlay, EncodingGroup::Xmp, charset_name));
        log::debug!("XMP script for {}:\n{xmp}", self.path.display());
        if !tool::run_exiv2_script(self.runner.as_ref(), &self.config.exiv2, xmp.as_bytes(), &self.path)? {
            log::warn!("exiv2 failed writing XMP to {}", self.path.display());
            return Ok(false);
        }

        log::info!(
            "Saved {} field(s) to {}",
            self.overlay.len(),
            self.path.display()
        );
        Ok(true)
    }

    /// Like [`save`](Self::save), but a failed exiv2 run is an error.
    pub fn save_strict(&self) -> Result<()> {
        self.save_strict_with_charset(&self.config.iptc_charset)
    }

    pub fn save_strict_with_charset(&self, charset: &str) -> Result<()> {
        if self.save_with_charset(charset)? {
            Ok(())
        } else {
            Err(Error::Save("Unable to save metadata".to_string()))
        }
    }

    /// Remove all XMP, comment, IPTC and EXIF data from `path` with jpegoptim.
    pub fn strip(path: impl AsRef<Path>) -> Result<bool> {
        Self::strip_with(path, &Config::default(), &ProcessRunner)
    }

    pub fn strip_with(
        path: impl AsRef<Path>,
        config: &Config,
        runner: &dyn CommandRunner,
    ) -> Result<bool> {
        tool::strip_metadata(runner, &config.jpegoptim, path.as_ref())
    }
}

impl std::fmt::Debug for ImageMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageMetadata")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("overlay", &self.overlay)
            .finish_non_exhaustive()
    }
}
