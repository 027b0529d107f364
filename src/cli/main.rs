use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use image_metadata::files::collect_images;
use image_metadata::metadata::{EncodingGroup, FIELDS, render_script};
use image_metadata::tool::ProcessRunner;
use image_metadata::{Config, ImageMetadata, MetaValue};

#[derive(Parser, Debug)]
#[command(
    name = "image-metadata",
    version,
    about = "Read and write IPTC, XMP and EXIF fields through one set of keys"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Action>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print every field that has a value
    Show {
        /// Image files or directories
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set fields and save them to the image
    Set {
        /// Image file to modify
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Scalar edits; an empty value clears the field
        #[arg(value_name = "KEY=VALUE")]
        edits: Vec<String>,

        /// List edits, comma separated (e.g. --list keywords=harbour,dusk)
        #[arg(long = "list", value_name = "KEY=A,B")]
        lists: Vec<String>,

        /// Charset for IPTC text (default from config)
        #[arg(long)]
        charset: Option<String>,

        /// Print the exiv2 scripts instead of running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove XMP, comments, IPTC and EXIF with jpegoptim
    Strip {
        /// Image files or directories
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// List the known fields and the tags they map to
    Fields,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(action) = cli.command else {
        anyhow::bail!("No command specified. Use --help for usage.");
    };

    let config = Config::load(cli.config.as_deref())?;

    match action {
        Action::Show { paths, json } => show(&paths, json, &config),
        Action::Set {
            path,
            edits,
            lists,
            charset,
            dry_run,
        } => set(path, &edits, &lists, charset, dry_run, config),
        Action::Strip { paths } => strip(&paths, &config),
        Action::Fields => {
            print_fields();
            Ok(())
        }
    }
}

fn show(paths: &[PathBuf], json: bool, config: &Config) -> Result<()> {
    let images = collect_images(paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    let mut results = Vec::new();
    for image_path in &images {
        let image = ImageMetadata::open_with_config(image_path, config.clone())
            .with_context(|| format!("Failed to open {}", image_path.display()))?;
        let fields: Vec<(&str, MetaValue)> = image
            .to_map()
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        if json {
            let fields: serde_json::Map<String, serde_json::Value> = fields
                .into_iter()
                .map(|(key, value)| Ok((key.to_string(), serde_json::to_value(value)?)))
                .collect::<Result<_, serde_json::Error>>()?;
            results.push(serde_json::json!({
                "path": image_path.display().to_string(),
                "fields": fields,
            }));
        } else {
            println!("{}", image_path.display());
            if fields.is_empty() {
                println!("  (no metadata)");
            }
            for (key, value) in fields {
                println!("  {key:<14} {value}");
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

/// Split `KEY=VALUE`.
fn parse_edit(edit: &str) -> Result<(&str, &str)> {
    edit.split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got {edit:?}"))
}

/// Split a comma separated list value; an empty string is an empty list.
fn parse_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(|item| item.trim().to_string()).collect()
}

fn set(
    path: PathBuf,
    edits: &[String],
    lists: &[String],
    charset: Option<String>,
    dry_run: bool,
    mut config: Config,
) -> Result<()> {
    if edits.is_empty() && lists.is_empty() {
        anyhow::bail!("Nothing to set. Pass KEY=VALUE or --list KEY=A,B.");
    }

    if let Some(charset) = charset {
        config.iptc_charset = charset;
    }
    let mut image = ImageMetadata::open_with_config(&path, config)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    for edit in edits {
        let (key, value) = parse_edit(edit)?;
        image.set(key, value)?;
    }
    for edit in lists {
        let (key, value) = parse_edit(edit)?;
        image.set(key, parse_list(value))?;
    }

    if dry_run {
        log::info!("DRY RUN: {} will not be modified", path.display());
        for group in [EncodingGroup::IptcExif, EncodingGroup::Xmp] {
            println!("# {group:?}");
            println!("{}", render_script(&image.compiled(group)));
        }
        return Ok(());
    }

    image
        .save_strict()
        .with_context(|| format!("Failed to save {}", path.display()))?;
    log::info!("Wrote {} field(s) to {}", image.pending().len(), path.display());
    Ok(())
}

fn strip(paths: &[PathBuf], config: &Config) -> Result<()> {
    let images = collect_images(paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    let mut failed = 0;
    for image_path in &images {
        if ImageMetadata::strip_with(image_path, config, &ProcessRunner)? {
            log::info!("Stripped: {}", image_path.display());
        } else {
            log::error!("Failed to strip {}", image_path.display());
            failed += 1;
        }
    }

    log::info!(
        "Done: {} succeeded, {failed} failed out of {} images",
        images.len() - failed,
        images.len()
    );
    if failed > 0 {
        anyhow::bail!("{failed} image(s) could not be stripped");
    }
    Ok(())
}

fn print_fields() {
    for field in FIELDS {
        println!("{}", field.key);
        for encoding in field.encodings() {
            if let Some(mapping) = field.mapping(encoding) {
                println!(
                    "  {:<5} {:<42} {}",
                    encoding.as_str(),
                    mapping.native_key,
                    mapping.value_type.type_name(encoding)
                );
            }
        }
    }
}
