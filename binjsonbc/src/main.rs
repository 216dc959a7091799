//! jsonbc command-line tool for encoding, inspecting, comparing and
//! transcoding binary JSON containers.
//!
//! Usage: jsonbc [OPTIONS] <COMMAND>
//!
//! Commands:
//!   convert   Convert a document between formats (file, directory or stdin)
//!   compare   Order two documents (-1, 0 or 1)
//!   hash      Print the hash of a document
//!   contains  Whether the first document contains the second
//!   exists    Whether top-level keys or string elements exist
//!   typeof    Print the type of the root value
//!
//! Options:
//!       --dict <PATH>  Key dictionary file [env: JSONBC_DICT] [default: jsonbc.dict]
//!   -v, --verbose      Log at debug level unless JSONBC_LOG says otherwise
//!
//! Containers are read and written in their wire form (a version byte
//! followed by the container), either raw (`jsonbc`), as `hex` or as
//! `base64` text. Every object key goes through the key dictionary, so
//! containers are only readable with the dictionary they were written with.

use anyhow::{bail, Context, Result};
use base64::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use libjsonbc::{text, Container, KeyDictionary};
use std::cmp::Ordering;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

mod transcode;

#[derive(Parser)]
#[command(name = "jsonbc")]
#[command(about = "Dictionary-compressed binary JSON containers")]
#[command(version)]
struct Cli {
    /// Key dictionary file, one key name per line
    #[arg(long, global = true, env = "JSONBC_DICT", default_value = "jsonbc.dict")]
    dict: PathBuf,

    /// Log at debug level unless JSONBC_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    /// Compact single-line rendering (reads as JSON)
    Text,
    #[value(alias = "yml")]
    Yaml,
    Toml,
    Cbor,
    /// Raw wire form
    Jsonbc,
    /// Wire form as hex text
    Hex,
    /// Wire form as base64 text
    Base64,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Text => "txt",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Cbor => "cbor",
            Format::Jsonbc => "jsonbc",
            Format::Hex => "hex",
            Format::Base64 => "b64",
        }
    }

    fn matches(self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") => self == Format::Yaml,
            Some(ext) => ext == self.extension(),
            None => false,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document between formats
    Convert {
        /// Input file or directory; stdin when absent or "-"
        input: Option<PathBuf>,

        /// Input format
        #[arg(short, long, value_enum, default_value = "json")]
        from: Format,

        /// Output format
        #[arg(short, long, value_enum, default_value = "jsonbc")]
        to: Format,

        /// Write output to the specified file
        #[arg(short, long, conflicts_with = "write")]
        output: Option<PathBuf>,

        /// Write output next to the input, with the output format's extension
        #[arg(short, long)]
        write: bool,

        /// Only check that the input decodes
        #[arg(long)]
        check: bool,
    },

    /// Order two documents: prints -1, 0 or 1
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[arg(short, long, value_enum, default_value = "jsonbc")]
        from: Format,
    },

    /// Print the hash of a document
    Hash {
        input: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "jsonbc")]
        from: Format,
    },

    /// Whether the first document contains the second
    Contains {
        lhs: PathBuf,
        rhs: PathBuf,
        #[arg(short, long, value_enum, default_value = "jsonbc")]
        from: Format,
    },

    /// Whether top-level keys (or string elements of an array) exist
    Exists {
        input: PathBuf,

        #[arg(required = true)]
        keys: Vec<String>,

        /// True if any key exists (default: all must)
        #[arg(long)]
        any: bool,

        #[arg(short, long, value_enum, default_value = "jsonbc")]
        from: Format,
    },

    /// Print the type of the root value
    Typeof {
        input: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "jsonbc")]
        from: Format,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("JSONBC_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let dict = KeyDictionary::open_file(&cli.dict)
        .with_context(|| format!("opening key dictionary {}", cli.dict.display()))?;

    let ok = match cli.command {
        Commands::Convert {
            input,
            from,
            to,
            output,
            write,
            check,
        } => {
            let options = ConvertOptions {
                from,
                to,
                write,
                check,
            };
            match input.as_deref() {
                Some(dir) if dir.is_dir() => {
                    if output.is_some() {
                        bail!("--output cannot be used with directory input");
                    }
                    if !write && !check {
                        bail!("directory input needs --write or --check");
                    }
                    convert_directory(dir, &options, &dict)?
                }
                path => {
                    convert(path, output.as_deref(), &options, &dict)?;
                    true
                }
            }
        }
        Commands::Compare { a, b, from } => {
            let a = load(Some(&a), from, &dict)?;
            let b = load(Some(&b), from, &dict)?;
            let ord = match libjsonbc::compare(&a, &b, &dict)? {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            };
            println!("{}", ord);
            true
        }
        Commands::Hash { input, from } => {
            let c = load(input.as_deref(), from, &dict)?;
            println!("{}", libjsonbc::hash(&c, &dict)?);
            true
        }
        Commands::Contains { lhs, rhs, from } => {
            let lhs = load(Some(&lhs), from, &dict)?;
            let rhs = load(Some(&rhs), from, &dict)?;
            println!("{}", libjsonbc::contains(&lhs, &rhs)?);
            true
        }
        Commands::Exists {
            input,
            keys,
            any,
            from,
        } => {
            let c = load(Some(&input), from, &dict)?;
            let found = if any {
                libjsonbc::exists_any(&c, &keys, &dict)?
            } else {
                libjsonbc::exists_all(&c, &keys, &dict)?
            };
            println!("{}", found);
            true
        }
        Commands::Typeof { input, from } => {
            let c = load(input.as_deref(), from, &dict)?;
            println!("{}", c.type_of()?);
            true
        }
    };

    dict.close().context("closing key dictionary")?;
    if !ok {
        process::exit(1);
    }
    Ok(())
}

struct ConvertOptions {
    from: Format,
    to: Format,
    write: bool,
    check: bool,
}

fn convert(
    input: Option<&Path>,
    output: Option<&Path>,
    options: &ConvertOptions,
    dict: &KeyDictionary,
) -> Result<()> {
    let c = load(input, options.from, dict)?;
    if options.check {
        if let Some(path) = input {
            println!("{}: ok", path.display());
        }
        return Ok(());
    }

    let bytes = render(&c, options.to, dict)?;
    let target = match (output, options.write, input) {
        (Some(path), _, _) => Some(path.to_path_buf()),
        (None, true, Some(path)) => Some(path.with_extension(options.to.extension())),
        (None, true, None) => bail!("--write needs an input file"),
        (None, false, _) => None,
    };

    match target {
        Some(path) => {
            if input == Some(path.as_path()) {
                bail!("refusing to overwrite the input {}", path.display());
            }
            fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote output");
        }
        None => io::stdout().write_all(&bytes).context("writing stdout")?,
    }
    Ok(())
}

/// Convert every file in `dir` with the input format's extension. Failures
/// are reported per file; returns whether all succeeded.
fn convert_directory(dir: &Path, options: &ConvertOptions, dict: &KeyDictionary) -> Result<bool> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| options.from.matches(path))
        .collect();
    paths.sort();

    let mut all_ok = true;
    for path in paths {
        if let Err(e) = convert(Some(&path), None, options, dict) {
            eprintln!("{}: {:#}", path.display(), e);
            all_ok = false;
        }
    }
    Ok(all_ok)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("reading stdin")?;
            Ok(buffer)
        }
    }
}

fn load(path: Option<&Path>, format: Format, dict: &KeyDictionary) -> Result<Container> {
    decode(read_input(path)?, format, dict)
}

/// Decode input bytes of the given format into a container.
fn decode(bytes: Vec<u8>, format: Format, dict: &KeyDictionary) -> Result<Container> {
    let as_text = |bytes: Vec<u8>| String::from_utf8(bytes).context("input is not valid UTF-8");
    Ok(match format {
        Format::Json | Format::Text => libjsonbc::parse(&as_text(bytes)?, dict)?,
        Format::Yaml => transcode::yaml::decode(&as_text(bytes)?, dict)?,
        Format::Toml => transcode::toml::decode(&as_text(bytes)?, dict)?,
        Format::Cbor => transcode::cbor::decode(&bytes, dict)?,
        Format::Jsonbc => Container::from_wire(bytes)?,
        Format::Hex => {
            let wire = hex::decode(as_text(bytes)?.trim()).context("invalid hex")?;
            Container::from_wire(wire)?
        }
        Format::Base64 => {
            let wire = BASE64_STANDARD
                .decode(as_text(bytes)?.trim())
                .context("invalid base64")?;
            Container::from_wire(wire)?
        }
    })
}

/// Render a container in the given format. Text formats end with a newline.
fn render(c: &Container, format: Format, dict: &KeyDictionary) -> Result<Vec<u8>> {
    let text = match format {
        Format::Json => {
            let json = libjsonbc::json::to_json(c, dict)?;
            serde_json::to_string_pretty(&json)?
        }
        Format::Text => text::to_text(c, dict)?,
        Format::Yaml => return Ok(transcode::yaml::encode(c, dict)?.into_bytes()),
        Format::Toml => return Ok(transcode::toml::encode(c, dict)?.into_bytes()),
        Format::Cbor => return transcode::cbor::encode(c, dict),
        Format::Jsonbc => return Ok(c.to_wire()),
        Format::Hex => hex::encode(c.to_wire()),
        Format::Base64 => BASE64_STANDARD.encode(c.to_wire()),
    };
    Ok(format!("{}\n", text).into_bytes())
}
