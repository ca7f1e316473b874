//! cubez CLI: compress `.cube` files to `.cubez` archives and back.
//!
//! Usage:
//!   cubez density.cube -t 4 -i 0.002 4
//!   cubez density.cubez -p 6 -d

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;

use cubez::codec::{
    archive_bytes_to_cube, archive_path, cube_path, cube_to_archive_bytes, replace_file,
    ARCHIVE_EXTENSION,
};
use cubez::config::{DEFAULT_COMPRESSION, DEFAULT_PRECISION, DEFAULT_TRUNCATE};
use cubez::{CubeError, DecodeOptions, EncodeOptions, ThresholdSpec};

#[derive(Parser, Debug)]
#[command(
    name = "cubez",
    version,
    about = "Gaussian CUBE (de)compression",
    after_help = "The operation follows the file extension: .cube/.cub files are compressed \
                  to .cubez, .cubez files are decompressed to .cube, anything else is an error."
)]
struct Cli {
    /// File to be (de)compressed
    path: PathBuf,

    /// Delete the source file after (de)compression
    #[arg(short, long)]
    delete: bool,

    /// gzip compression level for volumetric data (0-9) [default: 9]
    #[arg(short, long, value_name = "#", value_parser = clap::value_parser!(u32).range(0..=9))]
    compress: Option<u32>,

    /// Decimals of log10 magnitude retained (0-15) [default: 5]
    #[arg(short, long, value_name = "#", value_parser = clap::value_parser!(u32).range(0..=15))]
    truncate: Option<u32>,

    /// Absolute-value thresholding (default when -m or -i is given)
    #[arg(short, long, conflicts_with_all = ["signed", "nothresh"])]
    absolute: bool,

    /// Signed-value thresholding
    #[arg(short, long, conflicts_with = "nothresh")]
    signed: bool,

    /// Thresholding disabled (default)
    #[arg(short, long)]
    nothresh: bool,

    /// Threshold band bounds
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true,
        conflicts_with = "isofactor"
    )]
    minmax: Option<Vec<f64>>,

    /// Isovalue and factor; '-i 0.002 4' is '-m 0.0005 0.008'
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["ISO", "FACTOR"],
        allow_negative_numbers = true
    )]
    isofactor: Option<Vec<f64>>,

    /// Collapse values below the threshold band to zero instead of raising them
    #[arg(short = 'z', long)]
    clip_zero: bool,

    /// Volumetric output precision (0-15) [default: 5]
    #[arg(short, long, value_name = "#", value_parser = clap::value_parser!(u32).range(0..=15))]
    precision: Option<u32>,
}

impl Cli {
    fn compression_args(&self) -> bool {
        self.compress.is_some()
            || self.truncate.is_some()
            || self.absolute
            || self.signed
            || self.nothresh
            || self.minmax.is_some()
            || self.isofactor.is_some()
            || self.clip_zero
    }

    fn decompression_args(&self) -> bool {
        self.precision.is_some()
    }

    fn threshold(&self) -> Result<ThresholdSpec, Failure> {
        if self.nothresh && (self.minmax.is_some() || self.isofactor.is_some()) {
            return Err(Failure::cmdline(anyhow!(
                "thresholding parameter specified with --nothresh"
            )));
        }

        let spec = match (&self.minmax, &self.isofactor) {
            (Some(mm), _) => {
                let (min, max) = (mm[0], mm[1]);
                if self.signed {
                    ThresholdSpec::signed(min, max, self.clip_zero)
                } else {
                    ThresholdSpec::absolute(min, max, self.clip_zero)
                }
            }
            (None, Some(iso)) => {
                ThresholdSpec::from_isofactor(iso[0], iso[1], self.signed, self.clip_zero)
            }
            (None, None) => {
                if self.absolute || self.signed {
                    return Err(Failure::cmdline(anyhow!(
                        "thresholding mode specified but no values provided"
                    )));
                }
                Ok(ThresholdSpec::none())
            }
        };
        spec.map_err(|e| Failure::cmdline(e.into()))
    }
}

/// Process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Generic = 1,
    CmdLine = 2,
    FileRead = 4,
    FileWrite = 8,
}

struct Failure {
    code: Exit,
    error: anyhow::Error,
}

impl Failure {
    fn cmdline(error: anyhow::Error) -> Self {
        Self {
            code: Exit::CmdLine,
            error,
        }
    }
}

trait OrExit<T> {
    fn or_exit(self, code: Exit) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> OrExit<T> for Result<T, E> {
    fn or_exit(self, code: Exit) -> Result<T, Failure> {
        self.map_err(|e| Failure {
            code,
            error: e.into(),
        })
    }
}

/// Configuration problems are the user's to fix; everything else is generic.
fn codec_exit(e: &CubeError) -> Exit {
    match e {
        CubeError::Configuration(_) => Exit::CmdLine,
        _ => Exit::Generic,
    }
}

enum Operation {
    Compress,
    Decompress,
}

fn operation(path: &Path) -> Option<Operation> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "cube" | "cub" => Some(Operation::Compress),
        e if e == ARCHIVE_EXTENSION => Some(Operation::Decompress),
        _ => None,
    }
}

fn run(cli: &Cli) -> Result<PathBuf, Failure> {
    if !cli.path.is_file() {
        return Err(Failure {
            code: Exit::FileRead,
            error: anyhow!("file not found: {}", cli.path.display()),
        });
    }

    if cli.compression_args() && cli.decompression_args() {
        return Err(Failure::cmdline(anyhow!(
            "both compression and decompression options specified"
        )));
    }
    let threshold = cli.threshold()?;

    let out = match operation(&cli.path) {
        Some(Operation::Compress) => {
            let options = EncodeOptions {
                threshold,
                truncate: cli.truncate.unwrap_or(DEFAULT_TRUNCATE),
                compression: cli.compress.unwrap_or(DEFAULT_COMPRESSION),
            };
            let text = fs::read_to_string(&cli.path)
                .with_context(|| format!("reading {}", cli.path.display()))
                .or_exit(Exit::FileRead)?;
            let bytes = cube_to_archive_bytes(&text, &options).map_err(|e| Failure {
                code: codec_exit(&e),
                error: anyhow::Error::new(e)
                    .context(format!("compressing {}", cli.path.display())),
            })?;
            let out = archive_path(&cli.path);
            replace_file(&out, &bytes)
                .with_context(|| format!("writing {}", out.display()))
                .or_exit(Exit::FileWrite)?;
            out
        }
        Some(Operation::Decompress) => {
            let options = DecodeOptions {
                precision: cli
                    .precision
                    .map_or(DEFAULT_PRECISION, |p| p as usize),
            };
            let bytes = fs::read(&cli.path)
                .with_context(|| format!("reading {}", cli.path.display()))
                .or_exit(Exit::FileRead)?;
            let text = archive_bytes_to_cube(&bytes, &options).map_err(|e| Failure {
                code: codec_exit(&e),
                error: anyhow::Error::new(e)
                    .context(format!("decompressing {}", cli.path.display())),
            })?;
            let out = cube_path(&cli.path);
            replace_file(&out, text.as_bytes())
                .with_context(|| format!("writing {}", out.display()))
                .or_exit(Exit::FileWrite)?;
            out
        }
        None => {
            return Err(Failure::cmdline(anyhow!(
                "file extension not recognized: {}",
                cli.path.display()
            )))
        }
    };

    if cli.delete {
        fs::remove_file(&cli.path)
            .with_context(|| format!("deleting {}", cli.path.display()))
            .or_exit(Exit::Generic)?;
    }
    Ok(out)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(out) => {
            log::info!("wrote {}", out.display());
            ExitCode::SUCCESS
        }
        Err(Failure { code, error }) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(code as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cubez").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn dispatch_by_extension() {
        assert!(matches!(
            operation(Path::new("a/b.CUBE")),
            Some(Operation::Compress)
        ));
        assert!(matches!(
            operation(Path::new("b.cub")),
            Some(Operation::Compress)
        ));
        assert!(matches!(
            operation(Path::new("b.cubez")),
            Some(Operation::Decompress)
        ));
        assert!(operation(Path::new("b.txt")).is_none());
        assert!(operation(Path::new("cube")).is_none());
    }

    #[test]
    fn minmax_defaults_to_absolute() {
        let spec = cli(&["x.cube", "-m", "0.001", "10"]).threshold().ok().unwrap();
        assert_eq!(spec, ThresholdSpec::absolute(0.001, 10.0, false).unwrap());
    }

    #[test]
    fn signed_isofactor_with_negative_bounds() {
        let spec = cli(&["x.cube", "-s", "-m", "-5", "-1", "-z"])
            .threshold()
            .ok()
            .unwrap();
        assert_eq!(spec, ThresholdSpec::signed(-5.0, -1.0, true).unwrap());

        let spec = cli(&["x.cube", "-s", "-i", "0.002", "4"])
            .threshold()
            .ok()
            .unwrap();
        assert_eq!(
            spec,
            ThresholdSpec::from_isofactor(0.002, 4.0, true, false).unwrap()
        );
    }

    #[test]
    fn mode_without_values_rejected() {
        let err = cli(&["x.cube", "-a"]).threshold().err().unwrap();
        assert_eq!(err.code, Exit::CmdLine);
    }

    #[test]
    fn nothresh_with_values_rejected() {
        let err = cli(&["x.cube", "-n", "-i", "0.1", "3"])
            .threshold()
            .err()
            .unwrap();
        assert_eq!(err.code, Exit::CmdLine);
    }

    #[test]
    fn invalid_band_is_cmdline_error() {
        let err = cli(&["x.cube", "-m", "2", "1"]).threshold().err().unwrap();
        assert_eq!(err.code, Exit::CmdLine);
    }

    #[test]
    fn exclusive_flags_rejected_by_parser() {
        let parse = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("cubez").chain(args.iter().copied()))
        };
        assert!(parse(&["x.cube", "-a", "-s"]).is_err());
        assert!(parse(&["x.cube", "-m", "1", "2", "-i", "1", "2"]).is_err());
        assert!(parse(&["x.cube", "-c", "10"]).is_err());
        assert!(parse(&["x.cube", "-p", "16"]).is_err());
    }

    #[test]
    fn mixed_options_detected() {
        let c = cli(&["x.cubez", "-p", "3", "-c", "4"]);
        assert!(c.compression_args() && c.decompression_args());
        let c = cli(&["x.cubez", "-p", "3", "-d"]);
        assert!(!c.compression_args());
    }
}
