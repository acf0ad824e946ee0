use super::app_config::LogLevel;
use crate::domain::entities::{Modifier, RetentionClass, Variant, VariantSize};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pixvend",
    version,
    about = "Vends cached image variants and maintains their on-disk store",
    long_about = None
)]
/// Command line arguments.
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Base directory for the variant store roots.
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Store namespace.
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Retention class of the namespace.
    #[arg(long, value_enum, global = true)]
    pub retention: Option<RetentionClass>,

    /// Blur radius in pixels for blurred variants.
    #[arg(long, global = true)]
    pub blur_radius: Option<f32>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// pixvend subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a variant of an image file through the vend cache.
    Vend(VendArgs),

    /// Print the store path of a variant.
    Path {
        /// Store key.
        #[arg(short, long)]
        key: String,

        /// Raw modifier bits (1 circular, 2 blurred, 4 grayscale).
        #[arg(short, long, default_value_t = 0)]
        modifier: u64,

        #[command(flatten)]
        size: SizeArgs,
    },

    /// Delete records older than a threshold.
    Sweep(SweepArgs),

    /// Delete every record of a key.
    Remove {
        /// Store key.
        #[arg(short, long)]
        key: String,
    },

    /// Delete every record in the namespace.
    Clear,

    /// Print record count and size of the namespace as JSON.
    Stats,
}

/// Arguments of `pixvend vend`.
#[derive(Debug, Args)]
pub struct VendArgs {
    /// Original image file.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Owner identifier.
    #[arg(long)]
    pub owner: i64,

    /// Bounding size of the variant.
    #[command(flatten)]
    pub size: SizeArgs,

    /// Mask to the inscribed circle.
    #[arg(long)]
    pub circular: bool,

    /// Apply the configured blur.
    #[arg(long)]
    pub blurred: bool,

    /// Convert to grayscale.
    #[arg(long)]
    pub grayscale: bool,

    /// Where to write the vended variant; format follows the extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Read through and write through the configured variant store.
    #[arg(long)]
    pub persist: bool,
}

impl VendArgs {
    /// Variant selected by the modifier flags.
    #[must_use]
    pub fn variant(&self) -> Variant {
        let mut modifier = Modifier::empty();
        modifier.set(Modifier::CIRCULAR, self.circular);
        modifier.set(Modifier::BLURRED, self.blurred);
        modifier.set(Modifier::GRAYSCALE, self.grayscale);
        Variant::from(modifier)
    }
}

/// Bounding box; zero on one side leaves it unconstrained, zero on both means original.
#[derive(Debug, Clone, Copy, Args)]
pub struct SizeArgs {
    /// Maximum width in pixels.
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Maximum height in pixels.
    #[arg(long, default_value_t = 0)]
    pub height: u32,
}

impl SizeArgs {
    /// Converts to a variant size.
    #[must_use]
    pub const fn variant_size(self) -> VariantSize {
        VariantSize::new(self.width, self.height)
    }
}

/// Arguments of `pixvend sweep`; exactly one threshold.
#[derive(Debug, Clone, Copy, Args)]
#[group(required = true, multiple = false)]
pub struct SweepArgs {
    /// Delete records created more than this many hours ago.
    #[arg(long, value_name = "HOURS")]
    pub created_before_hours: Option<u32>,

    /// Delete records not read for this many hours.
    #[arg(long, value_name = "HOURS")]
    pub accessed_before_hours: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vend() {
        let args = CliArgs::parse_from([
            "pixvend",
            "vend",
            "--input",
            "in.png",
            "--owner",
            "42",
            "--width",
            "100",
            "--height",
            "100",
            "--circular",
            "--blurred",
            "--output",
            "out.png",
        ]);

        let Command::Vend(vend) = args.command else {
            panic!("expected vend command");
        };
        assert_eq!(vend.owner, 42);
        assert_eq!(vend.size.variant_size(), VariantSize::new(100, 100));
        assert_eq!(
            vend.variant(),
            Variant::from(Modifier::CIRCULAR | Modifier::BLURRED)
        );
        assert!(!vend.persist);
    }

    #[test]
    fn test_sweep_requires_exactly_one_threshold() {
        assert!(CliArgs::try_parse_from(["pixvend", "sweep"]).is_err());
        assert!(
            CliArgs::try_parse_from([
                "pixvend",
                "sweep",
                "--created-before-hours",
                "1",
                "--accessed-before-hours",
                "1"
            ])
            .is_err()
        );
        assert!(CliArgs::try_parse_from(["pixvend", "sweep", "--accessed-before-hours", "24"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["pixvend", "stats", "--namespace", "thumbs"]);
        assert_eq!(args.namespace.as_deref(), Some("thumbs"));
    }
}
