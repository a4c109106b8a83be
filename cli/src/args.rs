//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use smf_core::layout::ByteOrder;

/// Byte order selection for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliByteOrder {
    /// Most significant octet first.
    #[default]
    #[value(name = "big")]
    Big,
    /// Least significant octet first.
    #[value(name = "little")]
    Little,
    /// Whatever this machine uses.
    Native,
}

impl From<CliByteOrder> for ByteOrder {
    fn from(cli: CliByteOrder) -> Self {
        match cli {
            CliByteOrder::Big => ByteOrder::BigEndian,
            CliByteOrder::Little => ByteOrder::LittleEndian,
            CliByteOrder::Native => ByteOrder::native(),
        }
    }
}

/// SMF mesh tool.
#[derive(Parser, Debug)]
#[command(
    name = "smf",
    about = "Inspect, convert and pack SMF meshes",
    long_about = "Inspect, convert and pack SMF meshes.\n\n\
        Input files are recognized by their content; output files by --format\n\
        or by their suffix (.smft for text, .smfb for binary).\n\
        \n\
        EXAMPLES:\n\
          # Show the format and version of a file\n\
          smf probe mesh.smfb\n\
        \n\
          # Convert text to little-endian binary\n\
          smf convert mesh.smft mesh.smfb --byte-order little\n\
        \n\
          # Interleave position and normal, aligned to 4 octets\n\
          smf pack mesh.smfb --attribute position --attribute normal --align 4\n\
        \n\
        The exit status is non-zero when the input has data errors.",
    version
)]
pub struct Cli {
    /// Log debug output.
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log only warnings and errors.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Log level forced by `--verbose` or `--quiet`, if any.
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        if self.verbose {
            Some(log::LevelFilter::Debug)
        } else if self.quiet {
            Some(log::LevelFilter::Warn)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the supported encodings.
    Formats,

    /// Report the encoding and version of a file.
    Probe {
        file: PathBuf,
    },

    /// Print every event produced while parsing a file.
    Events {
        file: PathBuf,

        /// Decline vertex values, printing only the structure.
        #[arg(long)]
        skip_values: bool,
    },

    /// Convert a mesh to another encoding.
    Convert {
        input: PathBuf,

        output: PathBuf,

        /// Output encoding name (smft or smfb). Defaults to the output suffix.
        #[arg(long)]
        format: Option<String>,

        /// Byte order of binary vertex data.
        #[arg(long, value_enum, default_value = "big")]
        byte_order: CliByteOrder,
    },

    /// Pack vertex data into one interleaved buffer and describe it.
    Pack {
        file: PathBuf,

        /// Attribute to include, in buffer order. Repeat for several;
        /// defaults to every attribute in header order.
        #[arg(long = "attribute", value_name = "NAME")]
        attributes: Vec<String>,

        /// Power-of-two alignment of attribute offsets and vertex size.
        #[arg(long, default_value = "1")]
        align: u32,

        /// Byte order of the packed buffers.
        #[arg(long, value_enum, default_value = "native")]
        byte_order: CliByteOrder,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::parse_from([
            "smf",
            "convert",
            "in.smft",
            "out.smfb",
            "--byte-order",
            "little",
        ]);
        assert_eq!(
            cli.command,
            Command::Convert {
                input: "in.smft".into(),
                output: "out.smfb".into(),
                format: None,
                byte_order: CliByteOrder::Little,
            }
        );
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn test_pack_arguments() {
        let cli = Cli::parse_from([
            "smf", "-v", "pack", "m.smfb", "--attribute", "position", "--attribute", "uv", "--align", "4",
        ]);
        assert_eq!(cli.log_level(), Some(log::LevelFilter::Debug));
        let Command::Pack {
            attributes, align, ..
        } = cli.command
        else {
            panic!("expected pack");
        };
        assert_eq!(attributes, ["position", "uv"]);
        assert_eq!(align, 4);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["smf", "-v", "-q", "formats"]).is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
