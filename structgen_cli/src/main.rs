use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use structgen_gen::codegen::shared::plan::Representation;
use structgen_gen::schema::Format;
use structgen_runtime::Severity;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cmds;
mod config;
mod partition;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "structgen")]
#[command(about = "Structured-type toolchain - code generation, analysis, encoding and decoding")]
#[command(version)]
struct Cli {
    /// YAML file with generation and runtime settings
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/* Descriptor inputs shared by every command that resolves types */
#[derive(clap::Args, Debug, Clone)]
pub struct Inputs {
    /// Input YAML files containing type descriptors
    #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Include directories for imported descriptor files
    #[arg(short = 'i', long = "include-dir", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate runtime support code for structured types
    Codegen {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory for generated code
        #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "generated")]
        output_dir: PathBuf,

        /// How artifacts are grouped into output files
        #[arg(short = 'p', long = "partition", value_enum, default_value = "by-name")]
        partition: PartitionPolicy,

        /// Path generated code uses to reach the runtime library
        #[arg(long = "runtime-crate", value_name = "CRATE")]
        runtime_crate: Option<String>,

        /// Storage strategy of generated record-of/set-of values
        #[arg(long = "representation", value_enum)]
        representation: Option<RepresentationArg>,

        /// Restrict generated codecs to these formats
        #[arg(long = "format", value_enum)]
        formats: Vec<FormatArg>,
    },

    /// Resolve descriptors and show resolution order and codec plans
    Analyze {
        #[command(flatten)]
        inputs: Inputs,

        /// Print the full plan set as JSON
        #[arg(long = "print-plans")]
        print_plans: bool,

        /// Print the generated artifacts of a specific type
        #[arg(long = "print-type", value_name = "TYPE")]
        print_type: Option<String>,
    },

    /// Encode a value given in one format into another
    Encode {
        #[command(flatten)]
        inputs: Inputs,

        /// Type of the value
        #[arg(short = 't', long = "type-name", required = true)]
        type_name: String,

        /// Format of the input value
        #[arg(long = "from", value_enum, default_value = "json")]
        from: FormatArg,

        /// Format to encode into
        #[arg(long = "to", value_enum)]
        to: FormatArg,

        /// Input file holding the value
        #[arg(short = 'd', long = "data-file", required = true)]
        data_file: PathBuf,

        /// Output file; binary encodings are printed as hex without it
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Input file holds hex digits instead of raw bytes
        #[arg(long = "hex")]
        hex: bool,

        /// How broken component relation constraints are reported
        #[arg(long = "broken-constraint", value_enum)]
        broken_constraint: Option<SeverityArg>,
    },

    /// Decode a value and print it as JSON
    Decode {
        #[command(flatten)]
        inputs: Inputs,

        /// Type of the value
        #[arg(short = 't', long = "type-name", required = true)]
        type_name: String,

        /// Format of the input value
        #[arg(long = "format", value_enum)]
        format: FormatArg,

        /// Input file holding the encoded value
        #[arg(short = 'd', long = "data-file", required = true)]
        data_file: PathBuf,

        /// Input file holds hex digits instead of raw bytes
        #[arg(long = "hex")]
        hex: bool,

        /// Report bit-packed decoding statistics
        #[arg(long = "stats")]
        stats: bool,

        /// How broken component relation constraints are reported
        #[arg(long = "broken-constraint", value_enum)]
        broken_constraint: Option<SeverityArg>,
    },

    /// Flatten a descriptor file by resolving all imports
    Flatten {
        /// Input descriptor file
        #[arg(short = 'f', long = "file", required = true)]
        file: PathBuf,

        /// Include directories for resolving imports
        #[arg(short = 'i', long = "include-dir")]
        include_dirs: Vec<PathBuf>,

        /// Output file path
        #[arg(short = 'o', long = "output", required = true)]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum PartitionPolicy {
    /// Everything in one file
    Single,
    /// One file per artifact kind
    ByKind,
    /// One file per type
    ByName,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum FormatArg {
    Tlv,
    BitPacked,
    Text,
    Xml,
    Json,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Tlv => Format::Tlv,
            FormatArg::BitPacked => Format::BitPacked,
            FormatArg::Text => Format::Text,
            FormatArg::Xml => Format::Xml,
            FormatArg::Json => Format::Json,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum RepresentationArg {
    Shared,
    Flat,
}

impl From<RepresentationArg> for Representation {
    fn from(arg: RepresentationArg) -> Self {
        match arg {
            RepresentationArg::Shared => Representation::Shared,
            RepresentationArg::Flat => Representation::Flat,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum SeverityArg {
    Error,
    Warning,
    Ignore,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Error => Severity::Error,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Ignore => Severity::Ignore,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    match cli.command {
        Commands::Codegen {
            inputs,
            output_dir,
            partition,
            runtime_crate,
            representation,
            formats,
        } => {
            let formats = formats.into_iter().map(Into::into).collect();
            config.override_generation(runtime_crate, representation.map(Into::into), formats);
            cmds::codegen::run(&inputs, &config, partition, &output_dir, cli.verbose)?;
        }

        Commands::Analyze {
            inputs,
            print_plans,
            print_type,
        } => {
            cmds::analyze::run(&inputs, &config, print_plans, print_type.as_deref())?;
        }

        Commands::Encode {
            inputs,
            type_name,
            from,
            to,
            data_file,
            output,
            hex,
            broken_constraint,
        } => {
            config.override_runtime(broken_constraint.map(Into::into));
            let request = cmds::transcode::Request {
                type_name,
                data_file,
                hex,
            };
            cmds::transcode::encode(&inputs, &config, &request, from.into(), to.into(), output.as_deref())?;
        }

        Commands::Decode {
            inputs,
            type_name,
            format,
            data_file,
            hex,
            stats,
            broken_constraint,
        } => {
            config.override_runtime(broken_constraint.map(Into::into));
            let request = cmds::transcode::Request {
                type_name,
                data_file,
                hex,
            };
            cmds::transcode::decode(&inputs, &config, &request, format.into(), stats)?;
        }

        Commands::Flatten {
            file,
            include_dirs,
            output,
        } => {
            cmds::flatten::run(&file, &include_dirs, &output, cli.verbose)?;
        }
    }

    Ok(())
}
