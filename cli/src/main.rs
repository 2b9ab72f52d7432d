use anyhow::Context;
use clap::error::ErrorKind;
use clap::{ArgAction, Args, Parser, Subcommand};
use fatkit_core::{FatVariant, FormatOptions};
use fatkit_formatters::{FatFormatter, FatNavigator};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, Level};

mod output;
mod shell;

#[derive(Parser)]
#[command(name = "fatkit", version)]
#[command(about = "Create and browse FAT16/FAT32 disk images", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a FAT16 image
    Format16(FormatArgs),
    /// Create a FAT32 image
    Format32(FormatArgs),
    /// Browse an image in an interactive shell
    Navigate {
        /// Image file
        image: PathBuf,
    },
    /// List the root directory of an image
    List {
        /// Image file
        image: PathBuf,
    },
    /// Show the decoded boot sector of an image
    Info {
        /// Image file
        image: PathBuf,
    },
}

#[derive(Args)]
struct FormatArgs {
    /// Image file to create (overwritten if it exists)
    image: PathBuf,
    /// Capacity in MiB
    size_mb: u32,
    /// Volume label, up to 11 characters
    #[arg(short, long)]
    label: Option<String>,
    /// Volume serial number in hex, e.g. 1234-ABCD
    #[arg(long, value_parser = parse_serial)]
    serial: Option<u32>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_serial(s: &str) -> Result<u32, String> {
    let digits: String = s
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .chars()
        .filter(|&c| c != '-')
        .collect();
    u32::from_str_radix(&digits, 16).map_err(|e| format!("invalid serial '{}': {}", s, e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Format16(args) => format(FatVariant::Fat16, args),
        Commands::Format32(args) => format(FatVariant::Fat32, args),
        Commands::Navigate { image } => {
            let mut nav = FatNavigator::open(&image)?;
            debug!("Starting shell on {}", image.display());
            let stdin = io::stdin();
            let mut stdout = io::stdout().lock();
            shell::run_shell(&mut nav, stdin.lock(), &mut stdout)
        }
        Commands::List { image } => {
            let mut nav = FatNavigator::open(&image)?;
            let entries = nav.list().context("failed to read the root directory")?;
            let mut stdout = io::stdout().lock();
            output::write_listing(&mut stdout, &display_name(&image), &entries)?;
            Ok(())
        }
        Commands::Info { image } => {
            let nav = FatNavigator::open(&image)?;
            let mut stdout = io::stdout().lock();
            output::write_boot_sector(&mut stdout, &display_name(&image), nav.boot_sector())?;
            Ok(())
        }
    }
}

fn format(variant: FatVariant, args: FormatArgs) -> anyhow::Result<()> {
    let options = FormatOptions {
        label: args.label,
        volume_serial: args.serial,
        ..FormatOptions::new(variant, args.size_mb)
    };

    let report = FatFormatter::new(variant)
        .format(&args.image, &options)
        .with_context(|| format!("failed to format {}", args.image.display()))?;

    let mut stdout = io::stdout().lock();
    if args.json {
        writeln!(stdout, "{}", report.to_json()?)?;
    } else {
        output::write_report(&mut stdout, &display_name(&args.image), &report)?;
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial() {
        assert_eq!(parse_serial("1234-ABCD"), Ok(0x1234_ABCD));
        assert_eq!(parse_serial("0xcafef00d"), Ok(0xCAFE_F00D));
        assert_eq!(parse_serial("ff"), Ok(0xFF));
        assert!(parse_serial("xyz").is_err());
        assert!(parse_serial("123456789").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_arguments() {
        let cli = Cli::try_parse_from(["fatkit", "-vv", "format32", "disk.img", "64", "--label", "data", "--serial", "1234-abcd"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Format32(args) => {
                assert_eq!(args.size_mb, 64);
                assert_eq!(args.label.as_deref(), Some("data"));
                assert_eq!(args.serial, Some(0x1234_ABCD));
                assert!(!args.json);
            }
            _ => panic!("expected format32"),
        }
    }

    #[test]
    fn test_size_must_be_a_number() {
        assert!(Cli::try_parse_from(["fatkit", "format16", "disk.img", "big"]).is_err());
    }
}
