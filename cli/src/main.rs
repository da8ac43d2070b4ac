use clap::{Parser, ValueEnum};
use fatsect_core::{
    check_sector_size, resolve_with_options, ExtentWindow, FatsectError, ResolveOptions,
    SectorRange, SECTOR_SIZE,
};
use fatsect_filesystems::open_image;
use log::{info, LevelFilter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fatsect")]
#[command(about = "Print the disk sectors occupied by a file on a FAT image", long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Disk image containing the FAT filesystem
    image: PathBuf,

    /// Start of the filesystem inside the image, in 512-byte sectors
    origin: u64,

    /// File path inside the filesystem
    path: String,

    /// Skip this many sectors of the file
    #[arg(default_value_t = 0)]
    offset: i64,

    /// Only report this many sectors (default: the rest of the file)
    size: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Narrow the result to a file-relative section, as START:LEN sectors
    #[arg(long, value_name = "START:LEN")]
    section: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG, when set, overrides the -v level
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn parse_section(value: &str) -> fatsect_core::Result<SectorRange> {
    let invalid =
        || FatsectError::InvalidWindow(format!("section must be START:LEN, got '{}'", value));

    let (start, length) = value.split_once(':').ok_or_else(invalid)?;
    let start: u64 = start.trim().parse().map_err(|_| invalid())?;
    let length: u64 = length.trim().parse().map_err(|_| invalid())?;

    if length == 0 || start.checked_add(length).is_none() {
        return Err(invalid());
    }
    Ok(SectorRange::new(start, length))
}

fn render(ranges: &[SectorRange], format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => ranges.iter().map(|range| format!("{}\n", range)).collect(),
        OutputFormat::Json => format!("{}\n", serde_json::to_string(ranges)?),
    })
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let window = ExtentWindow::from_signed(cli.offset, cli.size)?;
    let section = cli.section.as_deref().map(parse_section).transpose()?;

    let origin_bytes = cli.origin.checked_mul(SECTOR_SIZE).ok_or_else(|| {
        FatsectError::OpenError(format!("origin sector {} is out of range", cli.origin))
    })?;

    let mut volume = open_image(&cli.image, origin_bytes)?;
    check_sector_size(&volume)?;

    let entry = volume.resolve_path(&cli.path)?;
    let chain = volume.cluster_chain(entry.first_cluster)?;
    info!(
        "{}: {} bytes, {} clusters starting at {}",
        entry.path,
        entry.size,
        chain.len(),
        entry.first_cluster
    );

    let options = ResolveOptions {
        origin_sectors: cli.origin,
        window,
        section,
    };
    let ranges = resolve_with_options(&chain, &volume, &options)?;

    render(&ranges, cli.format)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fatsect").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_defaults() {
        let cli = parse(&["disk.img", "2048", "/EFI/BOOT/BOOTX64.EFI"]);
        assert_eq!(cli.origin, 2048);
        assert_eq!(cli.offset, 0);
        assert_eq!(cli.size, None);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.section.is_none());
    }

    #[test]
    fn test_window_arguments() {
        let cli = parse(&["disk.img", "0", "KERNEL", "2", "3", "--format", "json", "-vv"]);
        assert_eq!(cli.offset, 2);
        assert_eq!(cli.size, Some(3));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_negative_window_parses_then_fails() {
        let cli = parse(&["disk.img", "0", "KERNEL", "-1"]);
        assert_eq!(cli.offset, -1);
        let err = run(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FatsectError>(),
            Some(FatsectError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_missing_path_argument() {
        assert!(Cli::try_parse_from(["fatsect", "disk.img", "0"]).is_err());
    }

    #[test]
    fn test_parse_section() {
        assert_eq!(parse_section("16:4").unwrap(), SectorRange::new(16, 4));
        assert!(parse_section("16").is_err());
        assert!(parse_section("a:4").is_err());
        assert!(parse_section("16:0").is_err());
        assert!(parse_section("-1:4").is_err());
    }

    #[test]
    fn test_render_text() {
        let ranges = [SectorRange::new(100, 4), SectorRange::new(120, 4)];
        assert_eq!(render(&ranges, OutputFormat::Text).unwrap(), "100 4\n120 4\n");
        assert_eq!(render(&[], OutputFormat::Text).unwrap(), "");
    }

    #[test]
    fn test_render_json() {
        let ranges = [SectorRange::new(2148, 8)];
        assert_eq!(
            render(&ranges, OutputFormat::Json).unwrap(),
            "[{\"start\":2148,\"length\":8}]\n"
        );
    }
}
