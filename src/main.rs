use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use geohash_core::imaging::{encode_jpeg, scale_to_fit_from_path};
use geohash_core::{Destination, GridCell, compute_lookup_date, config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Which grid cell to resolve against.
#[derive(clap::Args, Clone)]
struct CellArgs {
    /// Latitude of any point inside the cell (use -0.5 for the -0 cell)
    #[arg(long, allow_hyphen_values = true, required_unless_present = "global")]
    lat: Option<f64>,
    /// Longitude of any point inside the cell
    #[arg(long, allow_hyphen_values = true, required_unless_present = "global")]
    lon: Option<f64>,
    /// Use the whole globe instead of a single cell
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    global: bool,
}

impl CellArgs {
    fn resolve(&self) -> Result<Option<GridCell>, Box<dyn std::error::Error>> {
        if self.global {
            return Ok(None);
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(GridCell::from_coordinates(lat, lon)?)),
            _ => Err("both --lat and --lon are required unless --global is set".into()),
        }
    }
}

#[derive(Parser)]
#[command(name = "geohash-core")]
#[command(about = "Geohashing destination resolver and photo downscaler")]
#[command(version)]
struct Cli {
    /// Config file with upload/thumbnail presets
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log decisions at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the date whose seed decides the destination
    LookupDate {
        /// Destination date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[command(flatten)]
        cell: CellArgs,
    },
    /// Resolve final coordinates from seed fractions
    Destination {
        /// Destination date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[command(flatten)]
        cell: CellArgs,
        /// Latitude fraction from the seed, in [0, 1)
        #[arg(long)]
        lat_fraction: f64,
        /// Longitude fraction from the seed, in [0, 1)
        #[arg(long)]
        lon_fraction: f64,
        /// Report the distance from this latitude
        #[arg(long, allow_hyphen_values = true, requires = "from_lon")]
        from_lat: Option<f64>,
        /// Report the distance from this longitude
        #[arg(long, allow_hyphen_values = true, requires = "from_lat")]
        from_lon: Option<f64>,
    },
    /// Shrink a photo to the upload (or thumbnail) preset and write a JPEG
    Shrink {
        input: PathBuf,
        output: PathBuf,
        /// Use the thumbnail preset instead of the upload preset
        #[arg(long)]
        thumbnail: bool,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::LookupDate { date, cell } => {
            let cell = cell.resolve()?;
            println!("{}", compute_lookup_date(date, cell.as_ref()));
        }
        Command::Destination {
            date,
            cell,
            lat_fraction,
            lon_fraction,
            from_lat,
            from_lon,
        } => {
            let destination = match cell.resolve()? {
                Some(cell) => Destination::new_bound(lat_fraction, lon_fraction, cell, date)?,
                None => Destination::new_global(lat_fraction, lon_fraction, date)?,
            };
            print_destination(&destination, from_lat.zip(from_lon))?;
        }
        Command::Shrink {
            input,
            output,
            thumbnail,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let (bounds, reversible, quality) = if thumbnail {
                (config.thumbnail.bounds(), false, config.thumbnail.quality())
            } else {
                (
                    config.upload.bounds(),
                    config.upload.reversible,
                    config.upload.quality(),
                )
            };
            let scaled =
                scale_to_fit_from_path(&input, bounds, reversible, config.decode.limits())?;
            let bytes = encode_jpeg(&scaled, quality)?;
            std::fs::write(&output, &bytes)?;
            println!(
                "{} → {} ({}x{}, {} bytes)",
                input.display(),
                output.display(),
                scaled.width(),
                scaled.height(),
                bytes.len()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn print_destination(
    destination: &Destination,
    from: Option<(f64, f64)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let coords = destination.final_coordinates()?;
    let cell = destination
        .cell()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "global".to_string());

    println!("Date:        {}", destination.date());
    println!("Lookup date: {}", destination.lookup_date());
    println!("Cell:        {cell}");
    println!("Final:       {:.6}, {:.6}", coords.latitude, coords.longitude);
    println!("Retro:       {}", yes_no(destination.is_retro()));
    println!("30W rule:    {}", yes_no(destination.uses_date_shift_rule()));
    if let Some((lat, lon)) = from {
        println!("Distance:    {:.1} m", destination.distance_meters(lat, lon)?);
    }
    println!(
        "Snapshot:    {}",
        serde_json::to_string(&destination.snapshot()?)?
    );
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "geohash_core=debug"
    } else {
        "geohash_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
