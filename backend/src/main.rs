//! Stockfilter CLI - export in-stock products from a spreadsheet as JSON
//!
//! ```bash
//! stockfilter serve                          # Start HTTP server (port 8000)
//! stockfilter convert inventario.xlsx        # Print the JSON document
//! stockfilter convert inventario.xlsx -s "Hoja 1" -o salida.json
//! stockfilter sheets inventario.xlsx         # List sheet names
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockfilter::{convert_file, list_sheets_file, AppConfig, ConvertOptions, FilterMode};

#[derive(Parser)]
#[command(name = "stockfilter")]
#[command(about = "Export in-stock products from a spreadsheet as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a spreadsheet and output the JSON document
    Convert {
        /// Input spreadsheet (.xlsx, .xls, .ods)
        input: PathBuf,

        /// Sheet to read (default: first sheet, or "Hoja 1" in strict mode)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Existence filter
        #[arg(short, long, value_enum, default_value_t = FilterMode::Lenient)]
        mode: FilterMode,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the sheets of a spreadsheet
    Sheets {
        /// Input spreadsheet
        input: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: STOCKFILTER_PORT, PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Existence filter (default: STOCKFILTER_MODE or lenient)
        #[arg(short, long, value_enum)]
        mode: Option<FilterMode>,

        /// Sheet used when an upload names none
        #[arg(long)]
        default_sheet: Option<String>,

        /// Seconds a converted document stays downloadable
        #[arg(long)]
        download_ttl: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            sheet,
            mode,
            output,
        } => cmd_convert(&input, sheet, mode, output.as_deref()),

        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Serve {
            port,
            mode,
            default_sheet,
            download_ttl,
        } => cmd_serve(port, mode, default_sheet, download_ttl).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    sheet: Option<String>,
    mode: FilterMode,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ConvertOptions::for_mode(mode).with_sheet(sheet);
    let document = convert_file(input, &options)?;

    eprintln!("   Sheet: {}", document.meta.sheet_name);
    eprintln!("   Total rows: {}", document.meta.total);
    eprintln!("   Existence column: {}", document.meta.existence_column_label());
    eprintln!("   EXISTENCIA = SI: {}", document.meta.existence_count);
    eprintln!("✅ Exported {} records", document.meta.output_count);

    write_output(&document.to_json_pretty()?, output)
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sheets = list_sheets_file(input)?;
    if sheets.is_empty() {
        eprintln!("📋 No sheets found in {}", input.display());
        return Ok(());
    }
    for name in sheets {
        println!("{}", name);
    }
    Ok(())
}

async fn cmd_serve(
    port: Option<u16>,
    mode: Option<FilterMode>,
    default_sheet: Option<String>,
    download_ttl: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env();
    if let Some(mode) = mode {
        config = config.with_mode(mode);
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(sheet) = default_sheet {
        config.default_sheet = Some(sheet);
    }
    if let Some(secs) = download_ttl {
        config.download_ttl = Duration::from_secs(secs);
    }

    stockfilter::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
