//! Firehose CLI: stream and decode Antelope firehose events.
//!
//! # Commands
//! ```text
//! firehose stream      --config <firehose.yaml>
//! firehose decode-row  --abi <abi.json> --hex <row hex> [--block <n>]
//! firehose decode-rows --abi <abi.json> --file <rows.txt> [--threads <n>]
//! firehose fetch-abi   --endpoint <url> --account <name>
//! firehose name        encode|decode <value>
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use firehose_abi::{
    decode_row, decode_rows_parallel, encode_name, name_to_string, string_to_name, RowInput,
    TypeRegistry,
};
use firehose_core::Abi;
use firehose_observability::{init_tracing, LogConfig};
use std::sync::Arc;
use std::time::Duration;

mod cmd_stream;

#[derive(Parser)]
#[command(
    name = "firehose",
    about = "Antelope firehose client: stream and decode chain events",
    long_about = "
Firehose CLI: subscribe to an Antelope firehose feed and print decoded
action traces, contract table rows, and fork notifications as JSON lines.
Also decodes packed contract rows offline against an ABI file.

ENVIRONMENT VARIABLES:
  RUST_LOG    Log filter, overrides the configured levels
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a feed and print every decoded event as one JSON line
    Stream {
        /// Path to the YAML or JSON config file
        #[arg(short, long)]
        config: String,
    },

    /// Decode one packed contract row against an ABI file
    #[command(name = "decode-row")]
    DecodeRow {
        /// Path to the contract ABI JSON (bare or a get_abi response)
        #[arg(long)]
        abi: String,
        /// Row payload as hex
        #[arg(long)]
        hex: String,
        /// Block number to stamp on the row
        #[arg(long, default_value_t = 0)]
        block: u64,
    },

    /// Decode a file of packed rows in parallel, one `[<block>] <hex>` per line
    #[command(name = "decode-rows")]
    DecodeRows {
        /// Path to the contract ABI JSON
        #[arg(long)]
        abi: String,
        /// File with one row per line
        #[arg(long)]
        file: String,
        /// Number of parallel Rayon threads (0 = use default)
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },

    /// Fetch a contract ABI from a chain API endpoint
    #[command(name = "fetch-abi")]
    FetchAbi {
        /// Chain API URL, e.g. https://eos.greymass.com
        #[arg(long)]
        endpoint: String,
        /// Contract account
        #[arg(long)]
        account: String,
        /// Save ABI to this file (default: stdout)
        #[arg(long)]
        output: Option<String>,
        /// Request timeout in milliseconds
        #[arg(long, default_value_t = 15_000)]
        timeout_ms: u64,
    },

    /// Convert between name strings and their packed 64-bit form
    Name {
        #[command(subcommand)]
        action: NameAction,
    },
}

#[derive(Subcommand)]
enum NameAction {
    /// Pack a name, printing the u64 and its little-endian wire hex
    Encode { name: String },
    /// Unpack a u64 (decimal) or wire hex (`0x` + 16 digits)
    Decode { value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stream { config } => cmd_stream::run(&config, cli.verbose).await,

        Commands::DecodeRow { abi, hex, block } => {
            init_cli_tracing(cli.verbose);
            cmd_decode_row(&abi, &hex, block)
        }

        Commands::DecodeRows { abi, file, threads } => {
            init_cli_tracing(cli.verbose);
            cmd_decode_rows(&abi, &file, threads)
        }

        Commands::FetchAbi {
            endpoint,
            account,
            output,
            timeout_ms,
        } => {
            init_cli_tracing(cli.verbose);
            cmd_fetch_abi(&endpoint, &account, output.as_deref(), timeout_ms).await
        }

        Commands::Name { action } => match action {
            NameAction::Encode { name } => cmd_name_encode(&name),
            NameAction::Decode { value } => cmd_name_decode(&value),
        },
    }
}

fn init_cli_tracing(verbose: bool) {
    let config = LogConfig {
        level: if verbose { "debug" } else { "warn" }.into(),
        ..LogConfig::default()
    };
    // a subscriber may already be installed
    let _ = init_tracing(&config);
}

// ─── Command implementations ─────────────────────────────────────────────────

fn load_registry(abi_path: &str) -> Result<Arc<TypeRegistry>> {
    let json = std::fs::read_to_string(abi_path)
        .with_context(|| format!("read ABI file '{}'", abi_path))?;
    let abi = Abi::from_json(&json).with_context(|| format!("parse ABI file '{}'", abi_path))?;
    Ok(Arc::new(TypeRegistry::from_abi(&abi)))
}

fn cmd_decode_row(abi_path: &str, hex_str: &str, block: u64) -> Result<()> {
    let registry = load_registry(abi_path)?;
    let input = RowInput::from_hex(block, hex_str)?;
    let row = decode_row(input.block_number, &input.bytes, &registry)?;
    println!("{}", serde_json::to_string_pretty(&row)?);
    Ok(())
}

fn parse_row_line(line: &str) -> Result<RowInput> {
    let mut parts = line.split_whitespace();
    let (block, hex_str) = match (parts.next(), parts.next()) {
        (Some(hex_str), None) => (0, hex_str),
        (Some(block), Some(hex_str)) => (
            block
                .parse::<u64>()
                .with_context(|| format!("invalid block number '{}'", block))?,
            hex_str,
        ),
        _ => bail!("empty row line"),
    };
    Ok(RowInput::from_hex(block, hex_str)?)
}

fn cmd_decode_rows(abi_path: &str, file: &str, threads: usize) -> Result<()> {
    use std::time::Instant;

    let registry = load_registry(abi_path)?;
    let contents =
        std::fs::read_to_string(file).with_context(|| format!("read rows file '{}'", file))?;

    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        rows.push(parse_row_line(line).with_context(|| format!("line {}", idx + 1))?);
    }

    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    let start = Instant::now();
    let results = decode_rows_parallel(&rows, &registry);
    let elapsed = start.elapsed();

    let mut errors = 0usize;
    for (idx, result) in results.iter().enumerate() {
        match result {
            Ok(row) => println!("{}", serde_json::to_string(row)?),
            Err(e) => {
                errors += 1;
                eprintln!("row {}: {}", idx, e);
            }
        }
    }

    eprintln!(
        "decoded {} of {} rows in {:.3}s ({} errors)",
        rows.len() - errors,
        rows.len(),
        elapsed.as_secs_f64(),
        errors
    );
    Ok(())
}

async fn cmd_fetch_abi(
    endpoint: &str,
    account: &str,
    output: Option<&str>,
    timeout_ms: u64,
) -> Result<()> {
    use firehose_registry::{ChainQuery, HttpChainQuery};

    let query = HttpChainQuery::new(endpoint, Duration::from_millis(timeout_ms))?;
    let abi = query
        .get_abi(account)
        .await
        .with_context(|| format!("fetch ABI of '{}' from {}", account, endpoint))?;
    if abi.structs.is_empty() && abi.tables.is_empty() && abi.actions.is_empty() {
        eprintln!("account '{}' has no ABI deployed", account);
    }

    let json = serde_json::to_string_pretty(&abi)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("write '{}'", path))?;
            eprintln!("saved ABI of '{}' to {}", account, path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_name_encode(name: &str) -> Result<()> {
    let value = string_to_name(name)?;
    println!("{}", value);
    println!("0x{}", hex::encode(encode_name(name)?));
    Ok(())
}

fn cmd_name_decode(value: &str) -> Result<()> {
    let packed = match value.strip_prefix("0x") {
        Some(digits) => {
            let bytes = hex::decode(digits).context("invalid hex")?;
            let bytes: [u8; 8] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("wire hex must be exactly 8 bytes"))?;
            u64::from_le_bytes(bytes)
        }
        None => value
            .parse::<u64>()
            .with_context(|| format!("invalid name value '{}'", value))?,
    };
    println!("{}", name_to_string(packed));
    Ok(())
}
