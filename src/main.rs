use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};

use tkr_receipts::ai::{self, ChatSession, GeminiClient};
use tkr_receipts::receipts::{self, ReceiptDatabase};
use tkr_receipts::tents::{self, BookingQuery};
use tkr_receipts::{
    Assets, Config, Error, JsonFileStore, Quotation, ReceiptDetails, ReceiptGenerator, Result,
};

#[derive(Parser)]
#[command(name = "tkr-receipts", version, about = "Bilingual receipts and quotations for Tripoli Karting Race")]
struct Cli {
    /// Directory holding the persisted store (overrides TKR_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Font directories, separated like PATH (overrides TKR_FONTS)
    #[arg(long, global = true)]
    fonts: Option<String>,

    /// Logo image path or URL (overrides TKR_LOGO)
    #[arg(long, global = true)]
    logo: Option<String>,

    /// Render without a logo
    #[arg(long, global = true)]
    no_logo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Number, render and record a receipt
    Receipt {
        /// Receipt form as JSON (camelCase fields); defaults when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Render without assigning a number or storing a record
        #[arg(long)]
        preview: bool,
    },
    /// Inspect and export stored receipts
    Receipts {
        #[command(subcommand)]
        action: ReceiptsAction,
    },
    /// AI-assisted quotations from a project PDF
    Quote {
        #[command(subcommand)]
        action: QuoteAction,
    },
    /// Tent layout overview
    Tents {
        /// available, reserved or occupied
        #[arg(long)]
        status: Option<String>,
    },
    /// Tent bookings table
    Bookings {
        #[arg(long, default_value = "")]
        search: String,
        /// reserved or occupied
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "date")]
        sort: String,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[derive(Subcommand)]
enum ReceiptsAction {
    List,
    Search { term: String },
    Show { id: String },
    Delete { id: String },
    Clear,
    Stats,
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum QuoteAction {
    /// Print the extracted scope items as JSON
    Extract { document: PathBuf },
    /// Build and render a quotation
    Build {
        document: PathBuf,
        /// JSON object mapping item id to unit price
        #[arg(long)]
        prices: Option<PathBuf>,
        /// Tax rate, e.g. 0.11
        #[arg(long, default_value_t = 0.0)]
        tax: f64,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Chat about a document, one message per line
    Chat { document: PathBuf },
}

fn config_from(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(fonts) = &cli.fonts {
        config.font_dirs = tkr_receipts::config::split_path_list(fonts);
    }
    if let Some(logo) = &cli.logo {
        config.logo = Some(logo.clone());
    }
    if cli.no_logo {
        config.logo = None;
    }
    config
}

fn gemini(config: &Config) -> Result<GeminiClient> {
    let key = config
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| Error::Ai("GEMINI_API_KEY (or API_KEY) is not set".to_string()))?;
    GeminiClient::new(key, config.gemini_model.as_str())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(cli: Cli) -> Result<()> {
    let config = config_from(&cli);
    let store = JsonFileStore::in_dir(&config.data_dir);

    match cli.command {
        Command::Receipt { input, out_dir, preview } => {
            let details: ReceiptDetails = match input {
                Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
                None => ReceiptDetails::default(),
            };
            let assets = tkr_receipts::load_assets(&config.font_candidates(), config.logo.as_deref());
            let generator = ReceiptGenerator::new(&store, &assets, config.receipt_prefix.as_str());
            let result = if preview {
                generator.preview(&details, &out_dir)?
            } else {
                generator.generate(&details, &out_dir)?
            };
            println!("{}", result.path.display());
        }
        Command::Receipts { action } => receipts_command(&store, action)?,
        Command::Quote { action } => quote_command(&config, action)?,
        Command::Tents { status } => {
            let status = status.map(|s| s.parse()).transpose()?;
            let all = tents::sample_tents();
            for tent in tents::filter_tents(&all, status) {
                println!(
                    "{:<4} {:<10} row {:>2} col {:>2}  {}{}",
                    tent.id,
                    tent.status,
                    tent.position.row,
                    tent.position.col,
                    tent.booked_by.as_deref().unwrap_or(""),
                    tent.hours.map(|h| format!(" ({h}h)")).unwrap_or_default(),
                );
            }
            let c = tents::tent_counts(&all);
            println!(
                "Available: {}  Reserved: {}  Occupied: {}  Total: {}",
                c.available, c.reserved, c.occupied, c.total
            );
        }
        Command::Bookings { search, status, sort, desc, page } => {
            let query = BookingQuery {
                search,
                status: status.map(|s| s.parse()).transpose()?,
                sort: sort.parse()?,
                descending: desc,
                page,
            };
            let bookings = tents::sample_bookings(Local::now().date_naive());
            let result = tents::query_bookings(&bookings, &query);
            for b in &result.rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}h\t{}\t{}",
                    b.booking_id,
                    b.tent_id,
                    b.contact,
                    b.date,
                    b.duration,
                    b.status,
                    b.notes.as_deref().unwrap_or("")
                );
            }
            println!(
                "Page {} of {} ({} matching of {} bookings)",
                result.page,
                result.total_pages.max(1),
                result.matched,
                bookings.len()
            );
        }
    }
    Ok(())
}

fn receipts_command(store: &JsonFileStore, action: ReceiptsAction) -> Result<()> {
    let db = ReceiptDatabase::new(store);
    match action {
        ReceiptsAction::List => print_receipts(&db.list()),
        ReceiptsAction::Search { term } => print_receipts(&db.search(&term)),
        ReceiptsAction::Show { id } => match db.get(&id) {
            Some(r) => println!("{}", serde_json::to_string_pretty(&r)?),
            None => return Err(Error::InvalidInput(format!("no receipt with id {id}"))),
        },
        ReceiptsAction::Delete { id } => {
            if !db.delete(&id)? {
                return Err(Error::InvalidInput(format!("no receipt with id {id}")));
            }
            println!("Deleted {id}");
        }
        ReceiptsAction::Clear => {
            db.clear()?;
            println!("All receipts deleted");
        }
        ReceiptsAction::Stats => println!("{}", serde_json::to_string_pretty(&db.stats())?),
        ReceiptsAction::Export { out } => {
            let path = out.unwrap_or_else(|| {
                PathBuf::from(receipts::export_file_name(Local::now().date_naive()))
            });
            std::fs::write(&path, db.export_csv())?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn print_receipts(list: &[receipts::StoredReceipt]) {
    for r in list {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.receipt_number, r.date, r.received_from, r.amount, r.tent_number, r.id
        );
    }
    println!("{} receipt(s)", list.len());
}

fn quote_command(config: &Config, action: QuoteAction) -> Result<()> {
    let client = gemini(config)?;
    match action {
        QuoteAction::Extract { document } => {
            let bytes = std::fs::read(&document)?;
            let items = ai::extract_scope(&client, &bytes, &file_label(&document))?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        QuoteAction::Build { document, prices, tax, out_dir } => {
            let name = file_label(&document);
            let items = ai::extract_scope(&client, &std::fs::read(&document)?, &name)?;
            let today = Local::now().date_naive();
            let mut quotation: Quotation = ai::build_quotation(&client, &items, &name, today);
            if let Some(prices) = prices {
                let unit_prices: HashMap<String, f64> =
                    serde_json::from_slice(&std::fs::read(prices)?)?;
                tkr_receipts::quotation::apply_prices(&mut quotation, &unit_prices, tax);
            }
            let assets = tkr_receipts::load_assets(&config.font_candidates(), None);
            let base = ai::base_name(&name);
            let path =
                tkr_receipts::generate_quotation(&quotation, &assets.fonts, &base, &out_dir)?;
            println!("{}", path.display());
        }
        QuoteAction::Chat { document } => {
            let name = file_label(&document);
            let items = ai::extract_scope(&client, &std::fs::read(&document)?, &name)?;
            let mut session = ChatSession::new(&client, &ai::chat_context(&name, &items)?);
            println!(
                "{} scope item(s) loaded. Type a question, or an empty line to quit.",
                items.len()
            );
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            loop {
                print!("> ");
                stdout.flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
                    break;
                }
                match session.send(line.trim()) {
                    Ok(reply) => println!("{reply}\n"),
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
