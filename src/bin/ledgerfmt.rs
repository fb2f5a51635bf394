use clap::{Parser, Subcommand};
use ledgerfmt::utils::parse_quantity;
use ledgerfmt::{
    Amount, CommodityStyle, Date, Diagnostic, Journal, Posting, Status, Transaction,
};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
    name = "ledgerfmt",
    about = "Decode plain-text ledger journals and re-encode them canonically.",
    version = VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode a journal and print it back in canonical aligned form.
    Fmt { input: String },
    /// Decode a journal and report diagnostics only.
    Check { input: String },
    /// Convert a CSV file of transactions into journal text.
    Import {
        input: String,
        /// Comma-separated order of CSV columns; valid names are
        /// date, payee, amount, and note.
        #[arg(long, default_value = "date,payee,amount,note")]
        fields: String,
        /// Format of dates in the CSV file.
        #[arg(long, default_value = "%m/%d/%Y")]
        date_format: String,
        /// Account of all the transactions.
        #[arg(long, default_value = "Assets:Checking")]
        account: String,
        /// Offsetting category (expense/income) account.
        #[arg(long, default_value = "Expenses:Uncategorized")]
        category: String,
        /// Set if the CSV file has no initial header line.
        #[arg(long)]
        no_header: bool,
    },
}

fn report(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        log::warn!("{}", diag);
    }
}

fn fmt(input: &str) -> io::Result<ExitCode> {
    let (journal, diagnostics) = Journal::from_file(input)?;
    report(&diagnostics);
    let stdout = io::stdout();
    journal.encode(stdout.lock())?;
    Ok(ExitCode::SUCCESS)
}

fn check(input: &str) -> io::Result<ExitCode> {
    let (journal, diagnostics) = Journal::from_file(input)?;
    for diag in &diagnostics {
        println!("{}", diag);
    }
    log::info!(
        "{}: {} transactions, {} diagnostics",
        input,
        journal.transactions().len(),
        diagnostics.len()
    );
    if diagnostics.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Field-mapping CSV conversion: every row becomes one transaction with
/// the mapped posting and an offsetting posting on the category account.
/// All rendering goes through [`Journal::encode`].
fn import(
    input: &str,
    fields: &str,
    date_format: &str,
    account: &str,
    category: &str,
    has_header: bool,
) -> io::Result<ExitCode> {
    let fields: Vec<&str> = fields.split(',').map(str::trim).collect();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .from_path(input)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    let account: Arc<String> = Arc::new(account.to_string());
    let category: Arc<String> = Arc::new(category.to_string());

    let mut transactions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let field = |name: &str| {
            fields
                .iter()
                .position(|f| *f == name)
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .trim()
        };

        let date = match Date::parse_from_str(field("date"), date_format) {
            Ok(date) => date,
            Err(err) => {
                log::warn!("row {}: bad date {:?}: {}", row + 1, field("date"), err);
                continue;
            }
        };
        let quantity = match parse_quantity(field("amount")) {
            Some(quantity) => quantity,
            None => {
                log::warn!("row {}: bad amount {:?}", row + 1, field("amount"));
                continue;
            }
        };
        let note = match field("note") {
            "" => None,
            text => Some(text.to_string()),
        };

        let postings = vec![
            Posting {
                status: None,
                account: account.clone(),
                amount: Amount::new(quantity.clone(), "$", CommodityStyle::Prefix),
                exchange: None,
                note,
            },
            Posting {
                status: None,
                account: category.clone(),
                amount: Amount::new(-quantity, "$", CommodityStyle::Prefix),
                exchange: None,
                note: None,
            },
        ];
        transactions.push(Transaction::new(
            date,
            Status::Unmarked,
            field("payee"),
            None,
            postings,
        ));
    }

    let journal = Journal::new(transactions);
    let stdout = io::stdout();
    journal.encode(stdout.lock())?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> io::Result<ExitCode> {
    pretty_env_logger::init();
    let args = Cli::parse();
    let code = match &args.command {
        Commands::Fmt { input } => fmt(input)?,
        Commands::Check { input } => check(input)?,
        Commands::Import {
            input,
            fields,
            date_format,
            account,
            category,
            no_header,
        } => import(input, fields, date_format, account, category, !no_header)?,
    };
    io::stdout().flush()?;
    Ok(code)
}
