use anyhow::Result;
use clap::{builder::NonEmptyStringValueParser, Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use std::path::Path;

use user_portal::config;
use user_portal::db::Database;
use user_portal::user_storage::UserStorage;

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "Inspect the user portal datastore", long_about = None)]
struct Cli {
    #[arg(
        long,
        env = "DATABASE",
        value_parser = NonEmptyStringValueParser::new(),
        help = "Path to the SQLite database file"
    )]
    database: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the tables if they do not exist")]
    Init,

    #[command(about = "List registered accounts")]
    Users,

    #[command(about = "List uploaded files")]
    Files {
        #[arg(short, long, help = "Only show files of this user")]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    config::load_env_file(Path::new(".env"));
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db = Database::connect(&cli.database).await?;
    db.migrate().await?;
    let storage = UserStorage::new(db);

    match cli.command {
        Commands::Init => {
            println!("✅ Database ready at {}", cli.database);
        }
        Commands::Users => list_users(&storage).await?,
        Commands::Files { user } => list_files(&storage, user.as_deref()).await?,
    }

    Ok(())
}

async fn list_users(storage: &UserStorage) -> Result<()> {
    let accounts = storage.list_accounts().await?;

    if accounts.is_empty() {
        println!("📭 No accounts registered yet.");
        return Ok(());
    }

    println!("\n👥 Accounts ({})\n", accounts.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Username"),
        Cell::new("Name"),
        Cell::new("Email"),
        Cell::new("Address"),
    ]));

    for account in accounts {
        table.add_row(Row::new(vec![
            Cell::new(&account.username),
            Cell::new(&format!("{} {}", account.first_name, account.last_name)),
            Cell::new(&account.email),
            Cell::new(&account.address),
        ]));
    }

    table.printstd();
    println!();

    Ok(())
}

async fn list_files(storage: &UserStorage, user: Option<&str>) -> Result<()> {
    let files = storage.list_files(user).await?;

    if files.is_empty() {
        match user {
            Some(user) => println!("📭 No files uploaded by {}.", user),
            None => println!("📭 No files uploaded yet."),
        }
        return Ok(());
    }

    println!("\n📚 Uploaded files ({})\n", files.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Owner"),
        Cell::new("Original name"),
        Cell::new("Stored name"),
        Cell::new("Words"),
        Cell::new("Uploaded"),
    ]));

    for file in files {
        table.add_row(Row::new(vec![
            Cell::new(&file.username),
            Cell::new(&file.original_filename),
            Cell::new(&file.stored_filename),
            Cell::new(&file.word_count.to_string()),
            Cell::new(&file.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ]));
    }

    table.printstd();
    println!();

    Ok(())
}
