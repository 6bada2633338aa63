use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::str::FromStr;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, macros::date};

use expense_tracker::{
    Amount, Category, Description, NewExpense, create_expense, initialize_db,
};

/// A utility for creating a database of sample expenses for manual testing.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const SAMPLE_EXPENSES: [(&str, &str, &str, Date); 7] = [
    ("45.99", "Food", "Lunch at cafe", date!(2024 - 01 - 15)),
    ("29.99", "Transport", "Monthly bus pass", date!(2024 - 01 - 14)),
    ("120.50", "Shopping", "New clothes", date!(2024 - 01 - 13)),
    ("15.75", "Entertainment", "Movie ticket", date!(2024 - 01 - 12)),
    ("89.99", "Utilities", "Internet bill", date!(2024 - 01 - 11)),
    ("25.00", "Food", "Groceries", date!(2024 - 01 - 10)),
    ("60.00", "Health", "Gym membership", date!(2024 - 01 - 09)),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'expenses.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating sample expenses...");

    for (amount, category, description, date) in SAMPLE_EXPENSES {
        let expense = create_expense(
            NewExpense {
                amount: Amount::new(Decimal::from_str(amount)?)?,
                category: Category::new(category)?,
                description: Description::new(description)?,
                date,
            },
            &conn,
        )?;

        println!("  {} {} {}", expense.date, expense.category, expense.amount);
    }

    println!("Success!");

    Ok(())
}
