// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::NaiveDate;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rental_ledger_rs::telemetry::init_tracing;
use rental_ledger_rs::{
    BookingId, BookingRequest, Config, ConsoleId, CredentialHash, Marketplace, NewLessor, NewUser,
    ProductDraft, ProductId, RentalError, SettlementRequest, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;

/// Rental Ledger - Replay marketplace scripts
///
/// Reads marketplace commands from a CSV file, runs them against an in-memory
/// marketplace and writes every wallet balance to stdout.
#[derive(Parser, Debug)]
#[command(name = "rental-ledger-rs")]
#[command(about = "Replays a CSV script of rental marketplace commands", long_about = None)]
struct Args {
    /// Path to CSV file with commands
    ///
    /// Expected format: type,user,target,amount,start,end
    /// Example: cargo run -- script.csv > wallets.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    #[command(flatten)]
    config: Config,
}

#[derive(Debug, Error)]
enum ReplayError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Rental(#[from] RentalError),
}

fn main() {
    let args = Args::parse();
    init_tracing(args.config.log_format);

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(path = %args.input.display(), error = %e, "cannot open input");
            process::exit(1);
        }
    };

    let market = Marketplace::new(&args.config);
    if let Err(e) = replay(&market, BufReader::new(file)) {
        tracing::error!(error = %e, "replay failed");
        process::exit(1);
    }

    let written = write_wallets(&market, std::io::stdout());
    market.shutdown();
    if let Err(e) = written {
        tracing::error!(error = %e, "cannot write output");
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, user, target, amount, start, end`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    user: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    target: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    end: Option<NaiveDate>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Register,
    Lessor,
    Topup(Decimal),
    List { stock: u32, cost: Decimal },
    Book { product: ProductId, start: NaiveDate, end: NaiveDate },
    Settle { booking: BookingId, amount: Decimal },
    Reject(BookingId),
}

impl CsvRecord {
    /// Returns `None` for unknown types or missing required fields.
    fn into_command(self) -> Option<(String, Command)> {
        let command = match self.kind.to_lowercase().as_str() {
            "register" => Command::Register,
            "lessor" => Command::Lessor,
            "topup" => Command::Topup(self.amount?),
            "list" => Command::List {
                stock: self.target?,
                cost: self.amount?,
            },
            "book" => Command::Book {
                product: ProductId(self.target?),
                start: self.start?,
                end: self.end?,
            },
            "settle" => Command::Settle {
                booking: BookingId(self.target?),
                amount: self.amount?,
            },
            "reject" => Command::Reject(BookingId(self.target?)),
            _ => return None,
        };
        Some((self.user, command))
    }
}

/// Part of the email before the `@`.
fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn apply(market: &Marketplace, email: &str, command: Command) -> Result<(), RentalError> {
    if command == Command::Register {
        market.register_user(NewUser {
            name: local_part(email).to_string(),
            email: email.to_string(),
            credential_hash: CredentialHash::new("!"),
            address: "-".to_string(),
        })?;
        return Ok(());
    }

    let user: UserId = market.stores().users.find_by_email(email)?.id;
    match command {
        Command::Register => {}
        Command::Lessor => {
            market.register_lessor(
                &user,
                NewLessor {
                    name: format!("{} rentals", local_part(email)),
                    location: "-".to_string(),
                },
            )?;
        }
        Command::Topup(amount) => {
            market.top_up(&user, amount)?;
        }
        Command::List { stock, cost } => {
            market.list_product(
                &user,
                ProductDraft {
                    console_id: ConsoleId(1),
                    name: format!("{} console", local_part(email)),
                    description: "-".to_string(),
                    rental_cost_per_month: cost,
                    stock_availability: stock,
                },
            )?;
        }
        Command::Book { product, start, end } => {
            market.create_booking(
                &user,
                BookingRequest {
                    product_id: product,
                    start_date: start,
                    end_date: end,
                },
            )?;
        }
        Command::Settle { booking, amount } => {
            market.settle(&user, SettlementRequest { booking_id: booking, amount })?;
        }
        Command::Reject(booking) => {
            market.reject_booking(&user, &booking)?;
        }
    }
    Ok(())
}

/// Replays commands from a CSV reader.
///
/// Rows are streamed. Malformed rows and commands that fail are logged and
/// skipped.
///
/// # Example
///
/// ```csv
/// type,user,target,amount,start,end
/// register,alice@example.com,,,,
/// topup,alice@example.com,,100.00,,
/// book,alice@example.com,1,,2025-01-01,2025-01-31
/// settle,alice@example.com,1,30.00,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader itself fails.
fn replay<R: Read>(market: &Marketplace, reader: R) -> Result<(), ReplayError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = line + 2, error = %e, "skipping malformed row");
                continue;
            }
        };
        let Some((email, command)) = record.into_command() else {
            tracing::warn!(line = line + 2, "skipping invalid command");
            continue;
        };
        if let Err(e) = apply(market, &email, command) {
            tracing::warn!(line = line + 2, user = %email, error = %e, "command failed");
        }
    }
    Ok(())
}

/// Writes every wallet as `user,email,balance`, sorted by email.
fn write_wallets<W: Write>(market: &Marketplace, writer: W) -> Result<(), ReplayError> {
    let mut wtr = Writer::from_writer(writer);
    for statement in market.wallets()? {
        wtr.serialize(&statement)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
