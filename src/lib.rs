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

//! # Rental Ledger
//!
//! Wallet ledger and booking settlement for a peer-to-peer game console
//! rental marketplace. Users top up a wallet, lessors list products, renters
//! book them, and a booking is settled by moving funds from the renter's
//! wallet to the lessor's.
//!
//! ## Core Components
//!
//! - [`Marketplace`]: facade over every operation
//! - [`SettlementEngine`]: booking creation, settlement and rejection
//! - [`SettlementScope`]: all-or-nothing scope around a settlement's writes
//! - [`LedgerStore`], [`BookingStore`], [`CatalogStore`], [`TransactionStore`]:
//!   store contracts, with in-memory implementations
//! - [`RentalError`]: error type shared by every operation
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rental_ledger_rs::{
//!     BookingRequest, BookingStatus, Config, ConsoleId, CredentialHash, Marketplace, NewLessor,
//!     NewUser, ProductDraft, SettlementRequest,
//! };
//! use rust_decimal_macros::dec;
//!
//! let config = Config::default().with_payment_api_key("sk_test");
//! let market = Marketplace::new(&config);
//!
//! let user = |name: &str| NewUser {
//!     name: name.to_string(),
//!     email: format!("{}@example.com", name.to_lowercase()),
//!     credential_hash: CredentialHash::new("!"),
//!     address: "1 Main St".to_string(),
//! };
//! let alice = market.register_user(user("Alice")).unwrap();
//! let bob = market.register_user(user("Bob")).unwrap();
//!
//! market
//!     .register_lessor(&bob.id, NewLessor { name: "Bob's Games".into(), location: "Jakarta".into() })
//!     .unwrap();
//! let product = market
//!     .list_product(
//!         &bob.id,
//!         ProductDraft {
//!             console_id: ConsoleId(1),
//!             name: "PS5".into(),
//!             description: "Two controllers".into(),
//!             rental_cost_per_month: dec!(30),
//!             stock_availability: 2,
//!         },
//!     )
//!     .unwrap();
//!
//! market.top_up(&alice.id, dec!(100)).unwrap();
//! let booking = market
//!     .create_booking(
//!         &alice.id,
//!         BookingRequest {
//!             product_id: product.id,
//!             start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!             end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
//!         },
//!     )
//!     .unwrap();
//!
//! let settlement = market
//!     .settle(&alice.id, SettlementRequest { booking_id: booking.id, amount: dec!(30) })
//!     .unwrap();
//! assert_eq!(settlement.payer_balance, dec!(70));
//! assert_eq!(market.booking(&alice.id, &booking.id).unwrap().status, BookingStatus::Approved);
//! market.shutdown();
//! ```
//!
//! ## Thread Safety
//!
//! Stores lock per row (per wallet, per booking), so operations on different
//! users and bookings run in parallel.

mod base;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
mod marketplace;
pub mod notify;
mod ownership;
pub mod rating;
pub mod settlement;
pub mod store;
pub mod telemetry;
pub mod topup;
mod transaction;
pub mod transaction_log;
pub mod unit_of_work;
pub mod user;

pub use base::{
    BookingId, CURRENCY_SCALE, ConsoleId, IdSequence, LessorId, ProductId, RatingId, TopupId,
    TransactionId, UserId, validate_amount,
};
pub use booking::{Booking, BookingRequest, BookingStatus, MemoryBookings, NewBooking};
pub use catalog::{Lessor, MemoryCatalog, NewLessor, Product, ProductDraft};
pub use config::{Config, LogFormat, Secret};
pub use error::{ErrorKind, RentalError};
pub use ledger::{MemoryLedger, Wallet, WalletSnapshot};
pub use marketplace::{Marketplace, WalletStatement};
pub use notify::{
    DeliveryError, LogSink, Notification, NotificationEvent, NotificationSink, NotificationWorker,
    Notifier,
};
pub use ownership::is_owner;
pub use rating::{MAX_STARS, Rating, RatingBook, RatingRequest};
pub use settlement::{Settlement, SettlementEngine, SettlementRequest};
pub use store::{BookingStore, CatalogStore, LedgerStore, Stores, TransactionStore};
pub use topup::{
    PaymentGateway, PaymentOutcome, PaymentStatus, SimulatedGateway, TopupHistory, TopupReceipt,
    TopupRecord,
};
pub use transaction::{NewTransaction, Transaction};
pub use transaction_log::MemoryTransactions;
pub use unit_of_work::SettlementScope;
pub use user::{Contact, CredentialHash, NewUser, User, UserDirectory};
