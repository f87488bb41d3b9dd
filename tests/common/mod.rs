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

//! Shared fixtures for integration tests.
//!
//! The `Faulty*` stores wrap the in-memory ones and fail on demand. One-shot
//! faults fire on the next matching call only, so rollback steps that go
//! through the same method still succeed.

#![allow(dead_code)]

use chrono::NaiveDate;
use parking_lot::Mutex;
use rental_ledger_rs::{
    Booking, BookingId, BookingRequest, BookingStatus, BookingStore, CatalogStore, Config,
    ConsoleId, CredentialHash, DeliveryError, Lessor, LessorId, LedgerStore, Marketplace,
    MemoryBookings, MemoryCatalog, MemoryLedger, MemoryTransactions, NewBooking, NewLessor,
    NewTransaction, NewUser, Notification, NotificationSink, PaymentGateway, PaymentOutcome,
    PaymentStatus, Product, ProductDraft, ProductId, RatingBook, RentalError, SimulatedGateway,
    Stores, TopupHistory, Transaction, TransactionId, TransactionStore, UserDirectory, UserId,
    WalletSnapshot,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn injected(what: &str) -> RentalError {
    RentalError::Internal(format!("injected {what} fault"))
}

// === Fault-injecting stores ===

#[derive(Default)]
pub struct FaultyLedger {
    inner: MemoryLedger,
    pub fail_next_open: AtomicBool,
    pub fail_next_transfer: AtomicBool,
}

impl LedgerStore for FaultyLedger {
    fn open(&self, user: UserId) -> Result<(), RentalError> {
        if self.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(injected("open"));
        }
        self.inner.open(user)
    }

    fn balance(&self, user: &UserId) -> Result<Decimal, RentalError> {
        self.inner.balance(user)
    }

    fn debit(&self, user: &UserId, amount: Decimal) -> Result<Decimal, RentalError> {
        self.inner.debit(user, amount)
    }

    fn credit(&self, user: &UserId, amount: Decimal) -> Result<Decimal, RentalError> {
        self.inner.credit(user, amount)
    }

    fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), RentalError> {
        if self.fail_next_transfer.swap(false, Ordering::SeqCst) {
            return Err(injected("transfer"));
        }
        self.inner.transfer(from, to, amount)
    }

    fn wallets(&self) -> Result<Vec<WalletSnapshot>, RentalError> {
        self.inner.wallets()
    }
}

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct FaultyBookings {
    inner: MemoryBookings,
    pub fail_next_transition: AtomicBool,
    before_transition: Mutex<Option<Hook>>,
}

impl FaultyBookings {
    /// Runs `hook` inside the next `transition`, before any injected fault.
    pub fn before_next_transition(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_transition.lock() = Some(Box::new(hook));
    }
}

impl BookingStore for FaultyBookings {
    fn insert(&self, booking: NewBooking) -> Result<Booking, RentalError> {
        self.inner.insert(booking)
    }

    fn get(&self, id: &BookingId) -> Result<Booking, RentalError> {
        self.inner.get(id)
    }

    fn list_by_renter(&self, renter: &UserId) -> Result<Vec<Booking>, RentalError> {
        self.inner.list_by_renter(renter)
    }

    fn transition(
        &self,
        id: &BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, RentalError> {
        let hook = self.before_transition.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_next_transition.swap(false, Ordering::SeqCst) {
            return Err(injected("transition"));
        }
        self.inner.transition(id, from, to)
    }
}

#[derive(Default)]
pub struct FaultyTransactions {
    inner: MemoryTransactions,
    pub fail_next_reserve: AtomicBool,
    pub fail_discard: AtomicBool,
}

impl TransactionStore for FaultyTransactions {
    fn reserve(&self, transaction: NewTransaction) -> Result<Transaction, RentalError> {
        if self.fail_next_reserve.swap(false, Ordering::SeqCst) {
            return Err(injected("reserve"));
        }
        self.inner.reserve(transaction)
    }

    fn publish(&self, id: &TransactionId) -> Result<(), RentalError> {
        self.inner.publish(id)
    }

    fn discard(&self, id: &TransactionId) -> Result<(), RentalError> {
        if self.fail_discard.load(Ordering::SeqCst) {
            return Err(injected("discard"));
        }
        self.inner.discard(id)
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, RentalError> {
        self.inner.get(id)
    }

    fn find_by_booking(&self, booking: &BookingId) -> Result<Option<Transaction>, RentalError> {
        self.inner.find_by_booking(booking)
    }

    fn list_by_user(&self, user: &UserId) -> Result<Vec<Transaction>, RentalError> {
        self.inner.list_by_user(user)
    }
}

#[derive(Default)]
pub struct FaultyCatalog {
    inner: MemoryCatalog,
    pub fail_stock: AtomicBool,
    pub fail_lessor_lookup: AtomicBool,
}

impl CatalogStore for FaultyCatalog {
    fn insert_lessor(&self, user: UserId, profile: NewLessor) -> Result<Lessor, RentalError> {
        self.inner.insert_lessor(user, profile)
    }

    fn lessor(&self, id: &LessorId) -> Result<Lessor, RentalError> {
        self.inner.lessor(id)
    }

    fn lessor_by_user(&self, user: &UserId) -> Result<Option<Lessor>, RentalError> {
        if self.fail_lessor_lookup.load(Ordering::SeqCst) {
            return Err(injected("lessor lookup"));
        }
        self.inner.lessor_by_user(user)
    }

    fn insert_product(
        &self,
        lessor: LessorId,
        draft: ProductDraft,
    ) -> Result<Product, RentalError> {
        self.inner.insert_product(lessor, draft)
    }

    fn product(&self, id: &ProductId) -> Result<Product, RentalError> {
        self.inner.product(id)
    }

    fn products_by_lessor(&self, lessor: &LessorId) -> Result<Vec<Product>, RentalError> {
        self.inner.products_by_lessor(lessor)
    }

    fn update_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RentalError> {
        self.inner.update_product(id, draft)
    }

    fn delete_product(&self, id: &ProductId) -> Result<Product, RentalError> {
        self.inner.delete_product(id)
    }

    fn decrement_stock(&self, id: &ProductId) -> Result<u32, RentalError> {
        if self.fail_stock.load(Ordering::SeqCst) {
            return Err(injected("stock"));
        }
        self.inner.decrement_stock(id)
    }

    fn increment_stock(&self, id: &ProductId) -> Result<u32, RentalError> {
        if self.fail_stock.load(Ordering::SeqCst) {
            return Err(injected("stock"));
        }
        self.inner.increment_stock(id)
    }
}

// === Sinks and gateways ===

#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.delivered.lock().push(notification.clone());
        Ok(())
    }
}

pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn deliver(&self, _: &Notification) -> Result<(), DeliveryError> {
        Err(DeliveryError("mail server unavailable".to_string()))
    }
}

pub struct DecliningGateway;

impl PaymentGateway for DecliningGateway {
    fn charge(&self, _: &UserId, _: Decimal) -> Result<PaymentOutcome, RentalError> {
        Ok(PaymentOutcome {
            status: PaymentStatus::Declined("card declined".to_string()),
            payment_id: "pi_declined".to_string(),
        })
    }
}

// === Harness ===

pub fn config() -> Config {
    Config::default().with_payment_api_key("sk_test")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        credential_hash: CredentialHash::new("$2a$10$opaque"),
        address: "1 Main St".to_string(),
    }
}

pub fn draft(cost: Decimal, stock: u32) -> ProductDraft {
    ProductDraft {
        console_id: ConsoleId(1),
        name: "PS5 Bundle".to_string(),
        description: "Console with two controllers".to_string(),
        rental_cost_per_month: cost,
        stock_availability: stock,
    }
}

pub fn january(product: ProductId) -> BookingRequest {
    BookingRequest {
        product_id: product,
        start_date: date(2025, 1, 1),
        end_date: date(2025, 1, 31),
    }
}

/// A renter, a lessor owner with one product, and a pending booking.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub renter: UserId,
    pub owner: UserId,
    pub product: ProductId,
    pub booking: BookingId,
}

pub struct Harness {
    pub market: Marketplace,
    pub ledger: Arc<FaultyLedger>,
    pub bookings: Arc<FaultyBookings>,
    pub transactions: Arc<FaultyTransactions>,
    pub catalog: Arc<FaultyCatalog>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(SimulatedGateway::new(config().payment_api_key)))
    }

    pub fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let ledger = Arc::new(FaultyLedger::default());
        let bookings = Arc::new(FaultyBookings::default());
        let transactions = Arc::new(FaultyTransactions::default());
        let catalog = Arc::new(FaultyCatalog::default());
        let sink = Arc::new(RecordingSink::default());
        let stores = Stores {
            users: Arc::new(UserDirectory::new()),
            ledger: ledger.clone(),
            catalog: catalog.clone(),
            bookings: bookings.clone(),
            transactions: transactions.clone(),
            topups: Arc::new(TopupHistory::new()),
            ratings: Arc::new(RatingBook::new()),
        };
        let market = Marketplace::with_parts(&config(), stores, gateway, sink.clone());
        Self {
            market,
            ledger,
            bookings,
            transactions,
            catalog,
            sink,
        }
    }

    /// Registers a user and tops their wallet up when `balance` is positive.
    pub fn user(&self, name: &str, balance: Decimal) -> UserId {
        let user = self.market.register_user(new_user(name)).unwrap();
        if balance > Decimal::ZERO {
            self.market.top_up(&user.id, balance).unwrap();
        }
        user.id
    }

    /// Makes `user` a lessor and lists one product.
    pub fn listing(&self, user: &UserId, cost: Decimal, stock: u32) -> ProductId {
        self.market
            .register_lessor(
                user,
                NewLessor {
                    name: "Game Shack".to_string(),
                    location: "Jakarta".to_string(),
                },
            )
            .unwrap();
        self.market.list_product(user, draft(cost, stock)).unwrap().id
    }

    pub fn scenario(&self, renter_balance: Decimal, owner_balance: Decimal) -> Scenario {
        let renter = self.user("Alice", renter_balance);
        let owner = self.user("Bob", owner_balance);
        let product = self.listing(&owner, Decimal::new(30, 0), 3);
        let booking = self.market.create_booking(&renter, january(product)).unwrap().id;
        Scenario {
            renter,
            owner,
            product,
            booking,
        }
    }

    pub fn balance(&self, user: &UserId) -> Decimal {
        self.market.balance(user).unwrap()
    }

    pub fn status(&self, booking: &BookingId) -> BookingStatus {
        self.bookings.get(booking).unwrap().status
    }

    /// Drains the notification queue and returns what was delivered.
    pub fn finish(self) -> Vec<Notification> {
        let sink = self.sink.clone();
        self.market.shutdown();
        sink.delivered()
    }
}
