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

//! Store contracts.
//!
//! The settlement engine only talks to persistence through these traits. The
//! crate ships in-memory implementations; a database adapter would implement
//! the same contracts with row-level locking or conditional `UPDATE`s.
//!
//! Every balance mutation is a relative adjustment applied by the store under
//! its own lock. Callers never write back a previously read balance.

use crate::base::{BookingId, LessorId, ProductId, TransactionId, UserId};
use crate::booking::{Booking, BookingStatus, MemoryBookings, NewBooking};
use crate::catalog::{Lessor, MemoryCatalog, NewLessor, Product, ProductDraft};
use crate::error::RentalError;
use crate::ledger::{MemoryLedger, WalletSnapshot};
use crate::rating::RatingBook;
use crate::topup::TopupHistory;
use crate::transaction::{NewTransaction, Transaction};
use crate::transaction_log::MemoryTransactions;
use crate::user::UserDirectory;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Per-user wallet balances.
pub trait LedgerStore: Send + Sync {
    /// Opens a zero-balance wallet.
    fn open(&self, user: UserId) -> Result<(), RentalError>;

    fn balance(&self, user: &UserId) -> Result<Decimal, RentalError>;

    /// Subtracts `amount`, failing with [`RentalError::InsufficientFunds`]
    /// if the balance would go negative. Returns the new balance.
    fn debit(&self, user: &UserId, amount: Decimal) -> Result<Decimal, RentalError>;

    /// Adds `amount`. Returns the new balance.
    fn credit(&self, user: &UserId, amount: Decimal) -> Result<Decimal, RentalError>;

    /// Moves `amount` from `from` to `to` as one step: either both balances
    /// change or neither does. Returns the new `(from, to)` balances.
    fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), RentalError>;

    fn wallets(&self) -> Result<Vec<WalletSnapshot>, RentalError>;
}

/// Lessor profiles and their product listings.
pub trait CatalogStore: Send + Sync {
    fn insert_lessor(&self, user: UserId, profile: NewLessor) -> Result<Lessor, RentalError>;

    fn lessor(&self, id: &LessorId) -> Result<Lessor, RentalError>;

    /// Returns `None` when the user has no lessor profile.
    fn lessor_by_user(&self, user: &UserId) -> Result<Option<Lessor>, RentalError>;

    fn insert_product(&self, lessor: LessorId, draft: ProductDraft)
    -> Result<Product, RentalError>;

    /// Looks up a live (not deleted) product.
    fn product(&self, id: &ProductId) -> Result<Product, RentalError>;

    fn products_by_lessor(&self, lessor: &LessorId) -> Result<Vec<Product>, RentalError>;

    fn update_product(&self, id: &ProductId, draft: ProductDraft)
    -> Result<Product, RentalError>;

    /// Soft-deletes a product.
    fn delete_product(&self, id: &ProductId) -> Result<Product, RentalError>;

    /// Takes one unit of stock. Returns the remaining count.
    fn decrement_stock(&self, id: &ProductId) -> Result<u32, RentalError>;

    /// Returns one unit of stock. Returns the new count.
    fn increment_stock(&self, id: &ProductId) -> Result<u32, RentalError>;
}

/// Booking rows keyed by id.
pub trait BookingStore: Send + Sync {
    /// Stores a new booking in [`BookingStatus::Pending`].
    fn insert(&self, booking: NewBooking) -> Result<Booking, RentalError>;

    fn get(&self, id: &BookingId) -> Result<Booking, RentalError>;

    fn list_by_renter(&self, renter: &UserId) -> Result<Vec<Booking>, RentalError>;

    /// Conditional status update: changes the row only if its current status
    /// is `from`. A row that does not match reports
    /// [`RentalError::InvalidState`] instead of succeeding silently.
    fn transition(
        &self,
        id: &BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, RentalError>;
}

/// Append-only log of completed transfers.
pub trait TransactionStore: Send + Sync {
    /// Reserves a record without making it visible. At most one record,
    /// reserved or published, may reference a booking.
    fn reserve(&self, transaction: NewTransaction) -> Result<Transaction, RentalError>;

    /// Makes a reserved record visible. Published records are never removed.
    fn publish(&self, id: &TransactionId) -> Result<(), RentalError>;

    /// Drops a reservation whose settlement did not commit.
    fn discard(&self, id: &TransactionId) -> Result<(), RentalError>;

    /// Looks up a published record.
    fn get(&self, id: &TransactionId) -> Result<Transaction, RentalError>;

    fn find_by_booking(&self, booking: &BookingId) -> Result<Option<Transaction>, RentalError>;

    /// Published records where the user is payer or payee, oldest first.
    fn list_by_user(&self, user: &UserId) -> Result<Vec<Transaction>, RentalError>;
}

/// Every store the marketplace works with.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<UserDirectory>,
    pub ledger: Arc<dyn LedgerStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub topups: Arc<TopupHistory>,
    pub ratings: Arc<RatingBook>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(UserDirectory::new()),
            ledger: Arc::new(MemoryLedger::new()),
            catalog: Arc::new(MemoryCatalog::new()),
            bookings: Arc::new(MemoryBookings::new()),
            transactions: Arc::new(MemoryTransactions::new()),
            topups: Arc::new(TopupHistory::new()),
            ratings: Arc::new(RatingBook::new()),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::in_memory()
    }
}
