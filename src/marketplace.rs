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

//! Marketplace facade.
//!
//! The [`Marketplace`] wires the stores, the settlement engine, the payment
//! gateway and the notification worker together and exposes every operation
//! the outer layers call. Each call takes the authenticated user id first.

use crate::base::{BookingId, CURRENCY_SCALE, LessorId, ProductId, TransactionId, UserId, validate_amount};
use crate::booking::{Booking, BookingRequest};
use crate::catalog::{Lessor, NewLessor, Product, ProductDraft};
use crate::config::Config;
use crate::error::RentalError;
use crate::notify::{LogSink, Notification, NotificationEvent, NotificationSink, NotificationWorker, Notifier};
use crate::ownership::is_owner;
use crate::rating::{Rating, RatingRequest};
use crate::settlement::{Settlement, SettlementEngine, SettlementRequest};
use crate::store::Stores;
use crate::topup::{PaymentGateway, PaymentStatus, SimulatedGateway, TopupReceipt, TopupRecord};
use crate::transaction::Transaction;
use crate::user::{Contact, NewUser, User};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;

/// Wallet balance paired with its owner's email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletStatement {
    pub user_id: UserId,
    pub email: String,
    pub balance: Decimal,
}

impl Serialize for WalletStatement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut balance = self.balance.round_dp(CURRENCY_SCALE);
        balance.rescale(CURRENCY_SCALE);

        let mut state = serializer.serialize_struct("WalletStatement", 3)?;
        state.serialize_field("user", &self.user_id)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("balance", &balance)?;
        state.end()
    }
}

pub struct Marketplace {
    stores: Stores,
    engine: SettlementEngine,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    sender: Contact,
    worker: NotificationWorker,
}

impl Marketplace {
    /// In-memory marketplace with the simulated gateway and notifications
    /// written to the log.
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            config,
            Stores::in_memory(),
            Arc::new(SimulatedGateway::new(config.payment_api_key.clone())),
            Arc::new(LogSink),
        )
    }

    pub fn with_parts(
        config: &Config,
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (notifier, worker) = NotificationWorker::spawn(sink, config.notification_queue_capacity);
        let sender = Contact {
            name: config.from_name.clone(),
            email: config.from_email.clone(),
        };
        let engine = SettlementEngine::new(stores.clone(), notifier.clone(), sender.clone());
        Self {
            stores,
            engine,
            gateway,
            notifier,
            sender,
            worker,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    // === Users ===

    /// Registers a user and opens their zero-balance wallet. If the wallet
    /// cannot be opened the registration is undone and the email stays free.
    pub fn register_user(&self, new_user: NewUser) -> Result<User, RentalError> {
        let user = self.stores.users.register(new_user)?;
        if let Err(e) = self.stores.ledger.open(user.id) {
            tracing::warn!(user_id = %user.id, error = %e, "wallet not opened, undoing registration");
            if let Err(undo) = self.stores.users.remove(&user.id) {
                tracing::error!(user_id = %user.id, error = %undo, "failed to undo registration");
            }
            return Err(e);
        }
        Ok(user)
    }

    pub fn user(&self, id: &UserId) -> Result<User, RentalError> {
        self.stores.users.get(id)
    }

    // === Lessors and products ===

    pub fn register_lessor(&self, user: &UserId, profile: NewLessor) -> Result<Lessor, RentalError> {
        profile.validate()?;
        self.stores.users.get(user)?;
        self.stores.catalog.insert_lessor(*user, profile)
    }

    pub fn lessor_profile(&self, user: &UserId) -> Result<Lessor, RentalError> {
        self.stores
            .catalog
            .lessor_by_user(user)?
            .ok_or(RentalError::NotFound("lessor"))
    }

    pub fn list_product(&self, user: &UserId, draft: ProductDraft) -> Result<Product, RentalError> {
        draft.validate()?;
        let lessor = self
            .stores
            .catalog
            .lessor_by_user(user)?
            .ok_or(RentalError::Forbidden("only lessors can list products"))?;
        self.stores.catalog.insert_product(lessor.id, draft)
    }

    pub fn update_product(
        &self,
        user: &UserId,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RentalError> {
        draft.validate()?;
        self.ensure_owner(user, id)?;
        self.stores.catalog.update_product(id, draft)
    }

    /// Soft-deletes a listing.
    pub fn delete_product(&self, user: &UserId, id: &ProductId) -> Result<Product, RentalError> {
        self.ensure_owner(user, id)?;
        self.stores.catalog.delete_product(id)
    }

    pub fn product(&self, id: &ProductId) -> Result<Product, RentalError> {
        self.stores.catalog.product(id)
    }

    pub fn products_of(&self, lessor: &LessorId) -> Result<Vec<Product>, RentalError> {
        self.stores.catalog.lessor(lessor)?;
        self.stores.catalog.products_by_lessor(lessor)
    }

    fn ensure_owner(&self, user: &UserId, product: &ProductId) -> Result<(), RentalError> {
        if is_owner(self.stores.catalog.as_ref(), user, product)? {
            Ok(())
        } else {
            Err(RentalError::Forbidden("only the owner can modify a product"))
        }
    }

    // === Wallet ===

    /// Charges the payment provider and credits the wallet.
    ///
    /// # Errors
    ///
    /// - [`RentalError::InvalidAmount`] - Amount is not a valid currency amount.
    /// - [`RentalError::NotFound`] - Unknown user.
    /// - [`RentalError::PaymentFailed`] - The provider declined the charge.
    pub fn top_up(&self, user: &UserId, amount: Decimal) -> Result<TopupReceipt, RentalError> {
        let amount = validate_amount(amount)?;
        let recipient = self.stores.users.contact(user)?;

        let outcome = self.gateway.charge(user, amount)?;
        if let PaymentStatus::Declined(reason) = outcome.status {
            tracing::warn!(user_id = %user, payment_id = %outcome.payment_id, %reason, "top-up declined");
            return Err(RentalError::PaymentFailed(reason));
        }

        let new_balance = self.stores.ledger.credit(user, amount)?;
        // The charge went through; history is secondary to the credit.
        if let Err(e) = self
            .stores
            .topups
            .record(*user, outcome.payment_id.clone(), amount)
        {
            tracing::error!(user_id = %user, payment_id = %outcome.payment_id, error = %e, "failed to record top-up");
        }

        self.notifier.enqueue(Notification {
            recipient,
            sender: self.sender.clone(),
            event: NotificationEvent::Topup {
                amount,
                new_balance,
                payment_id: outcome.payment_id.clone(),
            },
        });

        Ok(TopupReceipt {
            user_id: *user,
            amount,
            new_balance,
            payment_id: outcome.payment_id,
        })
    }

    pub fn topups_for(&self, user: &UserId) -> Result<Vec<TopupRecord>, RentalError> {
        self.stores.users.get(user)?;
        Ok(self.stores.topups.list_by_user(user))
    }

    pub fn balance(&self, user: &UserId) -> Result<Decimal, RentalError> {
        self.stores.ledger.balance(user)
    }

    /// Every wallet with its owner's email, sorted by email.
    pub fn wallets(&self) -> Result<Vec<WalletStatement>, RentalError> {
        let mut statements = self
            .stores
            .ledger
            .wallets()?
            .into_iter()
            .map(|wallet| {
                let user = self.stores.users.get(&wallet.user_id)?;
                Ok(WalletStatement {
                    user_id: wallet.user_id,
                    email: user.email,
                    balance: wallet.balance,
                })
            })
            .collect::<Result<Vec<_>, RentalError>>()?;
        statements.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(statements)
    }

    // === Bookings ===

    pub fn create_booking(
        &self,
        renter: &UserId,
        request: BookingRequest,
    ) -> Result<Booking, RentalError> {
        self.engine.create_booking(renter, request)
    }

    /// Looks up one of the renter's bookings. Other renters' bookings are
    /// reported as missing.
    pub fn booking(&self, renter: &UserId, id: &BookingId) -> Result<Booking, RentalError> {
        let booking = self.stores.bookings.get(id)?;
        if booking.renter != *renter {
            return Err(RentalError::NotFound("booking"));
        }
        Ok(booking)
    }

    pub fn bookings_for(&self, renter: &UserId) -> Result<Vec<Booking>, RentalError> {
        self.stores.bookings.list_by_renter(renter)
    }

    pub fn settle(
        &self,
        renter: &UserId,
        request: SettlementRequest,
    ) -> Result<Settlement, RentalError> {
        self.engine.settle(renter, request)
    }

    pub fn reject_booking(&self, user: &UserId, id: &BookingId) -> Result<Booking, RentalError> {
        self.engine.reject_booking(user, id)
    }

    // === Ratings ===

    /// Rates a live product. Each user rates a product once.
    pub fn rate_product(&self, user: &UserId, request: RatingRequest) -> Result<Rating, RentalError> {
        request.validate()?;
        self.stores.users.get(user)?;
        self.stores.catalog.product(&request.product_id)?;
        let rating = self.stores.ratings.insert(*user, request)?;
        tracing::debug!(rating_id = %rating.id, product_id = %rating.product_id, "product rated");
        Ok(rating)
    }

    pub fn ratings_for(&self, product: &ProductId) -> Result<Vec<Rating>, RentalError> {
        self.stores.catalog.product(product)?;
        Ok(self.stores.ratings.list_by_product(product))
    }

    pub fn average_rating(&self, product: &ProductId) -> Result<Decimal, RentalError> {
        self.stores.catalog.product(product)?;
        Ok(self.stores.ratings.average(product))
    }

    // === Transactions ===

    /// Looks up a transaction the user paid or received.
    pub fn transaction(&self, user: &UserId, id: &TransactionId) -> Result<Transaction, RentalError> {
        let transaction = self.stores.transactions.get(id)?;
        if !transaction.involves(user) {
            return Err(RentalError::NotFound("transaction"));
        }
        Ok(transaction)
    }

    pub fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>, RentalError> {
        self.stores.transactions.list_by_user(user)
    }

    /// Stops accepting notifications and waits for the queue to drain.
    pub fn shutdown(self) {
        let Self {
            engine,
            notifier,
            worker,
            ..
        } = self;
        drop(engine);
        drop(notifier);
        worker.join();
    }
}
