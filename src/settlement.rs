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

//! Settlement engine.
//!
//! Creates bookings and turns a pending booking into a completed transfer:
//!
//! 1. Resolve product, lessor and the lessor's owning user (the payee).
//! 2. Reserve the transaction record, then move the funds from renter to
//!    payee in one ledger transfer.
//! 3. Flip the booking `Pending -> Approved`. This is the commit point; the
//!    record becomes visible only after it.
//!
//! Step 2 and 3 run inside a [`SettlementScope`]; any failure reverts what was
//! already applied. A per-booking claim makes sure only one settlement or
//! rejection works on a booking at a time, and the store's conditional status
//! update backs it up.

use crate::base::{BookingId, LessorId, ProductId, TransactionId, UserId, validate_amount};
use crate::booking::{Booking, BookingRequest, BookingStatus, NewBooking};
use crate::error::RentalError;
use crate::notify::{Notification, NotificationEvent, Notifier};
use crate::ownership::is_owner;
use crate::store::Stores;
use crate::transaction::NewTransaction;
use crate::unit_of_work::SettlementScope;
use crate::user::Contact;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementRequest {
    pub booking_id: BookingId,
    pub amount: Decimal,
}

/// Outcome of a committed settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub transaction_id: TransactionId,
    pub booking_id: BookingId,
    pub payer: UserId,
    pub payee: UserId,
    pub lessor_id: LessorId,
    pub amount: Decimal,
    pub payer_balance: Decimal,
    pub payee_balance: Decimal,
}

/// Releases a booking claim when dropped.
struct Claim<'a> {
    claims: &'a DashMap<BookingId, ()>,
    booking: BookingId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.claims.remove(&self.booking);
    }
}

pub struct SettlementEngine {
    stores: Stores,
    notifier: Notifier,
    sender: Contact,
    claims: DashMap<BookingId, ()>,
}

impl SettlementEngine {
    pub fn new(stores: Stores, notifier: Notifier, sender: Contact) -> Self {
        Self {
            stores,
            notifier,
            sender,
            claims: DashMap::new(),
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Books a product for `renter`.
    ///
    /// Stock is taken best-effort: a booking is still created when the
    /// counter is already at zero or cannot be updated.
    ///
    /// # Errors
    ///
    /// - [`RentalError::Validation`] - Dates are out of order.
    /// - [`RentalError::NotFound`] - Unknown product or renter.
    /// - [`RentalError::Forbidden`] - The renter owns the product.
    pub fn create_booking(
        &self,
        renter: &UserId,
        request: BookingRequest,
    ) -> Result<Booking, RentalError> {
        request.validate()?;
        let product = self.stores.catalog.product(&request.product_id)?;
        if is_owner(self.stores.catalog.as_ref(), renter, &product.id)? {
            return Err(RentalError::Forbidden("lessors cannot book their own products"));
        }
        self.stores.users.get(renter)?;

        let booking = self.stores.bookings.insert(NewBooking {
            renter: *renter,
            product_id: product.id,
            start_date: request.start_date,
            end_date: request.end_date,
        })?;

        match self.stores.catalog.decrement_stock(&product.id) {
            Ok(remaining) => tracing::debug!(product_id = %product.id, remaining, "stock taken"),
            Err(e) => tracing::warn!(
                booking_id = %booking.id,
                product_id = %product.id,
                error = %e,
                "failed to decrement stock"
            ),
        }

        self.notify(
            renter,
            NotificationEvent::Booking {
                booking_id: booking.id,
                status: booking.status,
                amount: product.rental_cost_per_month,
            },
        );
        Ok(booking)
    }

    /// Pays for a pending booking and approves it.
    ///
    /// # Errors
    ///
    /// - [`RentalError::InvalidAmount`] - Amount is not a valid currency amount.
    /// - [`RentalError::NotFound`] - Unknown booking, product, lessor or wallet.
    /// - [`RentalError::Forbidden`] - The booking belongs to someone else.
    /// - [`RentalError::InvalidState`] - The booking is not pending, or another
    ///   settlement holds it.
    /// - [`RentalError::InsufficientFunds`] - Renter balance is below `amount`.
    ///
    /// Any store fault inside the scope is returned after rollback.
    pub fn settle(
        &self,
        renter: &UserId,
        request: SettlementRequest,
    ) -> Result<Settlement, RentalError> {
        let amount = validate_amount(request.amount)?;
        let booking = self.stores.bookings.get(&request.booking_id)?;
        if booking.renter != *renter {
            return Err(RentalError::Forbidden("booking belongs to another user"));
        }

        let _claim = self.claim(booking.id)?;
        // Re-read under the claim; a rival may have finished in between.
        let booking = self.stores.bookings.get(&booking.id)?;
        if booking.status != BookingStatus::Pending {
            return Err(booking.status.refusal());
        }

        let product = self.stores.catalog.product(&booking.product_id)?;
        let lessor = self.stores.catalog.lessor(&product.lessor_id)?;
        let payee = lessor.user_id;

        if self.stores.ledger.balance(renter)? < amount {
            return Err(RentalError::InsufficientFunds);
        }

        let mut scope = SettlementScope::begin(&self.stores);
        let record = scope.record(NewTransaction {
            booking_id: booking.id,
            payer: *renter,
            payee,
            lessor_id: lessor.id,
            amount,
        })?;
        let (payer_balance, payee_balance) = scope.transfer(renter, &payee, amount)?;
        self.stores
            .bookings
            .transition(&booking.id, BookingStatus::Pending, BookingStatus::Approved)?;
        scope.commit();

        tracing::info!(
            booking_id = %booking.id,
            transaction_id = %record.id,
            payer = %renter,
            payee = %payee,
            amount = %amount,
            "booking settled"
        );

        self.notify(
            renter,
            NotificationEvent::Booking {
                booking_id: booking.id,
                status: BookingStatus::Approved,
                amount,
            },
        );
        for (user, balance) in [(*renter, payer_balance), (payee, payee_balance)] {
            self.notify(
                &user,
                NotificationEvent::Transfer {
                    transaction_id: record.id,
                    booking_id: booking.id,
                    amount,
                    balance,
                    user_id: user,
                },
            );
        }

        Ok(Settlement {
            transaction_id: record.id,
            booking_id: booking.id,
            payer: *renter,
            payee,
            lessor_id: lessor.id,
            amount,
            payer_balance,
            payee_balance,
        })
    }

    /// Rejects a pending booking on behalf of the product's owner and gives
    /// the unit of stock back.
    pub fn reject_booking(&self, user: &UserId, id: &BookingId) -> Result<Booking, RentalError> {
        let booking = self.stores.bookings.get(id)?;
        if !is_owner(self.stores.catalog.as_ref(), user, &booking.product_id)? {
            return Err(RentalError::Forbidden(
                "only the product owner can reject a booking",
            ));
        }
        let product = self.stores.catalog.product(&booking.product_id)?;

        let _claim = self.claim(booking.id)?;
        let booking =
            self.stores
                .bookings
                .transition(id, BookingStatus::Pending, BookingStatus::Rejected)?;

        self.restock(&booking.id, &product.id);
        self.notify(
            &booking.renter,
            NotificationEvent::Booking {
                booking_id: booking.id,
                status: booking.status,
                amount: product.rental_cost_per_month,
            },
        );
        Ok(booking)
    }

    fn claim(&self, booking: BookingId) -> Result<Claim<'_>, RentalError> {
        match self.claims.entry(booking) {
            Entry::Occupied(_) => Err(RentalError::InvalidState("settlement already in progress")),
            Entry::Vacant(entry) => {
                entry.insert(());
                Ok(Claim {
                    claims: &self.claims,
                    booking,
                })
            }
        }
    }

    fn restock(&self, booking: &BookingId, product: &ProductId) {
        if let Err(e) = self.stores.catalog.increment_stock(product) {
            tracing::warn!(booking_id = %booking, product_id = %product, error = %e, "failed to restock");
        }
    }

    fn notify(&self, user: &UserId, event: NotificationEvent) {
        match self.stores.users.contact(user) {
            Ok(recipient) => self.notifier.enqueue(Notification {
                recipient,
                sender: self.sender.clone(),
                event,
            }),
            Err(e) => tracing::warn!(user_id = %user, error = %e, "no contact for notification"),
        }
    }
}
