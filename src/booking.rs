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

//! Bookings and their lifecycle.
//!
//! ```text
//!   Pending ──settle──► Approved
//!      │
//!      └──reject──► Rejected
//! ```
//!
//! Both outcomes are terminal. A booking is only ever written through a
//! conditional update that names the status it expects to find.

use crate::base::{BookingId, IdSequence, ProductId, UserId};
use crate::error::RentalError;
use crate::store::BookingStore;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    /// Explains why a booking in this status cannot move on.
    pub(crate) fn refusal(&self) -> RentalError {
        match self {
            Self::Approved => RentalError::InvalidState("cannot update an already approved booking"),
            Self::Rejected => RentalError::InvalidState("cannot update a rejected booking"),
            Self::Pending => RentalError::InvalidState("booking is still pending"),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub renter: UserId,
    pub product_id: ProductId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a renter asks for.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub product_id: ProductId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<(), RentalError> {
        let mut problems = Vec::new();
        if self.product_id.0 == 0 {
            problems.push("product ID is required".to_string());
        }
        if self.end_date < self.start_date {
            problems.push("end date must not be before start date".to_string());
        }
        RentalError::check(problems)
    }
}

/// Row handed to [`BookingStore::insert`].
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub renter: UserId,
    pub product_id: ProductId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug)]
struct BookingRow {
    inner: Mutex<Booking>,
}

/// In-memory [`BookingStore`] with a lock per row.
#[derive(Debug, Default)]
pub struct MemoryBookings {
    rows: DashMap<BookingId, BookingRow>,
    ids: IdSequence,
}

impl MemoryBookings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookingStore for MemoryBookings {
    fn insert(&self, booking: NewBooking) -> Result<Booking, RentalError> {
        let now = Utc::now();
        let booking = Booking {
            id: self.ids.next(),
            renter: booking.renter,
            product_id: booking.product_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(
            booking.id,
            BookingRow {
                inner: Mutex::new(booking.clone()),
            },
        );
        Ok(booking)
    }

    fn get(&self, id: &BookingId) -> Result<Booking, RentalError> {
        self.rows
            .get(id)
            .map(|row| row.inner.lock().clone())
            .ok_or(RentalError::NotFound("booking"))
    }

    fn list_by_renter(&self, renter: &UserId) -> Result<Vec<Booking>, RentalError> {
        let mut bookings: Vec<Booking> = self
            .rows
            .iter()
            .map(|row| row.inner.lock().clone())
            .filter(|booking| booking.renter == *renter)
            .collect();
        bookings.sort_by_key(|booking| booking.id);
        Ok(bookings)
    }

    fn transition(
        &self,
        id: &BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, RentalError> {
        if !from.can_transition_to(to) {
            return Err(from.refusal());
        }
        let row = self.rows.get(id).ok_or(RentalError::NotFound("booking"))?;
        let mut booking = row.inner.lock();
        // Zero rows matched: someone else moved the booking first.
        if booking.status != from {
            return Err(booking.status.refusal());
        }
        booking.status = to;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}
