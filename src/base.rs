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

//! Core identifier types and currency rules.

use crate::error::RentalError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

/// Number of decimal places stored for currency fields.
pub const CURRENCY_SCALE: u32 = 2;

/// Unique identifier for a user (renter or lessor owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares a `u32` backed identifier with the same shape as the others.
macro_rules! serial_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

serial_id!(
    /// Identifier of a lessor profile.
    LessorId
);
serial_id!(
    /// Identifier of a product listing.
    ProductId
);
serial_id!(
    /// Identifier of a console model a product belongs to.
    ConsoleId
);
serial_id!(
    /// Identifier of a booking.
    BookingId
);
serial_id!(
    /// Identifier of a settled transaction.
    ///
    /// Transaction IDs are globally unique and never reused.
    TransactionId
);
serial_id!(
    /// Identifier of a wallet top-up record.
    TopupId
);
serial_id!(
    /// Identifier of a product rating.
    RatingId
);

/// Monotonic id allocator, starting at 1 like a serial column.
#[derive(Debug)]
pub struct IdSequence(AtomicU32);

impl IdSequence {
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Allocates the next id.
    pub fn next<T: From<u32>>(&self) -> T {
        T::from(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that `amount` is positive and fits the currency scale.
///
/// # Errors
///
/// Returns [`RentalError::InvalidAmount`] for zero, negative, or over-precise amounts.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, RentalError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > CURRENCY_SCALE {
        return Err(RentalError::InvalidAmount);
    }
    Ok(amount)
}
