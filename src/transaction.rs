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

//! Settled transfers.
//!
//! A [`Transaction`] is written once, when a settlement commits, and never
//! changes afterwards.

use crate::base::{BookingId, LessorId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub booking_id: BookingId,
    /// Renter whose wallet was debited.
    pub payer: UserId,
    /// Owner of the lessor profile whose wallet was credited.
    pub payee: UserId,
    pub lessor_id: LessorId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether `user` sits on either side of the transfer.
    pub fn involves(&self, user: &UserId) -> bool {
        self.payer == *user || self.payee == *user
    }
}

/// Fields handed to [`crate::TransactionStore::reserve`].
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub booking_id: BookingId,
    pub payer: UserId,
    pub payee: UserId,
    pub lessor_id: LessorId,
    pub amount: Decimal,
}
