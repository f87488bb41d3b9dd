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

//! Wallet top-ups.
//!
//! The payment provider is reached through [`PaymentGateway`]. It only has to
//! say whether a charge went through and hand back a reference.

use crate::base::{IdSequence, TopupId, UserId};
use crate::config::Secret;
use crate::error::RentalError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Succeeded,
    Declined(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    /// Provider reference, kept even for declined charges.
    pub payment_id: String,
}

/// Charges a user's payment method.
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, user: &UserId, amount: Decimal) -> Result<PaymentOutcome, RentalError>;
}

/// Gateway that approves every charge once it has credentials.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    api_key: Secret,
}

impl SimulatedGateway {
    pub fn new(api_key: Secret) -> Self {
        Self { api_key }
    }
}

impl PaymentGateway for SimulatedGateway {
    fn charge(&self, user: &UserId, amount: Decimal) -> Result<PaymentOutcome, RentalError> {
        if self.api_key.expose().trim().is_empty() {
            return Err(RentalError::Internal(
                "payment API key is not configured".to_string(),
            ));
        }
        let payment_id = format!("pi_{}", Uuid::new_v4().simple());
        tracing::debug!(user_id = %user, amount = %amount, payment_id = %payment_id, "charge approved");
        Ok(PaymentOutcome {
            status: PaymentStatus::Succeeded,
            payment_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopupRecord {
    pub id: TopupId,
    pub user_id: UserId,
    pub payment_id: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Result of a completed top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopupReceipt {
    pub user_id: UserId,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub payment_id: String,
}

/// In-memory top-up history.
#[derive(Debug, Default)]
pub struct TopupHistory {
    records: DashMap<TopupId, TopupRecord>,
    ids: IdSequence,
}

impl TopupHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        user: UserId,
        payment_id: String,
        amount: Decimal,
    ) -> Result<TopupRecord, RentalError> {
        let record = TopupRecord {
            id: self.ids.next(),
            user_id: user,
            payment_id,
            amount,
            created_at: Utc::now(),
        };
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    /// A user's top-ups, oldest first.
    pub fn list_by_user(&self, user: &UserId) -> Vec<TopupRecord> {
        let mut records: Vec<TopupRecord> = self
            .records
            .iter()
            .filter(|record| record.user_id == *user)
            .map(|record| record.clone())
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }
}
