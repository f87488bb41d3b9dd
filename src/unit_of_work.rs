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

//! Transactional scope for settlements.
//!
//! [`SettlementScope`] applies mutations through the stores and journals how
//! to undo each one. Dropping the scope without calling
//! [`SettlementScope::commit`] reverts the journal in reverse order, so a
//! failure at any step leaves balances and the transaction log as they were.
//!
//! Transaction records are reserved, not published, until commit. If a
//! transfer cannot be reversed (the payee already spent the funds), the money
//! stays where it is and its reserved record is published instead of
//! discarded, so every balance change stays backed by a record.

use crate::base::{TransactionId, UserId};
use crate::error::RentalError;
use crate::store::Stores;
use crate::transaction::{NewTransaction, Transaction};
use rust_decimal::Decimal;

#[derive(Debug)]
enum Undo {
    Transfer {
        from: UserId,
        to: UserId,
        amount: Decimal,
    },
    Record {
        id: TransactionId,
    },
}

#[must_use = "dropping the scope rolls back every applied step"]
pub struct SettlementScope<'a> {
    stores: &'a Stores,
    undo: Vec<Undo>,
    committed: bool,
}

impl<'a> SettlementScope<'a> {
    pub fn begin(stores: &'a Stores) -> Self {
        Self {
            stores,
            undo: Vec::new(),
            committed: false,
        }
    }

    /// Moves `amount` from `from` to `to`. Returns the new `(from, to)`
    /// balances.
    pub fn transfer(
        &mut self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), RentalError> {
        let balances = self.stores.ledger.transfer(from, to, amount)?;
        self.undo.push(Undo::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        Ok(balances)
    }

    /// Reserves the transaction record. It becomes visible on commit.
    pub fn record(&mut self, transaction: NewTransaction) -> Result<Transaction, RentalError> {
        let record = self.stores.transactions.reserve(transaction)?;
        self.undo.push(Undo::Record { id: record.id });
        Ok(record)
    }

    /// Keeps every applied step and publishes reserved records.
    pub fn commit(mut self) {
        self.committed = true;
        for step in self.undo.drain(..) {
            if let Undo::Record { id } = step {
                if let Err(e) = self.stores.transactions.publish(&id) {
                    tracing::error!(transaction_id = %id, error = %e, "failed to publish transaction");
                }
            }
        }
    }

    fn rollback(&mut self) {
        let mut stranded = false;
        while let Some(step) = self.undo.pop() {
            let result = match &step {
                Undo::Transfer { from, to, amount } => {
                    let reversed = self.stores.ledger.transfer(to, from, *amount).map(drop);
                    stranded |= reversed.is_err();
                    reversed
                }
                Undo::Record { id } if stranded => self.stores.transactions.publish(id),
                Undo::Record { id } => self.stores.transactions.discard(id),
            };
            if let Err(e) = result {
                tracing::error!(?step, error = %e, "settlement rollback step failed");
            }
        }
        if stranded {
            tracing::error!("settlement transfer could not be reversed; kept with its record");
        }
    }
}

impl Drop for SettlementScope<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.undo.is_empty() {
            tracing::debug!(steps = self.undo.len(), "rolling back settlement");
            self.rollback();
        }
    }
}
