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

//! Append-only transaction log.
//!
//! A settlement first reserves its record, which claims the booking but stays
//! invisible to every read. Only [`TransactionStore::publish`] makes it
//! visible, and a published record is never removed. Ids come from a
//! monotonic sequence, so id order is reservation order.

use crate::base::{BookingId, IdSequence, TransactionId, UserId};
use crate::error::RentalError;
use crate::store::TransactionStore;
use crate::transaction::{NewTransaction, Transaction};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory [`TransactionStore`].
///
/// A [`DashMap`] keyed by booking enforces the one-record-per-booking rule
/// across reserved and published records.
#[derive(Debug, Default)]
pub struct MemoryTransactions {
    records: DashMap<TransactionId, Arc<Transaction>>,
    reserved: DashMap<TransactionId, Transaction>,
    by_booking: DashMap<BookingId, TransactionId>,
    ids: IdSequence,
}

impl MemoryTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of published records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Published records, oldest first.
    fn ordered(&self) -> Vec<Arc<Transaction>> {
        let mut records: Vec<Arc<Transaction>> = self
            .records
            .iter()
            .map(|record| Arc::clone(record.value()))
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }
}

impl TransactionStore for MemoryTransactions {
    fn reserve(&self, transaction: NewTransaction) -> Result<Transaction, RentalError> {
        // Entry API keeps check-and-insert atomic per booking.
        match self.by_booking.entry(transaction.booking_id) {
            Entry::Occupied(_) => Err(RentalError::InvalidState("booking already settled")),
            Entry::Vacant(entry) => {
                let record = Transaction {
                    id: self.ids.next(),
                    booking_id: transaction.booking_id,
                    payer: transaction.payer,
                    payee: transaction.payee,
                    lessor_id: transaction.lessor_id,
                    amount: transaction.amount,
                    created_at: Utc::now(),
                };
                self.reserved.insert(record.id, record.clone());
                entry.insert(record.id);
                Ok(record)
            }
        }
    }

    fn publish(&self, id: &TransactionId) -> Result<(), RentalError> {
        let (_, record) = self
            .reserved
            .remove(id)
            .ok_or(RentalError::NotFound("reserved transaction"))?;
        self.records.insert(record.id, Arc::new(record));
        Ok(())
    }

    fn discard(&self, id: &TransactionId) -> Result<(), RentalError> {
        let (_, record) = self
            .reserved
            .remove(id)
            .ok_or(RentalError::NotFound("reserved transaction"))?;
        self.by_booking
            .remove_if(&record.booking_id, |_, owner| owner == id);
        Ok(())
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, RentalError> {
        self.records
            .get(id)
            .map(|record| Transaction::clone(&record))
            .ok_or(RentalError::NotFound("transaction"))
    }

    fn find_by_booking(&self, booking: &BookingId) -> Result<Option<Transaction>, RentalError> {
        let Some(id) = self.by_booking.get(booking).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|record| Transaction::clone(&record)))
    }

    fn list_by_user(&self, user: &UserId) -> Result<Vec<Transaction>, RentalError> {
        Ok(self
            .ordered()
            .into_iter()
            .filter(|record| record.involves(user))
            .map(|record| Transaction::clone(&record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LessorId;
    use rust_decimal_macros::dec;

    fn transfer(booking: u32, payer: UserId, payee: UserId) -> NewTransaction {
        NewTransaction {
            booking_id: BookingId(booking),
            payer,
            payee,
            lessor_id: LessorId(1),
            amount: dec!(30.00),
        }
    }

    fn settle(log: &MemoryTransactions, booking: u32, payer: UserId, payee: UserId) -> Transaction {
        let record = log.reserve(transfer(booking, payer, payee)).unwrap();
        log.publish(&record.id).unwrap();
        record
    }

    #[test]
    fn second_record_for_a_booking_is_refused() {
        let log = MemoryTransactions::new();
        let (payer, payee) = (UserId::new(), UserId::new());
        let first = settle(&log, 1, payer, payee);
        assert_eq!(
            log.reserve(transfer(1, payer, payee)),
            Err(RentalError::InvalidState("booking already settled"))
        );
        assert_eq!(log.len(), 1);
        assert_eq!(log.find_by_booking(&BookingId(1)).unwrap(), Some(first));
    }

    #[test]
    fn reserved_record_is_invisible_until_published() {
        let log = MemoryTransactions::new();
        let (payer, payee) = (UserId::new(), UserId::new());
        let record = log.reserve(transfer(1, payer, payee)).unwrap();

        assert!(log.is_empty());
        assert_eq!(log.get(&record.id), Err(RentalError::NotFound("transaction")));
        assert_eq!(log.find_by_booking(&BookingId(1)).unwrap(), None);
        assert!(log.list_by_user(&payer).unwrap().is_empty());
        // The reservation still holds the booking.
        assert_eq!(
            log.reserve(transfer(1, payer, payee)),
            Err(RentalError::InvalidState("booking already settled"))
        );

        log.publish(&record.id).unwrap();
        assert_eq!(log.get(&record.id), Ok(record.clone()));
        assert_eq!(log.list_by_user(&payee).unwrap(), vec![record]);
    }

    #[test]
    fn discard_frees_the_booking() {
        let log = MemoryTransactions::new();
        let (payer, payee) = (UserId::new(), UserId::new());
        let record = log.reserve(transfer(1, payer, payee)).unwrap();
        log.discard(&record.id).unwrap();
        assert!(log.is_empty());
        assert_eq!(log.find_by_booking(&BookingId(1)).unwrap(), None);
        assert_eq!(
            log.discard(&record.id),
            Err(RentalError::NotFound("reserved transaction"))
        );
        assert_eq!(
            log.publish(&record.id),
            Err(RentalError::NotFound("reserved transaction"))
        );

        let again = log.reserve(transfer(1, payer, payee)).unwrap();
        assert_ne!(again.id, record.id);
    }

    #[test]
    fn published_records_cannot_be_discarded() {
        let log = MemoryTransactions::new();
        let (payer, payee) = (UserId::new(), UserId::new());
        let record = settle(&log, 1, payer, payee);
        assert_eq!(
            log.discard(&record.id),
            Err(RentalError::NotFound("reserved transaction"))
        );
        assert_eq!(log.find_by_booking(&BookingId(1)).unwrap(), Some(record));
    }

    #[test]
    fn listing_keeps_insertion_order_and_skips_discarded() {
        let log = MemoryTransactions::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let carol = UserId::new();
        let first = settle(&log, 1, alice, bob);
        let dropped = log.reserve(transfer(2, alice, bob)).unwrap();
        settle(&log, 3, carol, bob);
        let last = settle(&log, 4, bob, alice);
        log.discard(&dropped.id).unwrap();

        let ids: Vec<TransactionId> = log
            .list_by_user(&alice)
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![first.id, last.id]);
        assert_eq!(log.list_by_user(&bob).unwrap().len(), 3);
    }
}
