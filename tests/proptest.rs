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

//! Property-based tests for settlement.
//!
//! These tests check invariants that must hold for any amounts and any
//! interleaving of top-ups, bookings, settlements and rejections.

mod common;

use common::Harness;
use proptest::prelude::*;
use rental_ledger_rs::{BookingId, BookingStatus, RentalError, SettlementRequest};
use rust_decimal::Decimal;
use std::collections::HashMap;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// A currency amount between 0.01 and 1000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A balance between 0.00 and 1000.00.
fn arb_balance() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum Op {
    TopUp(Decimal),
    Book,
    Settle { booking: usize, amount: Decimal },
    Reject { booking: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_amount().prop_map(Op::TopUp),
        Just(Op::Book),
        (0usize..8, arb_amount()).prop_map(|(booking, amount)| Op::Settle { booking, amount }),
        (0usize..8).prop_map(|booking| Op::Reject { booking }),
    ]
}

// =============================================================================
// Settlement Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A settlement either moves exactly `amount` or moves nothing, and the
    /// combined balance never changes.
    #[test]
    fn settlement_conserves_funds(
        renter_balance in arb_balance(),
        owner_balance in arb_balance(),
        amount in arb_amount(),
    ) {
        let h = Harness::new();
        let s = h.scenario(renter_balance, owner_balance);

        let result = h.market.settle(
            &s.renter,
            SettlementRequest { booking_id: s.booking, amount },
        );

        let renter_after = h.balance(&s.renter);
        let owner_after = h.balance(&s.owner);
        prop_assert_eq!(renter_after + owner_after, renter_balance + owner_balance);

        if amount <= renter_balance {
            prop_assert!(result.is_ok());
            prop_assert_eq!(renter_after, renter_balance - amount);
            prop_assert_eq!(owner_after, owner_balance + amount);
            prop_assert_eq!(h.status(&s.booking), BookingStatus::Approved);
        } else {
            prop_assert_eq!(result, Err(RentalError::InsufficientFunds));
            prop_assert_eq!(renter_after, renter_balance);
            prop_assert_eq!(owner_after, owner_balance);
            prop_assert_eq!(h.status(&s.booking), BookingStatus::Pending);
        }
        h.market.shutdown();
    }

    /// Balances never go negative, money is neither created nor lost, and a
    /// booking that left Pending never changes again.
    #[test]
    fn random_operations_keep_ledger_consistent(
        ops in prop::collection::vec(arb_op(), 1..40),
    ) {
        let h = Harness::new();
        let s = h.scenario(Decimal::ZERO, Decimal::ZERO);
        let mut bookings: Vec<BookingId> = vec![s.booking];
        let mut topped_up = Decimal::ZERO;
        let mut settled: HashMap<BookingId, BookingStatus> = HashMap::new();

        for op in ops {
            match op {
                Op::TopUp(amount) => {
                    h.market.top_up(&s.renter, amount).unwrap();
                    topped_up += amount;
                }
                Op::Book => {
                    let booking = h.market.create_booking(&s.renter, common::january(s.product)).unwrap();
                    bookings.push(booking.id);
                }
                Op::Settle { booking, amount } => {
                    let id = bookings[booking % bookings.len()];
                    let _ = h.market.settle(&s.renter, SettlementRequest { booking_id: id, amount });
                }
                Op::Reject { booking } => {
                    let id = bookings[booking % bookings.len()];
                    let _ = h.market.reject_booking(&s.owner, &id);
                }
            }

            let renter = h.balance(&s.renter);
            let owner = h.balance(&s.owner);
            prop_assert!(renter >= Decimal::ZERO);
            prop_assert!(owner >= Decimal::ZERO);
            prop_assert_eq!(renter + owner, topped_up);

            for id in &bookings {
                let status = h.status(id);
                if let Some(previous) = settled.get(id) {
                    prop_assert_eq!(status, *previous);
                } else if status.is_terminal() {
                    settled.insert(*id, status);
                }
            }
        }

        // Every approved booking has exactly one transaction behind it.
        let paid: Decimal = h
            .market
            .transactions_for(&s.owner)
            .unwrap()
            .iter()
            .map(|record| record.amount)
            .sum();
        prop_assert_eq!(h.balance(&s.owner), paid);
        let approved = settled
            .values()
            .filter(|status| **status == BookingStatus::Approved)
            .count();
        prop_assert_eq!(h.market.transactions_for(&s.renter).unwrap().len(), approved);
        h.market.shutdown();
    }
}
