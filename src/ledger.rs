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

//! Wallet ledger.
//!
//! Each wallet guards its balance with its own lock, so debits and credits
//! for different users proceed in parallel while updates to one wallet are
//! serialized. Sufficiency is checked under the same lock that applies the
//! debit. A transfer holds both wallet locks, taken in [`UserId`] order, so
//! the payer and payee change together and crossing transfers cannot
//! deadlock.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use rental_ledger_rs::{LedgerStore, MemoryLedger, UserId};
//!
//! let ledger = MemoryLedger::new();
//! let user = UserId::new();
//! ledger.open(user).unwrap();
//! assert_eq!(ledger.credit(&user, dec!(100.00)).unwrap(), dec!(100.00));
//! assert_eq!(ledger.debit(&user, dec!(30.00)).unwrap(), dec!(70.00));
//! ```

use crate::base::{CURRENCY_SCALE, UserId};
use crate::error::RentalError;
use crate::store::LedgerStore;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;

#[derive(Debug)]
struct WalletData {
    user_id: UserId,
    balance: Decimal,
}

impl WalletData {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: wallet balance went negative: {}",
            self.balance
        );
    }

    /// Increases the balance.
    fn credit(&mut self, amount: Decimal) -> Result<Decimal, RentalError> {
        if amount <= Decimal::ZERO {
            return Err(RentalError::InvalidAmount);
        }
        self.balance += amount;
        self.assert_invariants();
        Ok(self.balance)
    }

    /// Decreases the balance.
    fn debit(&mut self, amount: Decimal) -> Result<Decimal, RentalError> {
        if amount <= Decimal::ZERO {
            return Err(RentalError::InvalidAmount);
        }
        if self.balance < amount {
            return Err(RentalError::InsufficientFunds);
        }
        self.balance -= amount;
        self.assert_invariants();
        Ok(self.balance)
    }
}

/// A single user's wallet.
#[derive(Debug)]
pub struct Wallet {
    inner: Mutex<WalletData>,
}

impl Wallet {
    pub fn new(user_id: UserId) -> Self {
        Self {
            inner: Mutex::new(WalletData::new(user_id)),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.inner.lock().user_id
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    pub fn credit(&self, amount: Decimal) -> Result<Decimal, RentalError> {
        self.inner.lock().credit(amount)
    }

    pub fn debit(&self, amount: Decimal) -> Result<Decimal, RentalError> {
        self.inner.lock().debit(amount)
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        let data = self.inner.lock();
        WalletSnapshot {
            user_id: data.user_id,
            balance: data.balance,
        }
    }
}

impl Serialize for Wallet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.snapshot().serialize(serializer)
    }
}

/// Point-in-time copy of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub user_id: UserId,
    pub balance: Decimal,
}

impl Serialize for WalletSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Wallet", 2)?;
        state.serialize_field("user", &self.user_id)?;
        state.serialize_field("balance", &self.balance.round_dp(CURRENCY_SCALE))?;
        state.end()
    }
}

/// In-memory [`LedgerStore`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    wallets: DashMap<UserId, Arc<Wallet>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones the wallet handle out so no map shard stays locked while the
    /// wallet itself is.
    fn wallet(&self, user: &UserId) -> Result<Arc<Wallet>, RentalError> {
        self.wallets
            .get(user)
            .map(|wallet| Arc::clone(wallet.value()))
            .ok_or(RentalError::NotFound("wallet"))
    }
}

impl LedgerStore for MemoryLedger {
    fn open(&self, user: UserId) -> Result<(), RentalError> {
        match self.wallets.entry(user) {
            Entry::Occupied(_) => Err(RentalError::AlreadyExists("wallet")),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Wallet::new(user)));
                Ok(())
            }
        }
    }

    fn balance(&self, user: &UserId) -> Result<Decimal, RentalError> {
        self.wallets
            .get(user)
            .map(|wallet| wallet.balance())
            .ok_or(RentalError::NotFound("wallet"))
    }

    fn debit(&self, user: &UserId, amount: Decimal) -> Result<Decimal, RentalError> {
        self.wallet(user)?.debit(amount)
    }

    fn credit(&self, user: &UserId, amount: Decimal) -> Result<Decimal, RentalError> {
        self.wallet(user)?.credit(amount)
    }

    fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), RentalError> {
        if from == to {
            return Err(RentalError::InvalidState("cannot transfer to the same wallet"));
        }
        let payer = self.wallet(from)?;
        let payee = self.wallet(to)?;

        let (mut payer_data, mut payee_data) = if from < to {
            let payer_data = payer.inner.lock();
            (payer_data, payee.inner.lock())
        } else {
            let payee_data = payee.inner.lock();
            (payer.inner.lock(), payee_data)
        };

        let payer_balance = payer_data.debit(amount)?;
        let payee_balance = match payee_data.credit(amount) {
            Ok(balance) => balance,
            Err(e) => {
                // Put the payer back before either lock is released.
                payer_data.balance += amount;
                return Err(e);
            }
        };
        Ok((payer_balance, payee_balance))
    }

    fn wallets(&self) -> Result<Vec<WalletSnapshot>, RentalError> {
        Ok(self.wallets.iter().map(|wallet| wallet.snapshot()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn wallet_data_credit_and_debit() {
        let mut data = WalletData::new(UserId::new());
        assert_eq!(data.credit(dec!(100.00)), Ok(dec!(100.00)));
        assert_eq!(data.debit(dec!(30.00)), Ok(dec!(70.00)));
        assert_eq!(data.balance, dec!(70.00));
    }

    #[test]
    fn debit_exact_balance_reaches_zero() {
        let mut data = WalletData::new(UserId::new());
        data.credit(dec!(30.00)).unwrap();
        assert_eq!(data.debit(dec!(30.00)), Ok(Decimal::ZERO));
    }

    #[test]
    fn debit_more_than_balance_leaves_wallet_untouched() {
        let mut data = WalletData::new(UserId::new());
        data.credit(dec!(10.00)).unwrap();
        assert_eq!(data.debit(dec!(30.00)), Err(RentalError::InsufficientFunds));
        assert_eq!(data.balance, dec!(10.00));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut data = WalletData::new(UserId::new());
        assert_eq!(data.credit(Decimal::ZERO), Err(RentalError::InvalidAmount));
        assert_eq!(data.credit(dec!(-5)), Err(RentalError::InvalidAmount));
        assert_eq!(data.debit(Decimal::ZERO), Err(RentalError::InvalidAmount));
    }

    #[test]
    fn open_twice_conflicts() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        ledger.open(user).unwrap();
        assert_eq!(ledger.open(user), Err(RentalError::AlreadyExists("wallet")));
    }

    #[test]
    fn missing_wallet_is_not_found() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        assert_eq!(ledger.balance(&user), Err(RentalError::NotFound("wallet")));
        assert_eq!(ledger.credit(&user, dec!(1)), Err(RentalError::NotFound("wallet")));
        assert_eq!(ledger.debit(&user, dec!(1)), Err(RentalError::NotFound("wallet")));
    }

    #[test]
    fn transfer_moves_funds_between_wallets() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        ledger.open(alice).unwrap();
        ledger.open(bob).unwrap();
        ledger.credit(&alice, dec!(100)).unwrap();

        assert_eq!(ledger.transfer(&alice, &bob, dec!(30)), Ok((dec!(70), dec!(30))));
        assert_eq!(ledger.transfer(&bob, &alice, dec!(30)), Ok((dec!(0), dec!(100))));
    }

    #[test]
    fn failed_transfer_changes_neither_wallet() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        ledger.open(alice).unwrap();
        ledger.open(bob).unwrap();
        ledger.credit(&alice, dec!(10)).unwrap();

        assert_eq!(
            ledger.transfer(&alice, &bob, dec!(30)),
            Err(RentalError::InsufficientFunds)
        );
        assert_eq!(
            ledger.transfer(&alice, &UserId::new(), dec!(5)),
            Err(RentalError::NotFound("wallet"))
        );
        assert_eq!(
            ledger.transfer(&alice, &alice, dec!(5)),
            Err(RentalError::InvalidState("cannot transfer to the same wallet"))
        );
        assert_eq!(ledger.balance(&alice), Ok(dec!(10)));
        assert_eq!(ledger.balance(&bob), Ok(Decimal::ZERO));
    }

    // === Serialization Tests ===

    #[test]
    fn serializer_rounds_to_currency_scale() {
        let wallet = Wallet::new(UserId::new());
        {
            let mut data = wallet.inner.lock();
            // 123.456 rounds to two places
            data.balance = dec!(123.456);
        }

        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["balance"].as_str().unwrap(), "123.46");
        assert_eq!(json["user"].as_str().unwrap(), wallet.user_id().to_string());
    }

    #[test]
    fn serializer_handles_whole_numbers() {
        let wallet = Wallet::new(UserId::new());
        wallet.credit(dec!(1000)).unwrap();
        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["balance"].as_str().unwrap(), "1000");
    }
}
