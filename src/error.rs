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

//! Error types for marketplace and settlement operations.

use thiserror::Error;

/// Marketplace and settlement errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RentalError {
    /// Referenced entity does not exist (or is not visible to the caller)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Caller is not allowed to perform the operation
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Entity is not in a state that permits the operation
    #[error("{0}")]
    InvalidState(&'static str),

    /// Wallet balance is lower than the requested amount
    #[error("insufficient balance")]
    InsufficientFunds,

    /// Amount is zero, negative, or finer than the currency scale
    #[error("invalid amount (must be positive with at most two decimal places)")]
    InvalidAmount,

    /// One or more request fields failed validation
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    /// Unique constraint violated
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// Payment provider did not confirm the charge
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// Storage or infrastructure fault
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification handed to the response-formatting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    InsufficientFunds,
    InvalidAmount,
    Validation,
    Conflict,
    PaymentFailed,
    Internal,
}

impl RentalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InsufficientFunds => ErrorKind::InsufficientFunds,
            Self::InvalidAmount => ErrorKind::InvalidAmount,
            Self::Validation(_) => ErrorKind::Validation,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::PaymentFailed(_) => ErrorKind::PaymentFailed,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Builds a validation error from collected field messages.
    ///
    /// Returns `Ok(())` when nothing was collected.
    pub(crate) fn check(problems: Vec<String>) -> Result<(), Self> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(problems))
        }
    }
}
