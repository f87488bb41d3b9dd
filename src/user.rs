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

//! User directory.
//!
//! Holds identity and contact details. Wallet balances live in the ledger,
//! keyed by the same [`UserId`].

use crate::base::UserId;
use crate::error::RentalError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque password hash produced by the authentication layer.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(***)")
    }
}

/// Recipient details for notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub credential_hash: CredentialHash,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn contact(&self) -> Contact {
        Contact {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Registration payload.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub credential_hash: CredentialHash,
    pub address: String,
}

impl NewUser {
    fn validate(&self) -> Result<(), RentalError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if self.email.trim().is_empty() {
            problems.push("email is required".to_string());
        } else if !self.email.contains('@') {
            problems.push("email is invalid".to_string());
        }
        if self.credential_hash.as_str().is_empty() {
            problems.push("credential hash is required".to_string());
        }
        if self.address.trim().is_empty() {
            problems.push("address is required".to_string());
        }
        RentalError::check(problems)
    }
}

/// In-memory user table with a unique email index.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: DashMap<UserId, User>,
    emails: DashMap<String, UserId>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user under a fresh id.
    ///
    /// Emails are compared case-insensitively.
    ///
    /// # Errors
    ///
    /// - [`RentalError::Validation`] - A required field is missing or malformed.
    /// - [`RentalError::AlreadyExists`] - The email is taken.
    pub fn register(&self, new_user: NewUser) -> Result<User, RentalError> {
        new_user.validate()?;

        let email = new_user.email.trim().to_lowercase();
        let user = User {
            id: UserId::new(),
            name: new_user.name.trim().to_string(),
            email: email.clone(),
            credential_hash: new_user.credential_hash,
            address: new_user.address.trim().to_string(),
            created_at: Utc::now(),
        };

        // Entry API keeps check-and-insert atomic for concurrent registrations.
        match self.emails.entry(email) {
            Entry::Occupied(_) => Err(RentalError::AlreadyExists("user")),
            Entry::Vacant(entry) => {
                self.users.insert(user.id, user.clone());
                entry.insert(user.id);
                Ok(user)
            }
        }
    }

    /// Removes a user and frees their email.
    pub fn remove(&self, id: &UserId) -> Result<User, RentalError> {
        let (_, user) = self.users.remove(id).ok_or(RentalError::NotFound("user"))?;
        self.emails.remove_if(&user.email, |_, owner| owner == id);
        Ok(user)
    }

    pub fn get(&self, id: &UserId) -> Result<User, RentalError> {
        self.users
            .get(id)
            .map(|user| user.clone())
            .ok_or(RentalError::NotFound("user"))
    }

    pub fn find_by_email(&self, email: &str) -> Result<User, RentalError> {
        let id = self
            .emails
            .get(&email.trim().to_lowercase())
            .map(|id| *id)
            .ok_or(RentalError::NotFound("user"))?;
        self.get(&id)
    }

    pub fn contact(&self, id: &UserId) -> Result<Contact, RentalError> {
        self.get(id).map(|user| user.contact())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
