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

//! Lessor profiles and product listings.

use crate::base::{ConsoleId, IdSequence, LessorId, ProductId, UserId, validate_amount};
use crate::error::RentalError;
use crate::store::CatalogStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::Serialize;

/// A user's lessor profile. A user owns at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lessor {
    pub id: LessorId,
    pub user_id: UserId,
    pub name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLessor {
    pub name: String,
    pub location: String,
}

impl NewLessor {
    pub fn validate(&self) -> Result<(), RentalError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if self.location.trim().is_empty() {
            problems.push("location is required".to_string());
        }
        RentalError::check(problems)
    }
}

/// A rentable listing owned by exactly one lessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub lessor_id: LessorId,
    pub console_id: ConsoleId,
    pub name: String,
    pub description: String,
    pub rental_cost_per_month: Decimal,
    pub stock_availability: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields a lessor supplies when listing or editing a product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub console_id: ConsoleId,
    pub name: String,
    pub description: String,
    pub rental_cost_per_month: Decimal,
    pub stock_availability: u32,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), RentalError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if self.description.trim().is_empty() {
            problems.push("description is required".to_string());
        }
        if validate_amount(self.rental_cost_per_month).is_err() {
            problems.push(
                "rental cost per month must be greater than 0 with at most two decimal places"
                    .to_string(),
            );
        }
        RentalError::check(problems)
    }
}

/// In-memory [`CatalogStore`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    lessors: DashMap<LessorId, Lessor>,
    lessor_by_user: DashMap<UserId, LessorId>,
    products: DashMap<ProductId, Product>,
    lessor_ids: IdSequence,
    product_ids: IdSequence,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a live product row while holding its write lock.
    fn with_live_product<T>(
        &self,
        id: &ProductId,
        f: impl FnOnce(&mut Product) -> Result<T, RentalError>,
    ) -> Result<T, RentalError> {
        let mut product = self
            .products
            .get_mut(id)
            .filter(|product| !product.is_deleted())
            .ok_or(RentalError::NotFound("product"))?;
        f(product.value_mut())
    }
}

impl CatalogStore for MemoryCatalog {
    fn insert_lessor(&self, user: UserId, profile: NewLessor) -> Result<Lessor, RentalError> {
        match self.lessor_by_user.entry(user) {
            Entry::Occupied(_) => Err(RentalError::AlreadyExists("lessor")),
            Entry::Vacant(entry) => {
                let lessor = Lessor {
                    id: self.lessor_ids.next(),
                    user_id: user,
                    name: profile.name.trim().to_string(),
                    location: profile.location.trim().to_string(),
                    created_at: Utc::now(),
                };
                // Index last so a lookup by user always finds the profile.
                self.lessors.insert(lessor.id, lessor.clone());
                entry.insert(lessor.id);
                Ok(lessor)
            }
        }
    }

    fn lessor(&self, id: &LessorId) -> Result<Lessor, RentalError> {
        self.lessors
            .get(id)
            .map(|lessor| lessor.clone())
            .ok_or(RentalError::NotFound("lessor"))
    }

    fn lessor_by_user(&self, user: &UserId) -> Result<Option<Lessor>, RentalError> {
        let Some(id) = self.lessor_by_user.get(user).map(|id| *id) else {
            return Ok(None);
        };
        self.lessor(&id).map(Some)
    }

    fn insert_product(
        &self,
        lessor: LessorId,
        draft: ProductDraft,
    ) -> Result<Product, RentalError> {
        if !self.lessors.contains_key(&lessor) {
            return Err(RentalError::NotFound("lessor"));
        }
        let now = Utc::now();
        let product = Product {
            id: self.product_ids.next(),
            lessor_id: lessor,
            console_id: draft.console_id,
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            rental_cost_per_month: draft.rental_cost_per_month,
            stock_availability: draft.stock_availability,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    fn product(&self, id: &ProductId) -> Result<Product, RentalError> {
        self.products
            .get(id)
            .filter(|product| !product.is_deleted())
            .map(|product| product.clone())
            .ok_or(RentalError::NotFound("product"))
    }

    fn products_by_lessor(&self, lessor: &LessorId) -> Result<Vec<Product>, RentalError> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|product| product.lessor_id == *lessor && !product.is_deleted())
            .map(|product| product.clone())
            .collect();
        products.sort_by_key(|product| product.id);
        Ok(products)
    }

    fn update_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RentalError> {
        self.with_live_product(id, |product| {
            product.console_id = draft.console_id;
            product.name = draft.name.trim().to_string();
            product.description = draft.description.trim().to_string();
            product.rental_cost_per_month = draft.rental_cost_per_month;
            product.stock_availability = draft.stock_availability;
            product.updated_at = Utc::now();
            Ok(product.clone())
        })
    }

    fn delete_product(&self, id: &ProductId) -> Result<Product, RentalError> {
        self.with_live_product(id, |product| {
            let now = Utc::now();
            product.deleted_at = Some(now);
            product.updated_at = now;
            Ok(product.clone())
        })
    }

    fn decrement_stock(&self, id: &ProductId) -> Result<u32, RentalError> {
        self.with_live_product(id, |product| {
            product.stock_availability = product
                .stock_availability
                .checked_sub(1)
                .ok_or(RentalError::InvalidState("product is out of stock"))?;
            product.updated_at = Utc::now();
            Ok(product.stock_availability)
        })
    }

    fn increment_stock(&self, id: &ProductId) -> Result<u32, RentalError> {
        self.with_live_product(id, |product| {
            product.stock_availability = product
                .stock_availability
                .checked_add(1)
                .ok_or_else(|| RentalError::Internal("stock counter overflow".to_string()))?;
            product.updated_at = Utc::now();
            Ok(product.stock_availability)
        })
    }
}
