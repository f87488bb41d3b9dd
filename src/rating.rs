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

//! Product ratings. A user rates a product at most once.

use crate::base::{IdSequence, ProductId, RatingId, UserId};
use crate::error::RentalError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Highest star count a rating may carry.
pub const MAX_STARS: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub review: String,
    pub stars: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub product_id: ProductId,
    pub review: String,
    pub stars: Decimal,
}

impl RatingRequest {
    pub fn validate(&self) -> Result<(), RentalError> {
        let mut problems = Vec::new();
        if self.product_id.0 == 0 {
            problems.push("product ID is required".to_string());
        }
        if self.review.trim().is_empty() {
            problems.push("review is required".to_string());
        }
        if self.stars <= Decimal::ZERO
            || self.stars > MAX_STARS
            || self.stars.normalize().scale() > 1
        {
            problems.push("stars must be between 0.1 and 5 in steps of 0.1".to_string());
        }
        RentalError::check(problems)
    }
}

/// In-memory rating table with one row per user and product.
#[derive(Debug, Default)]
pub struct RatingBook {
    ratings: DashMap<RatingId, Rating>,
    by_user_product: DashMap<(UserId, ProductId), RatingId>,
    ids: IdSequence,
}

impl RatingBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a validated rating.
    ///
    /// # Errors
    ///
    /// - [`RentalError::AlreadyExists`] - The user already rated this product.
    pub fn insert(&self, user: UserId, request: RatingRequest) -> Result<Rating, RentalError> {
        match self.by_user_product.entry((user, request.product_id)) {
            Entry::Occupied(_) => Err(RentalError::AlreadyExists("rating")),
            Entry::Vacant(entry) => {
                let rating = Rating {
                    id: self.ids.next(),
                    user_id: user,
                    product_id: request.product_id,
                    review: request.review.trim().to_string(),
                    stars: request.stars,
                    created_at: Utc::now(),
                };
                self.ratings.insert(rating.id, rating.clone());
                entry.insert(rating.id);
                Ok(rating)
            }
        }
    }

    pub fn find(&self, user: &UserId, product: &ProductId) -> Option<Rating> {
        let id = *self.by_user_product.get(&(*user, *product))?;
        self.ratings.get(&id).map(|rating| rating.clone())
    }

    /// Ratings of a product, oldest first.
    pub fn list_by_product(&self, product: &ProductId) -> Vec<Rating> {
        let mut ratings: Vec<Rating> = self
            .ratings
            .iter()
            .filter(|rating| rating.product_id == *product)
            .map(|rating| rating.clone())
            .collect();
        ratings.sort_by_key(|rating| rating.id);
        ratings
    }

    /// Mean star count, zero when the product has no ratings.
    pub fn average(&self, product: &ProductId) -> Decimal {
        let ratings = self.list_by_product(product);
        if ratings.is_empty() {
            return Decimal::ZERO;
        }
        let total: Decimal = ratings.iter().map(|rating| rating.stars).sum();
        (total / Decimal::from(ratings.len())).round_dp(2)
    }
}
