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

//! Ownership checks for product listings.

use crate::base::{ProductId, UserId};
use crate::error::RentalError;
use crate::store::CatalogStore;

/// Reports whether `user` owns `product` through their lessor profile.
///
/// A user without a lessor profile, or a product that does not exist or was
/// deleted, yields `false`. Other store faults propagate.
pub fn is_owner(
    catalog: &dyn CatalogStore,
    user: &UserId,
    product: &ProductId,
) -> Result<bool, RentalError> {
    let Some(lessor) = catalog.lessor_by_user(user)? else {
        return Ok(false);
    };
    match catalog.product(product) {
        Ok(product) => Ok(product.lessor_id == lessor.id),
        Err(RentalError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
