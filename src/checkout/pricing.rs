// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side order pricing.
//!
//! Prices are whole currency units. The platform fee is 7% of the subtotal,
//! rounded half-up to a whole unit: `(subtotal * 7 + 50) / 100`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::StoredCourse;

/// Platform fee in percent of the subtotal.
pub const PLATFORM_FEE_PERCENT: u64 = 7;

/// Minor units per whole currency unit (paise per rupee, cents per dollar).
pub const MINOR_UNITS_PER_UNIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PriceBreakdown {
    pub subtotal: u64,
    pub platform_fee: u64,
    pub total: u64,
}

impl PriceBreakdown {
    /// Amount to charge at the gateway, in minor units.
    pub fn amount_minor(&self) -> Option<u64> {
        self.total.checked_mul(MINOR_UNITS_PER_UNIT)
    }
}

/// Fee for a subtotal, `None` on overflow.
pub fn platform_fee(subtotal: u64) -> Option<u64> {
    subtotal
        .checked_mul(PLATFORM_FEE_PERCENT)?
        .checked_add(50)
        .map(|scaled| scaled / 100)
}

/// Price a set of courses. `None` if any sum overflows.
pub fn price_courses(courses: &[StoredCourse]) -> Option<PriceBreakdown> {
    let subtotal = courses
        .iter()
        .try_fold(0u64, |sum, course| sum.checked_add(course.price))?;
    let platform_fee = platform_fee(subtotal)?;
    let total = subtotal.checked_add(platform_fee)?;
    Some(PriceBreakdown {
        subtotal,
        platform_fee,
        total,
    })
}
