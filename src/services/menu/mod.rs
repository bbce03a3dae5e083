//! Staff-side management of the menu catalog.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidationError;

use crate::db::DbPool;
use crate::errors::ServiceError;

mod badges;
mod categories;
pub(crate) mod combos;
mod products;
mod sections;
pub mod views;

pub use badges::{BadgeTypeRequest, ProductBadgeRequest};
pub use categories::CategoryRequest;
pub use combos::{ComboItemOptionRequest, ComboItemRequest, ComboRequest};
pub use products::{CreateProductRequest, ProductRequest, VariantRequest};
pub use sections::{CreateSectionRequest, SectionOptionRequest, SectionRequest};

/// Menu CRUD scoped to one restaurant per call.
#[derive(Clone)]
pub struct MenuService {
    db_pool: Arc<DbPool>,
}

impl MenuService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }
}

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

pub(crate) fn default_true() -> bool {
    true
}

/// Rejects ids listed twice in one request.
pub(crate) fn ensure_unique(field: &str, ids: &[Uuid]) -> Result<(), ServiceError> {
    let mut seen = HashSet::with_capacity(ids.len());
    if ids.iter().all(|id| seen.insert(*id)) {
        Ok(())
    } else {
        Err(ServiceError::field(field, "Duplicate ids are not allowed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_must_not_be_negative() {
        assert!(non_negative(&dec!(0)).is_ok());
        assert!(non_negative(&dec!(12.50)).is_ok());
        assert!(non_negative(&dec!(-0.01)).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let id = Uuid::new_v4();
        assert!(ensure_unique("section_ids", &[id, Uuid::new_v4()]).is_ok());
        assert!(ensure_unique("section_ids", &[id, id]).is_err());
    }
}
