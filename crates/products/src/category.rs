use serde::{Deserialize, Serialize};

use erpext_accounting::AccountId;
use erpext_core::{Entity, RecordId, define_id};

define_id!(CategoryId, RecordId, "Product category identifier.");

/// Product category. Supplies the fallback expense account for its products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    pub expense_account: Option<AccountId>,
}

impl Entity for ProductCategory {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
