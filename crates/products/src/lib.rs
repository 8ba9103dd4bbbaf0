//! Products domain module (event-sourced).
//!
//! Business rules for the product catalog that cost rollups read and write:
//! the `Product` aggregate (standard cost, costing policy, last cost update),
//! product categories and units of measure. Deterministic domain logic only.

pub mod category;
pub mod product;
pub mod uom;

pub use category::{CategoryId, ProductCategory};
pub use product::{
    ChangeStandardCost, CostMethod, CreateProduct, Product, ProductCommand, ProductCreated,
    ProductEvent, ProductId, ProductTemplateId, StandardCostChanged, Valuation,
};
pub use uom::{UnitOfMeasure, UomCategoryId, UomId, UomKind};
