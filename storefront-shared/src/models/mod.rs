/// Database models for the storefront
///
/// Plain row types plus the input structs services validate before writing.
/// Queries live behind the traits in [`crate::store`].
///
/// # Models
///
/// - `user`: accounts, roles and identity providers
/// - `category`: product categories
/// - `product`: catalogue entries with price, stock and visibility

pub mod category;
pub mod product;
pub mod user;

pub use category::{Category, CategoryInput};
pub use product::{Product, ProductFilter, ProductInput};
pub use user::{NewUser, Provider, Role, UpdateProfile, User, UserProfile};
