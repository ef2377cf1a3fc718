/// In-memory implementation of the store traits
///
/// Used by service unit tests and the API integration tests. Every call is
/// appended to a call log (`"begin"`, `"insert_category"`, `"commit"`, ...)
/// so tests can assert exactly which queries ran, and failures can be
/// injected for `begin`, `commit` or any named query.
///
/// A transaction works on a snapshot of the tables taken at `begin` and
/// writes it back on `commit`; rollback just drops the snapshot.
///
/// # Example
///
/// ```
/// use storefront_shared::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.fail_commit();
/// assert_eq!(store.call_count("begin"), 0);
/// ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    CategoryStore, CategoryTx, ProductStore, ProductTx, StoreError, StoreResult, Transaction,
    UserStore, UserTx, PRODUCT_CATEGORY_FKEY,
};
use crate::models::{
    Category, CategoryInput, NewUser, Product, ProductFilter, ProductInput, Provider, Role,
    UpdateProfile, User,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    users: HashMap<Uuid, User>,
}

#[derive(Debug, Default)]
struct Faults {
    begin: bool,
    commit: bool,
    queries: HashSet<String>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    calls: Mutex<Vec<String>>,
    faults: Mutex<Faults>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn note(&self, call: &str) {
        lock(&self.calls).push(call.to_string());
    }

    /// Records the call and fails it if a fault was injected for that name
    fn check(&self, call: &str) -> StoreResult<()> {
        self.note(call);
        if lock(&self.faults).queries.contains(call) {
            return Err(StoreError::Backend(format!("{} failed", call)));
        }
        Ok(())
    }

    fn begin(self: &Arc<Self>) -> StoreResult<MemoryTx> {
        self.note("begin");
        if lock(&self.faults).begin {
            return Err(StoreError::Backend("begin failed".to_string()));
        }
        let staged = lock(&self.tables).clone();
        Ok(MemoryTx {
            shared: Arc::clone(self),
            staged: Some(staged),
        })
    }
}

/// Shared in-memory store; clones see the same data and call log
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `begin_*` fails
    pub fn fail_begin(&self) {
        lock(&self.shared.faults).begin = true;
    }

    /// Every subsequent commit fails (the transaction is still closed)
    pub fn fail_commit(&self) {
        lock(&self.shared.faults).commit = true;
    }

    /// Every subsequent call named `call` fails
    pub fn fail_query(&self, call: &str) {
        lock(&self.shared.faults).queries.insert(call.to_string());
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.shared.calls).clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        lock(&self.shared.calls)
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.shared.calls).clear();
    }

    pub fn seed_category(&self, category: Category) {
        lock(&self.shared.tables)
            .categories
            .insert(category.id, category);
    }

    pub fn seed_product(&self, product: Product) {
        lock(&self.shared.tables).products.insert(product.id, product);
    }

    pub fn seed_user(&self, user: User) {
        lock(&self.shared.tables).users.insert(user.id, user);
    }

    /// Committed category, without touching the call log
    pub fn category(&self, id: Uuid) -> Option<Category> {
        lock(&self.shared.tables).categories.get(&id).cloned()
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        lock(&self.shared.tables).products.get(&id).cloned()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        lock(&self.shared.tables).users.get(&id).cloned()
    }
}

/// Snapshot transaction over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTx {
    shared: Arc<Shared>,
    staged: Option<Tables>,
}

impl MemoryTx {
    fn tables(&mut self) -> StoreResult<&mut Tables> {
        self.staged.as_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn commit(&mut self) -> StoreResult<()> {
        self.shared.note("commit");
        let staged = self.staged.take().ok_or(StoreError::TransactionClosed)?;
        if lock(&self.shared.faults).commit {
            return Err(StoreError::Backend("commit failed".to_string()));
        }
        *lock(&self.shared.tables) = staged;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.shared.note("rollback");
        self.staged = None;
        Ok(())
    }
}

fn category_fkey_violation() -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: PRODUCT_CATEGORY_FKEY.to_string(),
    }
}

fn sort_products(products: &mut [Product]) {
    products.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn begin_category(&self) -> StoreResult<Box<dyn CategoryTx>> {
        Ok(Box::new(self.shared.begin()?))
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.shared.check("list_categories")?;
        let mut categories: Vec<Category> = lock(&self.shared.tables)
            .categories
            .values()
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        self.shared.check("find_category")?;
        Ok(self.category(id))
    }
}

#[async_trait]
impl CategoryTx for MemoryTx {
    async fn insert_category(&mut self, input: &CategoryInput) -> StoreResult<Uuid> {
        self.shared.check("insert_category")?;
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = category.id;
        self.tables()?.categories.insert(id, category);
        Ok(id)
    }

    async fn update_category(&mut self, id: Uuid, input: &CategoryInput) -> StoreResult<bool> {
        self.shared.check("update_category")?;
        match self.tables()?.categories.get_mut(&id) {
            Some(category) => {
                category.name = input.name.clone();
                category.description = input.description.clone();
                category.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&mut self, id: Uuid) -> StoreResult<bool> {
        self.shared.check("delete_category")?;
        let tables = self.tables()?;
        if tables.products.values().any(|p| p.category_id == id) {
            return Err(category_fkey_violation());
        }
        Ok(tables.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn begin_product(&self) -> StoreResult<Box<dyn ProductTx>> {
        Ok(Box::new(self.shared.begin()?))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.shared.check("list_products")?;
        let mut products: Vec<Product> = lock(&self.shared.tables)
            .products
            .values()
            .cloned()
            .collect();
        sort_products(&mut products);
        Ok(products)
    }

    async fn list_active_products(&self) -> StoreResult<Vec<Product>> {
        self.shared.check("list_active_products")?;
        let mut products: Vec<Product> = lock(&self.shared.tables)
            .products
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        sort_products(&mut products);
        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        self.shared.check("find_product")?;
        Ok(self.product(id))
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        active_only: bool,
    ) -> StoreResult<Vec<Product>> {
        self.shared.check("filter_products")?;
        let mut products: Vec<Product> = lock(&self.shared.tables)
            .products
            .values()
            .filter(|p| !active_only || p.is_active)
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort_products(&mut products);
        Ok(products)
    }
}

#[async_trait]
impl ProductTx for MemoryTx {
    async fn insert_product(&mut self, input: &ProductInput) -> StoreResult<Uuid> {
        self.shared.check("insert_product")?;
        if !self.tables()?.categories.contains_key(&input.category_id) {
            return Err(category_fkey_violation());
        }
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            category_id: input.category_id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.normalized_price(),
            stock: input.stock,
            image_url: input.image_url.clone(),
            is_active: input.active(),
            created_at: now,
            updated_at: now,
        };
        let id = product.id;
        self.tables()?.products.insert(id, product);
        Ok(id)
    }

    async fn update_product(&mut self, id: Uuid, input: &ProductInput) -> StoreResult<bool> {
        self.shared.check("update_product")?;
        let tables = self.tables()?;
        if !tables.products.contains_key(&id) {
            return Ok(false);
        }
        if !tables.categories.contains_key(&input.category_id) {
            return Err(category_fkey_violation());
        }
        match tables.products.get_mut(&id) {
            Some(product) => {
                product.category_id = input.category_id;
                product.name = input.name.clone();
                product.description = input.description.clone();
                product.price = input.normalized_price();
                product.stock = input.stock;
                product.image_url = input.image_url.clone();
                product.is_active = input.active();
                product.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_product(&mut self, id: Uuid) -> StoreResult<bool> {
        self.shared.check("delete_product")?;
        Ok(self.tables()?.products.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn begin_user(&self) -> StoreResult<Box<dyn UserTx>> {
        Ok(Box::new(self.shared.begin()?))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.shared.check("find_user")?;
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.shared.check("find_user_by_email")?;
        Ok(lock(&self.shared.tables)
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_name_exists(&self, name: &str) -> StoreResult<bool> {
        self.shared.check("user_name_exists")?;
        Ok(lock(&self.shared.tables)
            .users
            .values()
            .any(|u| u.name == name))
    }

    async fn user_email_exists(&self, email: &str) -> StoreResult<bool> {
        self.shared.check("user_email_exists")?;
        Ok(lock(&self.shared.tables)
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email)))
    }
}

#[async_trait]
impl UserTx for MemoryTx {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        self.shared.check("insert_user")?;
        let tables = self.tables()?;
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::UniqueViolation {
                constraint: "users_email_key".to_string(),
            });
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            provider: user.provider,
            provider_id: user.provider_id.clone(),
            phone: None,
            address: None,
            role: Role::User,
            created_at: now,
            updated_at: now,
            last_sign_in_at: None,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_profile(&mut self, id: Uuid, changes: &UpdateProfile) -> StoreResult<bool> {
        self.shared.check("update_profile")?;
        match self.tables()?.users.get_mut(&id) {
            Some(user) => {
                if let Some(ref name) = changes.name {
                    user.name = name.clone();
                }
                if let Some(ref phone) = changes.phone {
                    user.phone = Some(phone.clone());
                }
                if let Some(ref address) = changes.address {
                    user.address = Some(address.clone());
                }
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_role(&mut self, id: Uuid, role: Role) -> StoreResult<bool> {
        self.shared.check("set_role")?;
        match self.tables()?.users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_sign_in(
        &mut self,
        id: Uuid,
        provider: Provider,
        provider_id: Option<&str>,
    ) -> StoreResult<bool> {
        self.shared.check("record_sign_in")?;
        match self.tables()?.users.get_mut(&id) {
            Some(user) => {
                let now = Utc::now();
                user.provider = provider;
                if let Some(provider_id) = provider_id {
                    user.provider_id = Some(provider_id.to_string());
                }
                user.last_sign_in_at = Some(now);
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
