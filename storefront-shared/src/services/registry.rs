/// Service registry
///
/// Owns the optional dependencies and builds each service the first time a
/// handler asks for it. `*_service()` never fails: a service built without
/// its store answers `transaction_error` on first use. `init_*` is the
/// fail-fast variant for bootstrap.

use std::sync::Arc;

use tracing::info;

use super::{AuthService, CategoryService, LazyService, PaymentService, ProductService, UserService};
use crate::auth::jwt::TokenIssuer;
use crate::auth::oauth::OAuthProvider;
use crate::cache::KeyValueCache;
use crate::error::{AppError, AppResult, Dependency};
use crate::payments::PaymentProvider;
use crate::store::{CategoryStore, ProductStore, UserStore};

/// Everything a service may depend on; any of it may be absent
#[derive(Clone, Default)]
pub struct ServiceDeps {
    pub categories: Option<Arc<dyn CategoryStore>>,
    pub products: Option<Arc<dyn ProductStore>>,
    pub users: Option<Arc<dyn UserStore>>,
    pub cache: Option<Arc<dyn KeyValueCache>>,
    pub oauth: Option<Arc<dyn OAuthProvider>>,
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub tokens: Option<Arc<TokenIssuer>>,
}

impl ServiceDeps {
    /// Uses one store for every domain
    pub fn with_store<S>(store: S) -> Self
    where
        S: CategoryStore + ProductStore + UserStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            categories: Some(store.clone()),
            products: Some(store.clone()),
            users: Some(store),
            ..Self::default()
        }
    }

    pub fn cache(mut self, cache: Arc<dyn KeyValueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn oauth(mut self, oauth: Arc<dyn OAuthProvider>) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn payments(mut self, payments: Arc<dyn PaymentProvider>) -> Self {
        self.payments = Some(payments);
        self
    }

    pub fn tokens(mut self, tokens: Arc<TokenIssuer>) -> Self {
        self.tokens = Some(tokens);
        self
    }
}

fn require<T: ?Sized>(dep: &Option<Arc<T>>, which: Dependency) -> AppResult<()> {
    match dep {
        Some(_) => Ok(()),
        None => Err(AppError::NotConfigured(which)),
    }
}

pub struct ServiceRegistry {
    deps: ServiceDeps,
    category: LazyService<CategoryService>,
    product: LazyService<ProductService>,
    user: LazyService<UserService>,
    auth: LazyService<AuthService>,
    payment: LazyService<PaymentService>,
}

impl ServiceRegistry {
    pub fn new(deps: ServiceDeps) -> Self {
        Self {
            deps,
            category: LazyService::new(),
            product: LazyService::new(),
            user: LazyService::new(),
            auth: LazyService::new(),
            payment: LazyService::new(),
        }
    }

    pub fn deps(&self) -> &ServiceDeps {
        &self.deps
    }

    fn build_category(&self) -> CategoryService {
        CategoryService::new(self.deps.categories.clone())
    }

    fn build_product(&self) -> ProductService {
        ProductService::new(self.deps.products.clone())
    }

    fn build_user(&self) -> UserService {
        UserService::new(self.deps.users.clone())
    }

    fn build_auth(&self) -> AuthService {
        AuthService::new(
            self.deps.users.clone(),
            self.deps.cache.clone(),
            self.deps.oauth.clone(),
            self.deps.tokens.clone(),
        )
    }

    fn build_payment(&self) -> PaymentService {
        PaymentService::new(self.deps.payments.clone())
    }

    pub fn category_service(&self) -> Arc<CategoryService> {
        self.category.get_or_init(|| self.build_category())
    }

    pub fn product_service(&self) -> Arc<ProductService> {
        self.product.get_or_init(|| self.build_product())
    }

    pub fn user_service(&self) -> Arc<UserService> {
        self.user.get_or_init(|| self.build_user())
    }

    pub fn auth_service(&self) -> Arc<AuthService> {
        self.auth.get_or_init(|| self.build_auth())
    }

    pub fn payment_service(&self) -> Arc<PaymentService> {
        self.payment.get_or_init(|| self.build_payment())
    }

    pub fn init_category_service(&self) -> AppResult<Arc<CategoryService>> {
        self.category.try_init(|| {
            require(&self.deps.categories, Dependency::Database)?;
            Ok(self.build_category())
        })
    }

    pub fn init_product_service(&self) -> AppResult<Arc<ProductService>> {
        self.product.try_init(|| {
            require(&self.deps.products, Dependency::Database)?;
            Ok(self.build_product())
        })
    }

    pub fn init_user_service(&self) -> AppResult<Arc<UserService>> {
        self.user.try_init(|| {
            require(&self.deps.users, Dependency::Database)?;
            Ok(self.build_user())
        })
    }

    /// Google sign-in stays optional; local auth needs store, cache and tokens
    pub fn init_auth_service(&self) -> AppResult<Arc<AuthService>> {
        self.auth.try_init(|| {
            require(&self.deps.users, Dependency::Database)?;
            require(&self.deps.cache, Dependency::Cache)?;
            require(&self.deps.tokens, Dependency::TokenIssuer)?;
            Ok(self.build_auth())
        })
    }

    pub fn init_payment_service(&self) -> AppResult<Arc<PaymentService>> {
        self.payment.try_init(|| {
            require(&self.deps.payments, Dependency::PaymentProvider)?;
            Ok(self.build_payment())
        })
    }

    /// Builds every service whose dependencies are mandatory
    pub fn init_all(&self) -> AppResult<()> {
        self.init_category_service()?;
        self.init_product_service()?;
        self.init_user_service()?;
        self.init_auth_service()?;
        if self.deps.payments.is_some() {
            self.init_payment_service()?;
        }

        info!(
            google = self.deps.oauth.is_some(),
            payments = self.deps.payments.is_some(),
            "Services initialized"
        );
        Ok(())
    }
}
