use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use futures::task::LocalSpawn;

use crate::{
    middleware::{MiddlewareEntry, Next},
    store::StoreNode,
    Action, ActionCall, BoxError, MiddlewareId, Store, StoreConfig, Value,
};


/// Owner of everything stores created from it share:
/// the store counter, the middleware chain, the id lookup and the flush spawner.
#[derive(Clone)]
pub struct Registry(Rc<RawRegistry>);

struct RawRegistry {
    spawner: Rc<dyn LocalSpawn>,
    idx_next: Cell<usize>,
    middlewares: RefCell<Rc<[MiddlewareEntry]>>,
    middleware_id_next: Cell<usize>,
    stores: RefCell<HashMap<Rc<str>, Weak<StoreNode>>>,
}

impl Registry {
    /// Creates a registry whose stores schedule their flushes on `spawner`.
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self(Rc::new(RawRegistry {
            spawner: Rc::new(spawner),
            idx_next: Cell::new(0),
            middlewares: RefCell::new(Vec::new().into()),
            middleware_id_next: Cell::new(0),
            stores: RefCell::new(HashMap::new()),
        }))
    }

    pub fn create_store(&self, config: StoreConfig) -> Store {
        let idx = self.0.idx_next.get();
        self.0.idx_next.set(idx + 1);
        let store = Store::new(config, idx, self.clone());
        self.0
            .stores
            .borrow_mut()
            .insert(store.id().into(), store.downgrade());
        store
    }

    /// Looks up a live store by id.
    pub fn store(&self, id: &str) -> Option<Store> {
        let node = self.0.stores.borrow().get(id)?.upgrade()?;
        Some(Store::from_node(node))
    }
    pub fn remove_store(&self, id: &str) -> bool {
        self.0.stores.borrow_mut().remove(id).is_some()
    }
    pub fn store_count(&self) -> usize {
        self.0
            .stores
            .borrow()
            .values()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    /// Appends a middleware to the chain shared by every store of this registry.
    pub fn add_middleware(
        &self,
        f: impl Fn(&mut ActionCall, Next) -> Result<(), BoxError> + 'static,
    ) -> MiddlewareId {
        let id = MiddlewareId(self.0.middleware_id_next.get());
        self.0.middleware_id_next.set(id.0 + 1);
        let mut middlewares = self.0.middlewares.borrow_mut();
        let mut entries = middlewares.to_vec();
        entries.push(MiddlewareEntry { id, f: Rc::new(f) });
        *middlewares = entries.into();
        id
    }
    pub fn remove_middleware(&self, id: MiddlewareId) -> bool {
        let mut middlewares = self.0.middlewares.borrow_mut();
        if !middlewares.iter().any(|e| e.id == id) {
            return false;
        }
        *middlewares = middlewares.iter().filter(|e| e.id != id).cloned().collect();
        true
    }
    pub fn middleware_count(&self) -> usize {
        self.0.middlewares.borrow().len()
    }

    /// Runs `action` through the middleware chain as it is now.
    ///
    /// Changes to the chain made while dispatching apply to later dispatches.
    pub fn dispatch(&self, store: &Store, name: &str, action: Action, args: Vec<Value>) {
        let chain = self.0.middlewares.borrow().clone();
        let mut call = ActionCall {
            store: store.clone(),
            name: name.into(),
            action,
            args,
        };
        Next::new(chain).run(&mut call);
    }

    pub(crate) fn spawner(&self) -> &dyn LocalSpawn {
        &*self.0.spawner
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("stores", &self.store_count())
            .field("middlewares", &self.middleware_count())
            .finish()
    }
}
