//! Handle registry.
//!
//! Every object handed across the boundary lives in one of four tables and
//! is referred to by an opaque token. Tokens come from a per-table counter
//! starting at 1 and are never reused, so a stale token can only miss.
//! All four tables sit behind a single reader/writer lock: lookups share it,
//! allocation and release take it exclusively.

use std::collections::HashMap;
use std::sync::Arc;

use hdfs5_client::{FileReader, FileWriter};
use hdfs5_config::Configuration;
use hdfs5_types::Handle;
use parking_lot::RwLock;

use crate::bridge::ClientSession;

pub struct HandleTable<T> {
    next: u64,
    live: HashMap<u64, T>,
}

impl<T> HandleTable<T> {
    fn new() -> Self {
        Self {
            next: 1,
            live: HashMap::new(),
        }
    }

    fn insert(&mut self, obj: T) -> Handle {
        let id = self.next;
        self.next += 1;
        self.live.insert(id, obj);
        Handle::from_raw(id)
    }

    fn get(&self, handle: Handle) -> Option<&T> {
        self.live.get(&handle.as_raw())
    }

    fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.live.get_mut(&handle.as_raw())
    }

    fn remove(&mut self, handle: Handle) -> Option<T> {
        self.live.remove(&handle.as_raw())
    }

    /// Take every live entry, keeping the counter.
    fn drain(&mut self) -> Vec<(Handle, T)> {
        self.live
            .drain()
            .map(|(id, obj)| (Handle::from_raw(id), obj))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

pub struct Tables {
    configurations: HandleTable<Configuration>,
    clients: HandleTable<ClientSession>,
    readers: HandleTable<Arc<dyn FileReader>>,
    writers: HandleTable<Arc<dyn FileWriter>>,
}

impl Tables {
    fn new() -> Self {
        Self {
            configurations: HandleTable::new(),
            clients: HandleTable::new(),
            readers: HandleTable::new(),
            writers: HandleTable::new(),
        }
    }
}

/// Everything that was live when the registry was drained.
pub struct Drained {
    pub configurations: Vec<(Handle, Configuration)>,
    pub clients: Vec<(Handle, ClientSession)>,
    pub readers: Vec<(Handle, Arc<dyn FileReader>)>,
    pub writers: Vec<(Handle, Arc<dyn FileWriter>)>,
}

/// An object kind with its own table.
pub trait Registered: Clone + Send + Sync + 'static {
    fn table(tables: &Tables) -> &HandleTable<Self>;
    fn table_mut(tables: &mut Tables) -> &mut HandleTable<Self>;
}

macro_rules! registered {
    ($ty:ty, $field:ident) => {
        impl Registered for $ty {
            fn table(tables: &Tables) -> &HandleTable<Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut HandleTable<Self> {
                &mut tables.$field
            }
        }
    };
}

registered!(Configuration, configurations);
registered!(ClientSession, clients);
registered!(Arc<dyn FileReader>, readers);
registered!(Arc<dyn FileWriter>, writers);

pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
        }
    }

    pub fn allocate<T: Registered>(&self, obj: T) -> Handle {
        T::table_mut(&mut self.tables.write()).insert(obj)
    }

    /// A clone of the live object behind `handle`.
    pub fn lookup<T: Registered>(&self, handle: Handle) -> Option<T> {
        T::table(&self.tables.read()).get(handle).cloned()
    }

    /// Remove and return the object. Unknown handles return `None` and leave
    /// the tables untouched.
    pub fn release<T: Registered>(&self, handle: Handle) -> Option<T> {
        T::table_mut(&mut self.tables.write()).remove(handle)
    }

    /// Mutate the live object in place.
    pub fn update<T: Registered, R>(&self, handle: Handle, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        T::table_mut(&mut self.tables.write()).get_mut(handle).map(f)
    }

    /// Atomically release `old` and register `obj` in its place.
    ///
    /// If `old` is no longer live nothing changes and `obj` is handed back.
    pub fn exchange<A: Registered, B: Registered>(&self, old: Handle, obj: B) -> Result<(A, Handle), B> {
        let mut tables = self.tables.write();
        match A::table_mut(&mut tables).remove(old) {
            Some(prev) => Ok((prev, B::table_mut(&mut tables).insert(obj))),
            None => Err(obj),
        }
    }

    pub fn len<T: Registered>(&self) -> usize {
        T::table(&self.tables.read()).len()
    }

    /// Remove every live object of every kind in one step.
    pub fn drain_all(&self) -> Drained {
        let mut tables = self.tables.write();
        Drained {
            configurations: tables.configurations.drain(),
            clients: tables.clients.drain(),
            readers: tables.readers.drain(),
            writers: tables.writers.drain(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfs5_client::{ClientResult, Connector, LocalConnector};
    use hdfs5_config::{ClientOptions, LocalIdentityProvider};
    use std::collections::HashSet;

    struct NullReader;

    impl FileReader for NullReader {
        fn read(&self, _buf: &mut [u8]) -> ClientResult<usize> {
            Ok(0)
        }
        fn read_at(&self, _offset: u64, _buf: &mut [u8]) -> ClientResult<usize> {
            Ok(0)
        }
        fn seek(&self, _offset: u64) -> ClientResult<()> {
            Ok(())
        }
        fn tell(&self) -> ClientResult<u64> {
            Ok(0)
        }
        fn close(&self) -> ClientResult<()> {
            Ok(())
        }
    }

    struct NullWriter;

    impl FileWriter for NullWriter {
        fn write(&self, buf: &[u8]) -> ClientResult<usize> {
            Ok(buf.len())
        }
        fn flush(&self) -> ClientResult<()> {
            Ok(())
        }
        fn close(&self) -> ClientResult<()> {
            Ok(())
        }
    }

    fn configuration() -> Configuration {
        Configuration::new(Arc::new(LocalIdentityProvider))
    }

    fn session(dir: &std::path::Path) -> ClientSession {
        let options = ClientOptions::for_user(vec!["local".into()], "tester");
        let fs = LocalConnector::new(dir).connect(&options).unwrap();
        ClientSession::new(fs, options)
    }

    #[test]
    fn test_lookup_after_release_misses_for_every_kind() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();

        let h = registry.allocate(configuration());
        assert!(registry.lookup::<Configuration>(h).is_some());
        assert!(registry.release::<Configuration>(h).is_some());
        assert!(registry.lookup::<Configuration>(h).is_none());

        let h = registry.allocate(session(dir.path()));
        assert!(registry.lookup::<ClientSession>(h).is_some());
        assert!(registry.release::<ClientSession>(h).is_some());
        assert!(registry.lookup::<ClientSession>(h).is_none());

        let reader: Arc<dyn FileReader> = Arc::new(NullReader);
        let h = registry.allocate(reader);
        assert!(registry.release::<Arc<dyn FileReader>>(h).is_some());
        assert!(registry.lookup::<Arc<dyn FileReader>>(h).is_none());

        let writer: Arc<dyn FileWriter> = Arc::new(NullWriter);
        let h = registry.allocate(writer);
        assert!(registry.release::<Arc<dyn FileWriter>>(h).is_some());
        assert!(registry.lookup::<Arc<dyn FileWriter>>(h).is_none());

        // A second release is harmless.
        assert!(registry.release::<Arc<dyn FileWriter>>(h).is_none());
    }

    #[test]
    fn test_tokens_are_not_reused() {
        let registry = Registry::new();
        let a = registry.allocate(configuration());
        assert!(registry.release::<Configuration>(a).is_some());
        let b = registry.allocate(configuration());
        assert_ne!(a, b);
        assert!(!a.is_null() && !b.is_null());
        assert!(registry.lookup::<Configuration>(Handle::NULL).is_none());
    }

    #[test]
    fn test_kinds_do_not_alias() {
        let registry = Registry::new();
        let config = registry.allocate(configuration());
        let reader: Arc<dyn FileReader> = Arc::new(NullReader);
        let r = registry.allocate(reader);
        // Both tables start at 1; the table a token is looked up in decides.
        assert_eq!(config, r);
        assert!(registry.lookup::<Arc<dyn FileWriter>>(r).is_none());
        assert!(registry.release::<Arc<dyn FileReader>>(r).is_some());
        assert!(registry.lookup::<Configuration>(config).is_some());
    }

    #[test]
    fn test_concurrent_allocation_yields_unique_tokens() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;
        let registry = Registry::new();

        let tokens: Vec<Handle> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        (0..PER_THREAD)
                            .map(|_| {
                                let writer: Arc<dyn FileWriter> = Arc::new(NullWriter);
                                registry.allocate(writer)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect()
        });

        let unique: HashSet<Handle> = tokens.iter().copied().collect();
        assert_eq!(unique.len(), THREADS * PER_THREAD);
        assert_eq!(registry.len::<Arc<dyn FileWriter>>(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_update_and_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        let h = registry.allocate(configuration());

        let updated = registry.update::<Configuration, _>(h, |c| c.set_user("alice"));
        assert!(updated.is_some());
        let c = registry.lookup::<Configuration>(h).unwrap();
        assert_eq!(c.user.as_deref(), Some("alice"));
        assert!(registry
            .update::<Configuration, _>(Handle::from_raw(999), |_| ())
            .is_none());

        let (prev, client) = registry
            .exchange::<Configuration, ClientSession>(h, session(dir.path()))
            .ok()
            .unwrap();
        assert_eq!(prev.user.as_deref(), Some("alice"));
        assert!(registry.lookup::<Configuration>(h).is_none());
        assert!(registry.lookup::<ClientSession>(client).is_some());

        let again = registry.exchange::<Configuration, ClientSession>(h, session(dir.path()));
        assert!(again.is_err());
        assert_eq!(registry.len::<ClientSession>(), 1);
    }

    #[test]
    fn test_drain_all() {
        let registry = Registry::new();
        let before = registry.allocate(configuration());
        let writer: Arc<dyn FileWriter> = Arc::new(NullWriter);
        registry.allocate(writer);

        let drained = registry.drain_all();
        assert_eq!(drained.configurations.len(), 1);
        assert_eq!(drained.writers.len(), 1);
        assert_eq!(registry.len::<Configuration>(), 0);

        let after = registry.allocate(configuration());
        assert!(after.as_raw() > before.as_raw());
    }
}
