use std::marker::PhantomData;
use std::sync::Arc;

use futures::lock::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{BlobStore, StoreError};

/// A record kept in a [`Collection`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Blob key the whole collection is stored under.
    const KEY: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

/// Typed view over one serialized list in a [`BlobStore`].
///
/// Every write loads the whole list, mutates it and saves it back. Writers
/// are serialized by an async mutex so two requests never interleave a
/// read-modify-write; readers go straight to the store.
pub struct Collection<T> {
    store: Arc<BlobStore>,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

/// What is actually written under [`Record::KEY`].
///
/// `next_id` is a high-water mark, so ids freed by a delete are never
/// handed out again.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    next_id: u64,
    items: Vec<T>,
}

/// Blobs written before the envelope existed were a bare list.
#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "T: DeserializeOwned"))]
enum Stored<T> {
    Envelope(Envelope<T>),
    Bare(Vec<T>),
}

impl<T: Record> Envelope<T> {
    fn empty() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }

    fn take_id(&mut self) -> u64 {
        let floor = self.items.iter().map(Record::id).max().unwrap_or(0) + 1;
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.items.iter().position(|r| r.id() == id)
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    async fn load(&self) -> Result<Envelope<T>, StoreError> {
        let raw = match self.store.get(T::KEY).await? {
            None => return Ok(Envelope::empty()),
            Some(raw) if raw.trim().is_empty() => return Ok(Envelope::empty()),
            Some(raw) => raw,
        };
        let stored = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            key: T::KEY.to_string(),
            source,
        })?;
        Ok(match stored {
            Stored::Envelope(env) => env,
            Stored::Bare(items) => {
                let next_id = items.iter().map(Record::id).max().unwrap_or(0) + 1;
                Envelope { next_id, items }
            }
        })
    }

    async fn save(&self, env: &Envelope<T>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(env).map_err(|source| StoreError::Corrupt {
            key: T::KEY.to_string(),
            source,
        })?;
        self.store.put(T::KEY, raw).await
    }

    pub async fn all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.load().await?.items)
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.load().await?.items.len())
    }

    pub async fn get(&self, id: u64) -> Result<Option<T>, StoreError> {
        Ok(self.all().await?.into_iter().find(|r| r.id() == id))
    }

    pub async fn find<F>(&self, pred: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().filter(|r| pred(r)).collect())
    }

    pub async fn find_one<F>(&self, pred: F) -> Result<Option<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|r| pred(r)))
    }

    /// Appends `record` with the next free id and returns the stored copy.
    pub async fn insert(&self, record: T) -> Result<T, StoreError> {
        self.insert_with(|_| Ok::<_, StoreError>(record)).await
    }

    /// Like [`insert`](Self::insert), but `build` sees the current list
    /// under the write lock and may refuse (e.g. on a duplicate key).
    pub async fn insert_with<F, E>(&self, build: F) -> Result<T, E>
    where
        F: FnOnce(&[T]) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut env = self.load().await?;

        let mut record = build(&env.items)?;
        record.set_id(env.take_id());

        env.items.push(record.clone());
        self.save(&env).await?;
        Ok(record)
    }

    /// Drops every record `keep` rejects, then appends `record`, in one write.
    pub async fn insert_retaining<P>(&self, keep: P, mut record: T) -> Result<T, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut env = self.load().await?;

        env.items.retain(|r| keep(r));
        record.set_id(env.take_id());

        env.items.push(record.clone());
        self.save(&env).await?;
        Ok(record)
    }

    /// Appends several records at once, assigning consecutive ids.
    pub async fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>, StoreError> {
        if records.is_empty() {
            return Ok(records);
        }

        let _guard = self.write_lock.lock().await;
        let mut env = self.load().await?;

        let mut stored = Vec::with_capacity(records.len());
        for mut record in records {
            record.set_id(env.take_id());
            stored.push(record.clone());
            env.items.push(record);
        }

        self.save(&env).await?;
        Ok(stored)
    }

    /// Mutates the record with `id` in place.
    ///
    /// Returns `Ok(None)` when no such record exists. If `f` fails nothing
    /// is written.
    pub async fn update<F, E>(&self, id: u64, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
        E: From<StoreError>,
    {
        self.update_with(id, |_, record| f(record)).await
    }

    /// Like [`update`](Self::update), but `f` also sees the whole list as it
    /// was before the change, so uniqueness checks happen under the lock.
    pub async fn update_with<F, E>(&self, id: u64, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&[T], &mut T) -> Result<(), E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut env = self.load().await?;

        let Some(pos) = env.position(id) else {
            return Ok(None);
        };
        let mut record = env.items[pos].clone();
        f(&env.items, &mut record)?;
        env.items[pos] = record.clone();

        self.save(&env).await?;
        Ok(Some(record))
    }

    /// Applies `f` to every record matching `pred`; returns how many changed.
    pub async fn update_where<P, F>(&self, pred: P, mut f: F) -> Result<usize, StoreError>
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let _guard = self.write_lock.lock().await;
        let mut env = self.load().await?;

        let mut changed = 0;
        for record in env.items.iter_mut().filter(|r| pred(r)) {
            f(record);
            changed += 1;
        }

        if changed > 0 {
            self.save(&env).await?;
        }
        Ok(changed)
    }

    pub async fn delete(&self, id: u64) -> Result<Option<T>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut env = self.load().await?;

        let Some(pos) = env.position(id) else {
            return Ok(None);
        };
        let removed = env.items.remove(pos);

        self.save(&env).await?;
        Ok(Some(removed))
    }
}
