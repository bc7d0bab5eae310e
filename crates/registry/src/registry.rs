use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::component::{Component, ComponentMeta, Handle};
use crate::error::RegistryError;

/// Slot storage behind the registry lock.
///
/// These methods assume the caller already holds the lock; the registry
/// wraps each one exactly once so internal calls never re-acquire it.
struct Tables<T: Component> {
    records: Box<[T]>,
    structs: Box<[T::Struct]>,
    names: HashMap<String, u32>,
    dirty: BTreeSet<u32>,
}

impl<T: Component> Tables<T> {
    fn new(capacity: u32) -> Self {
        let records: Vec<T> = (0..capacity)
            .map(|i| T::with_meta(ComponentMeta::null(i)))
            .collect();
        Self {
            records: records.into_boxed_slice(),
            structs: vec![T::null_struct(); capacity as usize].into_boxed_slice(),
            names: HashMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    fn capacity(&self) -> u32 {
        self.records.len() as u32
    }

    fn lookup(&self, name: &str) -> Option<u32> {
        self.names.get(name).copied()
    }

    fn live(&self, index: u32) -> Option<&T> {
        self.records
            .get(index as usize)
            .filter(|r| r.is_initialized())
    }

    fn live_mut(&mut self, index: u32) -> Result<&mut T, RegistryError> {
        match self.records.get_mut(index as usize) {
            Some(record) if record.is_initialized() => Ok(record),
            Some(_) => Err(RegistryError::invalid(
                T::KIND,
                format!("slot {index} holds no live record"),
            )),
            None => Err(out_of_range::<T>(index)),
        }
    }

    /// First-fit allocation of a fresh, dirty record named `name`.
    fn allocate(&mut self, name: &str) -> Result<u32, RegistryError> {
        if self.names.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                kind: T::KIND,
                name: name.to_owned(),
            });
        }
        let index = self
            .records
            .iter()
            .position(|r| !r.is_initialized())
            .ok_or(RegistryError::CapacityExceeded {
                kind: T::KIND,
                capacity: self.capacity(),
            })? as u32;

        self.records[index as usize] = T::with_meta(ComponentMeta::live(name, index));
        self.names.insert(name.to_owned(), index);
        self.dirty.insert(index);
        Ok(index)
    }

    /// Drop the record in `index`, erase its name and queue the slot so the
    /// next pass resets its struct.
    fn retire(&mut self, index: u32) {
        let slot = &mut self.records[index as usize];
        if slot.is_initialized() {
            self.names.remove(slot.name());
        }
        *slot = T::with_meta(ComponentMeta::retired(index));
        self.dirty.insert(index);
    }

    fn mark_dirty(&mut self, index: u32) -> Result<(), RegistryError> {
        let record = self
            .records
            .get_mut(index as usize)
            .ok_or_else(|| out_of_range::<T>(index))?;
        record.meta_mut().mark_dirty();
        self.dirty.insert(index);
        Ok(())
    }

    fn sync(&mut self, visit: &mut impl FnMut(Handle<T>, &T, &T::Struct)) -> usize {
        let dirty = std::mem::take(&mut self.dirty);
        for &index in &dirty {
            let i = index as usize;
            let record = &mut self.records[i];
            record.meta_mut().mark_clean();
            if record.is_initialized() {
                self.structs[i] = record.to_struct();
                tracing::trace!(kind = %T::KIND, index, "struct refreshed");
                visit(Handle::from_index(index), record, &self.structs[i]);
            } else {
                self.structs[i] = T::null_struct();
                tracing::trace!(kind = %T::KIND, index, "struct retired");
            }
        }
        dirty.len()
    }
}

fn out_of_range<T: Component>(index: u32) -> RegistryError {
    RegistryError::invalid(T::KIND, format!("slot {index} is outside the allocated table"))
}

fn borrowed<T: Component>() -> RegistryError {
    RegistryError::invalid(
        T::KIND,
        "tables are borrowed by the current thread (front slice or edit closure still alive)",
    )
}

/// Fixed-capacity, name-addressable component table for one component kind.
///
/// Records live in a pre-sized slot array; their render structs live in a
/// parallel array with the same indices. Every operation runs under one
/// re-entrant lock, so a thread already holding [`Registry::lock`] may keep
/// calling into the registry.
///
/// Capacity is chosen once by [`Registry::initialize_factory`] and never
/// changes, so slot indices stay valid for the renderer across frames.
pub struct Registry<T: Component> {
    state: ReentrantMutex<RefCell<Option<Tables<T>>>>,
    /// Mirrors `!dirty.is_empty()`, readable without taking the lock.
    any_dirty: AtomicBool,
}

impl<T: Component> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Registry<T> {
    /// Create an uninitialized registry. Call `initialize_factory` before use.
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(None)),
            any_dirty: AtomicBool::new(false),
        }
    }

    /// Create a registry and allocate its tables in one step.
    pub fn with_capacity(max_components: u32) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(Some(Tables::new(max_components)))),
            any_dirty: AtomicBool::new(false),
        }
    }

    /// Allocate the slot and struct tables. Calling it again is a no-op.
    pub fn initialize_factory(&self, max_components: u32) -> Result<(), RegistryError> {
        let guard = self.state.lock();
        let mut cell = guard.try_borrow_mut().map_err(|_| borrowed::<T>())?;
        if cell.is_some() {
            tracing::debug!(kind = %T::KIND, "registry already initialized");
            return Ok(());
        }
        *cell = Some(Tables::new(max_components));
        tracing::debug!(kind = %T::KIND, capacity = max_components, "registry initialized");
        Ok(())
    }

    pub fn is_factory_initialized(&self) -> bool {
        let guard = self.state.lock();
        // a live mutable borrow only exists on initialized tables
        let initialized = guard.try_borrow().map(|cell| cell.is_some()).unwrap_or(true);
        initialized
    }

    /// Release both tables. The registry must be initialized again before use.
    pub fn teardown(&self) -> Result<(), RegistryError> {
        let guard = self.state.lock();
        let mut cell = guard.try_borrow_mut().map_err(|_| borrowed::<T>())?;
        *cell = None;
        self.any_dirty.store(false, Ordering::Release);
        tracing::debug!(kind = %T::KIND, "registry torn down");
        Ok(())
    }

    /// Acquire the registry lock for a consistent view across several calls.
    ///
    /// The lock is re-entrant: registry methods called while the guard is
    /// alive succeed on the same thread. Slices borrowed from the guard must
    /// be dropped before mutating again, otherwise the mutation fails with
    /// `InvalidState`.
    pub fn lock(&self) -> RegistryGuard<'_, T> {
        RegistryGuard {
            guard: self.state.lock(),
        }
    }

    fn read_tables<R>(
        &self,
        f: impl FnOnce(&Tables<T>) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let guard = self.state.lock();
        let cell = guard.try_borrow().map_err(|_| borrowed::<T>())?;
        let tables = cell
            .as_ref()
            .ok_or(RegistryError::NotInitialized { kind: T::KIND })?;
        f(tables)
    }

    fn write_tables<R>(
        &self,
        f: impl FnOnce(&mut Tables<T>) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let guard = self.state.lock();
        let mut cell = guard.try_borrow_mut().map_err(|_| borrowed::<T>())?;
        let tables = cell
            .as_mut()
            .ok_or(RegistryError::NotInitialized { kind: T::KIND })?;
        let result = f(tables);
        self.publish_dirty(tables);
        result
    }

    fn publish_dirty(&self, tables: &Tables<T>) {
        self.any_dirty
            .store(!tables.dirty.is_empty(), Ordering::Release);
    }

    /// Fixed number of slots.
    pub fn capacity(&self) -> Result<u32, RegistryError> {
        self.read_tables(|t| Ok(t.capacity()))
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize, RegistryError> {
        self.read_tables(|t| Ok(t.names.len()))
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        self.len().map(|n| n == 0)
    }

    /// Create a fresh, dirty record named `name`.
    pub fn create(&self, name: &str) -> Result<Handle<T>, RegistryError> {
        self.create_with(name, |_| Ok::<(), RegistryError>(()))
    }

    /// Create a record and run `init` on it before it becomes visible to
    /// other threads.
    ///
    /// If `init` fails or panics, the slot is retired and the name erased
    /// before the lock is released, so no half-built record stays live.
    pub fn create_with<E>(
        &self,
        name: &str,
        init: impl FnOnce(&mut T) -> Result<(), E>,
    ) -> Result<Handle<T>, E>
    where
        E: From<RegistryError>,
    {
        let guard = self.state.lock();
        let mut cell = guard.try_borrow_mut().map_err(|_| borrowed::<T>())?;
        let tables = cell
            .as_mut()
            .ok_or(RegistryError::NotInitialized { kind: T::KIND })?;
        let index = tables.allocate(name)?;

        let outcome = {
            let mut pending = PendingSlot::new(tables, index);
            let outcome = init(pending.record());
            if outcome.is_ok() {
                pending.commit();
            }
            outcome
        };
        self.publish_dirty(tables);

        outcome?;
        tracing::debug!(kind = %T::KIND, name, index, "component created");
        Ok(Handle::from_index(index))
    }

    /// Look up a live record by name. A miss is `Ok(None)`.
    pub fn get(&self, name: &str) -> Result<Option<Handle<T>>, RegistryError> {
        self.read_tables(|t| Ok(t.lookup(name).map(Handle::from_index)))
    }

    /// Look up a live record by id (slot index).
    pub fn get_by_id(&self, id: u32) -> Result<Option<Handle<T>>, RegistryError> {
        self.read_tables(|t| Ok(t.live(id).map(|_| Handle::from_index(id))))
    }

    /// Whether `handle` still names a live record.
    pub fn contains(&self, handle: Handle<T>) -> Result<bool, RegistryError> {
        self.read_tables(|t| Ok(t.live(handle.index()).is_some()))
    }

    /// Remove the record named `name`. Returns `false` if it was absent.
    pub fn remove(&self, name: &str) -> Result<bool, RegistryError> {
        self.write_tables(|t| {
            Ok(match t.lookup(name) {
                Some(index) => {
                    t.retire(index);
                    tracing::debug!(kind = %T::KIND, name, index, "component removed");
                    true
                }
                None => false,
            })
        })
    }

    /// Remove the record with the given id. Returns `false` if the slot was empty.
    pub fn remove_by_id(&self, id: u32) -> Result<bool, RegistryError> {
        self.write_tables(|t| {
            if t.live(id).is_none() {
                return Ok(false);
            }
            t.retire(id);
            tracing::debug!(kind = %T::KIND, index = id, "component removed");
            Ok(true)
        })
    }

    /// Remove every live record. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize, RegistryError> {
        self.write_tables(|t| {
            let live: Vec<u32> = t.names.values().copied().collect();
            for &index in &live {
                t.retire(index);
            }
            tracing::debug!(kind = %T::KIND, removed = live.len(), "registry cleared");
            Ok(live.len())
        })
    }

    /// Run `f` against a live record.
    pub fn read<R>(&self, handle: Handle<T>, f: impl FnOnce(&T) -> R) -> Result<R, RegistryError> {
        self.read_tables(|t| {
            t.live(handle.index()).map(f).ok_or_else(|| {
                RegistryError::invalid(
                    T::KIND,
                    format!("slot {} holds no live record", handle.index()),
                )
            })
        })
    }

    /// Run `f` against a live record, then queue the slot for the next pass
    /// if `f` left the record dirty.
    ///
    /// `f` must not call back into this registry.
    pub fn edit<R>(
        &self,
        handle: Handle<T>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, RegistryError> {
        self.write_tables(|t| {
            let record = t.live_mut(handle.index())?;
            let out = f(record);
            if record.is_dirty() {
                t.dirty.insert(handle.index());
            }
            Ok(out)
        })
    }

    /// Like [`Registry::edit`], addressed by name. Returns `Ok(None)` on a miss.
    pub fn edit_by_name<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<Option<R>, RegistryError> {
        let _guard = self.state.lock();
        match self.get(name)? {
            Some(handle) => self.edit(handle, f).map(Some),
            None => Ok(None),
        }
    }

    /// Queue a slot for the next synchronization pass.
    pub fn mark_dirty(&self, handle: Handle<T>) -> Result<(), RegistryError> {
        self.write_tables(|t| t.mark_dirty(handle.index()))
    }

    /// True if at least one slot is waiting for a synchronization pass.
    pub fn are_any_dirty(&self) -> bool {
        self.any_dirty.load(Ordering::Acquire)
    }

    /// Recompute the render struct of every dirty slot and mark it clean.
    /// Returns the number of slots synchronized; zero means nothing changed.
    pub fn update_components(&self) -> Result<usize, RegistryError> {
        self.update_components_with(|_, _, _| {})
    }

    /// Synchronization pass that also reports each refreshed live record to
    /// `visit`, e.g. so a collaborator can re-upload a changed payload.
    ///
    /// Retired slots get the null struct and are not visited. `visit` must
    /// not call back into this registry.
    pub fn update_components_with(
        &self,
        mut visit: impl FnMut(Handle<T>, &T, &T::Struct),
    ) -> Result<usize, RegistryError> {
        self.write_tables(|t| {
            if t.dirty.is_empty() {
                return Ok(0);
            }
            let synced = t.sync(&mut visit);
            tracing::debug!(kind = %T::KIND, synced, "components synchronized");
            Ok(synced)
        })
    }

    /// Owned snapshot of the name table.
    pub fn name_to_id_map(&self) -> Result<BTreeMap<String, u32>, RegistryError> {
        self.read_tables(|t| {
            Ok(t.names
                .iter()
                .map(|(name, &id)| (name.clone(), id))
                .collect())
        })
    }

    /// Handles of all live records, in slot order.
    pub fn handles(&self) -> Result<Vec<Handle<T>>, RegistryError> {
        self.read_tables(|t| {
            Ok(t.records
                .iter()
                .filter(|r| r.is_initialized())
                .map(|r| Handle::from_index(r.id()))
                .collect())
        })
    }

    /// Deterministic JSON snapshot of a record's fields.
    pub fn describe(&self, handle: Handle<T>) -> Result<String, RegistryError> {
        self.read(handle, |record| format!("{:#}", record.to_json()))
    }
}

/// Lock guard exposing the raw front arrays.
///
/// While the guard is alive no other thread can mutate the registry, so the
/// slices it hands out form a consistent snapshot.
pub struct RegistryGuard<'a, T: Component> {
    guard: ReentrantMutexGuard<'a, RefCell<Option<Tables<T>>>>,
}

impl<T: Component> RegistryGuard<'_, T> {
    fn tables(&self) -> Result<Ref<'_, Option<Tables<T>>>, RegistryError> {
        self.guard.try_borrow().map_err(|_| borrowed::<T>())
    }

    /// All record slots, live or null, in slot order.
    pub fn front(&self) -> Result<Ref<'_, [T]>, RegistryError> {
        Ref::filter_map(self.tables()?, |t| t.as_ref().map(|t| &*t.records))
            .map_err(|_| RegistryError::NotInitialized { kind: T::KIND })
    }

    /// All render structs, indexed like [`RegistryGuard::front`]. The backing
    /// storage is never reallocated while the registry stays initialized.
    pub fn front_struct(&self) -> Result<Ref<'_, [T::Struct]>, RegistryError> {
        Ref::filter_map(self.tables()?, |t| t.as_ref().map(|t| &*t.structs))
            .map_err(|_| RegistryError::NotInitialized { kind: T::KIND })
    }

    /// The render struct array as raw bytes, ready for a buffer upload.
    pub fn front_struct_bytes(&self) -> Result<Ref<'_, [u8]>, RegistryError> {
        Ok(Ref::map(self.front_struct()?, |s| bytemuck::cast_slice(s)))
    }
}

/// A slot allocated by `create_with` whose initializer has not finished.
/// Dropping it without `commit` retires the slot.
struct PendingSlot<'a, T: Component> {
    tables: &'a mut Tables<T>,
    index: u32,
    committed: bool,
}

impl<'a, T: Component> PendingSlot<'a, T> {
    fn new(tables: &'a mut Tables<T>, index: u32) -> Self {
        Self {
            tables,
            index,
            committed: false,
        }
    }

    fn record(&mut self) -> &mut T {
        &mut self.tables.records[self.index as usize]
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl<T: Component> Drop for PendingSlot<'_, T> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::warn!(kind = %T::KIND, index = self.index, "component creation failed, rolling back");
            self.tables.retire(self.index);
        }
    }
}
