//! Single insertion and removal points for renderer resource containers.
//!
//! A renderer keeps one container per resource category (buffers, textures,
//! pipelines, ...). Every object in it is exclusively owned by that
//! container; client code only receives the [`NonNull`] observer returned by
//! [`take_ownership`] and hands the same address back to
//! [`remove_from_unique_set`] when the resource is released.

use std::cmp::Ordering;
use std::collections::{HashMap, LinkedList, VecDeque};
use std::ptr::NonNull;
use std::sync::Arc;

fn address<T: ?Sized>(ptr: *const T) -> usize {
    ptr.cast::<()>() as usize
}

fn is_same<T: ?Sized>(owned: &T, entry: *const T) -> bool {
    address(owned as *const T) == address(entry)
}

// ---------------------------------------------------------------------------
// Owning containers
// ---------------------------------------------------------------------------

/// A container of exclusively owned, heap-allocated objects, addressed by
/// identity.
pub trait OwningContainer<T: ?Sized> {
    /// Store `object` and return the stored entry.
    fn insert_owned(&mut self, object: Box<T>) -> &mut T;

    /// Detach the object living at `entry`, if this container owns it.
    fn remove_owned(&mut self, entry: *const T) -> Option<Box<T>>;

    fn contains_owned(&self, entry: *const T) -> bool;

    fn owned_count(&self) -> usize;
}

impl<T: ?Sized> OwningContainer<T> for Vec<Box<T>> {
    fn insert_owned(&mut self, object: Box<T>) -> &mut T {
        let index = self.len();
        self.push(object);
        &mut *self[index]
    }

    fn remove_owned(&mut self, entry: *const T) -> Option<Box<T>> {
        let index = self.iter().position(|e| is_same(&**e, entry))?;
        Some(self.remove(index))
    }

    fn contains_owned(&self, entry: *const T) -> bool {
        self.iter().any(|e| is_same(&**e, entry))
    }

    fn owned_count(&self) -> usize {
        self.len()
    }
}

impl<T: ?Sized> OwningContainer<T> for VecDeque<Box<T>> {
    fn insert_owned(&mut self, object: Box<T>) -> &mut T {
        let index = self.len();
        self.push_back(object);
        &mut *self[index]
    }

    fn remove_owned(&mut self, entry: *const T) -> Option<Box<T>> {
        let index = self.iter().position(|e| is_same(&**e, entry))?;
        self.remove(index)
    }

    fn contains_owned(&self, entry: *const T) -> bool {
        self.iter().any(|e| is_same(&**e, entry))
    }

    fn owned_count(&self) -> usize {
        self.len()
    }
}

impl<T: ?Sized> OwningContainer<T> for LinkedList<Box<T>> {
    fn insert_owned(&mut self, object: Box<T>) -> &mut T {
        self.push_back(object);
        match self.back_mut() {
            Some(entry) => &mut **entry,
            None => unreachable!("list is empty right after push_back"),
        }
    }

    fn remove_owned(&mut self, entry: *const T) -> Option<Box<T>> {
        let index = self.iter().position(|e| is_same(&**e, entry))?;
        let mut tail = self.split_off(index);
        let removed = tail.pop_front();
        self.append(&mut tail);
        removed
    }

    fn contains_owned(&self, entry: *const T) -> bool {
        self.iter().any(|e| is_same(&**e, entry))
    }

    fn owned_count(&self) -> usize {
        self.len()
    }
}

/// Identity-keyed set of owned objects.
///
/// Lookup and removal are constant time. Zero-sized objects all share one
/// address; they are kept side by side and released one per removal.
pub struct UniqueSet<T: ?Sized> {
    // Buckets are never empty. Only zero-sized objects share a bucket.
    entries: HashMap<usize, Vec<Box<T>>>,
    len: usize,
}

impl<T: ?Sized> UniqueSet<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, entry: *const T) -> Option<&T> {
        self.entries.get(&address(entry)).and_then(|bucket| bucket.first()).map(|e| &**e)
    }

    pub fn get_mut(&mut self, entry: *const T) -> Option<&mut T> {
        self.entries
            .get_mut(&address(entry))
            .and_then(|bucket| bucket.first_mut())
            .map(|e| &mut **e)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values().flatten().map(|e| &**e)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}

impl<T: ?Sized> Default for UniqueSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for UniqueSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueSet").field("len", &self.len()).finish()
    }
}

impl<T: ?Sized> OwningContainer<T> for UniqueSet<T> {
    fn insert_owned(&mut self, object: Box<T>) -> &mut T {
        let key = address(&*object as *const T);
        self.len += 1;
        let bucket = self.entries.entry(key).or_default();
        bucket.push(object);
        let index = bucket.len() - 1;
        &mut *bucket[index]
    }

    fn remove_owned(&mut self, entry: *const T) -> Option<Box<T>> {
        let key = address(entry);
        let bucket = self.entries.get_mut(&key)?;
        let removed = bucket.pop()?;
        if bucket.is_empty() {
            self.entries.remove(&key);
        }
        self.len -= 1;
        Some(removed)
    }

    fn contains_owned(&self, entry: *const T) -> bool {
        self.entries.contains_key(&address(entry))
    }

    fn owned_count(&self) -> usize {
        self.len
    }
}

// ---------------------------------------------------------------------------
// Insertion / removal
// ---------------------------------------------------------------------------

/// Move `object` into `container` and return a non-owning observer to it.
///
/// The observer is taken from the stored entry, after the move into
/// `container`. It stays valid until the object is removed from `container`
/// or the container is dropped.
pub fn take_ownership<T, C>(container: &mut C, object: Box<T>) -> NonNull<T>
where
    T: ?Sized,
    C: OwningContainer<T> + ?Sized,
{
    NonNull::from(container.insert_owned(object))
}

/// Destroy the object at `entry` if `container` owns it.
///
/// Null and unknown addresses are ignored; returns whether an object was
/// destroyed.
pub fn remove_from_unique_set<T, C>(container: &mut C, entry: *const T) -> bool
where
    T: ?Sized,
    C: OwningContainer<T> + ?Sized,
{
    if entry.is_null() {
        return false;
    }
    container.remove_owned(entry).is_some()
}

/// Push `entry` unless the list already shares the same object.
pub fn add_once_to_shared_list<T: ?Sized>(list: &mut Vec<Arc<T>>, entry: &Arc<T>) -> bool {
    if list.iter().any(|e| Arc::ptr_eq(e, entry)) {
        return false;
    }
    list.push(Arc::clone(entry));
    true
}

/// Drop this list's reference to the object at `entry`.
///
/// Other holders of the same `Arc` keep it alive.
pub fn remove_from_shared_list<T: ?Sized>(list: &mut Vec<Arc<T>>, entry: *const T) -> bool {
    if entry.is_null() {
        return false;
    }
    match list.iter().position(|e| address(Arc::as_ptr(e)) == address(entry)) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Sorted arrays
// ---------------------------------------------------------------------------

/// Bisect a sorted slice.
///
/// `compare` orders the searched key relative to the given element:
/// `Greater` when the key sorts after it. Returns `Ok(index)` of the first
/// match the bisection hits, or `Err(index)` where the key would have to be
/// inserted to keep `data` sorted.
pub fn find_in_sorted_array<T, F>(data: &[T], mut compare: F) -> Result<usize, usize>
where
    F: FnMut(&T) -> Ordering,
{
    let mut first = 0;
    let mut last = data.len();
    while first < last {
        let mid = first + (last - first) / 2;
        match compare(&data[mid]) {
            Ordering::Greater => first = mid + 1,
            Ordering::Less => last = mid,
            Ordering::Equal => return Ok(mid),
        }
    }
    Err(first)
}

/// Find the entry matching `compare`, or insert `make()` where it sorts.
///
/// Returns the entry's index and whether it was inserted.
pub fn find_or_insert_sorted<T, F, M>(list: &mut Vec<T>, compare: F, make: M) -> (usize, bool)
where
    F: FnMut(&T) -> Ordering,
    M: FnOnce() -> T,
{
    match find_in_sorted_array(list, compare) {
        Ok(index) => (index, false),
        Err(index) => {
            list.insert(index, make());
            (index, true)
        }
    }
}
