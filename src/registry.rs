//! Client registry: the ordered set of managed windows.
//!
//! Order is tiling order. Index 0 is always the master slot, new clients are
//! appended at the tail, and removal shifts later clients down by one so the
//! relative order of the survivors never changes.

use std::collections::TryReserveError;

use crate::types::{Handle, Rect};

/// Default maximum number of managed clients
pub const DEFAULT_CAPACITY: usize = 100;

/// A managed application window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    handle: Handle,
    geometry: Rect,
}

impl Client {
    pub fn new(handle: Handle, geometry: Rect) -> Self {
        Self { handle, geometry }
    }

    /// The server-side window id
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Last geometry applied to this client
    pub fn geometry(&self) -> Rect {
        self.geometry
    }
}

/// Why a client could not be added
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry is full ({capacity} clients)")]
    CapacityExceeded { capacity: usize },
    #[error("cannot allocate registry entry: {0}")]
    AllocationFailure(#[from] TryReserveError),
    #[error("window 0x{0:x} is already managed")]
    AlreadyManaged(Handle),
}

/// Ordered collection of managed clients with a fixed upper bound
#[derive(Debug)]
pub struct Registry {
    clients: Vec<Client>,
    capacity: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty registry that holds at most `capacity` clients
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            clients: Vec::new(),
            capacity,
        }
    }

    /// Append a client at the tail and return its index.
    ///
    /// On error the registry is left untouched.
    pub fn add(&mut self, handle: Handle, geometry: Rect) -> Result<usize, RegistryError> {
        if self.contains(handle) {
            return Err(RegistryError::AlreadyManaged(handle));
        }
        if self.clients.len() >= self.capacity {
            return Err(RegistryError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.clients.try_reserve(1)?;
        self.clients.push(Client::new(handle, geometry));
        Ok(self.clients.len() - 1)
    }

    /// Remove the client with `handle`, returning the index it occupied.
    pub fn remove(&mut self, handle: Handle) -> Option<usize> {
        let index = self.position(handle)?;
        self.clients.remove(index);
        Some(index)
    }

    /// Read view in tiling order
    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Client> {
        self.clients.get(index)
    }

    pub fn position(&self, handle: Handle) -> Option<usize> {
        self.clients.iter().position(|c| c.handle == handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.position(handle).is_some()
    }

    /// All handles in tiling order
    pub fn handles(&self) -> Vec<Handle> {
        self.clients.iter().map(|c| c.handle).collect()
    }

    /// Record the geometry the layout engine applied to a client
    pub fn set_geometry(&mut self, index: usize, geometry: Rect) {
        if let Some(client) = self.clients.get_mut(index) {
            client.geometry = geometry;
        }
    }

    /// Release every client
    pub fn clear(&mut self) {
        self.clients.clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
