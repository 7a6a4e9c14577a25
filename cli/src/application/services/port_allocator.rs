//! Application service: preview port pool.
//!
//! The pool is the only state shared between concurrent installations. All
//! bookkeeping happens under one mutex, so a port is never handed to two
//! callers and never held by two installations.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::error::PortAllocationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    Reserved,
    Released,
}

/// Binding of a preview port to one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReservation {
    pub installation_id: String,
    pub port: u16,
    pub state: ReservationState,
}

#[derive(Debug, Default)]
struct Pool {
    /// Handed out by `next_available_port` but not yet bound.
    claimed: BTreeSet<u16>,
    /// port -> installation id
    reserved: HashMap<u16, String>,
    /// installation id -> port
    by_installation: HashMap<String, u16>,
}

impl Pool {
    fn is_free(&self, port: u16) -> bool {
        !self.claimed.contains(&port) && !self.reserved.contains_key(&port)
    }

    fn bind(&mut self, installation_id: &str, port: u16) -> PortReservation {
        self.claimed.remove(&port);
        self.reserved.insert(port, installation_id.to_string());
        self.by_installation.insert(installation_id.to_string(), port);
        PortReservation {
            installation_id: installation_id.to_string(),
            port,
            state: ReservationState::Reserved,
        }
    }
}

/// Process-wide pool of preview ports in `start..=end`.
#[derive(Debug)]
pub struct PortAllocator {
    start: u16,
    end: u16,
    pool: Mutex<Pool>,
}

impl PortAllocator {
    #[must_use]
    pub fn new(start: u16, end: u16) -> Self {
        Self {
            start,
            end,
            pool: Mutex::new(Pool::default()),
        }
    }

    #[must_use]
    pub fn range(&self) -> (u16, u16) {
        (self.start, self.end)
    }

    fn lock(&self) -> MutexGuard<'_, Pool> {
        // Every mutation leaves the pool consistent, so a panic elsewhere
        // while holding the lock does not invalidate it.
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn exhausted(&self) -> PortAllocationError {
        PortAllocationError::Exhausted {
            start: self.start,
            end: self.end,
        }
    }

    fn first_free(&self, pool: &Pool) -> Option<u16> {
        (self.start..=self.end).find(|&p| pool.is_free(p))
    }

    /// Claim the lowest free port.
    ///
    /// The claim keeps other callers off the port until it is bound with
    /// [`PortAllocator::reserve`] or handed back with
    /// [`PortAllocator::release_port`].
    ///
    /// # Errors
    ///
    /// Returns `PortAllocationError::Exhausted` when every port is taken.
    pub fn next_available_port(&self) -> Result<u16, PortAllocationError> {
        let mut pool = self.lock();
        let port = self.first_free(&pool).ok_or_else(|| self.exhausted())?;
        pool.claimed.insert(port);
        Ok(port)
    }

    /// Bind `port` to `installation_id`.
    ///
    /// Re-reserving the same pair is a no-op. An installation holds at most
    /// one port, so binding a different port moves its reservation.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for ports outside the pool and `RaceLost` when
    /// another installation already holds `port`.
    pub fn reserve(
        &self,
        installation_id: &str,
        port: u16,
    ) -> Result<PortReservation, PortAllocationError> {
        if !(self.start..=self.end).contains(&port) {
            return Err(PortAllocationError::OutOfRange {
                port,
                start: self.start,
                end: self.end,
            });
        }
        let mut pool = self.lock();
        if let Some(holder) = pool.reserved.get(&port) {
            if holder != installation_id {
                return Err(PortAllocationError::RaceLost {
                    port,
                    holder: holder.clone(),
                });
            }
            return Ok(PortReservation {
                installation_id: installation_id.to_string(),
                port,
                state: ReservationState::Reserved,
            });
        }
        if let Some(previous) = pool.by_installation.remove(installation_id) {
            pool.reserved.remove(&previous);
        }
        Ok(pool.bind(installation_id, port))
    }

    /// Claim and bind a port in one step.
    ///
    /// Returns the existing reservation if `installation_id` already has one.
    ///
    /// # Errors
    ///
    /// Returns `PortAllocationError::Exhausted` when every port is taken.
    pub fn allocate(&self, installation_id: &str) -> Result<PortReservation, PortAllocationError> {
        let mut pool = self.lock();
        if let Some(&port) = pool.by_installation.get(installation_id) {
            return Ok(PortReservation {
                installation_id: installation_id.to_string(),
                port,
                state: ReservationState::Reserved,
            });
        }
        let port = self.first_free(&pool).ok_or_else(|| self.exhausted())?;
        Ok(pool.bind(installation_id, port))
    }

    /// Release whatever `installation_id` holds. Idempotent.
    pub fn release(&self, installation_id: &str) -> Option<PortReservation> {
        let mut pool = self.lock();
        let port = pool.by_installation.remove(installation_id)?;
        pool.reserved.remove(&port);
        tracing::debug!(installation_id, port, "preview port released");
        Some(PortReservation {
            installation_id: installation_id.to_string(),
            port,
            state: ReservationState::Released,
        })
    }

    /// Hand back a claim that was never bound. Returns `false` if `port`
    /// was not claimed.
    pub fn release_port(&self, port: u16) -> bool {
        self.lock().claimed.remove(&port)
    }

    #[must_use]
    pub fn reservation(&self, installation_id: &str) -> Option<PortReservation> {
        let pool = self.lock();
        pool.by_installation
            .get(installation_id)
            .map(|&port| PortReservation {
                installation_id: installation_id.to_string(),
                port,
                state: ReservationState::Reserved,
            })
    }

    /// Ports currently claimed or reserved.
    #[must_use]
    pub fn in_use(&self) -> usize {
        let pool = self.lock();
        pool.claimed.len() + pool.reserved.len()
    }
}
