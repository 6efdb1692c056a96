//! `GhostCell`: token-gated interior mutability for stored values.
//!
//! Values in a [`BrandedBinMap`](crate::BrandedBinMap) live inside these cells,
//! which lets `get_mut` hand out `&mut V` through a shared map reference as long
//! as the caller holds the brand's `&mut GhostToken`.

use core::cell::UnsafeCell;

use crate::token::{GhostToken, InvariantLifetime};

/// A cell that can only be accessed with a token of the same brand.
#[repr(transparent)]
pub struct GhostCell<'brand, T: ?Sized> {
    _brand: InvariantLifetime<'brand>,
    value: UnsafeCell<T>,
}

impl<'brand, T> GhostCell<'brand, T> {
    /// Creates a new cell.
    pub const fn new(value: T) -> Self {
        Self {
            _brand: InvariantLifetime::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Consumes the cell, returning the value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Replaces the contained value, returning the old one.
    #[inline]
    pub fn replace(&self, token: &mut GhostToken<'brand>, value: T) -> T {
        core::mem::replace(self.borrow_mut(token), value)
    }
}

impl<'brand, T: ?Sized> GhostCell<'brand, T> {
    /// Borrows the cell immutably.
    #[inline(always)]
    pub fn borrow<'a>(&'a self, _token: &'a GhostToken<'brand>) -> &'a T {
        // SAFETY: mutable access requires `&mut GhostToken<'brand>`, which cannot
        // be live while `_token` is borrowed for `'a`.
        unsafe { &*self.value.get() }
    }

    /// Borrows the cell mutably.
    #[inline(always)]
    pub fn borrow_mut<'a>(&'a self, _token: &'a mut GhostToken<'brand>) -> &'a mut T {
        // SAFETY: the token is borrowed exclusively for `'a`, so no other borrow
        // of any cell of this brand can be live.
        unsafe { &mut *self.value.get() }
    }

    /// Returns a mutable reference through exclusive ownership of the cell.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

// SAFETY: access is token-gated; the bounds mirror `RwLock<T>`.
unsafe impl<'brand, T: ?Sized + Send> Send for GhostCell<'brand, T> {}
unsafe impl<'brand, T: ?Sized + Send + Sync> Sync for GhostCell<'brand, T> {}
