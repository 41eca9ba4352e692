//! Gate state machine shared by the initializer and the once cell.
//!
//! The whole state is packed into a single `AtomicU8`:
//! - Bit 0: DONE - the gate is set, initialization is committed
//! - Bit 1: LOCKED - a thread holds the initialization lock
//! - Bit 2: WAITING - at least one thread is parked on the lock
//! - Bits 3-7: EPOCH - generation counter bumped on every commit/abandon
//!
//! Reading DONE with `Acquire` is the lock-free fast path. Setting DONE uses
//! `Release`, so a thread that observes the gate as set also observes every
//! write made while the lock was held. Contended lockers park on the atomic's
//! address through `parking_lot_core`.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic one-shot gate with an embedded initialization lock.
#[repr(transparent)]
pub struct Gate(AtomicU8);

impl Gate {
   /// Bit flag: gate is set.
   const DONE: u8 = 1;
   /// Bit flag: initialization lock is held.
   const LOCKED: u8 = 2;
   /// Bit flag: at least one thread is parked waiting for the lock.
   const WAITING: u8 = 4;
   /// Lowest epoch bit.
   const EPOCH_1: u8 = 8;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::DONE | Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(state: u8) -> u8 {
      (state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates an unset gate.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Creates a gate that is already set.
   #[inline]
   pub(crate) const fn set() -> Self {
      Self(AtomicU8::new(Self::DONE))
   }

   #[inline]
   fn park_key(&self) -> usize {
      self.0.as_ptr() as usize
   }

   fn notify_all(&self) {
      // SAFETY: park and unpark both key on the address of the inner atomic.
      unsafe {
         parking_lot_core::unpark_all(self.park_key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread while the state still equals `observed`.
   fn wait(&self, observed: u8) {
      // SAFETY: see `notify_all`. The validate closure runs under the bucket
      // lock, so a commit that races with us either changes the state before
      // the check or unparks us after we are queued.
      unsafe {
         let _ = parking_lot_core::park(
            self.park_key(),
            // Only sleep if nobody committed or abandoned since `observed`.
            // The epoch bits make a lock/abandon/lock sequence look different.
            || self.0.load(Ordering::Acquire) == observed,
            || {},              // Before sleep
            |_, _| {},          // Timed out (no timeout is used)
            DEFAULT_PARK_TOKEN, // Token handed to unpark
            None,
         );
         // Wake-ups may be spurious; callers loop and re-check the state.
      }
   }

   /// Moves to `DONE | next epoch` and wakes parked threads.
   /// Returns `true` if the gate was not set before.
   fn commit(&self) -> bool {
      // Only the lock holder writes the epoch, so a relaxed read is enough to
      // derive the next one; the swap below carries the ordering.
      let current = self.0.load(Ordering::Relaxed);
      // Release: every write made by the component initializers while the
      // lock was held happens-before any acquire load that sees DONE.
      // The swap also drops LOCKED and WAITING in one step.
      let prev = self.0.swap(Self::DONE | Self::next_epoch(current), Ordering::Release);
      // Threads parked on the lock observe DONE and return without locking.
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
      prev & Self::DONE == 0
   }

   /// Moves back to unset (clearing LOCKED and WAITING) and wakes parked
   /// threads so one of them can retry.
   fn abandon(&self) {
      let current = self.0.load(Ordering::Relaxed);
      // New state is just the bumped epoch: DONE stays clear, LOCKED and
      // WAITING are dropped. Release orders the failed attempt's writes
      // before the next holder's acquire CAS.
      let prev = self.0.swap(Self::next_epoch(current), Ordering::Release);
      // All parked threads wake and race on `lock_step`; one wins the lock
      // and retries, the rest set WAITING again and park.
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Fast-path check. Never blocks.
   #[inline]
   pub(crate) fn is_set(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::DONE != 0
   }

   #[cfg(test)]
   fn is_locked(&self) -> bool {
      self.0.load(Ordering::Relaxed) & Self::LOCKED != 0
   }

   /// One attempt at taking the lock.
   ///
   /// - `Ok(None)`: the gate is set, nothing to do.
   /// - `Ok(Some(guard))`: lock acquired, gate was unset.
   /// - `Err(state)`: lock held elsewhere. Unless `nowait`, WAITING is set in
   ///   the returned state so the holder knows to unpark us.
   fn lock_step(&self, nowait: bool) -> Result<Option<GateGuard<'_>>, u8> {
      loop {
         // Acquire, not Relaxed: returning `Ok(None)` here tells the caller
         // initialization is finished and it may go on to use component
         // state, so this load must synchronize with the Release in `commit`.
         let current = self.0.load(Ordering::Acquire);
         // Re-check under the lock path: another thread may have committed
         // between the caller's fast-path check and now.
         if current & Self::DONE != 0 {
            return Ok(None);
         }

         // Lock is free: try to take it. Epoch and WAITING are preserved.
         if current & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current,
               current | Self::LOCKED,
               Ordering::Acquire, // See writes of a previously abandoned attempt
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(GateGuard { gate: self })),
               Err(_) => {
                  // Lost a race or spurious failure; reload and retry.
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         // Lock is held. Announce ourselves so the holder unparks us.
         if !nowait && current & Self::WAITING == 0 {
            let flagged = current | Self::WAITING;
            // The flag itself publishes nothing, so relaxed is enough.
            match self.0.compare_exchange_weak(current, flagged, Ordering::Relaxed, Ordering::Relaxed) {
               Ok(_) => return Err(flagged),
               Err(_) => {
                  // State moved (maybe to DONE); start over.
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         // Held, and either WAITING is already set or the caller won't wait.
         return Err(current);
      }
   }

   /// Takes the initialization lock, parking while another thread holds it.
   ///
   /// Returns `None` if the gate was (or became) set, meaning the caller must
   /// not initialize.
   pub(crate) fn lock(&self) -> Option<GateGuard<'_>> {
      let mut observed = match self.lock_step(false) {
         Ok(guard) => return guard,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.lock_step(false) {
            Ok(guard) => return guard,
            Err(state) => observed = state,
         }
      }
   }

   /// Takes the lock without blocking.
   ///
   /// `Ok(None)` if the gate is set, `Err(())` if another thread holds the lock.
   pub(crate) fn try_lock(&self) -> Result<Option<GateGuard<'_>>, ()> {
      self.lock_step(true).map_err(|_| ())
   }

   /// Takes the lock from async code.
   ///
   /// Yields to the scheduler while the lock is contended. On a multi-thread
   /// runtime it eventually falls back to parking inside `block_in_place`.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> Option<GateGuard<'_>> {
      const ROUNDS: usize = 16;
      const YIELDS: usize = 32;

      for _ in 0..ROUNDS {
         let observed = match self.lock_step(true) {
            Ok(guard) => return guard,
            Err(state) => state,
         };
         for _ in 0..YIELDS {
            tokio::task::yield_now().await;
            if self.0.load(Ordering::Relaxed) != observed {
               break;
            }
         }
      }

      #[cfg(feature = "async-tokio-mt")]
      {
         if let Ok(handle) = tokio::runtime::Handle::try_current() {
            if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread {
               return tokio::task::block_in_place(|| self.lock());
            }
         }
      }

      loop {
         match self.lock_step(true) {
            Ok(guard) => return guard,
            Err(_) => tokio::task::yield_now().await,
         }
      }
   }
}

/// Holder of the initialization lock.
///
/// Must be committed to set the gate. Dropping it instead (error return or
/// unwinding panic) puts the gate back to unset and wakes waiters.
pub struct GateGuard<'a> {
   gate: &'a Gate,
}

impl GateGuard<'_> {
   /// Sets the gate and releases the lock.
   #[inline]
   pub(crate) fn commit(self) -> bool {
      let fresh = self.gate.commit();
      mem::forget(self);
      fresh
   }
}

impl Drop for GateGuard<'_> {
   #[inline]
   fn drop(&mut self) {
      self.gate.abandon();
   }
}
