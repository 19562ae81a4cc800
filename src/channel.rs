// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The inter-core address channel.
//!
//! Exactly one bounded queue connects the bus responder (producer) to the
//! dispatcher (consumer). The producer never waits: when the queue is full
//! the address is dropped and nobody is told. The consumer blocks.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Depth of the RP2350 SIO inter-core FIFO.
pub const FIFO_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFull;

/// Producer half. Must never block.
pub trait AddressSender {
    fn try_send(&self, address: u32) -> Result<(), ChannelFull>;
}

/// Consumer half.
pub trait AddressReceiver {
    /// Wait for the next address.
    fn recv(&self) -> u32;

    fn try_recv(&self) -> Option<u32>;
}

impl<T: AddressSender + ?Sized> AddressSender for &T {
    fn try_send(&self, address: u32) -> Result<(), ChannelFull> {
        (**self).try_send(address)
    }
}

impl<T: AddressReceiver + ?Sized> AddressReceiver for &T {
    fn recv(&self) -> u32 {
        (**self).recv()
    }

    fn try_recv(&self) -> Option<u32> {
        (**self).try_recv()
    }
}

/// Lock-free single-producer / single-consumer queue of bus addresses,
/// the software stand-in for the hardware FIFO.
pub struct AddressQueue<const N: usize> {
    slots: [AtomicU32; N],
    /// Total pops.
    head: AtomicUsize,
    /// Total pushes.
    tail: AtomicUsize,
}

impl<const N: usize> AddressQueue<N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU32::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for AddressQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AddressSender for AddressQueue<N> {
    fn try_send(&self, address: u32) -> Result<(), ChannelFull> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= N {
            return Err(ChannelFull);
        }
        self.slots[tail % N].store(address, Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }
}

impl<const N: usize> AddressReceiver for AddressQueue<N> {
    fn recv(&self) -> u32 {
        loop {
            if let Some(address) = self.try_recv() {
                return address;
            }
            core::hint::spin_loop();
        }
    }

    fn try_recv(&self) -> Option<u32> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let address = self.slots[head % N].load(Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(address)
    }
}
