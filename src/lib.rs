// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! rprom: ROM-emulation cartridge core.
//!
//! A microcontroller impersonates a 16-bit ROM on a vintage host's bus and
//! serves one of seven flash-resident images. The host talks back over the
//! address lines of ordinary reads.
//!
//! - [`responder`]: the real-time bus loop (core 0).
//! - [`dispatcher`]: magic-sequence matcher and command handlers (core 1).
//! - [`channel`]: the one queue between them.
//! - [`store`]: wear-levelled record of the active slot.
//! - [`host`]: the host side of the protocol, [`sim`]: an emulated cartridge.

#[cfg(any(test, feature = "std"))]
#[macro_use]
extern crate std;

pub mod config;
pub mod error;
pub mod protocol;
pub mod status;
pub mod flash;
pub mod image;
pub mod store;
pub mod channel;
pub mod dispatcher;
pub mod responder;
pub mod host;
pub mod sim;

#[cfg(test)]
pub mod tests;
