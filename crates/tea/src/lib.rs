#![forbid(unsafe_code)]

//! Public facade for the `tea` core: `State`, `Promise`, and `Queue`.
//!
//! This crate re-exports the stable surface of `tea-state`, `tea-promise`,
//! and `tea-queue` so a host runtime depends on one crate instead of three.
//! It adds nothing of its own beyond the re-exports below.

// --- State re-exports -------------------------------------------------------

pub use tea_state::{and_map, DecodeError, State};

// --- Promise re-exports -----------------------------------------------------

pub use tea_promise::{
    combine, from_effect_when_empty, map2, map3, map4, run, run_with, Lens, Promise,
};

// --- Queue re-exports --------------------------------------------------------

pub use tea_queue::{send, with_group, Group, Queue, RequestId};
