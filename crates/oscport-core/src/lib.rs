//! oscport core
//!
//! Realtime-safe Open Sound Control primitives for audio applications.
//!
//! This crate provides:
//! - Message encoding into caller-owned buffers ([`codec::message`])
//! - Zero-copy decoding and argument accessors ([`Message`], [`Arg`])
//! - Bundle framing ([`Bundle`], [`BundleWriter`])
//! - Address pattern matching ([`pattern::matches`])
//! - Static port-tree dispatch ([`dispatch`], [`Ports`])
//! - Lock-free cross-thread message transport ([`thread_link`])
//!
//! Everything intended for the audio thread is bounded-time and performs no
//! allocation, locking, or blocking after construction. Buffers are
//! caller-supplied and fixed in size; the dispatch graph is an immutable
//! static; the transport is a pair of SPSC rings synchronized only through
//! release/acquire atomics.

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod pattern;
pub mod time;
pub mod types;

pub use codec::{is_bundle, message, message_with_tags, Bundle, BundleWriter, Message};
pub use dispatch::{dispatch, dispatch_at, dispatch_packet, Port, PortValue, Ports};
pub use error::{Error, Result};
pub use link::{thread_link, LinkEnd};
pub use time::TimeTag;
pub use types::{Arg, MidiMessage};

/// Bundle header tag, including the terminating null.
pub const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Smallest well-formed message: `/\0\0\0` plus `,\0\0\0`.
pub const MIN_MESSAGE_SIZE: usize = 8;
