//! Lock-free cross-thread message transport
//!
//! A link is a pair of fixed-capacity SPSC byte rings, one per direction.
//! Each ring carries framed entries:
//!
//! ```text
//! ┌──────────────┬───────────────────┐
//! │ u32 length   │ message bytes     │   length > 0: a whole message
//! ├──────────────┼───────────────────┤
//! │ u32 zero     │                   │   wrap sentinel: jump to offset 0
//! └──────────────┴───────────────────┘
//! ```
//!
//! A message is never split across the wrap: when the header plus payload
//! would cross the end of the ring, the writer publishes a zero-length
//! sentinel (when four bytes remain for it) and writes the real entry from
//! offset 0. The reader therefore always sees each message as one
//! contiguous slice.
//!
//! Synchronization is a release-store of the head cursor by the writer and
//! an acquire-load by the reader (and symmetrically for the tail). There
//! are no locks, and after [`thread_link`] returns nothing allocates.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::codec;
use crate::error::{Error, Result};
use crate::types::Arg;

/// Size of the per-entry length header.
const HEADER: usize = 4;

/// One SPSC byte ring. Cursors grow monotonically (wrapping); the index
/// into the buffer is `cursor & mask`, so the capacity is always a power
/// of two.
struct Ring {
    buf: Box<[UnsafeCell<u8>]>,
    /// Bytes ever published by the writer.
    head: AtomicUsize,
    /// Bytes ever released by the reader.
    tail: AtomicUsize,
    /// Whole messages currently queued.
    queued: AtomicUsize,
}

// Safety: the producer only writes between head and tail (free space), the
// consumer only reads between tail and head (published space), and the
// cursors are exchanged with release/acquire ordering. Exactly one thread
// holds each role; the `LinkEnd` handles enforce that by ownership.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    fn new(capacity: usize) -> Ring {
        let cap = capacity.next_power_of_two();
        Ring {
            buf: (0..cap).map(|_| UnsafeCell::new(0u8)).collect(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.buf.len() - 1
    }

    /// Copy `src` into the ring at byte index `idx`.
    ///
    /// Safety: the caller is the single producer and `idx..idx + src.len()`
    /// lies within the free region it computed from the cursors.
    unsafe fn store(&self, idx: usize, src: &[u8]) {
        core::ptr::copy_nonoverlapping(src.as_ptr(), self.buf[idx].get(), src.len());
    }

    /// View `len` bytes of the ring at byte index `idx`.
    ///
    /// Safety: the caller is the single consumer and the range was
    /// published by the producer and not yet released.
    unsafe fn load(&self, idx: usize, len: usize) -> &[u8] {
        core::slice::from_raw_parts(self.buf[idx].get(), len)
    }

    /// Read an entry header at `idx`. Same safety contract as `load`.
    unsafe fn peek_len(&self, idx: usize) -> usize {
        let mut header = [0u8; HEADER];
        core::ptr::copy_nonoverlapping(self.buf[idx].get(), header.as_mut_ptr(), HEADER);
        u32::from_ne_bytes(header) as usize
    }

    /// Producer side: publish one whole message, or report `LinkFull`.
    fn push(&self, msg: &[u8]) -> Result<()> {
        debug_assert!(!msg.is_empty());

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let free = self.capacity() - head.wrapping_sub(tail);

        let idx = head & self.mask();
        let to_end = self.capacity() - idx;
        let contiguous = to_end >= HEADER + msg.len();
        let need = if contiguous {
            HEADER + msg.len()
        } else {
            // Skip the rest of the buffer, then the entry at offset 0.
            to_end + HEADER + msg.len()
        };
        if need > free {
            return Err(Error::LinkFull);
        }

        // Safety: single producer; the region was free per the check above.
        unsafe {
            if contiguous {
                self.store(idx, &(msg.len() as u32).to_ne_bytes());
                self.store(idx + HEADER, msg);
            } else {
                if to_end >= HEADER {
                    self.store(idx, &0u32.to_ne_bytes());
                }
                self.store(0, &(msg.len() as u32).to_ne_bytes());
                self.store(HEADER, msg);
            }
        }

        self.head.store(head.wrapping_add(need), Ordering::Release);
        self.queued.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Consumer side: return the next whole message, releasing the one
    /// handed out by the previous call.
    ///
    /// `holding` is the consumer's record of bytes consumed but not yet
    /// released; keeping it out of the shared state lets the returned
    /// slice stay valid until the next call.
    fn pop<'a>(&'a self, holding: &mut usize) -> Option<&'a [u8]> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        if *holding != 0 {
            tail = tail.wrapping_add(*holding);
            *holding = 0;
            self.tail.store(tail, Ordering::Release);
        }

        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let mut idx = tail & self.mask();
        let mut skipped = 0;
        let to_end = self.capacity() - idx;
        // Safety: single consumer; everything between tail and head is
        // published.
        unsafe {
            if to_end < HEADER || self.peek_len(idx) == 0 {
                // Wrap: dead bytes (and possibly a sentinel) to the end.
                skipped = to_end;
                idx = 0;
            }
            let len = self.peek_len(idx);
            let msg = self.load(idx + HEADER, len);
            *holding = skipped + HEADER + len;
            self.queued.fetch_sub(1, Ordering::Release);
            Some(msg)
        }
    }
}

/// One side of a link: producer of one ring, consumer of the other.
///
/// A `LinkEnd` is `Send` but not `Clone`, and both `write` and `read` take
/// `&mut self`; moving each end to its thread upholds the single-producer,
/// single-consumer contract.
pub struct LinkEnd {
    out: Arc<Ring>,
    inc: Arc<Ring>,
    scratch: Box<[u8]>,
    holding: usize,
}

impl LinkEnd {
    /// Encode a message and queue it toward the other end.
    ///
    /// Encoding goes through this end's scratch buffer (sized to the
    /// link's maximum message) and the result is published atomically.
    /// [`Error::LinkFull`] means the message was dropped; this call never
    /// blocks, so it is safe from the audio thread.
    pub fn write(&mut self, address: &str, args: &[Arg]) -> Result<()> {
        let n = codec::message(&mut self.scratch, address, args)?;
        self.out.push(&self.scratch[..n])
    }

    /// Queue an already encoded message or bundle toward the other end.
    pub fn write_bytes(&mut self, msg: &[u8]) -> Result<()> {
        if msg.len() < crate::MIN_MESSAGE_SIZE {
            return Err(Error::TooShort { size: msg.len() });
        }
        if msg.len() > self.scratch.len() {
            return Err(Error::TooLong {
                size: msg.len(),
                max: self.scratch.len(),
            });
        }
        self.out.push(msg)
    }

    /// The next queued message from the other end, or `None`.
    ///
    /// The returned bytes stay valid until the next call to `read`; the
    /// consumed region is released back to the writer then.
    pub fn read(&mut self) -> Option<&[u8]> {
        self.inc.pop(&mut self.holding)
    }

    /// True if a message is waiting to be read.
    pub fn has_next(&self) -> bool {
        self.inc.queued.load(Ordering::Acquire) > 0
    }

    /// Messages this end has written that the other end has not yet read.
    pub fn pending(&self) -> usize {
        self.out.queued.load(Ordering::Acquire)
    }

    /// The largest message this end can send.
    pub fn max_message(&self) -> usize {
        self.scratch.len()
    }
}

/// Create a connected pair of link ends.
///
/// `ring_bytes` is the per-direction ring capacity, rounded up to a power
/// of two; `max_message` bounds a single message and sizes each end's
/// scratch buffer. All allocation happens here; the ends allocate nothing
/// afterwards.
pub fn thread_link(ring_bytes: usize, max_message: usize) -> (LinkEnd, LinkEnd) {
    let up = Arc::new(Ring::new(ring_bytes));
    let down = Arc::new(Ring::new(ring_bytes));
    let a = LinkEnd {
        out: Arc::clone(&up),
        inc: Arc::clone(&down),
        scratch: vec![0u8; max_message].into_boxed_slice(),
        holding: 0,
    };
    let b = LinkEnd {
        out: down,
        inc: up,
        scratch: vec![0u8; max_message].into_boxed_slice(),
        holding: 0,
    };
    (a, b)
}
