//! OSC 1.0 wire codec
//!
//! Message layout:
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Address: "/freq" 0, zero-padded to a multiple of 4           │
//! │ Tags:    "," one char per argument, 0, zero-padded to 4      │
//! │ Args:    payloads in tag order, big-endian, each padded to 4 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The encoder writes into a caller-supplied `&mut [u8]` and never
//! allocates; the required length is computed up front so a failed encode
//! leaves no partial message the caller could mistake for a complete one.
//! The accessors are a zero-copy view: they trust the buffer to be
//! well-formed (this crate's encoder and link framing only produce
//! well-formed messages) but never walk past the declared tag string, and
//! degrade to `None` rather than panicking on truncated input.

use crate::error::{Error, Result};
use crate::time::TimeTag;
use crate::types::{recognized_tag, Arg};
use bytes::{Buf, BufMut};

/// Round up to the next multiple of 4.
pub(crate) const fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

// ============================================================================
// ENCODING
// ============================================================================

/// Exact encoded size of a message with the given address and arguments.
pub fn encoded_len(address: &str, args: &[Arg]) -> usize {
    let mut len = pad4(address.len() + 1) + pad4(args.len() + 2);
    for arg in args {
        len += arg.padded_len();
    }
    len
}

fn check_address(address: &str) -> Result<()> {
    if !address.starts_with('/') {
        return Err(Error::BadAddress("must start with '/'"));
    }
    if address.as_bytes().contains(&0) {
        return Err(Error::BadAddress("contains NUL"));
    }
    Ok(())
}

/// Encode a complete message into `buf`, returning the encoded length.
///
/// On error the buffer contents are unspecified; the caller may retry with
/// a larger buffer. [`Error::Overflow`] reports the exact size needed.
pub fn message(buf: &mut [u8], address: &str, args: &[Arg]) -> Result<usize> {
    check_address(address)?;
    for arg in args {
        if let Arg::Str(s) | Arg::Symbol(s) = arg {
            if s.as_bytes().contains(&0) {
                return Err(Error::EmbeddedNul);
            }
        }
    }

    let needed = encoded_len(address, args);
    if needed > buf.len() {
        return Err(Error::Overflow {
            needed,
            have: buf.len(),
        });
    }

    let mut out = &mut buf[..needed];
    out.put_slice(address.as_bytes());
    out.put_bytes(0, pad4(address.len() + 1) - address.len());

    out.put_u8(b',');
    for arg in args {
        out.put_u8(arg.tag() as u8);
    }
    out.put_bytes(0, pad4(args.len() + 2) - (args.len() + 1));

    for arg in args {
        put_arg(&mut out, arg);
    }
    debug_assert!(out.is_empty());
    Ok(needed)
}

/// Encode with an explicit tag string, as in `("/v", "if", ...)`.
///
/// A leading `,` is accepted and normalized away. The tags must agree with
/// `args` one to one; [`Error::UnknownTag`] and [`Error::TagMismatch`]
/// report disagreements before anything is written.
pub fn message_with_tags(buf: &mut [u8], address: &str, tags: &str, args: &[Arg]) -> Result<usize> {
    let tags = tags.strip_prefix(',').unwrap_or(tags);
    for tag in tags.chars() {
        if !recognized_tag(tag) {
            return Err(Error::UnknownTag(tag));
        }
    }
    if tags.len() != args.len() || tags.chars().zip(args).any(|(t, a)| t != a.tag()) {
        return Err(Error::TagMismatch);
    }
    message(buf, address, args)
}

#[inline]
fn put_arg(out: &mut &mut [u8], arg: &Arg) {
    match arg {
        Arg::Int(v) => out.put_i32(*v),
        Arg::Float(v) => out.put_f32(*v),
        Arg::Str(s) | Arg::Symbol(s) => {
            out.put_slice(s.as_bytes());
            out.put_bytes(0, pad4(s.len() + 1) - s.len());
        }
        Arg::Blob(b) => {
            out.put_u32(b.len() as u32);
            out.put_slice(b);
            out.put_bytes(0, pad4(b.len()) - b.len());
        }
        Arg::Long(v) => out.put_i64(*v),
        Arg::Double(v) => out.put_f64(*v),
        Arg::Time(t) => out.put_u64(t.raw()),
        Arg::Char(c) => out.put_u32(*c as u32),
        Arg::Rgba(v) => out.put_u32(*v),
        Arg::Midi(m) => out.put_slice(m),
        Arg::True | Arg::False | Arg::Nil | Arg::Inf => {}
    }
}

// ============================================================================
// DECODING / ACCESSORS
// ============================================================================

/// A read-only view of an encoded message.
///
/// All accessors are pure: repeated calls return identical values and the
/// buffer is never mutated. Locating argument `i` walks the `i` preceding
/// arguments, so access is O(i); [`Message::args`] walks once.
#[derive(Debug, Clone, Copy)]
pub struct Message<'buf> {
    buf: &'buf [u8],
}

impl<'buf> Message<'buf> {
    /// Wrap a buffer holding one encoded message.
    pub const fn new(buf: &'buf [u8]) -> Message<'buf> {
        Message { buf }
    }

    /// The underlying bytes, starting at the address.
    pub const fn as_bytes(&self) -> &'buf [u8] {
        self.buf
    }

    /// The address pattern at the start of the message.
    pub fn address(&self) -> &'buf str {
        let nul = find_nul(self.buf);
        core::str::from_utf8(&self.buf[..nul]).unwrap_or("")
    }

    /// Offset of the tag string.
    fn tags_offset(&self) -> usize {
        pad4(find_nul(self.buf) + 1)
    }

    /// The full tag string including the leading `,`.
    fn tag_string(&self) -> &'buf str {
        let Some(rest) = self.buf.get(self.tags_offset()..) else {
            return "";
        };
        let nul = find_nul(rest);
        core::str::from_utf8(&rest[..nul]).unwrap_or("")
    }

    /// The tag characters after the leading `,`, one per argument.
    pub fn type_tags(&self) -> &'buf str {
        self.tag_string().strip_prefix(',').unwrap_or("")
    }

    /// Number of arguments, immediates included.
    pub fn arg_count(&self) -> usize {
        self.type_tags().len()
    }

    /// The i-th tag character.
    pub fn tag(&self, i: usize) -> Option<char> {
        self.type_tags().as_bytes().get(i).map(|&b| b as char)
    }

    /// Offset of the first argument payload.
    fn payload_offset(&self) -> usize {
        self.tags_offset() + pad4(self.tag_string().len() + 1)
    }

    /// The i-th argument, or `None` if `i` is out of range or the buffer is
    /// truncated.
    pub fn arg(&self, i: usize) -> Option<Arg<'buf>> {
        self.args().nth(i)
    }

    /// Iterate over all arguments in tag order.
    pub fn args(&self) -> Args<'buf> {
        Args {
            buf: self.buf,
            tags: self.type_tags().chars(),
            offset: self.payload_offset(),
        }
    }

    /// Total encoded size: address, tag string, and every argument payload.
    ///
    /// `None` if the buffer ends before the declared arguments do.
    pub fn wire_len(&self) -> Option<usize> {
        let mut offset = self.payload_offset();
        for tag in self.type_tags().chars() {
            read_arg(self.buf, &mut offset, tag)?;
        }
        Some(offset)
    }
}

/// Iterator over a message's arguments. See [`Message::args`].
pub struct Args<'buf> {
    buf: &'buf [u8],
    tags: core::str::Chars<'buf>,
    offset: usize,
}

impl<'buf> Iterator for Args<'buf> {
    type Item = Arg<'buf>;

    fn next(&mut self) -> Option<Arg<'buf>> {
        let tag = self.tags.next()?;
        read_arg(self.buf, &mut self.offset, tag)
    }
}

fn find_nul(buf: &[u8]) -> usize {
    buf.iter().position(|&b| b == 0).unwrap_or(buf.len())
}

/// Decode the argument for `tag` at `*offset`, advancing the offset past
/// its padded payload.
fn read_arg<'b>(buf: &'b [u8], offset: &mut usize, tag: char) -> Option<Arg<'b>> {
    match tag {
        'T' => return Some(Arg::True),
        'F' => return Some(Arg::False),
        'N' => return Some(Arg::Nil),
        'I' => return Some(Arg::Inf),
        _ => {}
    }

    let rest = buf.get(*offset..)?;
    let mut cursor = rest;
    match tag {
        'i' if rest.len() >= 4 => {
            *offset += 4;
            Some(Arg::Int(cursor.get_i32()))
        }
        'f' if rest.len() >= 4 => {
            *offset += 4;
            Some(Arg::Float(cursor.get_f32()))
        }
        'h' if rest.len() >= 8 => {
            *offset += 8;
            Some(Arg::Long(cursor.get_i64()))
        }
        'd' if rest.len() >= 8 => {
            *offset += 8;
            Some(Arg::Double(cursor.get_f64()))
        }
        't' if rest.len() >= 8 => {
            *offset += 8;
            Some(Arg::Time(TimeTag::from_raw(cursor.get_u64())))
        }
        'c' if rest.len() >= 4 => {
            *offset += 4;
            char::from_u32(cursor.get_u32()).map(Arg::Char)
        }
        'r' if rest.len() >= 4 => {
            *offset += 4;
            Some(Arg::Rgba(cursor.get_u32()))
        }
        'm' => {
            let bytes: [u8; 4] = rest.get(..4)?.try_into().ok()?;
            *offset += 4;
            Some(Arg::Midi(bytes))
        }
        's' | 'S' => {
            let nul = rest.iter().position(|&b| b == 0)?;
            let s = core::str::from_utf8(&rest[..nul]).ok()?;
            *offset += pad4(nul + 1);
            Some(if tag == 's' {
                Arg::Str(s)
            } else {
                Arg::Symbol(s)
            })
        }
        'b' => {
            if rest.len() < 4 {
                return None;
            }
            let len = cursor.get_u32() as usize;
            let data = rest.get(4..4 + len)?;
            *offset += 4 + pad4(len);
            Some(Arg::Blob(data))
        }
        _ => None,
    }
}

// ============================================================================
// BUNDLES
// ============================================================================

/// True if the buffer begins with the `#bundle` header.
pub fn is_bundle(buf: &[u8]) -> bool {
    buf.len() >= 8 && &buf[..8] == crate::BUNDLE_TAG
}

/// A read-only view of an encoded bundle.
///
/// Elements are exposed as byte slices into the original buffer; nothing
/// is copied.
#[derive(Debug, Clone, Copy)]
pub struct Bundle<'buf> {
    buf: &'buf [u8],
}

impl<'buf> Bundle<'buf> {
    /// Wrap a buffer if it carries the bundle header and timetag.
    pub fn new(buf: &'buf [u8]) -> Option<Bundle<'buf>> {
        (buf.len() >= 16 && is_bundle(buf)).then_some(Bundle { buf })
    }

    pub const fn as_bytes(&self) -> &'buf [u8] {
        self.buf
    }

    /// The bundle's timetag.
    pub fn time_tag(&self) -> TimeTag {
        let mut header = &self.buf[8..16];
        TimeTag::from_raw(header.get_u64())
    }

    /// Iterate over the contained elements, each a message or a nested
    /// bundle.
    pub fn elements(&self) -> Elements<'buf> {
        Elements {
            rest: &self.buf[16..],
        }
    }
}

/// Iterator over bundle elements. See [`Bundle::elements`].
pub struct Elements<'buf> {
    rest: &'buf [u8],
}

impl<'buf> Iterator for Elements<'buf> {
    type Item = &'buf [u8];

    fn next(&mut self) -> Option<&'buf [u8]> {
        if self.rest.len() < 4 {
            return None;
        }
        let mut header = self.rest;
        let len = header.get_u32() as usize;
        let element = self.rest.get(4..4 + len)?;
        self.rest = &self.rest[4 + len..];
        Some(element)
    }
}

/// Incrementally frames a bundle into a caller buffer.
///
/// ```
/// use oscport_core::{Arg, BundleWriter, TimeTag};
///
/// let mut buf = [0u8; 128];
/// let mut bundle = BundleWriter::new(&mut buf, TimeTag::IMMEDIATE).unwrap();
/// bundle.message("/gate", &[Arg::True]).unwrap();
/// bundle.message("/freq", &[Arg::Float(440.0)]).unwrap();
/// let len = bundle.finish();
/// ```
pub struct BundleWriter<'buf> {
    buf: &'buf mut [u8],
    len: usize,
}

impl<'buf> BundleWriter<'buf> {
    /// Write the `#bundle` header and timetag.
    pub fn new(buf: &'buf mut [u8], time: TimeTag) -> Result<BundleWriter<'buf>> {
        if buf.len() < 16 {
            return Err(Error::Overflow {
                needed: 16,
                have: buf.len(),
            });
        }
        buf[..8].copy_from_slice(crate::BUNDLE_TAG);
        buf[8..16].copy_from_slice(&time.raw().to_be_bytes());
        Ok(BundleWriter { buf, len: 16 })
    }

    /// Append a pre-encoded element (a message or a nested bundle).
    pub fn push(&mut self, element: &[u8]) -> Result<()> {
        let needed = self.len + 4 + element.len();
        if needed > self.buf.len() {
            return Err(Error::Overflow {
                needed,
                have: self.buf.len(),
            });
        }
        self.buf[self.len..self.len + 4].copy_from_slice(&(element.len() as u32).to_be_bytes());
        self.buf[self.len + 4..needed].copy_from_slice(element);
        self.len = needed;
        Ok(())
    }

    /// Encode a message in place as the next element.
    pub fn message(&mut self, address: &str, args: &[Arg]) -> Result<()> {
        let start = self.len + 4;
        if start > self.buf.len() {
            return Err(Error::Overflow {
                needed: start,
                have: self.buf.len(),
            });
        }
        let n = message(&mut self.buf[start..], address, args)?;
        self.buf[self.len..start].copy_from_slice(&(n as u32).to_be_bytes());
        self.len = start + n;
        Ok(())
    }

    /// Total bytes written so far.
    pub fn finish(self) -> usize {
        self.len
    }
}
