//! Static port trees and message dispatch
//!
//! Applications declare their endpoints as [`Ports`] tables: ordered,
//! immutable collections of [`Port`] entries living in statics. Dispatch
//! walks a table in declaration order, pattern-matches the incoming
//! address, and invokes the first handler that matches both the address
//! and the type constraint. A port whose address part ends in `/` names a
//! subtree; descent hands the nested table the path relative to it.
//!
//! Handlers are plain `fn` pointers, so a whole tree is a constant
//! expression: no allocation, no trait objects, and nothing to tear down.
//! The dispatcher itself is stateless; a call is re-entrant if the
//! handlers it invokes are.

use crate::codec::{Bundle, Message};
use crate::pattern;

/// Leaf handler: receives the full message and the opaque context.
///
/// The context passes through the core untouched; only handlers (and
/// subtree recursion hooks) interpret it.
pub type Handler<C> = fn(&Message, &mut C);

/// Subtree recursion hook: receives the message, the address tail
/// (starting with `/`), and the outer context. It locates the nested
/// table, narrows the context however the application likes, and calls
/// [`dispatch_at`]; its return value reports whether any inner handler
/// ran.
pub type Recurse<C> = fn(&Message, &str, &mut C) -> bool;

/// What a matched port does.
pub enum PortValue<C: 'static> {
    /// Invoke a handler.
    Leaf(Handler<C>),
    /// Descend into a nested table with the same context; the core snips
    /// the matched prefix itself.
    Tree(&'static Ports<C>),
    /// Caller-defined descent, for narrowing the context to a sub-object.
    TreeWith(Recurse<C>),
}

/// One declared endpoint.
pub struct Port<C: 'static> {
    /// `<address-or-pattern>[:<type-constraint>]`.
    ///
    /// The address part may contain OSC pattern characters and names a
    /// subtree when it ends in `/`. The type constraint after `:` must be
    /// a prefix of the incoming message's tag string; trailing tags beyond
    /// the constraint still match. An empty constraint accepts any types.
    pub pattern: &'static str,
    /// Opaque metadata (units, ranges, documentation). Never inspected by
    /// the dispatcher; tooling reads it through [`Ports::entries`].
    pub metadata: &'static str,
    pub value: PortValue<C>,
}

/// An ordered, immutable table of ports.
pub struct Ports<C: 'static> {
    pub entries: &'static [Port<C>],
}

impl<C> Ports<C> {
    pub const fn new(entries: &'static [Port<C>]) -> Ports<C> {
        Ports { entries }
    }
}

/// Nested bundles deeper than this are ignored.
const MAX_BUNDLE_DEPTH: usize = 8;

/// Dispatch `msg` against `ports` using the message's own address.
///
/// Returns true if a handler ran. Unmatched addresses are a routine
/// outcome, not an error. For a fixed tree and message the selected
/// handler is deterministic: first match in declaration order wins.
pub fn dispatch<C>(ports: &Ports<C>, msg: &Message, ctx: &mut C) -> bool {
    dispatch_at(ports, msg, msg.address(), ctx)
}

/// Dispatch with an explicit address, as seen from `ports`.
///
/// Subtree descent re-enters here with the path tail, so inner tables see
/// addresses relative to themselves.
pub fn dispatch_at<C>(ports: &Ports<C>, msg: &Message, path: &str, ctx: &mut C) -> bool {
    let path = path.strip_prefix('/').unwrap_or(path);

    for port in ports.entries {
        let (pat, constraint) = match port.pattern.split_once(':') {
            Some((p, c)) => (p, c),
            None => (port.pattern, ""),
        };

        if let Some(prefix_pat) = pat.strip_suffix('/') {
            let Some(tail) = subtree_tail(prefix_pat, path) else {
                continue;
            };
            let handled = match port.value {
                PortValue::Tree(table) => dispatch_at(table, msg, tail, ctx),
                PortValue::TreeWith(recurse) => recurse(msg, tail, ctx),
                // A leaf declared with a trailing '/' matches nothing.
                PortValue::Leaf(_) => false,
            };
            if handled {
                return true;
            }
        } else {
            if !pattern::matches(pat, path) {
                continue;
            }
            if !constraint.is_empty() && !msg.type_tags().starts_with(constraint) {
                continue;
            }
            if let PortValue::Leaf(handler) = port.value {
                handler(msg, ctx);
                return true;
            }
        }
    }
    false
}

/// Dispatch a packet that may be a message or a bundle.
///
/// Bundle elements dispatch individually, in order; the timetag is not
/// interpreted here. A host that schedules bundles reads
/// [`Bundle::time_tag`] and defers the whole buffer instead. Returns true
/// if any handler ran.
pub fn dispatch_packet<C>(ports: &Ports<C>, packet: &[u8], ctx: &mut C) -> bool {
    dispatch_packet_at(ports, packet, ctx, 0)
}

fn dispatch_packet_at<C>(ports: &Ports<C>, packet: &[u8], ctx: &mut C, depth: usize) -> bool {
    if depth >= MAX_BUNDLE_DEPTH {
        return false;
    }
    match Bundle::new(packet) {
        Some(bundle) => {
            let mut any = false;
            for element in bundle.elements() {
                any |= dispatch_packet_at(ports, element, ctx, depth + 1);
            }
            any
        }
        None => dispatch(ports, &Message::new(packet), ctx),
    }
}

/// Expands to a [`PortValue::Leaf`] that stores the message's first float
/// argument into a field of the context.
///
/// ```
/// use oscport_core::{set_float, Port, Ports};
///
/// struct Voice { gain: f32 }
///
/// static VOICE: Ports<Voice> = Ports::new(&[Port {
///     pattern: "gain:f",
///     metadata: "dB",
///     value: set_float!(Voice, gain),
/// }]);
/// ```
#[macro_export]
macro_rules! set_float {
    ($ctx:ty, $field:ident) => {{
        fn handler(msg: &$crate::Message, ctx: &mut $ctx) {
            if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
                ctx.$field = v;
            }
        }
        $crate::PortValue::Leaf(handler)
    }};
}

/// Expands to a [`PortValue::TreeWith`] that narrows the context to a
/// field and dispatches the address tail against a nested table.
#[macro_export]
macro_rules! descend {
    ($ctx:ty, $field:ident, $table:path) => {{
        fn recurse(msg: &$crate::Message, tail: &str, ctx: &mut $ctx) -> bool {
            $crate::dispatch_at(&$table, msg, tail, &mut ctx.$field)
        }
        $crate::PortValue::TreeWith(recurse)
    }};
}

/// If `path` begins with a prefix matching `prefix_pat` and has more path
/// after it, return the tail starting at the `/`.
fn subtree_tail<'a>(prefix_pat: &str, path: &'a str) -> Option<&'a str> {
    let segments = prefix_pat.split('/').count();
    let mut seen = 0;
    let mut boundary = None;
    for (i, b) in path.bytes().enumerate() {
        if b == b'/' {
            seen += 1;
            if seen == segments {
                boundary = Some(i);
                break;
            }
        }
    }
    let boundary = boundary?;
    let (prefix, tail) = path.split_at(boundary);
    pattern::matches(prefix_pat, prefix).then_some(tail)
}
