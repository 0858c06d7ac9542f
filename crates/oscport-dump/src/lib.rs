//! Human-readable rendering of OSC packets
//!
//! Diagnostics only: this crate allocates freely and is meant for the
//! control thread, logs, and tools. It reads packets exclusively through
//! the core's read-only accessors, so rendering never mutates or copies
//! the underlying buffer.
//!
//! ```
//! use oscport_core::{message, Arg};
//!
//! let mut buf = [0u8; 64];
//! let n = message(&mut buf, "/freq", &[Arg::Float(440.0)]).unwrap();
//! assert_eq!(oscport_dump::dump_packet(&buf[..n]), "/freq ,f 440\n");
//! ```

use std::fmt::Write;

use oscport_core::{Arg, Bundle, Message, TimeTag};

/// Render a packet (message or bundle, nested bundles included).
pub fn dump_packet(packet: &[u8]) -> String {
    let mut out = String::new();
    render_packet(&mut out, packet, 0);
    out
}

/// Render a single message on one line: address, tag string, arguments.
pub fn dump_message(msg: &Message) -> String {
    let mut out = String::new();
    render_message(&mut out, msg, 0);
    out
}

fn render_packet(out: &mut String, packet: &[u8], depth: usize) {
    match Bundle::new(packet) {
        Some(bundle) => {
            indent(out, depth);
            let _ = writeln!(out, "#bundle {}", describe_time(bundle.time_tag()));
            for element in bundle.elements() {
                render_packet(out, element, depth + 1);
            }
        }
        None => render_message(out, &Message::new(packet), depth),
    }
}

fn render_message(out: &mut String, msg: &Message, depth: usize) {
    indent(out, depth);
    out.push_str(msg.address());
    out.push_str(" ,");
    out.push_str(msg.type_tags());
    for arg in msg.args() {
        out.push(' ');
        render_arg(out, &arg);
    }
    out.push('\n');
}

fn render_arg(out: &mut String, arg: &Arg) {
    let _ = match arg {
        Arg::Int(v) => write!(out, "{v}"),
        Arg::Float(v) => write!(out, "{v}"),
        Arg::Str(s) => write!(out, "{s:?}"),
        Arg::Blob(b) => {
            let _ = write!(out, "blob[{}]", b.len());
            for byte in b.iter().take(8) {
                let _ = write!(out, " {byte:02x}");
            }
            if b.len() > 8 {
                out.push_str(" ..");
            }
            Ok(())
        }
        Arg::Long(v) => write!(out, "{v}h"),
        Arg::Double(v) => write!(out, "{v}d"),
        Arg::Time(t) => write!(out, "{}", describe_time(*t)),
        Arg::Symbol(s) => write!(out, "'{s}"),
        Arg::Char(c) => write!(out, "{c:?}"),
        Arg::Rgba(v) => write!(out, "#{v:08x}"),
        Arg::Midi(m) => write!(out, "midi({:02x} {:02x} {:02x} {:02x})", m[0], m[1], m[2], m[3]),
        Arg::True => write!(out, "true"),
        Arg::False => write!(out, "false"),
        Arg::Nil => write!(out, "nil"),
        Arg::Inf => write!(out, "inf"),
    };
}

fn describe_time(tag: TimeTag) -> String {
    if tag.is_immediate() {
        "@now".to_string()
    } else {
        format!("@{}.{:09}", tag.seconds(), frac_nanos(tag))
    }
}

fn frac_nanos(tag: TimeTag) -> u64 {
    ((tag.fraction() as u64) * 1_000_000_000) >> 32
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
