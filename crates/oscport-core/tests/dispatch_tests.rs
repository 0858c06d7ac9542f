//! Dispatch tests: flat tables, subtree descent, context narrowing,
//! and bundle dispatch.

use oscport_core::{
    dispatch, dispatch_at, dispatch_packet, message, Arg, BundleWriter, Message, Port, PortValue,
    Ports, TimeTag,
};

#[derive(Default)]
struct Synth {
    freq: f32,
    gain: f32,
    gate: bool,
    filter: Filter,
}

#[derive(Default)]
struct Filter {
    cutoff: f32,
    resonance: f32,
}

fn set_freq(msg: &Message, synth: &mut Synth) {
    if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
        synth.freq = v;
    }
}

fn set_gain(msg: &Message, synth: &mut Synth) {
    if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
        synth.gain = v;
    }
}

fn set_gate(msg: &Message, synth: &mut Synth) {
    if let Some(v) = msg.arg(0).and_then(|a| a.as_bool()) {
        synth.gate = v;
    }
}

fn set_cutoff(msg: &Message, filter: &mut Filter) {
    if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
        filter.cutoff = v;
    }
}

fn set_resonance(msg: &Message, filter: &mut Filter) {
    if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
        filter.resonance = v;
    }
}

static FILTER_PORTS: Ports<Filter> = Ports::new(&[
    Port {
        pattern: "cutoff:f",
        metadata: "Hz",
        value: PortValue::Leaf(set_cutoff),
    },
    Port {
        pattern: "resonance:f",
        metadata: "0..1",
        value: PortValue::Leaf(set_resonance),
    },
]);

fn into_filter(msg: &Message, tail: &str, synth: &mut Synth) -> bool {
    dispatch_at(&FILTER_PORTS, msg, tail, &mut synth.filter)
}

static SYNTH_PORTS: Ports<Synth> = Ports::new(&[
    Port {
        pattern: "freq:f",
        metadata: "Hz",
        value: PortValue::Leaf(set_freq),
    },
    Port {
        pattern: "gain:f",
        metadata: "dB",
        value: PortValue::Leaf(set_gain),
    },
    Port {
        pattern: "gate:T",
        metadata: "",
        value: PortValue::Leaf(set_gate),
    },
    Port {
        pattern: "filter/",
        metadata: "",
        value: PortValue::TreeWith(into_filter),
    },
]);

fn encode<'a>(buf: &'a mut [u8], address: &str, args: &[Arg]) -> &'a [u8] {
    let n = message(buf, address, args).unwrap();
    &buf[..n]
}

#[test]
fn test_leaf_dispatch() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 64];
    let bytes = encode(&mut buf, "/freq", &[Arg::Float(440.0)]);

    assert!(dispatch(&SYNTH_PORTS, &Message::new(bytes), &mut synth));
    assert_eq!(synth.freq, 440.0);
    assert_eq!(synth.gain, 0.0);
}

#[test]
fn test_unmatched_address_is_dropped() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 64];
    let bytes = encode(&mut buf, "/nope", &[Arg::Float(1.0)]);

    assert!(!dispatch(&SYNTH_PORTS, &Message::new(bytes), &mut synth));
}

#[test]
fn test_type_constraint_gates_the_match() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 64];

    // Wrong type: the pattern matches but the constraint does not.
    let bytes = encode(&mut buf, "/freq", &[Arg::Str("nope")]);
    assert!(!dispatch(&SYNTH_PORTS, &Message::new(bytes), &mut synth));

    // Trailing tags beyond the constraint still match.
    let bytes = encode(&mut buf, "/freq", &[Arg::Float(220.0), Arg::Int(1)]);
    assert!(dispatch(&SYNTH_PORTS, &Message::new(bytes), &mut synth));
    assert_eq!(synth.freq, 220.0);
}

#[test]
fn test_subtree_descent_narrows_context() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 64];
    let bytes = encode(&mut buf, "/filter/cutoff", &[Arg::Float(1200.0)]);

    assert!(dispatch(&SYNTH_PORTS, &Message::new(bytes), &mut synth));
    assert_eq!(synth.filter.cutoff, 1200.0);
    assert_eq!(synth.filter.resonance, 0.0);
}

#[test]
fn test_subtree_prefix_alone_does_not_match() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 64];
    let bytes = encode(&mut buf, "/filter", &[Arg::Float(1.0)]);

    assert!(!dispatch(&SYNTH_PORTS, &Message::new(bytes), &mut synth));
}

#[test]
fn test_dispatch_is_deterministic() {
    let mut buf = [0u8; 64];
    let bytes = encode(&mut buf, "/gain", &[Arg::Float(-6.0)]);
    let msg = Message::new(bytes);

    for _ in 0..10 {
        let mut synth = Synth::default();
        assert!(dispatch(&SYNTH_PORTS, &msg, &mut synth));
        assert_eq!(synth.gain, -6.0);
        assert_eq!(synth.freq, 0.0);
    }
}

#[test]
fn test_pattern_ports_match_wildcards() {
    #[derive(Default)]
    struct Hits(u32);

    fn count(_msg: &Message, hits: &mut Hits) {
        hits.0 += 1;
    }

    static WILD: Ports<Hits> = Ports::new(&[Port {
        pattern: "voice[0-9]/gain:f",
        metadata: "",
        value: PortValue::Leaf(count),
    }]);

    let mut hits = Hits::default();
    let mut buf = [0u8; 64];

    let bytes = encode(&mut buf, "/voice3/gain", &[Arg::Float(0.5)]);
    assert!(dispatch(&WILD, &Message::new(bytes), &mut hits));

    let bytes = encode(&mut buf, "/voiceX/gain", &[Arg::Float(0.5)]);
    assert!(!dispatch(&WILD, &Message::new(bytes), &mut hits));

    assert_eq!(hits.0, 1);
}

#[test]
fn test_bundle_elements_dispatch_in_order() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 256];

    let mut writer = BundleWriter::new(&mut buf, TimeTag::IMMEDIATE).unwrap();
    writer.message("/freq", &[Arg::Float(330.0)]).unwrap();
    writer.message("/gain", &[Arg::Float(-12.0)]).unwrap();
    writer.message("/gate", &[Arg::True]).unwrap();
    let len = writer.finish();

    assert!(dispatch_packet(&SYNTH_PORTS, &buf[..len], &mut synth));
    assert_eq!(synth.freq, 330.0);
    assert_eq!(synth.gain, -12.0);
    assert!(synth.gate);
}

#[test]
fn test_plain_tree_descent_keeps_context() {
    #[derive(Default)]
    struct Mixer {
        main_level: f32,
        aux_level: f32,
    }

    fn set_main(msg: &Message, mixer: &mut Mixer) {
        if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
            mixer.main_level = v;
        }
    }

    fn set_aux(msg: &Message, mixer: &mut Mixer) {
        if let Some(v) = msg.arg(0).and_then(|a| a.as_f32()) {
            mixer.aux_level = v;
        }
    }

    static BUS_PORTS: Ports<Mixer> = Ports::new(&[
        Port {
            pattern: "main:f",
            metadata: "",
            value: PortValue::Leaf(set_main),
        },
        Port {
            pattern: "aux:f",
            metadata: "",
            value: PortValue::Leaf(set_aux),
        },
    ]);

    static MIXER_PORTS: Ports<Mixer> = Ports::new(&[Port {
        pattern: "bus/",
        metadata: "",
        value: PortValue::Tree(&BUS_PORTS),
    }]);

    let mut mixer = Mixer::default();
    let mut buf = [0u8; 64];

    let bytes = encode(&mut buf, "/bus/aux", &[Arg::Float(0.25)]);
    assert!(dispatch(&MIXER_PORTS, &Message::new(bytes), &mut mixer));
    assert_eq!(mixer.aux_level, 0.25);
    assert_eq!(mixer.main_level, 0.0);
}

#[test]
fn test_generated_ports() {
    use oscport_core::{descend, set_float};

    #[derive(Default)]
    struct Layer {
        opacity: f32,
        blur: Blur,
    }

    #[derive(Default)]
    struct Blur {
        radius: f32,
    }

    static BLUR_PORTS: Ports<Blur> = Ports::new(&[Port {
        pattern: "radius:f",
        metadata: "px",
        value: set_float!(Blur, radius),
    }]);

    static LAYER_PORTS: Ports<Layer> = Ports::new(&[
        Port {
            pattern: "opacity:f",
            metadata: "0..1",
            value: set_float!(Layer, opacity),
        },
        Port {
            pattern: "blur/",
            metadata: "",
            value: descend!(Layer, blur, BLUR_PORTS),
        },
    ]);

    let mut layer = Layer::default();
    let mut buf = [0u8; 64];

    let bytes = encode(&mut buf, "/opacity", &[Arg::Float(0.8)]);
    assert!(dispatch(&LAYER_PORTS, &Message::new(bytes), &mut layer));
    assert_eq!(layer.opacity, 0.8);

    let bytes = encode(&mut buf, "/blur/radius", &[Arg::Float(4.0)]);
    assert!(dispatch(&LAYER_PORTS, &Message::new(bytes), &mut layer));
    assert_eq!(layer.blur.radius, 4.0);
}

#[test]
fn test_bundle_with_no_matches_returns_false() {
    let mut synth = Synth::default();
    let mut buf = [0u8; 128];

    let mut writer = BundleWriter::new(&mut buf, TimeTag::IMMEDIATE).unwrap();
    writer.message("/unknown", &[]).unwrap();
    let len = writer.finish();

    assert!(!dispatch_packet(&SYNTH_PORTS, &buf[..len], &mut synth));
}
