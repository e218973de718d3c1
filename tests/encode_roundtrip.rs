//! Binary format tests: round trips, header validation, corruption.

use machine_dialect::bytecode::{
    decode_module, encode_module, BytecodeModule, EncodeError, FORMAT_VERSION, MAGIC,
};
use machine_dialect::compile::{compile_source, CompileOptions};
use machine_dialect::opt::OptLevel;

fn compiled(source: &str) -> BytecodeModule {
    compile_source(source, &CompileOptions::default())
        .expect("compilation succeeds")
        .module
}

#[test]
fn round_trip_preserves_the_module() {
    let sources = [
        "Give back _1_.",
        "Set `x` to _2_ + _3_ * _4_. Give back `x`.",
        "Say _\"hello\"_. Give back _3.5_.",
        "Give back _\"https://example.com\"_.",
        concat!(
            "### **Interaction**: `fib`\n",
            "<details>\n",
            "#### Inputs:\n",
            "- `n`\n",
            "If `n` is less than _2_ then:\n",
            "> Give back `n`.\n",
            "Give back `fib`(`n` - _1_) + `fib`(`n` - _2_).\n",
            "</details>\n",
            "Give back `fib`(_10_).\n",
        ),
    ];
    for source in sources {
        let module = compiled(source);
        let bytes = encode_module(&module).expect("encodes");
        let decoded = decode_module(&bytes).expect("decodes");
        assert_eq!(module, decoded, "round trip failed for {source:?}");
    }
}

#[test]
fn round_trip_is_stable_across_opt_levels() {
    let source = "Set `x` to _15_.\nIf `x` is greater than _10_ then:\n> Set `y` to _1_.\nelse:\n> Set `y` to _2_.\nGive back `y`.\n";
    for level in [OptLevel::None, OptLevel::Basic, OptLevel::Aggressive] {
        let module = compile_source(source, &CompileOptions::with_opt_level(level))
            .expect("compiles")
            .module;
        let bytes = encode_module(&module).expect("encodes");
        let decoded = decode_module(&bytes).expect("decodes");
        assert_eq!(module, decoded);
    }
}

#[test]
fn header_starts_with_the_magic_bytes() {
    let module = compiled("Give back _1_.");
    let bytes = encode_module(&module).expect("encodes");
    assert_eq!(&bytes[0..4], &[0xBE, 0xBE, 0xCA, 0xFE]);
    assert_eq!(
        u16::from_le_bytes([bytes[4], bytes[5]]),
        FORMAT_VERSION
    );
}

#[test]
fn bad_magic_is_rejected() {
    let module = compiled("Give back _1_.");
    let mut bytes = encode_module(&module).expect("encodes");
    bytes[0] = 0x00;
    let result = decode_module(&bytes);
    assert!(matches!(result, Err(EncodeError::BadMagic { .. })));
}

#[test]
fn unsupported_version_is_rejected() {
    let module = compiled("Give back _1_.");
    let mut bytes = encode_module(&module).expect("encodes");
    bytes[4] = 0xFF;
    bytes[5] = 0xFF;
    let result = decode_module(&bytes);
    assert!(matches!(result, Err(EncodeError::UnsupportedVersion(_))));
}

#[test]
fn truncated_input_is_rejected() {
    let module = compiled("Set `x` to _1_. Give back `x`.");
    let bytes = encode_module(&module).expect("encodes");
    for cut in [3, 8, bytes.len() / 2, bytes.len() - 1] {
        let result = decode_module(&bytes[..cut]);
        assert!(result.is_err(), "cut at {cut} decoded");
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let module = compiled("Give back _1_.");
    let mut bytes = encode_module(&module).expect("encodes");
    bytes.push(0);
    let result = decode_module(&bytes);
    assert!(matches!(result, Err(EncodeError::TrailingBytes)));
}

#[test]
fn unknown_constant_tag_is_rejected() {
    // Hand-assemble a header with one bogus constant tag.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC.to_be_bytes());
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // flags
    bytes.push(0); // module type
    bytes.extend_from_slice(&1u16.to_le_bytes()); // name length
    bytes.push(b'm');
    bytes.extend_from_slice(&0u32.to_le_bytes()); // string count
    bytes.extend_from_slice(&1u16.to_le_bytes()); // constant count
    bytes.push(0x77); // bogus tag
    let result = decode_module(&bytes);
    assert!(matches!(result, Err(EncodeError::BadConstantTag(0x77))));
}

#[test]
fn dangling_string_reference_is_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC.to_be_bytes());
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(0);
    bytes.extend_from_slice(&0u16.to_le_bytes()); // empty name
    bytes.extend_from_slice(&0u32.to_le_bytes()); // no strings
    bytes.extend_from_slice(&1u16.to_le_bytes()); // one constant
    bytes.push(3); // string-ref tag
    bytes.extend_from_slice(&5u32.to_le_bytes()); // index into nothing
    let result = decode_module(&bytes);
    assert!(matches!(result, Err(EncodeError::IndexOutOfRange { .. })));
}
