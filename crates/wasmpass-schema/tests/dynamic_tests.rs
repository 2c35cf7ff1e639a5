//! Integration tests for schema-driven marshalling.
//!
//! Tests validate:
//! - Dynamic descriptors read the same bytes generated types write
//! - Struct relocation and field mutation through dynamic values
//! - Open enum values surviving dynamic round trips
//! - Lazy dynamic slices with per-access reads
//! - Mismatched values and out-of-range offsets leave memory untouched

use wasmpass_schema::{DynSlice, Error, Registry, Value};
use wasmpass_types::{wasm_enum, wasm_struct, EnumValue, Handle, Schema, Slice, WasmType};

// ══════════════════════════════════════════════════════════════════════════════
// Fixtures
// ══════════════════════════════════════════════════════════════════════════════

wasm_enum! {
    pub enum MyEnum: u8 {
        papa = 0,
        mama = 1,
    }
}

wasm_struct! {
    pub struct MyStruct(6) {
        pub a @ 0: u8,
        pub b @ 2: u16,
        pub c @ 4: bool,
        pub d @ 5: EnumValue<MyEnum>,
    }
}

wasm_struct! {
    pub struct Inventory(16) {
        pub owner @ 0: Handle,
        pub counts @ 4: Slice<u16>,
        pub kind @ 12: EnumValue<MyEnum>,
    }
}

fn registry() -> Registry {
    let schema = Schema::new(1)
        .with_enum::<MyEnum>()
        .with_struct::<MyStruct>()
        .with_struct::<Inventory>();
    Registry::new(schema).unwrap()
}

fn my_struct() -> MyStruct {
    MyStruct {
        a: 10,
        b: 300,
        c: true,
        d: MyEnum::mama(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Typed / dynamic agreement
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn dynamic_decode_reads_typed_encode() {
    let reg = registry();
    let mut mem = vec![0u8; 32];
    my_struct().encode(&mut mem, 4).unwrap();

    let value = reg.descriptor("MyStruct").unwrap().decode(&mem, 4).unwrap();
    assert_eq!(
        value.to_string(),
        "MyStruct { a: 10, b: 300, c: true, d: MyEnum.mama }"
    );
}

#[test]
fn typed_decode_reads_dynamic_encode() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut src = vec![0u8; 8];
    my_struct().encode(&mut src, 0).unwrap();
    let value = desc.decode(&src, 0).unwrap();

    let mut mem = vec![0u8; 32];
    desc.encode(&value, &mut mem, 20).unwrap();
    assert_eq!(MyStruct::decode(&mem, 20).unwrap(), my_struct());
}

#[test]
fn descriptor_size_matches_generated_size() {
    let reg = registry();
    assert_eq!(reg.descriptor("MyStruct").unwrap().size(), MyStruct::SIZE);
    assert_eq!(reg.descriptor("Inventory").unwrap().size(), Inventory::SIZE);
    assert_eq!(reg.descriptor("MyEnum").unwrap().size(), 1);
}

// ══════════════════════════════════════════════════════════════════════════════
// Struct scenarios
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn decode_at_zero_encode_at_sixteen() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut mem = vec![0u8; 32];
    mem[..6].copy_from_slice(&[10, 0, 0x2C, 0x01, 1, 1]);

    let value = desc.decode(&mem, 0).unwrap();
    desc.encode(&value, &mut mem, 16).unwrap();
    assert_eq!(&mem[16..22], &mem[0..6]);
}

#[test]
fn field_mutation_is_written_back() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut mem = vec![0u8; 8];
    my_struct().encode(&mut mem, 0).unwrap();

    let mut value = desc.decode(&mem, 0).unwrap();
    value.set_field("a", Value::U8(20));
    value.set_field("d", reg.enum_member("MyEnum", "papa").unwrap());
    desc.encode(&value, &mut mem, 0).unwrap();

    let typed = MyStruct::decode(&mem, 0).unwrap();
    assert_eq!(typed.a, 20);
    assert_eq!(typed.d, MyEnum::papa());
}

#[test]
fn unknown_enum_round_trips_dynamically() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut mem = vec![0u8; 16];
    mem[5] = 42;

    let value = desc.decode(&mem, 0).unwrap();
    let d = value.field("d").unwrap();
    assert_eq!(d.to_string(), "MyEnum(42)");
    assert_eq!(d.as_i64(), Some(42));

    desc.encode(&value, &mut mem, 8).unwrap();
    assert_eq!(mem[13], 42);
}

// ══════════════════════════════════════════════════════════════════════════════
// Slices
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn dynamic_slice_in_struct() {
    let reg = registry();
    let mut mem = vec![0u8; 64];
    Inventory {
        owner: Handle::from_raw(2),
        counts: Slice::new(32, 3),
        kind: MyEnum::papa(),
    }
    .encode(&mut mem, 0)
    .unwrap();

    let value = reg.descriptor("Inventory").unwrap().decode(&mem, 0).unwrap();
    assert_eq!(value.field("owner").and_then(Value::as_handle), Some(Handle::from_raw(2)));

    let counts = value.field("counts").and_then(Value::as_slice).unwrap().clone();
    for (i, n) in [10u16, 20, 30].into_iter().enumerate() {
        counts.set(&reg, &mut mem, i as u32, &Value::U16(n)).unwrap();
    }
    assert_eq!(
        counts.to_vec(&reg, &mem).unwrap(),
        vec![Value::U16(10), Value::U16(20), Value::U16(30)]
    );
    assert_eq!(&mem[32..38], &[10, 0, 20, 0, 30, 0]);

    // no caching: a write behind the view's back is seen on the next read
    mem[34] = 21;
    assert_eq!(counts.get(&reg, &mem, 1).unwrap(), Value::U16(21));

    assert_eq!(
        counts.get(&reg, &mem, 3).unwrap_err(),
        Error::IndexOutOfRange { index: 3, length: 3 }
    );
}

#[test]
fn dynamic_slice_of_structs() {
    let reg = registry();
    let mut mem = vec![0u8; 64];
    let slice = DynSlice::new("MyStruct".parse().unwrap(), 16, 2);
    let value = {
        let mut src = vec![0u8; 6];
        my_struct().encode(&mut src, 0).unwrap();
        reg.descriptor("MyStruct").unwrap().decode(&src, 0).unwrap()
    };

    slice.set(&reg, &mut mem, 1, &value).unwrap();
    assert_eq!(slice.element_offset(&reg, 1).unwrap(), 22);
    assert_eq!(MyStruct::decode(&mem, 22).unwrap(), my_struct());
}

// ══════════════════════════════════════════════════════════════════════════════
// Failure leaves memory untouched
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn mismatched_field_writes_zero_bytes() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut mem = vec![0u8; 8];
    my_struct().encode(&mut mem, 0).unwrap();
    let mut value = desc.decode(&mem, 0).unwrap();
    let snapshot = mem.clone();

    // `a` is fine, `c` is not: nothing may be written, not even `a`
    value.set_field("a", Value::U8(99));
    value.set_field("c", Value::U32(1));
    let err = desc.encode(&value, &mut mem, 0).unwrap_err();
    assert_eq!(
        err,
        Error::TypeMismatch {
            expected: "bool".to_string(),
            found: "u32".to_string()
        }
    );
    assert_eq!(mem, snapshot);
}

#[test]
fn wrong_struct_type_is_rejected() {
    let reg = registry();
    let mut mem = vec![0u8; 16];
    let other = reg.descriptor("Inventory").unwrap().decode(&mem, 0).unwrap();
    let err = reg
        .descriptor("MyStruct")
        .unwrap()
        .encode(&other, &mut mem, 0)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
    assert!(mem.iter().all(|&b| b == 0));
}

#[test]
fn out_of_bounds_dynamic_access() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut mem = vec![0u8; 10];
    let value = desc.decode(&mem, 4).unwrap();
    assert!(matches!(desc.decode(&mem, 5), Err(Error::OutOfBounds { .. })));
    assert!(matches!(
        desc.encode(&value, &mut mem, 5),
        Err(Error::OutOfBounds { .. })
    ));
    assert!(mem.iter().all(|&b| b == 0));
}

#[test]
fn padding_survives_dynamic_encode() {
    let reg = registry();
    let desc = reg.descriptor("MyStruct").unwrap();
    let mut src = vec![0u8; 6];
    my_struct().encode(&mut src, 0).unwrap();
    let value = desc.decode(&src, 0).unwrap();

    let mut mem = vec![0xEEu8; 6];
    desc.encode(&value, &mut mem, 0).unwrap();
    assert_eq!(mem[1], 0xEE);
}
