//! Typed-array constructors exposed as shell globals.

use boa_engine::context::intrinsics::{StandardConstructor, StandardConstructors};
use boa_engine::property::Attribute;
use boa_engine::{Context, JsResult, JsString};

type Accessor = fn(&StandardConstructors) -> &StandardConstructor;

/// Global name and intrinsic for every typed-array kind.
pub static TYPED_ARRAYS: &[(&str, Accessor)] = &[
    ("Int8Array", StandardConstructors::typed_int8_array),
    ("Int16Array", StandardConstructors::typed_int16_array),
    ("Int32Array", StandardConstructors::typed_int32_array),
    ("Uint8Array", StandardConstructors::typed_uint8_array),
    ("Uint8ClampedArray", StandardConstructors::typed_uint8clamped_array),
    ("Uint16Array", StandardConstructors::typed_uint16_array),
    ("Uint32Array", StandardConstructors::typed_uint32_array),
    ("Float32Array", StandardConstructors::typed_float32_array),
    ("Float64Array", StandardConstructors::typed_float64_array),
];

/// Bind each constructor under its global name.
pub fn register(context: &mut Context) -> JsResult<()> {
    for (name, accessor) in TYPED_ARRAYS {
        let constructor = accessor(context.intrinsics().constructors()).constructor();
        context.register_global_property(
            JsString::from(*name),
            constructor,
            Attribute::WRITABLE | Attribute::CONFIGURABLE,
        )?;
    }
    Ok(())
}
