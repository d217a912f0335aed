use std::fmt;

// DType: element types a buffer can hold
//
// Every entity is generic over its element type, so operands of one
// expression always agree on it at compile time. The DType enum is the
// runtime mirror of that parameter, used in error messages and logs.
//
// Stored values are plain `Copy` data. References, interior mutability and
// other qualifiers never end up inside a buffer because `Copy + 'static`
// rules them out.

/// Runtime tag of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F16,
    BF16,
    F32,
    F64,
    U8,
    U32,
    I64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::U8 => "u8",
            DType::U32 => "u32",
            DType::I64 => "i64",
        };
        write!(f, "{}", s)
    }
}

/// A type that can be stored in a buffer.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + 'static {
    const DTYPE: DType;

    /// Nearest value of this type to `v`. Fillers sample in f64 and narrow
    /// through this.
    fn from_f64(v: f64) -> Self;

    fn zero() -> Self {
        Self::from_f64(0.0)
    }

    fn one() -> Self {
        Self::from_f64(1.0)
    }
}

macro_rules! primitive_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }
            }
        )*
    };
}

primitive_element! {
    f32 => F32,
    f64 => F64,
    u8 => U8,
    u32 => U32,
    i64 => I64,
}

impl Element for half::f16 {
    const DTYPE: DType = DType::F16;
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }
}

impl Element for half::bf16 {
    const DTYPE: DType = DType::BF16;
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }
}
