//! Arithmetic unit
//!
//! Pure, fixed-width operations over [`Value`]s:
//!
//! - Integer `+ - *` wrap modulo 2^N; `/` truncates toward zero and
//!   `MIN / -1 == MIN`; `%` takes the dividend's sign. Only a zero divisor
//!   faults.
//! - Shift distances are masked to the left operand's width (31 or 63), so
//!   a negative distance acts as its unsigned low bits.
//! - Operands narrower than `int` are widened to `int` first (`char`
//!   zero-extends, `byte`/`short` sign-extend); mixed operands promote to
//!   `long`, `float` or `double`, whichever is widest.
//! - Narrowing only happens through [`cast`] or [`compound_assign`].
//!
//! The typed kernels (`int_div`, `long_ushr`, ...) are exposed for
//! interpreter fast paths that already know their operand types.

use crate::fault::Fault;
use crate::value::Value;
use crate::{KernelError, KernelResult};
use javelin_types::PrimitiveType;
use std::cmp::Ordering;

/// Binary operator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<<`
    Shl,
    /// `>>`, sign-extending
    Shr,
    /// `>>>`, zero-extending
    Ushr,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
}

impl BinaryOp {
    /// Source-level operator
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }

    /// `<<`, `>>` or `>>>`
    pub const fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Two's-complement or IEEE negation
    Neg,
    /// Bitwise complement, or logical not on booleans
    Not,
}

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Result of a three-way floating compare when either side is NaN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NanBias {
    /// `fcmpl` / `dcmpl`: NaN compares as -1
    Less,
    /// `fcmpg` / `dcmpg`: NaN compares as 1
    Greater,
}

macro_rules! integer_kernels {
    ($int:ty, $uint:ty, $div:ident, $rem:ident, $shl:ident, $shr:ident, $ushr:ident) => {
        #[doc = concat!("Truncating `", stringify!($int), "` division; `MIN / -1` wraps to `MIN`")]
        #[inline]
        pub fn $div(a: $int, b: $int) -> Result<$int, Fault> {
            if b == 0 {
                Err(Fault::DivisionByZero)
            } else {
                Ok(a.wrapping_div(b))
            }
        }

        #[doc = concat!("`", stringify!($int), "` remainder with the dividend's sign; `MIN % -1 == 0`")]
        #[inline]
        pub fn $rem(a: $int, b: $int) -> Result<$int, Fault> {
            if b == 0 {
                Err(Fault::DivisionByZero)
            } else {
                Ok(a.wrapping_rem(b))
            }
        }

        #[doc = concat!("`", stringify!($int), "` left shift with a masked distance")]
        #[inline]
        pub fn $shl(value: $int, distance: i32) -> $int {
            value.wrapping_shl(distance as u32)
        }

        #[doc = concat!("`", stringify!($int), "` arithmetic right shift with a masked distance")]
        #[inline]
        pub fn $shr(value: $int, distance: i32) -> $int {
            value.wrapping_shr(distance as u32)
        }

        #[doc = concat!("`", stringify!($int), "` logical right shift with a masked distance")]
        #[inline]
        pub fn $ushr(value: $int, distance: i32) -> $int {
            (value as $uint).wrapping_shr(distance as u32) as $int
        }
    };
}

integer_kernels!(i32, u32, int_div, int_rem, int_shl, int_shr, int_ushr);
integer_kernels!(i64, u64, long_div, long_rem, long_shl, long_shr, long_ushr);

/// `iinc`: add an immediate to an `int` local, wrapping
#[inline]
pub fn increment(local: i32, delta: i32) -> i32 {
    local.wrapping_add(delta)
}

/// Operand after unary numeric promotion
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Numeric {
    fn promote(value: Value) -> Option<Numeric> {
        match value {
            Value::Byte(b) => Some(Numeric::Int(b as i32)),
            Value::Short(s) => Some(Numeric::Int(s as i32)),
            Value::Char(c) => Some(Numeric::Int(c as i32)),
            Value::Int(i) => Some(Numeric::Int(i)),
            Value::Long(l) => Some(Numeric::Long(l)),
            Value::Float(f) => Some(Numeric::Float(f)),
            Value::Double(d) => Some(Numeric::Double(d)),
            Value::Boolean(_) | Value::Reference(_) => None,
        }
    }

    fn to_i64(self) -> i64 {
        match self {
            Numeric::Int(i) => i as i64,
            Numeric::Long(l) => l,
            Numeric::Float(f) => f as i64,
            Numeric::Double(d) => d as i64,
        }
    }

    fn to_f32(self) -> f32 {
        match self {
            Numeric::Int(i) => i as f32,
            Numeric::Long(l) => l as f32,
            Numeric::Float(f) => f,
            Numeric::Double(d) => d as f32,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Long(l) => l as f64,
            Numeric::Float(f) => f as f64,
            Numeric::Double(d) => d,
        }
    }

    /// Binary numeric promotion to the wider of the two kinds
    fn widen_pair(a: Numeric, b: Numeric) -> (Numeric, Numeric) {
        use Numeric::*;
        match (a, b) {
            (Double(_), _) | (_, Double(_)) => (Double(a.to_f64()), Double(b.to_f64())),
            (Float(_), _) | (_, Float(_)) => (Float(a.to_f32()), Float(b.to_f32())),
            (Long(_), _) | (_, Long(_)) => (Long(a.to_i64()), Long(b.to_i64())),
            _ => (a, b),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::Int(i),
            Numeric::Long(l) => Value::Long(l),
            Numeric::Float(f) => Value::Float(f),
            Numeric::Double(d) => Value::Double(d),
        }
    }
}

fn mismatch(operation: &'static str, lhs: Value, rhs: Option<Value>) -> KernelError {
    let operands = match rhs {
        Some(rhs) => format!("{} and {}", lhs.type_name(), rhs.type_name()),
        None => lhs.type_name().to_string(),
    };
    KernelError::OperandMismatch {
        operation,
        operands,
    }
}

fn int_op(op: BinaryOp, a: i32, b: i32) -> Result<i32, Fault> {
    Ok(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => int_div(a, b)?,
        BinaryOp::Rem => int_rem(a, b)?,
        BinaryOp::Shl => int_shl(a, b),
        BinaryOp::Shr => int_shr(a, b),
        BinaryOp::Ushr => int_ushr(a, b),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
    })
}

fn long_op(op: BinaryOp, a: i64, b: i64) -> Result<i64, Fault> {
    Ok(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => long_div(a, b)?,
        BinaryOp::Rem => long_rem(a, b)?,
        BinaryOp::Shl => long_shl(a, b as i32),
        BinaryOp::Shr => long_shr(a, b as i32),
        BinaryOp::Ushr => long_ushr(a, b as i32),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
    })
}

fn float_op(op: BinaryOp, a: f32, b: f32) -> Option<f32> {
    match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Sub => Some(a - b),
        BinaryOp::Mul => Some(a * b),
        BinaryOp::Div => Some(a / b),
        BinaryOp::Rem => Some(a % b),
        _ => None,
    }
}

fn double_op(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Sub => Some(a - b),
        BinaryOp::Mul => Some(a * b),
        BinaryOp::Div => Some(a / b),
        BinaryOp::Rem => Some(a % b),
        _ => None,
    }
}

/// Apply a binary operator with Java promotion rules
///
/// Shifts promote each operand on its own and keep the left operand's
/// promoted type. Booleans accept `&`, `|` and `^` only.
///
/// # Errors
///
/// - [`Fault::DivisionByZero`] for integer `/` or `%` by zero
/// - [`KernelError::OperandMismatch`] for operand types the operator
///   does not accept
pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> KernelResult<Value> {
    if let (Value::Boolean(a), Value::Boolean(b)) = (lhs, rhs) {
        return match op {
            BinaryOp::And => Ok(Value::Boolean(a & b)),
            BinaryOp::Or => Ok(Value::Boolean(a | b)),
            BinaryOp::Xor => Ok(Value::Boolean(a ^ b)),
            _ => Err(mismatch(op.symbol(), lhs, Some(rhs))),
        };
    }

    let (a, b) = match (Numeric::promote(lhs), Numeric::promote(rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(mismatch(op.symbol(), lhs, Some(rhs))),
    };

    if op.is_shift() {
        let distance = match b {
            Numeric::Int(d) => d,
            Numeric::Long(d) => d as i32,
            _ => return Err(mismatch(op.symbol(), lhs, Some(rhs))),
        };
        return match a {
            Numeric::Int(v) => Ok(Value::Int(int_op(op, v, distance)?)),
            Numeric::Long(v) => Ok(Value::Long(long_op(op, v, distance as i64)?)),
            _ => Err(mismatch(op.symbol(), lhs, Some(rhs))),
        };
    }

    let result = match Numeric::widen_pair(a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => Numeric::Int(int_op(op, x, y)?),
        (Numeric::Long(x), Numeric::Long(y)) => Numeric::Long(long_op(op, x, y)?),
        (Numeric::Float(x), Numeric::Float(y)) => match float_op(op, x, y) {
            Some(r) => Numeric::Float(r),
            None => return Err(mismatch(op.symbol(), lhs, Some(rhs))),
        },
        (Numeric::Double(x), Numeric::Double(y)) => match double_op(op, x, y) {
            Some(r) => Numeric::Double(r),
            None => return Err(mismatch(op.symbol(), lhs, Some(rhs))),
        },
        _ => return Err(mismatch(op.symbol(), lhs, Some(rhs))),
    };
    Ok(result.into_value())
}

/// Apply a unary operator
///
/// Negating the minimum value of a width yields that same value.
pub fn unary(op: UnaryOp, operand: Value) -> KernelResult<Value> {
    let symbol = match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "~",
    };
    if let Value::Boolean(b) = operand {
        return match op {
            UnaryOp::Not => Ok(Value::Boolean(!b)),
            UnaryOp::Neg => Err(mismatch(symbol, operand, None)),
        };
    }
    let promoted = Numeric::promote(operand).ok_or_else(|| mismatch(symbol, operand, None))?;
    let result = match (op, promoted) {
        (UnaryOp::Neg, Numeric::Int(i)) => Value::Int(i.wrapping_neg()),
        (UnaryOp::Neg, Numeric::Long(l)) => Value::Long(l.wrapping_neg()),
        (UnaryOp::Neg, Numeric::Float(f)) => Value::Float(-f),
        (UnaryOp::Neg, Numeric::Double(d)) => Value::Double(-d),
        (UnaryOp::Not, Numeric::Int(i)) => Value::Int(!i),
        (UnaryOp::Not, Numeric::Long(l)) => Value::Long(!l),
        (UnaryOp::Not, _) => return Err(mismatch(symbol, operand, None)),
    };
    Ok(result)
}

fn from_int(i: i32, target: PrimitiveType) -> Value {
    match target {
        PrimitiveType::Byte => Value::Byte(i as i8),
        PrimitiveType::Short => Value::Short(i as i16),
        PrimitiveType::Char => Value::Char(i as u16),
        PrimitiveType::Int => Value::Int(i),
        PrimitiveType::Long => Value::Long(i as i64),
        PrimitiveType::Float => Value::Float(i as f32),
        PrimitiveType::Double => Value::Double(i as f64),
        PrimitiveType::Boolean => Value::Boolean(i != 0),
    }
}

/// Convert a primitive value to another primitive type
///
/// Narrowing keeps the low bits and reinterprets them with the target's
/// signedness. Floating values convert to `int`/`long` by truncation,
/// saturating at the target range with NaN mapping to zero; conversions to
/// `byte`, `short` and `char` go through `int` first. `boolean` only
/// converts to itself.
pub fn cast(value: Value, target: PrimitiveType) -> KernelResult<Value> {
    let unsupported = || KernelError::UnsupportedConversion {
        from: value.type_name(),
        to: target.name(),
    };

    if let Value::Boolean(b) = value {
        return match target {
            PrimitiveType::Boolean => Ok(Value::Boolean(b)),
            _ => Err(unsupported()),
        };
    }
    if target == PrimitiveType::Boolean {
        return Err(unsupported());
    }

    let converted = match Numeric::promote(value).ok_or_else(unsupported)? {
        Numeric::Int(i) => from_int(i, target),
        Numeric::Long(l) => match target {
            PrimitiveType::Long => Value::Long(l),
            PrimitiveType::Float => Value::Float(l as f32),
            PrimitiveType::Double => Value::Double(l as f64),
            _ => from_int(l as i32, target),
        },
        Numeric::Float(f) => match target {
            PrimitiveType::Float => Value::Float(f),
            PrimitiveType::Double => Value::Double(f as f64),
            PrimitiveType::Long => Value::Long(f as i64),
            _ => from_int(f as i32, target),
        },
        Numeric::Double(d) => match target {
            PrimitiveType::Double => Value::Double(d),
            PrimitiveType::Float => Value::Float(d as f32),
            PrimitiveType::Long => Value::Long(d as i64),
            _ => from_int(d as i32, target),
        },
    };
    Ok(converted)
}

/// Compound assignment (`x op= y`): operate with promotion, then narrow the
/// result back to the type of `x`
pub fn compound_assign(op: BinaryOp, target: Value, operand: Value) -> KernelResult<Value> {
    let prim = target
        .primitive_type()
        .ok_or_else(|| mismatch(op.symbol(), target, Some(operand)))?;
    let result = binary(op, target, operand)?;
    cast(result, prim)
}

fn ordered<T: PartialOrd>(op: CompareOp, a: T, b: T) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

/// Relational comparison with numeric promotion
///
/// `char` operands compare as unsigned 16-bit values. Any comparison with
/// NaN is false except `!=`. Booleans and references support `==` and
/// `!=` only; references compare by identity.
pub fn compare(op: CompareOp, lhs: Value, rhs: Value) -> KernelResult<bool> {
    let symbol = match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    };
    match (lhs, rhs) {
        (Value::Boolean(a), Value::Boolean(b)) => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(mismatch(symbol, lhs, Some(rhs))),
        },
        (Value::Reference(a), Value::Reference(b)) => {
            let same = a.map(|r| r.handle()) == b.map(|r| r.handle());
            match op {
                CompareOp::Eq => Ok(same),
                CompareOp::Ne => Ok(!same),
                _ => Err(mismatch(symbol, lhs, Some(rhs))),
            }
        }
        _ => {
            let (a, b) = match (Numeric::promote(lhs), Numeric::promote(rhs)) {
                (Some(a), Some(b)) => Numeric::widen_pair(a, b),
                _ => return Err(mismatch(symbol, lhs, Some(rhs))),
            };
            match (a, b) {
                (Numeric::Int(x), Numeric::Int(y)) => Ok(ordered(op, x, y)),
                (Numeric::Long(x), Numeric::Long(y)) => Ok(ordered(op, x, y)),
                (Numeric::Float(x), Numeric::Float(y)) => Ok(ordered(op, x, y)),
                (Numeric::Double(x), Numeric::Double(y)) => Ok(ordered(op, x, y)),
                _ => Err(mismatch(symbol, lhs, Some(rhs))),
            }
        }
    }
}

/// Three-way compare (`lcmp`, `fcmpl`/`fcmpg`, `dcmpl`/`dcmpg`)
///
/// Returns -1, 0 or 1. `bias` decides the answer when either operand is NaN.
pub fn compare_three_way(lhs: Value, rhs: Value, bias: NanBias) -> KernelResult<i32> {
    let (a, b) = match (Numeric::promote(lhs), Numeric::promote(rhs)) {
        (Some(a), Some(b)) => Numeric::widen_pair(a, b),
        _ => return Err(mismatch("cmp", lhs, Some(rhs))),
    };
    let ordering = match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => Some(x.cmp(&y)),
        (Numeric::Long(x), Numeric::Long(y)) => Some(x.cmp(&y)),
        (Numeric::Float(x), Numeric::Float(y)) => x.partial_cmp(&y),
        (Numeric::Double(x), Numeric::Double(y)) => x.partial_cmp(&y),
        _ => return Err(mismatch("cmp", lhs, Some(rhs))),
    };
    Ok(match ordering {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None => match bias {
            NanBias::Less => -1,
            NanBias::Greater => 1,
        },
    })
}
