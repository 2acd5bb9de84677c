//! Well-known `java.lang` types
//!
//! The kernel surfaces runtime faults as instances of these classes, so a
//! graph that runs code which can fault should be built with
//! [`TypeGraphBuilder::with_java_lang`](crate::TypeGraphBuilder::with_java_lang).

use crate::builder::TypeGraphBuilder;

// Interfaces and `String`

/// `java.io.Serializable`
pub const SERIALIZABLE: &str = "java.io.Serializable";
/// `java.lang.Cloneable`
pub const CLONEABLE: &str = "java.lang.Cloneable";
/// `java.lang.Comparable`
pub const COMPARABLE: &str = "java.lang.Comparable";
/// `java.lang.CharSequence`
pub const CHAR_SEQUENCE: &str = "java.lang.CharSequence";
/// `java.lang.String`
pub const STRING: &str = "java.lang.String";

// Throwable roots

/// `java.lang.Throwable`
pub const THROWABLE: &str = "java.lang.Throwable";
/// `java.lang.Exception`
pub const EXCEPTION: &str = "java.lang.Exception";
/// `java.lang.Error`
pub const ERROR: &str = "java.lang.Error";
/// `java.lang.RuntimeException`
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";

// Runtime exceptions raised by faults

/// `java.lang.ArithmeticException`
pub const ARITHMETIC_EXCEPTION: &str = "java.lang.ArithmeticException";
/// `java.lang.NullPointerException`
pub const NULL_POINTER_EXCEPTION: &str = "java.lang.NullPointerException";
/// `java.lang.ClassCastException`
pub const CLASS_CAST_EXCEPTION: &str = "java.lang.ClassCastException";
/// `java.lang.ArrayStoreException`
pub const ARRAY_STORE_EXCEPTION: &str = "java.lang.ArrayStoreException";
/// `java.lang.NegativeArraySizeException`
pub const NEGATIVE_ARRAY_SIZE_EXCEPTION: &str = "java.lang.NegativeArraySizeException";
/// `java.lang.IndexOutOfBoundsException`
pub const INDEX_OUT_OF_BOUNDS_EXCEPTION: &str = "java.lang.IndexOutOfBoundsException";
/// `java.lang.ArrayIndexOutOfBoundsException`
pub const ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION: &str = "java.lang.ArrayIndexOutOfBoundsException";
/// `java.lang.IllegalArgumentException`
pub const ILLEGAL_ARGUMENT_EXCEPTION: &str = "java.lang.IllegalArgumentException";
/// `java.lang.IllegalStateException`
pub const ILLEGAL_STATE_EXCEPTION: &str = "java.lang.IllegalStateException";
/// `java.lang.UnsupportedOperationException`
pub const UNSUPPORTED_OPERATION_EXCEPTION: &str = "java.lang.UnsupportedOperationException";

// Errors

/// `java.lang.LinkageError`
pub const LINKAGE_ERROR: &str = "java.lang.LinkageError";
/// `java.lang.IncompatibleClassChangeError`
pub const INCOMPATIBLE_CLASS_CHANGE_ERROR: &str = "java.lang.IncompatibleClassChangeError";
/// `java.lang.AbstractMethodError`
pub const ABSTRACT_METHOD_ERROR: &str = "java.lang.AbstractMethodError";
/// `java.lang.VirtualMachineError`
pub const VIRTUAL_MACHINE_ERROR: &str = "java.lang.VirtualMachineError";
/// `java.lang.StackOverflowError`
pub const STACK_OVERFLOW_ERROR: &str = "java.lang.StackOverflowError";

const INTERFACES: &[(&str, &[&str])] = &[
    (SERIALIZABLE, &[]),
    (CLONEABLE, &[]),
    (COMPARABLE, &[]),
    (CHAR_SEQUENCE, &[]),
];

// (class, superclass, interfaces); parents precede children
const CLASSES: &[(&str, Option<&str>, &[&str])] = &[
    (STRING, None, &[SERIALIZABLE, COMPARABLE, CHAR_SEQUENCE]),
    (THROWABLE, None, &[SERIALIZABLE]),
    (EXCEPTION, Some(THROWABLE), &[]),
    (ERROR, Some(THROWABLE), &[]),
    (RUNTIME_EXCEPTION, Some(EXCEPTION), &[]),
    (ARITHMETIC_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (NULL_POINTER_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (CLASS_CAST_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (ARRAY_STORE_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (NEGATIVE_ARRAY_SIZE_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (INDEX_OUT_OF_BOUNDS_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION, Some(INDEX_OUT_OF_BOUNDS_EXCEPTION), &[]),
    (ILLEGAL_ARGUMENT_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (ILLEGAL_STATE_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (UNSUPPORTED_OPERATION_EXCEPTION, Some(RUNTIME_EXCEPTION), &[]),
    (LINKAGE_ERROR, Some(ERROR), &[]),
    (INCOMPATIBLE_CLASS_CHANGE_ERROR, Some(LINKAGE_ERROR), &[]),
    (ABSTRACT_METHOD_ERROR, Some(INCOMPATIBLE_CLASS_CHANGE_ERROR), &[]),
    (VIRTUAL_MACHINE_ERROR, Some(ERROR), &[]),
    (STACK_OVERFLOW_ERROR, Some(VIRTUAL_MACHINE_ERROR), &[]),
];

pub(crate) fn register(builder: &mut TypeGraphBuilder) {
    for &(name, extends) in INTERFACES {
        if !builder.declares(name) {
            builder.interface(name, extends);
        }
    }
    for &(name, superclass, interfaces) in CLASSES {
        if !builder.declares(name) {
            builder.class(name, superclass, interfaces);
        }
    }
    builder.array(crate::ty::OBJECT_CLASS).array(STRING);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_lang_hierarchy() {
        let graph = TypeGraphBuilder::new().with_java_lang().build().unwrap();
        let throwable = graph.lookup(THROWABLE).unwrap();
        let aioobe = graph.lookup(ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION).unwrap();
        let soe = graph.lookup(STACK_OVERFLOW_ERROR).unwrap();
        let runtime = graph.lookup(RUNTIME_EXCEPTION).unwrap();

        assert!(graph.is_subclass_of(aioobe, throwable));
        assert!(graph.is_subclass_of(aioobe, runtime));
        assert!(graph.is_subclass_of(soe, throwable));
        assert!(!graph.is_subclass_of(soe, runtime));
        assert!(graph.lookup("java.lang.String[]").is_some());
    }

    #[test]
    fn test_user_declaration_wins() {
        let graph = TypeGraphBuilder::new()
            .class(STRING, None, &[])
            .with_java_lang()
            .build()
            .unwrap();
        let string = graph.lookup(STRING).unwrap();
        assert!(graph.get(string).unwrap().direct_interfaces().is_empty());
    }
}
