//! Reference type tests (`instanceof`, `checkcast`)

use crate::fault::Fault;
use crate::value::Value;
use javelin_types::{TypeGraph, TypeId};

/// `value instanceof target`
///
/// Null is an instance of nothing. Primitive values only match their own
/// primitive type.
pub fn instance_of(graph: &TypeGraph, value: Value, target: TypeId) -> bool {
    match value {
        Value::Reference(None) => false,
        Value::Reference(Some(r)) => graph.is_assignable_from(target, r.class()),
        other => other
            .primitive_type()
            .is_some_and(|prim| graph.primitive(prim) == target),
    }
}

/// `(target) value`
///
/// Null passes every reference cast unchanged.
///
/// # Errors
///
/// [`Fault::ClassCast`] when the dynamic type is not assignable to `target`.
pub fn check_cast(graph: &TypeGraph, value: Value, target: TypeId) -> Result<Value, Fault> {
    if value.is_null() || instance_of(graph, value, target) {
        return Ok(value);
    }
    let from = match value.as_object() {
        Some(r) => graph.name(r.class()),
        None => value.type_name().to_string(),
    };
    Err(Fault::ClassCast {
        from,
        to: graph.name(target),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjRef;
    use javelin_types::{java_lang, PrimitiveType, TypeGraphBuilder};

    fn graph() -> TypeGraph {
        TypeGraphBuilder::new()
            .with_java_lang()
            .interface("Shape", &[])
            .class("Circle", None, &["Shape"])
            .class("Square", None, &["Shape"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_null_is_instance_of_nothing() {
        let graph = graph();
        assert!(!instance_of(&graph, Value::null(), graph.object()));
        assert_eq!(check_cast(&graph, Value::null(), graph.lookup("Circle").unwrap()), Ok(Value::null()));
    }

    #[test]
    fn test_dynamic_type_decides() {
        let graph = graph();
        let circle = graph.lookup("Circle").unwrap();
        let shape = graph.lookup("Shape").unwrap();
        let value = Value::object(ObjRef::new(1, circle));
        assert!(instance_of(&graph, value, shape));
        assert!(instance_of(&graph, value, graph.object()));
        assert!(!instance_of(&graph, value, graph.lookup("Square").unwrap()));
    }

    #[test]
    fn test_failed_cast_names_both_classes() {
        let graph = graph();
        let circle = graph.lookup("Circle").unwrap();
        let value = Value::object(ObjRef::new(1, circle));
        let fault = check_cast(&graph, value, graph.lookup(java_lang::STRING).unwrap()).unwrap_err();
        assert_eq!(fault.to_string(), "class Circle cannot be cast to class java.lang.String");
        assert_eq!(fault.exception_class(), java_lang::CLASS_CAST_EXCEPTION);
    }

    #[test]
    fn test_primitives_match_only_themselves() {
        let graph = graph();
        let int = graph.primitive(PrimitiveType::Int);
        assert!(instance_of(&graph, Value::Int(3), int));
        assert!(!instance_of(&graph, Value::Short(3), int));
        assert!(!instance_of(&graph, Value::Int(3), graph.object()));
    }
}
