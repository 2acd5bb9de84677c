//! Arrays and bulk array copy
//!
//! The interpreter's heap owns array objects; the kernel reaches them
//! through [`ArrayStorage`]. [`ArrayArena`] is a plain map-backed storage
//! for embedders without a heap of their own (and for tests).

use crate::fault::Fault;
use crate::value::{ObjRef, Value};
use crate::{KernelError, KernelResult};
use javelin_types::{PrimitiveType, TypeDescriptor, TypeGraph, TypeId};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Array object: its array type, element type and elements
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    ty: TypeId,
    element: TypeId,
    primitive: Option<PrimitiveType>,
    elements: Vec<Value>,
}

impl Array {
    /// Allocate an array of type `ty` filled with the element default
    ///
    /// # Errors
    ///
    /// [`Fault::NegativeArraySize`] for a negative length;
    /// [`KernelError::InvalidState`] when `ty` is not an array type.
    pub fn new(graph: &TypeGraph, ty: TypeId, length: i32) -> KernelResult<Self> {
        let (element, primitive) = element_of(graph, ty)?;
        if length < 0 {
            return Err(Fault::NegativeArraySize { length }.into());
        }
        let fill = match primitive {
            Some(prim) => Value::default_for(prim),
            None => Value::null(),
        };
        Ok(Array {
            ty,
            element,
            primitive,
            elements: vec![fill; length as usize],
        })
    }

    /// Build an array from initial values, store-checking each one
    pub fn from_values(graph: &TypeGraph, ty: TypeId, values: Vec<Value>) -> KernelResult<Self> {
        let (element, primitive) = element_of(graph, ty)?;
        let array = Array {
            ty,
            element,
            primitive,
            elements: values,
        };
        for value in &array.elements {
            array.check_store(graph, *value)?;
        }
        Ok(array)
    }

    /// Array type
    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Element type
    #[inline]
    pub fn element_type(&self) -> TypeId {
        self.element
    }

    /// Element primitive type; `None` for reference arrays
    #[inline]
    pub fn primitive_element(&self) -> Option<PrimitiveType> {
        self.primitive
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check whether the array has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    fn index(&self, index: i32) -> Result<usize, Fault> {
        if index < 0 || index as usize >= self.elements.len() {
            return Err(Fault::index_out_of_bounds(format!(
                "Index {} out of bounds for length {}",
                index,
                self.elements.len()
            )));
        }
        Ok(index as usize)
    }

    /// Bounds-checked load
    pub fn get(&self, index: i32) -> Result<Value, Fault> {
        let i = self.index(index)?;
        Ok(self.elements[i])
    }

    /// Bounds- and store-checked store
    pub fn set(&mut self, graph: &TypeGraph, index: i32, value: Value) -> Result<(), Fault> {
        let i = self.index(index)?;
        self.check_store(graph, value)?;
        self.elements[i] = value;
        Ok(())
    }

    /// Check that `value` may be stored in this array
    ///
    /// Primitive arrays take exactly their element type. Reference arrays
    /// take null or an object whose dynamic type is assignable to the
    /// element type.
    pub fn check_store(&self, graph: &TypeGraph, value: Value) -> Result<(), Fault> {
        let ok = match (self.primitive, value) {
            (Some(prim), v) => v.primitive_type() == Some(prim),
            (None, Value::Reference(None)) => true,
            (None, Value::Reference(Some(r))) => graph.is_assignable_from(self.element, r.class()),
            (None, _) => false,
        };
        if ok {
            return Ok(());
        }
        let stored = match value.as_object() {
            Some(r) => graph.name(r.class()),
            None => value.type_name().to_string(),
        };
        Err(Fault::array_store(stored))
    }

    fn describe(&self, graph: &TypeGraph) -> String {
        describe(graph, self.primitive, self.element, self.elements.len())
    }
}

fn element_of(graph: &TypeGraph, ty: TypeId) -> KernelResult<(TypeId, Option<PrimitiveType>)> {
    let element = graph
        .get(ty)
        .and_then(TypeDescriptor::element_type)
        .ok_or_else(|| KernelError::invalid_state(format!("{} is not an array type", graph.name(ty))))?;
    let primitive = graph.get(element).and_then(TypeDescriptor::as_primitive);
    Ok((element, primitive))
}

fn describe(graph: &TypeGraph, primitive: Option<PrimitiveType>, element: TypeId, len: usize) -> String {
    match primitive {
        Some(_) => format!("{}[{}]", graph.name(element), len),
        None => format!("object array[{}]", len),
    }
}

/// Access to array objects by heap handle
pub trait ArrayStorage {
    /// Array behind `handle`, if the handle names an array
    fn array(&self, handle: u64) -> Option<&Array>;

    /// Mutable array behind `handle`
    fn array_mut(&mut self, handle: u64) -> Option<&mut Array>;
}

/// Map-backed [`ArrayStorage`]
#[derive(Debug, Default)]
pub struct ArrayArena {
    arrays: FxHashMap<u64, Array>,
    next_handle: u64,
}

impl ArrayArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a default-filled array and return a reference to it
    pub fn alloc(&mut self, graph: &TypeGraph, ty: TypeId, length: i32) -> KernelResult<Value> {
        let array = Array::new(graph, ty, length)?;
        Ok(self.insert(array))
    }

    /// Allocate an array holding `values`
    pub fn alloc_with(&mut self, graph: &TypeGraph, ty: TypeId, values: Vec<Value>) -> KernelResult<Value> {
        let array = Array::from_values(graph, ty, values)?;
        Ok(self.insert(array))
    }

    /// Take ownership of an array and return a reference to it
    pub fn insert(&mut self, array: Array) -> Value {
        self.next_handle += 1;
        let handle = self.next_handle;
        let ty = array.ty();
        self.arrays.insert(handle, array);
        Value::object(ObjRef::new(handle, ty))
    }

    /// Number of live arrays
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Check whether the arena holds no arrays
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Array behind a reference value
    pub fn get(&self, value: Value) -> Option<&Array> {
        value.as_object().and_then(|r| self.arrays.get(&r.handle()))
    }
}

impl ArrayStorage for ArrayArena {
    fn array(&self, handle: u64) -> Option<&Array> {
        self.arrays.get(&handle)
    }

    fn array_mut(&mut self, handle: u64) -> Option<&mut Array> {
        self.arrays.get_mut(&handle)
    }
}

fn require_array<'s, S: ArrayStorage + ?Sized>(
    storage: &'s S,
    graph: &TypeGraph,
    value: Value,
    role: &str,
) -> Result<(ObjRef, &'s Array), Fault> {
    let reference = match value {
        Value::Reference(None) => {
            return Err(Fault::null_reference(format!("{} array is null", role)));
        }
        Value::Reference(Some(r)) => r,
        other => {
            return Err(Fault::array_store(format!(
                "{} type {} is not an array",
                role,
                other.type_name()
            )));
        }
    };
    match storage.array(reference.handle()) {
        Some(array) => Ok((reference, array)),
        None => Err(Fault::array_store(format!(
            "{} type {} is not an array",
            role,
            graph.name(reference.class())
        ))),
    }
}

/// `arraylength`
pub fn array_length<S: ArrayStorage + ?Sized>(storage: &S, graph: &TypeGraph, array: Value) -> Result<i32, Fault> {
    let (_, array) = require_array(storage, graph, array, "target")?;
    Ok(array.len() as i32)
}

/// `xaload`
pub fn array_load<S: ArrayStorage + ?Sized>(
    storage: &S,
    graph: &TypeGraph,
    array: Value,
    index: i32,
) -> Result<Value, Fault> {
    let (_, array) = require_array(storage, graph, array, "target")?;
    array.get(index)
}

/// `xastore`
pub fn array_store<S: ArrayStorage + ?Sized>(
    storage: &mut S,
    graph: &TypeGraph,
    array: Value,
    index: i32,
    value: Value,
) -> Result<(), Fault> {
    let (reference, _) = require_array(storage, graph, array, "target")?;
    match storage.array_mut(reference.handle()) {
        Some(array) => array.set(graph, index, value),
        None => Err(Fault::array_store(graph.name(reference.class()))),
    }
}

/// Bulk copy (`System.arraycopy`)
///
/// Checks run in this order, and nothing is written unless all of them
/// pass:
///
/// 1. null source or destination: null-reference fault
/// 2. either operand not an array, or element kinds differ (distinct
///    primitive types, or primitive against reference): array-store fault
/// 3. negative position or length, or a range past the end:
///    index-out-of-bounds fault
///
/// A zero length then writes nothing. Otherwise the range is copied as if
/// through a temporary buffer, so overlapping ranges in one array are
/// safe in both directions. When reference element types are not
/// statically compatible each element is checked, and the copy stops at
/// the first one the destination cannot hold; the prefix before it stays
/// written.
pub fn array_copy<S: ArrayStorage + ?Sized>(
    storage: &mut S,
    graph: &TypeGraph,
    src: Value,
    src_pos: i32,
    dst: Value,
    dst_pos: i32,
    length: i32,
) -> Result<(), Fault> {
    if src.is_null() {
        return Err(Fault::null_reference("source array is null"));
    }
    if dst.is_null() {
        return Err(Fault::null_reference("destination array is null"));
    }

    let (src_ref, src_array) = require_array(storage, graph, src, "source")?;
    let (src_prim, src_elem, src_len) = (src_array.primitive, src_array.element, src_array.len());
    let src_desc = src_array.describe(graph);

    let (dst_ref, dst_array) = require_array(storage, graph, dst, "destination")?;
    let (dst_prim, dst_elem, dst_len) = (dst_array.primitive, dst_array.element, dst_array.len());
    let dst_desc = dst_array.describe(graph);

    let compatible = match (src_prim, dst_prim) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    };
    if !compatible {
        return Err(Fault::array_store(format!(
            "arraycopy: type mismatch: can not copy {}[] into {}[]",
            src_prim.map_or("object array", PrimitiveType::name),
            dst_prim.map_or("object array", PrimitiveType::name),
        )));
    }

    if src_pos < 0 {
        return Err(Fault::index_out_of_bounds(format!(
            "arraycopy: source index {} out of bounds for {}",
            src_pos, src_desc
        )));
    }
    if dst_pos < 0 {
        return Err(Fault::index_out_of_bounds(format!(
            "arraycopy: destination index {} out of bounds for {}",
            dst_pos, dst_desc
        )));
    }
    if length < 0 {
        return Err(Fault::index_out_of_bounds(format!(
            "arraycopy: length {} is negative",
            length
        )));
    }
    let src_end = src_pos as i64 + length as i64;
    if src_end > src_len as i64 {
        return Err(Fault::index_out_of_bounds(format!(
            "arraycopy: last source index {} out of bounds for {}",
            src_end, src_desc
        )));
    }
    let dst_end = dst_pos as i64 + length as i64;
    if dst_end > dst_len as i64 {
        return Err(Fault::index_out_of_bounds(format!(
            "arraycopy: last destination index {} out of bounds for {}",
            dst_end, dst_desc
        )));
    }

    if length == 0 {
        return Ok(());
    }

    let (src_pos, dst_pos, length) = (src_pos as usize, dst_pos as usize, length as usize);
    let buffer: Vec<Value> = match storage.array(src_ref.handle()) {
        Some(array) => array.elements[src_pos..src_pos + length].to_vec(),
        None => return Err(Fault::array_store(graph.name(src_ref.class()))),
    };
    let dst_array = match storage.array_mut(dst_ref.handle()) {
        Some(array) => array,
        None => return Err(Fault::array_store(graph.name(dst_ref.class()))),
    };

    let checked = src_prim.is_none() && !graph.is_assignable_from(dst_elem, src_elem);
    if !checked {
        dst_array.elements[dst_pos..dst_pos + length].copy_from_slice(&buffer);
        return Ok(());
    }

    for (offset, value) in buffer.into_iter().enumerate() {
        if let Some(r) = value.as_object() {
            if !graph.is_assignable_from(dst_elem, r.class()) {
                trace!(copied = offset, length, "arraycopy stopped at incompatible element");
                return Err(Fault::array_store(format!(
                    "arraycopy: element type mismatch: can not cast one of the elements of {}[] to the type of the destination array, {}",
                    graph.name(src_elem),
                    graph.name(dst_elem)
                )));
            }
        }
        dst_array.elements[dst_pos + offset] = value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::{java_lang, TypeGraphBuilder};

    fn graph() -> TypeGraph {
        TypeGraphBuilder::new()
            .with_java_lang()
            .array("int")
            .array("char")
            .array("boolean")
            .build()
            .unwrap()
    }

    fn ints(arena: &ArrayArena, value: Value) -> Vec<i32> {
        arena
            .get(value)
            .unwrap()
            .elements()
            .iter()
            .map(|v| v.as_int().unwrap())
            .collect()
    }

    #[test]
    fn test_alloc_defaults() {
        let graph = graph();
        let mut arena = ArrayArena::new();
        let int_array = graph.lookup("int[]").unwrap();
        let chars = graph.lookup("char[]").unwrap();
        let strings = graph.lookup("java.lang.String[]").unwrap();

        let a = arena.alloc(&graph, int_array, 3).unwrap();
        assert_eq!(ints(&arena, a), vec![0, 0, 0]);
        let c = arena.alloc(&graph, chars, 1).unwrap();
        assert_eq!(arena.get(c).unwrap().get(0), Ok(Value::Char(0)));
        let s = arena.alloc(&graph, strings, 2).unwrap();
        assert!(arena.get(s).unwrap().elements().iter().all(Value::is_null));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_negative_length() {
        let graph = graph();
        let err = Array::new(&graph, graph.lookup("int[]").unwrap(), -1).unwrap_err();
        assert_eq!(err, KernelError::Fault(Fault::NegativeArraySize { length: -1 }));
    }

    #[test]
    fn test_non_array_type() {
        let graph = graph();
        assert!(matches!(
            Array::new(&graph, graph.object(), 1),
            Err(KernelError::InvalidState(_))
        ));
    }

    #[test]
    fn test_bounds_checked_access() {
        let graph = graph();
        let mut array = Array::new(&graph, graph.lookup("int[]").unwrap(), 3).unwrap();
        let fault = array.get(5).unwrap_err();
        assert_eq!(fault.to_string(), "Index 5 out of bounds for length 3");
        assert!(array.get(-1).is_err());
        array.set(&graph, 2, Value::Int(9)).unwrap();
        assert_eq!(array.get(2), Ok(Value::Int(9)));
    }

    #[test]
    fn test_primitive_store_requires_exact_type() {
        let graph = graph();
        let mut array = Array::new(&graph, graph.lookup("int[]").unwrap(), 1).unwrap();
        assert!(array.set(&graph, 0, Value::Short(1)).is_err());
        let mut flags = Array::new(&graph, graph.lookup("boolean[]").unwrap(), 1).unwrap();
        flags.set(&graph, 0, Value::Boolean(true)).unwrap();
    }

    #[test]
    fn test_reference_store_check() {
        let graph = graph();
        let string = graph.lookup(java_lang::STRING).unwrap();
        let throwable = graph.lookup(java_lang::THROWABLE).unwrap();
        let mut array = Array::new(&graph, graph.lookup("java.lang.String[]").unwrap(), 2).unwrap();

        array.set(&graph, 0, Value::object(ObjRef::new(1, string))).unwrap();
        array.set(&graph, 1, Value::null()).unwrap();
        let fault = array.set(&graph, 1, Value::object(ObjRef::new(2, throwable))).unwrap_err();
        assert_eq!(fault, Fault::array_store(java_lang::THROWABLE));
    }

    #[test]
    fn test_length_and_load_through_references() {
        let graph = graph();
        let mut arena = ArrayArena::new();
        let a = arena
            .alloc_with(&graph, graph.lookup("int[]").unwrap(), vec![Value::Int(4), Value::Int(5)])
            .unwrap();
        assert_eq!(array_length(&arena, &graph, a), Ok(2));
        assert_eq!(array_load(&arena, &graph, a, 1), Ok(Value::Int(5)));
        array_store(&mut arena, &graph, a, 0, Value::Int(7)).unwrap();
        assert_eq!(ints(&arena, a), vec![7, 5]);
        assert!(matches!(
            array_length(&arena, &graph, Value::null()),
            Err(Fault::NullReference { .. })
        ));
    }

    #[test]
    fn test_copy_between_arrays() {
        let graph = graph();
        let mut arena = ArrayArena::new();
        let ty = graph.lookup("int[]").unwrap();
        let src = arena
            .alloc_with(&graph, ty, (1..=5).map(Value::Int).collect())
            .unwrap();
        let dst = arena.alloc(&graph, ty, 5).unwrap();
        array_copy(&mut arena, &graph, src, 1, dst, 0, 3).unwrap();
        assert_eq!(ints(&arena, dst), vec![2, 3, 4, 0, 0]);
    }

    #[test]
    fn test_copy_kind_mismatch() {
        let graph = graph();
        let mut arena = ArrayArena::new();
        let a = arena.alloc(&graph, graph.lookup("int[]").unwrap(), 2).unwrap();
        let c = arena.alloc(&graph, graph.lookup("char[]").unwrap(), 2).unwrap();
        let fault = array_copy(&mut arena, &graph, a, 0, c, 0, 1).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "arraycopy: type mismatch: can not copy int[] into char[]"
        );
    }
}
