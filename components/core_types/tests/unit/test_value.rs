//! Unit tests for the Value enum

use core_types::{NativeDecimal, NativeInteger, ObjHandle, Value};

#[cfg(test)]
mod value_equality_tests {
    use super::*;

    #[test]
    fn test_integer_equality() {
        assert!(Value::Integer(1).equals(&Value::Integer(1)));
        assert!(!Value::Integer(1).equals(&Value::Integer(2)));
    }

    #[test]
    fn test_integer_and_decimal_are_not_equal() {
        // Numeric coercion is a SortaEqual rule, not an Equal rule.
        assert!(!Value::Integer(1).equals(&Value::Decimal(1.0)));
    }

    #[test]
    fn test_linked_integer_equals_plain_with_same_value() {
        for v in [-7, 0, 1, 42, i32::MAX] {
            let field = NativeInteger::new(v);
            assert_eq!(field.link(), Value::Integer(v));
        }
    }

    #[test]
    fn test_linked_integer_differs_from_other_value() {
        let field = NativeInteger::new(10);
        assert_ne!(field.link(), Value::Integer(11));
    }

    #[test]
    fn test_linked_decimal_follows_native_writes() {
        let field = NativeDecimal::new(0.5);
        let linked = field.link();
        field.set(8.0);
        assert_eq!(linked, Value::Decimal(8.0));
    }

    #[test]
    fn test_object_identity() {
        let a = Value::Object(ObjHandle::new(3, 1));
        let b = Value::Object(ObjHandle::new(3, 2));
        assert_ne!(a, b);
        assert_eq!(a, Value::Object(ObjHandle::new(3, 1)));
    }

    #[test]
    fn test_null_equals_only_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Integer(0));
    }
}

#[cfg(test)]
mod value_cast_tests {
    use super::*;

    #[test]
    fn test_cast_reads_through_links() {
        let field = NativeDecimal::new(7.75);
        assert_eq!(field.link().cast_as_integer(), Some(7));
        let field = NativeInteger::new(-2);
        assert_eq!(field.link().cast_as_decimal(), Some(-2.0));
    }

    #[test]
    fn test_cast_failure_is_distinct_from_null() {
        assert_eq!(Value::Null.cast_as_integer(), None);
        assert_eq!(Value::Integer(0).cast_as_integer(), Some(0));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "Null");
        assert_eq!(NativeInteger::new(0).link().type_name(), "Linked Integer");
        assert_eq!(NativeDecimal::new(0.0).link().type_name(), "Linked Decimal");
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from(false), Value::Integer(0));
    }
}
