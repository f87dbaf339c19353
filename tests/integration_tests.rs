//! Integration tests for end-to-end checking.
//!
//! These tests feed program text through the reader and the checker. Each
//! program's top-level forms are checked in the global scope, so declarations
//! made by one `check_source` call are visible to the next on the same checker.

use lispcheck::{
    errors::errors::ErrorImpl,
    parser::parser::parse_program,
    type_checker::type_checker::{type_check, TypeChecker, TypeCheckerOptions},
};

fn assert_type(type_checker: &mut TypeChecker, source: &str, expected: &str) {
    let actual = type_checker.check_source(source).unwrap_or_else(|error| {
        panic!(
            "Checking {:?} failed: {} ({:?})",
            source,
            error,
            error.get_expression()
        )
    });
    let expected_type = type_checker.from_string(expected).unwrap();
    assert!(
        type_checker.types.equals(actual, expected_type),
        "Expected `{}`, got `{}` for {:?}",
        expected,
        type_checker.type_name(actual),
        source
    );
}

fn assert_type_name(type_checker: &mut TypeChecker, source: &str, expected: &str) {
    let actual = type_checker.check_source(source).unwrap();
    assert_eq!(type_checker.type_name(actual), expected, "for {:?}", source);
}

fn error_of(type_checker: &mut TypeChecker, source: &str) -> ErrorImpl {
    type_checker
        .check_source(source)
        .expect_err("program should not type check")
        .get_impl()
        .clone()
}

fn mismatch(expected: &str, received: &str) -> ErrorImpl {
    ErrorImpl::TypeMismatch {
        expected: expected.to_string(),
        received: received.to_string(),
    }
}

#[test]
fn test_self_evaluating() {
    let mut type_checker = TypeChecker::new();
    assert_type(&mut type_checker, "42", "number");
    assert_type(&mut type_checker, "-3.5", "number");
    assert_type(&mut type_checker, "\"hello\"", "string");
    assert_type(&mut type_checker, "true", "boolean");
    assert_type(&mut type_checker, "false", "boolean");
}

#[test]
fn test_math() {
    let mut type_checker = TypeChecker::new();
    assert_type(&mut type_checker, "(+ 2 3)", "number");
    assert_type(&mut type_checker, "(- 1 5)", "number");
    assert_type(&mut type_checker, "(* 4 2)", "number");
    assert_type(&mut type_checker, "(/ 4 2)", "number");
    assert_type(&mut type_checker, "(+ (* 2 3) (- 10 4))", "number");
    assert_type(&mut type_checker, "(+ \"a\" \"b\")", "string");

    assert_eq!(error_of(&mut type_checker, "(+ 1 \"a\")"), mismatch("number", "string"));
    assert_eq!(error_of(&mut type_checker, "(- \"a\" \"b\")"), mismatch("number", "string"));
    assert_eq!(error_of(&mut type_checker, "(+ true false)"), mismatch("string | number", "boolean"));
}

#[test]
fn test_variables() {
    let mut type_checker = TypeChecker::new();
    assert_type(&mut type_checker, "(var x 10)", "number");
    assert_type(&mut type_checker, "(var (y number) 100)", "number");
    assert_type(&mut type_checker, "(var (name string) \"lisp\")", "string");
    assert_type(&mut type_checker, "x", "number");
    assert_type(&mut type_checker, "(+ x y)", "number");
    assert_type(&mut type_checker, "VERSION", "string");
    assert_type(&mut type_checker, "(set x 20)", "number");

    assert_eq!(
        error_of(&mut type_checker, "(var (z number) \"a\")"),
        mismatch("number", "string")
    );
    assert_eq!(error_of(&mut type_checker, "(set x \"a\")"), mismatch("number", "string"));
    assert_eq!(
        error_of(&mut type_checker, "(+ x unknown)"),
        ErrorImpl::UnresolvedReference {
            name: "unknown".to_string()
        }
    );
}

#[test]
fn test_blocks() {
    let mut type_checker = TypeChecker::new();
    assert_type(
        &mut type_checker,
        "(begin
           (var x 10)
           (var y 20)
           (+ (* x 10) y))",
        "number",
    );

    // The inner block shadows `x`; the outer binding is untouched.
    assert_type(
        &mut type_checker,
        "(var x 10)
         (begin
           (var x \"hello\")
           (+ x \"world\"))
         (- x 5)",
        "number",
    );

    // Blocks see and assign the enclosing scope.
    assert_type(
        &mut type_checker,
        "(var data 10)
         (begin
           (set data 100))
         data",
        "number",
    );

    assert_type(&mut type_checker, "(begin (var inner 1) inner)", "number");
    assert_eq!(
        error_of(&mut type_checker, "inner"),
        ErrorImpl::UnresolvedReference {
            name: "inner".to_string()
        }
    );
}

#[test]
fn test_if() {
    let mut type_checker = TypeChecker::new();
    assert_type(
        &mut type_checker,
        "(var x 10)
         (var y 0)
         (if (<= x 10)
           (set y 20)
           (set y 30))",
        "number",
    );

    assert_eq!(
        error_of(&mut type_checker, "(if x 1 2)"),
        mismatch("boolean", "number")
    );
    assert_eq!(
        error_of(&mut type_checker, "(if (== x 10) \"a\" 1)"),
        mismatch("string", "number")
    );
    assert_eq!(
        error_of(&mut type_checker, "(if (== x 10) 1)"),
        ErrorImpl::ArityMismatch {
            construct: "if".to_string(),
            expected: 3,
            received: 2
        }
    );
}

#[test]
fn test_while() {
    let mut type_checker = TypeChecker::new();
    assert_type(
        &mut type_checker,
        "(var x 10)
         (var i 0)
         (while (< i 10)
           (begin
             (set i (+ i 1))
             (set x (* x 2))))
         x",
        "number",
    );

    assert_eq!(
        error_of(&mut type_checker, "(while 1 (set x 2))"),
        mismatch("boolean", "number")
    );
}

#[test]
fn test_user_defined_functions() {
    let mut type_checker = TypeChecker::new();
    assert_type_name(
        &mut type_checker,
        "(def calc ((x number) (y number)) -> number
           (begin
             (var z 30)
             (+ (* x y) z)))",
        "Fn<number<number,number>>",
    );
    assert_type(&mut type_checker, "(calc 10 20)", "number");

    assert_eq!(
        error_of(&mut type_checker, "(calc 10)"),
        ErrorImpl::ArityMismatch {
            construct: "calc".to_string(),
            expected: 2,
            received: 1
        }
    );
    assert_eq!(
        error_of(&mut type_checker, "(calc 10 \"20\")"),
        mismatch("number", "string")
    );
    assert_eq!(
        error_of(&mut type_checker, "(def bad ((x number)) -> string x)"),
        mismatch("string", "number")
    );
}

#[test]
fn test_closures() {
    let mut type_checker = TypeChecker::new();
    assert_type(
        &mut type_checker,
        "(var value 100)
         (def calc ((x number) (y number)) -> Fn<number<number>>
           (begin
             (var z (+ x y))
             (def inner ((foo number)) -> number
               (+ (+ foo z) value))
             inner))
         (var fn (calc 10 20))
         (fn 30)",
        "number",
    );
}

#[test]
fn test_recursive_function() {
    let mut type_checker = TypeChecker::new();
    assert_type_name(
        &mut type_checker,
        "(def factorial ((x number)) -> number
           (if (== x 1)
             1
             (* x (factorial (- x 1)))))",
        "Fn<number<number>>",
    );
    assert_type(&mut type_checker, "(factorial 5)", "number");
}

#[test]
fn test_builtin_functions() {
    let mut type_checker = TypeChecker::new();
    assert_type(&mut type_checker, "(sum 1 5)", "number");
    assert_type(&mut type_checker, "(square 2)", "number");
    assert_type(&mut type_checker, "(concat \"a\" \"b\")", "string");
    assert_type(&mut type_checker, "(print 1)", "string");
    assert_type(&mut type_checker, "(print (concat \"a\" \"b\"))", "string");

    assert_eq!(error_of(&mut type_checker, "(sum 1 \"5\")"), mismatch("number", "string"));
    assert_eq!(
        error_of(&mut type_checker, "(square 1 2)"),
        ErrorImpl::ArityMismatch {
            construct: "square".to_string(),
            expected: 1,
            received: 2
        }
    );
}

#[test]
fn test_without_builtins() {
    let program = parse_program("(sum 1 2)", Some("main.lisp".to_string())).unwrap();
    let (_, result) = type_check(
        &program,
        TypeCheckerOptions {
            include_builtins: false,
        },
    );
    assert_eq!(
        result.unwrap_err().get_impl(),
        &ErrorImpl::UnresolvedReference {
            name: "sum".to_string()
        }
    );

    let (type_checker, result) = type_check(&program, TypeCheckerOptions::default());
    assert_eq!(type_checker.type_name(result.unwrap()), "number");
}

#[test]
fn test_lambdas() {
    let mut type_checker = TypeChecker::new();
    assert_type(
        &mut type_checker,
        "(def onClick ((callback Fn<number<number>>)) -> number
           (begin
             (var x 10)
             (var y 20)
             (callback (+ x y))))
         (onClick (lambda ((data number)) -> number (* data 10)))",
        "number",
    );

    assert_type(
        &mut type_checker,
        "((lambda ((x number)) -> number (* x x)) 2)",
        "number",
    );
    assert_type_name(
        &mut type_checker,
        "(var double (lambda ((x number)) -> number (* x 2)))",
        "Fn<number<number>>",
    );
    assert_type(&mut type_checker, "(onClick double)", "number");

    assert_eq!(
        error_of(
            &mut type_checker,
            "(onClick (lambda ((data string)) -> number 1))"
        ),
        mismatch("Fn<number<number>>", "Fn<number<string>>")
    );
}

#[test]
fn test_type_aliases() {
    let mut type_checker = TypeChecker::new();
    assert_type_name(&mut type_checker, "(type int number)", "int");
    assert_type_name(&mut type_checker, "(type ID int)", "ID");
    assert_type_name(&mut type_checker, "(type Index ID)", "Index");

    assert_type_name(
        &mut type_checker,
        "(def square ((x int)) -> int (* x x))
         (square 2)",
        "int",
    );
    assert_type_name(
        &mut type_checker,
        "(def promote ((userId ID)) -> ID (+ 1 userId))
         (promote 1)",
        "ID",
    );
    assert_type_name(&mut type_checker, "(var (i Index) 1)", "Index");
    assert_type(&mut type_checker, "(+ i 1)", "number");

    assert_eq!(
        error_of(&mut type_checker, "(type int string)"),
        ErrorImpl::Redeclaration {
            name: "int".to_string()
        }
    );
    assert_eq!(
        error_of(&mut type_checker, "(type real float)"),
        ErrorImpl::UnknownType {
            type_: "float".to_string()
        }
    );
}

const POINT: &str = "
(class Point null
  (begin
    (var (x number) 0)
    (var (y number) 0)

    (def constructor ((self Point) (x number) (y number)) -> Point
      (begin
        (set (prop self x) x)
        (set (prop self y) y)
        self))

    (def calc ((self Point)) -> number
      (+ (prop self x) (prop self y)))))
";

const POINT_3D: &str = "
(class Point3D Point
  (begin
    (var (z number) 0)

    (def constructor ((self Point3D) (x number) (y number) (z number)) -> Point3D
      (begin
        ((prop (super Point3D) constructor) self x y)
        (set (prop self z) z)
        self))

    (def calc ((self Point3D)) -> number
      (+ ((prop (super Point3D) calc) self) (prop self z)))))
";

#[test]
fn test_classes() {
    let mut type_checker = TypeChecker::new();
    assert_type_name(&mut type_checker, POINT, "Point");

    assert_type_name(&mut type_checker, "(var p (new Point 10 20))", "Point");
    assert_type(&mut type_checker, "((prop p calc) p)", "number");
    assert_type(&mut type_checker, "(prop p x)", "number");
    assert_type(&mut type_checker, "(set (prop p y) 5)", "number");

    assert_eq!(
        error_of(&mut type_checker, "(prop p z)"),
        ErrorImpl::UnresolvedReference {
            name: "Point.z".to_string()
        }
    );
    assert_eq!(
        error_of(&mut type_checker, "(set (prop p x) \"a\")"),
        mismatch("number", "string")
    );
    assert_eq!(
        error_of(&mut type_checker, "(new Point 10)"),
        ErrorImpl::ArityMismatch {
            construct: "constructor".to_string(),
            expected: 3,
            received: 2
        }
    );
    assert_eq!(
        error_of(&mut type_checker, "(new Missing 1)"),
        ErrorImpl::UnresolvedReference {
            name: "Missing".to_string()
        }
    );
    assert_eq!(
        error_of(&mut type_checker, "(class Point null (begin (var (w number) 0)))"),
        ErrorImpl::Redeclaration {
            name: "Point".to_string()
        }
    );
}

#[test]
fn test_class_fields_are_not_global() {
    let mut type_checker = TypeChecker::new();
    type_checker.check_source(POINT).unwrap();
    assert_eq!(
        error_of(&mut type_checker, "calc"),
        ErrorImpl::UnresolvedReference {
            name: "calc".to_string()
        }
    );
}

#[test]
fn test_inheritance() {
    let mut type_checker = TypeChecker::new();
    type_checker.check_source(POINT).unwrap();
    assert_type_name(&mut type_checker, POINT_3D, "Point3D");

    assert_type_name(&mut type_checker, "(var p (new Point3D 10 20 30))", "Point3D");
    assert_type(&mut type_checker, "((prop p calc) p)", "number");
    // Inherited from Point.
    assert_type(&mut type_checker, "(prop p x)", "number");
    assert_type_name(&mut type_checker, "(super Point3D)", "Point");

    assert_eq!(
        error_of(&mut type_checker, "(super Point)"),
        ErrorImpl::UnresolvedReference {
            name: "Point.super".to_string()
        }
    );
    // A plain Point is not a Point3D.
    assert_eq!(
        error_of(&mut type_checker, "((prop p calc) (new Point 1 2))"),
        mismatch("Point3D", "Point")
    );
}

#[test]
fn test_unions_and_narrowing() {
    let mut type_checker = TypeChecker::new();
    assert_type_name(&mut type_checker, "(type value (or number string))", "value");
    assert_type_name(&mut type_checker, "(var (x value) 10)", "value");

    assert_type(&mut type_checker, "(typeof x)", "string");
    assert_type(
        &mut type_checker,
        "(if (== (typeof x) \"number\")
           (- x 1)
           0)",
        "number",
    );
    assert_type(
        &mut type_checker,
        "(if (== (typeof x) \"string\")
           (concat x \"!\")
           \"n/a\")",
        "string",
    );

    // `+` accepts every member of the union.
    assert_type_name(&mut type_checker, "(+ x x)", "value");
    assert_type(&mut type_checker, "(set x \"ten\")", "value");

    assert_eq!(error_of(&mut type_checker, "(- x 1)"), mismatch("number", "value"));
    assert_eq!(
        error_of(&mut type_checker, "(var (flag value) true)"),
        mismatch("value", "boolean")
    );
}

#[test]
fn test_alias_of_union_keeps_operator_rules() {
    let mut type_checker = TypeChecker::new();
    type_checker
        .check_source("(type value (or number string)) (type V value) (var (v V) \"s\")")
        .unwrap();

    assert_eq!(error_of(&mut type_checker, "(- v 1)"), mismatch("number", "V"));
    assert_type_name(&mut type_checker, "(+ v v)", "V");
}

#[test]
fn test_generic_self_call_is_rejected() {
    let mut type_checker = TypeChecker::new();
    type_checker
        .check_source("(def f <K> ((x K)) -> K (f <number> x))")
        .unwrap();

    assert_eq!(
        error_of(&mut type_checker, "(f <number> 1)"),
        ErrorImpl::UnresolvedReference {
            name: "f".to_string()
        }
    );
    // The failed instantiation does not block later ones.
    type_checker
        .check_source("(def id <K> ((x K)) -> K x)")
        .unwrap();
    assert_type(&mut type_checker, "(id <number> (id <number> 1))", "number");
}

#[test]
fn test_generic_method_outlives_declaring_block() {
    let mut type_checker = TypeChecker::new();
    assert_type(
        &mut type_checker,
        "(begin
           (class C null
             (begin
               (def constructor ((self C)) -> C self)
               (def h <K> ((x K)) -> number (sum 1 2))))
           1)
         (var c (new C))
         ((prop c h) <number> 1)",
        "number",
    );
}

#[test]
fn test_generic_functions() {
    let mut type_checker = TypeChecker::new();
    assert_type_name(
        &mut type_checker,
        "(def combine <K> ((x K) (y K)) -> K (+ x y))",
        "<K>Fn<K<K,K>>",
    );
    assert_type(&mut type_checker, "(combine <number> 2 3)", "number");
    assert_type(&mut type_checker, "(combine <string> \"a\" \"b\")", "string");

    assert_eq!(
        error_of(&mut type_checker, "(combine <number> 2 \"3\")"),
        mismatch("number", "string")
    );
    assert_eq!(
        error_of(&mut type_checker, "(combine 2 3)"),
        ErrorImpl::ArityMismatch {
            construct: "type arguments of combine".to_string(),
            expected: 1,
            received: 0
        }
    );
    assert_eq!(
        error_of(&mut type_checker, "(combine <number,string> 2 3)"),
        ErrorImpl::ArityMismatch {
            construct: "type arguments".to_string(),
            expected: 1,
            received: 2
        }
    );
}

#[test]
fn test_generic_body_checked_per_instantiation() {
    let mut type_checker = TypeChecker::new();
    type_checker
        .check_source("(def twice <T> ((x T)) -> T (* x 2))")
        .unwrap();
    assert_type(&mut type_checker, "(twice <number> 2)", "number");
    assert_eq!(
        error_of(&mut type_checker, "(twice <string> \"a\")"),
        mismatch("number", "string")
    );

    assert_type(
        &mut type_checker,
        "((lambda <K> ((x K)) -> K (+ x x)) <string> \"a\")",
        "string",
    );
}

#[test]
fn test_reader_errors() {
    let mut type_checker = TypeChecker::new();

    let error = type_checker.check_source("(+ 1 2").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedToken");
    assert!(error.get_position().is_some());

    let error = type_checker.check_source("(var s \"abc").unwrap_err();
    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().unwrap().0, 7);

    assert_eq!(
        error_of(&mut type_checker, "(var x @)"),
        ErrorImpl::UnknownExpression
    );
}

#[test]
fn test_failed_declarations_are_rolled_back() {
    let mut type_checker = TypeChecker::new();

    assert_eq!(
        error_of(&mut type_checker, "(def f ((x number)) -> string x)"),
        mismatch("string", "number")
    );
    assert_eq!(
        error_of(&mut type_checker, "(f 1)"),
        ErrorImpl::UnresolvedReference {
            name: "f".to_string()
        }
    );

    // A failed redefinition restores the earlier binding.
    assert!(type_checker
        .check_source("(def square ((x number)) -> string x)")
        .is_err());
    assert_type(&mut type_checker, "(square 2)", "number");

    assert_eq!(
        error_of(&mut type_checker, "(class Bad null (begin (var (x number) \"s\")))"),
        mismatch("number", "string")
    );
    assert_eq!(
        error_of(&mut type_checker, "(new Bad)"),
        ErrorImpl::UnresolvedReference {
            name: "Bad".to_string()
        }
    );
    assert_type_name(
        &mut type_checker,
        "(class Bad null (begin (var (x number) 0)))",
        "Bad",
    );
}
