//! End-to-end type inference tests: full programs through `analyze`.

use esinfer_core::ast::{
    AssignmentOperator, AstBuilder, BinaryOperator, NodeId, UpdateOperator,
};
use esinfer_core::error::TypeError;
use esinfer_core::{analyze, Analysis};

fn assert_type(analysis: &Analysis, name: &str, expected: &str) {
    let report = analysis.exit_report();
    assert_eq!(
        report.type_of(name),
        Some(expected),
        "expected {name} : {expected}, report: {report:?}"
    );
}

#[test]
fn test_null_widens_to_number_after_reassignment() {
    // let age = null; age = 10;
    let mut b = AstBuilder::new();
    let null = b.null();
    let decl = b.let_declaration("age", Some(null));
    let age = b.identifier("age");
    let ten = b.number(10.0);
    let assign = b.assignment(AssignmentOperator::Assign, age, ten);
    let stmt = b.expression_statement(assign);
    let program = b.program(vec![decl, stmt]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    // Reassignment replaces the type; no merge happened, so no Maybe.
    assert_type(&analysis, "age", "number");
}

#[test]
fn test_conditional_reassignment_keeps_maybe() {
    // let age = null; if (c) { age = 10; } age;
    let mut b = AstBuilder::new();
    let bool_true = b.boolean(true);
    let cond_decl = b.let_declaration("c", Some(bool_true));
    let null = b.null();
    let decl = b.let_declaration("age", Some(null));
    let c = b.identifier("c");
    let age1 = b.identifier("age");
    let ten = b.number(10.0);
    let assign = b.assignment(AssignmentOperator::Assign, age1, ten);
    let then_stmt = b.expression_statement(assign);
    let then_block = b.block(vec![then_stmt]);
    let if_stmt = b.if_statement(c, then_block, None);
    let age2 = b.identifier("age");
    let after = b.expression_statement(age2);
    let program = b.program(vec![cond_decl, decl, if_stmt, after]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    // The branches merge null with number.
    assert_type(&analysis, "age", "Maybe<number>");
}

#[test]
fn test_loop_fixpoint_types_the_variable_after_the_loop() {
    // let x = 1; while (x > 0) { --x; } let y = x * 2;
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let x_decl = b.let_declaration("x", Some(one));

    let x1 = b.identifier("x");
    let zero = b.number(0.0);
    let test = b.binary(BinaryOperator::Gt, x1, zero);
    let x2 = b.identifier("x");
    let dec = b.update(UpdateOperator::Decrement, true, x2);
    let body_stmt = b.expression_statement(dec);
    let body = b.block(vec![body_stmt]);
    let while_stmt = b.while_statement(test, body);

    let x3 = b.identifier("x");
    let two = b.number(2.0);
    let product = b.binary(BinaryOperator::Mul, x3, two);
    let y_decl = b.let_declaration("y", Some(product));

    let program = b.program(vec![x_decl, while_stmt, y_decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "x", "number");
    assert_type(&analysis, "y", "number");
}

#[test]
fn test_function_returned_as_value_and_applied() {
    // function id(x) { return x; } const ten = id(id)(10);
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let ret = b.return_statement(Some(x));
    let body = b.block(vec![ret]);
    let id_fn = b.function_declaration("id", vec!["x"], body);

    let id1 = b.identifier("id");
    let id2 = b.identifier("id");
    let inner = b.call(id1, vec![id2]);
    let ten = b.number(10.0);
    let outer = b.call(inner, vec![ten]);
    let ten_id = b.identifier("ten");
    let declarator = b.declarator(ten_id, Some(outer));
    let decl = b.variable_declaration(esinfer_core::ast::DeclarationKind::Const, vec![declarator]);

    let program = b.program(vec![id_fn, decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "ten", "number");
}

#[test]
fn test_recursion_is_bounded() {
    // function f(x) { return f([x]); } let r = f(1);
    // Every recursive call wraps the argument in another array, so no two
    // invocations ever match and only the depth cap stops the unfolding.
    let mut b = AstBuilder::new();
    let f_ref = b.identifier("f");
    let x = b.identifier("x");
    let wrapped = b.array(vec![x]);
    let recursive = b.call(f_ref, vec![wrapped]);
    let ret = b.return_statement(Some(recursive));
    let body = b.block(vec![ret]);
    let f = b.function_declaration("f", vec!["x"], body);

    let f2 = b.identifier("f");
    let one = b.number(1.0);
    let call = b.call(f2, vec![one]);
    let r_decl = b.let_declaration("r", Some(call));

    let program = b.program(vec![f, r_decl]);
    let ast = b.finish(program);

    // Termination is the point; the imprecise result widens to any.
    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "r", "any");
}

#[test]
fn test_callee_member_mutations_propagate_to_the_caller() {
    // function setName(x, name) { x.name = name; }
    // let p = {}; setName(p, "Test");
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let member = b.member(x, "name");
    let name_ref = b.identifier("name");
    let assign = b.assignment(AssignmentOperator::Assign, member, name_ref);
    let stmt = b.expression_statement(assign);
    let body = b.block(vec![stmt]);
    let set_name = b.function_declaration("setName", vec!["x", "name"], body);

    let empty = b.object(vec![]);
    let p_decl = b.let_declaration("p", Some(empty));

    let callee = b.identifier("setName");
    let p_ref = b.identifier("p");
    let test_str = b.string("Test");
    let call = b.call(callee, vec![p_ref, test_str]);
    let call_stmt = b.expression_statement(call);

    let program = b.program(vec![set_name, p_decl, call_stmt]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "p", "{name: string}");
}

#[test]
fn test_closure_reassignment_is_observed_by_the_caller() {
    // let s = null; function init() { s = "ready"; } init();
    let mut b = AstBuilder::new();
    let null = b.null();
    let s_decl = b.let_declaration("s", Some(null));

    let s_ref = b.identifier("s");
    let ready = b.string("ready");
    let assign = b.assignment(AssignmentOperator::Assign, s_ref, ready);
    let stmt = b.expression_statement(assign);
    let body = b.block(vec![stmt]);
    let init = b.function_declaration("init", vec![], body);

    let callee = b.identifier("init");
    let call = b.call(callee, vec![]);
    let call_stmt = b.expression_statement(call);

    let program = b.program(vec![s_decl, init, call_stmt]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "s", "string");
}

#[test]
fn test_callback_inference_through_array_filter() {
    // let evens = [1, 2, 3].filter(x => x % 2 === 0);
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let two = b.number(2.0);
    let three = b.number(3.0);
    let array = b.array(vec![one, two, three]);
    let filter = b.member(array, "filter");

    let x = b.identifier("x");
    let divisor = b.number(2.0);
    let rem = b.binary(BinaryOperator::Rem, x, divisor);
    let zero = b.number(0.0);
    let cmp = b.binary(BinaryOperator::StrictEq, rem, zero);
    let callback = b.arrow_function(vec!["x"], cmp, true);

    let call = b.call(filter, vec![callback]);
    let decl = b.let_declaration("evens", Some(call));
    let program = b.program(vec![decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "evens", "number[]");
}

#[test]
fn test_callback_return_type_flows_through_array_map() {
    // let doubled = [1, 2].map(x => x * 2);
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let two = b.number(2.0);
    let array = b.array(vec![one, two]);
    let map = b.member(array, "map");

    let x = b.identifier("x");
    let factor = b.number(2.0);
    let product = b.binary(BinaryOperator::Mul, x, factor);
    let callback = b.arrow_function(vec!["x"], product, true);

    let call = b.call(map, vec![callback]);
    let decl = b.let_declaration("doubled", Some(call));
    let program = b.program(vec![decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "doubled", "number[]");
}

#[test]
fn test_calling_a_builtin_global() {
    // console.log("hello");
    let mut b = AstBuilder::new();
    let console = b.identifier("console");
    let log = b.member(console, "log");
    let hello = b.string("hello");
    let call = b.call(log, vec![hello]);
    let stmt = b.expression_statement(call);
    let program = b.program(vec![stmt]);
    let ast = b.finish(program);

    assert!(analyze(ast).is_ok());
}

#[test]
fn test_member_access_on_null_is_reported() {
    // let o = null; o.x;
    let mut b = AstBuilder::new();
    let null = b.null();
    let decl = b.let_declaration("o", Some(null));
    let o = b.identifier("o");
    let member = b.member(o, "x");
    let stmt = b.expression_statement(member);
    let program = b.program(vec![decl, stmt]);
    let ast = b.finish(program);

    let error = analyze(ast).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TypeError>(),
        Some(TypeError::NullPropertyAccess { .. })
    ));
}

#[test]
fn test_member_access_on_a_number_is_reported() {
    // let n = 5; n.x;
    let mut b = AstBuilder::new();
    let five = b.number(5.0);
    let decl = b.let_declaration("n", Some(five));
    let n = b.identifier("n");
    let member = b.member(n, "x");
    let stmt = b.expression_statement(member);
    let program = b.program(vec![decl, stmt]);
    let ast = b.finish(program);

    let error = analyze(ast).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TypeError>(),
        Some(TypeError::NotAnObject { .. })
    ));
}

#[test]
fn test_calling_a_number_is_reported() {
    // let n = 5; n();
    let mut b = AstBuilder::new();
    let five = b.number(5.0);
    let decl = b.let_declaration("n", Some(five));
    let n = b.identifier("n");
    let call = b.call(n, vec![]);
    let stmt = b.expression_statement(call);
    let program = b.program(vec![decl, stmt]);
    let ast = b.finish(program);

    let error = analyze(ast).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TypeError>(),
        Some(TypeError::NotCallable { .. })
    ));
}

#[test]
fn test_use_before_declaration_is_reported() {
    // x;
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let stmt = b.expression_statement(x);
    let program = b.program(vec![stmt]);
    let ast = b.finish(program);

    let error = analyze(ast).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TypeError>(),
        Some(TypeError::UsedBeforeDeclaration { .. })
    ));
}

#[test]
fn test_hoisted_function_is_callable_before_its_declaration() {
    // let n = double(2); function double(x) { return x * 2; }
    let mut b = AstBuilder::new();
    let callee = b.identifier("double");
    let two = b.number(2.0);
    let call = b.call(callee, vec![two]);
    let n_decl = b.let_declaration("n", Some(call));

    let x = b.identifier("x");
    let factor = b.number(2.0);
    let product = b.binary(BinaryOperator::Mul, x, factor);
    let ret = b.return_statement(Some(product));
    let body = b.block(vec![ret]);
    let double = b.function_declaration("double", vec!["x"], body);

    let program = b.program(vec![n_decl, double]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "n", "number");
}

#[test]
fn test_string_member_access() {
    // let s = "abc"; let n = s.length; let up = s.toUpperCase();
    let mut b = AstBuilder::new();
    let abc = b.string("abc");
    let s_decl = b.let_declaration("s", Some(abc));
    let s1 = b.identifier("s");
    let length = b.member(s1, "length");
    let n_decl = b.let_declaration("n", Some(length));
    let s2 = b.identifier("s");
    let to_upper = b.member(s2, "toUpperCase");
    let call = b.call(to_upper, vec![]);
    let up_decl = b.let_declaration("up", Some(call));
    let program = b.program(vec![s_decl, n_decl, up_decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "n", "number");
    assert_type(&analysis, "up", "string");
}

#[test]
fn test_array_push_and_pop_through_builtins() {
    // let xs = [1]; xs.push(2); let last = xs.pop();
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let array = b.array(vec![one]);
    let xs_decl = b.let_declaration("xs", Some(array));

    let xs1 = b.identifier("xs");
    let push = b.member(xs1, "push");
    let two = b.number(2.0);
    let push_call = b.call(push, vec![two]);
    let push_stmt = b.expression_statement(push_call);

    let xs2 = b.identifier("xs");
    let pop = b.member(xs2, "pop");
    let pop_call = b.call(pop, vec![]);
    let last_decl = b.let_declaration("last", Some(pop_call));

    let program = b.program(vec![xs_decl, push_stmt, last_decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "last", "number");
}

#[test]
fn test_object_literal_property_types() {
    // let user = { name: "Ann", age: 32 }; let n = user.age;
    let mut b = AstBuilder::new();
    let ann = b.string("Ann");
    let name_prop = b.property("name", ann);
    let age_value = b.number(32.0);
    let age_prop = b.property("age", age_value);
    let object = b.object(vec![name_prop, age_prop]);
    let user_decl = b.let_declaration("user", Some(object));

    let user = b.identifier("user");
    let age_access = b.member(user, "age");
    let n_decl = b.let_declaration("n", Some(age_access));

    let program = b.program(vec![user_decl, n_decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "user", "{name: string, age: number}");
    assert_type(&analysis, "n", "number");
}

#[test]
fn test_arrow_function_with_expression_body() {
    // let add = (a, b) => a + b; let sum = add(1, 2);
    let mut b = AstBuilder::new();
    let a = b.identifier("a");
    let b_ref = b.identifier("b");
    let plus = b.binary(BinaryOperator::Add, a, b_ref);
    let arrow = b.arrow_function(vec!["a", "b"], plus, true);
    let add_decl = b.let_declaration("add", Some(arrow));

    let add = b.identifier("add");
    let one = b.number(1.0);
    let two = b.number(2.0);
    let call = b.call(add, vec![one, two]);
    let sum_decl = b.let_declaration("sum", Some(call));

    let program = b.program(vec![add_decl, sum_decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    assert_type(&analysis, "sum", "number");
}

#[test]
fn test_exit_report_serializes_to_json() {
    // let x = 1;
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let decl = b.let_declaration("x", Some(one));
    let program = b.program(vec![decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    let json = serde_json::to_value(analysis.exit_report()).unwrap();
    let bindings = json["bindings"].as_array().unwrap();
    assert!(bindings
        .iter()
        .any(|entry| entry["name"] == "x" && entry["type"] == "number"));
}

#[test]
fn test_every_statement_gets_an_environment() {
    // let x = 1; let y = x;
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let x_decl = b.let_declaration("x", Some(one));
    let x = b.identifier("x");
    let y_decl = b.let_declaration("y", Some(x));
    let program = b.program(vec![x_decl, y_decl]);
    let ast = b.finish(program);

    let analysis = analyze(ast).unwrap();
    let keys: Vec<Option<NodeId>> = analysis.environments.keys().copied().collect();
    assert!(keys.contains(&Some(x_decl)));
    assert!(keys.contains(&Some(y_decl)));
    assert!(keys.contains(&None));
}
