//! CFG construction tests: successor computation, branch labels, switch
//! ordering, exception edges and the unsupported-jump guards.

use esinfer_core::ast::{AssignmentOperator, AstBuilder, BinaryOperator, UpdateOperator};
use esinfer_core::cfg::{compute_successor, Branch};
use esinfer_core::error::AnalysisError;
use esinfer_core::Program;

#[test]
fn test_successor_of_first_statement_is_the_second() {
    // let x = 10; ++x;
    let mut b = AstBuilder::new();
    let ten = b.number(10.0);
    let decl = b.let_declaration("x", Some(ten));
    let x = b.identifier("x");
    let update = b.update(UpdateOperator::Increment, true, x);
    let stmt = b.expression_statement(update);
    let program = b.program(vec![decl, stmt]);
    let ast = b.finish(program);

    assert_eq!(compute_successor(&ast, decl).unwrap(), Some(stmt));

    let program = Program::prepare(ast).unwrap();
    assert!(program
        .cfg()
        .is_connected(Some(decl), Some(stmt), Some(Branch::Unconditional)));
}

#[test]
fn test_successor_of_the_only_statement_is_exit() {
    // let x = 10;
    let mut b = AstBuilder::new();
    let ten = b.number(10.0);
    let decl = b.let_declaration("x", Some(ten));
    let program = b.program(vec![decl]);
    let ast = b.finish(program);

    assert_eq!(compute_successor(&ast, decl).unwrap(), None);

    let program = Program::prepare(ast).unwrap();
    assert!(program
        .cfg()
        .is_connected(Some(decl), None, Some(Branch::Unconditional)));
}

#[test]
fn test_break_jumps_to_the_statement_after_the_loop() {
    // for (;;) { if (x) break; } console.log(x);
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let brk = b.break_statement(None);
    let if_stmt = b.if_statement(x, brk, None);
    let body = b.block(vec![if_stmt]);
    let for_stmt = b.for_statement(None, None, None, body);

    let console = b.identifier("console");
    let log = b.member(console, "log");
    let x2 = b.identifier("x");
    let call = b.call(log, vec![x2]);
    let log_stmt = b.expression_statement(call);

    let program = b.program(vec![for_stmt, log_stmt]);
    let ast = b.finish(program);

    assert_eq!(compute_successor(&ast, brk).unwrap(), Some(log_stmt));
}

#[test]
fn test_continue_jumps_back_to_the_loop_header() {
    // while (x) { continue; }
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let cont = b.continue_statement(None);
    let body = b.block(vec![cont]);
    let while_stmt = b.while_statement(x, body);
    let program = b.program(vec![while_stmt]);
    let ast = b.finish(program);

    assert_eq!(compute_successor(&ast, cont).unwrap(), Some(while_stmt));
}

#[test]
fn test_loop_edges_carry_branch_labels() {
    // while (x) { x; } y;
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let x_in_body = b.identifier("x");
    let body_stmt = b.expression_statement(x_in_body);
    let body = b.block(vec![body_stmt]);
    let while_stmt = b.while_statement(x, body);
    let y = b.identifier("y");
    let after = b.expression_statement(y);
    let program = b.program(vec![while_stmt, after]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    let cfg = program.cfg();

    assert!(cfg.is_connected(Some(while_stmt), Some(body), Some(Branch::True)));
    assert!(cfg.is_connected(Some(while_stmt), Some(after), Some(Branch::False)));
    // The loop body flows back into the header.
    assert!(cfg.is_connected(Some(body_stmt), Some(while_stmt), Some(Branch::Unconditional)));
}

#[test]
fn test_for_statement_is_entered_through_its_init() {
    // x; for (let i = 0; i < 3; ++i) { i; }
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let first = b.expression_statement(x);

    let zero = b.number(0.0);
    let init = b.let_declaration("i", Some(zero));
    let i1 = b.identifier("i");
    let three = b.number(3.0);
    let test = b.binary(BinaryOperator::Lt, i1, three);
    let i2 = b.identifier("i");
    let update = b.update(UpdateOperator::Increment, true, i2);
    let i3 = b.identifier("i");
    let body_stmt = b.expression_statement(i3);
    let body = b.block(vec![body_stmt]);
    let for_stmt = b.for_statement(Some(init), Some(test), Some(update), body);

    let program = b.program(vec![first, for_stmt]);
    let ast = b.finish(program);

    // The statement before the loop falls through into the init clause.
    assert_eq!(compute_successor(&ast, first).unwrap(), Some(init));

    let program = Program::prepare(ast).unwrap();
    let cfg = program.cfg();
    assert!(cfg.is_connected(Some(init), Some(for_stmt), Some(Branch::Unconditional)));
    assert!(cfg.is_connected(Some(update), Some(for_stmt), Some(Branch::Unconditional)));
    assert!(cfg.is_connected(Some(for_stmt), Some(body), Some(Branch::True)));
}

#[test]
fn test_switch_enters_at_the_first_case_even_when_default_is_written_first() {
    // switch (x) { default: a(); case "A": b(); }
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let a = b.identifier("a");
    let a_call = b.call(a, vec![]);
    let a_stmt = b.expression_statement(a_call);
    let default_case = b.switch_case(None, vec![a_stmt]);

    let label = b.string("A");
    let b_fn = b.identifier("b");
    let b_call = b.call(b_fn, vec![]);
    let b_stmt = b.expression_statement(b_call);
    let a_case = b.switch_case(Some(label), vec![b_stmt]);

    let switch = b.switch_statement(x, vec![default_case, a_case]);
    let program = b.program(vec![switch]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    let cfg = program.cfg();

    assert!(cfg.is_connected(Some(switch), Some(a_case), Some(Branch::Unconditional)));
    assert!(!cfg.is_connected(Some(switch), Some(default_case), None));
    // The case's test failure falls back to the default clause.
    assert!(cfg.is_connected(Some(a_case), Some(default_case), Some(Branch::False)));
}

#[test]
fn test_case_without_break_cascades_into_the_next_consequent() {
    // switch (x) { case 1: a(); case 2: c(); }
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let one = b.number(1.0);
    let a = b.identifier("a");
    let a_call = b.call(a, vec![]);
    let a_stmt = b.expression_statement(a_call);
    let case_one = b.switch_case(Some(one), vec![a_stmt]);

    let two = b.number(2.0);
    let c = b.identifier("c");
    let c_call = b.call(c, vec![]);
    let c_stmt = b.expression_statement(c_call);
    let case_two = b.switch_case(Some(two), vec![c_stmt]);

    let switch = b.switch_statement(x, vec![case_one, case_two]);
    let program = b.program(vec![switch]);
    let ast = b.finish(program);

    // The last statement of the first consequent falls through into the
    // second case's consequent.
    assert_eq!(compute_successor(&ast, a_stmt).unwrap(), Some(c_stmt));
}

#[test]
fn test_return_connects_to_exit_not_to_the_next_statement() {
    // function f() { return 1; x; }
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let ret = b.return_statement(Some(one));
    let x = b.identifier("x");
    let dead = b.expression_statement(x);
    let body = b.block(vec![ret, dead]);
    let f = b.function_declaration("f", vec![], body);
    let program = b.program(vec![f]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    let cfg = program.cfg();

    assert!(cfg.is_connected(Some(ret), None, Some(Branch::Unconditional)));
    assert!(!cfg.is_connected(Some(ret), Some(dead), None));
}

#[test]
fn test_throwing_statement_gets_an_exception_edge_to_the_catch() {
    // try { f(); } catch (e) { e; }
    let mut b = AstBuilder::new();
    let f = b.identifier("f");
    let call = b.call(f, vec![]);
    let call_stmt = b.expression_statement(call);
    let try_block = b.block(vec![call_stmt]);

    let e_param = b.identifier("e");
    let e_use = b.identifier("e");
    let handler_stmt = b.expression_statement(e_use);
    let handler_body = b.block(vec![handler_stmt]);
    let handler = b.catch_clause(Some(e_param), handler_body);

    let try_stmt = b.try_statement(try_block, Some(handler), None);
    let program = b.program(vec![try_stmt]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    let cfg = program.cfg();

    assert!(cfg.is_connected(Some(try_stmt), Some(try_block), Some(Branch::Unconditional)));
    assert!(cfg.is_connected(Some(call_stmt), Some(handler), Some(Branch::Exception)));
    assert!(cfg.is_connected(Some(handler), Some(handler_body), Some(Branch::Unconditional)));
}

#[test]
fn test_throw_connects_to_the_nearest_catch() {
    // try { throw x; } catch (e) { e; }
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let throw_stmt = b.throw_statement(x);
    let try_block = b.block(vec![throw_stmt]);

    let e_param = b.identifier("e");
    let e_use = b.identifier("e");
    let handler_stmt = b.expression_statement(e_use);
    let handler_body = b.block(vec![handler_stmt]);
    let handler = b.catch_clause(Some(e_param), handler_body);

    let try_stmt = b.try_statement(try_block, Some(handler), None);
    let program = b.program(vec![try_stmt]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    assert!(program
        .cfg()
        .is_connected(Some(throw_stmt), Some(handler), Some(Branch::Unconditional)));
}

#[test]
fn test_functions_shield_statements_from_outer_catch() {
    // try { function g() { h(); } } catch (e) { }
    let mut b = AstBuilder::new();
    let h = b.identifier("h");
    let call = b.call(h, vec![]);
    let call_stmt = b.expression_statement(call);
    let g_body = b.block(vec![call_stmt]);
    let g = b.function_declaration("g", vec![], g_body);
    let try_block = b.block(vec![g]);

    let handler_body = b.block(vec![]);
    let handler = b.catch_clause(None, handler_body);
    let try_stmt = b.try_statement(try_block, Some(handler), None);
    let program = b.program(vec![try_stmt]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    // The call inside g throws past g's boundary, not into the outer catch.
    assert!(!program
        .cfg()
        .is_connected(Some(call_stmt), Some(handler), Some(Branch::Exception)));
}

#[test]
fn test_last_statement_of_try_flows_into_the_finalizer() {
    // try { x; } finally { y; }
    let mut b = AstBuilder::new();
    let x = b.identifier("x");
    let body_stmt = b.expression_statement(x);
    let try_block = b.block(vec![body_stmt]);
    let y = b.identifier("y");
    let final_stmt = b.expression_statement(y);
    let finalizer = b.block(vec![final_stmt]);
    let try_stmt = b.try_statement(try_block, None, Some(finalizer));
    let program = b.program(vec![try_stmt]);
    let ast = b.finish(program);

    assert_eq!(compute_successor(&ast, body_stmt).unwrap(), Some(finalizer));
}

#[test]
fn test_return_inside_try_finally_is_rejected() {
    // try { return; } finally { y; }
    let mut b = AstBuilder::new();
    let ret = b.return_statement(None);
    let try_block = b.block(vec![ret]);
    let y = b.identifier("y");
    let final_stmt = b.expression_statement(y);
    let finalizer = b.block(vec![final_stmt]);
    let try_stmt = b.try_statement(try_block, None, Some(finalizer));
    let body = b.block(vec![try_stmt]);
    let f = b.function_declaration("f", vec![], body);
    let program = b.program(vec![f]);
    let ast = b.finish(program);

    let result = Program::prepare(ast);
    assert!(matches!(result, Err(AnalysisError::Cfg(_))));
}

#[test]
fn test_break_inside_try_finally_is_rejected() {
    // while (x) { try { break; } finally { y; } }
    let mut b = AstBuilder::new();
    let brk = b.break_statement(None);
    let try_block = b.block(vec![brk]);
    let y = b.identifier("y");
    let final_stmt = b.expression_statement(y);
    let finalizer = b.block(vec![final_stmt]);
    let try_stmt = b.try_statement(try_block, None, Some(finalizer));
    let loop_body = b.block(vec![try_stmt]);
    let x = b.identifier("x");
    let while_stmt = b.while_statement(x, loop_body);
    let program = b.program(vec![while_stmt]);
    let ast = b.finish(program);

    let result = Program::prepare(ast);
    assert!(matches!(result, Err(AnalysisError::Cfg(_))));
}

#[test]
fn test_rebuilding_the_cfg_is_deterministic() {
    fn build() -> (Vec<(Option<u32>, &'static str, Option<u32>)>, usize) {
        let mut b = AstBuilder::new();
        let c = b.identifier("c");
        let one = b.number(1.0);
        let x1 = b.identifier("x");
        let assign1 = b.assignment(AssignmentOperator::Assign, x1, one);
        let then_stmt = b.expression_statement(assign1);
        let two = b.number(2.0);
        let x2 = b.identifier("x");
        let assign2 = b.assignment(AssignmentOperator::Assign, x2, two);
        let else_stmt = b.expression_statement(assign2);
        let if_stmt = b.if_statement(c, then_stmt, Some(else_stmt));
        let x3 = b.identifier("x");
        let after = b.expression_statement(x3);
        let program = b.program(vec![if_stmt, after]);
        let ast = b.finish(program);

        let program = Program::prepare(ast).unwrap();
        let edges: Vec<_> = program
            .cfg()
            .edges()
            .into_iter()
            .map(|edge| (edge.from.map(|n| n.0), edge.branch.as_str(), edge.to.map(|n| n.0)))
            .collect();
        let count = program.cfg().node_count();
        (edges, count)
    }

    let (first_edges, first_count) = build();
    let (second_edges, second_count) = build();
    assert_eq!(first_edges, second_edges);
    assert_eq!(first_count, second_count);
}

#[test]
fn test_if_without_else_falls_through_to_the_successor() {
    // if (c) { x; } y;
    let mut b = AstBuilder::new();
    let c = b.identifier("c");
    let x = b.identifier("x");
    let then_stmt = b.expression_statement(x);
    let then_block = b.block(vec![then_stmt]);
    let if_stmt = b.if_statement(c, then_block, None);
    let y = b.identifier("y");
    let after = b.expression_statement(y);
    let program = b.program(vec![if_stmt, after]);
    let ast = b.finish(program);

    let program = Program::prepare(ast).unwrap();
    let cfg = program.cfg();

    assert!(cfg.is_connected(Some(if_stmt), Some(then_block), Some(Branch::True)));
    assert!(cfg.is_connected(Some(if_stmt), Some(after), Some(Branch::False)));
}
