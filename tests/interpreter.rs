#[cfg(test)]
mod interpreter_tests {
    use std::thread;

    use rlox::interpreter::MAX_CALL_DEPTH;
    use rlox::lox::Lox;

    type Session = Lox<Vec<u8>, Vec<(usize, String)>>;

    fn session() -> Session {
        Lox::with_parts(Vec::<u8>::new(), Vec::<(usize, String)>::new())
    }

    fn output(lox: &Session) -> String {
        String::from_utf8(lox.output().clone()).expect("utf-8 output")
    }

    /// Runs `source` in a fresh session, returning what it printed and what
    /// it reported.
    fn run(source: &str) -> (String, Vec<(usize, String)>) {
        let mut lox = session();
        lox.run(source);

        (output(&lox), lox.reporter().clone())
    }

    fn run_ok(source: &str) -> String {
        let (out, errors) = run(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        out
    }

    fn first_error(source: &str) -> (usize, String) {
        let (_, errors) = run(source);

        errors.into_iter().next().expect("an error to be reported")
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 7 % 4;"), "3\n");
        assert_eq!(run_ok("print 7 / 2;"), "3.5\n");
        assert_eq!(run_ok("print -2 - -3;"), "1\n");
    }

    #[test]
    fn for_loop_accumulates() {
        assert_eq!(
            run_ok("var x = 0; for (var i = 0; i < 3; i = i + 1) { x = x + i; } print x;"),
            "3\n"
        );
    }

    #[test]
    fn closure_counter_keeps_its_state() {
        assert_eq!(
            run_ok(
                "fun make() { var n = 0; return fun() { n = n + 1; return n; }; } \
                 var c = make(); print c(); print c();"
            ),
            "1\n2\n"
        );
    }

    #[test]
    fn class_with_initializer_and_method() {
        assert_eq!(
            run_ok(
                "class Pt { init(x,y) { this.x = x; this.y = y; } \
                 sum() { return this.x + this.y; } } \
                 var p = Pt(3,4); print p.sum();"
            ),
            "7\n"
        );
    }

    #[test]
    fn ternary_picks_a_branch() {
        assert_eq!(
            run_ok("print true ? \"a\" : \"b\"; print false ? \"a\" : \"b\";"),
            "a\nb\n"
        );
    }

    #[test]
    fn parse_error_produces_no_output_and_session_survives() {
        let mut lox = session();

        assert!(!lox.run("print 1; if (1"));
        assert_eq!(output(&lox), "");
        assert_eq!(lox.reporter().len(), 1);

        assert!(lox.run("print 2;"));
        assert!(!lox.had_error());
        assert_eq!(output(&lox), "2\n");
    }

    #[test]
    fn lex_error_stops_the_run() {
        let (out, errors) = run("print 1; @");

        assert_eq!(out, "");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.contains("Unexpected character"));
    }

    #[test]
    fn blocks_shadow_and_restore() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
        assert_eq!(run_ok("var a = 1; { a = 2; } print a;"), "2\n");
        assert_eq!(run_ok("var a = 1; var a = 3; print a;"), "3\n");
    }

    #[test]
    fn undefined_variables_are_runtime_errors() {
        assert_eq!(
            first_error("print nope;"),
            (1, "Undefined variable 'nope'.".to_string())
        );
        assert_eq!(
            first_error("\nnope = 1;"),
            (2, "Undefined variable 'nope'.".to_string())
        );

        // Leaving a block forgets its variables.
        assert_eq!(
            first_error("{ var inner = 1; } print inner;").1,
            "Undefined variable 'inner'."
        );
    }

    #[test]
    fn closures_share_captured_variables() {
        assert_eq!(
            run_ok(
                "var get; var set; \
                 { var shared = 1; \
                   get = fun () -> shared; \
                   set = fun (v) { shared = v; }; } \
                 set(5); print get();"
            ),
            "5\n"
        );
    }

    #[test]
    fn functions_see_later_globals_and_recurse() {
        assert_eq!(
            run_ok(
                "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
                 print fib(10);"
            ),
            "55\n"
        );
        assert_eq!(
            run_ok("fun show() { print later; } var later = \"late\"; show();"),
            "late\n"
        );
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
        assert_eq!(run_ok("fun f() { return; } print f();"), "nil\n");
    }

    #[test]
    fn equality_never_crosses_kinds() {
        assert_eq!(
            run_ok(
                "print nil == nil; print nil == false; print 0 == false; \
                 print \"a\" == \"a\"; print 1 != 2;"
            ),
            "true\nfalse\nfalse\ntrue\ntrue\n"
        );
    }

    #[test]
    fn truthiness_only_nil_and_false_are_falsy() {
        assert_eq!(
            run_ok("print !nil; print !false; print !0; print !\"\";"),
            "true\ntrue\nfalse\nfalse\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(
            run_ok(
                "var hits = 0; fun hit() { hits = hits + 1; return true; } \
                 print nil and hit(); print 1 or hit(); print false or \"x\"; print hits;"
            ),
            "nil\n1\nx\n0\n"
        );
    }

    #[test]
    fn comma_yields_the_right_operand() {
        assert_eq!(run_ok("var a = 0; print (a = 1, a + 1);"), "2\n");
    }

    #[test]
    fn wrong_arity_does_not_run_the_body() {
        let (out, errors) = run("fun f(a, b) { print \"ran\"; } f(1);");

        assert_eq!(out, "");
        assert_eq!(
            errors,
            vec![(
                1,
                "Incorrect argument count for function: expected 2 but got 1.".to_string()
            )]
        );
    }

    #[test]
    fn string_concatenation_is_left_driven() {
        assert_eq!(run_ok("print \"x\" + 1;"), "x1\n");
        assert_eq!(run_ok("print \"n=\" + nil + true;"), "n=niltrue\n");

        assert_eq!(
            first_error("print 1 + \"x\";").1,
            "Invalid types for operation '+'."
        );
        assert_eq!(
            first_error("print nil + 1;").1,
            "Invalid types for operation '+'."
        );
        assert_eq!(
            first_error("print -\"a\";").1,
            "Invalid types for operation '-'."
        );
    }

    #[test]
    fn division_by_zero_follows_floating_point() {
        assert_eq!(run_ok("print 1 / 0; print -1 / 0;"), "Infinity\n-Infinity\n");
        assert_eq!(run_ok("print 0 / 0;"), "NaN\n");
    }

    #[test]
    fn break_and_continue_in_both_loops() {
        assert_eq!(
            run_ok(
                "var i = 0; while (true) { i = i + 1; if (i == 3) break; } print i;"
            ),
            "3\n"
        );
        assert_eq!(
            run_ok(
                "for (var i = 0; i < 5; i = i + 1) { if (i % 2 == 0) continue; print i; }"
            ),
            "1\n3\n"
        );
        assert_eq!(
            run_ok(
                "var n = 0; while (n < 4) { n = n + 1; if (n == 2) continue; print n; }"
            ),
            "1\n3\n4\n"
        );
    }

    #[test]
    fn return_unwinds_nested_loops() {
        assert_eq!(
            run_ok(
                "fun find() { for (var i = 0; ; i = i + 1) { while (true) { return i + 10; } } } \
                 print find(); var i = \"global\"; print i;"
            ),
            "10\nglobal\n"
        );
    }

    #[test]
    fn arrow_lambdas_return_their_expression() {
        assert_eq!(
            run_ok("var add = fun (a, b) -> a + b; print add(2, 3);"),
            "5\n"
        );
    }

    #[test]
    fn initializer_always_yields_the_instance() {
        assert_eq!(
            run_ok(
                "class A { init() { this.v = 1; return; } } \
                 var a = A(); print a; print a.init() == a; print a.v;"
            ),
            "<instance A>\ntrue\n1\n"
        );
    }

    #[test]
    fn constructor_arity_is_checked() {
        assert_eq!(
            first_error("class A { init(x) {} } A();").1,
            "Incorrect argument count for constructor: expected 1 but got 0."
        );

        // Without an `init` the arguments are ignored.
        assert_eq!(run_ok("class B {} print B(1, 2);"), "<instance B>\n");
    }

    #[test]
    fn every_access_binds_a_new_method() {
        assert_eq!(
            run_ok(
                "class C { m() { return this; } } var o = C(); \
                 print o.m == o.m; var m = o.m; print m() == o;"
            ),
            "false\ntrue\n"
        );
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            run_ok(
                "class C { m() { return \"method\"; } } var o = C(); \
                 o.m = fun () -> \"field\"; print o.m();"
            ),
            "field\n"
        );
    }

    #[test]
    fn class_methods_on_class_and_instance() {
        assert_eq!(
            run_ok(
                "class M { class square(n) { return n * n; } } \
                 print M.square(4); print M().square(3);"
            ),
            "16\n9\n"
        );
        assert_eq!(
            first_error("class M {} M.nothing;").1,
            "Unknown class method 'nothing'."
        );
    }

    #[test]
    fn member_access_errors() {
        assert_eq!(
            first_error("class C {} print C().missing;").1,
            "Uninitialized field 'missing'."
        );
        assert_eq!(
            first_error("var x = 1; print x.y;").1,
            "Only access fields of objects."
        );
        assert_eq!(
            first_error("var x = 1; x.y = 2;").1,
            "Only access fields of objects."
        );
        assert_eq!(
            first_error("\"str\"();").1,
            "Can only call functions and classes."
        );
    }

    #[test]
    fn display_tags() {
        assert_eq!(
            run_ok(
                "fun f() {} class K {} print f; print clock; print K; print K(); \
                 print nil; print 5 / 2; print 10;"
            ),
            "<function>\n<Lox Builtin>\n<class K>\n<instance K>\nnil\n2.5\n10\n"
        );
    }

    #[test]
    fn builtins_return_numbers() {
        assert_eq!(
            run_ok("var r = random(); print r >= 0 and r < 1; print clock() > 0;"),
            "true\ntrue\n"
        );
        assert_eq!(run_ok("var clock = 1; print clock;"), "1\n");
    }

    #[test]
    fn runtime_error_stops_later_statements() {
        let (out, errors) = run("print 1;\nprint nope;\nprint 3;");

        assert_eq!(out, "1\n");
        assert_eq!(errors, vec![(2, "Undefined variable 'nope'.".to_string())]);
    }

    #[test]
    fn unicode_identifiers_and_whitespace() {
        assert_eq!(run_ok("var café = 1;\x0cprint café;\x0bprint café + 1;"), "1\n2\n");
    }

    #[test]
    fn call_depth_is_capped_and_the_session_survives() {
        // Test threads default to 2 MiB; give the evaluator room for the full depth.
        let worker = thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut lox = session();
                let count = "fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }";

                assert!(lox.run(count));
                assert!(lox.run(&format!("print count({});", MAX_CALL_DEPTH - 1)));
                assert!(!lox.run(&format!("print count({});", MAX_CALL_DEPTH)));
                assert!(!lox.run("fun down(n) { return down(n + 1); }\n\ndown(0);"));
                assert!(lox.run("print \"still here\";"));

                (output(&lox), lox.reporter().clone())
            })
            .expect("spawn interpreter thread");

        let (out, errors) = worker.join().expect("interpreter thread finished");

        assert_eq!(out, format!("{}\nstill here\n", MAX_CALL_DEPTH - 1));
        assert_eq!(
            errors,
            vec![
                (1, "Stack overflow.".to_string()),
                (1, "Stack overflow.".to_string()),
            ]
        );
    }

    #[test]
    fn definitions_persist_across_runs() {
        let mut lox = session();

        assert!(lox.run("var count = 1;"));
        assert!(lox.run("fun bump() { count = count + 1; }"));
        assert!(lox.run("bump(); bump();"));
        assert!(lox.run("print count;"));

        assert_eq!(output(&lox), "3\n");
    }

    #[test]
    fn failed_run_returns_to_global_scope() {
        let mut lox = session();

        assert!(!lox.run("fun f() { var local = 1; { missing(); } } f();"));
        assert!(lox.had_error());

        assert!(!lox.run("print local;"));
        assert!(lox.run("var g = 2; print g;"));

        assert_eq!(output(&lox), "2\n");
        assert_eq!(lox.reporter().len(), 2);
        assert_eq!(lox.reporter()[1].1, "Undefined variable 'local'.");
    }
}
