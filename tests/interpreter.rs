#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox::error::{Diagnostics, EXIT_RUNTIME_ERROR, EXIT_STATIC_ERROR};
    use rox::{read_source, Lox, LoxError, Value};

    /// `print` sink that the test can still read after handing it to `Lox`.
    #[derive(Clone, Default)]
    struct SharedOutput(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedOutput {
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.borrow_mut());
            String::from_utf8(bytes).expect("output is UTF-8")
        }
    }

    fn session() -> (Lox, SharedOutput) {
        let output = SharedOutput::default();
        let lox = Lox::with_output(Box::new(output.clone()));

        (lox, output)
    }

    fn run(source: &str) -> (String, Diagnostics) {
        let (mut lox, output) = session();
        let diagnostics = lox.run(source);

        (output.take(), diagnostics)
    }

    /// Runs a program that must finish cleanly and returns what it printed.
    fn run_ok(source: &str) -> String {
        let (output, diagnostics) = run(source);

        assert!(
            diagnostics.is_empty(),
            "unexpected errors: {:?}",
            diagnostics.errors()
        );

        output
    }

    /// Runs a program that must fail at runtime; returns the output printed
    /// before the fault and the rendered error.
    fn run_err(source: &str) -> (String, String) {
        let (output, diagnostics) = run(source);

        assert_eq!(diagnostics.exit_code(), EXIT_RUNTIME_ERROR);
        assert_eq!(diagnostics.errors().len(), 1);

        (output, diagnostics.errors()[0].to_string())
    }

    // ── expressions ─────────────────────────────────────────────────────

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 10 - 4 - 3;"), "3\n");
        assert_eq!(run_ok("print -(2 + 3);"), "-5\n");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(run_ok("print 7 / 2;"), "3.5\n");
        assert_eq!(run_ok("print 100;"), "100\n");
        assert_eq!(run_ok("print 2.50;"), "2.5\n");
    }

    #[test]
    fn test_division_by_zero_is_not_a_fault() {
        assert_eq!(run_ok("print 1 / 0 > 1000000;"), "true\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
        assert_eq!(run_ok("var s = \"a\"; s = s + s; print s;"), "aa\n");
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            run_ok("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 5;"),
            "true\ntrue\nfalse\nfalse\n"
        );
    }

    #[test]
    fn test_equality() {
        let output = run_ok(
            "print nil == nil; print 1 == 1; print 1 == \"1\"; print \"a\" == \"a\"; \
             print nil == false; print true != false;",
        );

        assert_eq!(output, "true\ntrue\nfalse\ntrue\nfalse\ntrue\n");
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(
            run_ok("print !nil; print !false; print !0; print !\"\";"),
            "true\ntrue\nfalse\nfalse\n"
        );
    }

    #[test]
    fn test_logical_operators_return_deciding_operand() {
        assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
        assert_eq!(run_ok("print \"first\" or \"second\";"), "first\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
        assert_eq!(run_ok("print nil and 2;"), "nil\n");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        // `boom` is undefined; evaluating it would be a runtime error.
        assert_eq!(run_ok("print false and boom;"), "false\n");
        assert_eq!(run_ok("print true or boom;"), "true\n");
    }

    // ── variables and scope ─────────────────────────────────────────────

    #[test]
    fn test_uninitialized_variable_is_nil() {
        assert_eq!(run_ok("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_assignment_is_an_expression() {
        assert_eq!(run_ok("var a; var b; a = b = 3; print a; print b;"), "3\n3\n");
    }

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_assignment_reaches_enclosing_scope() {
        assert_eq!(run_ok("var a = 1; { a = 2; } print a;"), "2\n");
    }

    #[test]
    fn test_closure_binds_lexically() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;

        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    // ── control flow ────────────────────────────────────────────────────

    #[test]
    fn test_if_else() {
        assert_eq!(
            run_ok("if (1 > 2) print \"yes\"; else print \"no\";"),
            "no\n"
        );
        assert_eq!(run_ok("if (nil) print 1;"), "");
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_for_loop_variable_is_scoped_to_loop() {
        let (_, error) = run_err("for (var i = 0; i < 1; i = i + 1) {} print i;");

        assert_eq!(error, "Undefined variable 'i'.\n[line 1]");
    }

    // ── functions ───────────────────────────────────────────────────────

    #[test]
    fn test_function_call_and_return() {
        assert_eq!(
            run_ok("fun add(a, b) { return a + b; } print add(1, 2);"),
            "3\n"
        );
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_return_unwinds_out_of_loop() {
        let source = r#"
            fun f() {
                var i = 0;
                while (true) {
                    i = i + 1;
                    if (i == 5) return i;
                }
            }
            print f();
        "#;

        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;

        assert_eq!(run_ok(source), "55\n");
    }

    #[test]
    fn test_closure_counter() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }
            var c = makeCounter();
            print c();
            print c();
            var d = makeCounter();
            print d();
        "#;

        assert_eq!(run_ok(source), "1\n2\n1\n");
    }

    #[test]
    fn test_closures_in_loop_keep_their_own_iteration() {
        let source = r#"
            var first;
            var second;
            for (var i = 0; i < 2; i = i + 1) {
                var j = i;
                fun f() { return j; }
                if (i == 0) first = f; else second = f;
            }
            print first();
            print second();
        "#;

        assert_eq!(run_ok(source), "0\n1\n");
    }

    #[test]
    fn test_function_display() {
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(run_ok("print clock;"), "<native fn>\n");
    }

    #[test]
    fn test_clock() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
        assert_eq!(run_ok("var t = clock(); print clock() >= t;"), "true\n");
    }

    #[test]
    fn test_arity_mismatch_never_runs_body() {
        let (output, error) = run_err("fun f(a, b) { print \"ran\"; }\nf(1);");

        assert_eq!(output, "");
        assert_eq!(error, "Expected 2 arguments but got 1.\n[line 2]");
    }

    #[test]
    fn test_calling_non_callable() {
        let (_, error) = run_err("\"hi\"();");

        assert_eq!(error, "Can only call functions and classes.\n[line 1]");
    }

    #[test]
    fn test_custom_native_function() {
        let (mut lox, output) = session();

        lox.interpreter().define_native("double", 1, |args| match args[0] {
            Value::Number(n) => Ok(Value::Number(n * 2.0)),
            _ => Err("Expected a number.".to_string()),
        });

        let diagnostics = lox.run("print double(21);");
        assert!(diagnostics.is_empty());
        assert_eq!(output.take(), "42\n");

        let diagnostics = lox.run("print double(\"x\");");
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "Expected a number.\n[line 1]"
        );
    }

    // ── classes ─────────────────────────────────────────────────────────

    #[test]
    fn test_class_and_instance_display() {
        assert_eq!(
            run_ok("class P {} print P; print P();"),
            "P\nP instance\n"
        );
    }

    #[test]
    fn test_initializer_and_fields() {
        let source = r#"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
        "#;

        assert_eq!(run_ok(source), "3\n12\n");
    }

    #[test]
    fn test_init_returns_this() {
        let source = r#"
            class A {
                init() {
                    this.v = 1;
                    return;
                }
            }
            var a = A();
            print a.init() == a;
            print a.v;
        "#;

        assert_eq!(run_ok(source), "true\n1\n");
    }

    #[test]
    fn test_class_arity_follows_init() {
        let (_, error) = run_err("class A { init(x) {} }\nA();");

        assert_eq!(error, "Expected 1 arguments but got 0.\n[line 2]");
    }

    #[test]
    fn test_inherited_method() {
        let source = r#"
            class A { getX() { return 5; } }
            class B < A {}
            print B().getX();
        "#;

        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_inherited_initializer() {
        let source = r#"
            class A { init(x) { this.x = x; } }
            class B < A { getX() { return this.x; } }
            print B(5).getX();
        "#;

        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_inherited_initializer_sets_arity() {
        let (output, error) = run_err(
            "class A { init(x) { print \"init\"; } }\nclass B < A {}\nB();",
        );

        assert_eq!(output, "");
        assert_eq!(error, "Expected 1 arguments but got 0.\n[line 3]");
    }

    #[test]
    fn test_super_call() {
        let source = r#"
            class A { say() { return "A"; } }
            class B < A { say() { return "B" + super.say(); } }
            class C < B {}
            print C().say();
        "#;

        assert_eq!(run_ok(source), "BA\n");
    }

    #[test]
    fn test_bound_method_keeps_this() {
        let source = r#"
            class C {
                init(n) { this.n = n; }
                get() { return this.n; }
            }
            var m = C(7).get;
            print m();
        "#;

        assert_eq!(run_ok(source), "7\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class A { m() { return "method"; } }
            var a = A();
            a.m = "field";
            print a.m;
        "#;

        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn test_instance_equality_is_identity() {
        assert_eq!(
            run_ok("class A {} var a = A(); var b = A(); print a == a; print a == b;"),
            "true\nfalse\n"
        );
    }

    #[test]
    fn test_undefined_property() {
        let (_, error) = run_err("class A {}\nprint A().foo;");

        assert_eq!(error, "Undefined property 'foo'.\n[line 2]");
    }

    #[test]
    fn test_property_access_on_non_instance() {
        let (_, error) = run_err("var a = 1; print a.x;");
        assert_eq!(error, "Only instances have properties.\n[line 1]");

        let (_, error) = run_err("var a = 1; a.x = 2;");
        assert_eq!(error, "Only instances have fields.\n[line 1]");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, error) = run_err("var NotClass = 1;\nclass B < NotClass {}");

        assert_eq!(error, "Superclass must be a class.\n[line 2]");
    }

    // ── runtime errors ──────────────────────────────────────────────────

    #[test]
    fn test_type_errors() {
        let (_, error) = run_err("print -\"a\";");
        assert_eq!(error, "Operand must be a number.\n[line 1]");

        let (_, error) = run_err("print 1 + \"a\";");
        assert_eq!(error, "Operands must be two numbers or two strings.\n[line 1]");

        let (_, error) = run_err("print 1 < \"a\";");
        assert_eq!(error, "Operands must be numbers.\n[line 1]");
    }

    #[test]
    fn test_undefined_variable() {
        let (_, error) = run_err("print x;");
        assert_eq!(error, "Undefined variable 'x'.\n[line 1]");

        let (_, error) = run_err("y = 1;");
        assert_eq!(error, "Undefined variable 'y'.\n[line 1]");
    }

    #[test]
    fn test_runtime_error_abandons_rest_of_program() {
        let (output, error) = run_err("print 1;\n\nprint -nil;\nprint 2;");

        assert_eq!(output, "1\n");
        assert_eq!(error, "Operand must be a number.\n[line 3]");
    }

    #[test]
    fn test_runtime_error_inside_function_restores_scope() {
        let (mut lox, output) = session();

        let diagnostics = lox.run("var a = \"outer\"; fun f() { var a = 1; return -\"x\"; } f();");
        assert_eq!(diagnostics.exit_code(), EXIT_RUNTIME_ERROR);

        let diagnostics = lox.run("print a;");
        assert!(diagnostics.is_empty());
        assert_eq!(output.take(), "outer\n");
    }

    // ── static errors and exit codes ────────────────────────────────────

    #[test]
    fn test_syntax_error_withholds_execution() {
        let (output, diagnostics) = run("print 1;\nprint ;");

        assert_eq!(output, "");
        assert_eq!(diagnostics.exit_code(), EXIT_STATIC_ERROR);
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "[line 2] Error at ';': Expect expression."
        );
    }

    #[test]
    fn test_lexical_error_withholds_execution() {
        let (output, diagnostics) = run("print 1; @");

        assert_eq!(output, "");
        assert_eq!(diagnostics.exit_code(), EXIT_STATIC_ERROR);
    }

    #[test]
    fn test_resolution_error_withholds_execution() {
        let (output, diagnostics) = run("print 1;\nreturn 2;");

        assert_eq!(output, "");
        assert_eq!(diagnostics.exit_code(), EXIT_STATIC_ERROR);
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "[line 2] Error at 'return': Can't return from top-level code."
        );
    }

    #[test]
    fn test_clean_run_exits_zero() {
        let (_, diagnostics) = run("print 1;");

        assert_eq!(diagnostics.exit_code(), 0);
    }

    // ── interactive sessions ────────────────────────────────────────────

    #[test]
    fn test_prompt_keeps_globals_between_lines() {
        let (mut lox, output) = session();

        assert!(lox.run_line("var a = 1;").is_empty());
        assert!(lox.run_line("a = a + 1;").is_empty());
        assert!(lox.run_line("print a;").is_empty());

        assert_eq!(output.take(), "2\n");
    }

    #[test]
    fn test_prompt_closures_survive_between_lines() {
        let (mut lox, output) = session();

        lox.run_line("fun outer() { var x = \"captured\"; fun inner() { return x; } return inner; }");
        lox.run_line("var g = outer();");
        lox.run_line("print g();");

        assert_eq!(output.take(), "captured\n");
    }

    #[test]
    fn test_prompt_runs_statements_that_parsed() {
        let (mut lox, output) = session();

        let diagnostics = lox.run_line("print 1; print ;");

        assert_eq!(output.take(), "1\n");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn test_prompt_recovers_after_runtime_error() {
        let (mut lox, output) = session();

        let diagnostics = lox.run_line("print -nil;");
        assert!(diagnostics.had_runtime_error());

        assert!(lox.run_line("print \"still here\";").is_empty());
        assert_eq!(output.take(), "still here\n");
    }

    // ── source files ────────────────────────────────────────────────────

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rox-{}-{}.lox", std::process::id(), name))
    }

    #[test]
    fn test_read_source_runs_file_contents() {
        let path = temp_path("ok");
        std::fs::write(&path, "print \"from file\";").expect("write temp file");

        let source = read_source(&path).expect("source reads");
        std::fs::remove_file(&path).ok();

        assert_eq!(run_ok(&source), "from file\n");
    }

    #[test]
    fn test_read_source_missing_file_is_io_error() {
        let err = read_source(&temp_path("missing")).unwrap_err();

        assert!(matches!(err, LoxError::Io(_)), "got {:?}", err);
        assert_eq!(err.line(), None);
        assert!(!err.is_static());
    }

    #[test]
    fn test_read_source_rejects_invalid_utf8() {
        let path = temp_path("latin1");
        std::fs::write(&path, [b'p', 0xff, 0xfe]).expect("write temp file");

        let err = read_source(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, LoxError::Utf8(_)), "got {:?}", err);
    }
}
