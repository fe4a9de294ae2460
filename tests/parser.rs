#[cfg(test)]
mod parser_tests {
    use rox::ast_printer::AstPrinter;
    use rox::error::Diagnostics;
    use rox::expr::Expr;
    use rox::parser::Parser;
    use rox::scanner::scan_tokens;
    use rox::stmt::Stmt;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(source, &mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);

        (statements, diagnostics)
    }

    /// Parses `source`, asserts it is error free and returns the printed AST.
    fn print(source: &str) -> String {
        let (statements, diagnostics) = parse(source);

        assert!(
            diagnostics.is_empty(),
            "unexpected errors: {:?}",
            diagnostics.errors()
        );

        AstPrinter::print_program(&statements)
    }

    fn error_messages(source: &str) -> Vec<String> {
        let (_, diagnostics) = parse(source);

        diagnostics.errors().iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_precedence_factor_over_term() {
        assert_eq!(
            print("print 1 + 2 * 3;"),
            "(program (print (+ 1.0 (* 2.0 3.0))))"
        );
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        assert_eq!(
            print("print (1 + 2) * 3;"),
            "(program (print (* (group (+ 1.0 2.0)) 3.0)))"
        );
    }

    #[test]
    fn test_unary_and_left_associativity() {
        assert_eq!(
            print("print -a - -b - c;"),
            "(program (print (- (- (- a) (- b)) c)))"
        );
        assert_eq!(print("print !!true;"), "(program (print (! (! true))))");
    }

    #[test]
    fn test_comparison_binds_tighter_than_equality() {
        assert_eq!(
            print("print 1 < 2 == 3 >= 4;"),
            "(program (print (== (< 1.0 2.0) (>= 3.0 4.0))))"
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            print("print a or b and c;"),
            "(program (print (or a (and b c))))"
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print("a = b = c;"), "(program (; (= a (= b c))))");
    }

    #[test]
    fn test_calls_properties_and_setters() {
        assert_eq!(
            print("a.b(1, 2).c = 3;"),
            "(program (; (= (. (call (. a b) 1.0 2.0) c) 3.0)))"
        );
        assert_eq!(print("f()();"), "(program (; (call (call f))))");
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            print("print \"hi\"; print nil; print false; print 2.5;"),
            "(program (print hi) (print nil) (print false) (print 2.5))"
        );
    }

    #[test]
    fn test_var_declarations() {
        assert_eq!(
            print("var a; var b = a;"),
            "(program (var a) (var b a))"
        );
    }

    #[test]
    fn test_if_else_and_blocks() {
        assert_eq!(
            print("if (x) print 1; else { print 2; }"),
            "(program (if x (print 1.0) (block (print 2.0))))"
        );
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        assert_eq!(
            print("if (a) if (b) print 1; else print 2;"),
            "(program (if a (if b (print 1.0) (print 2.0))))"
        );
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            print("while (i < 3) i = i + 1;"),
            "(program (while (< i 3.0) (; (= i (+ i 1.0)))))"
        );
    }

    #[test]
    fn test_for_loop_desugars_to_while() {
        assert_eq!(
            print("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(program (block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0)))))))"
        );
    }

    #[test]
    fn test_for_loop_without_clauses_loops_forever() {
        assert_eq!(
            print("for (;;) print 1;"),
            "(program (while true (print 1.0)))"
        );
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            print("fun add(a, b) { return a + b; } fun f() { return; }"),
            "(program (fun add (a b) (return (+ a b))) (fun f () (return)))"
        );
    }

    #[test]
    fn test_class_declaration() {
        assert_eq!(
            print("class B < A { init(x) { this.x = x; } get() { return super.get(); } }"),
            "(program (class B < A (method init (x) (; (= (. this x) x))) (method get () (return (super get)))))"
        );
        assert_eq!(print("class Empty {}"), "(program (class Empty))");
    }

    #[test]
    fn test_missing_semicolon_at_end() {
        assert_eq!(
            error_messages("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_recovers_and_reports_every_error() {
        let source = "print 1 +;\nvar x = ;\nprint 3;";
        let (statements, diagnostics) = parse(source);

        let errors: Vec<String> = diagnostics.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            errors,
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at ';': Expect expression.",
            ]
        );

        // Only the well‑formed statement survives.
        assert_eq!(AstPrinter::print_program(&statements), "(program (print 3.0))");
    }

    #[test]
    fn test_error_inside_block_does_not_lose_following_statements() {
        let (statements, diagnostics) = parse("{ print ; print 2; }\nprint 3;");

        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(
            AstPrinter::print_program(&statements),
            "(program (block (print 2.0)) (print 3.0))"
        );
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, diagnostics) = parse("1 + 2 = 3; print 4;");

        let errors: Vec<String> = diagnostics.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);

        assert_eq!(
            AstPrinter::print_program(&statements),
            "(program (; (+ 1.0 2.0)) (print 4.0))"
        );
    }

    #[test]
    fn test_class_errors() {
        assert_eq!(
            error_messages("class { }"),
            vec!["[line 1] Error at '{': Expect class name."]
        );
        assert_eq!(
            error_messages("class A < { }"),
            vec!["[line 1] Error at '{': Expect superclass name."]
        );
        assert_eq!(
            error_messages("print super;"),
            vec!["[line 1] Error at ';': Expect '.' after 'super'."]
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, diagnostics) = parse(&source);

        let errors: Vec<String> = diagnostics.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            errors,
            vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
        );

        // The call itself still parses.
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_255_arguments_are_allowed() {
        let args: Vec<String> = (0..255).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (_, diagnostics) = parse(&source);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        assert_eq!(
            error_messages(&source),
            vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
        );
    }

    #[test]
    fn test_parse_expression() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens("(1 + 2) * -3", &mut diagnostics);
        let expr = Parser::new(tokens).parse_expression(&mut diagnostics);

        assert!(diagnostics.is_empty());
        let expr: Expr = expr.expect("expression parses");
        assert_eq!(
            AstPrinter::print_expr(&expr),
            "(* (group (+ 1.0 2.0)) (- 3.0))"
        );
    }

    #[test]
    fn test_parse_expression_rejects_trailing_tokens() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens("1 2", &mut diagnostics);
        let expr = Parser::new(tokens).parse_expression(&mut diagnostics);

        assert!(expr.is_none());
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "[line 1] Error at '2': Expect end of expression."
        );
    }

    #[test]
    fn test_parser_appends_missing_eof() {
        let mut diagnostics = Diagnostics::new();
        let mut tokens = scan_tokens("print 1;", &mut diagnostics);
        tokens.pop();

        let statements = Parser::new(tokens).parse(&mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_printing_is_stable_across_parses() {
        let source = r#"
            class A < B { m(x) { return super.m(x) + this.y; } }
            fun f(a) { for (var i = 0; i < a; i = i + 1) { if (i or !a) print i; } }
            var v = f(1)(2).w = "s";
        "#;

        let first = print(source);
        let second = print(source);

        assert_eq!(first, second);
    }

    #[test]
    fn test_error_lines_follow_source() {
        assert_eq!(
            error_messages("var a = 1;\n\n\nprint a"),
            vec!["[line 4] Error at end: Expect ';' after value."]
        );
    }
}
