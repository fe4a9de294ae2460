use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};

/// Converts an AST to the Crafting‑Interpreters style prefix form, e.g.
/// `(* (group (+ 1.0 2.0)) 3.0)`.  Used by `rox parse` and in tests as a
/// canonical, whitespace‑free view of what the parser built.
pub struct AstPrinter;

impl AstPrinter {
    /// `(program stmt…)`
    pub fn print_program(statements: &[Stmt]) -> String {
        Self::parenthesize("program", statements.iter().map(Self::print_stmt))
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print_expr(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print_expr(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print_expr(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                Self::parenthesize("block", statements.iter().map(Self::print_stmt))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(eb) => format!(
                    "(if {} {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(eb)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print_expr(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => Self::print_function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(v) => format!("(return {})", Self::print_expr(v)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut head = format!("class {}", name.lexeme);
                if let Some(sc) = superclass {
                    head.push_str(&format!(" < {}", Self::print_expr(sc)));
                }

                Self::parenthesize(&head, methods.iter().map(|m| Self::print_function("method", m)))
            }
        }
    }

    fn print_function(kind: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        let head = format!("{} {} ({})", kind, decl.name.lexeme, params.join(" "));

        Self::parenthesize(&head, decl.body.iter().map(Self::print_stmt))
    }

    pub fn print_expr(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3.0 → 3.0 (keep the fraction to mark a number)
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print_expr(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print_expr(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print_expr(left),
                Self::print_expr(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print_expr(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let head = format!("call {}", Self::print_expr(callee));
                Self::parenthesize(&head, arguments.iter().map(Self::print_expr))
            }

            Expr::Get { object, name } => {
                format!("(. {} {})", Self::print_expr(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print_expr(object),
                name.lexeme,
                Self::print_expr(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    fn parenthesize(head: &str, parts: impl Iterator<Item = String>) -> String {
        let mut s = format!("({}", head);
        for part in parts {
            s.push(' ');
            s.push_str(&part);
        }
        s.push(')');
        s
    }
}
