use crate::ast::*;
use crate::cursor::TokenCursor;
use crate::lexer::{Lexer, Token, TokenKind};
use minic_source::{Diagnostic, Source};
use std::mem;

mod decl;
mod expr;
mod stmt;

/// Tokens that can start an expression.
const EXPR_START: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::IntLit,
    TokenKind::FloatLit,
    TokenKind::BoolLit,
    TokenKind::Minus,
    TokenKind::Not,
    TokenKind::OpenParen,
];

/// Tokens that can start a top level declaration.
const DECL_START: &[TokenKind] = &[
    TokenKind::Extern,
    TokenKind::Int,
    TokenKind::Bool,
    TokenKind::Float,
    TokenKind::Void,
];

/// Where to resume after a statement that is missing its `;`.
const STMT_FOLLOW: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::IntLit,
    TokenKind::FloatLit,
    TokenKind::BoolLit,
    TokenKind::Minus,
    TokenKind::Not,
    TokenKind::OpenParen,
    TokenKind::Semi,
    TokenKind::OpenBrace,
    TokenKind::CloseBrace,
    TokenKind::If,
    TokenKind::Else,
    TokenKind::While,
    TokenKind::Return,
    TokenKind::Int,
    TokenKind::Bool,
    TokenKind::Float,
    TokenKind::Void,
    TokenKind::Extern,
];

/// Where to resume after a malformed sub-expression.
const EXPR_FOLLOW: &[TokenKind] = &[
    TokenKind::Semi,
    TokenKind::Comma,
    TokenKind::OpenBrace,
    TokenKind::CloseBrace,
    TokenKind::OrOr,
    TokenKind::AndAnd,
    TokenKind::EqualsEquals,
    TokenKind::NotEquals,
    TokenKind::LessThan,
    TokenKind::LessThanEquals,
    TokenKind::GreaterThan,
    TokenKind::GreaterThanEquals,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Asterisk,
    TokenKind::Slash,
    TokenKind::Percent,
];

pub struct Parser<'a> {
    /// Cached token for peeking.
    current_token: Token,
    cursor: TokenCursor<'a>,
    /// Number of tokens consumed so far.
    consumed: usize,
    /// Source code
    source: &'a Source<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a Source<'a>) -> Self {
        let mut cursor = TokenCursor::new(Lexer::new(source.content));
        Self {
            current_token: cursor.advance(),
            cursor,
            consumed: 0,
            source,
        }
    }
}

/// Parse utilities
impl<'a> Parser<'a> {
    /// Consumes the current token and returns it.
    fn next(&mut self) -> Token {
        let next = self.cursor.advance();
        self.consumed += 1;
        mem::replace(&mut self.current_token, next)
    }

    /// Undoes a [`Self::next`]: `token` becomes the current token again and the current token goes
    /// back to the cursor.
    fn unread(&mut self, token: Token) {
        let lookahead = mem::replace(&mut self.current_token, token);
        self.cursor.push_back(lookahead);
        self.consumed = self.consumed.saturating_sub(1);
    }

    /// Returns the `k`-th token after the current one without consuming anything.
    fn peek(&mut self, k: usize) -> &Token {
        self.cursor.peek(k)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token.kind == kind
    }

    /// Predicate that tests whether the current token is a `kind` and eats it if yes as a side effect.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.next(); // eat token
            true
        } else {
            false
        }
    }

    /// Eats a `kind` token. Otherwise reports that `expected` was expected and discards tokens until
    /// either a `kind` (which is eaten) or a token in `follow` shows up.
    /// Returns `true` if a `kind` token was eventually eaten.
    fn expect(&mut self, kind: TokenKind, expected: &str, follow: &[TokenKind]) -> bool {
        if self.eat(kind) {
            return true;
        }

        self.unexpected(expected);
        loop {
            let current = self.current_token.kind;
            if current == kind {
                self.next();
                return true;
            } else if current == TokenKind::Eof || follow.contains(&current) {
                return false;
            }
            self.next();
        }
    }

    /// Discards tokens until one in `follow` (or EOF) is found.
    fn skip_until(&mut self, follow: &[TokenKind]) {
        while !self.check(TokenKind::Eof) && !follow.contains(&self.current_token.kind) {
            self.next();
        }
    }

    /// Discards the current token if nothing was consumed since `mark`. Every loop over a
    /// nonterminal calls this so that it always moves forward.
    fn ensure_progress(&mut self, mark: usize) {
        if self.consumed == mark && !self.check(TokenKind::Eof) {
            self.next();
        }
    }

    /// Raises an unexpected token error.
    fn unexpected(&self, expected: &str) {
        self.error_at_current(format!("expected {}, found {}", expected, self.current_token));
    }

    /// Reports a syntax error blaming the current token.
    fn error_at_current(&self, message: impl ToString) {
        self.error_at(message, &self.current_token);
    }

    fn error_at(&self, message: impl ToString, token: &Token) {
        let lexeme = match token.kind {
            TokenKind::Eof => "EOF",
            _ => token.lexeme.as_str(),
        };
        self.source
            .errors
            .add_error(Diagnostic::syntax(message, lexeme, token.position()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use minic_source::Position;

    /// Renders an expression as an s-expression so that tree shape is easy to assert on.
    fn sexp(expr: &Expr) -> String {
        match expr {
            Expr::IntLit(val) => val.to_string(),
            Expr::FloatLit(val) => format!("{:?}", val),
            Expr::BoolLit(val) => val.to_string(),
            Expr::Identifier(ident) => ident.name.clone(),
            Expr::Unary { op, operand, .. } => {
                let op = match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Not => "!",
                };
                format!("({} {})", op, sexp(operand))
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                format!("({} {} {})", op.symbol(), sexp(lhs), sexp(rhs))
            }
            Expr::Assignment { name, value } => format!("(= {} {})", name.name, sexp(value)),
            Expr::Call { callee, args } => {
                let args: String = args.iter().map(|arg| format!(" {}", sexp(arg))).collect();
                format!("(call {}{})", callee.name, args)
            }
            Expr::Error => "<error>".to_string(),
        }
    }

    fn expr(source: &str) -> String {
        let source = source.into();
        let expr = Parser::new(&source).parse_expr();
        assert!(source.has_no_errors(), "{}", source.errors);
        sexp(&expr)
    }

    fn program(source: &str) -> (Program, Vec<Diagnostic>) {
        let source = source.into();
        let program = Parser::new(&source).parse_program();
        let errors = source.errors.diagnostics();
        (program, errors)
    }

    fn function_names(program: &Program) -> Vec<&str> {
        program
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Function(def) => Some(def.signature.name.name.as_str()),
                Item::Variable(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_literal() {
        assert_snapshot!(expr("true"), @"true");
        assert_snapshot!(expr("false"), @"false");
        assert_snapshot!(expr("1"), @"1");
        assert_snapshot!(expr("2.5"), @"2.5");
        assert_snapshot!(expr(".5"), @"0.5");
    }

    #[test]
    fn test_binary_associativity() {
        assert_snapshot!(expr("1 - 2 - 3"), @"(- (- 1 2) 3)");
        assert_snapshot!(expr("8 / 4 / 2"), @"(/ (/ 8 4) 2)");
        assert_snapshot!(expr("a || b || c"), @"(|| (|| a b) c)");
        assert_snapshot!(expr("a = b = c"), @"(= a (= b c))");
    }

    #[test]
    fn test_binary_precedence() {
        assert_snapshot!(expr("1 + 2 * 3"), @"(+ 1 (* 2 3))");
        assert_snapshot!(expr("(1 + 2) * 3"), @"(* (+ 1 2) 3)");
        assert_snapshot!(expr("true && false || true"), @"(|| (&& true false) true)");
        assert_snapshot!(expr("a < b == c > d"), @"(== (< a b) (> c d))");
        assert_snapshot!(expr("x = 1 + 2 % 3 - 4"), @"(= x (- (+ 1 (% 2 3)) 4))");
    }

    #[test]
    fn test_comparison_chain_is_accepted() {
        assert_snapshot!(expr("1 < 2 < 3"), @"(< (< 1 2) 3)");
    }

    #[test]
    fn test_unary() {
        assert_snapshot!(expr("-x * !y"), @"(* (- x) (! y))");
        assert_snapshot!(expr("--x"), @"(- (- x))");
        assert_snapshot!(expr("!a && b"), @"(&& (! a) b)");
    }

    #[test]
    fn test_call_and_identifier_lookahead() {
        assert_snapshot!(expr("f()"), @"(call f)");
        assert_snapshot!(expr("f(1, g(x), y = 2)"), @"(call f 1 (call g x) (= y 2))");
        assert_snapshot!(expr("a + b"), @"(+ a b)");
        assert_snapshot!(expr("(a = 3) * 2"), @"(* (= a 3) 2)");
    }

    #[test]
    fn test_assignment_needs_identifier_target() {
        let (_, errors) = program("int f(void) { int a; 1 + a = 3; return a; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].lexeme.as_deref(), Some("="));
    }

    #[test]
    fn test_declaration_vs_function() {
        let (program, errors) = program(
            "extern int print_int(int x);\n\
             int x;\n\
             int f(void) { return x; }\n\
             float y;\n\
             void g(int a, float b) { }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(program.externs.len(), 1);
        assert_eq!(program.items.len(), 4);
        assert!(matches!(&program.items[0], Item::Variable(decl) if decl.name.name == "x" && decl.ty == TypeName::Int));
        assert!(matches!(&program.items[2], Item::Variable(decl) if decl.name.name == "y" && decl.ty == TypeName::Float));
        assert_eq!(function_names(&program), vec!["f", "g"]);
    }

    #[test]
    fn test_void_parameter_marker() {
        let (program, errors) = program("int f(void) { return 1; }");
        assert!(errors.is_empty());
        match &program.items[0] {
            Item::Function(def) => {
                assert_eq!(
                    def.signature.params,
                    vec![Parameter {
                        ty: TypeName::Void,
                        name: None
                    }]
                );
                assert_eq!(def.signature.named_params().count(), 0);
            }
            item => panic!("expected a function, got {:?}", item),
        }
    }

    #[test]
    fn test_empty_parameter_list_is_an_error() {
        let (program, errors) = program("int f() { return 1; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(function_names(&program), vec!["f"]);
    }

    #[test]
    fn test_missing_paren_after_parameters() {
        let (program, errors) = program(
            "int add(int a, int b {\n  return a + b;\n}\nint main(void) {\n  return add(1, 2);\n}",
        );
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].lexeme.as_deref(), Some("{"));
        assert_eq!(errors[0].position, Position::new(1, 22));
        assert_eq!(function_names(&program), vec!["add", "main"]);
    }

    #[test]
    fn test_missing_semicolon_recovers() {
        let (program, errors) = program("int f(void) { int x; x = 1 x = 2; return x; }");
        assert_eq!(errors.len(), 1);
        match &program.items[0] {
            Item::Function(def) => assert_eq!(def.body.statements.len(), 3),
            item => panic!("expected a function, got {:?}", item),
        }
    }

    #[test]
    fn test_unknown_character() {
        let (_, errors) = program("int f(void) { return 1 # 2; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].lexeme.as_deref(), Some("#"));
    }

    #[test]
    fn test_extern_after_global() {
        let (program, errors) = program("int x;\nextern void print(int v);\nvoid f(void) { }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position.line, 2);
        assert_eq!(program.externs.len(), 1);
        assert_eq!(function_names(&program), vec!["f"]);
    }

    #[test]
    fn test_local_declaration_after_statement() {
        let (program, errors) = program("int f(void) { int a; a = 1; int b; return a; }");
        assert_eq!(errors.len(), 1);
        match &program.items[0] {
            Item::Function(def) => {
                assert_eq!(def.body.local_decls.len(), 1);
                assert_eq!(def.body.statements.len(), 2);
            }
            item => panic!("expected a function, got {:?}", item),
        }
    }

    #[test]
    fn test_integer_literal_overflow() {
        let (_, errors) = program("int f(void) { return 2147483648; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].lexeme.as_deref(), Some("2147483648"));

        let (_, errors) = program("int f(void) { return 2147483647; }");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unterminated_block() {
        let (program, errors) = program("int f(void) { return 1;\nint g(void) { return 2; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(function_names(&program), vec!["f", "g"]);
    }

    #[test]
    fn test_statements() {
        let (program, errors) = program(
            "void f(int n) {\n\
               bool done;\n\
               ;\n\
               { n = n - 1; }\n\
               if (n > 0) { n = 0; } else { n = 1; }\n\
               while (n < 10) n = n + 1;\n\
               return;\n\
             }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let body = match &program.items[0] {
            Item::Function(def) => &def.body,
            item => panic!("expected a function, got {:?}", item),
        };
        assert_eq!(body.local_decls.len(), 1);
        assert!(matches!(body.statements[0], Stmt::Empty));
        assert!(matches!(body.statements[1], Stmt::Block(_)));
        assert!(matches!(&body.statements[2], Stmt::If { else_block: Some(_), .. }));
        assert!(matches!(&body.statements[3], Stmt::While { body, .. } if matches!(**body, Stmt::Expr(_))));
        assert!(matches!(body.statements[4], Stmt::Return { value: None, .. }));
    }

    #[test]
    fn test_garbage_at_top_level() {
        let (program, errors) = program("x = 1; int y;");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.items.len(), 1);
    }

    #[test]
    fn test_unexpected_eof() {
        let (_, errors) = program("int f(void) { return 1 +");
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.lexeme.as_deref() == Some("EOF")));
    }
}
