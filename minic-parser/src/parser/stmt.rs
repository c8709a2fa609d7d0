use super::*;

/// Where to resume after a block missing its `{`.
const BLOCK_OPEN_FOLLOW: &[TokenKind] = STMT_FOLLOW;

impl<'a> Parser<'a> {
    /// Parses `{ local_decl* stmt* }`.
    pub fn parse_block(&mut self) -> Block {
        self.expect(TokenKind::OpenBrace, "'{' to start block", BLOCK_OPEN_FOLLOW);

        let mut block = Block::default();
        while self.current_token.kind.is_var_type() && !self.at_function_start() {
            block.local_decls.extend(self.parse_var_decl());
        }

        while !self.check(TokenKind::CloseBrace) && !self.check(TokenKind::Eof) {
            if self.at_function_start() {
                // the block was never closed, leave the next function to the caller
                break;
            }

            let mark = self.consumed;
            if self.current_token.kind.is_var_type() {
                self.error_at_current("local declarations must come before statements");
                self.parse_var_decl();
            } else {
                block.statements.push(self.parse_stmt());
            }
            self.ensure_progress(mark);
        }

        self.expect(TokenKind::CloseBrace, "'}' to close block", DECL_START);
        block
    }

    /// Parses a statement.
    pub fn parse_stmt(&mut self) -> Stmt {
        match self.current_token.kind {
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::OpenBrace => Stmt::Block(self.parse_block()),
            TokenKind::Semi => {
                self.next();
                Stmt::Empty
            }
            kind if EXPR_START.contains(&kind) => {
                // expression statement
                let expr = self.parse_expr();
                self.expect(TokenKind::Semi, "';' after expression", STMT_FOLLOW);
                Stmt::Expr(expr)
            }
            kind => {
                self.unexpected("a statement");
                if kind != TokenKind::CloseBrace && kind != TokenKind::Eof {
                    self.next();
                }
                Stmt::Error
            }
        }
    }

    /// `void`, `extern` or `type ident (` cannot appear inside a function body: they mean a block was
    /// left unclosed.
    fn at_function_start(&mut self) -> bool {
        match self.current_token.kind {
            TokenKind::Void | TokenKind::Extern => true,
            kind if kind.is_var_type() => self.peek(1).kind == TokenKind::OpenParen,
            _ => false,
        }
    }

    /// Parses `( expr )` after `if` or `while`.
    fn parse_condition(&mut self, keyword: &str) -> Expr {
        let opened = self.expect(
            TokenKind::OpenParen,
            &format!("'(' after '{}'", keyword),
            &[
                TokenKind::Identifier,
                TokenKind::IntLit,
                TokenKind::FloatLit,
                TokenKind::BoolLit,
                TokenKind::Minus,
                TokenKind::Not,
                TokenKind::CloseParen,
                TokenKind::OpenBrace,
            ],
        );
        if !opened && self.check(TokenKind::OpenBrace) {
            return Expr::Error;
        }

        let condition = self.parse_expr();
        self.expect(
            TokenKind::CloseParen,
            &format!("')' after '{}' condition", keyword),
            &[TokenKind::OpenBrace, TokenKind::CloseBrace, TokenKind::Semi],
        );
        condition
    }

    fn parse_if_stmt(&mut self) -> Stmt {
        let position = self.next().position(); // eat 'if'
        let condition = self.parse_condition("if");
        let then_block = self.parse_block();
        let else_block = if self.eat(TokenKind::Else) {
            Some(self.parse_block())
        } else {
            None
        };

        Stmt::If {
            condition,
            then_block,
            else_block,
            position,
        }
    }

    fn parse_while_stmt(&mut self) -> Stmt {
        let position = self.next().position(); // eat 'while'
        let condition = self.parse_condition("while");
        let body = Box::new(self.parse_stmt());

        Stmt::While {
            condition,
            body,
            position,
        }
    }

    fn parse_return_stmt(&mut self) -> Stmt {
        let position = self.next().position(); // eat 'return'
        let value = if self.check(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semi, "';' after return statement", STMT_FOLLOW);

        Stmt::Return { value, position }
    }
}
