use super::*;

fn or_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::OrOr => Some(BinaryOp::Or),
        _ => None,
    }
}

fn and_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::AndAnd => Some(BinaryOp::And),
        _ => None,
    }
}

fn equality_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::EqualsEquals => Some(BinaryOp::Eq),
        TokenKind::NotEquals => Some(BinaryOp::Ne),
        _ => None,
    }
}

fn relational_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::LessThan => Some(BinaryOp::Lt),
        TokenKind::LessThanEquals => Some(BinaryOp::Le),
        TokenKind::GreaterThan => Some(BinaryOp::Gt),
        TokenKind::GreaterThanEquals => Some(BinaryOp::Ge),
        _ => None,
    }
}

fn additive_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Asterisk => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Rem),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    /* Expressions */
    /// Parses any expression, assignments included.
    pub fn parse_expr(&mut self) -> Expr {
        if self.check(TokenKind::Identifier) {
            let ident = self.next();
            if self.eat(TokenKind::Assign) {
                let value = self.parse_expr(); // right associative
                return Expr::Assignment {
                    name: Ident {
                        position: ident.position(),
                        name: ident.lexeme,
                    },
                    value: Box::new(value),
                };
            }
            // not an assignment, put the identifier back
            self.unread(ident);
        }

        self.parse_rval()
    }

    /// Parses one level of the binary operator ladder as a left fold:
    /// `operand (op operand)*` becomes `((operand op operand) op operand)`.
    fn parse_left_assoc(
        &mut self,
        op_for: fn(TokenKind) -> Option<BinaryOp>,
        operand: fn(&mut Self) -> Expr,
    ) -> Expr {
        let mut lhs = operand(self);

        while let Some(op) = op_for(self.current_token.kind) {
            let position = self.next().position();
            let rhs = operand(self);

            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }

        lhs
    }

    /// `||`
    fn parse_rval(&mut self) -> Expr {
        self.parse_left_assoc(or_op, Self::parse_term)
    }

    /// `&&`
    fn parse_term(&mut self) -> Expr {
        self.parse_left_assoc(and_op, Self::parse_equivalence)
    }

    /// `==` and `!=`
    fn parse_equivalence(&mut self) -> Expr {
        self.parse_left_assoc(equality_op, Self::parse_relational)
    }

    /// `<`, `<=`, `>` and `>=`
    fn parse_relational(&mut self) -> Expr {
        self.parse_left_assoc(relational_op, Self::parse_subexpr)
    }

    /// `+` and `-`
    fn parse_subexpr(&mut self) -> Expr {
        self.parse_left_assoc(additive_op, Self::parse_factor)
    }

    /// `*`, `/` and `%`
    fn parse_factor(&mut self) -> Expr {
        self.parse_left_assoc(multiplicative_op, Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Expr {
        // NOTE: prefix operators are handled here
        let op = match self.current_token.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_element(),
        };
        let position = self.next().position();

        Expr::Unary {
            op,
            operand: Box::new(self.parse_unary()),
            position,
        }
    }

    /// Parses a literal, a variable, a call or a parenthesized expression.
    fn parse_element(&mut self) -> Expr {
        match self.current_token.kind {
            TokenKind::IntLit => {
                let token = self.next();
                match token.lexeme.parse::<i32>() {
                    Ok(val) => Expr::IntLit(val),
                    Err(_) => {
                        self.error_at("integer literal does not fit in 32 bits", &token);
                        Expr::Error
                    }
                }
            }
            TokenKind::FloatLit => {
                let token = self.next();
                match token.lexeme.parse::<f32>() {
                    Ok(val) => Expr::FloatLit(val),
                    Err(_) => {
                        self.error_at("malformed float literal", &token);
                        Expr::Error
                    }
                }
            }
            TokenKind::BoolLit => Expr::BoolLit(self.next().lexeme == "true"),
            TokenKind::Identifier => self.parse_identifier_or_call_expr(),
            TokenKind::OpenParen => {
                self.next();
                let expr = self.parse_expr();
                self.expect(TokenKind::CloseParen, "')' to close parenthesized expression", EXPR_FOLLOW);
                expr
            }
            kind => {
                self.unexpected("an expression");
                if !matches!(
                    kind,
                    TokenKind::Semi
                        | TokenKind::Comma
                        | TokenKind::CloseParen
                        | TokenKind::OpenBrace
                        | TokenKind::CloseBrace
                        | TokenKind::Eof
                ) {
                    self.next();
                }
                Expr::Error
            }
        }
    }

    /* Expressions.Identifier */
    fn parse_identifier_or_call_expr(&mut self) -> Expr {
        let token = self.next();
        let ident = Ident {
            position: token.position(),
            name: token.lexeme,
        };

        if !self.eat(TokenKind::OpenParen) {
            return Expr::Identifier(ident);
        }

        let mut args = Vec::new();
        if !self.eat(TokenKind::CloseParen) {
            loop {
                args.push(self.parse_expr());

                if self.eat(TokenKind::Comma) {
                    continue;
                }
                self.expect(
                    TokenKind::CloseParen,
                    "',' or ')' in argument list",
                    &[TokenKind::Semi, TokenKind::OpenBrace, TokenKind::CloseBrace],
                );
                break;
            }
        }

        Expr::Call { callee: ident, args }
    }
}
