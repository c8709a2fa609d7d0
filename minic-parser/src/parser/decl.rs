use super::*;

/// Where to resume after a variable declaration missing its `;`.
const VAR_DECL_FOLLOW: &[TokenKind] = STMT_FOLLOW;

/// Where to resume after a missing `(` in a parameter list.
const PARAMS_OPEN_FOLLOW: &[TokenKind] = &[
    TokenKind::Void,
    TokenKind::Int,
    TokenKind::Bool,
    TokenKind::Float,
    TokenKind::CloseParen,
    TokenKind::OpenBrace,
    TokenKind::Semi,
];

fn type_name(kind: TokenKind) -> Option<TypeName> {
    match kind {
        TokenKind::Int => Some(TypeName::Int),
        TokenKind::Bool => Some(TypeName::Bool),
        TokenKind::Float => Some(TypeName::Float),
        TokenKind::Void => Some(TypeName::Void),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    /// Parses a whole translation unit:
    /// `extern_decl* (global_decl | function_def)* EOF`.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while self.check(TokenKind::Extern) {
            program.externs.extend(self.parse_extern());
        }

        while !self.check(TokenKind::Eof) {
            let mark = self.consumed;
            match self.current_token.kind {
                TokenKind::Extern => {
                    self.error_at_current("extern declarations must come before all other declarations");
                    program.externs.extend(self.parse_extern());
                }
                TokenKind::Void => {
                    program.items.extend(self.parse_function_def().map(Item::Function));
                }
                kind if kind.is_var_type() => {
                    // `type ident ;` is a variable, anything else after the identifier is a function
                    if self.peek(1).kind == TokenKind::Semi {
                        program.items.extend(self.parse_var_decl().map(Item::Variable));
                    } else {
                        program.items.extend(self.parse_function_def().map(Item::Function));
                    }
                }
                _ => {
                    self.unexpected("a declaration");
                    self.skip_until(DECL_START);
                }
            }
            self.ensure_progress(mark);
        }

        program
    }

    /// Parses `extern type ident ( params ) ;`.
    fn parse_extern(&mut self) -> Option<FunctionSignature> {
        self.next(); // eat 'extern'
        let return_type = self.parse_return_type();
        let name = self.expect_ident("a function name");
        let params = self.parse_param_list().unwrap_or_default();
        self.expect(TokenKind::Semi, "';' after extern declaration", DECL_START);

        Some(FunctionSignature {
            return_type: return_type?,
            name: name?,
            params,
        })
    }

    /// Parses `type ident ( params ) block`.
    fn parse_function_def(&mut self) -> Option<FunctionDef> {
        let return_type = self.parse_return_type();
        let name = self.expect_ident("a function name");
        let params = self.parse_param_list();
        if params.is_none() && self.eat(TokenKind::Semi) {
            // something like `int x = 1;` that is neither a variable nor a function
            return None;
        }
        let body = self.parse_block();

        Some(FunctionDef {
            signature: FunctionSignature {
                return_type: return_type?,
                name: name?,
                params: params.unwrap_or_default(),
            },
            body,
        })
    }

    /// Parses `type ident ;` where `type` is not `void`. Used for globals and locals alike.
    pub(super) fn parse_var_decl(&mut self) -> Option<VariableDecl> {
        let ty = type_name(self.next().kind).filter(|ty| *ty != TypeName::Void);
        let name = self.expect_ident("a variable name");
        self.expect(TokenKind::Semi, "';' after variable declaration", VAR_DECL_FOLLOW);

        Some(VariableDecl { ty: ty?, name: name? })
    }

    fn parse_return_type(&mut self) -> Option<TypeName> {
        match type_name(self.current_token.kind) {
            Some(ty) => {
                self.next();
                Some(ty)
            }
            None => {
                self.unexpected("a return type");
                None
            }
        }
    }

    pub(super) fn expect_ident(&mut self, expected: &str) -> Option<Ident> {
        if self.check(TokenKind::Identifier) {
            let token = self.next();
            Some(Ident {
                position: token.position(),
                name: token.lexeme,
            })
        } else {
            self.unexpected(expected);
            None
        }
    }

    /// Parses `( void )` or `( type ident {, type ident} )`.
    /// Returns `None` if there was no `(` and no parameter list to recover.
    fn parse_param_list(&mut self) -> Option<Vec<Parameter>> {
        if !self.expect(TokenKind::OpenParen, "'(' to start parameter list", PARAMS_OPEN_FOLLOW)
            && (self.check(TokenKind::OpenBrace) || self.check(TokenKind::Semi))
        {
            return None;
        }

        let params = match self.current_token.kind {
            TokenKind::Void => {
                self.next();
                vec![Parameter {
                    ty: TypeName::Void,
                    name: None,
                }]
            }
            TokenKind::CloseParen => {
                self.error_at_current("empty parameter list, use 'void' for a function without parameters");
                Vec::new()
            }
            _ => self.parse_params(),
        };
        self.expect(
            TokenKind::CloseParen,
            "')' after parameter list",
            &[TokenKind::OpenBrace, TokenKind::Semi],
        );

        Some(params)
    }

    fn parse_params(&mut self) -> Vec<Parameter> {
        let mut params = Vec::new();
        loop {
            params.extend(self.parse_param());
            if !self.eat(TokenKind::Comma) {
                break params;
            }
        }
    }

    fn parse_param(&mut self) -> Option<Parameter> {
        let ty = match self.current_token.kind {
            kind if kind.is_var_type() => {
                self.next();
                type_name(kind)?
            }
            _ => {
                self.unexpected("a parameter type");
                self.skip_until(&[
                    TokenKind::Comma,
                    TokenKind::CloseParen,
                    TokenKind::OpenBrace,
                    TokenKind::Semi,
                ]);
                return None;
            }
        };
        let name = self.expect_ident("a parameter name")?;

        Some(Parameter { ty, name: Some(name) })
    }
}
