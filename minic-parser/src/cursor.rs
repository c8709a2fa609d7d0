//! Buffered access to the token stream.

use crate::lexer::{Lexer, Token};
use std::collections::VecDeque;

/// Wraps a [`Lexer`] with a queue of pending tokens, allowing the parser to look ahead any number
/// of tokens and to put a consumed token back.
pub struct TokenCursor<'a> {
    lexer: Lexer<'a>,
    /// Tokens already produced by the lexer but not yet handed out by [`Self::advance`].
    pending: VecDeque<Token>,
}

impl<'a> TokenCursor<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            pending: VecDeque::new(),
        }
    }

    /// Consumes and returns the next token.
    pub fn advance(&mut self) -> Token {
        match self.pending.pop_front() {
            Some(token) => token,
            None => self.lexer.next_token(),
        }
    }

    /// Puts `token` back so that the next call to [`Self::advance`] returns it.
    pub fn push_back(&mut self, token: Token) {
        self.pending.push_front(token);
    }

    /// Returns the `k`-th upcoming token (0 is the one [`Self::advance`] would return) without
    /// consuming anything.
    pub fn peek(&mut self, k: usize) -> &Token {
        while self.pending.len() <= k {
            let token = self.lexer.next_token();
            self.pending.push_back(token);
        }
        &self.pending[k]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn cursor(source: &str) -> TokenCursor {
        TokenCursor::new(Lexer::new(source))
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut cursor = cursor("int x ;");
        assert_eq!(cursor.peek(2).kind, TokenKind::Semi);
        assert_eq!(cursor.peek(0).kind, TokenKind::Int);
        assert_eq!(cursor.advance().kind, TokenKind::Int);
        assert_eq!(cursor.advance().kind, TokenKind::Identifier);
        assert_eq!(cursor.advance().kind, TokenKind::Semi);
        assert_eq!(cursor.advance().kind, TokenKind::Eof);
    }

    #[test]
    fn test_push_back() {
        let mut cursor = cursor("a = 1");
        let a = cursor.advance();
        let assign = cursor.advance();
        cursor.push_back(assign);
        cursor.push_back(a.clone());
        assert_eq!(cursor.advance(), a);
        assert_eq!(cursor.advance().kind, TokenKind::Assign);
        assert_eq!(cursor.advance().lexeme, "1");
    }

    #[test]
    fn test_peek_past_eof() {
        let mut cursor = cursor("x");
        assert_eq!(cursor.peek(5).kind, TokenKind::Eof);
        assert_eq!(cursor.advance().kind, TokenKind::Identifier);
        assert_eq!(cursor.advance().kind, TokenKind::Eof);
        assert_eq!(cursor.advance().kind, TokenKind::Eof);
    }
}
