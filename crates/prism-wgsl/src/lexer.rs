// ── Token ─────────────────────────────────────────────────────────────────

/// A WGSL token as far as binding analysis is concerned.
///
/// Only identifiers, numbers and single-character punctuation are
/// distinguished. Multi-character operators (`->`, `<=`, `&&`) come out as
/// consecutive `Punct` tokens, which is enough for the declaration shapes the
/// scanner recognizes.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Numeric literal, kept verbatim (suffixes such as `u`, `f`, `i` included).
    Number(String),
    Punct(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPos {
    pub token: Token,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub col: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

/// Comment-aware WGSL tokenizer.
///
/// The lexer never fails: malformed input (stray characters, an unterminated
/// block comment) still yields a token stream so that binding analysis can
/// proceed and the real compiler reports the problem with full context.
pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, col: 1 }
    }

    pub fn tokenize(mut self) -> Vec<TokenWithPos> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let (line, col) = (self.line, self.col);
            let token = self.next_token();
            let eof = token == Token::Eof;
            tokens.push(TokenWithPos { token, line, col });
            if eof {
                break;
            }
        }
        tokens
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.rest().chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            if self.rest().starts_with("//") {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.advance();
                }
            } else if self.rest().starts_with("/*") {
                self.skip_block_comment();
            } else {
                break;
            }
        }
    }

    // WGSL block comments nest.
    fn skip_block_comment(&mut self) {
        let mut depth = 0usize;
        loop {
            if self.rest().starts_with("/*") {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.rest().starts_with("*/") {
                self.advance();
                self.advance();
                depth -= 1;
                if depth == 0 {
                    break;
                }
            } else if self.advance().is_none() {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Token {
        let Some(ch) = self.peek() else {
            return Token::Eof;
        };

        if ch.is_ascii_digit() || (ch == '.' && self.next_is_digit()) {
            return self.lex_number();
        }
        if ch.is_alphabetic() || ch == '_' {
            return self.lex_ident();
        }

        self.advance();
        Token::Punct(ch)
    }

    fn next_is_digit(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next();
        matches!(chars.next(), Some(c) if c.is_ascii_digit())
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        // Hex literals, decimal, exponents and type suffixes are all swallowed
        // here; the scanner only needs integer values for `@group`/`@binding`.
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+')
                && matches!(self.src[..self.pos].chars().last(), Some('e' | 'E'))
                && !self.src[start..self.pos].starts_with("0x");
            if c.is_ascii_alphanumeric() || c == '.' || exponent_sign {
                self.advance();
            } else {
                break;
            }
        }
        Token::Number(self.src[start..self.pos].to_string())
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.token).collect()
    }

    fn ident(s: &str) -> Token {
        Token::Ident(s.to_string())
    }

    #[test]
    fn splits_attribute_and_identifiers() {
        assert_eq!(
            kinds("@group(1)"),
            vec![
                Token::Punct('@'),
                ident("group"),
                Token::Punct('('),
                Token::Number("1".into()),
                Token::Punct(')'),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_nested_block_comments() {
        let toks = kinds("a // globals.time\n/* outer /* inner */ still */ b");
        assert_eq!(toks, vec![ident("a"), ident("b"), Token::Eof]);
    }

    #[test]
    fn unterminated_block_comment_reaches_eof() {
        assert_eq!(kinds("x /* never closed"), vec![ident("x"), Token::Eof]);
    }

    #[test]
    fn numbers_keep_suffix_and_exponent() {
        assert_eq!(
            kinds("1.5e-3 0x1Fu 2u .5"),
            vec![
                Token::Number("1.5e-3".into()),
                Token::Number("0x1Fu".into()),
                Token::Number("2u".into()),
                Token::Number(".5".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = Lexer::new("a\n  b").tokenize();
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
    }
}
