use crate::lexer::token::{
    delimiter_chars, is_numeric_literal, one_char_operators, two_char_operator_prefixes, Token,
    TokenKind,
};

/// Tokenizes SQL text into a flat, whitespace-free, comment-free token
/// stream. `sql` may be absent (the source's "null SQL") or empty; both
/// yield an empty token list without error, same as whitespace-only input.
pub fn tokenize(sql: Option<&str>) -> Vec<Token> {
    let Some(sql) = sql else {
        return Vec::new();
    };
    tracing::trace!(len = sql.len(), "tokenizing sql");
    Tokenizer::new(sql).run()
}

struct Tokenizer<'a> {
    input: &'a str,
    chars: std::str::Chars<'a>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars(),
            position: 0,
        }
    }

    fn run(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.position;
            let Some(c) = self.peek() else { break };

            let token = match c {
                '\'' | '"' => self.read_quoted(c),
                '0'..='9' => self.read_number(start),
                c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(start),
                c if delimiter_chars().contains(&c) => {
                    self.advance();
                    Token::new(TokenKind::Delimiter, c.to_string(), start, self.position)
                }
                _ => self.read_operator(start),
            };
            tokens.push(token);
        }
        tokens
    }

    /// Consumes whitespace and comments between tokens.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    self.advance();
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => break,
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_quoted(&mut self, quote: char) -> Token {
        let start = self.position;
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None => break, // unterminated: token spans to end of input
                Some(c) if c == quote => {
                    if self.peek_at(1) == Some(quote) {
                        self.advance();
                        self.advance();
                        continue;
                    }
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let text = &self.input[start..self.position];
        Token::new(TokenKind::StringLiteral, text, start, self.position)
    }

    fn read_number(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.input[start..self.position];
        debug_assert!(is_numeric_literal(text));
        Token::new(TokenKind::NumericLiteral, text, start, self.position)
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        self.advance();
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let text = &self.input[start..self.position];
        Token::new(TokenKind::Identifier, text, start, self.position)
    }

    fn read_operator(&mut self, start: usize) -> Token {
        if let Some(two) = self.peek_two() {
            if two_char_operator_prefixes().contains(&two.as_str()) {
                self.advance();
                self.advance();
                return Token::new(TokenKind::Operator, two, start, self.position);
            }
        }
        let c = self.peek().expect("read_operator called at end of input");
        if one_char_operators().contains(&c) {
            self.advance();
            return Token::new(TokenKind::Operator, c.to_string(), start, self.position);
        }
        // Unrecognized byte: consume it as a one-character operator-shaped
        // token rather than looping forever; callers that care about strict
        // validity will reject it downstream (e.g. as an unresolved column).
        self.advance();
        Token::new(TokenKind::Operator, c.to_string(), start, self.position)
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n)
    }

    fn peek_two(&self) -> Option<String> {
        let mut chars = self.chars.clone();
        let a = chars.next()?;
        let b = chars.next()?;
        Some([a, b].iter().collect())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::TokenKind;

    #[test]
    fn empty_and_null_and_whitespace_yield_no_tokens() {
        assert_eq!(tokenize(None), Vec::new());
        assert_eq!(tokenize(Some("")), Vec::new());
        assert_eq!(tokenize(Some("   \n\t ")), Vec::new());
    }

    #[test]
    fn simple_select() {
        let tokens = tokenize(Some("SELECT name FROM users"));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["SELECT", "name", "FROM", "users"]);
    }

    #[test]
    fn strips_comments() {
        let tokens = tokenize(Some("SELECT 1 -- trailing comment\nFROM t /* block */ WHERE 1=1"));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["SELECT", "1", "FROM", "t", "WHERE", "1", "=", "1"]
        );
    }

    #[test]
    fn unterminated_string_spans_to_end_of_input() {
        let tokens = tokenize(Some("SELECT 'unterminated FROM users"));
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "SELECT");
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].text, "'unterminated FROM users");
    }

    #[test]
    fn doubled_quote_is_escaped() {
        let tokens = tokenize(Some("'it''s'"));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "'it''s'");
    }

    #[test]
    fn two_char_operators_preferred() {
        let tokens = tokenize(Some("a <> b <= c >= d != e"));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "<>", "b", "<=", "c", ">=", "d", "!=", "e"]);
    }

    #[test]
    fn parens_and_commas_split_even_when_abutting_letters() {
        let tokens = tokenize(Some("COUNT(*),SUM(x)"));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["COUNT", "(", "*", ")", ",", "SUM", "(", "x", ")"]
        );
    }

    #[test]
    fn decimal_number() {
        let tokens = tokenize(Some("3.14"));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::NumericLiteral);
        assert_eq!(tokens[0].text, "3.14");
    }
}
