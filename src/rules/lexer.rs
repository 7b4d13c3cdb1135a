use crate::rules::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    /// The body of a `/…/` literal; empty for a deletion codomain.
    Phonemes(String),
    Arrow,
    DArrow,
    Pipe,
    Amp,
    Bang,
    Underscore,
    Hash,
    At,
    Dot,
    Comma,
    Semicolon,
    Equals,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Plus,
    Minus,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.line, self.column, message)
    }
}

/// Splits a rule program into located tokens. A `#` at the start of a line
/// begins a comment; elsewhere it is the word-boundary marker. Whitespace is
/// insignificant outside quoted strings and phoneme literals.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut scanner = Scanner {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();

    while let Some(c) = scanner.peek() {
        let line = scanner.line;
        let column = scanner.column;

        if c.is_whitespace() {
            scanner.bump();
            continue;
        }
        if c == '#' {
            // '#' is the boundary marker inside conditions, but a comment
            // when it starts a line.
            if column == 1 {
                while let Some(c) = scanner.peek() {
                    if c == '\n' {
                        break;
                    }
                    scanner.bump();
                }
                continue;
            }
            scanner.bump();
            tokens.push(Token {
                kind: TokenKind::Hash,
                line,
                column,
            });
            continue;
        }

        let kind = match c {
            '"' => {
                scanner.bump();
                let mut text = String::new();
                loop {
                    match scanner.bump() {
                        Some('"') => break,
                        Some(c) => text.push(c),
                        None => return Err(scanner.error("unterminated string")),
                    }
                }
                TokenKind::Str(text)
            }
            '/' => {
                scanner.bump();
                let mut body = String::new();
                loop {
                    match scanner.bump() {
                        Some('/') => break,
                        Some(c) => body.push(c),
                        None => return Err(scanner.error("unterminated phoneme literal")),
                    }
                }
                TokenKind::Phonemes(body)
            }
            '-' => {
                scanner.bump();
                if scanner.peek() == Some('>') {
                    scanner.bump();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '=' => {
                scanner.bump();
                if scanner.peek() == Some('>') {
                    scanner.bump();
                    TokenKind::DArrow
                } else {
                    TokenKind::Equals
                }
            }
            '|' => {
                scanner.bump();
                TokenKind::Pipe
            }
            '&' => {
                scanner.bump();
                TokenKind::Amp
            }
            '!' => {
                scanner.bump();
                TokenKind::Bang
            }
            '@' => {
                scanner.bump();
                TokenKind::At
            }
            '.' => {
                scanner.bump();
                TokenKind::Dot
            }
            ',' => {
                scanner.bump();
                TokenKind::Comma
            }
            ';' => {
                scanner.bump();
                TokenKind::Semicolon
            }
            '{' => {
                scanner.bump();
                TokenKind::LBrace
            }
            '}' => {
                scanner.bump();
                TokenKind::RBrace
            }
            '[' => {
                scanner.bump();
                TokenKind::LBracket
            }
            ']' => {
                scanner.bump();
                TokenKind::RBracket
            }
            '(' => {
                scanner.bump();
                TokenKind::LParen
            }
            ')' => {
                scanner.bump();
                TokenKind::RParen
            }
            '+' => {
                scanner.bump();
                TokenKind::Plus
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(c) = scanner.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        scanner.bump();
                    } else {
                        break;
                    }
                }
                match digits.parse::<i64>() {
                    Ok(n) => TokenKind::Int(n),
                    Err(_) => return Err(scanner.error(format!("number '{}' overflows", digits))),
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(c) = scanner.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        scanner.bump();
                    } else {
                        break;
                    }
                }
                if ident == "_" {
                    TokenKind::Underscore
                } else {
                    TokenKind::Ident(ident)
                }
            }
            other => return Err(scanner.error(format!("unexpected character '{}'", other))),
        };

        tokens.push(Token { kind, line, column });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn arrows_and_literals() {
        assert_eq!(
            kinds("/p/ -> /b/"),
            vec![
                TokenKind::Phonemes("p".into()),
                TokenKind::Arrow,
                TokenKind::Phonemes("b".into()),
            ]
        );
    }

    #[test]
    fn conditional_arrow_and_pipe() {
        assert_eq!(
            kinds("=> | & !"),
            vec![
                TokenKind::DArrow,
                TokenKind::Pipe,
                TokenKind::Amp,
                TokenKind::Bang,
            ]
        );
    }

    #[test]
    fn feature_bracket() {
        assert_eq!(
            kinds("[+voice -nasal]"),
            vec![
                TokenKind::LBracket,
                TokenKind::Plus,
                TokenKind::Ident("voice".into()),
                TokenKind::Minus,
                TokenKind::Ident("nasal".into()),
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn underscore_is_its_own_token() {
        assert_eq!(
            kinds("_ _x"),
            vec![TokenKind::Underscore, TokenKind::Ident("_x".into())]
        );
    }

    #[test]
    fn strings_keep_spaces() {
        assert_eq!(
            kinds("NAME \"First Law\""),
            vec![
                TokenKind::Ident("NAME".into()),
                TokenKind::Str("First Law".into()),
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("# a comment\n/p/"),
            vec![TokenKind::Phonemes("p".into())]
        );
    }

    #[test]
    fn hash_mid_line_is_a_boundary() {
        assert_eq!(
            kinds("/s/ _ #"),
            vec![
                TokenKind::Phonemes("s".into()),
                TokenKind::Underscore,
                TokenKind::Hash,
            ]
        );
    }

    #[test]
    fn empty_phoneme_literal() {
        assert_eq!(kinds("//"), vec![TokenKind::Phonemes(String::new())]);
    }

    #[test]
    fn positions_are_tracked() {
        let tokens = tokenize("/p/\n  ->").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn unterminated_literal_errors() {
        assert!(tokenize("/p").is_err());
        assert!(tokenize("\"abc").is_err());
    }

    #[test]
    fn ipa_glyphs_inside_literals() {
        assert_eq!(
            kinds("/a\u{02D0}\u{0283}/"),
            vec![TokenKind::Phonemes("a\u{02D0}\u{0283}".into())]
        );
    }
}
