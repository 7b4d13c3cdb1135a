use crate::features::FeatureValue;
use crate::rules::ast::*;
use crate::rules::lexer::{Token, TokenKind};
use crate::rules::SyntaxError;

/// Parses a token stream into program items.
pub(crate) fn parse(tokens: Vec<Token>) -> Result<Vec<Item>, SyntaxError> {
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(t) => SyntaxError::new(t.line, t.column, message),
            None => SyntaxError::new(1, 1, message),
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, SyntaxError> {
        match self.peek() {
            Some(k) if k == kind => match self.bump() {
                Some(token) => Ok(token),
                None => Err(self.error_here(format!("expected {}", what))),
            },
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(TokenKind::Ident(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.peek_ident() == Some(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_str(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(TokenKind::Str(_)) => match self.bump().map(|t| t.kind) {
                Some(TokenKind::Str(s)) => Ok(s),
                _ => Err(self.error_here(format!("expected {}", what))),
            },
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Item>, SyntaxError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            items.push(self.parse_item()?);
        }
        Ok(items)
    }

    fn parse_item(&mut self) -> Result<Item, SyntaxError> {
        let meta = self.parse_meta_block()?;
        if self.eat_ident("CHANGE") {
            let statements = self.parse_law_body()?;
            Ok(Item::Law(LawDecl { meta, statements }))
        } else if self.eat_ident("GROUP") {
            self.expect_keyword("BEGIN")?;
            let mut laws = Vec::new();
            while !self.peek_is_keyword("END") {
                if self.peek().is_none() {
                    return Err(self.error_here("expected END to close the group"));
                }
                let law_meta = self.parse_meta_block()?;
                self.expect_keyword("CHANGE")?;
                let statements = self.parse_law_body()?;
                laws.push(LawDecl {
                    meta: law_meta,
                    statements,
                });
            }
            self.expect_keyword("END")?;
            Ok(Item::Group(GroupDecl { meta, laws }))
        } else {
            Err(self.error_here("expected CHANGE or GROUP"))
        }
    }

    fn peek_is_keyword(&self, name: &str) -> bool {
        self.peek_ident() == Some(name)
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), SyntaxError> {
        if self.eat_ident(name) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {}", name)))
        }
    }

    fn parse_meta_block(&mut self) -> Result<MetaBlock, SyntaxError> {
        let mut meta = MetaBlock::default();
        loop {
            if self.eat_ident("NAME") {
                meta.name = Some(self.expect_str("a quoted name")?);
            } else if self.eat_ident("DESCRIPTION") {
                meta.description = Some(self.expect_str("a quoted description")?);
            } else if self.eat_ident("DATE") {
                meta.date = Some(self.parse_date_value()?);
            } else if self.eat_ident("WITH") {
                let library = self.expect_str("a quoted library name")?;
                let version = self.expect_str("a quoted library version")?;
                meta.library = Some((library, version));
            } else {
                break;
            }
        }
        Ok(meta)
    }

    fn parse_date_value(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(TokenKind::Int(_)) | Some(TokenKind::Str(_)) => {
                match self.bump().map(|t| t.kind) {
                    Some(TokenKind::Int(n)) => Ok(n.to_string()),
                    Some(TokenKind::Str(s)) => Ok(s),
                    _ => Err(self.error_here("expected a date")),
                }
            }
            _ => Err(self.error_here("expected a date")),
        }
    }

    fn parse_law_body(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        self.expect_keyword("BEGIN")?;
        let mut statements = Vec::new();
        while !self.peek_is_keyword("END") {
            if self.peek().is_none() {
                return Err(self.error_here("expected END to close the law"));
            }
            statements.push(self.parse_statement()?);
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if !self.peek_is_keyword("END") {
                return Err(self.error_here("expected ';' after statement"));
            }
        }
        self.expect_keyword("END")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        if let Some(TokenKind::Ident(_)) = self.peek() {
            return self.parse_call();
        }

        let domain = self.parse_rewrite_term()?;
        if self.eat(&TokenKind::Arrow) {
            let codomain = self.parse_rewrite_term()?;
            let condition = if self.eat(&TokenKind::Pipe) {
                Some(self.parse_condition_list()?)
            } else {
                None
            };
            return Ok(Statement::Rewrite {
                domain,
                codomain,
                condition,
            });
        }

        if self.peek() == Some(&TokenKind::DArrow) {
            let mut branches = Vec::new();
            loop {
                self.expect(&TokenKind::DArrow, "'=>'")?;
                let codomain = self.parse_rewrite_term()?;
                if self.eat(&TokenKind::Pipe) {
                    let condition = self.parse_condition_list()?;
                    branches.push((codomain, condition));
                    if self.peek() != Some(&TokenKind::DArrow) {
                        return Err(
                            self.error_here("conditional needs a default '=>' branch at the end")
                        );
                    }
                } else {
                    return Ok(Statement::Conditional {
                        domain,
                        branches,
                        default: codomain,
                    });
                }
            }
        }

        Err(self.error_here("expected '->' or '=>'"))
    }

    fn parse_call(&mut self) -> Result<Statement, SyntaxError> {
        let name = match self.bump().map(|t| t.kind) {
            Some(TokenKind::Ident(name)) => name,
            _ => return Err(self.error_here("expected a function name")),
        };
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != Some(&TokenKind::RParen) {
            loop {
                args.push(self.parse_call_arg()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Statement::Call { name, args })
    }

    fn parse_call_arg(&mut self) -> Result<CallArg, SyntaxError> {
        match self.peek() {
            Some(TokenKind::Phonemes(_)) => match self.bump().map(|t| t.kind) {
                Some(TokenKind::Phonemes(s)) => Ok(CallArg::Phonemes(s)),
                _ => Err(self.error_here("expected an argument")),
            },
            Some(TokenKind::LBrace) => Ok(CallArg::Set(self.parse_brace_set()?)),
            Some(TokenKind::LBracket) => Ok(CallArg::Features(self.parse_bracket()?)),
            Some(TokenKind::Str(_)) => match self.bump().map(|t| t.kind) {
                Some(TokenKind::Str(s)) => Ok(CallArg::Text(s)),
                _ => Err(self.error_here("expected an argument")),
            },
            Some(TokenKind::Int(_)) | Some(TokenKind::Minus) => {
                let negative = self.eat(&TokenKind::Minus);
                match self.bump().map(|t| t.kind) {
                    Some(TokenKind::Int(n)) => {
                        Ok(CallArg::Number(if negative { -n } else { n }))
                    }
                    _ => Err(self.error_here("expected a number")),
                }
            }
            _ => Err(self.error_here("expected a function argument")),
        }
    }

    fn parse_rewrite_term(&mut self) -> Result<RewriteTerm, SyntaxError> {
        match self.peek() {
            Some(TokenKind::Phonemes(_)) => match self.bump().map(|t| t.kind) {
                Some(TokenKind::Phonemes(s)) => Ok(RewriteTerm::Phonemes(s)),
                _ => Err(self.error_here("expected phonemes")),
            },
            Some(TokenKind::LBrace) => Ok(RewriteTerm::Set(self.parse_brace_set()?)),
            Some(TokenKind::LBracket) => Ok(RewriteTerm::Features(self.parse_bracket()?)),
            _ => Err(self.error_here("expected phonemes, a set, or a feature bracket")),
        }
    }

    fn parse_brace_set(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut elements = Vec::new();
        loop {
            match self.bump().map(|t| t.kind) {
                Some(TokenKind::Phonemes(s)) => elements.push(s),
                _ => return Err(self.error_here("expected a phoneme literal in set")),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(elements)
    }

    fn parse_bracket(&mut self) -> Result<Vec<(String, FeatureValue)>, SyntaxError> {
        self.expect(&TokenKind::LBracket, "'['")?;
        let mut features = Vec::new();
        loop {
            let value = if self.eat(&TokenKind::Plus) {
                FeatureValue::Plus
            } else if self.eat(&TokenKind::Minus) {
                FeatureValue::Minus
            } else if features.is_empty() {
                return Err(self.error_here("expected '+' or '-' before a feature name"));
            } else {
                break;
            };
            match self.bump().map(|t| t.kind) {
                Some(TokenKind::Ident(name)) => features.push((name, value)),
                _ => return Err(self.error_here("expected a feature name")),
            }
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(features)
    }

    fn parse_condition_list(&mut self) -> Result<ConditionList, SyntaxError> {
        let mut terms = vec![self.parse_condition_term(false)?];
        loop {
            if self.eat(&TokenKind::Amp) {
                terms.push(self.parse_condition_term(false)?);
            } else if self.eat(&TokenKind::Pipe) {
                terms.push(self.parse_condition_term(true)?);
            } else {
                break;
            }
        }
        Ok(ConditionList { terms })
    }

    fn parse_condition_term(&mut self, or_joined: bool) -> Result<ConditionTerm, SyntaxError> {
        let negated = self.eat(&TokenKind::Bang);
        let expr = self.parse_condition_expr()?;
        Ok(ConditionTerm {
            or_joined,
            negated,
            expr,
        })
    }

    fn parse_condition_expr(&mut self) -> Result<ConditionExpr, SyntaxError> {
        if self.eat_ident("in") {
            return Ok(ConditionExpr::In(self.parse_index_expr()?));
        }
        if self.peek_is_keyword("Syllable") || self.peek_is_keyword("Phoneme") {
            let left = self.parse_path()?;
            if self.eat_ident("is") {
                let value = self.parse_is_value()?;
                return Ok(ConditionExpr::Is { path: left, value });
            }
            if self.eat(&TokenKind::Equals) {
                let right = self.parse_path()?;
                return Ok(ConditionExpr::Eq { left, right });
            }
            return Err(self.error_here("expected 'is' or '=' after path"));
        }
        self.parse_relative()
    }

    fn parse_relative(&mut self) -> Result<ConditionExpr, SyntaxError> {
        let mut slots = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::Underscore) => {
                    self.bump();
                    slots.push(RelSlot::Here);
                }
                Some(TokenKind::Hash) => {
                    self.bump();
                    slots.push(RelSlot::Boundary);
                }
                Some(TokenKind::Phonemes(_)) => match self.bump().map(|t| t.kind) {
                    Some(TokenKind::Phonemes(s)) => slots.push(RelSlot::Literal(s)),
                    _ => return Err(self.error_here("expected phonemes")),
                },
                Some(TokenKind::LBracket) => {
                    slots.push(RelSlot::Features(self.parse_bracket()?));
                }
                _ => break,
            }
        }
        if slots.is_empty() {
            return Err(self.error_here("expected a condition"));
        }
        let here_count = slots
            .iter()
            .filter(|s| matches!(s, RelSlot::Here))
            .count();
        if here_count != 1 {
            return Err(self.error_here("a positional template needs exactly one '_'"));
        }
        Ok(ConditionExpr::Relative(slots))
    }

    fn parse_index_expr(&mut self) -> Result<IndexExpr, SyntaxError> {
        let counter = if self.eat_ident("Syllable") {
            Counter::Syllable
        } else if self.eat_ident("Phoneme") {
            Counter::Phoneme
        } else {
            return Err(self.error_here("expected Syllable or Phoneme"));
        };
        self.expect(&TokenKind::LBracket, "'['")?;
        let relative = self.eat(&TokenKind::At);
        let negative = self.eat(&TokenKind::Minus);
        let magnitude = match self.bump().map(|t| t.kind) {
            Some(TokenKind::Int(n)) => n,
            _ => return Err(self.error_here("expected an index")),
        };
        self.expect(&TokenKind::RBracket, "']'")?;
        let value = if negative { -magnitude } else { magnitude };
        let index = if relative {
            IndexKind::Offset(value)
        } else {
            IndexKind::Absolute(value)
        };
        Ok(IndexExpr { counter, index })
    }

    fn parse_path(&mut self) -> Result<PathExpr, SyntaxError> {
        let base = self.parse_index_expr()?;
        let mut fields = Vec::new();
        while self.eat(&TokenKind::Dot) {
            let field = match self.bump().map(|t| t.kind) {
                Some(TokenKind::Ident(name)) => match name.as_str() {
                    "nucleus" => Field::Nucleus,
                    "onset" => Field::Onset,
                    "coda" => Field::Coda,
                    "quality" => Field::Quality,
                    "is_monosyllable" => Field::IsMonosyllable,
                    "is_stressed" => Field::IsStressed,
                    other => {
                        return Err(self.error_here(format!("unknown field '{}'", other)))
                    }
                },
                _ => return Err(self.error_here("expected a field name")),
            };
            fields.push(field);
        }
        Ok(PathExpr { base, fields })
    }

    fn parse_is_value(&mut self) -> Result<IsValue, SyntaxError> {
        match self.peek() {
            Some(TokenKind::Phonemes(_)) => match self.bump().map(|t| t.kind) {
                Some(TokenKind::Phonemes(s)) => Ok(IsValue::Phonemes(s)),
                _ => Err(self.error_here("expected a value")),
            },
            Some(TokenKind::LBracket) => Ok(IsValue::Features(self.parse_bracket()?)),
            Some(TokenKind::Ident(name)) if name == "true" => {
                self.bump();
                Ok(IsValue::Bool(true))
            }
            Some(TokenKind::Ident(name)) if name == "false" => {
                self.bump();
                Ok(IsValue::Bool(false))
            }
            _ => Err(self.error_here("expected a phoneme, bracket, true or false")),
        }
    }
}
