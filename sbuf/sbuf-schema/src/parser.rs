//! Recursive-descent parser over the token stream.
//!
//! Works with a two-token window (current + peek). Top-level dispatch
//! classifies an identifier by what follows it: `{` starts a struct, `=` or
//! `|` starts an enum, `(` or `.` starts an API. Comment tokens accumulate
//! into a pending note that attaches to the next definition.

use std::collections::HashSet;
use std::mem;

use sbuf_core::{Api, ApiArg, Enum, EnumChild, Schema, Struct, StructField, Type};

use crate::error::SchemaError;
use crate::lex::{Lexer, Token, TokenKind, is_tag_literal};

pub struct Parser {
    lexer: Lexer,
    cur: Token,
    peek: Token,
    struct_names: HashSet<String>,
    enum_names: HashSet<String>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let cur = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            cur,
            peek,
            struct_names: HashSet::new(),
            enum_names: HashSet::new(),
        }
    }

    pub fn parse(mut self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::default();
        let mut pending_note = String::new();

        loop {
            match self.cur.kind {
                TokenKind::Eof => break,
                TokenKind::Error => return Err(self.lex_error()),
                TokenKind::Comment => {
                    if !pending_note.is_empty() {
                        pending_note.push('\n');
                    }
                    pending_note.push_str(&self.cur.text);
                    self.advance();
                }
                TokenKind::Ident => {
                    let note = mem::take(&mut pending_note);
                    self.parse_definition(&mut schema, note)?;
                }
                _ => {
                    return Err(SchemaError::Unexpected {
                        line: self.cur.line,
                        token: self.cur.text.clone(),
                    });
                }
            }
        }

        Ok(schema)
    }

    fn advance(&mut self) {
        self.cur = mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn lex_error(&self) -> SchemaError {
        SchemaError::Lex {
            line: self.cur.line,
            message: self.cur.text.clone(),
        }
    }

    /// Consume the current token, which must have the given kind.
    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, SchemaError> {
        if self.cur.kind == TokenKind::Error {
            return Err(self.lex_error());
        }
        if self.cur.kind != kind {
            return Err(SchemaError::Expected {
                line: self.cur.line,
                expected,
                found: self.cur.text.clone(),
            });
        }
        let token = mem::replace(&mut self.cur, mem::replace(&mut self.peek, self.lexer.next_token()));
        Ok(token)
    }

    fn parse_definition(&mut self, schema: &mut Schema, note: String) -> Result<(), SchemaError> {
        match self.peek.kind {
            TokenKind::LBrace => {
                self.check_redefined()?;
                let s = self.parse_struct(note)?;
                self.struct_names.insert(s.name.clone());
                schema.structs.push(s);
                Ok(())
            }
            TokenKind::Assign | TokenKind::Pipe => {
                self.check_redefined()?;
                let e = self.parse_enum(note)?;
                self.enum_names.insert(e.name.clone());
                schema.enums.push(e);
                Ok(())
            }
            TokenKind::LParen | TokenKind::Dot => {
                let api = self.parse_api(note)?;
                schema.apis.push(api);
                Ok(())
            }
            _ => Err(SchemaError::Unexpected {
                line: self.cur.line,
                token: self.cur.text.clone(),
            }),
        }
    }

    fn check_redefined(&self) -> Result<(), SchemaError> {
        let name = &self.cur.text;
        if self.struct_names.contains(name) || self.enum_names.contains(name) {
            return Err(SchemaError::Redefined {
                line: self.cur.line,
                name: name.clone(),
            });
        }
        Ok(())
    }

    fn parse_struct(&mut self, note: String) -> Result<Struct, SchemaError> {
        let name = self.expect(TokenKind::Ident, "struct name")?.text;
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut fields = Vec::new();
        loop {
            match self.cur.kind {
                TokenKind::RBrace => break,
                TokenKind::Error => return Err(self.lex_error()),
                // Commas between fields and comments on their own lines
                // are permitted and skipped.
                TokenKind::Comment | TokenKind::Comma => self.advance(),
                TokenKind::Ident => fields.push(self.parse_struct_field()?),
                _ => {
                    return Err(SchemaError::Expected {
                        line: self.cur.line,
                        expected: "field name or '}'",
                        found: self.cur.text.clone(),
                    });
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Struct { name, fields, note })
    }

    /// A field line starts with an identifier. If the following token sits on
    /// the same line and starts a type (`Ident` or `[`), the identifier was a
    /// field name; otherwise the identifier itself was a struct name and the
    /// field is embedded (empty name, expanded during resolution).
    fn parse_struct_field(&mut self) -> Result<StructField, SchemaError> {
        let start_line = self.cur.line;
        let name = self.expect(TokenKind::Ident, "field name")?.text;

        if self.cur.line != start_line {
            return Ok(StructField {
                name: String::new(),
                ty: Type::named(name),
                tag: String::new(),
                note: String::new(),
            });
        }

        let mut field = if self.starts_type() {
            let ty = self.parse_type()?;
            let mut tag = String::new();
            if self.cur.kind == TokenKind::Ident && is_tag_literal(&self.cur.text) {
                tag = self.cur.text.trim_matches(['"', '`']).to_string();
                self.advance();
            }
            StructField {
                name,
                ty,
                tag,
                note: String::new(),
            }
        } else {
            StructField {
                name: String::new(),
                ty: Type::named(name),
                tag: String::new(),
                note: String::new(),
            }
        };

        if self.cur.kind == TokenKind::Comment && self.cur.line == start_line {
            field.note = self.cur.text.clone();
            self.advance();
        }

        Ok(field)
    }

    fn starts_type(&self) -> bool {
        match self.cur.kind {
            TokenKind::Ident => !is_tag_literal(&self.cur.text),
            TokenKind::LBracket => true,
            _ => false,
        }
    }

    /// `Ident` alone is a scalar reference; `[ Ident ]` is a list. Lists do
    /// not nest.
    fn parse_type(&mut self) -> Result<Type, SchemaError> {
        if self.cur.kind != TokenKind::LBracket {
            let name = self.expect(TokenKind::Ident, "type name")?.text;
            return Ok(Type::named(name));
        }
        self.expect(TokenKind::LBracket, "'['")?;
        let name = self.expect(TokenKind::Ident, "element type name")?.text;
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Type::list_of(name))
    }

    fn parse_enum(&mut self, note: String) -> Result<Enum, SchemaError> {
        let name = self.expect(TokenKind::Ident, "enum name")?.text;
        if self.cur.kind == TokenKind::Assign {
            self.advance();
        }

        let mut children = Vec::new();
        let mut last_id: u8 = 0;
        let mut first = true;
        loop {
            match self.cur.kind {
                TokenKind::Pipe => self.advance(),
                TokenKind::Ident if !is_tag_literal(&self.cur.text) => {
                    children.push(self.parse_enum_child(&mut last_id, &mut first)?);
                    if self.cur.kind != TokenKind::Pipe {
                        break;
                    }
                }
                _ => break,
            }
        }

        Ok(Enum {
            name,
            children,
            note,
        })
    }

    /// Auto-id rule: the first unvalued child gets 0, each later unvalued
    /// child gets `last + 1`, and an explicit `(n)` resets `last` to `n`.
    fn parse_enum_child(
        &mut self,
        last_id: &mut u8,
        first: &mut bool,
    ) -> Result<EnumChild, SchemaError> {
        let child_line = self.cur.line;
        let name = self.expect(TokenKind::Ident, "enum child name")?.text;

        let id = if self.cur.kind == TokenKind::LParen {
            self.advance();
            let num = self.expect(TokenKind::Number, "enum id")?;
            let id: u8 = num.text.parse().map_err(|_| SchemaError::InvalidEnumId {
                line: num.line,
                text: num.text.clone(),
            })?;
            self.expect(TokenKind::RParen, "')'")?;
            *last_id = id;
            *first = false;
            id
        } else if *first {
            *first = false;
            0
        } else {
            if *last_id == 255 {
                return Err(SchemaError::EnumIdOverflow { line: child_line });
            }
            *last_id += 1;
            *last_id
        };

        let mut note = String::new();
        if self.cur.kind == TokenKind::Comment && self.cur.line == child_line {
            note = self.cur.text.clone();
            self.advance();
        }

        Ok(EnumChild { id, name, note })
    }

    fn parse_api(&mut self, note: String) -> Result<Api, SchemaError> {
        let api_line = self.cur.line;
        let mut name = self.expect(TokenKind::Ident, "api name")?.text;
        while self.cur.kind == TokenKind::Dot {
            self.advance();
            let segment = self.expect(TokenKind::Ident, "api name segment")?;
            name.push('.');
            name.push_str(&segment.text);
        }

        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        while self.cur.kind != TokenKind::RParen {
            if self.cur.kind == TokenKind::Error {
                return Err(self.lex_error());
            }
            let arg_name = self.expect(TokenKind::Ident, "argument name")?.text;
            let ty = self.parse_type()?;
            args.push(ApiArg { name: arg_name, ty });
            if self.cur.kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Arrow, "'=>'")?;

        // `nil` comes through the ordinary type path and resolves as Base.
        if !self.starts_type() && self.cur.kind != TokenKind::LBracket {
            return Err(SchemaError::Expected {
                line: self.cur.line,
                expected: "result type or 'nil'",
                found: self.cur.text.clone(),
            });
        }
        let result = self.parse_type()?;

        let mut api = Api {
            name,
            args,
            result,
            note,
        };
        // A same-line trailing comment replaces the accumulated doc note.
        if self.cur.kind == TokenKind::Comment && self.cur.line == api_line {
            api.note = self.cur.text.clone();
            self.advance();
        }

        Ok(api)
    }
}
