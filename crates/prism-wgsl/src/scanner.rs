use std::collections::BTreeSet;

use crate::error::ScanError;
use crate::lexer::{Lexer, Token, TokenWithPos};
use crate::types::{Access, WgslType};

// ── Scan result ───────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    /// Textures and samplers (`var name: texture_2d<f32>`).
    Handle,
    Uniform,
    Storage(Access),
    Private,
    Workgroup,
}

/// A module-scope `var` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub group: Option<u32>,
    pub binding: Option<u32>,
    pub space: AddressSpace,
    pub ty: WgslType,
    pub line: usize,
    pub col: usize,
}

impl Declaration {
    /// `true` for declarations that occupy a bind-group slot.
    pub fn is_resource(&self) -> bool {
        self.group.is_some() && self.binding.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    pub stage: Stage,
    pub name: String,
    /// Literal `@workgroup_size` values, missing dimensions filled with 1.
    /// `None` when the attribute is absent or uses named constants.
    pub workgroup_size: Option<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: WgslType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<StructMember>,
}

/// Static facts about a WGSL module, gathered without compiling it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderScan {
    pub declarations: Vec<Declaration>,
    pub structs: Vec<StructDecl>,
    pub entry_points: Vec<EntryPoint>,
    member_accesses: BTreeSet<(String, String)>,
}

impl ShaderScan {
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declaration(name).is_some()
    }

    pub fn declares_struct(&self, name: &str) -> bool {
        self.struct_decl(name).is_some()
    }

    pub fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Declarations bound in `group`, in source order.
    pub fn bindings_in_group(&self, group: u32) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(move |d| d.group == Some(group) && d.binding.is_some())
    }

    /// Members accessed as `base.member`, sorted by name.
    pub fn members_of<'a>(&'a self, base: &'a str) -> impl Iterator<Item = &'a str> {
        self.member_accesses
            .iter()
            .filter(move |(b, _)| b == base)
            .map(|(_, m)| m.as_str())
    }

    pub fn entry_point(&self, stage: Stage) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.stage == stage)
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Attribute {
    name: String,
    args: Vec<Token>,
    line: usize,
    col: usize,
}

struct Scanner {
    tokens: Vec<TokenWithPos>,
    pos: usize,
    depth: usize,
    pending: Vec<Attribute>,
    out: ShaderScan,
}

/// Scans WGSL source for module-scope bindings, structs, entry points and
/// member accesses.
pub fn scan(src: &str) -> Result<ShaderScan, ScanError> {
    let tokens = Lexer::new(src).tokenize();
    let mut scanner = Scanner {
        tokens,
        pos: 0,
        depth: 0,
        pending: Vec::new(),
        out: ShaderScan::default(),
    };
    scanner.run()?;
    Ok(scanner.out)
}

impl Scanner {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn prev(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| &t.token)
    }

    fn current_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .map(|t| (t.line, t.col))
            .unwrap_or((1, 1))
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ScanError {
        let (line, col) = self.current_pos();
        ScanError::new(msg, line, col)
    }

    fn run(&mut self) -> Result<(), ScanError> {
        loop {
            self.record_member_access();
            match self.peek().clone() {
                Token::Eof => return Ok(()),
                Token::Punct('{') => {
                    self.depth += 1;
                    self.pending.clear();
                    self.advance();
                }
                Token::Punct('}') => {
                    self.depth = self.depth.saturating_sub(1);
                    self.pending.clear();
                    self.advance();
                }
                Token::Punct('@') if self.depth == 0 => {
                    let attr = self.attribute();
                    self.pending.push(attr);
                }
                Token::Punct(';') => {
                    self.pending.clear();
                    self.advance();
                }
                Token::Ident(word) if self.depth == 0 => match word.as_str() {
                    "var" => self.var_declaration()?,
                    "fn" => self.function_header(),
                    "struct" => self.struct_declaration(),
                    _ => {
                        self.advance();
                    }
                },
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn record_member_access(&mut self) {
        let Token::Ident(base) = self.peek() else { return };
        if matches!(self.prev(), Some(Token::Punct('.'))) {
            return;
        }
        if self.peek_ahead(1) != &Token::Punct('.') {
            return;
        }
        if let Token::Ident(member) = self.peek_ahead(2) {
            self.out
                .member_accesses
                .insert((base.clone(), member.clone()));
        }
    }

    fn attribute(&mut self) -> Attribute {
        let (line, col) = self.current_pos();
        self.advance(); // `@`
        let name = match self.advance() {
            Token::Ident(name) => name,
            _ => String::new(),
        };
        let mut args = Vec::new();
        if self.peek() == &Token::Punct('(') {
            self.advance();
            let mut depth = 1usize;
            loop {
                match self.advance() {
                    Token::Eof => break,
                    Token::Punct('(') => {
                        depth += 1;
                        args.push(Token::Punct('('));
                    }
                    Token::Punct(')') => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        args.push(Token::Punct(')'));
                    }
                    tok => args.push(tok),
                }
            }
        }
        Attribute { name, args, line, col }
    }

    fn take_index_attr(&self, attrs: &[Attribute], name: &str) -> Result<Option<u32>, ScanError> {
        let Some(attr) = attrs.iter().find(|a| a.name == name) else {
            return Ok(None);
        };
        match attr.args.as_slice() {
            [Token::Number(n)] => parse_int(n).map(Some).ok_or_else(|| {
                ScanError::new(
                    format!("@{name} expects an integer literal, got {n:?}"),
                    attr.line,
                    attr.col,
                )
            }),
            other => Err(ScanError::new(
                format!("@{name} expects an integer literal, got {other:?}"),
                attr.line,
                attr.col,
            )),
        }
    }

    fn var_declaration(&mut self) -> Result<(), ScanError> {
        let attrs = std::mem::take(&mut self.pending);
        let (line, col) = self.current_pos();
        self.advance(); // `var`

        let mut space = AddressSpace::Handle;
        if self.peek() == &Token::Punct('<') {
            self.advance();
            let mut words = Vec::new();
            loop {
                match self.advance() {
                    Token::Punct('>') | Token::Eof => break,
                    Token::Ident(w) => words.push(w),
                    _ => {}
                }
            }
            space = match words.first().map(String::as_str) {
                Some("uniform") => AddressSpace::Uniform,
                Some("storage") => AddressSpace::Storage(
                    words.get(1).and_then(|a| Access::parse(a)).unwrap_or(Access::Read),
                ),
                Some("private") => AddressSpace::Private,
                Some("workgroup") => AddressSpace::Workgroup,
                _ => AddressSpace::Handle,
            };
        }

        let name = match self.advance() {
            Token::Ident(name) => name,
            tok => return Err(self.err(format!("expected variable name after `var`, got {tok:?}"))),
        };

        let mut ty_text = String::new();
        if self.peek() == &Token::Punct(':') {
            self.advance();
            ty_text = self.type_text(&[';', '=']);
        }

        let group = self.take_index_attr(&attrs, "group")?;
        let binding = self.take_index_attr(&attrs, "binding")?;
        if group.is_some() != binding.is_some() {
            return Err(ScanError::new(
                format!("`{name}` needs both @group and @binding"),
                line,
                col,
            ));
        }

        self.out.declarations.push(Declaration {
            name,
            group,
            binding,
            space,
            ty: WgslType::parse(&ty_text),
            line,
            col,
        });
        Ok(())
    }

    fn struct_declaration(&mut self) {
        self.pending.clear();
        self.advance(); // `struct`
        let Token::Ident(name) = self.advance() else { return };
        if self.peek() != &Token::Punct('{') {
            self.out.structs.push(StructDecl { name, members: Vec::new() });
            return;
        }
        self.advance();

        let mut members = Vec::new();
        loop {
            match self.peek().clone() {
                Token::Eof => break,
                Token::Punct('}') => {
                    self.advance();
                    break;
                }
                Token::Punct(',') => {
                    self.advance();
                }
                Token::Punct('@') => {
                    self.attribute();
                }
                Token::Ident(member) => {
                    self.advance();
                    if self.peek() != &Token::Punct(':') {
                        continue;
                    }
                    self.advance();
                    let ty = self.type_text(&[',', '}']);
                    members.push(StructMember { name: member, ty: WgslType::parse(&ty) });
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.out.structs.push(StructDecl { name, members });
    }

    /// Collects type tokens up to one of `stops` outside angle brackets.
    fn type_text(&mut self, stops: &[char]) -> String {
        let mut text = String::new();
        let mut angle = 0usize;
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Punct(c) if angle == 0 && stops.contains(c) => break,
                Token::Punct('<') => angle += 1,
                Token::Punct('>') => angle = angle.saturating_sub(1),
                _ => {}
            }
            match self.advance() {
                Token::Ident(s) | Token::Number(s) => text.push_str(&s),
                Token::Punct(c) => text.push(c),
                Token::Eof => break,
            }
        }
        text
    }

    fn function_header(&mut self) {
        let attrs = std::mem::take(&mut self.pending);
        self.advance(); // `fn`
        let Token::Ident(name) = self.advance() else { return };

        let stage = attrs.iter().find_map(|a| match a.name.as_str() {
            "vertex" => Some(Stage::Vertex),
            "fragment" => Some(Stage::Fragment),
            "compute" => Some(Stage::Compute),
            _ => None,
        });
        let Some(stage) = stage else { return };

        let workgroup_size = attrs
            .iter()
            .find(|a| a.name == "workgroup_size")
            .and_then(|a| workgroup_size(&a.args));

        self.out.entry_points.push(EntryPoint { stage, name, workgroup_size });
    }
}

fn parse_int(text: &str) -> Option<u32> {
    let digits = text.trim_end_matches(['u', 'i']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}

fn workgroup_size(args: &[Token]) -> Option<[u32; 3]> {
    let mut dims = [1u32; 3];
    let mut count = 0;
    for tok in args {
        match tok {
            Token::Punct(',') => {}
            Token::Number(n) if count < 3 => {
                dims[count] = parse_int(n)?;
                count += 1;
            }
            _ => return None,
        }
    }
    (count > 0).then_some(dims)
}
