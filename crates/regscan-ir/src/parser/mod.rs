//! Line-oriented parser for textual LLVM IR.
//!
//! clang prints one top-level entity or instruction per line, so the parser
//! tokenizes line by line and only needs bracket tracking for the few
//! instructions that span lines (`switch`, `indirectbr`).

mod debug;
mod lexer;

use tracing::{debug, trace};

use crate::instr::{BinOp, Callee, CastOp, InstKind, Instruction, SourceLoc};
use crate::module::{BasicBlock, Function, Global, Linkage, Module, Param};
use crate::types::Type;
use crate::value::{GepExpr, Operand};
use crate::{IrError, Result};

use debug::DebugInfo;
use lexer::{Token, tokenize};

/// Parameter and return attributes that may precede an operand value.
const VALUE_ATTRIBUTES: &[&str] = &[
    "noundef",
    "nonnull",
    "signext",
    "zeroext",
    "inreg",
    "returned",
    "nocapture",
    "readonly",
    "readnone",
    "writeonly",
    "noalias",
    "immarg",
    "nofree",
    "swiftself",
    "swifterror",
    "align",
    "dereferenceable",
    "dereferenceable_or_null",
    "byval",
    "byref",
    "sret",
    "inalloca",
    "preallocated",
    "elementtype",
    "captures",
    "range",
    "initializes",
];

/// Flags that may follow an opcode without changing its meaning for us.
const OPCODE_FLAGS: &[&str] = &["nuw", "nsw", "exact", "disjoint", "inbounds", "nusw", "samesign"];

/// Parse a textual IR module.
pub fn parse_module(text: &str, name: &str) -> Result<Module> {
    let lines: Vec<&str> = text.lines().collect();

    let mut info = DebugInfo::default();
    for line in &lines {
        if line.starts_with('!') {
            info.add_line(line.trim());
        }
    }

    let mut source_filename = None;
    let mut globals = Vec::new();
    let mut functions = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        let line_no = i + 1;
        i += 1;

        if line.starts_with("source_filename") {
            source_filename = tokenize(line).into_iter().find_map(|t| match t {
                Token::Str(s) => Some(s),
                _ => None,
            });
        } else if line.starts_with("define ") {
            let header = parse_header(line, line_no)?;
            let body_start = i;
            while i < lines.len() && lines[i].trim() != "}" {
                i += 1;
            }
            if i == lines.len() {
                return Err(IrError::UnterminatedFunction {
                    line: line_no,
                    name: header.name,
                });
            }
            let blocks = parse_body(&lines[body_start..i], &header, &info, source_filename.as_deref());
            i += 1;
            functions.push(Function::new(header.name, header.linkage, header.params, blocks));
        } else if line.starts_with("declare ") {
            let header = parse_header(line, line_no)?;
            functions.push(Function::new(header.name, header.linkage, header.params, Vec::new()));
        } else if line.starts_with('@') {
            if let Some(global) = parse_global(line) {
                globals.push(global);
            }
        }
    }

    let module = Module::new(name, source_filename, globals, functions);
    debug!(
        "parsed {}: {} functions, {} globals, {} debug nodes",
        module.name(),
        module.functions().len(),
        module.globals().len(),
        info.len()
    );
    Ok(module)
}

/// Parsed `define`/`declare` line.
struct Header {
    name: String,
    linkage: Linkage,
    params: Vec<Param>,
    /// `!dbg` subprogram attached to the definition.
    subprogram: Option<u32>,
}

fn parse_header(line: &str, line_no: usize) -> Result<Header> {
    let toks = tokenize(line);
    let malformed = IrError::Malformed {
        line: line_no,
        what: "function header",
    };

    let name_pos = toks
        .windows(2)
        .position(|w| matches!(w[0], Token::Global(_)) && w[1].is_punct('('))
        .ok_or(malformed)?;
    let Token::Global(name) = &toks[name_pos] else {
        unreachable!()
    };

    let linkage = if toks[..name_pos]
        .iter()
        .any(|t| t.is_word("internal") || t.is_word("private"))
    {
        Linkage::Internal
    } else {
        Linkage::External
    };

    let close = matching_close(&toks, name_pos + 1).ok_or(IrError::Malformed {
        line: line_no,
        what: "parameter list",
    })?;

    let mut params = Vec::new();
    let mut unnamed = 0usize;
    for group in split_top_level(&toks[name_pos + 2..close]) {
        if group.is_empty() || group[0].is_word("...") {
            continue;
        }
        let mut cur = Cursor::new(group);
        let ty = cur.parse_type().unwrap_or(Type::Other(String::new()));
        let name = match group.last() {
            Some(Token::Local(n)) if group.len() > 1 => n.clone(),
            _ => {
                unnamed += 1;
                (unnamed - 1).to_string()
            }
        };
        params.push(Param { ty, name });
    }

    let subprogram = toks[close..]
        .windows(2)
        .find_map(|w| match (&w[0], &w[1]) {
            (Token::Meta(k), Token::Meta(id)) if k == "dbg" => id.parse().ok(),
            _ => None,
        });

    Ok(Header {
        name: name.clone(),
        linkage,
        params,
        subprogram,
    })
}

fn parse_global(line: &str) -> Option<Global> {
    let toks = tokenize(line);
    let Some(Token::Global(name)) = toks.first() else {
        return None;
    };
    if !toks.get(1)?.is_punct('=') {
        return None;
    }
    let kw = toks
        .iter()
        .position(|t| t.is_word("global") || t.is_word("constant"))?;
    let external = toks[..kw]
        .iter()
        .any(|t| t.is_word("external") || t.is_word("extern_weak"));

    let mut cur = Cursor::new(&toks[kw + 1..]);
    let ty = cur.parse_type()?;
    let initializer = if external || cur.at_end() || cur.peek_punct(',') {
        None
    } else {
        cur.parse_value(&ty)
    };

    Some(Global {
        name: name.clone(),
        ty,
        initializer,
        is_constant: toks[kw].is_word("constant"),
    })
}

fn parse_body(
    lines: &[&str],
    header: &Header,
    info: &DebugInfo,
    source_filename: Option<&str>,
) -> Vec<BasicBlock> {
    let mut blocks: Vec<BasicBlock> = Vec::new();
    let fallback_file = header
        .subprogram
        .and_then(|sp| info.file_of(sp))
        .or_else(|| source_filename.map(str::to_string));

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;
        if line.is_empty() || line.starts_with(';') || line.starts_with("#dbg_") {
            continue;
        }

        let mut toks = tokenize(line);
        if toks.is_empty() {
            continue;
        }

        if toks.len() == 2 && toks[1].is_punct(':') {
            let label = match &toks[0] {
                Token::Word(s) | Token::Str(s) => s.clone(),
                Token::Int(n) => n.to_string(),
                _ => String::new(),
            };
            blocks.push(BasicBlock::new(Some(label)));
            continue;
        }

        // Continuation lines of multi-line instructions
        let mut depth = bracket_depth(&toks);
        while depth > 0 && i < lines.len() {
            let more = tokenize(lines[i]);
            depth += bracket_depth(&more);
            toks.extend(more);
            i += 1;
        }

        let mut inst = parse_instruction(toks);
        if let Some(id) = inst.dbg {
            if let Some((file, line)) = info.location(id) {
                let file = if file.is_empty() {
                    fallback_file.clone().unwrap_or_else(|| "unknown".to_string())
                } else {
                    file
                };
                inst.source_loc = Some(SourceLoc::new(&file, line, &header.name));
            }
        }

        if blocks.is_empty() {
            blocks.push(BasicBlock::new(None));
        }
        if let Some(block) = blocks.last_mut() {
            block.instructions.push(inst);
        }
    }

    blocks
}

fn bracket_depth(toks: &[Token]) -> i32 {
    toks.iter()
        .map(|t| match t {
            Token::Punct('[') => 1,
            Token::Punct(']') => -1,
            _ => 0,
        })
        .sum()
}

/// Parse one instruction from its tokens. Never fails: anything not
/// understood is kept as [`InstKind::Other`].
fn parse_instruction(mut toks: Vec<Token>) -> Instruction {
    let dbg = strip_attachments(&mut toks);

    let (result, body) = match toks.as_slice() {
        [Token::Local(name), Token::Punct('='), rest @ ..] => (Some(name.clone()), rest),
        rest => (None, rest),
    };

    let mut cur = Cursor::new(body);
    let opcode = match cur.next() {
        Some(Token::Word(w)) if matches!(w.as_str(), "tail" | "musttail" | "notail") => {
            cur.next_word().unwrap_or_default()
        }
        Some(Token::Word(w)) => w.clone(),
        _ => String::new(),
    };

    let kind = parse_kind(&opcode, &mut cur).unwrap_or_else(|| {
        trace!("keeping `{opcode}` as opaque instruction");
        InstKind::Other(opcode.clone())
    });

    let mut inst = Instruction::new(result, kind);
    inst.dbg = dbg;
    inst
}

/// Remove trailing `, !name !N` attachments, returning the `!dbg` id.
fn strip_attachments(toks: &mut Vec<Token>) -> Option<u32> {
    let mut dbg = None;
    while toks.len() >= 3 {
        let n = toks.len();
        let (Token::Meta(kind), Token::Meta(id)) = (&toks[n - 2], &toks[n - 1]) else {
            break;
        };
        if !toks[n - 3].is_punct(',') {
            break;
        }
        if kind == "dbg" {
            dbg = id.parse().ok();
        }
        toks.truncate(n - 3);
    }
    dbg
}

fn parse_kind(opcode: &str, cur: &mut Cursor<'_>) -> Option<InstKind> {
    match opcode {
        "load" => {
            let volatile = cur.skip_memory_flags();
            let ty = cur.parse_type()?;
            let ptr = if cur.eat_punct(',') {
                cur.parse_typed_value()?.1
            } else {
                // Pre-opaque-pointer form: `load i32* %p`
                cur.parse_value(&ty)?
            };
            Some(InstKind::Load { ty, ptr, volatile })
        }
        "store" => {
            let volatile = cur.skip_memory_flags();
            let (ty, value) = cur.parse_typed_value()?;
            cur.expect_punct(',')?;
            let (_, ptr) = cur.parse_typed_value()?;
            Some(InstKind::Store {
                ty,
                value,
                ptr,
                volatile,
            })
        }
        "atomicrmw" => {
            let volatile = cur.skip_memory_flags();
            let op = cur.next_word()?;
            let (_, ptr) = cur.parse_typed_value()?;
            cur.expect_punct(',')?;
            let (ty, value) = cur.parse_typed_value()?;
            Some(InstKind::AtomicRmw {
                op,
                ty,
                ptr,
                value,
                volatile,
            })
        }
        "cmpxchg" => {
            let volatile = cur.skip_memory_flags();
            let (_, ptr) = cur.parse_typed_value()?;
            cur.expect_punct(',')?;
            let (ty, expected) = cur.parse_typed_value()?;
            cur.expect_punct(',')?;
            let (_, new) = cur.parse_typed_value()?;
            Some(InstKind::CmpXchg {
                ty,
                ptr,
                expected,
                new,
                volatile,
            })
        }
        "getelementptr" => cur.parse_gep_operands().map(InstKind::Gep),
        "call" => cur.parse_call(),
        _ => {
            if let Some(op) = CastOp::from_mnemonic(opcode) {
                let (_, value) = cur.parse_typed_value()?;
                cur.expect_word("to")?;
                let to = cur.parse_type()?;
                Some(InstKind::Cast { op, value, to })
            } else if let Some(op) = BinOp::from_mnemonic(opcode) {
                cur.skip_words(OPCODE_FLAGS);
                let (ty, lhs) = cur.parse_typed_value()?;
                cur.expect_punct(',')?;
                let rhs = cur.parse_value(&ty)?;
                Some(InstKind::Binary { op, ty, lhs, rhs })
            } else {
                None
            }
        }
    }
}

/// Index of the bracket closing the one opened at `open`.
fn matching_close(toks: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, tok) in toks.iter().enumerate().skip(open) {
        match tok {
            Token::Punct('(' | '[' | '{' | '<') => depth += 1,
            Token::Punct(')' | ']' | '}' | '>') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a token list on commas that are not nested in brackets.
fn split_top_level(toks: &[Token]) -> Vec<&[Token]> {
    let mut groups = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, tok) in toks.iter().enumerate() {
        match tok {
            Token::Punct('(' | '[' | '{' | '<') => depth += 1,
            Token::Punct(')' | ']' | '}' | '>') => depth -= 1,
            Token::Punct(',') if depth == 0 => {
                groups.push(&toks[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < toks.len() {
        groups.push(&toks[start..]);
    }
    groups
}

fn render(toks: &[Token]) -> String {
    toks.iter()
        .map(|t| match t {
            Token::Word(s) => s.clone(),
            Token::Local(s) => format!("%{s}"),
            Token::Global(s) => format!("@{s}"),
            Token::Meta(s) => format!("!{s}"),
            Token::AttrGroup(n) => format!("#{n}"),
            Token::Int(n) => n.to_string(),
            Token::Str(s) => format!("\"{s}\""),
            Token::Punct(c) => c.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token cursor used for operand parsing.
struct Cursor<'a> {
    toks: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(toks: &'a [Token]) -> Self {
        Self { toks, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.toks.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.toks.get(self.pos + offset)
    }

    fn peek_punct(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(c))
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.toks.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn next_word(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Word(w) => {
                self.pos += 1;
                Some(w.clone())
            }
            _ => None,
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(w)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Option<()> {
        self.eat_punct(c).then_some(())
    }

    fn expect_word(&mut self, w: &str) -> Option<()> {
        self.eat_word(w).then_some(())
    }

    fn skip_words(&mut self, words: &[&str]) {
        while let Some(Token::Word(w)) = self.peek() {
            if !words.contains(&w.as_str()) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skip a balanced bracket group starting at the cursor.
    fn skip_group(&mut self) -> Option<&'a [Token]> {
        let close = matching_close(self.toks, self.pos)?;
        let group = &self.toks[self.pos..=close];
        self.pos = close + 1;
        Some(group)
    }

    /// Skip `atomic`/`volatile`/`weak`, returning whether `volatile` was present.
    fn skip_memory_flags(&mut self) -> bool {
        let mut volatile = false;
        loop {
            if self.eat_word("volatile") {
                volatile = true;
            } else if !(self.eat_word("atomic") || self.eat_word("weak")) {
                return volatile;
            }
        }
    }

    /// Skip `addrspace(N)`.
    fn skip_addrspace(&mut self) {
        if self.peek().is_some_and(|t| t.is_word("addrspace"))
            && self.peek_at(1).is_some_and(|t| t.is_punct('('))
        {
            self.pos += 1;
            self.skip_group();
        }
    }

    /// Skip parameter attributes in front of a value.
    fn skip_value_attributes(&mut self) {
        while let Some(Token::Word(w)) = self.peek() {
            if !VALUE_ATTRIBUTES.contains(&w.as_str()) {
                break;
            }
            self.pos += 1;
            if self.peek_punct('(') {
                self.skip_group();
            } else if w == "align" && matches!(self.peek(), Some(Token::Int(_))) {
                self.pos += 1;
            }
        }
    }

    fn parse_type(&mut self) -> Option<Type> {
        let start = self.pos;
        let mut ty = match self.peek()? {
            Token::Word(w) => {
                self.pos += 1;
                match w.as_str() {
                    "ptr" => {
                        self.skip_addrspace();
                        Type::Ptr
                    }
                    "void" => Type::Void,
                    w => match w.strip_prefix('i').and_then(|b| b.parse().ok()) {
                        Some(bits) => Type::Int(bits),
                        None => Type::Other(w.to_string()),
                    },
                }
            }
            Token::Local(name) => {
                self.pos += 1;
                Type::Named(name.clone())
            }
            Token::Punct('[' | '{' | '<') => {
                let group = self.skip_group()?;
                Type::Other(render(group))
            }
            _ => return None,
        };

        loop {
            self.skip_addrspace();
            if self.eat_punct('*') {
                ty = Type::Ptr;
            } else if self.peek_punct('(') && self.is_function_pointer_type() {
                self.skip_group();
                self.eat_punct('*');
                ty = Type::Ptr;
            } else {
                break;
            }
        }

        if self.pos == start {
            return None;
        }
        Some(ty)
    }

    /// Check if a `(` at the cursor opens a function type followed by `*`.
    fn is_function_pointer_type(&self) -> bool {
        matching_close(self.toks, self.pos)
            .and_then(|close| self.toks.get(close + 1))
            .is_some_and(|t| t.is_punct('*'))
    }

    fn parse_typed_value(&mut self) -> Option<(Type, Operand)> {
        self.skip_value_attributes();
        let ty = self.parse_type()?;
        self.skip_value_attributes();
        let value = self.parse_value(&ty)?;
        Some((ty, value))
    }

    fn parse_value(&mut self, ty: &Type) -> Option<Operand> {
        let tok = self.peek()?;
        let value = match tok {
            Token::Int(n) => {
                self.pos += 1;
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let raw = *n as u64;
                Operand::int(ty.int_width().unwrap_or(64), raw)
            }
            Token::Local(name) => {
                self.pos += 1;
                Operand::Local(name.clone())
            }
            Token::Global(name) => {
                self.pos += 1;
                Operand::Global(name.clone())
            }
            Token::Word(w) => match w.as_str() {
                "true" | "false" => {
                    self.pos += 1;
                    Operand::int(1, u64::from(w == "true"))
                }
                "null" => {
                    self.pos += 1;
                    Operand::Null
                }
                "undef" | "poison" => {
                    self.pos += 1;
                    Operand::Undef
                }
                "zeroinitializer" => {
                    self.pos += 1;
                    match ty.int_width() {
                        Some(bits) => Operand::int(bits, 0),
                        None => Operand::Other(w.clone()),
                    }
                }
                "getelementptr" => {
                    self.pos += 1;
                    let gep = self.parse_const_gep()?;
                    Operand::ConstGep(Box::new(gep))
                }
                w => {
                    if let Some(op) = CastOp::from_mnemonic(w) {
                        self.pos += 1;
                        self.expect_punct('(')?;
                        let (_, inner) = self.parse_typed_value()?;
                        self.expect_word("to")?;
                        self.parse_type()?;
                        self.expect_punct(')')?;
                        Operand::ConstCast {
                            op,
                            value: Box::new(inner),
                        }
                    } else if let Some(op) = BinOp::from_mnemonic(w) {
                        self.pos += 1;
                        self.skip_words(OPCODE_FLAGS);
                        self.expect_punct('(')?;
                        let (_, lhs) = self.parse_typed_value()?;
                        self.expect_punct(',')?;
                        let (_, rhs) = self.parse_typed_value()?;
                        self.expect_punct(')')?;
                        Operand::ConstBinary {
                            op,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        }
                    } else {
                        self.pos += 1;
                        Operand::Other(w.to_string())
                    }
                }
            },
            Token::Punct('[' | '{' | '<') => {
                let group = self.skip_group()?;
                Operand::Other(render(group))
            }
            Token::Meta(_) | Token::Str(_) | Token::AttrGroup(_) | Token::Punct(_) => {
                self.pos += 1;
                Operand::Other(render(std::slice::from_ref(tok)))
            }
        };
        Some(value)
    }

    /// Skip `inbounds`/`nuw`/`nusw`/`inrange(..)` after `getelementptr`.
    fn skip_gep_flags(&mut self) {
        loop {
            self.skip_words(OPCODE_FLAGS);
            if self.eat_word("inrange") {
                if self.peek_punct('(') {
                    self.skip_group();
                }
            } else {
                return;
            }
        }
    }

    /// Operands of a `getelementptr` instruction: `ty, ptr base, idx...`.
    fn parse_gep_operands(&mut self) -> Option<GepExpr> {
        self.skip_gep_flags();
        let source_ty = self.parse_type()?;
        self.expect_punct(',')?;
        let (_, base) = self.parse_typed_value()?;
        let mut indices = Vec::new();
        while self.eat_punct(',') {
            self.eat_word("inrange");
            if self.peek().is_some_and(|t| t.is_word("align")) {
                break;
            }
            let (_, idx) = self.parse_typed_value()?;
            indices.push(idx);
        }
        Some(GepExpr {
            source_ty,
            base,
            indices,
        })
    }

    /// Constant `getelementptr [flags] (ty, ptr base, idx...)`.
    fn parse_const_gep(&mut self) -> Option<GepExpr> {
        self.skip_gep_flags();
        self.expect_punct('(')?;
        let gep = self.parse_gep_operands()?;
        self.expect_punct(')')?;
        Some(gep)
    }

    fn parse_call(&mut self) -> Option<InstKind> {
        while !self.at_end() {
            match self.peek()? {
                Token::Word(w) if w == "asm" => {
                    return Some(InstKind::Call {
                        callee: Callee::Asm,
                        args: Vec::new(),
                    });
                }
                Token::Global(_) | Token::Local(_) if self.peek_at(1).is_some_and(|t| t.is_punct('(')) => {
                    let callee = match self.next()? {
                        Token::Global(name) => Callee::Direct(name.clone()),
                        Token::Local(name) => Callee::Indirect(Operand::Local(name.clone())),
                        _ => return None,
                    };
                    let args = self.parse_args()?;
                    return Some(InstKind::Call { callee, args });
                }
                Token::Word(w)
                    if CastOp::from_mnemonic(w).is_some()
                        && self.peek_at(1).is_some_and(|t| t.is_punct('(')) =>
                {
                    let value = self.parse_value(&Type::Ptr)?;
                    let callee = match &value {
                        Operand::ConstCast { value: inner, .. } => match inner.as_ref() {
                            Operand::Global(name) => Callee::Direct(name.clone()),
                            _ => Callee::Indirect(value.clone()),
                        },
                        _ => Callee::Indirect(value.clone()),
                    };
                    if !self.peek_punct('(') {
                        return None;
                    }
                    let args = self.parse_args()?;
                    return Some(InstKind::Call { callee, args });
                }
                Token::Punct('(') => {
                    // Function type of the callee
                    self.skip_group()?;
                }
                _ => self.pos += 1,
            }
        }
        None
    }

    /// Argument list starting at `(`.
    fn parse_args(&mut self) -> Option<Vec<Operand>> {
        let close = matching_close(self.toks, self.pos)?;
        let inner = &self.toks[self.pos + 1..close];
        self.pos = close + 1;

        let args = split_top_level(inner)
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                if group[0].is_word("metadata") {
                    return Operand::Other("metadata".to_string());
                }
                let mut cur = Cursor::new(group);
                cur.parse_typed_value()
                    .map_or_else(|| Operand::Other(render(group)), |(_, value)| value)
            })
            .collect();
        Some(args)
    }
}
