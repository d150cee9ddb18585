//! Tokenizer for a single line of textual IR.

/// IR token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Keyword, type name, label or any bare identifier (`load`, `i32`, `entry`).
    Word(String),
    /// `%name`
    Local(String),
    /// `@name`
    Global(String),
    /// `!name` or `!42`
    Meta(String),
    /// `#0`
    AttrGroup(u32),
    /// Decimal integer literal.
    Int(i128),
    /// String literal contents.
    Str(String),
    /// Single punctuation character.
    Punct(char),
}

impl Token {
    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Self::Punct(p) if *p == c)
    }

    pub fn is_word(&self, w: &str) -> bool {
        matches!(self, Self::Word(s) if s == w)
    }
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'$' | b'-')
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || matches!(c, b'_' | b'.' | b'$')
}

/// Tokenize one line, stopping at a `;` comment.
pub fn tokenize(line: &str) -> Vec<Token> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b';' => break,
            b'"' => {
                let (s, next) = read_string(line, i);
                tokens.push(Token::Str(s));
                i = next;
            }
            b'%' | b'@' | b'!' => {
                let (name, next) = read_name(line, i + 1);
                i = next;
                tokens.push(match c {
                    b'%' => Token::Local(name),
                    b'@' => Token::Global(name),
                    _ => Token::Meta(name),
                });
            }
            b'#' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let text = &line[start..end];
                match text.parse() {
                    Ok(n) => tokens.push(Token::AttrGroup(n)),
                    Err(_) => tokens.push(Token::Word(format!("#{text}"))),
                }
                i = end;
            }
            b'0'..=b'9' | b'-' | b'+' => {
                let start = i;
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                // Floats and hex literals are kept as words
                if end < bytes.len() && matches!(bytes[end], b'.' | b'e' | b'E' | b'x' | b'X') {
                    while end < bytes.len()
                        && (is_ident_char(bytes[end]) || bytes[end] == b'+')
                    {
                        end += 1;
                    }
                    tokens.push(Token::Word(line[start..end].to_string()));
                } else {
                    match line[start..end].parse::<i128>() {
                        Ok(n) => tokens.push(Token::Int(n)),
                        Err(_) => tokens.push(Token::Word(line[start..end].to_string())),
                    }
                }
                i = end;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(line[start..i].to_string()));
            }
            _ => {
                // Multi-byte characters only appear inside strings and names
                let ch = line[i..].chars().next().unwrap_or('?');
                tokens.push(Token::Punct(ch));
                i += ch.len_utf8();
            }
        }
    }

    tokens
}

/// Read a quoted string starting at `start` (the opening quote).
fn read_string(line: &str, start: usize) -> (String, usize) {
    let bytes = line.as_bytes();
    let mut end = start + 1;
    while end < bytes.len() && bytes[end] != b'"' {
        end += 1;
    }
    let s = line[start + 1..end].to_string();
    (s, (end + 1).min(bytes.len()))
}

/// Read a sigil name (`%x`, `@"quoted name"`, `!12`) starting after the sigil.
fn read_name(line: &str, start: usize) -> (String, usize) {
    let bytes = line.as_bytes();
    if start < bytes.len() && bytes[start] == b'"' {
        return read_string(line, start);
    }
    let mut end = start;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    (line[start..end].to_string(), end)
}
