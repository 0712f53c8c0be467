use crate::{BLOCK_SIZE, CARD_SIZE};
use anyhow::{Context, Result, anyhow, bail};
use std::fmt;
use std::io::Read;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(true) => write!(f, "T"),
            Value::Logical(false) => write!(f, "F"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:E}", v),
            Value::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// One 80-byte header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: Value) -> Self {
        Self {
            keyword: keyword.to_ascii_uppercase(),
            value: Some(value),
            comment: None,
        }
    }

    pub fn commentary(keyword: &str, text: &str) -> Self {
        Self {
            keyword: keyword.to_ascii_uppercase(),
            value: None,
            comment: Some(text.to_string()),
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() != CARD_SIZE {
            bail!("header card must be {} bytes, got {}", CARD_SIZE, raw.len());
        }
        if !raw.is_ascii() {
            bail!("header card contains non-ASCII bytes");
        }
        // ASCII was checked above, so this cannot fail.
        let text = std::str::from_utf8(raw).map_err(|e| anyhow!("header card is not UTF-8: {}", e))?;
        let keyword = text[..8].trim_end().to_string();

        if &text[8..10] != "= " {
            let rest = text[8..].trim();
            return Ok(Self {
                keyword,
                value: None,
                comment: (!rest.is_empty()).then(|| rest.to_string()),
            });
        }

        let field = text[10..].trim_start();
        if let Some(quoted) = field.strip_prefix('\'') {
            let (value, rest) = parse_quoted(quoted).with_context(|| format!("parse string value of {}", keyword))?;
            return Ok(Self {
                keyword,
                value: Some(Value::Str(value)),
                comment: split_comment(rest),
            });
        }

        let (value_text, comment) = match field.find('/') {
            Some(pos) => (field[..pos].trim(), split_comment(&field[pos..])),
            None => (field.trim(), None),
        };
        let value = if value_text.is_empty() {
            None
        } else {
            Some(parse_scalar(value_text).with_context(|| format!("parse value of {}", keyword))?)
        };
        Ok(Self {
            keyword,
            value,
            comment,
        })
    }

    /// Render as a fixed-format card, truncated to 80 columns.
    pub fn to_record(&self) -> String {
        let mut out = format!("{:<8}", self.keyword);
        match &self.value {
            Some(value) => {
                out.push_str("= ");
                match value {
                    Value::Str(s) => {
                        let escaped = s.replace('\'', "''");
                        out.push_str(&format!("'{:<8}'", escaped));
                    }
                    other => out.push_str(&format!("{:>20}", other.to_string())),
                }
                if let Some(comment) = &self.comment {
                    out.push_str(" / ");
                    out.push_str(comment);
                }
            }
            None => {
                if let Some(comment) = &self.comment {
                    out.push_str(comment);
                }
            }
        }
        let mut record: String = out.chars().take(CARD_SIZE).collect();
        while record.len() < CARD_SIZE {
            record.push(' ');
        }
        record
    }
}

fn parse_quoted(text: &str) -> Result<(String, &str)> {
    let mut value = String::new();
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                value.push('\'');
                continue;
            }
            // Trailing spaces inside the quotes are not significant.
            return Ok((value.trim_end().to_string(), &text[idx + 1..]));
        }
        value.push(ch);
    }
    Err(anyhow!("unterminated string value"))
}

fn split_comment(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let comment = rest.strip_prefix('/').unwrap_or(rest).trim();
    (!comment.is_empty()).then(|| comment.to_string())
}

fn parse_scalar(text: &str) -> Result<Value> {
    match text {
        "T" => return Ok(Value::Logical(true)),
        "F" => return Ok(Value::Logical(false)),
        _ => {}
    }
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    let normalized = text.replace(['D', 'd'], "E");
    normalized
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| anyhow!("unrecognized value '{}'", text))
}

/// Ordered list of header cards for one HDU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Replace the first card with this keyword, or append one.
    pub fn set(&mut self, keyword: &str, value: Value) -> &mut Self {
        let keyword = keyword.to_ascii_uppercase();
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => card.value = Some(value),
            None => self.cards.push(Card::new(&keyword, value)),
        }
        self
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|c| c.keyword.eq_ignore_ascii_case(keyword))
            .and_then(|c| c.value.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword)? {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        match self.get(keyword)? {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        match self.get(keyword)? {
            Value::Logical(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword)? {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn require_int(&self, keyword: &str) -> Result<i64> {
        self.get_int(keyword)
            .ok_or_else(|| anyhow!("missing or non-integer keyword {}", keyword))
    }

    /// Axis lengths for `<prefix>1..<prefix>N`, returned slowest axis first.
    pub fn axes(&self, prefix: &str) -> Result<Vec<usize>> {
        let ndim = self.require_int(prefix)?;
        if !(0..=999).contains(&ndim) {
            bail!("{} = {} is out of range", prefix, ndim);
        }
        let mut axes = Vec::with_capacity(ndim as usize);
        for axis in (1..=ndim).rev() {
            let key = format!("{}{}", prefix, axis);
            let len = self.require_int(&key)?;
            if len < 0 {
                bail!("{} = {} is negative", key, len);
            }
            axes.push(len as usize);
        }
        Ok(axes)
    }

    /// Read header blocks up to and including the `END` card.
    ///
    /// Returns `None` on a clean end of stream before the first block, and
    /// otherwise the header together with the number of bytes consumed.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<(Header, u64)>> {
        let mut header = Header::new();
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut consumed = 0u64;
        loop {
            if !read_block(reader, &mut block)? {
                if consumed == 0 {
                    return Ok(None);
                }
                bail!("unexpected end of file inside header");
            }
            consumed += BLOCK_SIZE as u64;
            for raw in block.chunks(CARD_SIZE) {
                if is_end_card(raw) {
                    return Ok(Some((header, consumed)));
                }
                if raw.iter().all(|&b| b == b' ') {
                    continue;
                }
                header.push(Card::parse(raw)?);
            }
        }
    }

    /// Serialize with an `END` card, padded with spaces to a block boundary.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.cards.len() + 1) * CARD_SIZE);
        for card in &self.cards {
            out.extend_from_slice(card.to_record().as_bytes());
        }
        out.extend_from_slice(format!("{:<80}", "END").as_bytes());
        let padded = crate::padded_len(out.len() as u64) as usize;
        out.resize(padded, b' ');
        out
    }
}

fn is_end_card(raw: &[u8]) -> bool {
    raw.starts_with(b"END") && raw[3..].iter().all(|&b| b == b' ')
}

fn read_block<R: Read>(reader: &mut R, block: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < block.len() {
        let n = reader.read(&mut block[filled..]).context("read header block")?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            bail!("truncated header block ({} of {} bytes)", filled, block.len());
        }
        filled += n;
    }
    Ok(true)
}
