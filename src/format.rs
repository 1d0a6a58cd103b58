use std::fmt;

/// Character occupying the unused positions of a magic code.
pub const FILLER: u8 = b'.';

/// Built-in output formats: file name suffix and the magic of its data chunk.
pub const BUILTIN_FORMATS: &[(&str, [u8; 4])] = &[
    (".p", *b"p..."),
    (".pn", *b"pn.."),
    (".pc", *b"pc.."),
    (".pt", *b"pt.."),
    (".pnc", *b"pnc."),
    (".pnt", *b"pnt."),
    (".pct", *b"pct."),
    (".pnct", *b"pnct"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    Normal,
    Color,
    Texcoord,
}

impl Attribute {
    /// All attributes, in the order they are laid out within a vertex.
    pub const ALL: [Attribute; 4] = [
        Attribute::Position,
        Attribute::Normal,
        Attribute::Color,
        Attribute::Texcoord,
    ];

    pub const fn letter(self) -> u8 {
        match self {
            Self::Position => b'p',
            Self::Normal => b'n',
            Self::Color => b'c',
            Self::Texcoord => b't',
        }
    }

    /// Returns the byte size of the attribute within a vertex.
    pub const fn size(self) -> usize {
        match self {
            // 3 x f32
            Self::Position | Self::Normal => 12,
            // 4 x u8
            Self::Color => 4,
            // 2 x f32
            Self::Texcoord => 8,
        }
    }

    fn from_letter(letter: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.letter() == letter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Invalid magic {magic:?}: {reason}")]
    BadMagic { magic: String, reason: &'static str },
    #[error("Format suffix {0:?} must start with '.' and name at least one character after it")]
    BadSuffix(String),
    #[error("Format suffix {short:?} is a suffix of {long:?}; output names would be ambiguous")]
    AmbiguousTable { short: String, long: String },
    #[error("Format suffixes {0:?} and {1:?} share the same magic")]
    DuplicateMagic(String, String),
    #[error("Output name {target:?} has no recognized format suffix; expected one of: {}", .valid.join(", "))]
    UnknownSuffix { target: String, valid: Vec<String> },
    #[error("Output name {target:?} matches several format suffixes: {}", .candidates.join(", "))]
    AmbiguousSuffix {
        target: String,
        candidates: Vec<String>,
    },
}

/// The set of vertex attributes stored in a data chunk, and their layout.
///
/// Attributes are packed in the fixed order position, normal, color,
/// texcoord. Attributes that are not enabled are omitted entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescriptor {
    magic: [u8; 4],
    position: bool,
    normal: bool,
    color: bool,
    texcoord: bool,
}

impl FormatDescriptor {
    /// Parse a magic code such as `pnc.`.
    ///
    /// Attribute letters must appear in layout order and be followed only
    /// by filler characters.
    pub fn from_magic(magic: [u8; 4]) -> Result<Self, FormatError> {
        let bad = |reason| FormatError::BadMagic {
            magic: String::from_utf8_lossy(&magic).into_owned(),
            reason,
        };
        let mut r = Self {
            magic,
            position: false,
            normal: false,
            color: false,
            texcoord: false,
        };
        let mut last: Option<usize> = None;
        let mut in_filler = false;
        for byte in magic {
            if byte == FILLER {
                in_filler = true;
                continue;
            }
            if in_filler {
                return Err(bad("attribute letter after filler"));
            }
            let attr = Attribute::from_letter(byte)
                .ok_or_else(|| bad("unknown attribute letter"))?;
            let pos = attr as usize;
            if last.is_some_and(|l| l >= pos) {
                return Err(bad("attribute letters out of order or repeated"));
            }
            last = Some(pos);
            match attr {
                Attribute::Position => r.position = true,
                Attribute::Normal => r.normal = true,
                Attribute::Color => r.color = true,
                Attribute::Texcoord => r.texcoord = true,
            }
        }
        if last.is_none() {
            return Err(bad("no attributes enabled"));
        }
        Ok(r)
    }

    pub fn magic(&self) -> [u8; 4] {
        self.magic
    }

    /// The magic as text. Always ASCII.
    pub fn magic_str(&self) -> &str {
        std::str::from_utf8(&self.magic).unwrap_or("????")
    }

    pub fn has(&self, attr: Attribute) -> bool {
        match attr {
            Attribute::Position => self.position,
            Attribute::Normal => self.normal,
            Attribute::Color => self.color,
            Attribute::Texcoord => self.texcoord,
        }
    }

    /// Enabled attributes, in layout order.
    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::ALL.into_iter().filter(|a| self.has(*a))
    }

    /// Bytes per vertex: the sum of the sizes of the enabled attributes.
    pub fn vertex_stride(&self) -> usize {
        self.attributes().map(Attribute::size).sum()
    }

    /// Byte offset of an attribute within a vertex, if enabled.
    pub fn offset_of(&self, attr: Attribute) -> Option<usize> {
        if !self.has(attr) {
            return None;
        }
        Some(self.attributes().take_while(|a| *a != attr).map(Attribute::size).sum())
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes/vertex)", self.magic_str(), self.vertex_stride())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    pub suffix: String,
    pub format: FormatDescriptor,
}

/// Lookup table from output name suffixes to formats.
///
/// Construction checks that no suffix is a suffix of another, so at most
/// one entry can ever match an output name.
#[derive(Debug, Clone)]
pub struct FormatTable {
    entries: Vec<FormatEntry>,
}

impl FormatTable {
    pub fn builtin() -> Result<Self, FormatError> {
        Self::new(BUILTIN_FORMATS.iter().copied())
    }

    pub fn new<'a>(
        entries: impl IntoIterator<Item = (&'a str, [u8; 4])>,
    ) -> Result<Self, FormatError> {
        let mut r = Vec::new();
        for (suffix, magic) in entries {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(FormatError::BadSuffix(suffix.to_owned()));
            }
            r.push(FormatEntry {
                suffix: suffix.to_owned(),
                format: FormatDescriptor::from_magic(magic)?,
            });
        }
        let table = Self { entries: r };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), FormatError> {
        for (i, a) in self.entries.iter().enumerate() {
            for b in self.entries.iter().skip(i + 1) {
                if a.format.magic == b.format.magic {
                    return Err(FormatError::DuplicateMagic(
                        a.suffix.clone(),
                        b.suffix.clone(),
                    ));
                }
                let (short, long) = if a.suffix.len() <= b.suffix.len() {
                    (a, b)
                } else {
                    (b, a)
                };
                if long.suffix.ends_with(&short.suffix) {
                    return Err(FormatError::AmbiguousTable {
                        short: short.suffix.clone(),
                        long: long.suffix.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[FormatEntry] {
        &self.entries
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.suffix.as_str())
    }

    /// Pick the format named by the suffix of `target` (usually a file name).
    ///
    /// Exactly one suffix must match.
    pub fn resolve(&self, target: &str) -> Result<FormatDescriptor, FormatError> {
        let mut matches = self.entries.iter().filter(|e| target.ends_with(&e.suffix));
        let Some(first) = matches.next() else {
            return Err(FormatError::UnknownSuffix {
                target: target.to_owned(),
                valid: self.suffixes().map(str::to_owned).collect(),
            });
        };
        let rest: Vec<&FormatEntry> = matches.collect();
        if !rest.is_empty() {
            return Err(FormatError::AmbiguousSuffix {
                target: target.to_owned(),
                candidates: std::iter::once(first)
                    .chain(rest)
                    .map(|e| e.suffix.clone())
                    .collect(),
            });
        }
        Ok(first.format)
    }

    pub fn by_magic(&self, magic: [u8; 4]) -> Option<FormatDescriptor> {
        self.entries
            .iter()
            .find(|e| e.format.magic == magic)
            .map(|e| e.format)
    }
}
