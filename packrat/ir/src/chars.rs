//! Character ranges and character classes.
use packrat_utils::{Error, PackratResult};
use std::fmt::{self, Write};

/// An inclusive range of characters. The first character never exceeds the
/// last one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CharRange {
    pub first: char,
    pub last: char,
}

impl CharRange {
    /// Create a new range. The bounds are swapped if they are given in the
    /// wrong order.
    pub fn new(first: char, last: char) -> Self {
        if first <= last {
            CharRange { first, last }
        } else {
            CharRange {
                first: last,
                last: first,
            }
        }
    }

    /// A single-character range.
    pub fn single(c: char) -> Self {
        CharRange { first: c, last: c }
    }

    /// The number of characters in this range.
    pub fn count(&self) -> u32 {
        self.last as u32 - self.first as u32 + 1
    }

    pub fn contains(&self, c: char) -> bool {
        self.first <= c && c <= self.last
    }
}

impl PartialOrd for CharRange {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ranges are ordered by their first character only.
impl Ord for CharRange {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.first.cmp(&other.first)
    }
}

/// A character class. Exclusive classes match every character not in their
/// ranges.
#[derive(Clone, Debug, Default)]
pub struct CharClass {
    pub exclusive: bool,
    pub ranges: Vec<CharRange>,
}

/// Cursor over the body of a character class specification, without the
/// surrounding brackets.
struct ClassParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl ClassParser<'_> {
    fn has_next(&mut self) -> bool {
        self.chars.peek().is_some()
    }

    /// Consume a range delimiter if one is next.
    fn has_range(&mut self) -> bool {
        self.chars.next_if_eq(&'-').is_some()
    }

    fn next(&mut self) -> PackratResult<char> {
        let c = self.chars.next().ok_or_else(|| {
            Error::malformed_structure("unterminated character class")
        })?;
        if c != '\\' {
            return Ok(c);
        }
        let escaped = self.chars.next().ok_or_else(|| {
            Error::malformed_structure("unterminated character escape")
        })?;
        Ok(match escaped {
            'b' => '\u{8}',
            't' => '\t',
            'n' => '\n',
            'f' => '\u{c}',
            'r' => '\r',
            '"' | '\'' | '-' | '[' | '\\' | ']' => escaped,
            'u' => {
                let hex: String = self.chars.by_ref().take(4).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        Error::malformed_structure(format!(
                            "Illegal Unicode escape ('\\u{hex}')"
                        ))
                    })?
            }
            other => {
                return Err(Error::malformed_structure(format!(
                    "Illegal character escape ('\\{other}')"
                )));
            }
        })
    }
}

impl CharClass {
    pub fn new(exclusive: bool, ranges: Vec<CharRange>) -> Self {
        CharClass { exclusive, ranges }
    }

    /// A class matching exactly one character.
    pub fn single(c: char) -> Self {
        CharClass {
            exclusive: false,
            ranges: vec![CharRange::single(c)],
        }
    }

    /// Parse a class specification such as `a-z_\n`. The specification must
    /// not include the enclosing brackets.
    pub fn parse(spec: &str) -> PackratResult<Self> {
        let mut parser = ClassParser {
            chars: spec.chars().peekable(),
        };
        let mut ranges = Vec::new();
        while parser.has_next() {
            let c1 = parser.next()?;
            let c2 = if parser.has_range() { parser.next()? } else { c1 };
            ranges.push(CharRange::new(c1, c2));
        }
        Ok(CharClass {
            exclusive: false,
            ranges,
        })
    }

    /// Sort the ranges and merge overlapping or adjacent ones. Must not be
    /// used on exclusive classes.
    pub fn normalize(&mut self) -> &mut Self {
        self.ranges.sort();

        let mut i = 0;
        while i + 1 < self.ranges.len() {
            let r1 = self.ranges[i];
            let r2 = self.ranges[i + 1];
            if r1.last >= r2.last {
                self.ranges.remove(i + 1);
            } else if r1.last as u32 + 1 >= r2.first as u32 {
                self.ranges[i] = CharRange::new(r1.first, r2.last);
                self.ranges.remove(i + 1);
            } else {
                i += 1;
            }
        }
        self
    }

    /// The number of characters in the ranges, ignoring exclusivity.
    pub fn count(&self) -> u32 {
        self.ranges.iter().map(CharRange::count).sum()
    }

    /// Whether this class and `other` share a character. Only defined for
    /// inclusive classes.
    pub fn overlaps(&self, other: &CharClass) -> PackratResult<bool> {
        if self.exclusive || other.exclusive {
            let culprit = if self.exclusive { self } else { other };
            return Err(Error::contract(format!(
                "overlap test for exclusive character class {culprit}"
            )));
        }
        Ok(other.ranges.iter().any(|r1| {
            self.ranges.iter().any(|r2| {
                r1.contains(r2.first)
                    || r1.contains(r2.last)
                    || r2.contains(r1.first)
                    || r2.contains(r1.last)
            })
        }))
    }

    /// Whether this class matches the character `c`.
    pub fn matches(&self, c: char) -> bool {
        self.ranges.iter().any(|r| r.contains(c)) != self.exclusive
    }
}

/// Two classes are equal if they have the same exclusivity and the same set
/// of ranges, in any order.
impl PartialEq for CharClass {
    fn eq(&self, other: &Self) -> bool {
        self.exclusive == other.exclusive
            && self.ranges.len() == other.ranges.len()
            && other.ranges.iter().all(|r| self.ranges.contains(r))
    }
}

impl Eq for CharClass {}

/// Escape a character for printing inside a character or string literal.
pub fn escape_char(c: char, out: &mut impl Write) -> fmt::Result {
    escape(c, out, &['"', '\'', '\\'])
}

/// Escape a character for printing inside a character class.
fn escape_class_char(c: char, out: &mut impl Write) -> fmt::Result {
    escape(c, out, &['"', '\'', '-', '[', '\\', ']'])
}

fn escape(c: char, out: &mut impl Write, special: &[char]) -> fmt::Result {
    match c {
        '\u{8}' => out.write_str("\\b"),
        '\t' => out.write_str("\\t"),
        '\n' => out.write_str("\\n"),
        '\u{c}' => out.write_str("\\f"),
        '\r' => out.write_str("\\r"),
        c if special.contains(&c) => {
            out.write_char('\\')?;
            out.write_char(c)
        }
        ' '..='~' => out.write_char(c),
        _ => write!(out, "\\u{:04x}", c as u32),
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exclusive {
            f.write_char('!')?;
        }
        f.write_char('[')?;
        for r in &self.ranges {
            escape_class_char(r.first, f)?;
            if r.first != r.last {
                f.write_char('-')?;
                escape_class_char(r.last, f)?;
            }
        }
        f.write_char(']')?;
        if self.exclusive {
            f.write_str(" _")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(klass: &CharClass) -> Vec<(char, char)> {
        klass.ranges.iter().map(|r| (r.first, r.last)).collect()
    }

    #[test]
    fn range_bounds_are_ordered() {
        let r = CharRange::new('z', 'a');
        assert_eq!((r.first, r.last), ('a', 'z'));
        assert_eq!(r.count(), 26);
        assert!(r.contains('m'));
    }

    #[test]
    fn normalize_disjoint_ranges() {
        let mut klass = CharClass::parse("a-cx-z").unwrap();
        klass.normalize();
        assert_eq!(ranges(&klass), vec![('a', 'c'), ('x', 'z')]);
    }

    #[test]
    fn normalize_reversed_range() {
        let mut klass = CharClass::parse("c-ax").unwrap();
        klass.normalize();
        assert_eq!(ranges(&klass), vec![('a', 'c'), ('x', 'x')]);
    }

    #[test]
    fn normalize_merges_adjacent_escapes() {
        let mut klass = CharClass::parse("\\n\\t ").unwrap();
        assert_eq!(klass.ranges.len(), 3);
        klass.normalize();
        assert_eq!(ranges(&klass), vec![('\t', '\n'), (' ', ' ')]);
    }

    #[test]
    fn normalize_drops_contained_ranges() {
        let mut klass = CharClass::parse("a-zb-dA").unwrap();
        klass.normalize();
        assert_eq!(ranges(&klass), vec![('A', 'A'), ('a', 'z')]);
        assert_eq!(klass.count(), 27);
    }

    #[test]
    fn unicode_escape() {
        let klass = CharClass::parse("\\u0041-\\u0043").unwrap();
        assert_eq!(ranges(&klass), vec![('A', 'C')]);
        assert!(CharClass::parse("\\u00G1").is_err());
        assert!(CharClass::parse("\\q").is_err());
    }

    #[test]
    fn equality_ignores_order() {
        let k1 = CharClass::parse("a-cx").unwrap();
        let k2 = CharClass::parse("xa-c").unwrap();
        assert_eq!(k1, k2);
        let mut k3 = k2.clone();
        k3.exclusive = true;
        assert_ne!(k1, k3);
    }

    #[test]
    fn overlap_rejects_exclusive() {
        let k1 = CharClass::parse("a-f").unwrap();
        let k2 = CharClass::parse("e-z").unwrap();
        assert!(k1.overlaps(&k2).unwrap());
        assert!(!k1.overlaps(&CharClass::single('q')).unwrap());
        let k3 = CharClass::new(true, k2.ranges.clone());
        assert!(k1.overlaps(&k3).is_err());
    }

    #[test]
    fn display() {
        let klass = CharClass::new(true, vec![CharRange::new('0', '9')]);
        assert_eq!(klass.to_string(), "![0-9] _");
        assert_eq!(CharClass::parse("\\]\\n").unwrap().to_string(), "[\\]\\n]");
    }
}
