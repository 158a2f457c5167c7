//! Distinguished name syntax
//!
//! Accepts the RFC 4514 string form plus the RFC 2253 leniencies directory
//! clients commonly accept: `;` as RDN separator, quoted values and spaces
//! around separators.

/// Whether `input` is a syntactically valid, non-empty DN
///
/// Only syntax is checked; the entry may not exist.
pub fn is_valid_dn(input: &str) -> bool {
    if input.trim().is_empty() {
        return false;
    }
    DnParser::new(input).distinguished_name().is_some()
}

struct DnParser {
    chars: Vec<char>,
    pos: usize,
}

impl DnParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(' ') {
            self.pos += 1;
        }
    }

    fn distinguished_name(&mut self) -> Option<()> {
        loop {
            self.rdn()?;
            match self.bump() {
                None => return Some(()),
                Some(',') | Some(';') => continue,
                Some(_) => return None,
            }
        }
    }

    fn rdn(&mut self) -> Option<()> {
        loop {
            self.attribute_type_and_value()?;
            self.skip_spaces();
            if self.peek() == Some('+') {
                self.pos += 1;
            } else {
                return Some(());
            }
        }
    }

    fn attribute_type_and_value(&mut self) -> Option<()> {
        self.skip_spaces();
        self.attribute_type()?;
        self.skip_spaces();
        if self.bump()? != '=' {
            return None;
        }
        self.skip_spaces();
        self.attribute_value()
    }

    /// descr (`cn`, `x-attr`) or numericoid (`2.5.4.3`)
    fn attribute_type(&mut self) -> Option<()> {
        match self.peek()? {
            c if c.is_ascii_alphabetic() => {
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '-') {
                    self.pos += 1;
                }
                Some(())
            }
            c if c.is_ascii_digit() => {
                let mut components = 0;
                loop {
                    let start = self.pos;
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.pos += 1;
                    }
                    if self.pos == start {
                        return None;
                    }
                    components += 1;
                    if self.peek() == Some('.') {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                (components > 1).then_some(())
            }
            _ => None,
        }
    }

    fn attribute_value(&mut self) -> Option<()> {
        match self.peek() {
            Some('#') => self.hex_value(),
            Some('"') => self.quoted_value(),
            _ => self.string_value(),
        }
    }

    fn hex_value(&mut self) -> Option<()> {
        self.pos += 1;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits = self.pos - start;
        self.skip_spaces();
        (digits > 0 && digits % 2 == 0 && self.at_value_end()).then_some(())
    }

    fn quoted_value(&mut self) -> Option<()> {
        self.pos += 1;
        loop {
            match self.bump()? {
                '"' => break,
                '\\' => self.escape()?,
                _ => {}
            }
        }
        self.skip_spaces();
        self.at_value_end().then_some(())
    }

    fn string_value(&mut self) -> Option<()> {
        loop {
            match self.peek() {
                None | Some(',') | Some(';') | Some('+') => return Some(()),
                Some('\\') => {
                    self.pos += 1;
                    self.escape()?;
                }
                Some('"') | Some('<') | Some('>') => return None,
                Some(_) => self.pos += 1,
            }
        }
    }

    /// The character(s) after a backslash: a special or a hex pair
    fn escape(&mut self) -> Option<()> {
        let c = self.bump()?;
        if matches!(c, ' ' | '"' | '#' | '+' | ',' | ';' | '<' | '=' | '>' | '\\') {
            return Some(());
        }
        if c.is_ascii_hexdigit() && self.bump()?.is_ascii_hexdigit() {
            return Some(());
        }
        None
    }

    fn at_value_end(&self) -> bool {
        matches!(self.peek(), None | Some(',') | Some(';') | Some('+'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_dns() {
        for dn in [
            "uid=jdoe,ou=people,dc=example,dc=com",
            "cn=John Doe, ou=people, dc=example, dc=com",
            "cn=G1,o=x",
            "cn=a+sn=b,dc=example",
            "cn=Doe\\, John,dc=example",
            "cn=\"Doe, John\",dc=example",
            "2.5.4.3=jdoe,dc=example",
            "cn=#04024869,dc=example",
            "cn=jdoe;dc=example",
            "cn=",
            "cn=a\\2Cb",
        ] {
            assert!(is_valid_dn(dn), "{} should be a valid DN", dn);
        }
    }

    #[test]
    fn test_invalid_dns() {
        for dn in [
            "",
            "   ",
            "jdoe",
            "john doe",
            "jdoe@example.com",
            "=jdoe",
            "cn=jdoe,",
            "cn=jdoe,,dc=example",
            "cn=a\"b",
            "cn=a\\zz",
            "cn=#123",
            "2.=x",
            "1cn=x",
        ] {
            assert!(!is_valid_dn(dn), "{:?} should not be a valid DN", dn);
        }
    }
}
