//! Window match rules, e.g. `type=normal | (type=dialog & !title=^Save)`.

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

use crate::error::{Result, ShowdeskError};
use crate::host::{WindowId, WindowProperties, WindowStateFlags, WindowType};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Term(String),
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Class,
    Name,
    Title,
    Role,
}

#[derive(Debug, Clone)]
enum Expr {
    Nothing,
    Any,
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Type(WindowType),
    State(WindowStateFlags),
    Xid(WindowId),
    Pattern(Field, Regex),
}

impl Expr {
    fn eval(&self, props: &WindowProperties) -> bool {
        match self {
            Expr::Nothing => false,
            Expr::Any => true,
            Expr::Not(inner) => !inner.eval(props),
            Expr::And(a, b) => a.eval(props) && b.eval(props),
            Expr::Or(a, b) => a.eval(props) || b.eval(props),
            Expr::Type(t) => props.window_type == *t,
            Expr::State(flags) => props.state.contains(*flags),
            Expr::Xid(id) => props.id == *id,
            Expr::Pattern(field, re) => {
                let value = match field {
                    Field::Class => props.class.as_deref(),
                    Field::Name => props.name.as_deref(),
                    Field::Title => props.title.as_deref(),
                    Field::Role => props.role.as_deref(),
                };
                value.is_some_and(|v| re.is_match(v))
            }
        }
    }
}

/// A parsed window match rule. Keeps its source text for display.
#[derive(Debug, Clone)]
pub struct WindowMatch {
    source: String,
    expr: Expr,
}

impl WindowMatch {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source);
        let expr = if tokens.is_empty() {
            Expr::Nothing
        } else {
            let mut parser = Parser {
                tokens: &tokens,
                pos: 0,
                source,
            };
            let expr = parser.parse_or()?;
            if parser.pos != tokens.len() {
                return Err(parser.error("unexpected trailing input"));
            }
            expr
        };
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    /// Rule matching every window.
    pub fn any() -> Self {
        Self {
            source: "any".to_string(),
            expr: Expr::Any,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, props: &WindowProperties) -> bool {
        self.expr.eval(props)
    }
}

impl PartialEq for WindowMatch {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl FromStr for WindowMatch {
    type Err = ShowdeskError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for WindowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for WindowMatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Split into operators and terms. A backslash makes the next operator
/// character literal; other escapes are left for the regex engine.
fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut term = String::new();
    let mut chars = source.chars();

    fn flush(term: &mut String, tokens: &mut Vec<Token>) {
        let trimmed = term.trim();
        if !trimmed.is_empty() {
            tokens.push(Token::Term(trimmed.to_string()));
        }
        term.clear();
    }

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(n @ ('&' | '|' | '(' | ')' | '!' | '\\')) => term.push(n),
                Some(n) => {
                    term.push('\\');
                    term.push(n);
                }
                None => term.push('\\'),
            },
            '(' => {
                flush(&mut term, &mut tokens);
                tokens.push(Token::LParen);
            }
            ')' => {
                flush(&mut term, &mut tokens);
                tokens.push(Token::RParen);
            }
            '&' => {
                flush(&mut term, &mut tokens);
                tokens.push(Token::And);
            }
            '|' => {
                flush(&mut term, &mut tokens);
                tokens.push(Token::Or);
            }
            '!' if term.trim().is_empty() => {
                term.clear();
                tokens.push(Token::Not);
            }
            _ => term.push(c),
        }
    }
    flush(&mut term, &mut tokens);
    tokens
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> ShowdeskError {
        ShowdeskError::InvalidMatch {
            expr: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.error("unexpected end of expression"))?;
        self.pos += 1;
        match token {
            Token::Not => Ok(Expr::Not(Box::new(self.parse_unary()?))),
            Token::LParen => {
                let inner = self.parse_or()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(self.error("missing ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Term(term) => self.parse_term(&term),
            Token::RParen | Token::And | Token::Or => Err(self.error("expected a term")),
        }
    }

    fn parse_term(&self, term: &str) -> Result<Expr> {
        if term.eq_ignore_ascii_case("any") || term.eq_ignore_ascii_case("all") {
            return Ok(Expr::Any);
        }
        let (key, value) = term
            .split_once('=')
            .ok_or_else(|| self.error(&format!("'{}' is not key=value", term)))?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "type" => WindowType::from_name(value)
                .map(Expr::Type)
                .ok_or_else(|| self.error(&format!("unknown window type '{}'", value))),
            "state" => {
                let name = value.to_ascii_uppercase().replace('-', "_");
                WindowStateFlags::from_name(&name)
                    .map(Expr::State)
                    .ok_or_else(|| self.error(&format!("unknown window state '{}'", value)))
            }
            "xid" => parse_xid(value)
                .map(Expr::Xid)
                .ok_or_else(|| self.error(&format!("invalid window id '{}'", value))),
            _ => {
                let (insensitive, field_name) = match key.strip_prefix('i') {
                    Some(rest) if field_for(rest).is_some() => (true, rest),
                    _ => (false, key.as_str()),
                };
                let field = field_for(field_name)
                    .ok_or_else(|| self.error(&format!("unknown key '{}'", key)))?;
                let regex = RegexBuilder::new(value)
                    .case_insensitive(insensitive)
                    .build()
                    .map_err(|e| self.error(&e.to_string()))?;
                Ok(Expr::Pattern(field, regex))
            }
        }
    }
}

fn field_for(key: &str) -> Option<Field> {
    match key {
        "class" => Some(Field::Class),
        "name" => Some(Field::Name),
        "title" => Some(Field::Title),
        "role" => Some(Field::Role),
        _ => None,
    }
}

fn parse_xid(value: &str) -> Option<WindowId> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => WindowId::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(window_type: WindowType, title: &str) -> WindowProperties {
        WindowProperties {
            id: 0x400001,
            window_type,
            state: WindowStateFlags::empty(),
            class: Some("Firefox".to_string()),
            name: Some("Navigator".to_string()),
            title: Some(title.to_string()),
            role: None,
        }
    }

    #[test]
    fn test_default_rule() {
        let rule = WindowMatch::parse("type=toolbar | type=utility | type=dialog | type=normal")
            .unwrap();
        assert!(rule.matches(&props(WindowType::Normal, "x")));
        assert!(rule.matches(&props(WindowType::Dialog, "x")));
        assert!(!rule.matches(&props(WindowType::Dock, "x")));
        assert!(!rule.matches(&props(WindowType::Desktop, "x")));
    }

    #[test]
    fn test_precedence_and_negation() {
        // & binds tighter than |
        let rule = WindowMatch::parse("type=dock | type=normal & !title=^Private").unwrap();
        assert!(rule.matches(&props(WindowType::Normal, "Mozilla")));
        assert!(!rule.matches(&props(WindowType::Normal, "Private Browsing")));
        assert!(rule.matches(&props(WindowType::Dock, "Private Browsing")));

        let grouped = WindowMatch::parse("!(type=dock | type=desktop)").unwrap();
        assert!(grouped.matches(&props(WindowType::Normal, "a")));
        assert!(!grouped.matches(&props(WindowType::Dock, "a")));
    }

    #[test]
    fn test_regex_fields() {
        assert!(WindowMatch::parse("class=^Fire").unwrap().matches(&props(WindowType::Normal, "")));
        assert!(!WindowMatch::parse("class=^fire").unwrap().matches(&props(WindowType::Normal, "")));
        assert!(WindowMatch::parse("iclass=^fire").unwrap().matches(&props(WindowType::Normal, "")));
        assert!(WindowMatch::parse("name=Navigator").unwrap().matches(&props(WindowType::Normal, "")));
        // Missing property never matches.
        assert!(!WindowMatch::parse("role=browser").unwrap().matches(&props(WindowType::Normal, "")));
    }

    #[test]
    fn test_escaped_operators_in_values() {
        let rule = WindowMatch::parse(r"title=Tom \& Jerry").unwrap();
        assert!(rule.matches(&props(WindowType::Normal, "Tom & Jerry")));
        let digits = WindowMatch::parse(r"title=^\d+$").unwrap();
        assert!(digits.matches(&props(WindowType::Normal, "1234")));
    }

    #[test]
    fn test_xid_and_state() {
        assert!(WindowMatch::parse("xid=0x400001").unwrap().matches(&props(WindowType::Normal, "")));
        assert!(WindowMatch::parse("xid=4194305").unwrap().matches(&props(WindowType::Normal, "")));

        let mut sticky = props(WindowType::Normal, "");
        sticky.state = WindowStateFlags::STICKY | WindowStateFlags::ABOVE;
        assert!(WindowMatch::parse("state=sticky").unwrap().matches(&sticky));
        assert!(!WindowMatch::parse("state=skip-pager").unwrap().matches(&sticky));
    }

    #[test]
    fn test_empty_matches_nothing_and_any_matches_all() {
        assert!(!WindowMatch::parse("  ").unwrap().matches(&props(WindowType::Normal, "")));
        assert!(WindowMatch::parse("any").unwrap().matches(&props(WindowType::Dock, "")));
        assert!(WindowMatch::any().matches(&props(WindowType::Desktop, "")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            WindowMatch::parse("type=spaceship"),
            Err(ShowdeskError::InvalidMatch { .. })
        ));
        assert!(matches!(
            WindowMatch::parse("(type=normal"),
            Err(ShowdeskError::InvalidMatch { .. })
        ));
        assert!(matches!(
            WindowMatch::parse("type=normal |"),
            Err(ShowdeskError::InvalidMatch { .. })
        ));
        assert!(matches!(
            WindowMatch::parse("colour=red"),
            Err(ShowdeskError::InvalidMatch { .. })
        ));
        assert!(matches!(WindowMatch::parse("title=("), Err(ShowdeskError::InvalidMatch { .. })));
    }

    #[test]
    fn test_display_keeps_source() {
        let rule: WindowMatch = "  type=normal ".parse().unwrap();
        assert_eq!(rule.to_string(), "type=normal");
        assert_eq!(serde_json::to_string(&rule).unwrap(), "\"type=normal\"");
    }
}
