/* Text form of parameter trees
 *
 *   node  := [path ":="] value {"ifpresent" | length}
 *   path  := (ident | "[" int "]") {"." ident | "[" int "]"}
 *   value := "omit" | "?" | "*" | int | "true" | "false" | string | hex "O"
 *          | "{" [items] "}" | "(" nodes ")"
 *          | ("complement" | "superset" | "subset") "(" nodes ")"
 *
 * Items of a braced list are either all `path := node` entries (indexed
 * when the paths start with `[i]`, assignments otherwise) or positional
 * nodes, `-` and `permutation(nodes)`. */

use super::{ParamError, ParamId, ParamItem, ParamNode, ParamValue};
use crate::template::LengthRestriction;

pub fn parse_param(input: &str) -> Result<ParamNode> {
    let mut parser = Parser { input, pos: 0 };
    let node = parser.node()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(node)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

type Result<T> = std::result::Result<T, ParamError>;

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> ParamError {
        ParamError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    /* Consume `token` after optional whitespace */
    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    /* Consume keyword `word` when it is not the prefix of a longer identifier */
    fn eat_keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        let boundary = rest[word.len()..].chars().next().map_or(true, |c| !is_ident_char(c));
        if boundary {
            self.pos += word.len();
        }
        boundary
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_ws();
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let end = chars.find(|(_, c)| !is_ident_char(*c)).map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        Some(rest[..end].to_string())
    }

    fn unsigned(&mut self) -> Result<usize> {
        self.skip_ws();
        let rest = self.rest();
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a number"));
        }
        let value = rest[..end].parse().map_err(|_| self.error("number out of range"))?;
        self.pos += end;
        Ok(value)
    }

    /* `path :=` if one is present here, otherwise nothing is consumed */
    fn path_prefix(&mut self) -> Result<Vec<ParamId>> {
        let start = self.pos;
        match self.path() {
            Ok(path) if !path.is_empty() && self.eat(":=") => Ok(path),
            _ => {
                self.pos = start;
                Ok(Vec::new())
            }
        }
    }

    fn path(&mut self) -> Result<Vec<ParamId>> {
        let mut path = Vec::new();
        loop {
            if self.eat("[") {
                let index = self.unsigned()?;
                self.expect("]")?;
                path.push(ParamId::Index(index));
            } else if path.is_empty() || self.eat(".") {
                match self.ident() {
                    Some(name) => path.push(ParamId::Name(name)),
                    None if path.is_empty() => return Ok(path),
                    None => return Err(self.error("expected a field name")),
                }
            } else {
                return Ok(path);
            }
        }
    }

    fn node(&mut self) -> Result<ParamNode> {
        let path = self.path_prefix()?;
        let value = self.value()?;
        let mut node = ParamNode::new(value).at(path);
        loop {
            if self.eat_keyword("ifpresent") {
                node.if_present = true;
            } else if self.eat_keyword("length") {
                node.length = Some(self.length()?);
            } else {
                return Ok(node);
            }
        }
    }

    fn length(&mut self) -> Result<LengthRestriction> {
        self.expect("(")?;
        let min = self.unsigned()?;
        let restriction = if self.eat("..") {
            let max = if self.eat_keyword("infinity") {
                None
            } else {
                Some(self.unsigned()?)
            };
            LengthRestriction::Range { min, max }
        } else {
            LengthRestriction::Exact(min)
        };
        self.expect(")")?;
        Ok(restriction)
    }

    fn value(&mut self) -> Result<ParamValue> {
        self.skip_ws();
        match self.peek() {
            Some('?') => {
                self.pos += 1;
                Ok(ParamValue::Any)
            }
            Some('*') => {
                self.pos += 1;
                Ok(ParamValue::AnyOrOmit)
            }
            Some('"') => self.charstring().map(ParamValue::Charstring),
            Some('\'') => self.octetstring().map(ParamValue::Octetstring),
            Some('{') => self.braced(),
            Some('(') => {
                self.pos += 1;
                self.node_list().map(ParamValue::TemplateList)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.integer().map(ParamValue::Integer),
            Some(_) => {
                if self.eat_keyword("omit") {
                    Ok(ParamValue::Omit)
                } else if self.eat_keyword("true") {
                    Ok(ParamValue::Boolean(true))
                } else if self.eat_keyword("false") {
                    Ok(ParamValue::Boolean(false))
                } else if self.eat_keyword("complement") {
                    self.expect("(")?;
                    self.node_list().map(ParamValue::Complement)
                } else if self.eat_keyword("superset") {
                    self.expect("(")?;
                    self.node_list().map(ParamValue::Superset)
                } else if self.eat_keyword("subset") {
                    self.expect("(")?;
                    self.node_list().map(ParamValue::Subset)
                } else {
                    Err(self.error("expected a value"))
                }
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn integer(&mut self) -> Result<i64> {
        let rest = self.rest();
        let digits_start = usize::from(rest.starts_with('-'));
        let end = rest[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(rest.len(), |i| i + digits_start);
        if end == digits_start {
            return Err(self.error("expected digits"));
        }
        let value = rest[..end].parse().map_err(|_| self.error("integer out of range"))?;
        self.pos += end;
        Ok(value)
    }

    fn charstring(&mut self) -> Result<String> {
        let start = self.pos;
        let mut out = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                other => out.push(other),
            }
        }
        self.pos = start;
        Err(self.error("unterminated string"))
    }

    fn octetstring(&mut self) -> Result<Vec<u8>> {
        let rest = self.rest();
        let Some(close) = rest[1..].find('\'') else {
            return Err(self.error("unterminated octetstring"));
        };
        let digits = &rest[1..close + 1];
        if !rest[close + 2..].starts_with('O') {
            return Err(self.error("expected 'O' after octetstring digits"));
        }
        let bytes = hex::decode(digits).map_err(|err| self.error(format!("bad octetstring: {}", err)))?;
        self.pos += close + 3;
        Ok(bytes)
    }

    /* After an opening parenthesis */
    fn node_list(&mut self) -> Result<Vec<ParamNode>> {
        let mut nodes = Vec::new();
        if self.eat(")") {
            return Ok(nodes);
        }
        loop {
            nodes.push(self.node()?);
            if self.eat(")") {
                return Ok(nodes);
            }
            self.expect(",")?;
        }
    }

    fn braced(&mut self) -> Result<ParamValue> {
        self.expect("{")?;
        if self.eat("}") {
            return Ok(ParamValue::ValueList(Vec::new()));
        }

        let start = self.pos;
        let keyed = !self.path_prefix()?.is_empty();
        self.pos = start;
        if keyed {
            return self.keyed_list();
        }

        let mut items = Vec::new();
        loop {
            items.push(self.item()?);
            if self.eat("}") {
                return Ok(ParamValue::ValueList(items));
            }
            self.expect(",")?;
        }
    }

    fn item(&mut self) -> Result<ParamItem> {
        self.skip_ws();
        let not_used = self.rest().starts_with('-') && !self.rest()[1..].starts_with(|c: char| c.is_ascii_digit());
        if not_used {
            self.pos += 1;
            return Ok(ParamItem::NotUsed);
        }
        if self.eat_keyword("permutation") {
            self.expect("(")?;
            return self.node_list().map(ParamItem::Permutation);
        }
        self.node().map(ParamItem::Node)
    }

    /* `{[0] := a, [2].x := b}` or `{x := a, y.z := b}` */
    fn keyed_list(&mut self) -> Result<ParamValue> {
        let mut indexed = Vec::new();
        let mut assigned = Vec::new();
        loop {
            let mut node = self.node()?;
            if node.path.is_empty() {
                return Err(self.error("expected 'name :=' or '[index] :='"));
            }
            match node.path.remove(0) {
                ParamId::Index(index) if assigned.is_empty() => indexed.push((index, node)),
                ParamId::Name(name) if indexed.is_empty() => assigned.push((name, node)),
                _ => return Err(self.error("indexed and named entries cannot be mixed")),
            }
            if self.eat("}") {
                break;
            }
            self.expect(",")?;
        }
        Ok(if indexed.is_empty() {
            ParamValue::AssignmentList(assigned)
        } else {
            ParamValue::IndexedList(indexed)
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(value: ParamValue) -> ParamNode {
        ParamNode::new(value)
    }

    #[test]
    fn scalars_and_modifiers() {
        assert_eq!(parse_param("omit").unwrap(), node(ParamValue::Omit));
        assert_eq!(parse_param(" -42 ").unwrap(), node(ParamValue::Integer(-42)));
        assert_eq!(parse_param("'0aFF'O").unwrap(), node(ParamValue::Octetstring(vec![0x0a, 0xff])));
        assert_eq!(parse_param(r#""a\"b""#).unwrap(), node(ParamValue::Charstring("a\"b".into())));

        let parsed = parse_param("? length(1..infinity) ifpresent").unwrap();
        assert!(parsed.if_present);
        assert_eq!(parsed.length, Some(LengthRestriction::Range { min: 1, max: None }));
    }

    #[test]
    fn value_list_with_unused_and_permutation() {
        let parsed = parse_param("{1, -, permutation(2, 3), -4}").unwrap();
        assert_eq!(
            parsed.value,
            ParamValue::ValueList(vec![
                ParamItem::Node(node(ParamValue::Integer(1))),
                ParamItem::NotUsed,
                ParamItem::Permutation(vec![node(ParamValue::Integer(2)), node(ParamValue::Integer(3))]),
                ParamItem::Node(node(ParamValue::Integer(-4))),
            ])
        );
    }

    #[test]
    fn keyed_lists_and_paths() {
        let parsed = parse_param("msg.items[2] := {[0] := true, [3].x := omit}").unwrap();
        assert_eq!(
            parsed.path,
            vec![ParamId::Name("msg".into()), ParamId::Name("items".into()), ParamId::Index(2)]
        );
        let ParamValue::IndexedList(entries) = parsed.value else {
            panic!("expected an indexed list");
        };
        assert_eq!(entries[0], (0, node(ParamValue::Boolean(true))));
        assert_eq!(entries[1].0, 3);
        assert_eq!(entries[1].1.path, vec![ParamId::Name("x".into())]);

        let parsed = parse_param("{ num := 5 }").unwrap();
        assert_eq!(
            parsed.value,
            ParamValue::AssignmentList(vec![("num".into(), node(ParamValue::Integer(5)))])
        );
    }

    #[test]
    fn keyword_prefixes_are_identifiers() {
        /* `omitted` is a field name, not `omit` */
        let parsed = parse_param("{omitted := 1}").unwrap();
        assert!(matches!(parsed.value, ParamValue::AssignmentList(_)));
    }

    #[test]
    fn errors_carry_offsets() {
        assert!(matches!(parse_param("{1, 2"), Err(ParamError::Parse { offset: 5, .. })));
        assert!(matches!(parse_param("1 2"), Err(ParamError::Parse { offset: 2, .. })));
        assert!(matches!(parse_param("{[0] := 1, x := 2}"), Err(ParamError::Parse { .. })));
    }
}
