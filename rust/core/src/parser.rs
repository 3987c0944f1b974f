// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization, header parsing and string-aware entity scanning.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal body, still escaped: 'it''s' -> it''s
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .TRUE., .ELEMENT.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCTEXT('x'), IFCREAL(1.5)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Scan string content up to the closing apostrophe; '' is an escaped quote
fn string_content(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Ok((&input[i..], &input[..i]));
        }
        i += 1;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse string literal: 'text'
fn string_literal(input: &str) -> IResult<&str, Token> {
    map(
        delimited(char('\''), string_content, char('\'')),
        Token::String,
    )(input)
}

/// Parse integer: 42, -42, +42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.E5
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

/// Parse enum: .TRUE., .F., .ELEMENT.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parse typed value: IFCTEXT('x'), IFCBOOLEAN(.T.)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(pair(keyword, argument_list), |(type_name, args)| {
        Token::TypedValue(type_name, args)
    })(input)
}

/// Skip whitespace and /* comments */
fn ws(input: &str) -> IResult<&str, ()> {
    let mut rest = input;
    loop {
        let (r, _) = take_while(|c: char| c.is_whitespace())(rest)?;
        rest = r;
        match rest.strip_prefix("/*") {
            Some(comment) => match comment.find("*/") {
                Some(end) => rest = &comment[end + 2..],
                None => return Ok(("", ())),
            },
            None => return Ok((rest, ())),
        }
    }
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // float before integer, both start with digits
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

fn argument_list(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        separated_list0(char(','), token),
        preceded(ws, char(')')),
    )(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(argument_list, Token::List)(input)
}

/// Parse a complete entity instance
/// Example: #123=IFCWALL('guid','owner',$,$,'name',$,$,$);
pub fn parse_entity(input: &str) -> Result<(u32, &str, Vec<Token>)> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(char('='), delimited(ws, keyword, ws)),
        terminated(argument_list, tuple((ws, char(';')))),
    ))(input);

    match result {
        Ok((_, (id, type_name, args))) => Ok((id, type_name, args)),
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Parse a header statement such as FILE_SCHEMA(('IFC2X3'));
fn header_statement(input: &str) -> IResult<&str, (&str, Vec<Token>)> {
    terminated(
        pair(delimited(ws, keyword, ws), argument_list),
        tuple((ws, char(';'))),
    )(input)
}

/// Contents of the STEP HEADER section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepHeader {
    /// FILE_DESCRIPTION description strings
    pub description: Vec<String>,
    /// FILE_NAME name
    pub file_name: Option<String>,
    /// FILE_NAME time stamp
    pub time_stamp: Option<String>,
    /// FILE_NAME originating system
    pub originating_system: Option<String>,
    /// FILE_SCHEMA identifiers, e.g. ["IFC4X3_ADD2"]
    pub schema_identifiers: Vec<String>,
}

impl StepHeader {
    /// First schema identifier, upper-cased
    pub fn schema(&self) -> Option<String> {
        self.schema_identifiers.first().map(|s| s.to_ascii_uppercase())
    }
}

fn strings_of(token: &Token) -> Vec<String> {
    match token {
        Token::String(s) => vec![crate::step_string::decode_step_string(s)],
        Token::List(items) => items.iter().flat_map(strings_of).collect(),
        _ => Vec::new(),
    }
}

fn string_at(args: &[Token], index: usize) -> Option<String> {
    match args.get(index) {
        Some(Token::String(s)) => Some(crate::step_string::decode_step_string(s)),
        _ => None,
    }
}

/// Parse the HEADER section of a STEP file
pub fn parse_header(content: &str) -> Result<StepHeader> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if !trimmed.starts_with("ISO-10303-21;") {
        return Err(Error::MissingHeader(
            "file does not start with ISO-10303-21;".into(),
        ));
    }

    let header_start = content
        .find("HEADER;")
        .ok_or_else(|| Error::MissingHeader("no HEADER section".into()))?;
    let body = &content[header_start + "HEADER;".len()..];
    let end = body
        .find("ENDSEC;")
        .ok_or_else(|| Error::MissingHeader("HEADER section is not terminated".into()))?;
    let mut rest = &body[..end];

    let mut header = StepHeader::default();
    loop {
        let (r, _) = ws(rest).map_err(|e| Error::parse(header_start, e.to_string()))?;
        if r.is_empty() {
            break;
        }
        let (r, (name, args)) = header_statement(r).map_err(|e| {
            Error::parse(header_start, format!("Invalid header statement: {}", e))
        })?;
        match name.to_ascii_uppercase().as_str() {
            "FILE_DESCRIPTION" => {
                header.description = args.first().map(strings_of).unwrap_or_default();
            }
            "FILE_NAME" => {
                header.file_name = string_at(&args, 0);
                header.time_stamp = string_at(&args, 1);
                header.originating_system = string_at(&args, 5);
            }
            "FILE_SCHEMA" => {
                header.schema_identifiers = args.first().map(strings_of).unwrap_or_default();
            }
            _ => {}
        }
        rest = r;
    }

    Ok(header)
}

/// Find the end of a STEP statement (index just past ';'), skipping string literals
pub(crate) fn statement_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let offset = memchr::memchr2(b';', b'\'', &bytes[pos..])?;
        let at = pos + offset;
        if bytes[at] == b';' {
            return Some(at + 1);
        }
        // Inside a string: advance to the closing apostrophe, treating '' as escaped
        let mut i = at + 1;
        loop {
            let close = memchr::memchr(b'\'', &bytes[i..])?;
            i += close + 1;
            if bytes.get(i) == Some(&b'\'') {
                i += 1;
                continue;
            }
            break;
        }
        pos = i;
    }
}

/// Recognise `END-ISO-10303-21;` at the end of the content
pub fn has_trailer(content: &str) -> bool {
    let trimmed = content.trim_end();
    let r: IResult<&str, &str> = tag("END-ISO-10303-21;")(
        &trimmed[trimmed.len().saturating_sub("END-ISO-10303-21;".len())..],
    );
    r.is_ok()
}
