//! A `nom`-based parser that normalizes raw JSONPath strings into flat
//! segment lists.
//!
//! Runs of two or three dots collapse into a single recursive-descent
//! marker, runs of `^` become individual parent segments, bracket-quoted
//! names keep their embedded dots, and filter/script bodies are captured
//! whole (balanced parentheses, quote-aware) for later compilation by the
//! expression engine.

use crate::error::PathError;
use crate::segment::{Segment, TypeTest};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, i64 as nom_i64, multispace0},
    combinator::{map, map_opt, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded},
};

// --- Main Public Parser ---

pub fn parse_path(input: &str) -> Result<Vec<Segment>, PathError> {
    match path(input.trim()) {
        Ok(("", segments)) => Ok(segments),
        Ok((rem, _)) => Err(classify_remainder(input, rem)),
        Err(e) => Err(PathError::parse(input, e.to_string())),
    }
}

/// An unparsed `@name()` tail means an unrecognized value-type test, which
/// deserves a more specific error than a generic parse failure.
fn classify_remainder(input: &str, rem: &str) -> PathError {
    if let Some(name) = rem
        .strip_prefix('@')
        .and_then(|r| r.strip_suffix("()"))
        .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic()))
    {
        return PathError::UnknownType(name.to_string());
    }
    PathError::parse(
        input,
        format!("Parser did not consume all input. Remainder: '{rem}'"),
    )
}

// --- Combinators ---

fn path(input: &str) -> IResult<&str, Vec<Segment>> {
    let (input, _) = opt(char('$')).parse(input)?;
    // A rootless path may open with a bare property name.
    let (input, first) = opt(element).parse(input)?;
    let (input, rest) = many0(segment).parse(input)?;

    let mut segments = Vec::new();
    segments.extend(first);
    for chunk in rest {
        segments.extend(chunk);
    }
    Ok((input, segments))
}

fn segment(input: &str) -> IResult<&str, Vec<Segment>> {
    alt((
        // 2-3 consecutive separators collapse into one recursive-descent
        // marker, optionally followed directly by an element.
        map(
            preceded(alt((tag("..."), tag(".."))), opt(element)),
            |el| {
                let mut out = vec![Segment::Descendant];
                out.extend(el);
                out
            },
        ),
        map(preceded(char('.'), element), |el| vec![el]),
        map(no_dot_element, |el| vec![el]),
    ))
    .parse(input)
}

/// Elements valid after a `.` or `..` separator (or at the very start of
/// a rootless path).
fn element(input: &str) -> IResult<&str, Segment> {
    alt((
        bracket,
        type_test,
        map(char('*'), |_| Segment::Wildcard),
        backtick_literal,
        map(char('$'), |_| Segment::Root),
        map(name, |s| Segment::Key(s.to_string())),
    ))
    .parse(input)
}

/// Elements that attach without a separator: brackets, parent selectors,
/// property-name selectors, and value-type tests.
fn no_dot_element(input: &str) -> IResult<&str, Segment> {
    alt((
        bracket,
        type_test,
        map(char('^'), |_| Segment::Parent),
        map(char('~'), |_| Segment::PropertyName),
    ))
    .parse(input)
}

/// A bare property name. Anything that would carry structural meaning
/// must be bracket-quoted instead.
fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| {
        !matches!(
            c,
            '.' | '[' | ']' | '^' | '~' | '@' | '(' | ')' | '*' | '`' | '$' | ',' | '?' | ':'
                | '\'' | '"'
        ) && !c.is_whitespace()
    })
    .parse(input)
}

fn type_test(input: &str) -> IResult<&str, Segment> {
    map_opt(
        delimited(
            char('@'),
            take_while1(|c: char| c.is_ascii_alphabetic()),
            tag("()"),
        ),
        |test: &str| TypeTest::from_name(test).map(Segment::TypeTest),
    )
    .parse(input)
}

fn backtick_literal(input: &str) -> IResult<&str, Segment> {
    map(
        delimited(
            char('`'),
            take_while1(|c: char| {
                !matches!(c, '.' | '[' | ']' | '^' | '~' | '`') && !c.is_whitespace()
            }),
            opt(char('`')),
        ),
        |s: &str| Segment::Literal(s.to_string()),
    )
    .parse(input)
}

// --- Bracket Expressions ---

fn bracket(input: &str) -> IResult<&str, Segment> {
    delimited(
        char('['),
        delimited(multispace0, bracket_body, multispace0),
        char(']'),
    )
    .parse(input)
}

fn bracket_body(input: &str) -> IResult<&str, Segment> {
    alt((
        filter_expr,
        script_expr,
        map(char('*'), |_| Segment::Wildcard),
        backtick_literal,
        slice,
        union_or_single,
    ))
    .parse(input)
}

fn filter_expr(input: &str) -> IResult<&str, Segment> {
    let (input, _) = char('?').parse(input)?;
    let (input, inner) = balanced_parens(input)?;
    Ok((input, Segment::Filter(inner.trim().to_string())))
}

fn script_expr(input: &str) -> IResult<&str, Segment> {
    let (input, inner) = balanced_parens(input)?;
    Ok((input, Segment::Script(inner.trim().to_string())))
}

/// Consumes a parenthesized run, tracking nesting depth and skipping over
/// string literals, and returns the inner text.
fn balanced_parens(input: &str) -> IResult<&str, &str> {
    let mut chars = input.char_indices();
    if !matches!(chars.next(), Some((_, '('))) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((&input[i + 1..], &input[1..i]));
                    }
                }
                _ => {}
            },
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeUntil,
    )))
}

fn slice(input: &str) -> IResult<&str, Segment> {
    map(
        (
            opt(nom_i64),
            preceded(char(':'), opt(nom_i64)),
            opt(preceded(char(':'), opt(nom_i64))),
        ),
        |(start, end, step)| Segment::Slice {
            start,
            end,
            step: step.flatten(),
        },
    )
    .parse(input)
}

fn union_or_single(input: &str) -> IResult<&str, Segment> {
    map(
        separated_list1(delimited(multispace0, char(','), multispace0), union_part),
        |mut parts| {
            if parts.len() == 1 {
                Segment::Key(parts.remove(0))
            } else {
                Segment::Union(parts)
            }
        },
    )
    .parse(input)
}

fn union_part(input: &str) -> IResult<&str, String> {
    alt((
        map(quoted('\''), str::to_string),
        map(quoted('"'), str::to_string),
        map(recognize(nom_i64), str::to_string),
        map(name, str::to_string),
    ))
    .parse(input)
}

fn quoted(q: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| {
        delimited(char(q), take_while(|c| c != q), char(q)).parse(input)
    }
}
