use winnow::ascii::till_line_ending;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::{Permission, RuleNode};

use super::parser::ParsedPolicy;

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.'
        }),
    )
        .take()
        .parse_next(input)
}

// -- Expressions (precedence: OR < AND < NOT < primary) ---------------------

fn primary(input: &mut &str) -> ModalResult<RuleNode> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expr, (ws, ')')),
        ident.map(|name: &str| RuleNode::Check(name.to_owned())),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<RuleNode> {
    ws.parse_next(input)?;
    if opt(alt(("NOT", "not"))).parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        Ok(RuleNode::Not(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<RuleNode> {
    let first = unary(input)?;
    let rest: Vec<RuleNode> =
        repeat(0.., preceded((ws, alt(("AND", "and"))), cut_err(unary))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| RuleNode::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<RuleNode> {
    let first = and_expr(input)?;
    let rest: Vec<RuleNode> =
        repeat(0.., preceded((ws, alt(("OR", "or"))), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| RuleNode::Or(Box::new(acc), Box::new(r))))
}

fn expr(input: &mut &str) -> ModalResult<RuleNode> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Permission definitions -------------------------------------------------

fn permit_def(input: &mut &str) -> ModalResult<Permission> {
    ws.parse_next(input)?;
    "permit".parse_next(input)?;
    ws.parse_next(input)?;

    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "permission name",
        )))
        .parse_next(input)?;

    ws.parse_next(input)?;
    cut_err(':').parse_next(input)?;

    let rule = cut_err(expr)
        .context(StrContext::Expected(StrContextValue::Description(
            "permission rule",
        )))
        .parse_next(input)?;

    Ok(Permission {
        name: name.to_owned(),
        rule,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_policy(input: &mut &str) -> ModalResult<ParsedPolicy> {
    let permissions: Vec<Permission> = repeat(0.., permit_def).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(ParsedPolicy { permissions })
}
