use std::borrow::Cow;
use std::convert::TryFrom;
use std::str::FromStr;

use indexmap::IndexSet;
use lazy_static::lazy_static;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser as PestParser;
use rust_decimal::Decimal;

use beancount_core as bc;

use error::{ParseError, ParseResult};

pub mod error;
pub mod validation;

macro_rules! construct {
    ( @fields, $builder:ident, $span:ident, $pairs:ident, ) => {};
    ( @fields, $builder:ident, $span:ident, $pairs:ident, $field:ident = if $rule:path $then:block else $else:block; $($rest:tt)* ) => {
        let $builder = match $pairs.peek() {
            Some(ref p) if p.as_rule() == $rule => {
                let f = $then;
                let pair = $pairs.next()
                    .ok_or_else(|| ParseError::invalid_state_with_span(stringify!($field), $span.clone()))?;
                $builder.$field(f(pair)?)
            },
            _ => $builder.$field($else),
        };
        construct!(@fields, $builder, $span, $pairs, $($rest)*)
    };
    ( @fields, $builder:ident, $span:ident, $pairs:ident, let $pat:pat = from $name:ident $block:block; $($rest:tt)* ) => {
        let $name = $pairs.next()
            .ok_or_else(|| ParseError::invalid_state_with_span(stringify!($pat), $span.clone()))?;
        let $pat = $block;
        construct!(@fields, $builder, $span, $pairs, $($rest)*)
    };
    ( @fields, $builder:ident, $span:ident, $pairs:ident, let $pat:pat = from $name:ident if $rule:path $then:block else $else:block; $($rest:tt)* ) => {
        let $pat = match $pairs.peek() {
            Some(ref p) if p.as_rule() == $rule => {
                let $name = $pairs.next()
                    .ok_or_else(|| ParseError::invalid_state_with_span(stringify!($pat), $span.clone()))?;
                $then
            },
            _ => $else,
        };
        construct!(@fields, $builder, $span, $pairs, $($rest)*)
    };
    ( @fields, $builder:ident, $span:ident, $pairs:ident, $field:ident ?= $f:expr; $($rest:tt)* ) => {
        let $builder = $builder.$field($pairs.next().map($f).transpose()?);
        construct!(@fields, $builder, $span, $pairs, $($rest)*)
    };
    ( @fields, $builder:ident, $span:ident, $pairs:ident, $field:ident := $val:expr; $($rest:tt)* ) => {
        let $builder = $builder.$field($val);
        construct!(@fields, $builder, $span, $pairs, $($rest)*)
    };
    ( @fields, $builder:ident, $span:ident, $pairs:ident, $field:ident = $f:expr; $($rest:tt)* ) => {
        let f = $f;
        let pair = $pairs.next().ok_or_else(|| ParseError::invalid_state(stringify!($field)))?;
        let $builder = $builder.$field(f(pair)?.into());
        construct!(@fields, $builder, $span, $pairs, $($rest)*)
    };
    ( $builder:ty : $pair:expr => { $($field:tt)* } ) => {
        {
            let builder = <$builder>::builder();
            let _span = $pair.as_span();
            let mut pairs = $pair.into_inner();
            construct!(@fields, builder, _span, pairs, $($field)*);
            builder.build()
        }
    };
}

lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::subtract, Assoc::Left))
        .op(Op::infix(Rule::multiply, Assoc::Left) | Op::infix(Rule::divide, Assoc::Left))
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::pos));
}

#[derive(PestParser)]
#[grammar = "beancount.pest"]
pub struct BeancountParser;

/// Name recorded as filename for input that did not come from a file.
pub const STRING_SOURCE: &str = "<string>";

/// Per-file parsing context.
#[derive(Debug, Clone, Copy)]
struct ParseState<'i> {
    filename: &'i str,
}

impl<'i> ParseState<'i> {
    fn location(&self, pair: &Pair<'i, Rule>) -> bc::Location<'i> {
        let (line, _) = pair.as_span().start_pos().line_col();
        bc::Location::new(self.filename, line as i64)
    }
}

fn optional_rule<'i>(rule: Rule, pairs: &mut Pairs<'i, Rule>) -> Option<Pair<'i, Rule>> {
    match pairs.peek() {
        Some(ref p) if p.as_rule() == rule => pairs.next(),
        _ => None,
    }
}

/// Parses a ledger held in memory.
pub fn parse(input: &str) -> ParseResult<bc::Ledger<'_>> {
    parse_named(STRING_SOURCE, input)
}

/// Parses a ledger read from `filename`; every directive records its line in that file.
pub fn parse_named<'i>(filename: &'i str, input: &'i str) -> ParseResult<bc::Ledger<'i>> {
    let parsed = BeancountParser::parse(Rule::file, input)?
        .next()
        .ok_or_else(|| ParseError::invalid_state("non-empty parse result"))?;

    let state = ParseState { filename };
    let mut directives = Vec::new();

    for directive_pair in parsed.into_inner() {
        match directive_pair.as_rule() {
            Rule::EOI => break,
            Rule::org_mode_title => {}
            _ => directives.push(directive(directive_pair, &state)?),
        }
    }

    Ok(bc::Ledger::builder().directives(directives).build())
}

fn directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let dir = match directive.as_rule() {
        Rule::option => option_directive(directive, state)?,
        Rule::plugin => plugin_directive(directive, state)?,
        Rule::open => open_directive(directive, state)?,
        Rule::commodity_directive => commodity_directive(directive, state)?,
        Rule::event => event_directive(directive, state)?,
        Rule::price => price_directive(directive, state)?,
        Rule::transaction => transaction_directive(directive, state)?,
        rule => {
            return Err(ParseError::invalid_state_with_span(
                format!("a directive, found {:?}", rule),
                directive.as_span(),
            ))
        }
    };
    Ok(dir)
}

fn option_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Option(construct! {
        bc::BcOption: directive => {
            name = get_quoted_str;
            val = get_quoted_str;
            location := Some(location);
        }
    }))
}

fn plugin_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Plugin(construct! {
        bc::Plugin: directive => {
            module = get_quoted_str;
            config ?= get_quoted_str;
            location := Some(location);
        }
    }))
}

fn open_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Open(construct! {
        bc::Open: directive => {
            date = date;
            account = account;
            currencies = if Rule::commodity_list {
                |p: Pair<'i, _>| -> ParseResult<Vec<_>> {
                    Ok(p.into_inner()
                        .map(|p| p.as_str().into())
                        .collect())
                }
            } else {
                Vec::new()
            };
            booking = if Rule::quoted_str {
                |p: Pair<'i, _>| -> ParseResult<Option<bc::Booking>> {
                    let span = p.as_span();
                    bc::Booking::try_from(get_quoted_str(p)?.as_ref())
                        .map_err(|_| ParseError::invalid_input_with_span(format!("unknown booking method {}", span.as_str()), span))
                        .map(Some)
                }
            } else {
                None
            };
            meta = meta_kv;
            location := Some(location);
        }
    }))
}

fn commodity_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Commodity(construct! {
        bc::Commodity: directive => {
            date = date;
            name = as_str;
            meta = meta_kv;
            location := Some(location);
        }
    }))
}

fn event_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Event(construct! {
        bc::Event: directive => {
            date = date;
            name = get_quoted_str;
            description = get_quoted_str;
            meta = meta_kv;
            location := Some(location);
        }
    }))
}

fn price_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Price(construct! {
        bc::Price: directive => {
            date = date;
            currency = as_str;
            amount = amount;
            meta = meta_kv;
            location := Some(location);
        }
    }))
}

fn transaction_directive<'i>(
    directive: Pair<'i, Rule>,
    state: &ParseState<'i>,
) -> ParseResult<bc::Directive<'i>> {
    let location = state.location(&directive);
    Ok(bc::Directive::Transaction(construct! {
        bc::Transaction: directive => {
            date = date;
            flag = flag;
            let (payee, narration) = from pair {
                let span = pair.as_span();
                let mut inner = pair.into_inner();
                let first = inner.next().map(get_quoted_str)
                    .transpose()?
                    .ok_or_else(|| ParseError::invalid_state_with_span("payee or narration", span))?;
                let second = inner.next().map(get_quoted_str);
                if let Some(second) = second {
                    (Some(first), second?)
                } else {
                    (None, first)
                }
            };
            payee := payee;
            narration := narration;
            let (tags, links) = from pair if Rule::tags_links {
                tags_links(pair)?
            } else {
                (IndexSet::new(), IndexSet::new())
            };
            let (meta, postings) = from pair {
                let mut postings: Vec<bc::Posting<'i>> = Vec::new();
                let mut tx_meta = bc::metadata::Meta::new();
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::posting => {
                            postings.push(posting(p)?);
                        }
                        Rule::key_value => {
                            let (k, v) = meta_kv_pair(p)?;
                            if let Some(last) = postings.last_mut() {
                                last.meta.insert(k, v);
                            } else {
                                tx_meta.insert(k, v);
                            }
                        }
                        rule => {
                            return Err(ParseError::invalid_state_with_span(
                                format!("posting or metadata, found {:?}", rule),
                                p.as_span(),
                            ));
                        }
                    }
                }
                (tx_meta, postings)
            };
            postings := postings;
            meta := meta;
            tags := tags;
            links := links;
            location := Some(location);
        }
    }))
}

fn posting(pair: Pair<'_, Rule>) -> ParseResult<bc::Posting<'_>> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let flag = optional_rule(Rule::txn_flag, &mut inner)
        .map(flag)
        .transpose()?;
    let account = inner
        .next()
        .map(account)
        .transpose()?
        .ok_or_else(|| ParseError::invalid_state_with_span("account", span))?;
    let units = optional_rule(Rule::incomplete_amount, &mut inner)
        .map(incomplete_amount)
        .transpose()?
        .unwrap_or_else(|| bc::IncompleteAmount::builder().build());
    let price = optional_rule(Rule::price_annotation, &mut inner)
        .map(price_annotation)
        .transpose()?
        .map(|(is_total, p)| {
            if is_total {
                bc::PriceSpec::Total(p)
            } else {
                bc::PriceSpec::PerUnit(p)
            }
        });
    Ok(bc::Posting {
        flag,
        account,
        units,
        price,
        meta: bc::metadata::Meta::new(),
    })
}

fn num(pair: Pair<'_, Rule>) -> ParseResult<Decimal> {
    let s = pair.as_str().replace(',', "");
    Decimal::from_str(&s).map_err(|e| ParseError::decimal_parse_error(e, pair.as_span()))
}

fn num_expr(pair: Pair<'_, Rule>) -> ParseResult<Decimal> {
    debug_assert!(pair.as_rule() == Rule::num_expr);
    let span = pair.as_span();
    let parsed = PRATT_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::num => num(primary),
            Rule::num_expr => num_expr(primary),
            rule => Err(ParseError::invalid_state_with_span(
                format!("number, found {:?}", rule),
                primary.as_span(),
            )),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::neg => rhs.map(|v| -v),
            _ => rhs,
        })
        .map_infix(|lhs, op, rhs| {
            let lhs = lhs?;
            let rhs = rhs?;
            let result = match op.as_rule() {
                Rule::add => lhs.checked_add(rhs),
                Rule::subtract => lhs.checked_sub(rhs),
                Rule::multiply => lhs.checked_mul(rhs),
                _ => lhs.checked_div(rhs),
            };
            result.ok_or_else(|| {
                ParseError::invalid_input_with_span("arithmetic overflow or division by zero", span.clone())
            })
        })
        .parse(pair.into_inner());
    parsed
}

fn amount(pair: Pair<'_, Rule>) -> ParseResult<bc::Amount<'_>> {
    debug_assert!(pair.as_rule() == Rule::amount);
    Ok(construct! {
        bc::Amount: pair => {
            num = num_expr;
            currency = as_str;
        }
    })
}

fn incomplete_amount(pair: Pair<'_, Rule>) -> ParseResult<bc::IncompleteAmount<'_>> {
    debug_assert!(pair.as_rule() == Rule::incomplete_amount);
    Ok(construct! {
        bc::IncompleteAmount: pair => {
            num = if Rule::num_expr {
                |p| num_expr(p).map(Some)
            } else {
                None
            };
            currency = if Rule::commodity {
                |p| as_str(p).map(|s| Some(s.into()))
            } else {
                None
            };
        }
    })
}

fn price_annotation(pair: Pair<'_, Rule>) -> ParseResult<(bool, bc::IncompleteAmount<'_>)> {
    debug_assert!(pair.as_rule() == Rule::price_annotation);
    let span = pair.as_span();
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::invalid_state_with_span("price annotation", span.clone()))?;
    let is_total = inner.as_rule() == Rule::price_annotation_total;
    let amount = incomplete_amount(
        inner
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::invalid_state_with_span("incomplete amount", span))?,
    )?;
    Ok((is_total, amount))
}

fn account(pair: Pair<'_, Rule>) -> ParseResult<bc::Account<'_>> {
    debug_assert!(pair.as_rule() == Rule::account);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let first_pair = inner
        .next()
        .ok_or_else(|| ParseError::invalid_state_with_span("first part of account name", span))?;
    let account_type = bc::AccountType::from_root(first_pair.as_str()).ok_or_else(|| {
        ParseError::invalid_input_with_span(
            format!("Invalid root account '{}'", first_pair.as_str()),
            first_pair.as_span(),
        )
    })?;
    let parts: Vec<_> = inner.map(|p| Cow::Borrowed(&p.as_str()[1..])).collect();
    Ok(bc::Account::builder().ty(account_type).parts(parts).build())
}

fn as_str(pair: Pair<'_, Rule>) -> ParseResult<&str> {
    Ok(pair.as_str())
}

fn date(pair: Pair<'_, Rule>) -> ParseResult<bc::Date> {
    pair.as_str()
        .parse()
        .map_err(|_| ParseError::invalid_input_with_span(format!("invalid date {}", pair.as_str()), pair.as_span()))
}

fn meta_kv(pair: Pair<'_, Rule>) -> ParseResult<bc::metadata::Meta<'_>> {
    debug_assert!(pair.as_rule() == Rule::eol_kv_list);
    pair.into_inner().map(meta_kv_pair).collect()
}

fn tags_links(
    pair: Pair<'_, Rule>,
) -> ParseResult<(
    IndexSet<bc::metadata::Tag<'_>>,
    IndexSet<bc::metadata::Link<'_>>,
)> {
    let (mut tags, mut links) = (IndexSet::new(), IndexSet::new());
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::tag => {
                tags.insert((&p.as_str()[1..]).into());
            }
            Rule::link => {
                links.insert((&p.as_str()[1..]).into());
            }
            rule => {
                return Err(ParseError::invalid_state_with_span(
                    format!("tag or link, found {:?}", rule),
                    p.as_span(),
                ));
            }
        }
    }
    Ok((tags, links))
}

fn meta_kv_pair(
    pair: Pair<'_, Rule>,
) -> ParseResult<(Cow<'_, str>, bc::metadata::MetaValue<'_>)> {
    debug_assert!(pair.as_rule() == Rule::key_value);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let key = inner
        .next()
        .ok_or_else(|| ParseError::invalid_state_with_span("metadata key", span.clone()))?
        .as_str();
    let value_pair = inner
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| ParseError::invalid_state_with_span("metadata value", span))?;
    let value = match value_pair.as_rule() {
        Rule::quoted_str => bc::MetaValue::Text(get_quoted_str(value_pair)?),
        Rule::account => bc::MetaValue::Account(account(value_pair)?),
        Rule::date => bc::MetaValue::Date(date(value_pair)?),
        Rule::commodity => bc::MetaValue::Currency(value_pair.as_str().into()),
        Rule::tag => bc::MetaValue::Tag((&value_pair.as_str()[1..]).into()),
        Rule::bool => bc::MetaValue::Bool(value_pair.as_str().eq_ignore_ascii_case("true")),
        Rule::amount => bc::MetaValue::Amount(amount(value_pair)?),
        Rule::num_expr => bc::MetaValue::Number(num_expr(value_pair)?),
        rule => {
            return Err(ParseError::invalid_state_with_span(
                format!("metadata value, found {:?}", rule),
                value_pair.as_span(),
            ))
        }
    };
    Ok((key.into(), value))
}

/// Returns the content of a quoted string with escape sequences resolved.
fn get_quoted_str(pair: Pair<'_, Rule>) -> ParseResult<Cow<'_, str>> {
    debug_assert!(pair.as_rule() == Rule::quoted_str);
    let span = pair.as_span();
    let raw = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::invalid_state_with_span("quoted string", span))?
        .as_str();
    if !raw.contains('\\') {
        return Ok(Cow::Borrowed(raw));
    }
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => unescaped.push('\n'),
                Some('t') => unescaped.push('\t'),
                Some(other) => unescaped.push(other),
                None => unescaped.push('\\'),
            },
            c => unescaped.push(c),
        }
    }
    Ok(Cow::Owned(unescaped))
}

fn flag(pair: Pair<'_, Rule>) -> ParseResult<bc::Flag<'_>> {
    Ok(bc::Flag::from(pair.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pest::Parser;

    macro_rules! parse_ok {
        ( $rule:ident, $input:expr ) => {
            assert_eq!(
                BeancountParser::parse(Rule::$rule, $input)
                    .unwrap()
                    .as_str(),
                $input
            );
        };
        ( $rule:ident, $input:expr, $output:expr ) => {
            assert_eq!(
                BeancountParser::parse(Rule::$rule, $input)
                    .unwrap()
                    .as_str(),
                $output
            );
        };
    }

    macro_rules! parse_fail {
        ( $rule:ident, $input:expr ) => {
            assert!(BeancountParser::parse(Rule::$rule, $input).is_err());
        };
    }

    fn only_directive(source: &str) -> bc::Directive<'_> {
        let mut ledger = parse(source).unwrap();
        assert_eq!(ledger.directives.len(), 1);
        ledger.directives.remove(0)
    }

    #[test]
    fn key_value() {
        parse_ok!(key_value, "key: \"value\"");
        parse_ok!(key_value, "key:\"value\"");
        parse_ok!(key_value, "key:    \"value\"");
        parse_ok!(key_value, "key: Assets:Cash");
        parse_ok!(key_value, "key: 2019-01-01");
        parse_ok!(key_value, "key: USD");
        parse_ok!(key_value, "key: #foo");
        parse_ok!(key_value, "key: True");
        parse_ok!(key_value, "key: 200.00 USD");
        parse_ok!(key_value, "key: 200.00");
        parse_ok!(key_value, "key1: 1");

        parse_fail!(key_value, "key    : \"value\"");
        parse_fail!(key_value, "key: bar");
        parse_fail!(key_value, "k: 123");
        parse_fail!(key_value, "Key: 123");
    }

    #[test]
    fn eol_kv_list() {
        parse_ok!(eol_kv_list, "\n key: 123\n");
        parse_ok!(eol_kv_list, "\n key: 123\n key2: 456\n");
        parse_ok!(eol_kv_list, "\n\tprecision: \"3\"\n");
    }

    #[test]
    fn date() {
        parse_ok!(date, "2019-01-12");
        parse_ok!(date, "1979/01/01");
        parse_ok!(date, "2019-12-31");

        parse_fail!(date, "123-01-01");
        parse_fail!(date, "2020-13-01");
        parse_fail!(date, "2020-12-32");
        parse_fail!(date, "2020 02 02");
        parse_fail!(date, "02-02-2020");
    }

    #[test]
    fn num() {
        parse_ok!(num, "1");
        parse_ok!(num, "1.");
        parse_ok!(num, "1.2");
        parse_ok!(num, "1000.2");
        parse_ok!(num, "1,000.2");
        parse_ok!(num, "1,222,333.4");

        parse_ok!(num, "1234,0", "1234");
        parse_ok!(num, "1,1234", "1,123");
        parse_ok!(num, "1,222,33.4", "1,222");
    }

    #[test]
    fn num_expr() {
        parse_ok!(num_expr, "1");
        parse_ok!(num_expr, "+1");
        parse_ok!(num_expr, "-1");
        parse_ok!(num_expr, "-(1)");
        parse_ok!(num_expr, "+(1)");
        parse_ok!(num_expr, "1 + 2");
        parse_ok!(num_expr, "1 - 2");
        parse_ok!(num_expr, "1 * 2");
        parse_ok!(num_expr, "1 / 2");
        parse_ok!(num_expr, "1+-(2*3)/(4+6)");
        parse_ok!(num_expr, "1+-+(1)");
    }

    #[test]
    fn num_expr_evaluates_with_precedence() {
        let pair = BeancountParser::parse(Rule::num_expr, "1+-(2*3)/(4+6)")
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(super::num_expr(pair).unwrap(), Decimal::new(4, 1));
    }

    #[test]
    fn num_expr_division_by_zero_is_an_error() {
        let pair = BeancountParser::parse(Rule::num_expr, "10 / (2 - 2)")
            .unwrap()
            .next()
            .unwrap();
        let err = super::num_expr(pair).unwrap_err();
        assert!(err.to_string().contains("division by zero"), "{}", err);
        assert_eq!(err.location, (1, 1));
    }

    #[test]
    fn quoted_str() {
        parse_ok!(quoted_str, r#""""#);
        parse_ok!(quoted_str, r#""foo""#);
        parse_ok!(quoted_str, r#""€☃""#);
        parse_ok!(quoted_str, r#""\"""#);
        parse_ok!(quoted_str, r#""\x""#);
        parse_ok!(quoted_str, r#"" foo ""#);
    }

    #[test]
    fn quoted_str_escapes_are_resolved() {
        let source = "2014-07-09 event \"location\" \"Caf\\\"e \\\\ Bar\"\n";
        match only_directive(source) {
            bc::Directive::Event(event) => assert_eq!(event.description, "Caf\"e \\ Bar"),
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn commodity() {
        parse_ok!(commodity, "AAA");
        parse_ok!(commodity, "EUR");
        parse_ok!(commodity, "FOO_BAR");
        parse_ok!(commodity, "FOO.BAR");
        parse_ok!(commodity, "FOO-BAR");
        parse_ok!(commodity, "FOO'BAR");
        parse_ok!(commodity, "F123");
        parse_ok!(commodity, "FOO-123");
        parse_ok!(commodity, "FOOOOOOOOOOOOOOOOOOOOOOO");

        parse_ok!(
            commodity,
            "FOOOOOOOOOOOOOOOOOOOOOOOX",
            "FOOOOOOOOOOOOOOOOOOOOOOO"
        );
        parse_ok!(
            commodity,
            "FOOOOOOOOOOOOOOOOOOOOOO.",
            "FOOOOOOOOOOOOOOOOOOOOOO"
        );
        parse_ok!(commodity, "FOO\"123", "FOO");
        parse_fail!(commodity, "123");
        parse_fail!(commodity, "foo");
    }

    #[test]
    fn account() {
        parse_ok!(account, "Assets:Foo");
        parse_ok!(account, "Indtægter:Foo");
        parse_ok!(account, "Expenses:Q1");
        parse_ok!(account, "Expenses:Tax:2018");
        parse_ok!(account, "Dash-dash:Dash-dash");
        parse_ok!(account, "Assets:Current-Assets:Cash-in-Wallet");
        parse_ok!(account, "Expenses:Überweisung");

        parse_fail!(account, "Assets");
        parse_fail!(account, "Assets:");
        parse_fail!(account, "Assets: Foo");
        parse_fail!(account, "Expenses:tax");
    }

    #[test]
    fn unknown_root_account_is_an_error() {
        let err = parse("2014-05-01 open Aktiva:Bank EUR\n").unwrap_err();
        assert!(err.to_string().contains("Invalid root account"), "{}", err);
    }

    #[test]
    fn tag() {
        parse_ok!(tag, "#foo");
        parse_ok!(tag, "#FOO");
        parse_ok!(tag, "#123");
        parse_ok!(tag, "#foo-123/asd.asfd_asd");
        parse_ok!(tag, "#foo bar", "#foo");
        parse_ok!(link, "^foo");

        parse_ok!(tag, "#fooæ", "#foo");
        parse_fail!(tag, "#");
    }

    #[test]
    fn org_mode() {
        parse_ok!(org_mode_title, "*\n");
        parse_ok!(org_mode_title, "*  \n");
        parse_ok!(org_mode_title, "*  foo\n");
        parse_fail!(org_mode_title, "  *  foo\n");
    }

    #[test]
    fn commodity_directive() {
        parse_ok!(commodity_directive, "2012-01-01 commodity HOOL\n");
        parse_ok!(
            commodity_directive,
            "2012-01-01 commodity HOOL\n\tprecision: \"3\"\n"
        );
    }

    #[test]
    fn event() {
        parse_ok!(event, "2014-07-09 event \"location\" \"Paris, France\"\n");
    }

    #[test]
    fn open() {
        parse_ok!(
            open,
            "2014-05-01 open Liabilities:CreditCard:CapitalOne USD\n"
        );
        parse_ok!(
            open,
            "2014-05-01 open Liabilities:CreditCard:CapitalOne USD \"STRICT\"\n"
        );
        parse_ok!(
            open,
            "2014-05-01 open Liabilities:CreditCard:CapitalOne USD, CAD\n"
        );
    }

    #[test]
    fn option() {
        parse_ok!(option, "option \"title\" \"Ed’s Personal Ledger\"\n");
    }

    #[test]
    fn plugin() {
        parse_ok!(plugin, "plugin \"beancount.plugins.module_name\"\n");
        parse_ok!(
            plugin,
            "plugin \"beancount.plugins.module_name\" \"configuration data\"\n"
        );

        let source = indoc!(
            "
            plugin \"beancount.plugins.module_name\"
            plugin \"beancount.plugins.module_name2\" \"config\"
            "
        );
        assert_eq!(
            parse(source).unwrap(),
            bc::Ledger {
                directives: vec![
                    bc::Directive::Plugin(
                        bc::Plugin::builder()
                            .module("beancount.plugins.module_name".into())
                            .config(None)
                            .location(Some(bc::Location::new(STRING_SOURCE, 1)))
                            .build()
                    ),
                    bc::Directive::Plugin(
                        bc::Plugin::builder()
                            .module("beancount.plugins.module_name2".into())
                            .config(Some("config".into()))
                            .location(Some(bc::Location::new(STRING_SOURCE, 2)))
                            .build()
                    )
                ]
            }
        );
    }

    #[test]
    fn price() {
        parse_ok!(price, "2014-07-09 price HOOL 579.18 USD\n");
    }

    #[test]
    fn posting() {
        parse_ok!(posting, "Assets:Cash  200 USD");
        parse_ok!(posting, "Assets:Cash");
        parse_ok!(posting, "! Assets:Cash\t-27.950 EUR @ 1.7889 NZD");
        parse_ok!(posting, "Assets:Cash 10 USD @@ 20 GBP");
    }

    #[test]
    fn transaction() {
        parse_ok!(
            transaction,
            indoc!(
                "
        2014-05-05 txn \"Cafe Mogador\" \"Lamb tagine with wine\"
            Liabilities:CreditCard:CapitalOne         -37.45 USD
            Expenses:Restaurant
        "
            )
        );
        parse_ok!(transaction, "2019-02-19*\"Foo\"\"Bar\"\n");
        parse_ok!(
            transaction,
            indoc!(
                "
        2018-12-31 * \"Initalize\"
            Assets:Foo:Bar                                   123.45 DKK
            P Assets:Foo:Bar                                   123.45 DKK
        "
            )
        );
        parse_ok!(
            transaction,
            indoc!(
                "
        2018-12-31 * \"Initalize\"
            ; key: 123
            Assets:Foo:Bar                                   123.45 DKK
        "
            )
        );

        parse_ok!(
            transaction,
            indoc!(
                "
        2014-05-05 txn \"Cafe Mogador\" \"Lamb tagine with wine\"
        Liabilities:CreditCard:CapitalOne         -37.45 USD
        "
            ),
            indoc!(
                "
        2014-05-05 txn \"Cafe Mogador\" \"Lamb tagine with wine\"
        "
            )
        );

        // DEPRECATED PIPE SYNTAX
        parse_ok!(
            transaction,
            indoc!(
                "
        2014-05-05 txn \"Cafe Mogador\" | \"Lamb tagine with wine\"
        Liabilities:CreditCard:CapitalOne         -37.45 USD
        "
            ),
            indoc!(
                "
        2014-05-05 txn \"Cafe Mogador\" | \"Lamb tagine with wine\"
        "
            )
        );
    }

    #[test]
    fn transaction_structure() {
        let source = indoc!(
            "
            2014-05-05 txn \"Cafe Mogador\" \"Lamb tagine with wine\" #tag ^link
                memo: \"dinner\"
                ! Liabilities:CreditCard:CapitalOne         10 USD @ 20 GBP
                    note: \"paid\"
            "
        );
        let mut meta = bc::Meta::new();
        meta.insert("memo".into(), bc::MetaValue::Text("dinner".into()));
        let mut posting_meta = bc::Meta::new();
        posting_meta.insert("note".into(), bc::MetaValue::Text("paid".into()));
        assert_eq!(
            parse(source).unwrap(),
            bc::Ledger {
                directives: vec![bc::Directive::Transaction(
                    bc::Transaction::builder()
                        .date("2014-05-05".parse().unwrap())
                        .payee(Some("Cafe Mogador".into()))
                        .narration("Lamb tagine with wine".into())
                        .tags(vec![Cow::from("tag")].into_iter().collect())
                        .links(vec![Cow::from("link")].into_iter().collect())
                        .postings(vec![bc::Posting::builder()
                            .account(
                                bc::Account::builder()
                                    .ty(bc::AccountType::Liabilities)
                                    .parts(vec!["CreditCard".into(), "CapitalOne".into()])
                                    .build()
                            )
                            .units(
                                bc::IncompleteAmount::builder()
                                    .num(Some(10.into()))
                                    .currency(Some("USD".into()))
                                    .build()
                            )
                            .price(Some(bc::PriceSpec::PerUnit(
                                bc::IncompleteAmount::builder()
                                    .num(Some(20.into()))
                                    .currency(Some("GBP".into()))
                                    .build()
                            )))
                            .flag(Some(bc::Flag::Warning))
                            .meta(posting_meta)
                            .build()])
                        .meta(meta)
                        .location(Some(bc::Location::new(STRING_SOURCE, 1)))
                        .build()
                )]
            }
        );
    }

    #[test]
    fn file_with_comments_and_blank_lines() {
        let source = indoc!(
            "
            ; converted ledger
            option \"title\" \"Book\"

            * Accounts
            2024-05-01 open Assets:Cash EUR ; wallet

            2024-05-01 * \"Opening\"
              Assets:Cash        10.00 EUR
              Equity:Opening-Balances
            "
        );
        let ledger = parse_named("book.beancount", source).unwrap();
        assert_eq!(ledger.directives.len(), 3);
        let lines: Vec<i64> = ledger
            .directives
            .iter()
            .filter_map(|d| d.location().map(|l| l.lineno))
            .collect();
        assert_eq!(lines, vec![2, 5, 7]);
        assert_eq!(
            ledger.directives[1].location().unwrap().filename,
            "book.beancount"
        );
    }

    #[test]
    fn unsupported_directive_is_a_parse_error() {
        let err = parse("2014-08-09 balance Assets:Cash 562.00 USD\n").unwrap_err();
        assert_eq!(err.location.0, 1);
    }
}
