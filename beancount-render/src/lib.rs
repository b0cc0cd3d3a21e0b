use beancount_core::*;
use std::{io, io::Write};
use thiserror::Error;


#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct BasicRenderer {}

impl BasicRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Renders every directive of `ledger`, each followed by a blank line.
pub fn render<W: Write>(w: &mut W, ledger: &Ledger<'_>) -> Result<(), BasicRendererError> {
    BasicRenderer::default().render(ledger, w)
}

#[derive(Error, Debug)]
pub enum BasicRendererError {
    #[error("an io error occurred")]
    Io(#[from] io::Error),
}

pub trait Renderer<T, W: Write> {
    type Error;
    fn render(&self, renderable: T, write: &mut W) -> Result<(), Self::Error>;
}

/// Writes `s` as a double-quoted string literal.
fn write_quoted<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write!(w, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(w, "\\\"")?,
            '\\' => write!(w, "\\\\")?,
            c => write!(w, "{}", c)?,
        }
    }
    write!(w, "\"")
}

impl<'a, W: Write> Renderer<&'a Ledger<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, ledger: &'a Ledger<'_>, write: &mut W) -> Result<(), Self::Error> {
        for directive in &ledger.directives {
            self.render(directive, write)?;
            writeln!(write)?;
        }
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Directive<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, directive: &'a Directive<'_>, write: &mut W) -> Result<(), Self::Error> {
        use Directive::*;
        match directive {
            Open(open) => self.render(open, write),
            Option(bc_option) => self.render(bc_option, write),
            Commodity(commodity) => self.render(commodity, write),
            Event(event) => self.render(event, write),
            Plugin(plugin) => self.render(plugin, write),
            Price(price) => self.render(price, write),
            Transaction(transaction) => self.render(transaction, write),
        }
    }
}

fn render_key_value<W: Write>(
    renderer: &BasicRenderer,
    w: &mut W,
    kv: &Meta<'_>,
    indent: &str,
) -> Result<(), BasicRendererError> {
    for (key, value) in kv {
        write!(w, "{}{}: ", indent, key)?;
        renderer.render(value, w)?;
        writeln!(w)?;
    }
    Ok(())
}

impl<'a, W: Write> Renderer<&'a MetaValue<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, mv: &'a MetaValue<'_>, w: &mut W) -> Result<(), Self::Error> {
        match mv {
            MetaValue::Account(account) => self.render(account, w)?,
            MetaValue::Amount(amount) => self.render(amount, w)?,
            MetaValue::Bool(b) => write!(w, "{}", if *b { "TRUE" } else { "FALSE" })?,
            MetaValue::Currency(curr) => write!(w, "{}", curr)?,
            MetaValue::Date(date) => write!(w, "{}", date)?,
            MetaValue::Number(num) => write!(w, "{}", num)?,
            MetaValue::Tag(t) => write!(w, "#{}", t)?,
            MetaValue::Text(t) => write_quoted(w, t)?,
        }
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Open<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, open: &'a Open<'_>, write: &mut W) -> Result<(), Self::Error> {
        write!(write, "{} open ", open.date)?;
        self.render(&open.account, write)?;
        if !open.currencies.is_empty() {
            write!(write, " {}", open.currencies.join(","))?;
        }
        match open.booking {
            Some(Booking::Strict) => write!(write, r#" "STRICT""#)?,
            Some(Booking::None) => write!(write, r#" "NONE""#)?,
            Some(Booking::Average) => write!(write, r#" "AVERAGE""#)?,
            Some(Booking::Fifo) => write!(write, r#" "FIFO""#)?,
            Some(Booking::Lifo) => write!(write, r#" "LIFO""#)?,
            None => {}
        };
        writeln!(write)?;
        render_key_value(self, write, &open.meta, "\t")?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Account<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, account: &'a Account<'_>, write: &mut W) -> Result<(), Self::Error> {
        write!(write, "{}", account)?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Amount<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, amount: &'a Amount<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "{} {}", amount.num, amount.currency)?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a BcOption<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, option: &'a BcOption<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "option ")?;
        write_quoted(w, &option.name)?;
        write!(w, " ")?;
        write_quoted(w, &option.val)?;
        writeln!(w)?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Commodity<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, commodity: &'a Commodity<'_>, w: &mut W) -> Result<(), Self::Error> {
        writeln!(w, "{} commodity {}", commodity.date, commodity.name)?;
        render_key_value(self, w, &commodity.meta, "\t")
    }
}

impl<'a, W: Write> Renderer<&'a Event<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, event: &'a Event<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "{} event ", event.date)?;
        write_quoted(w, &event.name)?;
        write!(w, " ")?;
        write_quoted(w, &event.description)?;
        writeln!(w)?;
        render_key_value(self, w, &event.meta, "\t")
    }
}

impl<'a, W: Write> Renderer<&'a Plugin<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, plugin: &'a Plugin<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "plugin ")?;
        write_quoted(w, &plugin.module)?;
        if let Some(config) = &plugin.config {
            write!(w, " ")?;
            write_quoted(w, config)?;
        }
        writeln!(w)?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Price<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, price: &'a Price<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "{} price {} ", price.date, price.currency)?;
        self.render(&price.amount, w)?;
        writeln!(w)?;
        render_key_value(self, w, &price.meta, "\t")
    }
}

impl<'a, W: Write> Renderer<&'a Transaction<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, transaction: &'a Transaction<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "{} {}", transaction.date, transaction.flag)?;
        match &transaction.payee {
            Some(payee) if !payee.is_empty() => {
                write!(w, " ")?;
                write_quoted(w, payee)?;
            }
            _ => {}
        }
        write!(w, " ")?;
        write_quoted(w, &transaction.narration)?;
        for tag in &transaction.tags {
            write!(w, " #{}", tag)?;
        }
        for link in &transaction.links {
            write!(w, " ^{}", link)?;
        }
        writeln!(w)?;
        // Metadata lines following a posting belong to that posting.
        render_key_value(self, w, &transaction.meta, "\t")?;
        for posting in &transaction.postings {
            self.render(posting, w)?;
        }
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Posting<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(&self, posting: &'a Posting<'_>, w: &mut W) -> Result<(), Self::Error> {
        write!(w, "\t")?;
        if let Some(flag) = &posting.flag {
            write!(w, "{} ", flag)?;
        }
        self.render(&posting.account, w)?;
        if posting.units.num.is_some() || posting.units.currency.is_some() {
            write!(w, "\t")?;
            self.render(&posting.units, w)?;
        }
        match &posting.price {
            Some(PriceSpec::PerUnit(price)) => {
                write!(w, " @ ")?;
                self.render(price, w)?;
            }
            Some(PriceSpec::Total(price)) => {
                write!(w, " @@ ")?;
                self.render(price, w)?;
            }
            None => {}
        }
        writeln!(w)?;
        render_key_value(self, w, &posting.meta, "\t\t")
    }
}

impl<'a, W: Write> Renderer<&'a IncompleteAmount<'_>, W> for BasicRenderer {
    type Error = BasicRendererError;
    fn render(
        &self,
        incomplete_amount: &'a IncompleteAmount<'_>,
        w: &mut W,
    ) -> Result<(), Self::Error> {
        match (&incomplete_amount.num, &incomplete_amount.currency) {
            (Some(num), Some(currency)) => write!(w, "{} {}", num, currency),
            (None, Some(currency)) => write!(w, "{}", currency),
            (Some(num), None) => write!(w, "{}", num),
            _ => write!(w, ""),
        }?;
        Ok(())
    }
}
