//! The `plugin` and `option` lines at the top of the output ledger.

use std::io::Write;

use beancount_core::{BcOption, Plugin};
use beancount_render::{BasicRenderer, Renderer};

use crate::config::BeancountConfig;
use crate::error::Result;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderBuilder {
    plugins: Vec<Plugin<'static>>,
    options: Vec<BcOption<'static>>,
}

impl HeaderBuilder {
    pub fn from_config(config: &BeancountConfig) -> Self {
        HeaderBuilder {
            plugins: config
                .plugins
                .iter()
                .map(|module| Plugin::builder().module(module.clone().into()).build())
                .collect(),
            options: config
                .options
                .iter()
                .map(|(name, val)| {
                    BcOption::builder()
                        .name(name.clone().into())
                        .val(val.clone().into())
                        .build()
                })
                .collect(),
        }
    }

    /// Writes the plugin block then the option block, each followed by one blank line.  An empty
    /// block writes nothing.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let renderer = BasicRenderer::new();
        if !self.plugins.is_empty() {
            for plugin in &self.plugins {
                renderer.render(plugin, w)?;
            }
            writeln!(w)?;
        }
        if !self.options.is_empty() {
            for option in &self.options {
                renderer.render(option, w)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(plugins: &[&str], options: &[(&str, &str)]) -> BeancountConfig {
        BeancountConfig {
            plugins: plugins.iter().map(|p| p.to_string()).collect(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..BeancountConfig::default()
        }
    }

    #[test]
    fn renders_plugins_then_options() {
        let header = HeaderBuilder::from_config(&config(
            &["beancount.plugins.auto"],
            &[
                ("operating_currency", "EUR"),
                ("title", "Exported GnuCash Book"),
            ],
        ));
        assert_eq!(
            header.render().unwrap(),
            "plugin \"beancount.plugins.auto\"\n\noption \"operating_currency\" \"EUR\"\noption \"title\" \"Exported GnuCash Book\"\n\n"
        );
    }

    #[test]
    fn empty_blocks_write_nothing() {
        assert_eq!(HeaderBuilder::from_config(&config(&[], &[])).render().unwrap(), "");
        assert_eq!(
            HeaderBuilder::from_config(&config(&[], &[("title", "Book")]))
                .render()
                .unwrap(),
            "option \"title\" \"Book\"\n\n"
        );
        assert_eq!(
            HeaderBuilder::from_config(&config(&["beancount.plugins.auto"], &[]))
                .render()
                .unwrap(),
            "plugin \"beancount.plugins.auto\"\n\n"
        );
    }
}
