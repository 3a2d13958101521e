/* Indented source text builder shared by the emitters */

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth. Empty text writes a blank line.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /* `text {` and one level deeper */
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(format!("{} {{", text.as_ref()));
        self.depth += 1;
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.close_with("")
    }

    /* `}` followed by `suffix`, e.g. `;` or `,` */
    pub fn close_with(&mut self, suffix: &str) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(format!("}}{}", suffix))
    }

    pub fn comment(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(format!("/* {} */", text.as_ref()))
    }

    pub fn doc(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(format!("/// {}", text.as_ref()))
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_indents_and_closes() {
        let mut w = CodeWriter::new();
        w.open("impl Foo").open("fn bar()").line("baz();").close().close();
        w.blank().comment("done");
        assert_eq!(w.finish(), "impl Foo {\n    fn bar() {\n        baz();\n    }\n}\n\n/* done */\n");
    }
}
