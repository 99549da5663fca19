use super::{Diagnostic, Phase};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    /// Plain form first, then the offending source line when it is known.
    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        let label = match d.phase {
            Phase::Compile => "error",
            Phase::Runtime => "runtime error",
        };
        let plain = d.render_plain();
        let mut lines = plain.lines();
        if let Some(first) = lines.next() {
            out.push_str(&format!("{}: {}\n", self.bold_red(label), self.bold(first)));
        }
        for rest in lines {
            out.push_str(&format!("{rest}\n"));
        }

        if let (Some(line), Some(text)) = (d.line, d.source_line()) {
            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{pad} {pipe}\n"));
            out.push_str(&format!("{line_num} {pipe} {text}\n"));
            out.push_str(&format!("{pad} {pipe}\n"));
        }

        out
    }
}
