use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use crate::config::Settings;
use crate::editor::Tab;

const GUTTER_COLOR: Color = Color::DarkGrey;
const ERROR_COLOR: Color = Color::Red;

/// Writes tab contents to a terminal
pub struct Renderer {
    show_line_numbers: bool,
    tab_width: usize,
}

impl Renderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            show_line_numbers: settings.show_line_numbers,
            tab_width: settings.tab_width.max(1),
        }
    }

    /// Print every line of `tab`. Error lines are drawn in red.
    pub fn render_tab(&self, tab: &Tab, out: &mut impl Write) -> io::Result<()> {
        let lines = tab.lines();
        let gutter_width = lines.len().to_string().len().max(3);

        for (idx, (text, is_error)) in lines.iter().enumerate() {
            if self.show_line_numbers {
                queue!(out, SetForegroundColor(GUTTER_COLOR))?;
                queue!(
                    out,
                    Print(format!("{:>width$} ", idx + 1, width = gutter_width))
                )?;
            }

            if *is_error {
                queue!(out, SetForegroundColor(ERROR_COLOR))?;
            } else {
                queue!(out, ResetColor)?;
            }
            queue!(out, Print(self.expand_tabs(text)))?;
            queue!(out, ResetColor, Print("\n"))?;
        }

        out.flush()
    }

    fn expand_tabs(&self, line: &str) -> String {
        if !line.contains('\t') {
            return line.to_string();
        }

        let mut expanded = String::with_capacity(line.len() + self.tab_width);
        let mut col = 0;
        for ch in line.chars() {
            if ch == '\t' {
                let spaces = self.tab_width - col % self.tab_width;
                expanded.extend(std::iter::repeat_n(' ', spaces));
                col += spaces;
            } else {
                expanded.push(ch);
                col += 1;
            }
        }
        expanded
    }
}
