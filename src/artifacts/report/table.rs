//! Grid table rendering
//!
//! ```text
//! +------+-------+
//! | repo | total |
//! +======+=======+
//! | api  |    12 |
//! +------+-------+
//! ```
//!
//! Widths are measured on the plain text; colour is applied after padding so
//! escape sequences never skew the columns.

use colored::{Color, Colorize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    text: String,
    align: Align,
    color: Option<Color>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Cell {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A right-aligned number
    pub fn number(value: usize) -> Self {
        Cell::new(value.to_string()).align(Align::Right)
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }

    fn render(&self, width: usize) -> String {
        let padded = match self.align {
            Align::Left => format!("{:<width$}", self.text),
            Align::Right => format!("{:>width$}", self.text),
        };

        match self.color {
            Some(color) => padded.color(color).to_string(),
            None => padded,
        }
    }
}

pub fn render(headers: &[&str], rows: &[Vec<Cell>]) -> String {
    let columns = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));

    let widths = (0..columns)
        .map(|column| {
            let header = headers.get(column).map_or(0, |h| h.chars().count());
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(Cell::width)
                .fold(header, usize::max)
        })
        .collect::<Vec<_>>();

    let border = |fill: char| {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&fill.to_string().repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let line = |cells: Vec<String>| {
        let mut line = String::from("|");
        for cell in cells {
            line.push(' ');
            line.push_str(&cell);
            line.push_str(" |");
        }
        line.push('\n');
        line
    };

    let mut out = border('-');
    out.push_str(&line(
        widths
            .iter()
            .enumerate()
            .map(|(column, width)| format!("{:<width$}", headers.get(column).unwrap_or(&"")))
            .collect(),
    ));
    out.push_str(&border('='));

    for row in rows {
        out.push_str(&line(
            widths
                .iter()
                .enumerate()
                .map(|(column, &width)| match row.get(column) {
                    Some(cell) => cell.render(width),
                    None => " ".repeat(width),
                })
                .collect(),
        ));
        out.push_str(&border('-'));
    }

    out
}
