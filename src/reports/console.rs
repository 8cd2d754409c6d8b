use super::ColorMode;
use crate::Result;
use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryAggregate, SummaryCard};
use core::fmt::{self, Write};
use owo_colors::OwoColorize;
use std::io::{IsTerminal, stdout};

const COLUMN_GAP: usize = 2;

/// One line per card: status glyph, title, value, and badges
pub fn generate<W: Write>(aggregate: &SummaryAggregate, color: ColorMode, writer: &mut W) -> Result<()> {
    if aggregate.is_empty() {
        writeln!(writer, "No collector has reported yet")?;
        return Ok(());
    }

    let colors = ColorScheme::new(color);
    let title_width = aggregate.values().map(|card| card.title.len()).max().unwrap_or(0) + COLUMN_GAP;
    let value_width = aggregate.values().map(|card| card.display_value.len()).max().unwrap_or(0) + COLUMN_GAP;

    for card in aggregate.values() {
        write_card(writer, &colors, card, title_width, value_width)?;
    }

    Ok(())
}

fn write_card<W: Write>(writer: &mut W, colors: &ColorScheme, card: &SummaryCard, title_width: usize, value_width: usize) -> Result<()> {
    colors.write_status(writer, card.status)?;
    write!(writer, " ")?;
    colors.write_bold(writer, &format!("{:<title_width$}", card.title))?;
    write!(writer, "{:<value_width$}", card.display_value)?;

    for (index, badge) in card.badges.iter().enumerate() {
        if index > 0 {
            write!(writer, " ")?;
        }
        colors.write_badge(writer, badge)?;
    }

    writeln!(writer)?;
    Ok(())
}

const fn glyph(status: CardStatus) -> &'static str {
    match status {
        CardStatus::Success => "✔",
        CardStatus::Info => "ℹ",
        CardStatus::Warning => "▲",
        CardStatus::Danger => "✖",
    }
}

struct ColorScheme {
    enabled: bool,
}

impl ColorScheme {
    fn new(color_mode: ColorMode) -> Self {
        let enabled = matches!(color_mode, ColorMode::Always) || (matches!(color_mode, ColorMode::Auto) && stdout().is_terminal());
        Self { enabled }
    }

    fn write_bold<W: Write>(&self, writer: &mut W, text: &str) -> fmt::Result {
        if self.enabled {
            write!(writer, "{}", text.bold())
        } else {
            write!(writer, "{text}")
        }
    }

    fn write_status<W: Write>(&self, writer: &mut W, status: CardStatus) -> fmt::Result {
        let glyph = glyph(status);
        if !self.enabled {
            return write!(writer, "{glyph}");
        }

        match status {
            CardStatus::Success => write!(writer, "{}", glyph.green()),
            CardStatus::Info => write!(writer, "{}", glyph.cyan()),
            CardStatus::Warning => write!(writer, "{}", glyph.yellow()),
            CardStatus::Danger => write!(writer, "{}", glyph.red()),
        }
    }

    fn write_badge<W: Write>(&self, writer: &mut W, badge: &Badge) -> fmt::Result {
        let text = format!("[{}]", badge.text);
        if !self.enabled {
            return write!(writer, "{text}");
        }

        match badge.color {
            BadgeColor::Success => write!(writer, "{}", text.green()),
            BadgeColor::Info | BadgeColor::Blue => write!(writer, "{}", text.blue()),
            BadgeColor::Warning | BadgeColor::Yellow => write!(writer, "{}", text.yellow()),
            BadgeColor::Orange => write!(writer, "{}", text.truecolor(255, 165, 0)),
            BadgeColor::Danger | BadgeColor::Error | BadgeColor::Red => write!(writer, "{}", text.red()),
            BadgeColor::Neutral => write!(writer, "{}", text.dimmed()),
        }
    }
}
