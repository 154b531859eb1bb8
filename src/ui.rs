use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::app::App;
use crate::clock::Clock;
use crate::kv::KeyValueStore;
use crate::session::SessionSink;
use crate::timer_state::{TimerMode, TimerStatus};
use crate::util::{format_clock, format_short};

const HORIZONTAL_MARGIN: u16 = 5;
const KEY_HINTS: &str = "space start/pause · s stop · r reset · m mode · tab subject · q quit";

impl<K: KeyValueStore, C: Clock, S: SessionSink> Widget for &App<K, C, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);
        let magenta_bold_style = Style::default().patch(bold_style).fg(Color::Magenta);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1), // modes
                Constraint::Length(1),
                Constraint::Length(1), // subject
                Constraint::Length(1),
                Constraint::Length(1), // clock
                Constraint::Length(1), // status
                Constraint::Length(1),
                Constraint::Length(1), // today
                Constraint::Length(1), // notice
                Constraint::Min(0),
                Constraint::Length(1), // hints
            ])
            .split(area);

        let active_mode = self.stopwatch.mode();
        let modes: Vec<Span> = TimerMode::ALL
            .iter()
            .enumerate()
            .flat_map(|(idx, mode)| {
                let style = if *mode == active_mode {
                    magenta_bold_style.add_modifier(Modifier::UNDERLINED)
                } else {
                    dim_style
                };
                let sep = if idx == 0 { "" } else { "   " };
                [Span::raw(sep), Span::styled(mode.label(), style)]
            })
            .collect();
        Paragraph::new(Line::from(modes))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        let (subject_name, subject_color) = match self.current_subject() {
            Some(subject) => (
                subject.name.as_str(),
                subject
                    .rgb()
                    .map_or(Color::Gray, |(r, g, b)| Color::Rgb(r, g, b)),
            ),
            None => ("Unknown", Color::Gray),
        };
        Paragraph::new(Line::from(vec![
            Span::styled("● ", Style::default().fg(subject_color)),
            Span::styled(subject_name, bold_style),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

        let (display_ms, done) = self.clock_reading();
        let clock_style = if done { green_bold_style } else { bold_style };
        Paragraph::new(Span::styled(format_clock(display_ms), clock_style))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);

        let status = match (self.stopwatch.status(), done) {
            (_, true) => Span::styled("DONE", green_bold_style),
            (TimerStatus::Running, false) => Span::styled("RUNNING", dim_bold_style),
            (TimerStatus::Paused, false) => Span::styled(
                "PAUSED",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            ),
            (TimerStatus::Idle, false) => Span::styled("READY", dim_style),
        };
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[6], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("today ", dim_style),
            Span::styled(format_short(self.subject_today_ms()), bold_style),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[8], buf);

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), italic_style))
                .alignment(Alignment::Center)
                .render(chunks[9], buf);
        }

        Paragraph::new(Span::styled(KEY_HINTS, dim_style))
            .alignment(Alignment::Center)
            .render(chunks[11], buf);
    }
}
