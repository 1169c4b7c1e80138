use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, AppState},
    notice::NoticeLevel,
    scorer::{format_clock, ReviewStatus},
    session::{AttemptProgress, SubmitReason},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.attempt.has_questions() {
            Paragraph::new(Span::styled(
                "No questions loaded. Please try again. (esc)ape",
                Style::default().add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(area, buf);
            return;
        }

        match self.state {
            AppState::Attempting => render_attempt(self, area, buf),
            AppState::ConfirmSubmit => {
                render_attempt(self, area, buf);
                render_confirm(self, area, buf);
            }
            AppState::ConfirmQuit => {
                render_attempt(self, area, buf);
                render_quit(area, buf);
            }
            AppState::Results => render_results(self, area, buf),
            AppState::Review { index } => render_review(self, index, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn render_attempt(app: &App, area: Rect, buf: &mut Buffer) {
    let session = app.attempt.session();
    let Some(question) = session.current_question() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title + timer
            Constraint::Length(1), // counts
            Constraint::Length(1), // progress
            Constraint::Length(1), // padding
            Constraint::Min(3),    // question
            Constraint::Length(1), // notice
            Constraint::Length(1), // legend
        ])
        .split(area);

    let (minutes, seconds) = session.remaining_time();
    let clock = format!("{}:{:02}", minutes, seconds);
    let title = app.attempt.title();
    let gap = (chunks[0].width as usize).saturating_sub(title.width() + clock.width());
    let timer_style = if minutes == 0 && seconds <= 30 {
        bold().fg(Color::Red)
    } else {
        bold()
    };
    Paragraph::new(Line::from(vec![
        Span::styled(title.to_string(), bold().fg(Color::Magenta)),
        Span::raw(" ".repeat(gap)),
        Span::styled(clock, timer_style),
    ]))
    .render(chunks[0], buf);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("attempted {}", session.attempted_count()), Style::default().fg(Color::Green)),
        Span::raw("   "),
        Span::styled(
            format!("visited, not attempted {}", session.visited_but_not_attempted_count()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("   "),
        Span::styled(
            format!("not attempted {}", session.not_attempted_count()),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .alignment(Alignment::Right)
    .render(chunks[1], buf);

    let progress = session.progress_percentage();
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(progress / 100.0)
        .label(format!("{:.0}%", progress))
        .render(chunks[2], buf);

    let selected = session.answer_for(&question.id);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!(
                    "Question {}/{}",
                    session.current_index() + 1,
                    session.questions().len()
                ),
                bold().fg(Color::LightRed),
            ),
            Span::styled(
                if selected.is_some() { "   attempted" } else { "" },
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(question.question_text.clone(), bold())),
        Line::from(""),
    ];
    for (idx, option) in question.options.iter().enumerate() {
        let is_selected = selected == Some(option);
        let marker = if is_selected { "(•)" } else { "( )" };
        let style = if is_selected {
            bold().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{} {} {}", idx + 1, marker, option),
            style,
        )));
    }
    if question.options.is_empty() {
        lines.push(Line::from(vec![
            Span::raw("answer: "),
            Span::styled(
                format!("{}_", selected.map(String::as_str).unwrap_or("")),
                bold().fg(Color::Cyan),
            ),
        ]));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(chunks[4], buf);

    render_notice(app, chunks[5], buf);

    let legend = if question.options.is_empty() {
        "(0-9 . -) type answer / (⌫) erase / (←→) navigate / (enter) next or submit / (esc)ape"
    } else if session.is_last_question() {
        "(1-9) answer / (0) clear / (←) previous / (enter) submit / (esc)ape"
    } else {
        "(1-9) answer / (0) clear / (←→) navigate / (enter) next / (esc)ape"
    };
    Paragraph::new(Span::styled(
        legend,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[6], buf);
}

fn render_confirm(app: &App, area: Rect, buf: &mut Buffer) {
    let session = app.attempt.session();
    let popup = centered_rect(50, 7, area);

    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(format!("attempted: {}", session.attempted_count())),
        Line::from(format!(
            "visited, not attempted: {}",
            session.visited_but_not_attempted_count()
        )),
        Line::from(format!("not attempted: {}", session.not_attempted_count())),
        Line::from(""),
        Line::from(Span::styled("submit the test? (y)es / (n)o", bold())),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Submit"))
    .render(popup, buf);
}

fn render_quit(area: Rect, buf: &mut Buffer) {
    let popup = centered_rect(60, 7, area);

    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from("the attempt stays open; resuming it counts as a cheat attempt"),
        Line::from(""),
        Line::from(Span::styled("leave the test? (y)es / (n)o", bold())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Quit"))
    .render(popup, buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(7),
            Constraint::Min(1),
            Constraint::Length(1), // notice
            Constraint::Length(1), // legend
        ])
        .split(area);

    if let Some(result) = app.attempt.result() {
        let submit_reason = app.attempt.session().submit_reason();
        let reason = match submit_reason {
            Some(SubmitReason::TimeUp) => "submitted automatically: time is up",
            Some(SubmitReason::CheatLimit) => "submitted automatically: too many cheat attempts",
            _ => "submitted",
        };
        let reason_style = if submit_reason.is_some_and(|r| r.is_forced()) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC)
        } else {
            Style::default().add_modifier(Modifier::ITALIC)
        };
        Paragraph::new(vec![
            Line::from(Span::styled(app.attempt.title().to_string(), bold().fg(Color::Magenta))),
            Line::from(""),
            Line::from(Span::styled(
                format!("{} / {} marks", result.total_marks, result.max_marks()),
                bold(),
            )),
            Line::from(vec![
                Span::styled(format!("{} correct", result.correct_answers), Style::default().fg(Color::Green)),
                Span::raw("   "),
                Span::styled(format!("{} wrong", result.wrong_answers), Style::default().fg(Color::Red)),
                Span::raw("   "),
                Span::raw(format!("time {}", result.time_spent())),
            ]),
            Line::from(""),
            Line::from(Span::styled(reason, reason_style)),
        ])
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    }

    render_notice(app, chunks[3], buf);
    Paragraph::new(Span::styled(
        "(r)eview answers / (q)uit",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[4], buf);
}

fn render_review(app: &App, index: usize, area: Rect, buf: &mut Buffer) {
    let rows = app.attempt.review();
    let Some(row) = rows.get(index) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let status = match row.status {
        ReviewStatus::Correct => Span::styled(
            row.marks_label().unwrap_or_default(),
            bold().fg(Color::Green),
        ),
        ReviewStatus::Wrong => Span::styled(
            row.marks_label().unwrap_or_default(),
            bold().fg(Color::Red),
        ),
        ReviewStatus::NotAttempted => Span::styled("not attempted", bold().fg(Color::Red)),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("Question {}/{}   ", index + 1, rows.len()),
                bold().fg(Color::LightRed),
            ),
            status,
        ]),
        Line::from(""),
        Line::from(Span::styled(row.question.question_text.clone(), bold())),
        Line::from(""),
    ];

    for option in &row.question.options {
        let is_correct = *option == row.question.correct_answer;
        let is_given = row.given == Some(option);
        let (marker, style) = match (is_correct, is_given) {
            (true, _) => ("✓", Style::default().fg(Color::Green)),
            (false, true) => ("✗", Style::default().fg(Color::Red)),
            (false, false) => (" ", Style::default()),
        };
        lines.push(Line::from(Span::styled(format!("{} {}", marker, option), style)));
    }

    if row.question.options.is_empty() {
        lines.push(Line::from(format!(
            "your answer: {}   correct: {}",
            row.given.map(String::as_str).unwrap_or("-"),
            row.question.correct_answer
        )));
    }

    if let Some(description) = &row.question.description {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("explanation: {}", description),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "(←→) navigate / (b)ack / (q)uit   time {}",
            format_clock(app.attempt.session().elapsed_secs())
        ),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[1], buf);
}

fn render_notice(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(notice) = &app.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
    };
    Paragraph::new(Span::styled(notice.message.clone(), bold().fg(color)))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height: height.min(area.height),
    }
}
