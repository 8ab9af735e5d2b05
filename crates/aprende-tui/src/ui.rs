use aprende_core::page::{
    CHAT_TITLE, CTA_TAGLINE, CTA_TITLE, FEATURES, FEATURES_TITLE, HERO_TAGLINE, HERO_TITLE,
};
use aprende_core::{Block as ReplyBlock, ChatRole, ChatWidget, Content, Cta, Inline, NotificationLevel, Reply};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::{App, Focus, InputMode};

const ACCENT: Color = Color::Magenta;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    // Hit-test areas are rebuilt every frame
    app.cta_areas.clear();
    app.chat_area = None;
    app.input_area = None;
    app.send_area = None;

    render_header(app, frame, header_area);
    render_landing(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if let Some(notification) = app.notifications.last() {
        render_notification(notification, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" aprende ", Style::default().fg(Color::White).bg(ACCENT).bold()),
        Span::raw(" "),
        Span::styled(app.model.as_str(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_landing(app: &mut App, frame: &mut Frame, area: Rect) {
    let constraints = if app.page.is_chat_visible() {
        [
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Length(7),
            Constraint::Length(7),
        ]
    } else {
        [
            Constraint::Min(6),
            Constraint::Length(0),
            Constraint::Length(7),
            Constraint::Length(7),
        ]
    };
    let [hero_area, chat_area, features_area, cta_area] = Layout::vertical(constraints).areas(area);

    render_hero(app, frame, hero_area);
    if app.page.is_chat_visible() {
        render_chat(app, frame, chat_area);
    }
    render_features(frame, features_area);
    render_cta_banner(app, frame, cta_area);
}

fn render_hero(app: &mut App, frame: &mut Frame, area: Rect) {
    let [title_area, tagline_area, button_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
    ])
    .areas(area);

    let title = Paragraph::new(HERO_TITLE)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, title_area);

    let tagline = Paragraph::new(HERO_TAGLINE)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(tagline, tagline_area);

    render_button(app, frame, button_area, Cta::GetStarted);
}

/// Render a CTA button centred in `row` and register it for mouse clicks
fn render_button(app: &mut App, frame: &mut Frame, row: Rect, cta: Cta) {
    let label = cta.label();
    let width = (label.chars().count() as u16 + 6).min(row.width);
    let rect = Rect::new(row.x + (row.width - width) / 2, row.y, width, row.height.min(3));

    let focused = app.focus == Focus::Cta(cta);
    let base = match cta {
        Cta::GetStarted => Style::default().bg(ACCENT).fg(Color::White),
        Cta::StartLearning => Style::default().bg(Color::White).fg(ACCENT),
    };
    let border = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        base
    };

    let button = Paragraph::new(label)
        .style(base.add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border),
        );
    frame.render_widget(button, rect);
    app.cta_areas.push((cta, rect));
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(chat) = app.page.chat() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(Span::styled(format!(" {} ", CHAT_TITLE), Style::default().fg(ACCENT).bold()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [messages_area, input_row] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);
    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(10),
    ])
    .areas(input_row);

    // Message history, pre-wrapped so the row count is the scroll height
    let rows: Vec<Line<'static>> = chat_lines(chat, app.animation_frame)
        .iter()
        .flat_map(|line| wrap_line(line, messages_area.width as usize))
        .collect();
    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(messages_area.height);
    if app.chat_follow || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.chat_follow = true;
    }

    let messages = Paragraph::new(Text::from(rows)).scroll((app.chat_scroll, 0));
    frame.render_widget(messages, messages_area);

    // Input line with horizontal scrolling to keep the cursor visible
    let editing = app.focus == Focus::Input && app.input_mode == InputMode::Editing;
    let input_border = if editing {
        Color::Yellow
    } else if app.focus == Focus::Input {
        ACCENT
    } else {
        Color::DarkGray
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border));

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_window(chat.draft(), app.input_cursor, inner_width);

    let input = if chat.draft().is_empty() {
        Paragraph::new(Span::styled("Type your message...", Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(visible_text)
    };
    frame.render_widget(input.block(input_block), input_area);

    if editing {
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    // Send button, inert while a reply is pending
    let send_style = if chat.is_awaiting() {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
    } else {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    };
    let send = Paragraph::new("Send ➤")
        .style(send_style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(send_style));
    frame.render_widget(send, send_area);

    app.chat_area = Some(messages_area);
    app.input_area = Some(input_area);
    if !app.is_awaiting() {
        app.send_area = Some(send_area);
    }
}

/// Lines for the message list, including the typing indicator
fn chat_lines(chat: &ChatWidget, animation_frame: u8) -> Vec<Line<'_>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in chat.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(
                    Line::from(Span::styled("You", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)))
                        .alignment(Alignment::Right),
                );
                if let Content::Text(text) = &msg.content {
                    for line in text.lines() {
                        lines.push(
                            Line::from(Span::styled(line, Style::default().fg(ACCENT)))
                                .alignment(Alignment::Right),
                        );
                    }
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                match &msg.content {
                    Content::Text(text) => lines.extend(text.lines().map(Line::from)),
                    Content::Reply(reply) => lines.extend(reply_lines(reply)),
                }
            }
        }
        lines.push(Line::default());
    }

    if chat.is_awaiting() {
        lines.push(Line::from(Span::styled(
            "AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn reply_lines(reply: &Reply) -> Vec<Line<'_>> {
    let mut lines = Vec::new();

    for (i, block) in reply.blocks().iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        match block {
            ReplyBlock::Heading { level, content } => {
                let style = match level {
                    1 => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    2 => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                lines.push(Line::from(inline_spans(content, style)));
            }
            ReplyBlock::List(items) => {
                for item in items {
                    let mut spans = vec![Span::styled("• ", Style::default().fg(ACCENT))];
                    spans.extend(inline_spans(item, Style::default()));
                    lines.push(Line::from(spans));
                }
            }
            ReplyBlock::Paragraph(paragraph) => {
                for line in paragraph {
                    lines.push(Line::from(inline_spans(line, Style::default())));
                }
            }
        }
    }

    lines
}

fn inline_spans(spans: &[Inline], base: Style) -> Vec<Span<'_>> {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(text) => Span::styled(text.as_str(), base),
            Inline::Strong(text) => Span::styled(text.as_str(), base.add_modifier(Modifier::BOLD)),
        })
        .collect()
}

/// Slice of the draft that fits in `width` columns with the cursor in view.
///
/// Offsets are in display columns, so wide characters keep the cursor
/// aligned. Returns the visible text and the cursor column within it.
fn input_window(draft: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = draft.chars().collect();
    let cursor = cursor.min(chars.len());
    let columns = |range: &[char]| range.iter().map(|c| c.width().unwrap_or(0)).sum::<usize>();

    // Drop characters from the left until the cursor cell fits
    let mut start = 0;
    while start < cursor && columns(&chars[start..cursor]) >= width.max(1) {
        start += 1;
    }

    let mut visible = String::new();
    let mut used = 0;
    for c in &chars[start..] {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        visible.push(*c);
        used += w;
    }

    let cursor_x = u16::try_from(columns(&chars[start..cursor])).unwrap_or(u16::MAX);
    (visible, cursor_x)
}

/// Split text into alternating runs of whitespace and non-whitespace
fn word_runs(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let space = first.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != space)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(run)
    })
}

fn break_row(rows: &mut Vec<Vec<Span<'static>>>) {
    if let Some(row) = rows.last_mut() {
        while row.last().is_some_and(|span| span.content.trim().is_empty()) {
            row.pop();
        }
    }
    rows.push(Vec::new());
}

fn push_span(rows: &mut [Vec<Span<'static>>], text: &str, style: Style) {
    if let Some(row) = rows.last_mut() {
        row.push(Span::styled(text.to_string(), style));
    }
}

/// Word-wrap a styled line into rows at most `width` columns wide.
///
/// Words wider than a whole row are broken between characters. Alignment
/// and line style carry over to every row.
fn wrap_line(line: &Line<'_>, width: usize) -> Vec<Line<'static>> {
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new()];

    if width == 0 {
        for span in &line.spans {
            push_span(&mut rows, &span.content, span.style);
        }
    } else {
        let mut row_width = 0;
        for span in &line.spans {
            for run in word_runs(&span.content) {
                let run_width = run.width();
                let is_space = run.chars().all(char::is_whitespace);

                if row_width + run_width <= width {
                    push_span(&mut rows, run, span.style);
                    row_width += run_width;
                } else if is_space {
                    // The break replaces the whitespace
                    if row_width > 0 {
                        break_row(&mut rows);
                        row_width = 0;
                    }
                } else if run_width <= width {
                    break_row(&mut rows);
                    push_span(&mut rows, run, span.style);
                    row_width = run_width;
                } else {
                    for c in run.chars() {
                        let w = c.width().unwrap_or(0);
                        if row_width > 0 && row_width + w > width {
                            break_row(&mut rows);
                            row_width = 0;
                        }
                        push_span(&mut rows, c.encode_utf8(&mut [0; 4]), span.style);
                        row_width += w;
                    }
                }
            }
        }
    }

    rows.into_iter()
        .map(|spans| {
            let mut row = Line::from(spans).style(line.style);
            row.alignment = line.alignment;
            row
        })
        .collect()
}

fn render_features(frame: &mut Frame, area: Rect) {
    let [title_area, cards_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    let title = Paragraph::new(FEATURES_TITLE)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, title_area);

    let card_areas = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(cards_area);
    for (feature, card_area) in FEATURES.iter().zip(card_areas.iter()) {
        let card = Paragraph::new(Text::from(vec![
            Line::from(vec![
                Span::raw(feature.icon),
                Span::raw(" "),
                Span::styled(feature.title, Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(Span::styled(feature.description, Style::default().fg(Color::Gray))),
        ]))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(card, *card_area);
    }
}

fn render_cta_banner(app: &mut App, frame: &mut Frame, area: Rect) {
    let banner = Block::default().style(Style::default().bg(ACCENT).fg(Color::White));
    let inner = banner.inner(area);
    frame.render_widget(banner, area);

    let [title_area, tagline_area, button_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
    ])
    .areas(inner);

    let title = Paragraph::new(CTA_TITLE)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, title_area);

    let tagline = Paragraph::new(CTA_TAGLINE)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(tagline, tagline_area);

    render_button(app, frame, button_area, Cta::StartLearning);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " normal "), (" Tab ", " focus ")],
        InputMode::Normal if app.page.is_chat_visible() => &[
            (" Tab ", " focus "),
            (" Enter ", " select "),
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" q ", " quit "),
        ],
        InputMode::Normal => &[(" Tab ", " focus "), (" Enter ", " select "), (" q ", " quit ")],
    };
    for (key, label) in hints {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }
    if !app.notifications.is_empty() {
        spans.push(Span::styled(" Esc ", key_style));
        spans.push(Span::styled(" dismiss ", label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_notification(notification: &aprende_core::Notification, frame: &mut Frame, area: Rect) {
    let width = 50.min(area.width.saturating_sub(2));
    let height = 6.min(area.height);
    let popup_area = Rect::new(area.x + area.width.saturating_sub(width + 1), area.y + 1, width, height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let color = match notification.level {
        NotificationLevel::Error => Color::Red,
        NotificationLevel::Info => Color::Cyan,
    };

    let body = Paragraph::new(Text::from(vec![
        Line::from(notification.description.as_str()),
        Line::from(Span::styled("Esc to dismiss", Style::default().fg(Color::DarkGray))),
    ]))
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color))
            .title(Span::styled(
                format!(" {} ", notification.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(body, popup_area);
}
