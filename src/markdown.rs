//! Markdown rendering for bot turns.
//!
//! [`render_html`] produces the HTML kept on every finished bot turn;
//! [`markdown_to_lines`] turns the same source into styled ratatui lines for
//! the terminal view.

use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render markdown to HTML
pub fn render_html(source: &str) -> String {
    let parser = Parser::new_ext(source, options());
    let mut output = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Escape text so it displays literally when embedded in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Convert markdown to styled terminal lines
pub fn markdown_to_lines(source: &str) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut styles: Vec<Style> = vec![Style::default()];

    let mut in_code_block = false;
    let mut list_depth: usize = 0;
    let mut ordered: Vec<Option<u64>> = Vec::new();
    let mut table_cell: usize = 0;

    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush(&mut spans, &mut lines);
                let style = match level {
                    HeadingLevel::H1 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    HeadingLevel::H2 => Style::default().fg(Color::LightCyan).add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                styles.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                styles.pop();
                flush(&mut spans, &mut lines);
            }

            Event::Start(Tag::Strong) => push_modifier(&mut styles, Modifier::BOLD),
            Event::Start(Tag::Emphasis) => push_modifier(&mut styles, Modifier::ITALIC),
            Event::Start(Tag::Strikethrough) => push_modifier(&mut styles, Modifier::CROSSED_OUT),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                styles.pop();
            }

            Event::Code(code) => {
                spans.push(Span::styled(
                    code.to_string(),
                    Style::default().fg(Color::Yellow).bg(Color::Black),
                ));
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                flush(&mut spans, &mut lines);
                in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        lines.push(Line::styled(
                            format!("┌ {lang}"),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::raw(""));
            }

            Event::Start(Tag::List(start)) => {
                list_depth += 1;
                ordered.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                ordered.pop();
                if list_depth == 0 {
                    lines.push(Line::raw(""));
                }
            }
            Event::Start(Tag::Item) => {
                flush(&mut spans, &mut lines);
                let indent = "  ".repeat(list_depth.saturating_sub(1));
                let bullet = match ordered.last_mut() {
                    Some(Some(n)) => {
                        let label = format!("{indent}{n}. ");
                        *n += 1;
                        label
                    }
                    _ => format!("{indent}• "),
                };
                spans.push(Span::styled(bullet, Style::default().fg(Color::Cyan)));
            }
            Event::End(TagEnd::Item) => flush(&mut spans, &mut lines),

            Event::Start(Tag::Link { .. }) => {
                styles.push(Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
            }
            Event::End(TagEnd::Link) => {
                styles.pop();
            }

            Event::Start(Tag::BlockQuote) => {
                flush(&mut spans, &mut lines);
                push_modifier(&mut styles, Modifier::ITALIC);
                spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
            }
            Event::End(TagEnd::BlockQuote) => {
                flush(&mut spans, &mut lines);
                styles.pop();
            }

            Event::Start(Tag::TableHead) => {
                flush(&mut spans, &mut lines);
                table_cell = 0;
                push_modifier(&mut styles, Modifier::BOLD);
            }
            Event::End(TagEnd::TableHead) => {
                styles.pop();
                let width = spans.iter().map(|span| span.width()).sum::<usize>();
                flush(&mut spans, &mut lines);
                lines.push(Line::styled("─".repeat(width), Style::default().fg(Color::DarkGray)));
            }
            Event::Start(Tag::TableRow) => {
                flush(&mut spans, &mut lines);
                table_cell = 0;
            }
            Event::End(TagEnd::TableRow) => flush(&mut spans, &mut lines),
            Event::Start(Tag::TableCell) => {
                if table_cell > 0 {
                    spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
                }
                table_cell += 1;
            }
            Event::End(TagEnd::Table) => {
                flush(&mut spans, &mut lines);
                lines.push(Line::raw(""));
            }

            Event::End(TagEnd::Paragraph) => {
                flush(&mut spans, &mut lines);
                if list_depth == 0 {
                    lines.push(Line::raw(""));
                }
            }

            Event::Text(text) => {
                if in_code_block {
                    for code_line in text.lines() {
                        lines.push(Line::styled(
                            format!("  {code_line}"),
                            Style::default().fg(Color::Yellow),
                        ));
                    }
                } else {
                    let style = *styles.last().unwrap_or(&Style::default());
                    spans.push(Span::styled(text.to_string(), style));
                }
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                spans.push(Span::raw(raw.to_string()));
            }

            Event::SoftBreak => spans.push(Span::raw(" ")),
            Event::HardBreak => flush(&mut spans, &mut lines),

            Event::Rule => {
                flush(&mut spans, &mut lines);
                lines.push(Line::styled("─".repeat(40), Style::default().fg(Color::DarkGray)));
            }

            Event::TaskListMarker(done) => {
                spans.push(Span::raw(if done { "[x] " } else { "[ ] " }));
            }

            _ => {}
        }
    }

    flush(&mut spans, &mut lines);

    while lines.last().is_some_and(|line| line.width() == 0) {
        lines.pop();
    }

    lines
}

fn push_modifier(styles: &mut Vec<Style>, modifier: Modifier) {
    let base = *styles.last().unwrap_or(&Style::default());
    styles.push(base.add_modifier(modifier));
}

fn flush(spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>) {
    if !spans.is_empty() {
        lines.push(Line::from(std::mem::take(spans)));
    }
}
