use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::lists::ListKind;

const CODE_INDENT: &str = "  ";

fn heading_style(level: u8) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match level {
        1 => base.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        2 => base.fg(Color::Cyan),
        _ => base,
    }
}

fn inline_code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn code_block_style() -> Style {
    Style::default().fg(Color::Green)
}

/// Renders a bot reply into unwrapped terminal lines.
pub fn render_markdown(content: &str) -> Vec<Line<'static>> {
    MarkdownRenderer::new(content).render()
}

struct MarkdownRenderer<'a> {
    content: &'a str,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<ListKind>,
    /// Language hint of the open fenced block, empty for indented blocks.
    in_code_block: Option<String>,
    code_block_lines: Vec<String>,
}

impl<'a> MarkdownRenderer<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            lines: Vec::new(),
            current_spans: Vec::new(),
            style_stack: vec![Style::default()],
            list_stack: Vec::new(),
            in_code_block: None,
            code_block_lines: Vec::new(),
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn render(mut self) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        let parser = Parser::new_ext(self.content, options);

        for event in parser {
            match event {
                Event::Start(tag) => match tag {
                    Tag::Paragraph => {}
                    Tag::Heading { level, .. } => {
                        self.flush_current_spans();
                        self.style_stack.push(heading_style(level as u8));
                    }
                    Tag::BlockQuote(_) => {
                        let style = self.current_style().fg(Color::DarkGray);
                        self.style_stack.push(style);
                        self.current_spans.push(Span::styled("│ ", style));
                    }
                    Tag::List(start) => {
                        self.flush_current_spans();
                        self.list_stack.push(match start {
                            Some(n) => ListKind::Ordered(n),
                            None => ListKind::Unordered,
                        });
                    }
                    Tag::Item => {
                        self.flush_current_spans();
                        let depth = self.list_stack.len().saturating_sub(1);
                        let marker = self
                            .list_stack
                            .last_mut()
                            .map(ListKind::next_marker)
                            .unwrap_or_else(|| "- ".to_string());
                        self.current_spans.push(Span::raw("  ".repeat(depth)));
                        self.current_spans
                            .push(Span::styled(marker, Style::default().fg(Color::Cyan)));
                    }
                    Tag::CodeBlock(kind) => {
                        self.flush_current_spans();
                        let hint = match kind {
                            CodeBlockKind::Fenced(lang) => lang.to_string(),
                            CodeBlockKind::Indented => String::new(),
                        };
                        self.in_code_block = Some(hint);
                        self.code_block_lines.clear();
                    }
                    Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
                    Tag::Strong => self.push_modifier(Modifier::BOLD),
                    Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
                    Tag::Link { .. } => {
                        let style = self
                            .current_style()
                            .fg(Color::Blue)
                            .add_modifier(Modifier::UNDERLINED);
                        self.style_stack.push(style);
                    }
                    _ => {}
                },
                Event::End(tag_end) => match tag_end {
                    TagEnd::Paragraph => {
                        self.flush_current_spans();
                        if self.list_stack.is_empty() {
                            self.push_empty_line();
                        }
                    }
                    TagEnd::Heading(_) => {
                        self.flush_current_spans();
                        self.pop_style();
                        self.push_empty_line();
                    }
                    TagEnd::BlockQuote(_) => {
                        self.flush_current_spans();
                        self.pop_style();
                    }
                    TagEnd::List(_) => {
                        self.flush_current_spans();
                        self.list_stack.pop();
                        if self.list_stack.is_empty() {
                            self.push_empty_line();
                        }
                    }
                    TagEnd::Item => self.flush_current_spans(),
                    TagEnd::CodeBlock => self.finalize_code_block(),
                    TagEnd::Emphasis
                    | TagEnd::Strong
                    | TagEnd::Strikethrough
                    | TagEnd::Link => self.pop_style(),
                    _ => {}
                },
                Event::Text(text) => {
                    if self.in_code_block.is_some() {
                        self.code_block_lines
                            .extend(text.lines().map(str::to_string));
                    } else {
                        let style = self.current_style();
                        self.current_spans.push(Span::styled(text.into_string(), style));
                    }
                }
                Event::Code(code) => {
                    self.current_spans
                        .push(Span::styled(code.into_string(), inline_code_style()));
                }
                Event::SoftBreak => {
                    let style = self.current_style();
                    self.current_spans.push(Span::styled(" ", style));
                }
                Event::HardBreak => self.flush_current_spans(),
                Event::Rule => {
                    self.flush_current_spans();
                    self.lines.push(Line::from(Span::styled(
                        "─".repeat(20),
                        Style::default().fg(Color::DarkGray),
                    )));
                    self.push_empty_line();
                }
                Event::TaskListMarker(checked) => {
                    let marker = if checked { "[x] " } else { "[ ] " };
                    self.current_spans.push(Span::raw(marker));
                }
                Event::Html(html) | Event::InlineHtml(html) => {
                    let style = self.current_style();
                    self.current_spans.push(Span::styled(html.into_string(), style));
                }
                _ => {}
            }
        }

        self.flush_current_spans();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn flush_current_spans(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);
        self.lines.push(Line::from(spans));
    }

    fn push_empty_line(&mut self) {
        if self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            return;
        }
        self.lines.push(Line::default());
    }

    fn finalize_code_block(&mut self) {
        let hint = self.in_code_block.take().unwrap_or_default();
        if !hint.is_empty() {
            self.lines.push(Line::from(Span::styled(
                format!("{CODE_INDENT}{hint}"),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        for line in std::mem::take(&mut self.code_block_lines) {
            self.lines.push(Line::from(Span::styled(
                format!("{CODE_INDENT}{line}"),
                code_block_style(),
            )));
        }
        self.push_empty_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let lines = render_markdown("First line\ncontinues.\n\nSecond.");
        assert_eq!(plain(&lines), vec!["First line continues.", "", "Second."]);
    }

    #[test]
    fn lists_get_markers_and_nesting() {
        let lines = render_markdown("1. one\n2. two\n   - nested\n\nafter");
        assert_eq!(
            plain(&lines),
            vec!["1. one", "2. two", "  - nested", "", "after"]
        );
    }

    #[test]
    fn fenced_code_keeps_lines_and_hint() {
        let lines = render_markdown("```sh\nmvn -q\nexit 1\n```");
        assert_eq!(plain(&lines), vec!["  sh", "  mvn -q", "  exit 1"]);
        assert_eq!(lines[1].spans[0].style, code_block_style());
    }

    #[test]
    fn inline_styles_are_applied() {
        let lines = render_markdown("**bold** and *soft* with `code`");
        let spans = &lines[0].spans;
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[0].content, "bold");
        assert!(spans[2].style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(spans[4].content, "code");
        assert_eq!(spans[4].style, inline_code_style());
    }

    #[test]
    fn headings_are_bold() {
        let lines = render_markdown("## Root cause\nThe test timed out.");
        assert_eq!(plain(&lines)[0], "Root cause");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }
}
