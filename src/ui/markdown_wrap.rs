use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// Words up to this width move to the next line whole; longer tokens such as
/// URLs or stack frames are hard-broken.
const MAX_UNBREAKABLE_LENGTH: usize = 30;

fn char_width(ch: char) -> usize {
    UnicodeWidthStr::width(ch.encode_utf8(&mut [0; 4]))
}

/// Wrap a styled line to the provided width while preserving styles and word
/// boundaries. Always yields at least one line.
pub fn wrap_line(line: &Line<'static>, max_width: usize) -> Vec<Line<'static>> {
    let max_width = max_width.max(1);
    let mut wrapped: Vec<Vec<Span<'static>>> = Vec::new();
    let mut current_line: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    let parts: Vec<(String, Style)> = line
        .spans
        .iter()
        .map(|span| (span.content.to_string(), span.style))
        .collect();

    for (mut text, style) in parts {
        while !text.is_empty() {
            let mut fit_end = 0usize;
            let mut fit_width = 0usize;
            let mut last_break: Option<usize> = None;
            for (pos, ch) in text.char_indices() {
                let cw = char_width(ch);
                if current_width + fit_width + cw > max_width {
                    break;
                }
                fit_width += cw;
                fit_end = pos + ch.len_utf8();
                if ch.is_whitespace() {
                    last_break = Some(fit_end);
                }
            }

            if fit_end >= text.len() {
                current_line.push(Span::styled(text, style));
                current_width += fit_width;
                break;
            }
            if fit_end > 0 && text[fit_end..].starts_with(char::is_whitespace) {
                last_break = Some(fit_end);
            }

            if fit_end == 0 {
                if !current_line.is_empty() {
                    wrapped.push(std::mem::take(&mut current_line));
                    current_width = 0;
                    continue;
                }
                // A single over-wide character still has to go somewhere.
                let first_len = text.chars().next().map_or(text.len(), char::len_utf8);
                current_line.push(Span::styled(text[..first_len].to_string(), style));
                wrapped.push(std::mem::take(&mut current_line));
                text = text[first_len..].to_string();
                continue;
            }

            let break_at = match last_break {
                Some(pos) => pos,
                None => {
                    let word_end = text.find(char::is_whitespace).unwrap_or(text.len());
                    let word_width = UnicodeWidthStr::width(&text[..word_end]);
                    if current_width > 0 && word_width <= MAX_UNBREAKABLE_LENGTH {
                        // Start the word on a fresh line instead of splitting it.
                        wrapped.push(std::mem::take(&mut current_line));
                        current_width = 0;
                        continue;
                    }
                    fit_end
                }
            };

            let left = text[..break_at].trim_end();
            if !left.is_empty() {
                current_line.push(Span::styled(left.to_string(), style));
            }
            wrapped.push(std::mem::take(&mut current_line));
            current_width = 0;
            text = text[break_at..].trim_start().to_string();
        }
    }

    if !current_line.is_empty() || wrapped.is_empty() {
        wrapped.push(current_line);
    }
    wrapped.into_iter().map(Line::from).collect()
}

#[cfg(test)]
mod tests {
    use super::wrap_line;
    use ratatui::style::{Color, Style};
    use ratatui::text::{Line, Span};

    fn plain(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn wrap_splits_at_spaces() {
        let line = Line::from("word boundary test");
        assert_eq!(plain(&wrap_line(&line, 9)), vec!["word", "boundary", "test"]);
    }

    #[test]
    fn long_tokens_are_hard_broken() {
        let line = Line::from("abcdefghij");
        assert_eq!(plain(&wrap_line(&line, 4)), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn styles_survive_wrapping() {
        let red = Style::default().fg(Color::Red);
        let line = Line::from(vec![
            Span::raw("You: "),
            Span::styled("failing test name", red),
        ]);
        let wrapped = wrap_line(&line, 12);
        assert_eq!(plain(&wrapped), vec!["You: failing", "test name"]);
        assert_eq!(wrapped[1].spans[0].style, red);
    }

    #[test]
    fn empty_line_stays_one_line() {
        assert_eq!(wrap_line(&Line::default(), 10).len(), 1);
    }
}
