use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Turn a locally written phone number into one a dialler accepts: the leading
/// trunk digit is replaced by `country_code`. Numbers that already start with
/// `+` are kept.
pub(crate) fn international_number(phone: &str, country_code: &str) -> Option<String> {
    let compact: String = phone
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-'))
        .collect();
    if compact.starts_with('+') {
        return (compact.len() > 1).then_some(compact);
    }
    let mut digits = compact.chars();
    digits.next()?;
    let rest = digits.as_str();
    if rest.is_empty() {
        return None;
    }
    Some(format!("{country_code}{rest}"))
}
