/// Decodes RFC 2047 encoded words (`=?UTF-8?B?...?=`) in a header value the
/// backend passed through undecoded, e.g. the raw `From` line.
pub fn decode_mime_words(raw: &str) -> String {
    if !raw.contains("=?") {
        return raw.to_string();
    }
    // mailparse expects a full "Key: value" header line
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw.as_bytes());
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value(),
        Err(_) => raw.to_string(),
    }
}

/// One-line listing preview. Whitespace runs collapse to a single space;
/// long previews are cut to `max_chars` with a trailing ellipsis. Returns
/// `None` for a blank preview or the backend's bare `...` placeholder.
pub fn preview_line(raw: &str, max_chars: usize) -> Option<String> {
    let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.trim_matches(['.', '\u{2026}']).is_empty() || max_chars == 0 {
        return None;
    }
    if line.chars().count() <= max_chars {
        return Some(line);
    }
    let mut cut: String = line.chars().take(max_chars - 1).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('\u{2026}');
    Some(cut)
}
