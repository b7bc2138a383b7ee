/// Decode `bytes` lossily and cut the text to at most `max_bytes`, never
/// splitting a character.
pub fn truncate_bytes(bytes: &[u8], max_bytes: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let end = text
        .char_indices()
        .map(|(start, ch)| start + ch.len_utf8())
        .take_while(|end| *end <= max_bytes)
        .last()
        .unwrap_or(0);
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_bytes("héllo".as_bytes(), 2), "h");
        assert_eq!(truncate_bytes("héllo".as_bytes(), 3), "hé");
        assert_eq!(truncate_bytes(b"short", 100), "short");
        assert_eq!(truncate_bytes(b"", 4), "");
    }

    #[test]
    fn invalid_utf8_is_replaced_before_cutting() {
        assert_eq!(truncate_bytes(b"ok\xffrest", 100), "ok\u{FFFD}rest");
        assert_eq!(truncate_bytes(b"ok\xffrest", 4), "ok");
    }
}
