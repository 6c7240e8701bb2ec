//! Command encoding and permissive decoding

use std::fmt::Write as _;

use super::decode_value;

/// Field key reserved for the correlation id
const SEQ_KEY: &str = "seq";

/// Ordered key/value payload of a command
///
/// Values are stored exactly as they appeared on the wire (still percent-encoded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value of an existing key in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let position = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// One decoded protocol message
///
/// An empty `name` marks a line that did not look like a command at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub index: Option<usize>,
    pub seq: Option<String>,
    pub fields: Fields,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attach a correlation id; an empty id means no reply is expected
    pub fn with_seq(mut self, seq: &str) -> Self {
        self.seq = (!seq.is_empty()).then(|| seq.to_string());
        self
    }

    /// Attach a field whose value is already wire-ready
    pub fn with_field(mut self, key: &str, raw_value: impl Into<String>) -> Self {
        self.fields.insert(key, raw_value);
        self
    }

    /// Attach a field, percent-encoding the value
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.with_field(key, super::encode_value(value))
    }

    /// Raw (still encoded) field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Percent-decoded field value, empty when the field is absent
    pub fn decoded(&self, key: &str) -> String {
        self.get(key).map(decode_value).unwrap_or_default()
    }

    /// Correlation id, empty when the command expects no reply
    pub fn seq(&self) -> &str {
        self.seq.as_deref().unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn encode(&self) -> String {
        encode(&self.name, self.index, self.seq.as_deref(), &self.fields)
    }
}

/// Serialize a command into one protocol line (without the trailing newline)
pub fn encode(name: &str, index: Option<usize>, seq: Option<&str>, fields: &Fields) -> String {
    let mut line = String::from(name);

    if let Some(index) = index {
        let _ = write!(line, " {}", index);
    }

    if let Some(seq) = seq.filter(|s| !s.is_empty()) {
        let _ = write!(line, " {}={}", SEQ_KEY, seq);
    }

    if !fields.is_empty() {
        line.push(' ');
        for (i, (key, value)) in fields.iter().enumerate() {
            if i > 0 {
                line.push('&');
            }
            line.push_str(key);
            line.push('=');
            line.push_str(value);
        }
    }

    line
}

/// Decode one protocol line
///
/// Never fails: text that does not start with a verb token yields a command
/// with an empty name, which every dispatcher ignores.
pub fn decode(line: &str) -> Command {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();

    let (name, rest) = split_token(line);
    if !is_verb_token(name) {
        return Command::default();
    }

    let mut command = Command::new(name);
    let mut rest = rest.trim_start();

    let (token, after) = split_token(rest);
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = token.parse() {
            command.index = Some(index);
            rest = after.trim_start();
        }
    }

    let (token, after) = split_token(rest);
    if let Some(seq) = token.strip_prefix("seq=") {
        if !seq.contains('&') {
            command.seq = (!seq.is_empty()).then(|| seq.to_string());
            rest = after.trim_start();
        }
    }

    for pair in rest.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        command.fields.insert(key, value);
    }

    if let Some(seq) = command.fields.remove(SEQ_KEY) {
        if command.seq.is_none() && !seq.is_empty() {
            command.seq = Some(seq);
        }
    }

    command
}

fn split_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], &text[end..]),
        None => (text, ""),
    }
}

fn is_verb_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_value;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_decode_full_command() {
        let cmd = decode("size 1 seq=42 width=800&height=600\n");
        assert_eq!(cmd.name, "size");
        assert_eq!(cmd.index, Some(1));
        assert_eq!(cmd.seq(), "42");
        assert_eq!(cmd.get("width"), Some("800"));
        assert_eq!(cmd.get("height"), Some("600"));
    }

    #[test]
    fn test_decode_seq_inside_query() {
        let cmd = decode("resolve seq=7&state=0&value=null");
        assert_eq!(cmd.seq(), "7");
        assert_eq!(cmd.index, None);
        assert_eq!(cmd.get("state"), Some("0"));
        assert_eq!(cmd.get("seq"), None);
    }

    #[test]
    fn test_decode_keeps_values_encoded() {
        let cmd = decode("title 0 value=Hello%20World");
        assert_eq!(cmd.get("value"), Some("Hello%20World"));
        assert_eq!(cmd.decoded("value"), "Hello World");
    }

    #[test]
    fn test_decode_bare_verb() {
        let cmd = decode("show");
        assert_eq!(cmd.name, "show");
        assert_eq!(cmd.index, None);
        assert!(cmd.seq.is_none());
        assert!(cmd.fields.is_empty());
    }

    #[test]
    fn test_decode_plain_text_is_empty_command() {
        assert!(decode("").is_empty());
        assert!(decode("   ").is_empty());
        assert!(decode("{\"json\": true}").is_empty());
        assert!(decode("Hello, world").is_empty());
    }

    #[test]
    fn test_decode_key_without_value() {
        let cmd = decode("context 0 value");
        assert_eq!(cmd.get("value"), Some(""));
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let samples = [
            fields(&[]),
            fields(&[("value", &encode_value("a & b = c"))]),
            fields(&[("width", "10"), ("height", "20"), ("state", "1")]),
            fields(&[("event", "ready"), ("value", &encode_value("{\"x\":[1,2]}"))]),
        ];

        for sample in samples {
            for (index, seq) in [(None, None), (Some(0), Some("1")), (Some(3), None)] {
                let line = encode("cmd", index, seq, &sample);
                let decoded = decode(&line);
                assert_eq!(decoded.fields, sample, "line: {}", line);
                assert_eq!(decoded.index, index);
                assert_eq!(decoded.seq.as_deref(), seq);
            }
        }
    }

    #[test]
    fn test_encode_skips_empty_seq() {
        let line = Command::new("hide").with_index(0).with_seq("").encode();
        assert_eq!(line, "hide 0");
    }

    #[test]
    fn test_fields_insert_replaces_in_place() {
        let mut f = fields(&[("a", "1"), ("b", "2")]);
        f.insert("a", "3");
        let pairs: Vec<_> = f.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }
}
