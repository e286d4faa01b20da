//! Script and expression payload envelopes
//!
//! Structured payloads ride inside ordinary chat messages as a base64 JSON
//! blob between inline delimiter tags, so the message file itself stays a
//! flat list of strings. Classifiers decide whether pasted text is worth
//! wrapping; they are registered capabilities tried in order, never
//! source-specific type checks.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SCRIPT_OPEN: &str = "[SCRIPT_DATA]";
pub const SCRIPT_CLOSE: &str = "[/SCRIPT_DATA]";
pub const EXPRESSION_OPEN: &str = "[EXPRESSION_DATA]";
pub const EXPRESSION_CLOSE: &str = "[/EXPRESSION_DATA]";

/// A shared script or expression fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub script: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which envelope a message carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Script,
    Expression,
}

impl EnvelopeKind {
    pub fn label(&self) -> &'static str {
        match self {
            EnvelopeKind::Script => "script",
            EnvelopeKind::Expression => "expression",
        }
    }
}

/// Classified content of a message body.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// No envelope; render the text as-is.
    Plain,
    Script(ScriptPayload),
    Expression(ScriptPayload),
    /// An envelope was present but would not decode. Rendered as an inline
    /// error, never a display failure.
    Undecodable(EnvelopeKind),
}

/// Classify a raw message body by its inline tags.
pub fn parse_body(message: &str) -> MessageBody {
    if let Some(inner) = between(message, SCRIPT_OPEN, SCRIPT_CLOSE) {
        return match decode_payload(inner) {
            Ok(payload) => MessageBody::Script(payload),
            Err(_) => MessageBody::Undecodable(EnvelopeKind::Script),
        };
    }
    if let Some(inner) = between(message, EXPRESSION_OPEN, EXPRESSION_CLOSE) {
        return match decode_payload(inner) {
            Ok(payload) => MessageBody::Expression(payload),
            Err(_) => MessageBody::Undecodable(EnvelopeKind::Expression),
        };
    }
    MessageBody::Plain
}

/// Encode a payload to its wire form: JSON, then base64.
pub fn encode_payload(payload: &ScriptPayload) -> Result<String> {
    let json = serde_json::to_string(payload)?;
    Ok(BASE64.encode(json.as_bytes()))
}

/// Decode the wire form back to a payload.
pub fn decode_payload(encoded: &str) -> Result<ScriptPayload> {
    let bytes = BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|e| Error::PayloadDecode(e.to_string()))?;
    let json = String::from_utf8(bytes).map_err(|e| Error::PayloadDecode(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| Error::PayloadDecode(e.to_string()))
}

/// Wrap a payload for transport inside a plain-text message.
pub fn wrap_script(payload: &ScriptPayload) -> Result<String> {
    Ok(format!(
        "{}{}{}",
        SCRIPT_OPEN,
        encode_payload(payload)?,
        SCRIPT_CLOSE
    ))
}

pub fn wrap_expression(payload: &ScriptPayload) -> Result<String> {
    Ok(format!(
        "{}{}{}",
        EXPRESSION_OPEN,
        encode_payload(payload)?,
        EXPRESSION_CLOSE
    ))
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text.find(close)?;
    (start <= end).then(|| &text[start..end])
}

/// Rough node count for a script fragment, for display metadata. A line
/// opens a node when a word runs into an opening brace; comment lines do
/// not count.
pub fn count_nodes(script: &str) -> usize {
    script.lines().filter(|line| line_opens_node(line)).count()
}

fn line_opens_node(line: &str) -> bool {
    if line.trim_start().starts_with('#') {
        return false;
    }
    let mut after_word = false;
    for c in line.chars() {
        if c == '{' && after_word {
            return true;
        }
        if c.is_alphanumeric() || c == '_' {
            after_word = true;
        } else if !c.is_whitespace() {
            after_word = false;
        }
        // whitespace keeps after_word set, so "Blur {" counts
    }
    false
}

/// A registered capability that recognizes shareable payloads in raw text.
pub trait PayloadClassifier: Send + Sync {
    /// Does this text look like a payload this classifier understands?
    fn classify(&self, text: &str) -> bool;

    /// Build the payload from recognized text.
    fn extract(&self, text: &str) -> Option<ScriptPayload>;
}

/// Heuristic recognizer for Nuke script fragments on the clipboard.
///
/// Pure substring counting, no parsing; three indicator hits is enough.
pub struct NukeScriptClassifier;

const NUKE_INDICATORS: [&str; 12] = [
    "set cut_paste_input",
    "version",
    "push $",
    "Blur {",
    "Grade {",
    "Transform {",
    "Merge2 {",
    "Read {",
    "Write {",
    "ColorCorrect {",
    "xpos",
    "ypos",
];

const MIN_INDICATORS: usize = 3;

impl PayloadClassifier for NukeScriptClassifier {
    fn classify(&self, text: &str) -> bool {
        NUKE_INDICATORS
            .iter()
            .filter(|indicator| text.contains(*indicator))
            .count()
            >= MIN_INDICATORS
    }

    fn extract(&self, text: &str) -> Option<ScriptPayload> {
        self.classify(text).then(|| ScriptPayload {
            script: text.to_string(),
            kind: "script".to_string(),
            description: None,
        })
    }
}

/// Ordered set of payload classifiers. Dispatch tries each in registration
/// order and takes the first hit.
pub struct ClassifierRegistry {
    classifiers: Vec<Box<dyn PayloadClassifier>>,
}

impl ClassifierRegistry {
    pub fn empty() -> Self {
        Self {
            classifiers: Vec::new(),
        }
    }

    pub fn register(&mut self, classifier: Box<dyn PayloadClassifier>) {
        self.classifiers.push(classifier);
    }

    pub fn classify(&self, text: &str) -> bool {
        self.classifiers.iter().any(|c| c.classify(text))
    }

    pub fn extract(&self, text: &str) -> Option<ScriptPayload> {
        self.classifiers.iter().find_map(|c| c.extract(text))
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(NukeScriptClassifier));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SCRIPT: &str = "set cut_paste_input [stack 0]\n\
        version 13.2 v5\n\
        Blur {\n size 10\n xpos 100\n ypos 200\n}\n";

    #[test]
    fn test_wrap_and_parse_script() {
        let payload = ScriptPayload {
            script: "Blur { size 10 }".to_string(),
            kind: "script".to_string(),
            description: Some("soft blur".to_string()),
        };
        let message = wrap_script(&payload).unwrap();
        assert!(message.starts_with(SCRIPT_OPEN));
        assert!(message.ends_with(SCRIPT_CLOSE));

        match parse_body(&message) {
            MessageBody::Script(decoded) => assert_eq!(decoded, payload),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_expression_envelope() {
        let payload = ScriptPayload {
            script: "sin(frame/10)".to_string(),
            kind: "expression".to_string(),
            description: None,
        };
        let message = wrap_expression(&payload).unwrap();
        assert!(matches!(parse_body(&message), MessageBody::Expression(_)));
    }

    #[test]
    fn test_plain_text_stays_plain() {
        assert_eq!(parse_body("lunch at noon?"), MessageBody::Plain);
    }

    #[test]
    fn test_garbage_envelope_is_undecodable() {
        let message = format!("{}not base64 at all{}", SCRIPT_OPEN, SCRIPT_CLOSE);
        assert_eq!(
            parse_body(&message),
            MessageBody::Undecodable(EnvelopeKind::Script)
        );
    }

    #[test]
    fn test_classifier_needs_three_indicators() {
        let classifier = NukeScriptClassifier;
        assert!(classifier.classify(SAMPLE_SCRIPT));
        assert!(!classifier.classify("version only mentions version"));
        assert!(!classifier.classify("totally unrelated text"));
    }

    #[test]
    fn test_classifier_extract_carries_text() {
        let payload = NukeScriptClassifier.extract(SAMPLE_SCRIPT).unwrap();
        assert_eq!(payload.script, SAMPLE_SCRIPT);
        assert_eq!(payload.kind, "script");
    }

    #[test]
    fn test_registry_dispatch_order() {
        struct Always;
        impl PayloadClassifier for Always {
            fn classify(&self, _: &str) -> bool {
                true
            }
            fn extract(&self, text: &str) -> Option<ScriptPayload> {
                Some(ScriptPayload {
                    script: text.to_string(),
                    kind: "always".to_string(),
                    description: None,
                })
            }
        }

        let mut registry = ClassifierRegistry::default();
        registry.register(Box::new(Always));

        // The Nuke classifier is registered first and wins for Nuke text.
        let hit = registry.extract(SAMPLE_SCRIPT).unwrap();
        assert_eq!(hit.kind, "script");
        // The fallback catches what the first one passes on.
        let hit = registry.extract("plain").unwrap();
        assert_eq!(hit.kind, "always");
    }

    #[test]
    fn test_count_nodes() {
        assert_eq!(count_nodes(SAMPLE_SCRIPT), 1);
        assert_eq!(count_nodes("Blur {\n}\nGrade {\n}"), 2);
        assert_eq!(count_nodes("# Blur {\nplain text"), 0);
        assert_eq!(count_nodes(""), 0);
    }
}
