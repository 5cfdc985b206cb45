//! Gmail API v1 operation wrappers.
//!
//! Each wrapper is one remote call mapped to a fixed output shape. List
//! returns message stubs (id + thread id) in provider-default order; full
//! content is `get_message`'s job.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::token_cache::TokenCache;
use super::{execute, ConnectorError, ResourceFamily};

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_MAX_RESULTS: u32 = 50;

/// Placeholders for header-derived fields when the header is absent.
const NO_SUBJECT: &str = "(no subject)";
const NO_SENDER: &str = "(unknown sender)";
const NO_RECIPIENT: &str = "(unknown recipient)";
const NO_DATE: &str = "(unknown date)";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStub {
    id: String,
    #[serde(default)]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<GmailLabel>,
}

#[derive(Debug, Deserialize)]
struct GmailLabel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModifyResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: Option<DraftMessage>,
}

#[derive(Debug, Deserialize)]
struct DraftMessage {
    #[serde(default)]
    id: String,
}

// ============================================================================
// Public output shapes
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    pub messages: Vec<MessageSummary>,
    pub total_count: usize,
}

/// A single message with decoded text body and header-derived fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelHandle {
    pub id: String,
    pub name: String,
    /// Whether this call created the label (false when it already existed).
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyResult {
    pub success: bool,
    pub message_id: String,
    pub label_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftHandle {
    pub success: bool,
    pub draft_id: String,
    pub message_id: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Handle bound to Gmail API v1, carrying the bearer token only.
pub struct GmailClient {
    http: reqwest::Client,
    access_token: String,
}

impl GmailClient {
    /// Client factory: token cache first, then a handle for the mail
    /// family. Propagates cache failures; has no failure modes of its own.
    pub async fn connect(cache: &TokenCache) -> Result<Self, ConnectorError> {
        let access_token = cache.get_access_token(ResourceFamily::Mail).await?;
        Ok(Self {
            http: reqwest::Client::new(),
            access_token,
        })
    }

    /// List message stubs, provider-default order. `query` is a Gmail
    /// search string ("is:unread newer_than:1d" etc.).
    pub async fn list_messages(
        &self,
        max_results: Option<u32>,
        query: Option<&str>,
    ) -> Result<MessageList, ConnectorError> {
        let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let mut request = self
            .http
            .get(format!("{}/messages", GMAIL_BASE))
            .bearer_auth(&self.access_token)
            .query(&[("maxResults", max_results.to_string())]);
        if let Some(q) = query {
            request = request.query(&[("q", q)]);
        }

        let resp = execute("gmail list_messages", request).await?;
        let list: MessageListResponse = resp.json().await?;
        Ok(summarize_messages(list))
    }

    /// Fetch one message in full and decode its text body.
    pub async fn get_message(&self, id: &str) -> Result<MessageDetail, ConnectorError> {
        let request = self
            .http
            .get(format!("{}/messages/{}", GMAIL_BASE, id))
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")]);
        let resp = execute(&format!("gmail get_message {}", id), request).await?;
        let full: FullMessage = resp.json().await?;
        Ok(detail_from_message(full))
    }

    /// Return the label named `name`, creating it when absent.
    ///
    /// Matching is exact and case-sensitive. Calling twice with the same
    /// name creates at most once; the second call reports `created: false`.
    pub async fn get_or_create_label(&self, name: &str) -> Result<LabelHandle, ConnectorError> {
        let request = self
            .http
            .get(format!("{}/labels", GMAIL_BASE))
            .bearer_auth(&self.access_token);
        let resp = execute("gmail list_labels", request).await?;
        let list: LabelListResponse = resp.json().await?;

        if let Some(existing) = find_label(&list.labels, name) {
            return Ok(LabelHandle {
                id: existing.id.clone(),
                name: existing.name.clone(),
                created: false,
            });
        }

        let body = json!({
            "name": name,
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show",
        });
        let request = self
            .http
            .post(format!("{}/labels", GMAIL_BASE))
            .bearer_auth(&self.access_token)
            .json(&body);
        let resp = execute("gmail create_label", request).await?;
        let created: GmailLabel = resp.json().await?;
        log::info!("created label {} ({})", created.name, created.id);

        Ok(LabelHandle {
            id: created.id,
            name: created.name,
            created: true,
        })
    }

    /// Add a label to a message via messages.modify.
    pub async fn add_label(
        &self,
        message_id: &str,
        label_id: &str,
    ) -> Result<ModifyResult, ConnectorError> {
        let body = json!({ "addLabelIds": [label_id] });
        let request = self
            .http
            .post(format!("{}/messages/{}/modify", GMAIL_BASE, message_id))
            .bearer_auth(&self.access_token)
            .json(&body);
        let resp = execute(&format!("gmail add_label {}", message_id), request).await?;
        let modified: ModifyResponse = resp.json().await?;

        Ok(ModifyResult {
            success: true,
            message_id: modified.id,
            label_ids: modified.label_ids,
        })
    }

    /// Create a plain-text draft. Not idempotent: re-invoking creates a
    /// duplicate draft.
    pub async fn create_draft(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<DraftHandle, ConnectorError> {
        let payload = json!({ "message": { "raw": encode_raw_message(to, subject, body) } });
        let request = self
            .http
            .post(format!("{}/drafts", GMAIL_BASE))
            .bearer_auth(&self.access_token)
            .json(&payload);
        let resp = execute("gmail create_draft", request).await?;
        let draft: DraftResponse = resp.json().await?;
        log::info!("created draft {} to {}", draft.id, to);

        Ok(DraftHandle {
            success: true,
            draft_id: draft.id,
            message_id: draft.message.map(|m| m.id),
        })
    }
}

// ============================================================================
// Mapping helpers
// ============================================================================

fn summarize_messages(list: MessageListResponse) -> MessageList {
    let messages: Vec<MessageSummary> = list
        .messages
        .into_iter()
        .map(|m| MessageSummary {
            id: m.id,
            thread_id: m.thread_id,
        })
        .collect();
    let total_count = messages.len();
    MessageList {
        messages,
        total_count,
    }
}

fn detail_from_message(full: FullMessage) -> MessageDetail {
    let headers = full
        .payload
        .as_ref()
        .map(|p| &p.headers[..])
        .unwrap_or(&[]);

    let header_or = |name: &str, fallback: &str| -> String {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
            .unwrap_or_else(|| fallback.to_string())
    };

    let body = full
        .payload
        .as_ref()
        .and_then(decode_message_body)
        .unwrap_or_default();

    MessageDetail {
        id: full.id,
        thread_id: full.thread_id,
        subject: header_or("Subject", NO_SUBJECT),
        from: header_or("From", NO_SENDER),
        to: header_or("To", NO_RECIPIENT),
        date: header_or("Date", NO_DATE),
        body,
    }
}

/// MIME types eligible as the message body, in preference order.
const BODY_MIME_PREFERENCE: &[&str] = &["text/plain", "text/html"];

/// Decode the text body from a payload tree.
///
/// One scan per preferred MIME type: a plain-text part wins over an HTML
/// part wherever either sits in the tree. Falls back to the payload's own
/// body data for single-part messages without a recognized MIME type.
fn decode_message_body(payload: &MessagePart) -> Option<String> {
    for mime in BODY_MIME_PREFERENCE {
        if let Some(text) = find_part_body(payload, mime) {
            return Some(text);
        }
    }
    payload
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .and_then(decode_base64_text)
}

/// Depth-first search for the first part of the target MIME type that
/// carries decodable body data.
fn find_part_body(part: &MessagePart, target_mime: &str) -> Option<String> {
    if part.mime_type == target_mime {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Some(text) = decode_base64_text(data) {
                return Some(text);
            }
        }
    }
    part.parts.iter().find_map(|p| find_part_body(p, target_mime))
}

/// Gmail body data is URL-safe base64; padding may or may not be present.
fn decode_base64_text(data: &str) -> Option<String> {
    use base64::Engine;
    let trimmed = data.trim_end_matches('=');
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Exact, case-sensitive label lookup.
fn find_label<'a>(labels: &'a [GmailLabel], name: &str) -> Option<&'a GmailLabel> {
    labels.iter().find(|l| l.name == name)
}

/// Build the base64url-encoded RFC 2822 message the drafts endpoint
/// expects. The URL-safe no-pad engine emits no trailing `=`.
fn encode_raw_message(to: &str, subject: &str, body: &str) -> String {
    use base64::Engine;
    let message = format!(
        "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\nMIME-Version: 1.0\r\n\r\n{}",
        to, subject, body
    );
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use base64::Engine;

    use super::*;

    fn b64(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    #[test]
    fn test_summarize_messages_counts_items() {
        let list: MessageListResponse = serde_json::from_str(
            r#"{"messages": [
                {"id": "m1", "threadId": "t1"},
                {"id": "m2", "threadId": "t2"}
            ]}"#,
        )
        .unwrap();
        let summary = summarize_messages(list);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.messages.len(), 2);
        assert_eq!(summary.messages[0].id, "m1");
        assert_eq!(summary.messages[0].thread_id, "t1");
    }

    #[test]
    fn test_summarize_messages_empty_list() {
        let list: MessageListResponse =
            serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        let summary = summarize_messages(list);
        assert!(summary.messages.is_empty());
        assert_eq!(summary.total_count, 0);
    }

    #[test]
    fn test_top_level_body_decodes_exactly() {
        let json = format!(
            r#"{{
                "id": "m1", "threadId": "t1",
                "payload": {{
                    "mimeType": "text/plain",
                    "headers": [{{"name": "Subject", "value": "Hi"}}],
                    "body": {{"data": "{}"}}
                }}
            }}"#,
            b64("Hello from the café ✓")
        );
        let full: FullMessage = serde_json::from_str(&json).unwrap();
        let detail = detail_from_message(full);
        assert_eq!(detail.body, "Hello from the café ✓");
        assert_eq!(detail.subject, "Hi");
    }

    #[test]
    fn test_plain_text_preferred_over_html_when_html_comes_first() {
        let json = format!(
            r#"{{
                "id": "m1", "threadId": "t1",
                "payload": {{
                    "mimeType": "multipart/alternative",
                    "headers": [],
                    "parts": [
                        {{"mimeType": "text/html", "body": {{"data": "{}"}}}},
                        {{"mimeType": "text/plain", "body": {{"data": "{}"}}}}
                    ]
                }}
            }}"#,
            b64("<p>rich</p>"),
            b64("plain wins")
        );
        let full: FullMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(detail_from_message(full).body, "plain wins");
    }

    #[test]
    fn test_html_used_when_no_plain_part_exists() {
        let json = format!(
            r#"{{
                "id": "m1", "threadId": "t1",
                "payload": {{
                    "mimeType": "multipart/alternative",
                    "headers": [],
                    "parts": [
                        {{"mimeType": "text/html", "body": {{"data": "{}"}}}}
                    ]
                }}
            }}"#,
            b64("<p>only html</p>")
        );
        let full: FullMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(detail_from_message(full).body, "<p>only html</p>");
    }

    #[test]
    fn test_nested_multipart_plain_part_found() {
        let json = format!(
            r#"{{
                "id": "m1", "threadId": "t1",
                "payload": {{
                    "mimeType": "multipart/mixed",
                    "headers": [],
                    "parts": [
                        {{
                            "mimeType": "multipart/alternative",
                            "parts": [
                                {{"mimeType": "text/html", "body": {{"data": "{}"}}}},
                                {{"mimeType": "text/plain", "body": {{"data": "{}"}}}}
                            ]
                        }},
                        {{"mimeType": "application/pdf", "body": {{}}}}
                    ]
                }}
            }}"#,
            b64("<b>html</b>"),
            b64("nested plain")
        );
        let full: FullMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(detail_from_message(full).body, "nested plain");
    }

    #[test]
    fn test_missing_headers_fall_back_to_placeholders() {
        let full: FullMessage = serde_json::from_str(
            r#"{"id": "m9", "threadId": "t9", "payload": {"mimeType": "text/plain", "headers": []}}"#,
        )
        .unwrap();
        let detail = detail_from_message(full);
        assert_eq!(detail.subject, "(no subject)");
        assert_eq!(detail.from, "(unknown sender)");
        assert_eq!(detail.to, "(unknown recipient)");
        assert_eq!(detail.date, "(unknown date)");
        assert_eq!(detail.body, "");
    }

    #[test]
    fn test_decode_tolerates_padded_base64() {
        // Standard URL-safe encoders may emit padding; Gmail strips it.
        let padded = base64::engine::general_purpose::URL_SAFE.encode("padded body".as_bytes());
        assert!(padded.ends_with('='));
        assert_eq!(decode_base64_text(&padded).as_deref(), Some("padded body"));
    }

    #[test]
    fn test_find_label_is_case_sensitive() {
        let labels: Vec<GmailLabel> = serde_json::from_str(
            r#"[
                {"id": "L1", "name": "Receipts"},
                {"id": "L2", "name": "receipts"}
            ]"#,
        )
        .unwrap();
        assert_eq!(find_label(&labels, "Receipts").unwrap().id, "L1");
        assert_eq!(find_label(&labels, "receipts").unwrap().id, "L2");
        assert!(find_label(&labels, "RECEIPTS").is_none());
    }

    #[test]
    fn test_encode_raw_message_roundtrip_without_padding() {
        let raw = encode_raw_message("jane@example.com", "Re: Friday", "See you then.");
        assert!(!raw.contains('='));

        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&raw)
            .unwrap();
        let text = String::from_utf8(decoded).unwrap();
        assert!(text.starts_with("To: jane@example.com\r\n"));
        assert!(text.contains("Subject: Re: Friday\r\n"));
        assert!(text.ends_with("\r\n\r\nSee you then."));
    }

    #[test]
    fn test_modify_response_deserialization() {
        let resp: ModifyResponse = serde_json::from_str(
            r#"{"id": "m1", "threadId": "t1", "labelIds": ["INBOX", "Label_7"]}"#,
        )
        .unwrap();
        assert_eq!(resp.id, "m1");
        assert_eq!(resp.label_ids, vec!["INBOX", "Label_7"]);
    }

    #[test]
    fn test_draft_response_deserialization() {
        let resp: DraftResponse =
            serde_json::from_str(r#"{"id": "d1", "message": {"id": "m1", "threadId": "t1"}}"#)
                .unwrap();
        assert_eq!(resp.id, "d1");
        assert_eq!(resp.message.unwrap().id, "m1");
    }
}
