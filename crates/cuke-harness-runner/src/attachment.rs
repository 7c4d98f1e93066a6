//! Attachment payload construction and encoding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use cuke_harness::{AttachmentData, AttachmentOptions};
use cuke_harness_messages::{Attachment, AttachmentContentEncoding};

/// Media type marking an attachment as a log line.
pub const LOG_MEDIA_TYPE: &str = "text/x.cucumber.log+plain";

/// Media type marking an attachment as a URL.
pub const LINK_MEDIA_TYPE: &str = "text/uri-list";

/// Build an attachment payload from captured content.
///
/// Text is carried verbatim; binary content and drained readers are
/// base64-encoded. Test case and step correlation ids are stamped by the
/// caller.
///
/// # Errors
/// Returns the underlying IO error when draining a reader fails.
pub fn make_attachment(
    data: AttachmentData<'_>,
    options: AttachmentOptions<'_>,
) -> std::io::Result<Attachment> {
    let (body, content_encoding) = match data {
        AttachmentData::Text(text) => (text.to_string(), AttachmentContentEncoding::Identity),
        AttachmentData::Bytes(bytes) => (BASE64.encode(bytes), AttachmentContentEncoding::Base64),
        AttachmentData::Reader(reader) => {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            (BASE64.encode(&buffer), AttachmentContentEncoding::Base64)
        }
    };
    Ok(Attachment {
        body,
        content_encoding,
        media_type: options.media_type.to_string(),
        file_name: options.file_name.map(ToString::to_string),
        test_case_started_id: None,
        test_step_id: None,
    })
}

/// Build a log attachment.
#[must_use]
pub fn make_log(text: &str) -> Attachment {
    Attachment {
        body: text.to_string(),
        content_encoding: AttachmentContentEncoding::Identity,
        media_type: LOG_MEDIA_TYPE.to_string(),
        file_name: None,
        test_case_started_id: None,
        test_step_id: None,
    }
}

/// Build a URL attachment, optionally titled.
#[must_use]
pub fn make_link(url: &str, title: Option<&str>) -> Attachment {
    Attachment {
        body: url.to_string(),
        content_encoding: AttachmentContentEncoding::Identity,
        media_type: LINK_MEDIA_TYPE.to_string(),
        file_name: title.map(ToString::to_string),
        test_case_started_id: None,
        test_step_id: None,
    }
}
