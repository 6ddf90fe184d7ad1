//! Response code constants (RFC 7252 §5.9, §12.1.2).
//!
//! Grounded on `kwap::resp::code`, minus its `code!`/`rfc_7252_doc!`
//! macro pair: that machinery exists in the teacher to generate an RFC
//! excerpt into each constant's doc comment from `kwap_macros`, which
//! isn't worth vendoring for the twenty definitions below — a plain doc
//! comment naming the section gets the same result.

use crate::msg::Code;

/// 2.01 Created (RFC 7252 §5.9.1.1)
pub const CREATED: Code = Code::new(2, 01);
/// 2.02 Deleted (RFC 7252 §5.9.1.2)
pub const DELETED: Code = Code::new(2, 02);
/// 2.03 Valid (RFC 7252 §5.9.1.3)
pub const VALID: Code = Code::new(2, 03);
/// 2.04 Changed (RFC 7252 §5.9.1.4)
pub const CHANGED: Code = Code::new(2, 04);
/// 2.05 Content (RFC 7252 §5.9.1.5)
pub const CONTENT: Code = Code::new(2, 05);

/// 4.00 Bad Request (RFC 7252 §5.9.2.1)
pub const BAD_REQUEST: Code = Code::new(4, 00);
/// 4.01 Unauthorized (RFC 7252 §5.9.2.2)
pub const UNAUTHORIZED: Code = Code::new(4, 01);
/// 4.02 Bad Option (RFC 7252 §5.9.2.3)
pub const BAD_OPTION: Code = Code::new(4, 02);
/// 4.03 Forbidden (RFC 7252 §5.9.2.4)
pub const FORBIDDEN: Code = Code::new(4, 03);
/// 4.04 Not Found (RFC 7252 §5.9.2.5)
pub const NOT_FOUND: Code = Code::new(4, 04);
/// 4.05 Method Not Allowed (RFC 7252 §5.9.2.6)
pub const METHOD_NOT_ALLOWED: Code = Code::new(4, 05);
/// 4.06 Not Acceptable (RFC 7252 §5.9.2.7)
pub const NOT_ACCEPTABLE: Code = Code::new(4, 06);
/// 4.12 Precondition Failed (RFC 7252 §5.9.2.8)
pub const PRECONDITION_FAILED: Code = Code::new(4, 12);
/// 4.13 Request Entity Too Large (RFC 7252 §5.9.2.9)
pub const REQUEST_ENTITY_TOO_LARGE: Code = Code::new(4, 13);
/// 4.15 Unsupported Content-Format (RFC 7252 §5.9.2.10)
pub const UNSUPPORTED_CONTENT_FORMAT: Code = Code::new(4, 15);

/// 5.00 Internal Server Error (RFC 7252 §5.9.3.1)
pub const INTERNAL_SERVER_ERROR: Code = Code::new(5, 00);
/// 5.01 Not Implemented (RFC 7252 §5.9.3.2)
pub const NOT_IMPLEMENTED: Code = Code::new(5, 01);
/// 5.02 Bad Gateway (RFC 7252 §5.9.3.3)
pub const BAD_GATEWAY: Code = Code::new(5, 02);
/// 5.03 Service Unavailable (RFC 7252 §5.9.3.4)
pub const SERVICE_UNAVAILABLE: Code = Code::new(5, 03);
/// 5.04 Gateway Timeout (RFC 7252 §5.9.3.5)
pub const GATEWAY_TIMEOUT: Code = Code::new(5, 04);
/// 5.05 Proxying Not Supported (RFC 7252 §5.9.3.6)
pub const PROXYING_NOT_SUPPORTED: Code = Code::new(5, 05);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_classify_as_responses() {
    assert!(CONTENT.is_response());
    assert!(NOT_FOUND.is_response());
    assert!(INTERNAL_SERVER_ERROR.is_response());
  }

  #[test]
  fn display_matches_dotted_form() {
    assert_eq!(CONTENT.to_string(), "2.05");
    assert_eq!(NOT_FOUND.to_string(), "4.04");
  }
}
