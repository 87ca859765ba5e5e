//! Document structure as returned by `documents.get`.

use serde::{Deserialize, Serialize};

/// A document resource, restricted to the fields docsync requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Document body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

impl Document {
    /// Creates a document with the given structural elements.
    pub fn with_content(content: Vec<StructuralElement>) -> Self {
        Self {
            document_id: None,
            body: Some(Body {
                content: Some(content),
            }),
        }
    }

    /// Returns the structural elements of the body, if any were returned.
    pub fn content(&self) -> Option<&[StructuralElement]> {
        self.body.as_ref()?.content.as_deref()
    }
}

/// The body of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    /// Structural elements making up the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<StructuralElement>>,
}

/// A structural element (paragraph, section break, table, ...).
///
/// Only the index range is modelled; every other field of the element
/// is ignored on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    /// Start offset (UTF-16 code units). Omitted by the API when zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    /// Exclusive end offset (UTF-16 code units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u32>,
}

impl StructuralElement {
    /// Creates an element spanning `[start, end)`.
    pub fn spanning(start: u32, end: u32) -> Self {
        Self {
            start_index: Some(start),
            end_index: Some(end),
        }
    }

    /// Creates an element that carries only an end offset.
    pub fn ending_at(end: u32) -> Self {
        Self {
            start_index: None,
            end_index: Some(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_response() {
        let json = r#"{
            "body": {
                "content": [
                    {"endIndex": 1, "sectionBreak": {"sectionStyle": {}}},
                    {"startIndex": 1, "endIndex": 13, "paragraph": {"elements": []}}
                ]
            }
        }"#;

        let doc: Document = serde_json::from_str(json).unwrap();
        let content = doc.content().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0], StructuralElement::ending_at(1));
        assert_eq!(content[1], StructuralElement::spanning(1, 13));
    }

    #[test]
    fn missing_body_and_content() {
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert!(doc.content().is_none());

        let doc: Document = serde_json::from_str(r#"{"body": {}}"#).unwrap();
        assert!(doc.content().is_none());
    }

    #[test]
    fn element_without_indices() {
        let element: StructuralElement = serde_json::from_str(r#"{"table": {}}"#).unwrap();
        assert_eq!(element.end_index, None);
    }
}
