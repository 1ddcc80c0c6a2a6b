use serde::Serialize;

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
            content_description: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            id: None,
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Serialize)]
pub struct Column<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Column<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Column",
            padding: None,
            children,
            content_description: None,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Progress<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Progress<'a> {
    pub fn new() -> Self {
        Self {
            kind: "Progress",
            text: None,
            content_description: None,
        }
    }

    pub fn text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

/// Host-side PDF renderer. Taps come back as `page_tap`, load completion as `page_layout`.
#[derive(Serialize)]
pub struct PdfView<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source_uri: &'a str,
    pub page_count: u32,
    pub tap_action: &'a str,
    pub layout_action: &'a str,
    pub scale: f64,
    pub paging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_dp: Option<u32>,
}

impl<'a> PdfView<'a> {
    pub fn new(source_uri: &'a str, page_count: u32) -> Self {
        Self {
            kind: "PdfView",
            source_uri,
            page_count,
            tap_action: "page_tap",
            layout_action: "page_layout",
            scale: 1.0,
            paging: true,
            height_dp: None,
        }
    }

    pub fn height_dp(mut self, height: u32) -> Self {
        self.height_dp = Some(height);
        self
    }
}

#[derive(Serialize)]
pub struct SignaturePad<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'a str,
    pub clear_text: &'a str,
    pub confirm_text: &'a str,
    pub ok_action: &'a str,
    pub empty_action: &'a str,
    pub cancel_action: &'a str,
}

impl<'a> SignaturePad<'a> {
    pub fn new() -> Self {
        Self {
            kind: "SignaturePad",
            description: "Sign",
            clear_text: "Clear",
            confirm_text: "Save",
            ok_action: "signature_ok",
            empty_action: "signature_empty",
            cancel_action: "signature_cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_view_serializes_callbacks() {
        let view = PdfView::new("file:///docs/a.pdf", 3).height_dp(540);
        let val = serde_json::to_value(view).unwrap();
        assert_eq!(val.get("type").and_then(|v| v.as_str()), Some("PdfView"));
        assert_eq!(val.get("tap_action").and_then(|v| v.as_str()), Some("page_tap"));
        assert_eq!(val.get("height_dp").and_then(|v| v.as_u64()), Some(540));
    }

    #[test]
    fn column_carries_content_description() {
        let col = Column::new(vec![serde_json::to_value(Text::new("hi")).unwrap()])
            .padding(15)
            .content_description("edit_mode_banner");
        let val = serde_json::to_value(col).unwrap();
        assert_eq!(
            val.get("content_description").and_then(|v| v.as_str()),
            Some("edit_mode_banner")
        );
        assert_eq!(val["children"][0]["text"], "hi");
    }

    #[test]
    fn button_skips_unset_fields() {
        let val = serde_json::to_value(Button::new("Sign Document", "sign_document")).unwrap();
        assert!(val.get("id").is_none());
        assert_eq!(val.get("action").and_then(|v| v.as_str()), Some("sign_document"));
    }
}
