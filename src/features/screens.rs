use serde_json::{json, Value};

use crate::controller::Mode;
use crate::state::AppState;
use crate::ui::{
    Button as UiButton, Column as UiColumn, PdfView as UiPdfView, Progress as UiProgress,
    SignaturePad as UiSignaturePad, Text as UiText,
};

const VIEWER_HEIGHT_DP: u32 = 540;

pub fn render_signing_screen(state: &AppState) -> Value {
    let session = &state.session;
    let mut children = Vec::new();

    match session.mode {
        Mode::Capturing => {
            children.push(to_value(UiSignaturePad::new()));
        }
        Mode::Idle | Mode::Downloading => {
            children.push(to_value(
                UiProgress::new()
                    .text("Downloading document...")
                    .content_description("download_progress"),
            ));
            if session.fetch_failed {
                children.push(to_value(
                    UiButton::new("Retry download", "init").id("retry_download_btn"),
                ));
            }
        }
        Mode::Viewing | Mode::EditArmed => {
            children.push(to_value(
                UiText::new("Digital PDF Signature").size(20.0),
            ));
            if session.placing {
                children.push(to_value(
                    UiProgress::new()
                        .text("Saving PDF File...")
                        .content_description("saving_progress"),
                ));
            } else if let Some(doc) = &session.document {
                let uri = doc.uri();
                children.push(to_value(
                    UiPdfView::new(&uri, doc.page_count()).height_dp(VIEWER_HEIGHT_DP),
                ));
            }
            if session.mode == Mode::EditArmed {
                children.push(to_value(
                    UiColumn::new(vec![
                        to_value(UiText::new("* EDIT MODE *")),
                        to_value(UiText::new("Touch where you want to place the signature")),
                    ])
                    .padding(15)
                    .content_description("edit_mode_banner"),
                ));
            } else if !session.placing {
                children.push(to_value(
                    UiButton::new("Sign Document", "sign_document").id("sign_document_btn"),
                ));
            }
        }
    }

    if let Some(err) = &session.last_error {
        children.push(to_value(
            UiText::new(&format!("Error: {err}"))
                .size(12.0)
                .content_description("error_text"),
        ));
    }

    to_value(UiColumn::new(children).padding(20))
}

pub fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}

fn to_value<T: serde::Serialize>(node: T) -> Value {
    serde_json::to_value(node).unwrap_or_else(|e| error_ui(&format!("ui_serialize_failed:{e}")))
}
