use serde::{Deserialize, Serialize};

use crate::error::{Result, SignError};
use crate::features::pdf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[serde(alias = "A", alias = "a")]
    Android,
    #[serde(alias = "B", alias = "b")]
    Ios,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Android
        }
    }

    /// Built-in tunables for each renderer family.
    pub fn policy(self) -> PlacementPolicy {
        match self {
            // Vertical scale follows the renderer's reported page height.
            Platform::Android => PlacementPolicy {
                centering_offset_x: 0.0,
                vertical_bias_offset: 0.0,
                vertical_reference: VerticalReference::Viewport,
                inset_x: 0.0,
                inset_y: 25.0,
                box_width: 50.0,
                box_height: 50.0,
            },
            // Vertical scale is anchored to the fixed 540px viewer height.
            Platform::Ios => PlacementPolicy {
                centering_offset_x: 12.0,
                vertical_bias_offset: 12.0,
                vertical_reference: VerticalReference::Fixed(540.0),
                inset_x: 0.0,
                inset_y: 0.0,
                box_width: 50.0,
                box_height: 50.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalReference {
    Viewport,
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementPolicy {
    pub centering_offset_x: f64,
    pub vertical_bias_offset: f64,
    pub vertical_reference: VerticalReference,
    pub inset_x: f64,
    pub inset_y: f64,
    pub box_width: f64,
    pub box_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapPoint {
    pub page: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Target rectangle in page space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub fn compute_embed_rect(
    policy: &PlacementPolicy,
    tap_x: f64,
    tap_y: f64,
    viewport: Viewport,
    page: PageSize,
) -> Result<EmbedRect> {
    if !viewport.is_usable() {
        return Err(SignError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    let reference_height = match policy.vertical_reference {
        VerticalReference::Viewport => viewport.height,
        VerticalReference::Fixed(h) => h,
    };
    if !(reference_height.is_finite() && reference_height > 0.0) {
        return Err(SignError::InvalidViewport {
            width: viewport.width,
            height: reference_height,
        });
    }

    let scale_x = page.width / viewport.width;
    let scale_y = page.height / reference_height;
    let page_x = scale_x * (tap_x - policy.centering_offset_x);
    let page_y = page.height - scale_y * (tap_y + policy.vertical_bias_offset);

    Ok(EmbedRect {
        x: page_x - policy.inset_x,
        y: page_y - policy.inset_y,
        width: policy.box_width,
        height: policy.box_height,
    })
}

pub struct PlacementRequest<'a> {
    pub document: &'a [u8],
    pub page_index: u32,
    pub signature_png: &'a [u8],
    pub tap: TapPoint,
    pub viewport: Viewport,
    pub policy: PlacementPolicy,
}

#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub bytes: Vec<u8>,
    pub rect: EmbedRect,
    pub page_count: u32,
    pub resource_name: String,
}

/// Stamps the signature onto the tapped page and returns the re-serialized document.
/// Nothing is written anywhere; on error the input bytes remain the only copy.
pub fn place_signature(req: &PlacementRequest<'_>) -> Result<PlacementOutcome> {
    let mut doc = pdf::parse(req.document)?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    let page_id = *pages
        .get(&req.page_index)
        .ok_or(SignError::PageOutOfRange {
            page: req.page_index,
            count: page_count,
        })?;

    let image_id = pdf::embed_png(&mut doc, req.signature_png)?;
    let page_size = pdf::page_size(&doc, page_id);
    let rect = compute_embed_rect(&req.policy, req.tap.x, req.tap.y, req.viewport, page_size)?;
    let resource_name = pdf::register_xobject(&mut doc, page_id, image_id)?;
    pdf::draw_xobject(&mut doc, page_id, &resource_name, &rect)?;
    let bytes = pdf::serialize(&mut doc)?;

    log::debug!(
        "placed {resource_name} on page {} at ({:.1}, {:.1})",
        req.page_index,
        rect.x,
        rect.y
    );

    Ok(PlacementOutcome {
        bytes,
        rect,
        page_count,
        resource_name,
    })
}
