use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::ImageFormat;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Result, SignError};
use crate::features::placement::{EmbedRect, PageSize};

// Used when neither the page nor its ancestors carry a MediaBox.
const FALLBACK_PAGE: PageSize = PageSize {
    width: 595.0,
    height: 842.0,
};

const XOBJECT_PREFIX: &str = "Sig";

pub fn parse(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| SignError::CorruptDocument(format!("pdf_parse_failed:{e}")))
}

pub fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| SignError::Serialization(format!("pdf_save_failed:{e}")))?;
    Ok(out)
}

/// Native sizes of every page, in page order.
pub fn page_sizes(doc: &Document) -> Vec<PageSize> {
    doc.get_pages()
        .values()
        .map(|id| page_size(doc, *id))
        .collect()
}

pub fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        if let Some(size) = extract_media_box(doc, dict) {
            return size;
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    FALLBACK_PAGE
}

fn extract_media_box(doc: &Document, dict: &Dictionary) -> Option<PageSize> {
    let arr = resolve(doc, dict.get(b"MediaBox").ok()?)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(&arr[0])?;
    let lly = obj_to_f64(&arr[1])?;
    let urx = obj_to_f64(&arr[2])?;
    let ury = obj_to_f64(&arr[3])?;
    Some(PageSize {
        width: (urx - llx).abs(),
        height: (ury - lly).abs(),
    })
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    enc.write_all(data)
        .map_err(|e| SignError::Serialization(format!("deflate_failed:{e}")))?;
    enc.finish()
        .map_err(|e| SignError::Serialization(format!("deflate_failed:{e}")))
}

/// Adds the PNG as an RGB image XObject with a grayscale soft mask.
pub fn embed_png(doc: &mut Document, png: &[u8]) -> Result<ObjectId> {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| SignError::UnsupportedImageFormat(format!("signature_image_invalid:{e}")))?
        .to_rgba8();
    let (img_w, img_h) = img.dimensions();
    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }

    let smask_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha)?,
    );
    let smask_id = doc.add_object(smask_stream);

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => smask_id,
        },
        deflate(&rgb)?,
    );
    Ok(doc.add_object(image_stream))
}

/// Resources the page sees, following indirect references and Parent inheritance.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        if let Some(res) = dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
        {
            return res.clone();
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Dictionary::new()
}

/// Registers `image_id` under a free `/Sig<n>` name in the page's own
/// resource dictionary and returns that name.
///
/// Shared or inherited resources are copied onto the page first so other
/// pages never see the new entry.
pub fn register_xobject(doc: &mut Document, page_id: ObjectId, image_id: ObjectId) -> Result<String> {
    let mut resources = effective_resources(doc, page_id);
    let mut xobjects = match resources.get(b"XObject").ok().and_then(|x| resolve(doc, x)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(_) => return Err(SignError::CorruptDocument("signature_xobject_invalid".into())),
        None => Dictionary::new(),
    };

    let name = (1..)
        .map(|n| format!("{XOBJECT_PREFIX}{n}"))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string());
    xobjects.set(name.clone(), image_id);
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| SignError::CorruptDocument("signature_page_missing_dict".into()))?;
    page_dict.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

/// Appends a content stream painting `name` into `rect`. Existing content is
/// wrapped in q/Q so its graphics state cannot leak into the stamp.
pub fn draw_xobject(doc: &mut Document, page_id: ObjectId, name: &str, rect: &EmbedRect) -> Result<()> {
    let existing = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|_| SignError::CorruptDocument("signature_page_missing_dict".into()))?
        .get(b"Contents")
        .ok()
        .cloned();
    // An indirect array is spliced like a direct one.
    let existing = match existing {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => Some(Object::Array(items.clone())),
            _ => Some(Object::Reference(id)),
        },
        other => other,
    };

    let paint = format!(
        "q {:.3} 0 0 {:.3} {:.3} {:.3} cm /{} Do Q\n",
        rect.width, rect.height, rect.x, rect.y, name
    );

    let contents = match existing {
        Some(prior @ (Object::Reference(_) | Object::Array(_))) => {
            let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let stamp_id = doc.add_object(Stream::new(
                dictionary! {},
                format!("Q\n{paint}").into_bytes(),
            ));
            let mut parts = vec![Object::Reference(open_id)];
            match prior {
                Object::Array(items) => parts.extend(items),
                other => parts.push(other),
            }
            parts.push(Object::Reference(stamp_id));
            Object::Array(parts)
        }
        Some(_) => return Err(SignError::CorruptDocument("page_contents_invalid".into())),
        None => Object::Reference(doc.add_object(Stream::new(dictionary! {}, paint.into_bytes()))),
    };

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| SignError::CorruptDocument("signature_page_missing_dict".into()))?;
    page_dict.set("Contents", contents);
    Ok(())
}
