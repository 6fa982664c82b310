use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Image bytes decoded from a base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("image must be a base64 encoded data URI")]
    NotBase64,
    #[error("unsupported image type")]
    UnsupportedType,
    #[error("image is empty")]
    Empty,
}

/// Decode `data:image/<fmt>;base64,<payload>` or a bare base64 string.
///
/// Bare payloads are typed by their magic bytes.
pub fn decode_image(raw: &str) -> Result<DecodedImage, ImageError> {
    let raw = raw.trim();
    let (declared, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or(ImageError::NotBase64)?;
            let media_type = header
                .strip_suffix(";base64")
                .ok_or(ImageError::NotBase64)?;
            if !media_type.starts_with("image/") {
                return Err(ImageError::UnsupportedType);
            }
            (Some(media_type.to_ascii_lowercase()), payload)
        }
        None => (None, raw),
    };

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|_| ImageError::NotBase64)?;
    if data.is_empty() {
        return Err(ImageError::Empty);
    }

    let content_type = match declared {
        Some(media_type) => media_type,
        None => sniff(&data).ok_or(ImageError::UnsupportedType)?.to_string(),
    };

    Ok(DecodedImage { content_type, data })
}

fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn decodes_data_uri() {
        let raw = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let image = decode_image(&raw).expect("decoded");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.data, PNG_HEADER);
    }

    #[test]
    fn sniffs_bare_base64() {
        let raw = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(decode_image(&raw).expect("jpeg").content_type, "image/jpeg");
    }

    #[test]
    fn rejects_non_images() {
        let text = format!("data:text/plain;base64,{}", STANDARD.encode("hi"));
        assert_eq!(decode_image(&text), Err(ImageError::UnsupportedType));
        assert_eq!(decode_image(&STANDARD.encode("hello")), Err(ImageError::UnsupportedType));
        assert_eq!(decode_image("data:image/png,raw"), Err(ImageError::NotBase64));
        assert_eq!(decode_image("***"), Err(ImageError::NotBase64));
        assert_eq!(decode_image(""), Err(ImageError::Empty));
    }
}
