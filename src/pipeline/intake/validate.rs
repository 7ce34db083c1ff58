use std::sync::LazyLock;

use regex::Regex;

use super::format::{detect_audio_format, detect_image_format, AudioFormat, ImageFormat};
use super::IntakeError;

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

/// One claimant submission as received from the caller.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Claimant wallet address (`0x` + 40 hex digits).
    pub claimant: String,
    pub image: Vec<u8>,
    pub image_name: Option<String>,
    pub audio: Vec<u8>,
    pub audio_name: Option<String>,
    /// Content type declared by the client for the audio part, if any.
    pub audio_mime: Option<String>,
}

/// Byte ceilings enforced before the pipeline starts.
#[derive(Debug, Clone, Copy)]
pub struct IntakeLimits {
    pub max_image_bytes: usize,
    pub max_audio_bytes: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: crate::config::DEFAULT_MAX_IMAGE_BYTES,
            max_audio_bytes: crate::config::DEFAULT_MAX_AUDIO_BYTES,
        }
    }
}

/// Formats detected for an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedFormats {
    pub image: ImageFormat,
    pub audio: AudioFormat,
}

/// Check the submission invariant: both payloads present, under their
/// ceilings, of a recognized type, and a well-formed claimant address.
pub fn validate_submission(
    request: &SubmissionRequest,
    limits: &IntakeLimits,
) -> Result<AcceptedFormats, IntakeError> {
    validate_claimant_address(&request.claimant)?;

    check_payload("image", &request.image, limits.max_image_bytes)?;
    check_payload("audio", &request.audio, limits.max_audio_bytes)?;

    let image = detect_image_format(&request.image).ok_or_else(|| {
        IntakeError::UnsupportedFormat {
            field: "image",
            detail: "expected JPEG, PNG or TIFF".into(),
        }
    })?;

    let audio = detect_audio_format(
        &request.audio,
        request.audio_mime.as_deref(),
        request.audio_name.as_deref(),
    )
    .ok_or_else(|| IntakeError::UnsupportedFormat {
        field: "audio",
        detail: "expected WAV, FLAC, MP3, OGG, WEBM or M4A".into(),
    })?;

    Ok(AcceptedFormats { image, audio })
}

pub fn validate_claimant_address(address: &str) -> Result<(), IntakeError> {
    if ADDRESS_PATTERN.is_match(address) {
        Ok(())
    } else {
        Err(IntakeError::InvalidAddress(address.chars().take(64).collect()))
    }
}

fn check_payload(field: &'static str, bytes: &[u8], max: usize) -> Result<(), IntakeError> {
    if bytes.is_empty() {
        return Err(IntakeError::MissingPayload(field));
    }
    if bytes.len() > max {
        return Err(IntakeError::PayloadTooLarge {
            field,
            size: bytes.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIMANT: &str = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4";

    fn request(image: Vec<u8>, audio: Vec<u8>) -> SubmissionRequest {
        SubmissionRequest {
            claimant: CLAIMANT.into(),
            image,
            image_name: Some("complaint.png".into()),
            audio,
            audio_name: Some("statement.ogg".into()),
            audio_mime: None,
        }
    }

    fn png() -> Vec<u8> {
        vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]
    }

    fn ogg() -> Vec<u8> {
        b"OggS\x00\x02\x00\x00".to_vec()
    }

    #[test]
    fn accepts_valid_submission() {
        let formats = validate_submission(&request(png(), ogg()), &IntakeLimits::default()).unwrap();
        assert_eq!(formats.image, ImageFormat::Png);
        assert_eq!(formats.audio, AudioFormat::Ogg);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(validate_claimant_address(CLAIMANT).is_ok());
        assert!(validate_claimant_address("5B38Da6a701c568545dCfcB03FcB875f56beddC4").is_err());
        assert!(validate_claimant_address("0x5B38Da6a701c568545dCfcB03FcB875f56beddC").is_err());
        assert!(validate_claimant_address("0xZZ38Da6a701c568545dCfcB03FcB875f56beddC4").is_err());
        assert!(validate_claimant_address("").is_err());
    }

    #[test]
    fn rejects_missing_payloads() {
        let err = validate_submission(&request(vec![], ogg()), &IntakeLimits::default()).unwrap_err();
        assert!(matches!(err, IntakeError::MissingPayload("image")));
        let err = validate_submission(&request(png(), vec![]), &IntakeLimits::default()).unwrap_err();
        assert!(matches!(err, IntakeError::MissingPayload("audio")));
    }

    #[test]
    fn rejects_oversized_payloads() {
        let limits = IntakeLimits {
            max_image_bytes: 4,
            max_audio_bytes: 1024,
        };
        let err = validate_submission(&request(png(), ogg()), &limits).unwrap_err();
        assert!(matches!(err, IntakeError::PayloadTooLarge { field: "image", .. }));
    }

    #[test]
    fn rejects_unrecognized_image() {
        let err = validate_submission(&request(b"%PDF-1.7\n".to_vec(), ogg()), &IntakeLimits::default())
            .unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat { field: "image", .. }));
    }

    #[test]
    fn rejects_unrecognized_audio() {
        let mut req = request(png(), b"plain text, not audio".to_vec());
        req.audio_name = Some("notes.txt".into());
        let err = validate_submission(&req, &IntakeLimits::default()).unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat { field: "audio", .. }));
    }
}
