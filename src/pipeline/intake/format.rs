use std::path::Path;

use serde::{Deserialize, Serialize};

/// Raster formats accepted for the written complaint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
        }
    }
}

/// Audio containers/codecs accepted for the spoken statement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Wav,
    Flac,
    Mp3,
    Ogg,
    Webm,
    M4a,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Webm => "audio/webm",
            Self::M4a => "audio/mp4",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Webm => "webm",
            Self::M4a => "m4a",
        }
    }

    /// Map a file extension (case-insensitive, no dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "mp3" => Some(Self::Mp3),
            "ogg" | "oga" | "opus" => Some(Self::Ogg),
            "webm" => Some(Self::Webm),
            "m4a" | "mp4" | "aac" => Some(Self::M4a),
            _ => None,
        }
    }

    /// Map a declared MIME type (e.g. a multipart part's content type).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Self::Wav),
            "audio/flac" | "audio/x-flac" => Some(Self::Flac),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/ogg" | "audio/opus" => Some(Self::Ogg),
            "audio/webm" | "video/webm" => Some(Self::Webm),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => Some(Self::M4a),
            _ => None,
        }
    }
}

/// Detect image format from magic bytes (NOT file extensions).
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    match bytes {
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(ImageFormat::Png),
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some(ImageFormat::Tiff),
        _ => None,
    }
}

/// Detect audio format. Magic bytes win; the declared MIME type and then the
/// file name extension are consulted only when the header is inconclusive.
pub fn detect_audio_format(
    bytes: &[u8],
    declared_mime: Option<&str>,
    file_name: Option<&str>,
) -> Option<AudioFormat> {
    sniff_audio(bytes)
        .or_else(|| declared_mime.and_then(AudioFormat::from_mime))
        .or_else(|| {
            file_name
                .and_then(|n| Path::new(n).extension())
                .and_then(|e| e.to_str())
                .and_then(AudioFormat::from_extension)
        })
}

fn sniff_audio(bytes: &[u8]) -> Option<AudioFormat> {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return Some(AudioFormat::Wav);
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some(AudioFormat::M4a);
    }
    match bytes {
        [b'f', b'L', b'a', b'C', ..] => Some(AudioFormat::Flac),
        [b'O', b'g', b'g', b'S', ..] => Some(AudioFormat::Ogg),
        [0x1A, 0x45, 0xDF, 0xA3, ..] => Some(AudioFormat::Webm),
        [b'I', b'D', b'3', ..] => Some(AudioFormat::Mp3),
        // MPEG audio frame sync: 11 set bits
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(AudioFormat::Mp3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_jpeg_from_magic_bytes() {
        assert_eq!(
            detect_image_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn detect_png_from_magic_bytes() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_image_format(&png), Some(ImageFormat::Png));
    }

    #[test]
    fn detect_tiff_both_endians() {
        assert_eq!(
            detect_image_format(&[0x49, 0x49, 0x2A, 0x00, 0x08]),
            Some(ImageFormat::Tiff)
        );
        assert_eq!(
            detect_image_format(&[0x4D, 0x4D, 0x00, 0x2A, 0x00]),
            Some(ImageFormat::Tiff)
        );
    }

    #[test]
    fn pdf_is_not_an_accepted_image() {
        assert_eq!(detect_image_format(b"%PDF-1.7"), None);
    }

    #[test]
    fn detect_wav_header() {
        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&[0x24, 0, 0, 0]);
        wav.extend_from_slice(b"WAVEfmt ");
        assert_eq!(detect_audio_format(&wav, None, None), Some(AudioFormat::Wav));
    }

    #[test]
    fn detect_ogg_webm_flac_mp3() {
        assert_eq!(sniff_audio(b"OggS\x00\x02"), Some(AudioFormat::Ogg));
        assert_eq!(sniff_audio(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]), Some(AudioFormat::Webm));
        assert_eq!(sniff_audio(b"fLaC\x00\x00"), Some(AudioFormat::Flac));
        assert_eq!(sniff_audio(b"ID3\x04\x00"), Some(AudioFormat::Mp3));
        assert_eq!(sniff_audio(&[0xFF, 0xFB, 0x90, 0x64]), Some(AudioFormat::Mp3));
    }

    #[test]
    fn magic_bytes_win_over_extension() {
        let detected = detect_audio_format(b"OggS\x00\x02", None, Some("statement.mp3"));
        assert_eq!(detected, Some(AudioFormat::Ogg));
    }

    #[test]
    fn falls_back_to_declared_mime_then_extension() {
        let unknown = [0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        assert_eq!(
            detect_audio_format(&unknown, Some("audio/webm;codecs=opus"), None),
            Some(AudioFormat::Webm)
        );
        assert_eq!(
            detect_audio_format(&unknown, None, Some("clip.FLAC")),
            Some(AudioFormat::Flac)
        );
        assert_eq!(detect_audio_format(&unknown, None, Some("clip.txt")), None);
    }
}
