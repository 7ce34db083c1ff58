use crate::pipeline::intake::AudioFormat;

/// Recognizer encoding parameters for one container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioEncoding {
    /// Cloud Speech `RecognitionConfig.encoding` value.
    pub encoding: &'static str,
    pub sample_rate_hertz: u32,
    /// The format has no native encoding; the closest one is sent instead.
    pub approximate: bool,
}

pub fn encoding_for(format: AudioFormat) -> AudioEncoding {
    let (encoding, sample_rate_hertz, approximate) = match format {
        AudioFormat::Wav => ("LINEAR16", 16_000, false),
        AudioFormat::Flac => ("FLAC", 16_000, false),
        AudioFormat::Mp3 => ("MP3", 16_000, false),
        AudioFormat::Ogg => ("OGG_OPUS", 48_000, false),
        AudioFormat::Webm => ("WEBM_OPUS", 48_000, false),
        // AAC in MP4 has no recognizer encoding.
        AudioFormat::M4a => ("MP3", 16_000, true),
    };
    AudioEncoding {
        encoding,
        sample_rate_hertz,
        approximate,
    }
}
